// src/handlers/events.rs

use std::{convert::Infallible, time::Duration};

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use tokio_stream::{
    wrappers::{errors::BroadcastStreamRecvError, BroadcastStream},
    Stream, StreamExt,
};

use crate::{config::AppState, middleware::auth::AuthenticatedUser};

// GET /api/events
#[utoipa::path(
    get,
    path = "/api/events",
    tag = "Eventos",
    responses(
        (status = 200, description = "Flujo SSE de eventos de dominio", content_type = "text/event-stream", body = String)
    ),
    security(("api_jwt" = []))
)]
pub async fn stream_events(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let receiver = app_state.event_bus.subscribe();
    tracing::debug!(
        "Usuario {} suscrito a eventos ({} suscriptores)",
        user.0.id,
        app_state.event_bus.subscriber_count()
    );

    let stream = BroadcastStream::new(receiver).filter_map(|message| match message {
        Ok(envelope) => Event::default()
            .event(envelope.event.name())
            .id(envelope.id.to_string())
            .json_data(&envelope)
            .ok()
            .map(Ok),
        // Entrega como mucho una vez: lo perdido no se recupera
        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
            tracing::warn!("Suscriptor atrasado: {} eventos descartados", skipped);
            None
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}
