// src/routes.rs

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    config::AppState,
    docs::ApiDoc,
    handlers,
    middleware::auth::{auth_guard, cron_guard},
};

pub fn build_router(app_state: AppState) -> Router {
    // Disparador externo (protegido por CRON_SECRET)
    let cron_routes = Router::new()
        .route("/alerts", post(handlers::alerts::run_cron_scan))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            cron_guard,
        ));

    let alert_routes = Router::new()
        .route("/", get(handlers::alerts::list_alerts))
        .route("/scan", post(handlers::alerts::run_scan))
        .route("/channels", get(handlers::alerts::channel_status))
        .route("/properties/{id}/notify", post(handlers::alerts::notify_property))
        .route("/properties/{id}/resolve", post(handlers::alerts::resolve_alert));

    let permission_routes = Router::new()
        .route("/", post(handlers::permissions::submit_request))
        .route("/pending", get(handlers::permissions::list_pending))
        .route("/history", get(handlers::permissions::list_history))
        .route("/{id}/approve", post(handlers::permissions::approve_request))
        .route("/{id}/reject", post(handlers::permissions::reject_request));

    let property_routes = Router::new()
        .route("/{id}/availability", post(handlers::properties::change_availability));

    let event_routes = Router::new()
        .route("/", get(handlers::events::stream_events));

    // Todo lo que requiere JWT
    let protected = Router::new()
        .nest("/alerts", alert_routes)
        .nest("/permissions", permission_routes)
        .nest("/properties", property_routes)
        .nest("/events", event_routes)
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/cron", cron_routes)
        .nest("/api", protected)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(app_state)
}
