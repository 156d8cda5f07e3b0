// src/handlers/alerts.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use utoipa::ToSchema;

use crate::{
    common::error::ApiError,
    config::AppState,
    handlers::required,
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        rbac::{AdminOrAbove, RequireRole},
    },
    models::{
        alert::{ChannelStatus, InactivityAlert, ManualNotifyResult, ScanSummary},
        property::{AlertResolution, Property},
    },
};

// =============================================================================
//  ÁREA 1: REVISIÓN PROGRAMADA
// =============================================================================

// POST /api/cron/alerts
#[utoipa::path(
    post,
    path = "/api/cron/alerts",
    tag = "Alertas",
    responses(
        (status = 200, description = "Resumen de la revisión", body = ScanSummary),
        (status = 401, description = "Secreto del cron ausente o inválido")
    ),
    params(
        ("x-cron-secret" = String, Header, description = "Valor de CRON_SECRET")
    )
)]
pub async fn run_cron_scan(State(app_state): State<AppState>) -> impl IntoResponse {
    // Los fallos quedan dentro del resumen
    let summary = app_state.alert_service.scan_and_notify(Utc::now()).await;
    (StatusCode::OK, Json(summary))
}

// POST /api/alerts/scan
#[utoipa::path(
    post,
    path = "/api/alerts/scan",
    tag = "Alertas",
    responses(
        (status = 200, description = "Resumen de la revisión", body = ScanSummary),
        (status = 403, description = "Requiere admin o gerencia")
    ),
    security(("api_jwt" = []))
)]
pub async fn run_scan(
    State(app_state): State<AppState>,
    guard: RequireRole<AdminOrAbove>,
) -> impl IntoResponse {
    tracing::info!("Revisión manual lanzada por el usuario {}", guard.user().id);

    let summary = app_state.alert_service.scan_and_notify(Utc::now()).await;
    (StatusCode::OK, Json(summary))
}

// =============================================================================
//  ÁREA 2: CONSULTA
// =============================================================================

// GET /api/alerts
#[utoipa::path(
    get,
    path = "/api/alerts",
    tag = "Alertas",
    responses(
        (status = 200, description = "Inmuebles inactivos visibles para el usuario", body = Vec<InactivityAlert>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_alerts(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let alerts = app_state
        .alert_service
        .list_alerts(&user.0, Utc::now())
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(alerts)))
}

// GET /api/alerts/channels
#[utoipa::path(
    get,
    path = "/api/alerts/channels",
    tag = "Alertas",
    responses(
        (status = 200, description = "Estado de configuración de los canales", body = ChannelStatus)
    ),
    security(("api_jwt" = []))
)]
pub async fn channel_status(State(app_state): State<AppState>, _user: AuthenticatedUser) -> impl IntoResponse {
    Json(app_state.alert_service.channel_status())
}

// =============================================================================
//  ÁREA 3: ACCIONES SOBRE UN INMUEBLE
// =============================================================================

// POST /api/alerts/properties/{id}/notify
#[utoipa::path(
    post,
    path = "/api/alerts/properties/{id}/notify",
    tag = "Alertas",
    responses(
        (status = 200, description = "Resultado de la notificación", body = ManualNotifyResult),
        (status = 403, description = "Inmueble fuera del alcance del usuario"),
        (status = 404, description = "Inmueble no encontrado")
    ),
    params(
        ("id" = i64, Path, description = "ID del inmueble")
    ),
    security(("api_jwt" = []))
)]
pub async fn notify_property(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Path(property_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let result = app_state
        .alert_service
        .manual_notify(&user.0, property_id, Utc::now())
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(result)))
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResolveAlertPayload {
    #[schema(example = "alquilado")]
    pub resolution: Option<AlertResolution>,
}

// POST /api/alerts/properties/{id}/resolve
#[utoipa::path(
    post,
    path = "/api/alerts/properties/{id}/resolve",
    tag = "Alertas",
    request_body = ResolveAlertPayload,
    responses(
        (status = 200, description = "Inmueble actualizado", body = Property),
        (status = 400, description = "Resolución ausente o no aplicable"),
        (status = 404, description = "Inmueble no encontrado")
    ),
    params(
        ("id" = i64, Path, description = "ID del inmueble")
    ),
    security(("api_jwt" = []))
)]
pub async fn resolve_alert(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Path(property_id): Path<i64>,
    Json(payload): Json<ResolveAlertPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let resolution = required(payload.resolution, "resolution")
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let property = app_state
        .alert_service
        .resolve(&user.0, property_id, resolution, Utc::now())
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(property)))
}
