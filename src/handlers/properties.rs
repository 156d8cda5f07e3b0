// src/handlers/properties.rs

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    handlers::{permissions::outcome_status, required},
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::{permission::SubmissionOutcome, property::AvailabilityAction},
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityPayload {
    #[schema(example = "disable")]
    pub action: Option<AvailabilityAction>,

    #[validate(length(max = 2000, message = "La justificación no puede superar 2000 caracteres."))]
    #[schema(example = "Remodelación de cocina durante marzo")]
    pub justification: Option<String>,
}

// POST /api/properties/{id}/availability
#[utoipa::path(
    post,
    path = "/api/properties/{id}/availability",
    tag = "Inmuebles",
    request_body = AvailabilityPayload,
    responses(
        (status = 201, description = "Solicitud creada (asesor)", body = SubmissionOutcome),
        (status = 200, description = "Cambio aplicado (admin/gerencia)", body = SubmissionOutcome),
        (status = 400, description = "Datos inválidos"),
        (status = 409, description = "Ya hay una solicitud pendiente del mismo tipo")
    ),
    params(
        ("id" = i64, Path, description = "ID del inmueble")
    ),
    security(("api_jwt" = []))
)]
pub async fn change_availability(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Path(property_id): Path<i64>,
    Json(payload): Json<AvailabilityPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let action = required(payload.action, "action").map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;
    let justification = required(payload.justification, "justification")
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let outcome = app_state
        .permission_service
        .change_availability(&user.0, property_id, action, &justification, Utc::now())
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((outcome_status(&outcome), Json(outcome)))
}
