// src/handlers/permissions.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
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
    handlers::required,
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        rbac::{AdminOrAbove, RequireRole},
    },
    models::permission::{
        PermissionDraft, PermissionHistoryFilter, PermissionRequest, RequestType, SubmissionOutcome,
    },
};

// =============================================================================
//  ÁREA 1: ENVÍO
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitPermissionPayload {
    #[schema(example = 3)]
    pub inmueble_id: Option<i64>,

    #[schema(example = "disable_request")]
    pub request_type: Option<RequestType>,

    #[validate(length(max = 2000, message = "La justificación no puede superar 2000 caracteres."))]
    #[schema(example = "El propietario pidió pausar la publicación por remodelación")]
    pub justification: Option<String>,
}

// POST /api/permissions
#[utoipa::path(
    post,
    path = "/api/permissions",
    tag = "Permisos",
    request_body = SubmitPermissionPayload,
    responses(
        (status = 201, description = "Solicitud creada (asesor)", body = SubmissionOutcome),
        (status = 200, description = "Cambio aplicado directamente (admin/gerencia)", body = SubmissionOutcome),
        (status = 400, description = "Datos inválidos"),
        (status = 403, description = "El inmueble no pertenece al asesor"),
        (status = 404, description = "Inmueble no encontrado"),
        (status = 409, description = "Ya hay una solicitud pendiente del mismo tipo")
    ),
    security(("api_jwt" = []))
)]
pub async fn submit_request(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Json(payload): Json<SubmitPermissionPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let draft = build_draft(payload).map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let outcome = app_state
        .permission_service
        .submit(&user.0, draft, Utc::now())
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((outcome_status(&outcome), Json(outcome)))
}

fn build_draft(payload: SubmitPermissionPayload) -> Result<PermissionDraft, AppError> {
    let inmueble_id = required(payload.inmueble_id, "inmuebleId")?;
    let request_type = required(payload.request_type, "requestType")?;
    let justification = required(payload.justification, "justification")?;
    Ok(PermissionDraft::new(inmueble_id, request_type, &justification))
}

pub(crate) fn outcome_status(outcome: &SubmissionOutcome) -> StatusCode {
    match outcome {
        SubmissionOutcome::Queued { .. } => StatusCode::CREATED,
        SubmissionOutcome::Applied { .. } => StatusCode::OK,
    }
}

// =============================================================================
//  ÁREA 2: LISTADOS
// =============================================================================

// GET /api/permissions/pending
#[utoipa::path(
    get,
    path = "/api/permissions/pending",
    tag = "Permisos",
    responses(
        (status = 200, description = "Solicitudes pendientes visibles para el usuario", body = Vec<PermissionRequest>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_pending(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let requests = app_state
        .permission_service
        .list_pending(&user.0)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(requests)))
}

// GET /api/permissions/history
#[utoipa::path(
    get,
    path = "/api/permissions/history",
    tag = "Permisos",
    params(PermissionHistoryFilter),
    responses(
        (status = 200, description = "Historial, más reciente primero", body = Vec<PermissionRequest>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_history(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Query(filter): Query<PermissionHistoryFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let requests = app_state
        .permission_service
        .list_history(&user.0, &filter)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(requests)))
}

// =============================================================================
//  ÁREA 3: REVISIÓN
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApprovePayload {
    #[validate(length(max = 1000, message = "Las notas no pueden superar 1000 caracteres."))]
    #[schema(example = "Documentación verificada")]
    pub notes: Option<String>,
}

// POST /api/permissions/{id}/approve
#[utoipa::path(
    post,
    path = "/api/permissions/{id}/approve",
    tag = "Permisos",
    request_body = ApprovePayload,
    responses(
        (status = 200, description = "Solicitud aprobada y cambio aplicado", body = PermissionRequest),
        (status = 403, description = "Requiere admin o gerencia"),
        (status = 404, description = "Solicitud no encontrada"),
        (status = 409, description = "La solicitud ya fue revisada")
    ),
    params(
        ("id" = i64, Path, description = "ID de la solicitud")
    ),
    security(("api_jwt" = []))
)]
pub async fn approve_request(
    State(app_state): State<AppState>,
    locale: Locale,
    reviewer: RequireRole<AdminOrAbove>,
    Path(request_id): Path<i64>,
    Json(payload): Json<ApprovePayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let request = app_state
        .permission_service
        .approve(reviewer.user(), request_id, payload.notes, Utc::now())
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(request)))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RejectPayload {
    #[validate(length(max = 1000, message = "El motivo no puede superar 1000 caracteres."))]
    #[schema(example = "Falta la firma del propietario")]
    pub reason: Option<String>,

    #[validate(length(max = 1000, message = "Las notas no pueden superar 1000 caracteres."))]
    pub notes: Option<String>,
}

// POST /api/permissions/{id}/reject
#[utoipa::path(
    post,
    path = "/api/permissions/{id}/reject",
    tag = "Permisos",
    request_body = RejectPayload,
    responses(
        (status = 200, description = "Solicitud rechazada", body = PermissionRequest),
        (status = 400, description = "Falta el motivo"),
        (status = 403, description = "Requiere admin o gerencia"),
        (status = 404, description = "Solicitud no encontrada"),
        (status = 409, description = "La solicitud ya fue revisada")
    ),
    params(
        ("id" = i64, Path, description = "ID de la solicitud")
    ),
    security(("api_jwt" = []))
)]
pub async fn reject_request(
    State(app_state): State<AppState>,
    locale: Locale,
    reviewer: RequireRole<AdminOrAbove>,
    Path(request_id): Path<i64>,
    Json(payload): Json<RejectPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let reason = required(payload.reason, "reason").map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let request = app_state
        .permission_service
        .reject(reviewer.user(), request_id, &reason, payload.notes, Utc::now())
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(request)))
}
