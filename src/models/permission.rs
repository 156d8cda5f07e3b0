// src/models/permission.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::models::property::{AvailabilityAction, Property, PropertyStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "permission_request_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RequestType {
    DisponibleRequest,
    DisableRequest,
    EnableRequest,
    PropertyApproval,
    NuevoInmueble,
}

impl RequestType {
    /// Estado que toma el inmueble cuando la solicitud se aprueba.
    pub fn target_status(self) -> PropertyStatus {
        match self {
            RequestType::DisableRequest => PropertyStatus::Deshabilitado,
            RequestType::DisponibleRequest
            | RequestType::EnableRequest
            | RequestType::PropertyApproval
            | RequestType::NuevoInmueble => PropertyStatus::Disponible,
        }
    }
}

impl From<AvailabilityAction> for RequestType {
    fn from(action: AvailabilityAction) -> Self {
        match action {
            AvailabilityAction::Disable => RequestType::DisableRequest,
            AvailabilityAction::Enable => RequestType::EnableRequest,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "permission_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PermissionStatus {
    Pendiente,
    Aprobado,
    Rechazado,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PermissionRequest {
    #[schema(example = 10)]
    pub id: i64,
    #[schema(example = 3)]
    pub inmueble_id: i64,
    pub asesor_id: i64,
    pub request_type: RequestType,
    #[schema(example = "El propietario pidió pausar la publicación por remodelación")]
    pub justification: String,
    pub status: PermissionStatus,
    pub reviewed_by: Option<i64>,
    pub review_date: Option<DateTime<Utc>>,
    pub admin_notes: Option<String>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Solicitud ya validada, lista para insertarse.
#[derive(Debug, Clone, Validate)]
pub struct PermissionDraft {
    pub inmueble_id: i64,
    pub request_type: RequestType,
    #[validate(length(min = 10, message = "La justificación debe tener al menos 10 caracteres."))]
    pub justification: String,
}

impl PermissionDraft {
    pub fn new(inmueble_id: i64, request_type: RequestType, justification: &str) -> Self {
        Self {
            inmueble_id,
            request_type,
            justification: justification.trim().to_string(),
        }
    }
}

/// Resultado de una solicitud: queda en cola o se aplica directo (admin/gerencia).
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SubmissionOutcome {
    Queued { request: PermissionRequest },
    Applied { property: Property },
}

/// Filtros del historial.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct PermissionHistoryFilter {
    pub inmueble_id: Option<i64>,
    pub status: Option<PermissionStatus>,
}
