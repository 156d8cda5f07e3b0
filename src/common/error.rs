// src/common/error.rs

use std::collections::HashMap;
use std::sync::LazyLock;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

use crate::common::i18n::I18nStore;
use crate::middleware::i18n::Locale;
use crate::models::permission::RequestType;

static DEFAULT_I18N: LazyLock<I18nStore> = LazyLock::new(I18nStore::new);

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Error de validación")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Falta el campo obligatorio {0}")]
    MissingField(&'static str),

    #[error("Entrada inválida: {0}")]
    InvalidInput(String),

    #[error("Inmueble {0} no encontrado")]
    PropertyNotFound(i64),

    #[error("Solicitud {0} no encontrada")]
    PermissionRequestNotFound(i64),

    #[error("Usuario no encontrado")]
    UserNotFound,

    #[error("Solicitud pendiente duplicada para el inmueble {inmueble_id}")]
    DuplicatePendingRequest {
        inmueble_id: i64,
        request_type: RequestType,
    },

    #[error("La solicitud {0} ya fue revisada")]
    RequestAlreadyReviewed(i64),

    #[error("Acceso denegado: {0}")]
    Forbidden(String),

    #[error("Token inválido")]
    InvalidToken,

    #[error("Error de base de datos")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Error interno del servidor")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Error de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) | AppError::MissingField(_) | AppError::InvalidInput(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::PropertyNotFound(_)
            | AppError::PermissionRequestNotFound(_)
            | AppError::UserNotFound => StatusCode::NOT_FOUND,
            AppError::DuplicatePendingRequest { .. } | AppError::RequestAlreadyReviewed(_) => {
                StatusCode::CONFLICT
            }
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            AppError::DatabaseError(_) | AppError::InternalServerError(_) | AppError::JwtError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Código estable (también es la clave del catálogo i18n).
    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "validation_error",
            AppError::MissingField(_) => "missing_field",
            AppError::InvalidInput(_) => "invalid_input",
            AppError::PropertyNotFound(_) => "property_not_found",
            AppError::PermissionRequestNotFound(_) => "permission_request_not_found",
            AppError::UserNotFound => "user_not_found",
            AppError::DuplicatePendingRequest { .. } => "duplicate_pending_request",
            AppError::RequestAlreadyReviewed(_) => "request_already_reviewed",
            AppError::Forbidden(_) => "forbidden",
            AppError::InvalidToken => "invalid_token",
            AppError::DatabaseError(_) | AppError::InternalServerError(_) | AppError::JwtError(_) => {
                "internal_error"
            }
        }
    }

    fn message_args(&self) -> Vec<String> {
        match self {
            AppError::MissingField(field) => vec![field.to_string()],
            AppError::InvalidInput(msg) | AppError::Forbidden(msg) => vec![msg.clone()],
            AppError::PropertyNotFound(id)
            | AppError::PermissionRequestNotFound(id)
            | AppError::RequestAlreadyReviewed(id) => vec![id.to_string()],
            AppError::DuplicatePendingRequest { inmueble_id, request_type } => vec![
                inmueble_id.to_string(),
                serde_json::to_value(request_type)
                    .ok()
                    .and_then(|v| v.as_str().map(str::to_string))
                    .unwrap_or_default(),
            ],
            _ => Vec::new(),
        }
    }

    pub fn to_api_error(self, locale: &Locale, store: &I18nStore) -> ApiError {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!("Error interno del servidor: {:?}", self);
        }

        let details = match &self {
            AppError::ValidationError(errors) => {
                let mut details = HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                        })
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                Some(json!(details))
            }
            _ => None,
        };

        ApiError {
            status,
            code: self.code(),
            error: store.translate(&locale.0, self.code(), &self.message_args()),
            details,
        }
    }
}

/// Error ya traducido, listo para salir como JSON.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub error: String,
    pub details: Option<Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = json!({ "error": self.error, "code": self.code });
        if let Some(details) = self.details {
            body["details"] = details;
        }
        (self.status, Json(body)).into_response()
    }
}

// Para rechazos de middleware/extractores, donde no hay Locale disponible.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.to_api_error(&Locale::default(), &DEFAULT_I18N).into_response()
    }
}
