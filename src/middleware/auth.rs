// src/middleware/auth.rs

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

use subtle::ConstantTimeEq;

use crate::{common::error::AppError, config::AppState, models::user::User};

pub const CRON_SECRET_HEADER: &str = "x-cron-secret";

// Guarda JWT: valida el Bearer y deja al usuario en las extensions
pub async fn auth_guard(
    State(app_state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let (mut parts, body) = request.into_parts();

    let TypedHeader(Authorization(bearer)) =
        TypedHeader::<Authorization<Bearer>>::from_request_parts(&mut parts, &app_state)
            .await
            .map_err(|_| AppError::InvalidToken)?;

    let user = app_state
        .auth_service
        .validate_token(bearer.token())
        .await
        .map_err(|e| match e {
            // Un token de un usuario borrado es simplemente un token inválido
            AppError::UserNotFound => AppError::InvalidToken,
            other => other,
        })?;

    parts.extensions.insert(AuthenticatedUser(user));
    Ok(next.run(Request::from_parts(parts, body)).await)
}

/// Guarda del disparador programado. Acepta `x-cron-secret` o
/// `Authorization: Bearer <CRON_SECRET>`.
pub async fn cron_guard(
    State(app_state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(expected) = app_state.config.cron_secret.as_deref() else {
        tracing::warn!("Llamada al cron rechazada: CRON_SECRET no está configurado");
        return Err(AppError::InvalidToken);
    };

    let headers = request.headers();
    let provided = headers
        .get(CRON_SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
        .or_else(|| {
            headers
                .get(axum::http::header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("Bearer "))
        });

    match provided {
        Some(secret) if secret_matches(secret.as_bytes(), expected.as_bytes()) => Ok(next.run(request).await),
        _ => Err(AppError::InvalidToken),
    }
}

/// Tiempo constante: recorre siempre el secreto completo, sin cortar por
/// longitud ni por el primer byte distinto.
fn secret_matches(provided: &[u8], expected: &[u8]) -> bool {
    let mut equal = provided.len().ct_eq(&expected.len());
    for (i, byte) in expected.iter().enumerate() {
        equal &= byte.ct_eq(provided.get(i).unwrap_or(&0));
    }
    bool::from(equal)
}

// Extractor para obtener el usuario autenticado directamente en los handlers
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or(AppError::InvalidToken)
    }
}
