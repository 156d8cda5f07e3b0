// src/middleware/rbac.rs

use std::marker::PhantomData;

use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::user::{Role, User},
};

/// Rol mínimo que exige una ruta.
pub trait RoleRequirement: Send + Sync + 'static {
    fn minimum() -> Role;
}

/// Extractor guardián: deja pasar sólo a usuarios con rol >= `T::minimum()`.
pub struct RequireRole<T>(pub User, PhantomData<T>);

impl<T> RequireRole<T> {
    pub fn user(&self) -> &User {
        &self.0
    }
}

impl<T, S> FromRequestParts<S> for RequireRole<T>
where
    T: RoleRequirement,
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let Ok(locale) = Locale::from_request_parts(parts, state).await;

        let AuthenticatedUser(user) = parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or(AppError::InvalidToken)
            .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

        let required = T::minimum();
        if user.role < required {
            return Err(AppError::Forbidden(format!("se requiere el rol '{}' o superior", required.label()))
                .to_api_error(&locale, &app_state.i18n_store));
        }

        Ok(RequireRole(user, PhantomData))
    }
}

// ---
// REQUISITOS (TIPOS)
// ---

pub struct AdminOrAbove;
impl RoleRequirement for AdminOrAbove {
    fn minimum() -> Role {
        Role::Admin
    }
}
