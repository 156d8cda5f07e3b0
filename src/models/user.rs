// src/models/user.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Jerarquía de roles. El orden de declaración es el orden de autoridad
/// (asesor < admin < gerencia) y coincide con el ENUM de Postgres.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type, ToSchema,
)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Asesor,
    Admin,
    Gerencia,
}

static ROLE_LADDER: [Role; 3] = [Role::Asesor, Role::Admin, Role::Gerencia];

impl Role {
    /// Roles estrictamente por encima de `self`.
    /// Se usa tanto para escalar notificaciones como para decidir quién adjudica.
    pub fn roles_above(self) -> &'static [Role] {
        let idx = ROLE_LADDER.iter().position(|r| *r == self).unwrap_or(ROLE_LADDER.len());
        &ROLE_LADDER[(idx + 1).min(ROLE_LADDER.len())..]
    }

    /// ¿Puede este rol revisar una solicitud creada por `requester`?
    pub fn can_adjudicate(self, requester: Role) -> bool {
        requester.roles_above().contains(&self)
    }

    /// Admin y gerencia aplican cambios de estado sin pasar por la cola.
    pub fn is_reviewer(self) -> bool {
        self > Role::Asesor
    }

    pub fn label(self) -> &'static str {
        match self {
            Role::Asesor => "asesor",
            Role::Admin => "admin",
            Role::Gerencia => "gerencia",
        }
    }
}

// Usuario (agente) tal como sale de la tabla 'users'
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[schema(example = 12)]
    pub id: i64,
    #[schema(example = "María Quispe")]
    pub name: String,
    #[schema(example = "maria@inmobiliaria.com")]
    pub email: String,
    pub role: Role,
    #[schema(example = "+51987654321")]
    pub phone: Option<String>,
    pub whatsapp: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Número para WhatsApp: el campo `whatsapp` tiene prioridad sobre `phone`.
    pub fn whatsapp_contact(&self) -> Option<&str> {
        self.whatsapp
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .or_else(|| self.phone.as_deref().filter(|n| !n.trim().is_empty()))
    }

    pub fn email_contact(&self) -> Option<&str> {
        Some(self.email.as_str()).filter(|e| !e.trim().is_empty())
    }
}

// Claims del JWT
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,   // ID del usuario
    pub exp: usize, // Expiración
    pub iat: usize, // Emitido en
}
