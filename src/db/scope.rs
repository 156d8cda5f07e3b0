// src/db/scope.rs

use sqlx::{Postgres, QueryBuilder};

use crate::models::user::{Role, User};

/// Alcance de visibilidad según el rol del usuario que consulta.
///
/// Cada variante se traduce a un predicado parametrizado fijo; los nombres de
/// columna son constantes del repositorio, nunca entrada del usuario.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessScope {
    /// Asesor: sólo lo propio.
    Own { user_id: i64 },
    /// Admin: lo propio y lo de roles inferiores.
    Team { user_id: i64, role: Role },
    /// Gerencia: todo.
    All,
}

impl AccessScope {
    pub fn for_user(user: &User) -> Self {
        match user.role {
            Role::Asesor => AccessScope::Own { user_id: user.id },
            Role::Admin => AccessScope::Team { user_id: user.id, role: user.role },
            Role::Gerencia => AccessScope::All,
        }
    }

    /// Versión en memoria del mismo predicado.
    pub fn permits(&self, owner_id: i64, owner_role: Role) -> bool {
        match *self {
            AccessScope::Own { user_id } => owner_id == user_id,
            AccessScope::Team { user_id, role } => owner_id == user_id || owner_role < role,
            AccessScope::All => true,
        }
    }

    /// Agrega el predicado al `WHERE` en construcción.
    pub fn push_predicate<'args>(
        &self,
        qb: &mut QueryBuilder<'args, Postgres>,
        owner_column: &'static str,
        role_column: &'static str,
    ) {
        match *self {
            AccessScope::Own { user_id } => {
                qb.push(owner_column).push(" = ").push_bind(user_id);
            }
            AccessScope::Team { user_id, role } => {
                qb.push("(")
                    .push(owner_column)
                    .push(" = ")
                    .push_bind(user_id)
                    .push(" OR ")
                    .push(role_column)
                    .push(" < ")
                    .push_bind(role)
                    .push(")");
            }
            AccessScope::All => {
                qb.push("TRUE");
            }
        }
    }
}
