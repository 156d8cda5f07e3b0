use async_trait::async_trait;
use sqlx::PgPool;

use crate::{
    common::error::AppError,
    db::UserStore,
    models::user::{Role, User},
};

// Repositorio de usuarios (tabla 'users')
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for UserRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    async fn find_active_above(&self, role: Role) -> Result<Vec<User>, AppError> {
        // El ENUM user_role está declarado en orden jerárquico, así que '>' es "por encima de".
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM users
            WHERE is_active = TRUE AND role > $1
            ORDER BY role DESC, id ASC
            "#,
        )
        .bind(role)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }
}
