// src/db/property_repo.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::{
    common::error::AppError,
    db::{AccessScope, PropertyStore},
    models::property::{AlertResolution, Property, PropertyStatus},
};

#[derive(Clone)]
pub struct PropertyRepository {
    pool: PgPool,
}

impl PropertyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PropertyStore for PropertyRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Property>, AppError> {
        let property = sqlx::query_as::<_, Property>("SELECT * FROM properties WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(property)
    }

    async fn list_available_oldest_first(&self) -> Result<Vec<Property>, AppError> {
        let properties = sqlx::query_as::<_, Property>(
            r#"
            SELECT * FROM properties
            WHERE status = 'disponible'
            ORDER BY updated_at ASC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(properties)
    }

    async fn list_available_in_scope(&self, scope: &AccessScope) -> Result<Vec<Property>, AppError> {
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT p.* FROM properties p JOIN users u ON u.id = p.owner_id WHERE p.status = 'disponible' AND ",
        );
        scope.push_predicate(&mut qb, "p.owner_id", "u.role");
        qb.push(" ORDER BY p.updated_at ASC, p.id ASC");

        let properties = qb.build_query_as::<Property>().fetch_all(&self.pool).await?;

        Ok(properties)
    }

    async fn update_status(
        &self,
        id: i64,
        status: PropertyStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<Property>, AppError> {
        let property = sqlx::query_as::<_, Property>(
            r#"
            UPDATE properties
            SET status = $2, updated_at = $3
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(property)
    }

    async fn apply_resolution(
        &self,
        id: i64,
        resolution: AlertResolution,
        now: DateTime<Utc>,
    ) -> Result<Option<Property>, AppError> {
        // Una sentencia fija por variante: vender/alquilar mueve la fecha de referencia
        // correspondiente, actualizar sólo refresca updated_at.
        let sql = match resolution {
            AlertResolution::Vendido => {
                "UPDATE properties SET status = 'vendido', last_sale_date = $2, updated_at = $2 WHERE id = $1 RETURNING *"
            }
            AlertResolution::Alquilado => {
                "UPDATE properties SET status = 'alquilado', last_rental_date = $2, updated_at = $2 WHERE id = $1 RETURNING *"
            }
            AlertResolution::Actualizado => {
                "UPDATE properties SET updated_at = $2 WHERE id = $1 RETURNING *"
            }
        };

        let property = sqlx::query_as::<_, Property>(sql)
            .bind(id)
            .bind(now)
            .fetch_optional(&self.pool)
            .await?;

        Ok(property)
    }
}
