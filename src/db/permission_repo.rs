// src/db/permission_repo.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::{
    common::error::AppError,
    db::{AccessScope, ApprovalRecord, PermissionStore, ReviewDecision},
    models::{
        permission::{PermissionDraft, PermissionHistoryFilter, PermissionRequest, RequestType},
        property::{Property, PropertyStatus},
    },
};

#[derive(Clone)]
pub struct PermissionRepository {
    pool: PgPool,
}

impl PermissionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PermissionStore for PermissionRepository {
    async fn insert(
        &self,
        asesor_id: i64,
        draft: &PermissionDraft,
        now: DateTime<Utc>,
    ) -> Result<PermissionRequest, AppError> {
        let request = sqlx::query_as::<_, PermissionRequest>(
            r#"
            INSERT INTO permission_requests (inmueble_id, asesor_id, request_type, justification, status, created_at)
            VALUES ($1, $2, $3, $4, 'pendiente', $5)
            RETURNING *
            "#,
        )
        .bind(draft.inmueble_id)
        .bind(asesor_id)
        .bind(draft.request_type)
        .bind(&draft.justification)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            // El índice único parcial cubre la carrera entre dos envíos simultáneos
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return AppError::DuplicatePendingRequest {
                        inmueble_id: draft.inmueble_id,
                        request_type: draft.request_type,
                    };
                }
            }
            e.into()
        })?;

        Ok(request)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<PermissionRequest>, AppError> {
        let request = sqlx::query_as::<_, PermissionRequest>("SELECT * FROM permission_requests WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(request)
    }

    async fn find_pending(
        &self,
        inmueble_id: i64,
        request_type: RequestType,
    ) -> Result<Option<PermissionRequest>, AppError> {
        let request = sqlx::query_as::<_, PermissionRequest>(
            r#"
            SELECT * FROM permission_requests
            WHERE inmueble_id = $1 AND request_type = $2 AND status = 'pendiente'
            "#,
        )
        .bind(inmueble_id)
        .bind(request_type)
        .fetch_optional(&self.pool)
        .await?;

        Ok(request)
    }

    async fn approve(
        &self,
        decision: &ReviewDecision,
        target_status: PropertyStatus,
    ) -> Result<Option<ApprovalRecord>, AppError> {
        // Solicitud + inmueble en la misma transacción
        let mut tx = self.pool.begin().await?;

        // 1. Cierra la solicitud sólo si sigue pendiente
        let request = sqlx::query_as::<_, PermissionRequest>(
            r#"
            UPDATE permission_requests
            SET status = 'aprobado', reviewed_by = $2, review_date = $3, admin_notes = $4
            WHERE id = $1 AND status = 'pendiente'
            RETURNING *
            "#,
        )
        .bind(decision.request_id)
        .bind(decision.reviewer_id)
        .bind(decision.reviewed_at)
        .bind(decision.notes.as_deref())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(request) = request else {
            // Nada que aplicar; el drop del tx hace rollback
            return Ok(None);
        };

        // 2. Estado anterior del inmueble (bloqueando la fila)
        let previous_status = sqlx::query_scalar::<_, PropertyStatus>(
            "SELECT status FROM properties WHERE id = $1 FOR UPDATE",
        )
        .bind(request.inmueble_id)
        .fetch_one(&mut *tx)
        .await?;

        // 3. Aplica el nuevo estado
        let property = sqlx::query_as::<_, Property>(
            r#"
            UPDATE properties
            SET status = $2, updated_at = $3
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(request.inmueble_id)
        .bind(target_status)
        .bind(decision.reviewed_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some(ApprovalRecord {
            request,
            previous_status,
            property,
        }))
    }

    async fn reject(
        &self,
        decision: &ReviewDecision,
        reason: &str,
    ) -> Result<Option<PermissionRequest>, AppError> {
        let request = sqlx::query_as::<_, PermissionRequest>(
            r#"
            UPDATE permission_requests
            SET status = 'rechazado', reviewed_by = $2, review_date = $3,
                rejection_reason = $4, admin_notes = COALESCE($5, admin_notes)
            WHERE id = $1 AND status = 'pendiente'
            RETURNING *
            "#,
        )
        .bind(decision.request_id)
        .bind(decision.reviewer_id)
        .bind(decision.reviewed_at)
        .bind(reason)
        .bind(decision.notes.as_deref())
        .fetch_optional(&self.pool)
        .await?;

        Ok(request)
    }

    async fn list(
        &self,
        scope: &AccessScope,
        filter: &PermissionHistoryFilter,
    ) -> Result<Vec<PermissionRequest>, AppError> {
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT r.* FROM permission_requests r JOIN users u ON u.id = r.asesor_id WHERE ",
        );
        scope.push_predicate(&mut qb, "r.asesor_id", "u.role");

        if let Some(status) = filter.status {
            qb.push(" AND r.status = ").push_bind(status);
        }
        if let Some(inmueble_id) = filter.inmueble_id {
            qb.push(" AND r.inmueble_id = ").push_bind(inmueble_id);
        }
        qb.push(" ORDER BY r.created_at DESC, r.id DESC");

        let requests = qb.build_query_as::<PermissionRequest>().fetch_all(&self.pool).await?;

        Ok(requests)
    }
}
