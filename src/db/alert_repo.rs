// src/db/alert_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;

use crate::{
    common::error::AppError,
    db::AlertLedger,
    models::alert::{AlertNotification, AlertType},
};

// Registro persistente de notificaciones enviadas (deduplicación)
#[derive(Clone)]
pub struct AlertNotificationRepository {
    pool: PgPool,
}

impl AlertNotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AlertLedger for AlertNotificationRepository {
    async fn find(&self, property_id: i64, alert_type: AlertType) -> Result<Option<AlertNotification>, AppError> {
        let entry = sqlx::query_as::<_, AlertNotification>(
            r#"
            SELECT property_id, alert_type, notified_at, whatsapp_sent, message_sid
            FROM alert_notifications
            WHERE property_id = $1 AND alert_type = $2
            "#,
        )
        .bind(property_id)
        .bind(alert_type)
        .fetch_optional(&self.pool)
        .await?;

        Ok(entry)
    }

    async fn upsert(&self, entry: &AlertNotification) -> Result<(), AppError> {
        // UPSERT por la clave compuesta; último en escribir gana
        sqlx::query(
            r#"
            INSERT INTO alert_notifications (property_id, alert_type, notified_at, whatsapp_sent, message_sid)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (property_id, alert_type)
            DO UPDATE SET
                notified_at = EXCLUDED.notified_at,
                whatsapp_sent = EXCLUDED.whatsapp_sent,
                message_sid = EXCLUDED.message_sid
            "#,
        )
        .bind(entry.property_id)
        .bind(entry.alert_type)
        .bind(entry.notified_at)
        .bind(entry.whatsapp_sent)
        .bind(entry.message_sid.as_deref())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn clear_property(&self, property_id: i64) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM alert_notifications WHERE property_id = $1")
            .bind(property_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
