// src/services/dedup.rs

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use chrono::{DateTime, Duration, Utc};
use tokio::sync::OwnedMutexGuard;

use crate::{
    common::error::AppError,
    db::AlertLedger,
    models::alert::{AlertNotification, AlertType, DispatchReport},
};

pub const COOLDOWN_HOURS: i64 = 24;

type LedgerKey = (i64, AlertType);

/// Respuesta de la consulta de enfriamiento.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyDecision {
    Proceed,
    CoolingDown { last_notified_at: DateTime<Utc> },
}

impl NotifyDecision {
    pub fn proceeds(self) -> bool {
        matches!(self, NotifyDecision::Proceed)
    }
}

/// Evita repetir la misma alerta (inmueble + tipo) dentro del enfriamiento.
#[derive(Clone)]
pub struct NotificationDeduplicator {
    ledger: Arc<dyn AlertLedger>,
    cooldown: Duration,
    locks: Arc<Mutex<HashMap<LedgerKey, Arc<tokio::sync::Mutex<()>>>>>,
}

impl NotificationDeduplicator {
    pub fn new(ledger: Arc<dyn AlertLedger>) -> Self {
        Self {
            ledger,
            cooldown: Duration::hours(COOLDOWN_HOURS),
            locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Serializa comprobación → envío → registro para una misma clave dentro
    /// de esta instancia. El guard se suelta al terminar el envío.
    pub async fn lock(&self, property_id: i64, alert_type: AlertType) -> OwnedMutexGuard<()> {
        let slot = {
            let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            // Descarta los candados que ya nadie sostiene
            locks.retain(|_, slot| Arc::strong_count(slot) > 1);
            locks
                .entry((property_id, alert_type))
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
                .clone()
        };
        slot.lock_owned().await
    }

    /// Se puede notificar si no hay registro o si el último envío tiene
    /// 24 horas o más.
    pub async fn should_notify(
        &self,
        property_id: i64,
        alert_type: AlertType,
        now: DateTime<Utc>,
    ) -> Result<NotifyDecision, AppError> {
        let decision = match self.ledger.find(property_id, alert_type).await? {
            Some(entry) if now - entry.notified_at < self.cooldown => NotifyDecision::CoolingDown {
                last_notified_at: entry.notified_at,
            },
            _ => NotifyDecision::Proceed,
        };
        Ok(decision)
    }

    /// Registra un envío. Sólo cuenta si al menos un canal entregó algo.
    pub async fn record(&self, report: &DispatchReport, now: DateTime<Utc>) -> Result<bool, AppError> {
        if !report.any_sent() {
            return Ok(false);
        }

        let entry = AlertNotification {
            property_id: report.property_id,
            alert_type: report.alert_type,
            notified_at: now,
            whatsapp_sent: report.whatsapp_sent(),
            message_sid: report.first_message_sid(),
        };
        self.ledger.upsert(&entry).await?;
        Ok(true)
    }

    pub async fn clear(&self, property_id: i64) -> Result<u64, AppError> {
        self.ledger.clear_property(property_id).await
    }
}
