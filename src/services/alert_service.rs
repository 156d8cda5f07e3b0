// src/services/alert_service.rs

use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Utc};

use crate::{
    common::error::AppError,
    db::{AccessScope, PropertyStore, UserStore},
    models::{
        alert::{
            AlertOutcome, ChannelStatus, InactivityAlert, ManualNotifyResult, ManualNotifyStatus,
            PropertyScanError, ScanSummary,
        },
        event::DomainEvent,
        property::{AlertResolution, Property},
        user::User,
    },
    services::{
        dedup::{NotificationDeduplicator, NotifyDecision},
        events::EventPublisher,
        inactivity::{alerts_for, classify},
        notification_service::NotificationDispatcher,
        templates::AlertTemplates,
    },
};

#[derive(Clone)]
pub struct AlertService {
    properties: Arc<dyn PropertyStore>,
    users: Arc<dyn UserStore>,
    dedup: NotificationDeduplicator,
    dispatcher: NotificationDispatcher,
    templates: Arc<AlertTemplates>,
    events: Arc<dyn EventPublisher>,
}

impl AlertService {
    pub fn new(
        properties: Arc<dyn PropertyStore>,
        users: Arc<dyn UserStore>,
        dedup: NotificationDeduplicator,
        dispatcher: NotificationDispatcher,
        templates: Arc<AlertTemplates>,
        events: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            properties,
            users,
            dedup,
            dispatcher,
            templates,
            events,
        }
    }

    pub fn channel_status(&self) -> ChannelStatus {
        self.dispatcher.channel_status()
    }

    /// Recorre los inmuebles disponibles (el más antiguo primero) y notifica
    /// los que superan su umbral. Un fallo en un inmueble queda en el resumen
    /// y el recorrido sigue; siempre se devuelve un resumen.
    pub async fn scan_and_notify(&self, now: DateTime<Utc>) -> ScanSummary {
        let mut summary = ScanSummary::default();

        let properties = match self.properties.list_available_oldest_first().await {
            Ok(properties) => properties,
            Err(e) => {
                summary.errors.push(scan_error(None, &e));
                return summary;
            }
        };
        tracing::info!("🔎 Revisando inactividad de {} inmuebles", properties.len());

        let mut owners: HashMap<i64, User> = HashMap::new();

        for property in &properties {
            summary.checked += 1;

            let owner = match self.cached_owner(&mut owners, property).await {
                Ok(owner) => owner,
                Err(e) => {
                    summary.errors.push(scan_error(Some(property.id), &e));
                    continue;
                }
            };

            let alerts = match alerts_for(property, &owner, now, &self.templates) {
                Ok(alerts) => alerts,
                Err(e) => {
                    summary.errors.push(scan_error(Some(property.id), &e));
                    continue;
                }
            };
            if alerts.is_empty() {
                continue;
            }
            summary.stale += 1;

            for alert in &alerts {
                match self.notify_alert(alert, now).await {
                    Ok(AlertOutcome::Dispatched { report, ledger_error }) => {
                        summary.absorb(report);
                        if let Some(message) = ledger_error {
                            summary.errors.push(PropertyScanError {
                                property_id: Some(property.id),
                                message,
                            });
                        }
                    }
                    Ok(AlertOutcome::CoolingDown { .. }) => summary.skipped_cooldown += 1,
                    Err(e) => summary.errors.push(scan_error(Some(property.id), &e)),
                }
            }
        }

        tracing::info!(
            "✅ Revisión terminada: {} revisados, {} inactivos, {} notificados, {} en enfriamiento, {} errores",
            summary.checked,
            summary.stale,
            summary.notified,
            summary.skipped_cooldown,
            summary.errors.len()
        );
        summary
    }

    /// Notificación manual de un inmueble. Respeta el enfriamiento.
    pub async fn manual_notify(
        &self,
        actor: &User,
        property_id: i64,
        now: DateTime<Utc>,
    ) -> Result<ManualNotifyResult, AppError> {
        let (property, owner) = self.load_in_scope(actor, property_id).await?;

        let alerts = alerts_for(&property, &owner, now, &self.templates)?;
        let mut outcomes = Vec::with_capacity(alerts.len());
        for alert in &alerts {
            outcomes.push(self.notify_alert(alert, now).await?);
        }

        let status = if outcomes.is_empty() {
            ManualNotifyStatus::NotStale
        } else if outcomes.iter().any(|o| matches!(o, AlertOutcome::Dispatched { .. })) {
            ManualNotifyStatus::Dispatched
        } else {
            ManualNotifyStatus::CoolingDown
        };

        Ok(ManualNotifyResult {
            property_id,
            status,
            outcomes,
        })
    }

    /// Atiende la alerta: cambia estado o refresca fechas y limpia el registro.
    pub async fn resolve(
        &self,
        actor: &User,
        property_id: i64,
        resolution: AlertResolution,
        now: DateTime<Utc>,
    ) -> Result<Property, AppError> {
        let (property, _) = self.load_in_scope(actor, property_id).await?;

        if !resolution.applies_to(property.operation_type) {
            return Err(AppError::InvalidInput(format!(
                "la resolución '{}' no aplica a un inmueble de {}",
                format!("{:?}", resolution).to_lowercase(),
                property.operation_type.label().to_lowercase()
            )));
        }

        let updated = self
            .properties
            .apply_resolution(property_id, resolution, now)
            .await?
            .ok_or(AppError::PropertyNotFound(property_id))?;

        let cleared = self.dedup.clear(property_id).await?;
        tracing::info!(
            "🏷️ Inmueble {} resuelto como {:?} por el usuario {} ({} registros de alerta limpiados)",
            property_id,
            resolution,
            actor.id,
            cleared
        );

        if updated.status != property.status {
            self.events.publish(DomainEvent::PropertyStatusChanged {
                property_id,
                previous_status: property.status,
                new_status: updated.status,
                changed_by: actor.id,
            });
        }

        Ok(updated)
    }

    /// Inmuebles inactivos visibles para el usuario, el más inactivo primero.
    pub async fn list_alerts(&self, actor: &User, now: DateTime<Utc>) -> Result<Vec<InactivityAlert>, AppError> {
        let scope = AccessScope::for_user(actor);
        let properties = self.properties.list_available_in_scope(&scope).await?;

        let mut owners: HashMap<i64, User> = HashMap::new();
        let mut alerts = Vec::new();
        for property in &properties {
            let owner = self.cached_owner(&mut owners, property).await?;
            if let Some(alert) = classify(property, &owner, now, &self.templates)? {
                alerts.push(alert);
            }
        }

        alerts.sort_by(|a, b| b.days_inactive.cmp(&a.days_inactive));
        Ok(alerts)
    }

    async fn notify_alert(&self, alert: &InactivityAlert, now: DateTime<Utc>) -> Result<AlertOutcome, AppError> {
        let _guard = self.dedup.lock(alert.property_id, alert.alert_type).await;

        if let NotifyDecision::CoolingDown { last_notified_at } =
            self.dedup.should_notify(alert.property_id, alert.alert_type, now).await?
        {
            tracing::debug!(
                "Alerta {} del inmueble {} en enfriamiento desde {}",
                alert.alert_type.as_str(),
                alert.property_id,
                last_notified_at
            );
            return Ok(AlertOutcome::CoolingDown {
                alert_type: alert.alert_type,
                last_notified_at,
            });
        }

        let report = self.dispatcher.dispatch(alert).await?;

        // Lo enviado ya salió: un fallo del registro no anula el reporte
        let ledger_error = match self.dedup.record(&report, now).await {
            Ok(_) => None,
            Err(e) => {
                tracing::error!(
                    "❌ No se pudo registrar la alerta {} del inmueble {}: {:?}",
                    alert.alert_type.as_str(),
                    alert.property_id,
                    e
                );
                Some(e.to_string())
            }
        };

        self.events.publish(DomainEvent::AlertDispatched {
            property_id: alert.property_id,
            alert_type: alert.alert_type,
            sent: report.total_sent,
            failed: report.total_failed,
        });

        Ok(AlertOutcome::Dispatched { report, ledger_error })
    }

    async fn load_in_scope(&self, actor: &User, property_id: i64) -> Result<(Property, User), AppError> {
        let property = self
            .properties
            .find_by_id(property_id)
            .await?
            .ok_or(AppError::PropertyNotFound(property_id))?;

        let owner = self
            .users
            .find_by_id(property.owner_id)
            .await?
            .ok_or(AppError::UserNotFound)?;

        if !AccessScope::for_user(actor).permits(owner.id, owner.role) {
            return Err(AppError::Forbidden(format!(
                "el inmueble {} está fuera de tu alcance",
                property_id
            )));
        }

        Ok((property, owner))
    }

    async fn cached_owner(&self, cache: &mut HashMap<i64, User>, property: &Property) -> Result<User, AppError> {
        if let Some(owner) = cache.get(&property.owner_id) {
            return Ok(owner.clone());
        }
        let owner = self
            .users
            .find_by_id(property.owner_id)
            .await?
            .ok_or(AppError::UserNotFound)?;
        cache.insert(owner.id, owner.clone());
        Ok(owner)
    }
}

fn scan_error(property_id: Option<i64>, error: &AppError) -> PropertyScanError {
    match property_id {
        Some(id) => tracing::error!("❌ Error procesando el inmueble {}: {:?}", id, error),
        None => tracing::error!("❌ La revisión de inactividad falló: {:?}", error),
    }
    PropertyScanError {
        property_id,
        message: error.to_string(),
    }
}
