// src/models/alert.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::models::property::OperationType;
use crate::models::user::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "alert_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    AlquilerSinMovimiento,
    VentaSinMovimiento,
}

impl AlertType {
    pub fn as_str(self) -> &'static str {
        match self {
            AlertType::AlquilerSinMovimiento => "alquiler_sin_movimiento",
            AlertType::VentaSinMovimiento => "venta_sin_movimiento",
        }
    }
}

// --- Registro de deduplicación (tabla 'alert_notifications') ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AlertNotification {
    pub property_id: i64,
    pub alert_type: AlertType,
    pub notified_at: DateTime<Utc>,
    pub whatsapp_sent: bool,
    pub message_sid: Option<String>,
}

/// Datos de contacto del responsable, copiados al descriptor de la alerta.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AgentContact {
    pub id: i64,
    pub name: String,
    pub role: Role,
    pub email: Option<String>,
    /// WhatsApp si existe, si no el teléfono.
    pub whatsapp: Option<String>,
}

/// Descriptor producido por el clasificador de inactividad.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InactivityAlert {
    pub property_id: i64,
    pub property_title: String,
    pub location: String,
    pub price: Decimal,
    pub operation_type: OperationType,
    pub alert_type: AlertType,
    pub owner: AgentContact,
    pub reference_date: DateTime<Utc>,
    #[schema(example = 95)]
    pub days_inactive: i64,
    #[schema(example = 3)]
    pub months_inactive: i64,
    pub title: String,
    pub description: String,
}

// --- Resultado de envío ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Whatsapp,
    Email,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Sent,
    Failed,
    NotConfigured,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryResult {
    pub recipient_id: i64,
    pub recipient_name: String,
    pub channel: Channel,
    pub status: DeliveryStatus,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DeliveryResult {
    pub fn sent(recipient_id: i64, recipient_name: &str, channel: Channel, message_id: String) -> Self {
        Self {
            recipient_id,
            recipient_name: recipient_name.to_string(),
            channel,
            status: DeliveryStatus::Sent,
            success: true,
            message_id: Some(message_id),
            error: None,
        }
    }

    pub fn failed(recipient_id: i64, recipient_name: &str, channel: Channel, error: String) -> Self {
        Self {
            recipient_id,
            recipient_name: recipient_name.to_string(),
            channel,
            status: DeliveryStatus::Failed,
            success: false,
            message_id: None,
            error: Some(error),
        }
    }

    pub fn not_configured(recipient_id: i64, recipient_name: &str, channel: Channel) -> Self {
        Self {
            recipient_id,
            recipient_name: recipient_name.to_string(),
            channel,
            status: DeliveryStatus::NotConfigured,
            success: false,
            message_id: None,
            error: Some("not configured".to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DispatchReport {
    pub property_id: i64,
    pub alert_type: AlertType,
    pub results: Vec<DeliveryResult>,
    pub total_sent: usize,
    pub total_failed: usize,
    pub total_not_configured: usize,
}

impl DispatchReport {
    pub fn from_results(property_id: i64, alert_type: AlertType, results: Vec<DeliveryResult>) -> Self {
        let count = |status: DeliveryStatus| results.iter().filter(|r| r.status == status).count();
        Self {
            property_id,
            alert_type,
            total_sent: count(DeliveryStatus::Sent),
            total_failed: count(DeliveryStatus::Failed),
            total_not_configured: count(DeliveryStatus::NotConfigured),
            results,
        }
    }

    pub fn any_sent(&self) -> bool {
        self.total_sent > 0
    }

    pub fn whatsapp_sent(&self) -> bool {
        self.results
            .iter()
            .any(|r| r.channel == Channel::Whatsapp && r.status == DeliveryStatus::Sent)
    }

    /// SID del primer WhatsApp entregado (se guarda en el registro).
    pub fn first_message_sid(&self) -> Option<String> {
        self.results
            .iter()
            .find(|r| r.channel == Channel::Whatsapp && r.status == DeliveryStatus::Sent)
            .and_then(|r| r.message_id.clone())
    }
}

// --- Resultados de los puntos de entrada ---

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PropertyScanError {
    /// Vacío si falló el recorrido completo (p. ej. al listar los inmuebles).
    pub property_id: Option<i64>,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScanSummary {
    pub checked: usize,
    pub stale: usize,
    pub notified: usize,
    pub skipped_cooldown: usize,
    pub sent: usize,
    pub failed: usize,
    pub not_configured: usize,
    pub errors: Vec<PropertyScanError>,
    pub reports: Vec<DispatchReport>,
}

impl ScanSummary {
    pub fn absorb(&mut self, report: DispatchReport) {
        self.notified += 1;
        self.sent += report.total_sent;
        self.failed += report.total_failed;
        self.not_configured += report.total_not_configured;
        self.reports.push(report);
    }
}

/// Qué pasó con una alerta concreta al intentar notificarla.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AlertOutcome {
    #[serde(rename_all = "camelCase")]
    Dispatched {
        report: DispatchReport,
        /// Los envíos salieron pero no quedaron en el registro.
        #[serde(skip_serializing_if = "Option::is_none")]
        ledger_error: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    CoolingDown { alert_type: AlertType, last_notified_at: DateTime<Utc> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ManualNotifyStatus {
    Dispatched,
    CoolingDown,
    NotStale,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ManualNotifyResult {
    pub property_id: i64,
    pub status: ManualNotifyStatus,
    pub outcomes: Vec<AlertOutcome>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChannelStatus {
    pub whatsapp_configured: bool,
    pub email_configured: bool,
}
