// src/models/event.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::alert::AlertType;
use crate::models::permission::RequestType;
use crate::models::property::PropertyStatus;

/// Eventos de dominio que se difunden a la UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum DomainEvent {
    #[serde(rename = "property.status_changed", rename_all = "camelCase")]
    PropertyStatusChanged {
        property_id: i64,
        previous_status: PropertyStatus,
        new_status: PropertyStatus,
        changed_by: i64,
    },
    #[serde(rename = "permission.created", rename_all = "camelCase")]
    PermissionCreated {
        request_id: i64,
        inmueble_id: i64,
        asesor_id: i64,
        request_type: RequestType,
    },
    #[serde(rename = "permission.approved", rename_all = "camelCase")]
    PermissionApproved {
        request_id: i64,
        inmueble_id: i64,
        asesor_id: i64,
        reviewer_id: i64,
        request_type: RequestType,
    },
    #[serde(rename = "permission.rejected", rename_all = "camelCase")]
    PermissionRejected {
        request_id: i64,
        inmueble_id: i64,
        asesor_id: i64,
        reviewer_id: i64,
        request_type: RequestType,
        reason: String,
    },
    #[serde(rename = "alert.dispatched", rename_all = "camelCase")]
    AlertDispatched {
        property_id: i64,
        alert_type: AlertType,
        sent: usize,
        failed: usize,
    },
}

impl DomainEvent {
    pub fn name(&self) -> &'static str {
        match self {
            DomainEvent::PropertyStatusChanged { .. } => "property.status_changed",
            DomainEvent::PermissionCreated { .. } => "permission.created",
            DomainEvent::PermissionApproved { .. } => "permission.approved",
            DomainEvent::PermissionRejected { .. } => "permission.rejected",
            DomainEvent::AlertDispatched { .. } => "alert.dispatched",
        }
    }
}

/// Sobre con el que viaja cada evento.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelope {
    pub id: Uuid,
    pub occurred_at: DateTime<Utc>,
    #[serde(flatten)]
    pub event: DomainEvent,
}

impl EventEnvelope {
    pub fn wrap(event: DomainEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            event,
        }
    }
}
