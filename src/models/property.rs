// src/models/property.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

// --- Enums ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "operation_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    Compra,
    Alquiler,
    Ambos,
}

impl OperationType {
    pub fn includes_sale(self) -> bool {
        matches!(self, OperationType::Compra | OperationType::Ambos)
    }

    pub fn includes_rental(self) -> bool {
        matches!(self, OperationType::Alquiler | OperationType::Ambos)
    }

    pub fn label(self) -> &'static str {
        match self {
            OperationType::Compra => "Venta",
            OperationType::Alquiler => "Alquiler",
            OperationType::Ambos => "Venta y alquiler",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "property_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PropertyStatus {
    Disponible,
    Vendido,
    Alquilado,
    NoDisponible,
    Deshabilitado,
}

// --- Inmueble ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    #[schema(example = 7)]
    pub id: i64,
    #[schema(example = "Departamento en Miraflores")]
    pub title: String,
    #[schema(example = "Av. Larco 123, Miraflores")]
    pub location: String,
    #[schema(example = "185000.00")]
    pub price: Decimal,
    pub operation_type: OperationType,
    pub status: PropertyStatus,
    #[schema(example = 12)]
    pub owner_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_sale_date: Option<DateTime<Utc>>,
    pub last_rental_date: Option<DateTime<Utc>>,
}

/// Acción explícita que atiende una alerta de inactividad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AlertResolution {
    /// Se vendió: estado `vendido` y `last_sale_date = now`.
    Vendido,
    /// Se alquiló: estado `alquilado` y `last_rental_date = now`.
    Alquilado,
    /// Se editó/republicó: sólo refresca `updated_at`.
    Actualizado,
}

impl AlertResolution {
    /// ¿Tiene sentido esta resolución para el tipo de operación?
    pub fn applies_to(self, operation: OperationType) -> bool {
        match self {
            AlertResolution::Vendido => operation.includes_sale(),
            AlertResolution::Alquilado => operation.includes_rental(),
            AlertResolution::Actualizado => true,
        }
    }
}

/// Cambio de disponibilidad pedido desde la ficha del inmueble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AvailabilityAction {
    Disable,
    Enable,
}
