// src/services/inactivity.rs

use chrono::{DateTime, Utc};

use crate::{
    common::error::AppError,
    models::{
        alert::{AgentContact, AlertType, InactivityAlert},
        property::{Property, PropertyStatus},
        user::User,
    },
    services::templates::{AlertContext, AlertTemplates},
};

pub const SALE_THRESHOLD_DAYS: i64 = 60;
pub const RENTAL_THRESHOLD_DAYS: i64 = 30;
pub const DAYS_PER_MONTH: i64 = 30;

impl AlertType {
    pub fn threshold_days(self) -> i64 {
        match self {
            AlertType::VentaSinMovimiento => SALE_THRESHOLD_DAYS,
            AlertType::AlquilerSinMovimiento => RENTAL_THRESHOLD_DAYS,
        }
    }
}

/// Fecha desde la que se cuenta la inactividad para un tipo de alerta:
/// la más reciente entre la última operación, `updated_at` y `created_at`.
pub fn reference_date(property: &Property, alert_type: AlertType) -> DateTime<Utc> {
    let last_action = match alert_type {
        AlertType::VentaSinMovimiento => property.last_sale_date,
        AlertType::AlquilerSinMovimiento => property.last_rental_date,
    };

    [Some(property.updated_at), Some(property.created_at), last_action]
        .into_iter()
        .flatten()
        .max()
        .unwrap_or(property.created_at)
}

/// Días completos transcurridos; nunca negativo.
pub fn elapsed_days(reference: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - reference).num_days().max(0)
}

/// Tipos de alerta que aplican a la operación, en orden de prioridad.
fn candidate_types(property: &Property) -> Vec<AlertType> {
    let mut types = Vec::with_capacity(2);
    if property.operation_type.includes_sale() {
        types.push(AlertType::VentaSinMovimiento);
    }
    if property.operation_type.includes_rental() {
        types.push(AlertType::AlquilerSinMovimiento);
    }
    types
}

/// Todas las alertas que el inmueble supera (venta antes que alquiler).
/// Sólo los inmuebles `disponible` son elegibles.
pub fn alerts_for(
    property: &Property,
    owner: &User,
    now: DateTime<Utc>,
    templates: &AlertTemplates,
) -> Result<Vec<InactivityAlert>, AppError> {
    if property.status != PropertyStatus::Disponible {
        return Ok(Vec::new());
    }

    let mut alerts = Vec::with_capacity(2);
    for alert_type in candidate_types(property) {
        let reference = reference_date(property, alert_type);
        let days = elapsed_days(reference, now);
        if days > alert_type.threshold_days() {
            alerts.push(build_alert(property, owner, alert_type, reference, days, templates)?);
        }
    }
    Ok(alerts)
}

/// Alerta única de un inmueble; con `ambos` gana la de venta.
pub fn classify(
    property: &Property,
    owner: &User,
    now: DateTime<Utc>,
    templates: &AlertTemplates,
) -> Result<Option<InactivityAlert>, AppError> {
    Ok(alerts_for(property, owner, now, templates)?.into_iter().next())
}

/// "3 meses" o "45 días" si aún no completa un mes.
pub fn inactivity_label(days: i64) -> String {
    let months = days / DAYS_PER_MONTH;
    match months {
        0 => format!("{} días", days),
        1 => "1 mes".to_string(),
        n => format!("{} meses", n),
    }
}

fn build_alert(
    property: &Property,
    owner: &User,
    alert_type: AlertType,
    reference_date: DateTime<Utc>,
    days_inactive: i64,
    templates: &AlertTemplates,
) -> Result<InactivityAlert, AppError> {
    let mut alert = InactivityAlert {
        property_id: property.id,
        property_title: property.title.clone(),
        location: property.location.clone(),
        price: property.price,
        operation_type: property.operation_type,
        alert_type,
        owner: AgentContact {
            id: owner.id,
            name: owner.name.clone(),
            role: owner.role,
            email: owner.email_contact().map(str::to_string),
            whatsapp: owner.whatsapp_contact().map(str::to_string),
        },
        reference_date,
        days_inactive,
        months_inactive: days_inactive / DAYS_PER_MONTH,
        title: String::new(),
        description: String::new(),
    };

    let (title, description) = templates.describe(alert_type, &AlertContext::new(&alert))?;
    alert.title = title;
    alert.description = description;
    Ok(alert)
}
