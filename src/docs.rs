// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Alertas ---
        handlers::alerts::run_cron_scan,
        handlers::alerts::run_scan,
        handlers::alerts::list_alerts,
        handlers::alerts::channel_status,
        handlers::alerts::notify_property,
        handlers::alerts::resolve_alert,

        // --- Permisos ---
        handlers::permissions::submit_request,
        handlers::permissions::list_pending,
        handlers::permissions::list_history,
        handlers::permissions::approve_request,
        handlers::permissions::reject_request,

        // --- Inmuebles ---
        handlers::properties::change_availability,

        // --- Eventos ---
        handlers::events::stream_events,
    ),
    components(
        schemas(
            // --- Usuarios ---
            models::user::Role,
            models::user::User,

            // --- Inmuebles ---
            models::property::OperationType,
            models::property::PropertyStatus,
            models::property::Property,
            models::property::AlertResolution,
            models::property::AvailabilityAction,

            // --- Alertas ---
            models::alert::AlertType,
            models::alert::AlertNotification,
            models::alert::AgentContact,
            models::alert::InactivityAlert,
            models::alert::Channel,
            models::alert::DeliveryStatus,
            models::alert::DeliveryResult,
            models::alert::DispatchReport,
            models::alert::PropertyScanError,
            models::alert::ScanSummary,
            models::alert::AlertOutcome,
            models::alert::ManualNotifyStatus,
            models::alert::ManualNotifyResult,
            models::alert::ChannelStatus,

            // --- Permisos ---
            models::permission::RequestType,
            models::permission::PermissionStatus,
            models::permission::PermissionRequest,
            models::permission::SubmissionOutcome,

            // --- Payloads ---
            handlers::alerts::ResolveAlertPayload,
            handlers::permissions::SubmitPermissionPayload,
            handlers::permissions::ApprovePayload,
            handlers::permissions::RejectPayload,
            handlers::properties::AvailabilityPayload,
        )
    ),
    tags(
        (name = "Alertas", description = "Inactividad de inmuebles y notificaciones"),
        (name = "Permisos", description = "Solicitudes de cambio de estado y su revisión"),
        (name = "Inmuebles", description = "Disponibilidad de inmuebles"),
        (name = "Eventos", description = "Eventos de dominio en tiempo real (SSE)")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documents_every_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/cron/alerts",
            "/api/alerts/properties/{id}/resolve",
            "/api/permissions/{id}/approve",
            "/api/properties/{id}/availability",
            "/api/events",
        ] {
            assert!(doc.paths.paths.contains_key(path), "falta {}", path);
        }
    }
}
