// src/services/permission_service.rs

use std::sync::Arc;

use chrono::{DateTime, Utc};
use validator::Validate;

use crate::{
    common::error::AppError,
    db::{AccessScope, PermissionStore, PropertyStore, ReviewDecision},
    models::{
        event::DomainEvent,
        permission::{
            PermissionDraft, PermissionHistoryFilter, PermissionRequest, PermissionStatus, SubmissionOutcome,
        },
        property::{AvailabilityAction, Property, PropertyStatus},
        user::{Role, User},
    },
    services::events::EventPublisher,
};

#[derive(Clone)]
pub struct PermissionService {
    requests: Arc<dyn PermissionStore>,
    properties: Arc<dyn PropertyStore>,
    events: Arc<dyn EventPublisher>,
}

impl PermissionService {
    pub fn new(
        requests: Arc<dyn PermissionStore>,
        properties: Arc<dyn PropertyStore>,
        events: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            requests,
            properties,
            events,
        }
    }

    /// Crea una solicitud, o la aplica directamente si quien la pide ya es revisor.
    pub async fn submit(
        &self,
        actor: &User,
        draft: PermissionDraft,
        now: DateTime<Utc>,
    ) -> Result<SubmissionOutcome, AppError> {
        draft.validate()?;

        let property = self
            .properties
            .find_by_id(draft.inmueble_id)
            .await?
            .ok_or(AppError::PropertyNotFound(draft.inmueble_id))?;

        if actor.role == Role::Asesor && property.owner_id != actor.id {
            return Err(AppError::Forbidden(format!(
                "sólo el responsable puede pedir cambios sobre el inmueble {}",
                property.id
            )));
        }

        // Admin y gerencia no pasan por la cola
        if actor.role.is_reviewer() {
            let updated = self
                .apply_status(&property, draft.request_type.target_status(), actor.id, now)
                .await?;
            tracing::info!(
                "🔓 {:?} aplicada directamente por {} sobre el inmueble {}",
                draft.request_type,
                actor.role.label(),
                property.id
            );
            return Ok(SubmissionOutcome::Applied { property: updated });
        }

        if self
            .requests
            .find_pending(draft.inmueble_id, draft.request_type)
            .await?
            .is_some()
        {
            return Err(AppError::DuplicatePendingRequest {
                inmueble_id: draft.inmueble_id,
                request_type: draft.request_type,
            });
        }

        let request = self.requests.insert(actor.id, &draft, now).await?;
        tracing::info!(
            "📝 Solicitud {} ({:?}) creada por el asesor {} para el inmueble {}",
            request.id,
            request.request_type,
            actor.id,
            request.inmueble_id
        );

        self.events.publish(DomainEvent::PermissionCreated {
            request_id: request.id,
            inmueble_id: request.inmueble_id,
            asesor_id: request.asesor_id,
            request_type: request.request_type,
        });

        Ok(SubmissionOutcome::Queued { request })
    }

    /// Deshabilitar/habilitar desde la ficha; mismo camino que `submit`.
    pub async fn change_availability(
        &self,
        actor: &User,
        property_id: i64,
        action: AvailabilityAction,
        justification: &str,
        now: DateTime<Utc>,
    ) -> Result<SubmissionOutcome, AppError> {
        let draft = PermissionDraft::new(property_id, action.into(), justification);
        self.submit(actor, draft, now).await
    }

    pub async fn approve(
        &self,
        reviewer: &User,
        request_id: i64,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<PermissionRequest, AppError> {
        let request = self.load_for_review(reviewer, request_id).await?;

        let decision = ReviewDecision {
            request_id,
            reviewer_id: reviewer.id,
            reviewed_at: now,
            notes: non_blank(notes),
        };

        let record = self
            .requests
            .approve(&decision, request.request_type.target_status())
            .await?
            .ok_or(AppError::RequestAlreadyReviewed(request_id))?;

        tracing::info!(
            "✅ Solicitud {} aprobada por {}; inmueble {} pasa a {:?}",
            request_id,
            reviewer.id,
            record.property.id,
            record.property.status
        );

        self.events.publish(DomainEvent::PermissionApproved {
            request_id,
            inmueble_id: record.request.inmueble_id,
            asesor_id: record.request.asesor_id,
            reviewer_id: reviewer.id,
            request_type: record.request.request_type,
        });
        if record.previous_status != record.property.status {
            self.events.publish(DomainEvent::PropertyStatusChanged {
                property_id: record.property.id,
                previous_status: record.previous_status,
                new_status: record.property.status,
                changed_by: reviewer.id,
            });
        }

        Ok(record.request)
    }

    pub async fn reject(
        &self,
        reviewer: &User,
        request_id: i64,
        reason: &str,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<PermissionRequest, AppError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(AppError::MissingField("reason"));
        }

        self.load_for_review(reviewer, request_id).await?;

        let decision = ReviewDecision {
            request_id,
            reviewer_id: reviewer.id,
            reviewed_at: now,
            notes: non_blank(notes),
        };

        let request = self
            .requests
            .reject(&decision, reason)
            .await?
            .ok_or(AppError::RequestAlreadyReviewed(request_id))?;

        tracing::info!("⛔ Solicitud {} rechazada por {}", request_id, reviewer.id);

        self.events.publish(DomainEvent::PermissionRejected {
            request_id,
            inmueble_id: request.inmueble_id,
            asesor_id: request.asesor_id,
            reviewer_id: reviewer.id,
            request_type: request.request_type,
            reason: reason.to_string(),
        });

        Ok(request)
    }

    pub async fn list_pending(&self, actor: &User) -> Result<Vec<PermissionRequest>, AppError> {
        let filter = PermissionHistoryFilter {
            inmueble_id: None,
            status: Some(PermissionStatus::Pendiente),
        };
        self.requests.list(&AccessScope::for_user(actor), &filter).await
    }

    pub async fn list_history(
        &self,
        actor: &User,
        filter: &PermissionHistoryFilter,
    ) -> Result<Vec<PermissionRequest>, AppError> {
        self.requests.list(&AccessScope::for_user(actor), filter).await
    }

    async fn load_for_review(&self, reviewer: &User, request_id: i64) -> Result<PermissionRequest, AppError> {
        // Las solicitudes en cola siempre vienen de asesores
        if !reviewer.role.can_adjudicate(Role::Asesor) {
            return Err(AppError::Forbidden("sólo admin o gerencia revisan solicitudes".to_string()));
        }

        let request = self
            .requests
            .find_by_id(request_id)
            .await?
            .ok_or(AppError::PermissionRequestNotFound(request_id))?;

        if request.status != PermissionStatus::Pendiente {
            return Err(AppError::RequestAlreadyReviewed(request_id));
        }

        Ok(request)
    }

    async fn apply_status(
        &self,
        property: &Property,
        status: PropertyStatus,
        actor_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Property, AppError> {
        let updated = self
            .properties
            .update_status(property.id, status, now)
            .await?
            .ok_or(AppError::PropertyNotFound(property.id))?;

        if updated.status != property.status {
            self.events.publish(DomainEvent::PropertyStatusChanged {
                property_id: property.id,
                previous_status: property.status,
                new_status: updated.status,
                changed_by: actor_id,
            });
        }

        Ok(updated)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{permission::RequestType, property::OperationType};
    use crate::test_support::{
        pending_request, property, user, InMemoryPermissions, InMemoryProperties, InMemoryUsers, RecordingPublisher,
    };

    struct Harness {
        service: PermissionService,
        requests: Arc<InMemoryPermissions>,
        properties: Arc<InMemoryProperties>,
        events: Arc<RecordingPublisher>,
    }

    fn harness() -> Harness {
        let now = Utc::now();
        let users = Arc::new(InMemoryUsers::with(vec![
            user(1, Role::Asesor),
            user(2, Role::Admin),
            user(3, Role::Gerencia),
            user(5, Role::Asesor),
        ]));
        let properties = Arc::new(InMemoryProperties::with(
            users.clone(),
            vec![
                property(3, OperationType::Compra, 1, 10, now),
                property(4, OperationType::Alquiler, 5, 10, now),
            ],
        ));
        let requests = Arc::new(InMemoryPermissions::new(users, properties.clone()));
        let events = Arc::new(RecordingPublisher::default());
        let service = PermissionService::new(requests.clone(), properties.clone(), events.clone());

        Harness {
            service,
            requests,
            properties,
            events,
        }
    }

    fn draft(inmueble_id: i64, request_type: RequestType) -> PermissionDraft {
        PermissionDraft::new(inmueble_id, request_type, "El propietario pidió pausar la publicación")
    }

    #[tokio::test]
    async fn short_justification_is_rejected_without_storing() {
        let h = harness();
        let asesor = user(1, Role::Asesor);

        let err = h
            .service
            .submit(&asesor, PermissionDraft::new(3, RequestType::DisableRequest, "corto"), Utc::now())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::ValidationError(_)));
        assert_eq!(h.requests.len(), 0);
    }

    #[tokio::test]
    async fn whitespace_does_not_count_towards_justification() {
        let h = harness();
        let padded = PermissionDraft::new(3, RequestType::DisableRequest, "   hola      ");
        let err = h.service.submit(&user(1, Role::Asesor), padded, Utc::now()).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[tokio::test]
    async fn second_pending_request_of_same_type_conflicts() {
        let h = harness();
        let asesor = user(1, Role::Asesor);
        let now = Utc::now();

        let first = h.service.submit(&asesor, draft(3, RequestType::DisableRequest), now).await.unwrap();
        assert!(matches!(first, SubmissionOutcome::Queued { .. }));

        let err = h
            .service
            .submit(&asesor, draft(3, RequestType::DisableRequest), now)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::DuplicatePendingRequest { inmueble_id: 3, request_type: RequestType::DisableRequest }
        ));

        // Otro tipo sí se acepta
        h.service.submit(&asesor, draft(3, RequestType::DisponibleRequest), now).await.unwrap();
        assert_eq!(h.requests.len(), 2);
    }

    #[tokio::test]
    async fn asesor_only_requests_on_own_properties() {
        let h = harness();
        let err = h
            .service
            .submit(&user(5, Role::Asesor), draft(3, RequestType::DisableRequest), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let err = h
            .service
            .submit(&user(1, Role::Asesor), draft(99, RequestType::DisableRequest), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::PropertyNotFound(99)));
    }

    #[tokio::test]
    async fn reviewers_apply_changes_directly() {
        let h = harness();
        let admin = user(2, Role::Admin);

        let outcome = h
            .service
            .change_availability(&admin, 4, AvailabilityAction::Disable, "Remodelación programada", Utc::now())
            .await
            .unwrap();

        match outcome {
            SubmissionOutcome::Applied { property } => assert_eq!(property.status, PropertyStatus::Deshabilitado),
            other => panic!("se esperaba aplicación directa, llegó {:?}", other),
        }
        assert_eq!(h.requests.len(), 0);
        assert!(matches!(
            h.events.events().as_slice(),
            [DomainEvent::PropertyStatusChanged { property_id: 4, changed_by: 2, .. }]
        ));
    }

    #[tokio::test]
    async fn admin_approval_enables_the_property() {
        let h = harness();
        let now = Utc::now();
        h.properties.set_status(3, PropertyStatus::Deshabilitado);
        h.requests.seed(pending_request(10, 3, 1, RequestType::EnableRequest, now));

        let admin = user(2, Role::Admin);
        let approved = h
            .service
            .approve(&admin, 10, Some("  Documentación en regla ".into()), now)
            .await
            .unwrap();

        assert_eq!(approved.status, PermissionStatus::Aprobado);
        assert_eq!(approved.reviewed_by, Some(2));
        assert_eq!(approved.review_date, Some(now));
        assert_eq!(approved.admin_notes.as_deref(), Some("Documentación en regla"));
        assert_eq!(h.properties.get(3).unwrap().status, PropertyStatus::Disponible);

        let events = h.events.events();
        assert!(events.iter().any(|e| matches!(e, DomainEvent::PermissionApproved { request_id: 10, .. })));
        assert!(events.iter().any(|e| matches!(
            e,
            DomainEvent::PropertyStatusChanged { property_id: 3, new_status: PropertyStatus::Disponible, .. }
        )));
    }

    #[tokio::test]
    async fn approved_disable_request_disables_the_property() {
        let h = harness();
        let now = Utc::now();
        let asesor = user(1, Role::Asesor);

        let SubmissionOutcome::Queued { request } = h
            .service
            .change_availability(&asesor, 3, AvailabilityAction::Disable, "Propietario de viaje por dos meses", now)
            .await
            .unwrap()
        else {
            panic!("un asesor siempre pasa por la cola");
        };
        assert_eq!(request.request_type, RequestType::DisableRequest);
        assert_eq!(h.properties.get(3).unwrap().status, PropertyStatus::Disponible);

        h.service.approve(&user(3, Role::Gerencia), request.id, None, now).await.unwrap();
        assert_eq!(h.properties.get(3).unwrap().status, PropertyStatus::Deshabilitado);
    }

    #[tokio::test]
    async fn approval_applies_the_status_of_every_request_type() {
        let cases = [
            (RequestType::DisponibleRequest, PropertyStatus::NoDisponible, PropertyStatus::Disponible),
            (RequestType::EnableRequest, PropertyStatus::Deshabilitado, PropertyStatus::Disponible),
            (RequestType::PropertyApproval, PropertyStatus::NoDisponible, PropertyStatus::Disponible),
            (RequestType::NuevoInmueble, PropertyStatus::NoDisponible, PropertyStatus::Disponible),
            (RequestType::DisableRequest, PropertyStatus::Disponible, PropertyStatus::Deshabilitado),
        ];

        for (request_type, before, expected) in cases {
            let h = harness();
            let now = Utc::now();
            h.properties.set_status(3, before);
            h.requests.seed(pending_request(20, 3, 1, request_type, now));

            let approved = h.service.approve(&user(2, Role::Admin), 20, None, now).await.unwrap();

            assert_eq!(approved.status, PermissionStatus::Aprobado, "{:?}", request_type);
            assert_eq!(h.properties.get(3).unwrap().status, expected, "{:?}", request_type);
        }
    }

    #[tokio::test]
    async fn rejection_leaves_property_untouched_and_is_final() {
        let h = harness();
        let now = Utc::now();
        h.requests.seed(pending_request(11, 3, 1, RequestType::DisableRequest, now));
        let admin = user(2, Role::Admin);

        let err = h.service.reject(&admin, 11, "   ", None, now).await.unwrap_err();
        assert!(matches!(err, AppError::MissingField("reason")));

        let rejected = h
            .service
            .reject(&admin, 11, "Falta la firma del propietario", None, now)
            .await
            .unwrap();
        assert_eq!(rejected.status, PermissionStatus::Rechazado);
        assert_eq!(rejected.rejection_reason.as_deref(), Some("Falta la firma del propietario"));
        assert_eq!(h.properties.get(3).unwrap().status, PropertyStatus::Disponible);

        let err = h.service.approve(&admin, 11, None, now).await.unwrap_err();
        assert!(matches!(err, AppError::RequestAlreadyReviewed(11)));
    }

    #[tokio::test]
    async fn asesor_cannot_review_and_unknown_ids_are_not_found() {
        let h = harness();
        let now = Utc::now();
        h.requests.seed(pending_request(12, 3, 1, RequestType::EnableRequest, now));

        let err = h.service.approve(&user(5, Role::Asesor), 12, None, now).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let err = h.service.approve(&user(2, Role::Admin), 404, None, now).await.unwrap_err();
        assert!(matches!(err, AppError::PermissionRequestNotFound(404)));
    }

    #[tokio::test]
    async fn listings_follow_role_scope() {
        let h = harness();
        let now = Utc::now();
        h.requests.seed(pending_request(20, 3, 1, RequestType::DisableRequest, now));
        h.requests.seed(pending_request(21, 4, 5, RequestType::DisableRequest, now));
        h.service.reject(&user(2, Role::Admin), 21, "Sin sustento", None, now).await.unwrap();

        let own = h.service.list_pending(&user(1, Role::Asesor)).await.unwrap();
        assert_eq!(own.iter().map(|r| r.id).collect::<Vec<_>>(), vec![20]);

        let pending = h.service.list_pending(&user(2, Role::Admin)).await.unwrap();
        assert_eq!(pending.iter().map(|r| r.id).collect::<Vec<_>>(), vec![20]);

        let filter = PermissionHistoryFilter {
            inmueble_id: Some(4),
            status: None,
        };
        let history = h.service.list_history(&user(3, Role::Gerencia), &filter).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].status, PermissionStatus::Rechazado);

        let none = h.service.list_history(&user(1, Role::Asesor), &filter).await.unwrap();
        assert!(none.is_empty());
    }
}
