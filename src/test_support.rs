// src/test_support.rs
//
// Implementaciones en memoria de los stores y canales, y fixtures.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    time::Duration as StdDuration,
};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;

use crate::{
    channels::{AlertEmail, ChannelError, EmailChannel, WhatsAppChannel},
    common::error::AppError,
    db::{AccessScope, AlertLedger, ApprovalRecord, PermissionStore, PropertyStore, ReviewDecision, UserStore},
    models::{
        alert::{AlertNotification, AlertType},
        event::DomainEvent,
        permission::{PermissionDraft, PermissionHistoryFilter, PermissionRequest, PermissionStatus, RequestType},
        property::{AlertResolution, OperationType, Property, PropertyStatus},
        user::{Role, User},
    },
    services::events::EventPublisher,
};

// --- Fixtures ---

pub fn days_ago(now: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    now - Duration::days(days)
}

pub fn user(id: i64, role: Role) -> User {
    User {
        id,
        name: format!("Usuario {}", id),
        email: format!("usuario{}@inmo.test", id),
        role,
        phone: None,
        whatsapp: Some(format!("+5255100{:05}", id)),
        is_active: true,
        created_at: Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap(),
    }
}

/// Inmueble disponible sin actividad desde hace `idle_days`.
pub fn property(id: i64, operation_type: OperationType, owner_id: i64, idle_days: i64, now: DateTime<Utc>) -> Property {
    let since = days_ago(now, idle_days);
    Property {
        id,
        title: format!("Inmueble {}", id),
        location: "Av. Reforma 100, CDMX".to_string(),
        price: Decimal::new(185_000_00, 2),
        operation_type,
        status: PropertyStatus::Disponible,
        owner_id,
        created_at: since,
        updated_at: since,
        last_sale_date: None,
        last_rental_date: None,
    }
}

pub fn pending_request(
    id: i64,
    inmueble_id: i64,
    asesor_id: i64,
    request_type: RequestType,
    now: DateTime<Utc>,
) -> PermissionRequest {
    PermissionRequest {
        id,
        inmueble_id,
        asesor_id,
        request_type,
        justification: "Justificación de prueba suficiente".to_string(),
        status: PermissionStatus::Pendiente,
        reviewed_by: None,
        review_date: None,
        admin_notes: None,
        rejection_reason: None,
        created_at: now - Duration::minutes(id),
    }
}

fn locked<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|p| p.into_inner())
}

// --- Stores ---

#[derive(Default)]
pub struct InMemoryUsers {
    users: Mutex<Vec<User>>,
}

impl InMemoryUsers {
    pub fn with(users: Vec<User>) -> Self {
        Self { users: Mutex::new(users) }
    }

    fn role_of(&self, id: i64) -> Option<Role> {
        locked(&self.users).iter().find(|u| u.id == id).map(|u| u.role)
    }
}

#[async_trait]
impl UserStore for InMemoryUsers {
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, AppError> {
        Ok(locked(&self.users).iter().find(|u| u.id == id).cloned())
    }

    async fn find_active_above(&self, role: Role) -> Result<Vec<User>, AppError> {
        let mut found: Vec<User> = locked(&self.users)
            .iter()
            .filter(|u| u.is_active && u.role > role)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.role.cmp(&a.role).then(a.id.cmp(&b.id)));
        Ok(found)
    }
}

pub struct InMemoryProperties {
    users: Arc<InMemoryUsers>,
    properties: Mutex<Vec<Property>>,
    listing_fails: AtomicBool,
}

impl InMemoryProperties {
    pub fn with(users: Arc<InMemoryUsers>, properties: Vec<Property>) -> Self {
        Self {
            users,
            properties: Mutex::new(properties),
            listing_fails: AtomicBool::new(false),
        }
    }

    /// A partir de aquí el listado del recorrido falla.
    pub fn break_listing(&self) {
        self.listing_fails.store(true, Ordering::SeqCst);
    }

    pub fn insert(&self, property: Property) {
        locked(&self.properties).push(property);
    }

    pub fn get(&self, id: i64) -> Option<Property> {
        locked(&self.properties).iter().find(|p| p.id == id).cloned()
    }

    pub fn set_status(&self, id: i64, status: PropertyStatus) {
        if let Some(p) = locked(&self.properties).iter_mut().find(|p| p.id == id) {
            p.status = status;
        }
    }

    fn mutate<F>(&self, id: i64, f: F) -> Option<Property>
    where
        F: FnOnce(&mut Property),
    {
        let mut properties = locked(&self.properties);
        let property = properties.iter_mut().find(|p| p.id == id)?;
        f(property);
        Some(property.clone())
    }

    fn available_sorted(&self) -> Vec<Property> {
        let mut available: Vec<Property> = locked(&self.properties)
            .iter()
            .filter(|p| p.status == PropertyStatus::Disponible)
            .cloned()
            .collect();
        available.sort_by(|a, b| a.updated_at.cmp(&b.updated_at).then(a.id.cmp(&b.id)));
        available
    }
}

#[async_trait]
impl PropertyStore for InMemoryProperties {
    async fn find_by_id(&self, id: i64) -> Result<Option<Property>, AppError> {
        Ok(self.get(id))
    }

    async fn list_available_oldest_first(&self) -> Result<Vec<Property>, AppError> {
        if self.listing_fails.load(Ordering::SeqCst) {
            return Err(AppError::DatabaseError(sqlx::Error::PoolTimedOut));
        }
        Ok(self.available_sorted())
    }

    async fn list_available_in_scope(&self, scope: &AccessScope) -> Result<Vec<Property>, AppError> {
        Ok(self
            .available_sorted()
            .into_iter()
            .filter(|p| {
                self.users
                    .role_of(p.owner_id)
                    .is_some_and(|role| scope.permits(p.owner_id, role))
            })
            .collect())
    }

    async fn update_status(
        &self,
        id: i64,
        status: PropertyStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<Property>, AppError> {
        Ok(self.mutate(id, |p| {
            p.status = status;
            p.updated_at = now;
        }))
    }

    async fn apply_resolution(
        &self,
        id: i64,
        resolution: AlertResolution,
        now: DateTime<Utc>,
    ) -> Result<Option<Property>, AppError> {
        Ok(self.mutate(id, |p| {
            p.updated_at = now;
            match resolution {
                AlertResolution::Vendido => {
                    p.status = PropertyStatus::Vendido;
                    p.last_sale_date = Some(now);
                }
                AlertResolution::Alquilado => {
                    p.status = PropertyStatus::Alquilado;
                    p.last_rental_date = Some(now);
                }
                AlertResolution::Actualizado => {}
            }
        }))
    }
}

#[derive(Default)]
pub struct InMemoryLedger {
    entries: Mutex<HashMap<(i64, AlertType), AlertNotification>>,
    reject_writes: bool,
}

impl InMemoryLedger {
    /// Lee bien pero cada `upsert` falla como si la base no respondiera.
    pub fn rejecting_writes() -> Self {
        Self {
            reject_writes: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl AlertLedger for InMemoryLedger {
    async fn find(&self, property_id: i64, alert_type: AlertType) -> Result<Option<AlertNotification>, AppError> {
        Ok(locked(&self.entries).get(&(property_id, alert_type)).cloned())
    }

    async fn upsert(&self, entry: &AlertNotification) -> Result<(), AppError> {
        if self.reject_writes {
            return Err(AppError::DatabaseError(sqlx::Error::PoolTimedOut));
        }
        locked(&self.entries).insert((entry.property_id, entry.alert_type), entry.clone());
        Ok(())
    }

    async fn clear_property(&self, property_id: i64) -> Result<u64, AppError> {
        let mut entries = locked(&self.entries);
        let before = entries.len();
        entries.retain(|(id, _), _| *id != property_id);
        Ok((before - entries.len()) as u64)
    }
}

pub struct InMemoryPermissions {
    users: Arc<InMemoryUsers>,
    properties: Arc<InMemoryProperties>,
    requests: Mutex<Vec<PermissionRequest>>,
}

impl InMemoryPermissions {
    pub fn new(users: Arc<InMemoryUsers>, properties: Arc<InMemoryProperties>) -> Self {
        Self {
            users,
            properties,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn seed(&self, request: PermissionRequest) {
        locked(&self.requests).push(request);
    }

    pub fn len(&self) -> usize {
        locked(&self.requests).len()
    }

    fn review<F>(&self, id: i64, f: F) -> Option<PermissionRequest>
    where
        F: FnOnce(&mut PermissionRequest),
    {
        let mut requests = locked(&self.requests);
        let request = requests
            .iter_mut()
            .find(|r| r.id == id && r.status == PermissionStatus::Pendiente)?;
        f(request);
        Some(request.clone())
    }
}

#[async_trait]
impl PermissionStore for InMemoryPermissions {
    async fn insert(
        &self,
        asesor_id: i64,
        draft: &PermissionDraft,
        now: DateTime<Utc>,
    ) -> Result<PermissionRequest, AppError> {
        let mut requests = locked(&self.requests);
        if requests.iter().any(|r| {
            r.inmueble_id == draft.inmueble_id
                && r.request_type == draft.request_type
                && r.status == PermissionStatus::Pendiente
        }) {
            return Err(AppError::DuplicatePendingRequest {
                inmueble_id: draft.inmueble_id,
                request_type: draft.request_type,
            });
        }

        let id = requests.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        let request = PermissionRequest {
            id,
            inmueble_id: draft.inmueble_id,
            asesor_id,
            request_type: draft.request_type,
            justification: draft.justification.clone(),
            status: PermissionStatus::Pendiente,
            reviewed_by: None,
            review_date: None,
            admin_notes: None,
            rejection_reason: None,
            created_at: now,
        };
        requests.push(request.clone());
        Ok(request)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<PermissionRequest>, AppError> {
        Ok(locked(&self.requests).iter().find(|r| r.id == id).cloned())
    }

    async fn find_pending(
        &self,
        inmueble_id: i64,
        request_type: RequestType,
    ) -> Result<Option<PermissionRequest>, AppError> {
        Ok(locked(&self.requests)
            .iter()
            .find(|r| {
                r.inmueble_id == inmueble_id
                    && r.request_type == request_type
                    && r.status == PermissionStatus::Pendiente
            })
            .cloned())
    }

    async fn approve(
        &self,
        decision: &ReviewDecision,
        target_status: PropertyStatus,
    ) -> Result<Option<ApprovalRecord>, AppError> {
        let Some(request) = self.review(decision.request_id, |r| {
            r.status = PermissionStatus::Aprobado;
            r.reviewed_by = Some(decision.reviewer_id);
            r.review_date = Some(decision.reviewed_at);
            r.admin_notes = decision.notes.clone();
        }) else {
            return Ok(None);
        };

        let previous_status = self
            .properties
            .get(request.inmueble_id)
            .map(|p| p.status)
            .ok_or(AppError::PropertyNotFound(request.inmueble_id))?;
        let property = self
            .properties
            .update_status(request.inmueble_id, target_status, decision.reviewed_at)
            .await?
            .ok_or(AppError::PropertyNotFound(request.inmueble_id))?;

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
        Ok(self.review(decision.request_id, |r| {
            r.status = PermissionStatus::Rechazado;
            r.reviewed_by = Some(decision.reviewer_id);
            r.review_date = Some(decision.reviewed_at);
            r.rejection_reason = Some(reason.to_string());
            if decision.notes.is_some() {
                r.admin_notes = decision.notes.clone();
            }
        }))
    }

    async fn list(
        &self,
        scope: &AccessScope,
        filter: &PermissionHistoryFilter,
    ) -> Result<Vec<PermissionRequest>, AppError> {
        let mut found: Vec<PermissionRequest> = locked(&self.requests)
            .iter()
            .filter(|r| {
                self.users
                    .role_of(r.asesor_id)
                    .is_some_and(|role| scope.permits(r.asesor_id, role))
            })
            .filter(|r| filter.status.is_none_or(|s| r.status == s))
            .filter(|r| filter.inmueble_id.is_none_or(|id| r.inmueble_id == id))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(found)
    }
}

// --- Canales ---

#[derive(Debug, Clone, Copy)]
enum FakeMode {
    Deliver,
    Fail,
    Slow(StdDuration),
}

pub struct FakeWhatsApp {
    configured: bool,
    mode: FakeMode,
    sent: Mutex<Vec<(String, String)>>,
}

impl FakeWhatsApp {
    fn build(configured: bool, mode: FakeMode) -> Self {
        Self {
            configured,
            mode,
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn configured() -> Self {
        Self::build(true, FakeMode::Deliver)
    }

    pub fn unconfigured() -> Self {
        Self::build(false, FakeMode::Deliver)
    }

    pub fn failing() -> Self {
        Self::build(true, FakeMode::Fail)
    }

    pub fn slow(delay: StdDuration) -> Self {
        Self::build(true, FakeMode::Slow(delay))
    }

    /// (destino, texto) de cada mensaje entregado.
    pub fn sent(&self) -> Vec<(String, String)> {
        locked(&self.sent).clone()
    }
}

#[async_trait]
impl WhatsAppChannel for FakeWhatsApp {
    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn send_message(&self, to: &str, body: &str) -> Result<String, ChannelError> {
        if !self.configured {
            return Err(ChannelError::NotConfigured);
        }
        match self.mode {
            FakeMode::Fail => {
                return Err(ChannelError::Provider {
                    status: 500,
                    message: "proveedor caído".to_string(),
                })
            }
            FakeMode::Slow(delay) => tokio::time::sleep(delay).await,
            FakeMode::Deliver => {}
        }
        let mut sent = locked(&self.sent);
        sent.push((to.to_string(), body.to_string()));
        Ok(format!("SM{:04}", sent.len()))
    }
}

pub struct FakeEmail {
    configured: bool,
    mode: FakeMode,
    sent: Mutex<Vec<(String, String)>>,
}

impl FakeEmail {
    fn build(configured: bool, mode: FakeMode) -> Self {
        Self {
            configured,
            mode,
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn configured() -> Self {
        Self::build(true, FakeMode::Deliver)
    }

    pub fn unconfigured() -> Self {
        Self::build(false, FakeMode::Deliver)
    }

    pub fn failing() -> Self {
        Self::build(true, FakeMode::Fail)
    }

    /// (destino, asunto) de cada correo entregado.
    pub fn sent(&self) -> Vec<(String, String)> {
        locked(&self.sent).clone()
    }
}

#[async_trait]
impl EmailChannel for FakeEmail {
    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn send_alert_email(
        &self,
        to: &str,
        _recipient_name: &str,
        alert: &AlertEmail,
    ) -> Result<String, ChannelError> {
        if !self.configured {
            return Err(ChannelError::NotConfigured);
        }
        match self.mode {
            FakeMode::Fail => {
                return Err(ChannelError::Provider {
                    status: 422,
                    message: "dominio no verificado".to_string(),
                })
            }
            FakeMode::Slow(delay) => tokio::time::sleep(delay).await,
            FakeMode::Deliver => {}
        }
        let mut sent = locked(&self.sent);
        sent.push((to.to_string(), alert.subject.clone()));
        Ok(format!("em_{}", sent.len()))
    }
}

// --- Eventos ---

#[derive(Default)]
pub struct RecordingPublisher {
    events: Mutex<Vec<DomainEvent>>,
}

impl RecordingPublisher {
    pub fn events(&self) -> Vec<DomainEvent> {
        locked(&self.events).clone()
    }
}

impl EventPublisher for RecordingPublisher {
    fn publish(&self, event: DomainEvent) {
        locked(&self.events).push(event);
    }
}
