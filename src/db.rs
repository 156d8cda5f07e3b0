use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    common::error::AppError,
    models::{
        alert::{AlertNotification, AlertType},
        permission::{PermissionDraft, PermissionHistoryFilter, PermissionRequest, RequestType},
        property::{AlertResolution, Property, PropertyStatus},
        user::{Role, User},
    },
};

pub mod scope;
pub use scope::AccessScope;
pub mod user_repo;
pub use user_repo::UserRepository;
pub mod property_repo;
pub use property_repo::PropertyRepository;
pub mod alert_repo;
pub use alert_repo::AlertNotificationRepository;
pub mod permission_repo;
pub use permission_repo::PermissionRepository;

// Los servicios dependen de estos traits y no del PgPool, para poder
// ejercitarlos con implementaciones en memoria.

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, AppError>;

    /// Usuarios activos con rol estrictamente superior a `role`.
    async fn find_active_above(&self, role: Role) -> Result<Vec<User>, AppError>;
}

#[async_trait]
pub trait PropertyStore: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<Property>, AppError>;

    /// Inmuebles `disponible`, el `updated_at` más antiguo primero.
    async fn list_available_oldest_first(&self) -> Result<Vec<Property>, AppError>;

    /// Igual que el anterior, restringido al alcance del usuario.
    async fn list_available_in_scope(&self, scope: &AccessScope) -> Result<Vec<Property>, AppError>;

    async fn update_status(
        &self,
        id: i64,
        status: PropertyStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<Property>, AppError>;

    async fn apply_resolution(
        &self,
        id: i64,
        resolution: AlertResolution,
        now: DateTime<Utc>,
    ) -> Result<Option<Property>, AppError>;
}

#[async_trait]
pub trait AlertLedger: Send + Sync {
    async fn find(&self, property_id: i64, alert_type: AlertType) -> Result<Option<AlertNotification>, AppError>;

    /// Insert-or-update por la clave (property_id, alert_type).
    async fn upsert(&self, entry: &AlertNotification) -> Result<(), AppError>;

    async fn clear_property(&self, property_id: i64) -> Result<u64, AppError>;
}

/// Datos de una revisión (aprobación o rechazo).
#[derive(Debug, Clone)]
pub struct ReviewDecision {
    pub request_id: i64,
    pub reviewer_id: i64,
    pub reviewed_at: DateTime<Utc>,
    pub notes: Option<String>,
}

/// Resultado de aprobar: la solicitud y el inmueble ya mutado.
#[derive(Debug, Clone)]
pub struct ApprovalRecord {
    pub request: PermissionRequest,
    pub previous_status: PropertyStatus,
    pub property: Property,
}

#[async_trait]
pub trait PermissionStore: Send + Sync {
    /// Falla con `DuplicatePendingRequest` si ya hay una pendiente del mismo tipo.
    async fn insert(
        &self,
        asesor_id: i64,
        draft: &PermissionDraft,
        now: DateTime<Utc>,
    ) -> Result<PermissionRequest, AppError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<PermissionRequest>, AppError>;

    async fn find_pending(
        &self,
        inmueble_id: i64,
        request_type: RequestType,
    ) -> Result<Option<PermissionRequest>, AppError>;

    /// Aprueba (sólo si sigue pendiente) y aplica `target_status` al inmueble.
    /// `None` si la solicitud ya no estaba pendiente.
    async fn approve(
        &self,
        decision: &ReviewDecision,
        target_status: PropertyStatus,
    ) -> Result<Option<ApprovalRecord>, AppError>;

    /// Rechaza (sólo si sigue pendiente). El inmueble no se toca.
    async fn reject(
        &self,
        decision: &ReviewDecision,
        reason: &str,
    ) -> Result<Option<PermissionRequest>, AppError>;

    /// Listado más reciente primero. El alcance se aplica sobre el solicitante.
    async fn list(
        &self,
        scope: &AccessScope,
        filter: &PermissionHistoryFilter,
    ) -> Result<Vec<PermissionRequest>, AppError>;
}
