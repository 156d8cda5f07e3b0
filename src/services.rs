pub mod alert_service;
pub mod auth;
pub mod dedup;
pub mod events;
pub mod inactivity;
pub mod notification_service;
pub mod permission_service;
pub mod templates;
