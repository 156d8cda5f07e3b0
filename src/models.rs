pub mod alert;
pub mod event;
pub mod permission;
pub mod property;
pub mod user;
