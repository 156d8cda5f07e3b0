pub mod alerts;
pub mod events;
pub mod permissions;
pub mod properties;

use crate::common::error::AppError;

/// Campo obligatorio de un payload.
pub(crate) fn required<T>(value: Option<T>, field: &'static str) -> Result<T, AppError> {
    value.ok_or(AppError::MissingField(field))
}
