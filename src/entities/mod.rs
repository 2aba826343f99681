//! sea-orm entities backing [`crate::store::DatabaseStore`].

pub mod category;
pub mod news_post;
pub mod order;
pub mod order_item;
pub mod product;
pub mod profile;

use crate::errors::ServiceError;

/// Reads a non-negative integer column into a counter.
pub(crate) fn to_count(value: i32, column: &str) -> Result<u32, ServiceError> {
    u32::try_from(value)
        .map_err(|_| ServiceError::InternalError(format!("negative value in column {}", column)))
}

/// Writes a counter into an integer column.
pub(crate) fn to_column(value: u32, column: &str) -> Result<i32, ServiceError> {
    i32::try_from(value)
        .map_err(|_| ServiceError::ValidationError(format!("{} is too large", column)))
}

/// Reads a stored enum label.
pub(crate) fn parse_label<T: std::str::FromStr>(value: &str, column: &str) -> Result<T, ServiceError> {
    value
        .parse()
        .map_err(|_| ServiceError::InternalError(format!("unexpected {} value: {}", column, value)))
}
