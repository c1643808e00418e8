// handlers/mod.rs - request handlers grouped by resource
//
// Public and protected routes share these handlers; access control is
// attached per route in `routes.rs`.

pub mod auth;
pub mod bootcamps;
pub mod users;

use uuid::Uuid;

use crate::database::Collection;
use crate::error::ApiError;

/// Path ids that are not UUIDs can never match, so they are reported as not found
pub(crate) fn parse_id(collection: &Collection, raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::resource_not_found(collection.resource, raw))
}
