pub mod auth;
pub mod response;

pub use auth::{admin_only, authorize, protect, CurrentUser};
pub use response::ApiResponse;
