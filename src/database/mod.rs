pub mod collection;
pub mod manager;
pub mod models;
pub mod query_builder;
pub mod repository;
pub mod users;

pub use collection::{Collection, BOOTCAMPS, USERS};
pub use manager::{DatabaseError, DatabaseManager};
pub use repository::{Assignment, Repository};
pub use users::UserCredentials;
