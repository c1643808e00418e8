use std::sync::Arc;

use crate::config::AppConfig;
use crate::database::{Collection, DatabaseManager, Repository};
use crate::geocoder::Geocoder;

/// Shared, immutable handles given to every request
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseManager,
    pub config: Arc<AppConfig>,
    pub geocoder: Arc<dyn Geocoder>,
}

impl AppState {
    pub fn new(db: DatabaseManager, config: AppConfig, geocoder: Arc<dyn Geocoder>) -> Self {
        Self { db, config: Arc::new(config), geocoder }
    }

    pub fn repository(&self, collection: &'static Collection) -> Repository {
        Repository::new(collection, self.db.pool().clone())
    }
}
