use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::GeocoderConfig;

/// One candidate match for a geocoded address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodeResult {
    pub latitude: f64,
    pub longitude: f64,
    pub formatted_address: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub zipcode: String,
}

#[derive(Debug, Error)]
pub enum GeocoderError {
    #[error("Geocoder API key is not configured")]
    MissingApiKey,

    #[error("Geocoder request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Geocoder responded with status {0}")]
    Status(u16),

    #[error("Geocoder rejected the request: {0}")]
    Provider(String),
}

/// Translates free-text addresses into coordinates and address components
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Candidates ordered by the provider's confidence; empty when nothing matched
    async fn geocode(&self, address: &str) -> Result<Vec<GeocodeResult>, GeocoderError>;
}

/// MapQuest geocoding API client
pub struct MapQuestGeocoder {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl MapQuestGeocoder {
    pub fn new(config: &GeocoderConfig) -> Result<Self, GeocoderError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
        })
    }
}

#[async_trait]
impl Geocoder for MapQuestGeocoder {
    async fn geocode(&self, address: &str) -> Result<Vec<GeocodeResult>, GeocoderError> {
        if self.api_key.is_empty() {
            return Err(GeocoderError::MissingApiKey);
        }

        tracing::debug!("Geocoding address '{}'", address);
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("key", self.api_key.as_str()), ("location", address), ("maxResults", "5")])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GeocoderError::Status(response.status().as_u16()));
        }

        let body: MapQuestResponse = response.json().await?;
        body.into_results()
    }
}

#[derive(Debug, Deserialize)]
struct MapQuestResponse {
    info: MapQuestInfo,
    #[serde(default)]
    results: Vec<MapQuestResult>,
}

#[derive(Debug, Deserialize)]
struct MapQuestInfo {
    statuscode: i64,
    #[serde(default)]
    messages: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct MapQuestResult {
    #[serde(default)]
    locations: Vec<MapQuestLocation>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct MapQuestLocation {
    street: String,
    admin_area5: String,
    admin_area3: String,
    admin_area1: String,
    postal_code: String,
    lat_lng: Option<MapQuestLatLng>,
}

#[derive(Debug, Deserialize)]
struct MapQuestLatLng {
    lat: f64,
    lng: f64,
}

impl MapQuestResponse {
    fn into_results(self) -> Result<Vec<GeocodeResult>, GeocoderError> {
        if self.info.statuscode != 0 {
            return Err(GeocoderError::Provider(self.info.messages.join("; ")));
        }
        Ok(self
            .results
            .into_iter()
            .flat_map(|r| r.locations)
            .filter_map(|loc| {
                let lat_lng = loc.lat_lng.as_ref()?;
                Some(GeocodeResult {
                    latitude: lat_lng.lat,
                    longitude: lat_lng.lng,
                    formatted_address: format_address(&loc),
                    street: loc.street.clone(),
                    city: loc.admin_area5.clone(),
                    state: loc.admin_area3.clone(),
                    country: loc.admin_area1.clone(),
                    zipcode: loc.postal_code.clone(),
                })
            })
            .collect())
    }
}

/// "street, city, state zip, country" skipping empty components
fn format_address(loc: &MapQuestLocation) -> String {
    let state_zip = [loc.admin_area3.as_str(), loc.postal_code.as_str()]
        .iter()
        .filter(|s| !s.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ");
    [loc.street.as_str(), loc.admin_area5.as_str(), state_zip.as_str(), loc.admin_area1.as_str()]
        .iter()
        .filter(|s| !s.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(", ")
}
