use std::borrow::Cow;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::database::repository::Assignment;
use crate::error::ApiError;
use crate::geocoder::{GeocodeResult, Geocoder};

pub const CAREERS: [&str; 6] = [
    "Web Development",
    "Mobile Development",
    "UI/UX",
    "Data Science",
    "Business",
    "Other",
];

pub const DEFAULT_PHOTO: &str = "no-photo.jpg";

const NAME_MAX_CHARS: usize = 50;
const DESCRIPTION_MAX_CHARS: usize = 500;

/// GeoJSON point enriched with the geocoder's address components
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    #[serde(rename = "type")]
    pub kind: String,
    /// `[longitude, latitude]`
    pub coordinates: [f64; 2],
    pub formatted_address: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub zipcode: String,
}

impl Location {
    pub fn from_geocode(result: &GeocodeResult) -> Self {
        Self {
            kind: "Point".to_string(),
            coordinates: [result.longitude, result.latitude],
            formatted_address: result.formatted_address.clone(),
            street: result.street.clone(),
            city: result.city.clone(),
            state: result.state.clone(),
            country: result.country.clone(),
            zipcode: result.zipcode.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bootcamp {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub location: Option<Location>,
    pub careers: Vec<String>,
    pub average_rating: Option<f64>,
    pub average_cost: Option<f64>,
    pub photo: String,
    pub housing: bool,
    pub job_assistance: bool,
    pub job_guarantee: bool,
    pub accept_gi: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Bootcamp {
    /// Decode a full row as returned by the repository
    pub fn from_row(row: Value) -> Result<Self, ApiError> {
        serde_json::from_value(row).map_err(|e| {
            tracing::error!("Malformed bootcamp row: {}", e);
            ApiError::internal_server_error("Server Error")
        })
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateBootcamp {
    #[validate(required(message = "Name is required"), custom(function = "validate_name"))]
    pub name: Option<String>,
    #[validate(required(message = "Description is required"), custom(function = "validate_description"))]
    pub description: Option<String>,
    #[validate(custom(function = "validate_website"))]
    pub website: Option<String>,
    #[validate(length(max = 20, message = "Phone number can't be longer than 20 characters"))]
    pub phone: Option<String>,
    #[validate(email(message = "Please enter a valid email"))]
    pub email: Option<String>,
    /// Write-only; consumed by geocoding and never stored
    #[validate(required(message = "Address is required"), custom(function = "validate_address"))]
    pub address: Option<String>,
    #[validate(required(message = "Please add at least one career"), custom(function = "validate_careers"))]
    pub careers: Option<Vec<String>>,
    #[validate(range(min = 1.0, max = 10.0, message = "Rating must be between 1 and 10"))]
    pub average_rating: Option<f64>,
    pub average_cost: Option<f64>,
    pub photo: Option<String>,
    pub housing: Option<bool>,
    pub job_assistance: Option<bool>,
    pub job_guarantee: Option<bool>,
    pub accept_gi: Option<bool>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBootcamp {
    #[validate(custom(function = "validate_name"))]
    pub name: Option<String>,
    #[validate(custom(function = "validate_description"))]
    pub description: Option<String>,
    #[validate(custom(function = "validate_website"))]
    pub website: Option<String>,
    #[validate(length(max = 20, message = "Phone number can't be longer than 20 characters"))]
    pub phone: Option<String>,
    #[validate(email(message = "Please enter a valid email"))]
    pub email: Option<String>,
    #[validate(custom(function = "validate_address"))]
    pub address: Option<String>,
    #[validate(custom(function = "validate_careers"))]
    pub careers: Option<Vec<String>>,
    #[validate(range(min = 1.0, max = 10.0, message = "Rating must be between 1 and 10"))]
    pub average_rating: Option<f64>,
    pub average_cost: Option<f64>,
    pub photo: Option<String>,
    pub housing: Option<bool>,
    pub job_assistance: Option<bool>,
    pub job_guarantee: Option<bool>,
    pub accept_gi: Option<bool>,
}

/// Validate, derive slug and location, and produce the columns to insert
pub async fn prepare_create(input: CreateBootcamp, geocoder: &dyn Geocoder) -> Result<Vec<Assignment>, ApiError> {
    input.validate()?;

    let name = input.name.unwrap_or_default().trim().to_string();
    let address = input.address.unwrap_or_default();
    let location = locate(geocoder, &address).await?;

    let mut row: Vec<Assignment> = vec![
        ("slug", json!(slugify(&name))),
        ("name", json!(name)),
        ("description", json!(input.description)),
        ("location", serde_json::to_value(&location).map_err(internal)?),
        ("careers", json!(input.careers)),
        ("photo", json!(input.photo.unwrap_or_else(|| DEFAULT_PHOTO.to_string()))),
    ];
    push_some(&mut row, "website", input.website);
    push_some(&mut row, "phone", input.phone);
    push_some(&mut row, "email", input.email);
    push_some(&mut row, "average_rating", input.average_rating);
    push_some(&mut row, "average_cost", input.average_cost);
    push_some(&mut row, "housing", input.housing);
    push_some(&mut row, "job_assistance", input.job_assistance);
    push_some(&mut row, "job_guarantee", input.job_guarantee);
    push_some(&mut row, "accept_gi", input.accept_gi);
    Ok(row)
}

/// Validate supplied fields; re-derives the slug on rename and the location on a new address
pub async fn prepare_update(input: UpdateBootcamp, geocoder: &dyn Geocoder) -> Result<Vec<Assignment>, ApiError> {
    input.validate()?;

    let mut row: Vec<Assignment> = Vec::new();
    if let Some(name) = input.name {
        let name = name.trim().to_string();
        row.push(("slug", json!(slugify(&name))));
        row.push(("name", json!(name)));
    }
    if let Some(address) = input.address {
        let location = locate(geocoder, &address).await?;
        row.push(("location", serde_json::to_value(&location).map_err(internal)?));
    }
    push_some(&mut row, "description", input.description);
    push_some(&mut row, "website", input.website);
    push_some(&mut row, "phone", input.phone);
    push_some(&mut row, "email", input.email);
    push_some(&mut row, "careers", input.careers);
    push_some(&mut row, "average_rating", input.average_rating);
    push_some(&mut row, "average_cost", input.average_cost);
    push_some(&mut row, "photo", input.photo);
    push_some(&mut row, "housing", input.housing);
    push_some(&mut row, "job_assistance", input.job_assistance);
    push_some(&mut row, "job_guarantee", input.job_guarantee);
    push_some(&mut row, "accept_gi", input.accept_gi);
    Ok(row)
}

/// First geocoder match for the address, as a GeoJSON location
pub async fn locate(geocoder: &dyn Geocoder, address: &str) -> Result<Location, ApiError> {
    let results = geocoder.geocode(address).await?;
    results
        .first()
        .map(Location::from_geocode)
        .ok_or_else(|| ApiError::bad_request(format!("Could not geocode address {}", address)))
}

/// Lowercase letters and digits (any script), with runs of other characters
/// collapsed into single dashes
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for c in name.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

fn push_some<T: Serialize>(row: &mut Vec<Assignment>, column: &'static str, value: Option<T>) {
    if let Some(value) = value {
        row.push((column, json!(value)));
    }
}

fn internal(err: serde_json::Error) -> ApiError {
    tracing::error!("Failed to encode location: {}", err);
    ApiError::internal_server_error("Server Error")
}

fn violation(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Borrowed(message));
    err
}

fn validate_name(name: &str) -> Result<(), ValidationError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(violation("required", "Name is required"));
    }
    if name.chars().count() > NAME_MAX_CHARS {
        return Err(violation("length", "Name can't be more than 50 characters"));
    }
    if slugify(name).is_empty() {
        return Err(violation("slug", "Name must contain at least one letter or digit"));
    }
    Ok(())
}

fn validate_description(description: &str) -> Result<(), ValidationError> {
    if description.trim().is_empty() {
        return Err(violation("required", "Description is required"));
    }
    if description.chars().count() > DESCRIPTION_MAX_CHARS {
        return Err(violation("length", "Description can't be more than 500 characters"));
    }
    Ok(())
}

fn validate_address(address: &str) -> Result<(), ValidationError> {
    if address.trim().is_empty() {
        return Err(violation("required", "Address is required"));
    }
    Ok(())
}

fn validate_website(website: &str) -> Result<(), ValidationError> {
    let valid = url::Url::parse(website)
        .map(|url| matches!(url.scheme(), "http" | "https") && url.host_str().map_or(false, |h| h.contains('.')))
        .unwrap_or(false);
    if valid {
        Ok(())
    } else {
        Err(violation("url", "Please use a valid URL with HTTP or HTTPS"))
    }
}

fn validate_careers(careers: &[String]) -> Result<(), ValidationError> {
    if careers.is_empty() {
        return Err(violation("required", "Please add at least one career"));
    }
    if careers.iter().any(|c| !CAREERS.contains(&c.as_str())) {
        return Err(violation("enum", "Careers must be one of: Web Development, Mobile Development, UI/UX, Data Science, Business, Other"));
    }
    Ok(())
}
