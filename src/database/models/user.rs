use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::auth;
use crate::database::repository::Assignment;
use crate::error::ApiError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Publisher,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Publisher => "publisher",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "publisher" => Ok(Role::Publisher),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

/// Public view of an account; credentials never leave the database layer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn from_row(row: Value) -> Result<Self, ApiError> {
        serde_json::from_value(row).map_err(|e| {
            tracing::error!("Malformed user row: {}", e);
            ApiError::internal_server_error("Server Error")
        })
    }
}

/// Body of self-registration and admin user creation
#[derive(Debug, Default, Deserialize, Validate)]
pub struct CreateUser {
    #[validate(required(message = "Name is required"), custom(function = "validate_name"))]
    pub name: Option<String>,
    #[validate(required(message = "Email is required"), email(message = "Please enter a valid email"))]
    pub email: Option<String>,
    #[validate(required(message = "Password is required"), length(min = 6, message = "Minimum is 6 characters"))]
    pub password: Option<String>,
    pub role: Option<Role>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateUser {
    #[validate(custom(function = "validate_name"))]
    pub name: Option<String>,
    #[validate(email(message = "Please enter a valid email"))]
    pub email: Option<String>,
    #[validate(length(min = 6, message = "Minimum is 6 characters"))]
    pub password: Option<String>,
    pub role: Option<Role>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[validate(required(message = "Password is required"), length(min = 6, message = "Minimum is 6 characters"))]
    pub password: Option<String>,
}

/// Self-registration: validates, refuses the admin role, hashes the password
pub async fn prepare_register(input: CreateUser) -> Result<Vec<Assignment>, ApiError> {
    let mut messages = match input.validate() {
        Ok(()) => Vec::new(),
        Err(errors) => match ApiError::from(errors) {
            ApiError::ValidationError(messages) => messages,
            other => return Err(other),
        },
    };
    if input.role == Some(Role::Admin) {
        messages.push("Role admin cannot be self-assigned".to_string());
    }
    if !messages.is_empty() {
        return Err(ApiError::validation_error(messages));
    }
    new_user(input).await
}

/// Admin creation: any role may be granted
pub async fn prepare_create(input: CreateUser) -> Result<Vec<Assignment>, ApiError> {
    input.validate()?;
    new_user(input).await
}

/// Validate supplied fields, re-hashing a changed password
pub async fn prepare_update(input: UpdateUser) -> Result<Vec<Assignment>, ApiError> {
    input.validate()?;

    let mut row: Vec<Assignment> = Vec::new();
    if let Some(name) = input.name {
        row.push(("name", json!(name.trim())));
    }
    if let Some(email) = input.email {
        row.push(("email", json!(email)));
    }
    if let Some(role) = input.role {
        row.push(("role", json!(role)));
    }
    if let Some(password) = input.password {
        row.push(("password", json!(auth::hash_password(password).await?)));
    }
    Ok(row)
}

async fn new_user(input: CreateUser) -> Result<Vec<Assignment>, ApiError> {
    let password = auth::hash_password(input.password.unwrap_or_default()).await?;
    Ok(vec![
        ("name", json!(input.name.unwrap_or_default().trim())),
        ("email", json!(input.email)),
        ("role", json!(input.role.unwrap_or_default())),
        ("password", json!(password)),
    ])
}

fn validate_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        let mut err = ValidationError::new("required");
        err.message = Some(Cow::Borrowed("Name is required"));
        return Err(err);
    }
    Ok(())
}
