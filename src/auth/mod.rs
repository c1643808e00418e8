use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::sync::OnceCell;
use uuid::Uuid;

use crate::config::SecurityConfig;

/// bcrypt work factor for stored passwords
pub const PASSWORD_HASH_COST: u32 = 10;

/// Lifetime of a password-reset token
pub const RESET_TOKEN_TTL_MINUTES: i64 = 10;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user id
    pub sub: Uuid,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn new(user_id: Uuid, security: &SecurityConfig) -> Self {
        let now = Utc::now();
        let exp = (now + Duration::seconds(security.jwt_expire_secs as i64)).timestamp();
        Self { sub: user_id, iat: now.timestamp(), exp }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("JWT secret is not configured")]
    InvalidSecret,

    #[error("JWT generation error: {0}")]
    TokenGeneration(String),

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    #[error("Password hashing task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Sign a token for the user
pub fn generate_jwt(user_id: Uuid, security: &SecurityConfig) -> Result<String, AuthError> {
    if security.jwt_secret.is_empty() {
        return Err(AuthError::InvalidSecret);
    }

    let encoding_key = EncodingKey::from_secret(security.jwt_secret.as_bytes());
    encode(&Header::default(), &Claims::new(user_id, security), &encoding_key)
        .map_err(|e| AuthError::TokenGeneration(e.to_string()))
}

/// Verify signature and expiry and return the claims
pub fn validate_jwt(token: &str, security: &SecurityConfig) -> Result<Claims, AuthError> {
    if security.jwt_secret.is_empty() {
        return Err(AuthError::InvalidSecret);
    }

    let decoding_key = DecodingKey::from_secret(security.jwt_secret.as_bytes());
    let mut validation = Validation::default();
    validation.leeway = 0;

    decode::<Claims>(token, &decoding_key, &validation)
        .map(|data| data.claims)
        .map_err(|e| AuthError::InvalidToken(e.to_string()))
}

/// Hash a plaintext password with a fresh random salt
pub async fn hash_password(password: String) -> Result<String, AuthError> {
    let hashed = tokio::task::spawn_blocking(move || bcrypt::hash(password, PASSWORD_HASH_COST)).await??;
    Ok(hashed)
}

/// Compare a candidate against a stored hash
pub async fn verify_password(candidate: String, hash: String) -> Result<bool, AuthError> {
    let matched = tokio::task::spawn_blocking(move || bcrypt::verify(candidate, &hash)).await??;
    Ok(matched)
}

/// Hash of a random secret nobody knows, verified against when a login names
/// an unknown account
pub async fn dummy_hash() -> Result<String, AuthError> {
    static DUMMY_HASH: OnceCell<String> = OnceCell::const_new();
    DUMMY_HASH
        .get_or_try_init(|| hash_password(ResetToken::generate().token))
        .await
        .cloned()
}

/// A freshly generated password-reset token: the plaintext goes to the user,
/// only the digest is stored.
#[derive(Debug, Clone)]
pub struct ResetToken {
    pub token: String,
    pub digest: String,
    pub expires_at: DateTime<Utc>,
}

impl ResetToken {
    pub fn generate() -> Self {
        let mut bytes = [0u8; 20];
        rand::thread_rng().fill_bytes(&mut bytes);
        let token = hex::encode(bytes);
        Self {
            digest: digest_reset_token(&token),
            token,
            expires_at: Utc::now() + Duration::minutes(RESET_TOKEN_TTL_MINUTES),
        }
    }
}

/// SHA-256 hex digest of a reset token
pub fn digest_reset_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}
