use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::Role;

/// Credential and reset-token access for the users table. These columns are
/// hidden from the collection, so they are read and written here only.
pub struct UserCredentials;

impl UserCredentials {
    /// Id and password hash for the account with this email
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<(Uuid, String)>, DatabaseError> {
        let row = sqlx::query_as::<_, (Uuid, String)>("SELECT id, password FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(pool)
            .await?;
        Ok(row)
    }

    pub async fn store_reset_token(
        pool: &PgPool,
        user_id: Uuid,
        digest: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        sqlx::query(
            "UPDATE users SET reset_password_token = $2, reset_password_expire = $3, updated_at = now() WHERE id = $1",
        )
        .bind(user_id)
        .bind(digest)
        .bind(expires_at)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Owner of an unexpired reset token digest
    pub async fn find_by_reset_digest(pool: &PgPool, digest: &str) -> Result<Option<Uuid>, DatabaseError> {
        let row = sqlx::query_as::<_, (Uuid,)>(
            "SELECT id FROM users WHERE reset_password_token = $1 AND reset_password_expire > now()",
        )
        .bind(digest)
        .fetch_optional(pool)
        .await?;
        Ok(row.map(|(id,)| id))
    }

    /// Store the new hash and consume the reset token
    pub async fn complete_reset(pool: &PgPool, user_id: Uuid, password_hash: &str) -> Result<(), DatabaseError> {
        sqlx::query(
            "UPDATE users SET password = $2, reset_password_token = NULL, reset_password_expire = NULL, \
             updated_at = now() WHERE id = $1",
        )
        .bind(user_id)
        .bind(password_hash)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Grant a role by email; false when no such account
    pub async fn set_role(pool: &PgPool, email: &str, role: Role) -> Result<bool, DatabaseError> {
        let result = sqlx::query("UPDATE users SET role = $2, updated_at = now() WHERE email = $1")
            .bind(email)
            .bind(role.as_str())
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
