/// Pending email verifications
///
/// A row holds one outstanding code for an address. Registration rows also
/// carry the pending account's name and password hash; the user row is only
/// written once the code is confirmed. Rows are single use: a successful
/// confirmation deletes them.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE email_verifications (
///     id UUID PRIMARY KEY,
///     email VARCHAR(255) NOT NULL,
///     purpose verification_purpose NOT NULL,
///     code_hash CHAR(64) NOT NULL,
///     name VARCHAR(100),
///     password_hash TEXT,
///     expires_at TIMESTAMPTZ NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::verification::{code_ttl, hash_code};

/// What a code is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "verification_purpose", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum VerificationPurpose {
    Registration,
    PasswordReset,
}

impl VerificationPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationPurpose::Registration => "registration",
            VerificationPurpose::PasswordReset => "password_reset",
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EmailVerification {
    pub id: Uuid,
    pub email: String,
    pub purpose: VerificationPurpose,
    pub code_hash: String,
    pub name: Option<String>,
    pub password_hash: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Input for issuing a code
#[derive(Debug, Clone)]
pub struct IssueVerification {
    pub email: String,
    pub purpose: VerificationPurpose,
    pub code: String,
    pub name: Option<String>,
    pub password_hash: Option<String>,
}

impl EmailVerification {
    /// Replaces any earlier code of the same purpose for the address
    pub async fn issue(pool: &PgPool, data: IssueVerification) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM email_verifications WHERE email = $1 AND purpose = $2")
            .bind(&data.email)
            .bind(data.purpose)
            .execute(&mut *tx)
            .await?;

        let record = sqlx::query_as::<_, EmailVerification>(
            r#"
            INSERT INTO email_verifications
                (id, email, purpose, code_hash, name, password_hash, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, email, purpose, code_hash, name, password_hash, expires_at, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&data.email)
        .bind(data.purpose)
        .bind(hash_code(&data.email, &data.code))
        .bind(data.name)
        .bind(data.password_hash)
        .bind(Utc::now() + code_ttl())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(record)
    }

    /// Latest record for an address, expired or not
    pub async fn find_pending(
        pool: &PgPool,
        email: &str,
        purpose: VerificationPurpose,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, EmailVerification>(
            r#"
            SELECT id, email, purpose, code_hash, name, password_hash, expires_at, created_at
            FROM email_verifications
            WHERE email = $1 AND purpose = $2
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(email)
        .bind(purpose)
        .fetch_optional(pool)
        .await
    }

    /// Finds an unexpired record matching the address and code
    pub async fn find_valid(
        pool: &PgPool,
        email: &str,
        code: &str,
        purpose: VerificationPurpose,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, EmailVerification>(
            r#"
            SELECT id, email, purpose, code_hash, name, password_hash, expires_at, created_at
            FROM email_verifications
            WHERE email = $1 AND purpose = $2 AND code_hash = $3 AND expires_at > NOW()
            "#,
        )
        .bind(email)
        .bind(purpose)
        .bind(hash_code(email, code))
        .fetch_optional(pool)
        .await
    }

    /// Puts a new code on an existing record and restarts its expiry
    pub async fn refresh_code(pool: &PgPool, id: Uuid, email: &str, code: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE email_verifications SET code_hash = $2, expires_at = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(hash_code(email, code))
        .bind(Utc::now() + code_ttl())
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM email_verifications WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn purge_expired(pool: &PgPool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM email_verifications WHERE expires_at <= NOW()")
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_purpose_strings() {
        assert_eq!(VerificationPurpose::Registration.as_str(), "registration");
        assert_eq!(
            serde_json::to_string(&VerificationPurpose::PasswordReset).unwrap(),
            "\"password_reset\""
        );
    }
}
