/// Refresh token store.
///
/// One row per issued refresh token. Rows are never deleted, only marked
/// invalid, so a reuse attempt after rotation is observable. The plaintext
/// token is a 64-character random string handed to the client once; the
/// store keeps only its SHA-256 hash. Invariant: at most one row per
/// (user_id, jti) family is valid at any moment — `rotate_refresh_token`
/// enforces it with a compare-and-swap inside a single transaction.

use chrono::{DateTime, Duration, Utc};
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AuthError};

/// A persisted refresh token row, minus the hash itself.
#[derive(Debug, Clone)]
pub struct StoredRefreshToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub jti: String,
    pub expires_at: DateTime<Utc>,
    pub is_valid: bool,
}

/// Generate a new refresh token value: 64 random alphanumeric characters,
/// far above the 122-bit entropy floor for an unguessable credential.
pub fn generate_refresh_token() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect()
}

fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Persist a freshly issued refresh token bound to a token family.
pub async fn save_refresh_token(
    pool: &PgPool,
    user_id: Uuid,
    jti: &str,
    token: &str,
    expiry_seconds: i64,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO refresh_tokens (id, user_id, jti, token_hash, expires_at, is_valid, created_at)
        VALUES ($1, $2, $3, $4, $5, TRUE, $6)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(jti)
    .bind(hash_token(token))
    .bind(Utc::now() + Duration::seconds(expiry_seconds))
    .bind(Utc::now())
    .execute(pool)
    .await?;

    Ok(())
}

/// Look up the stored record for a presented token value.
pub async fn find_refresh_token(
    pool: &PgPool,
    token: &str,
) -> Result<Option<StoredRefreshToken>, AppError> {
    let row = sqlx::query_as::<_, (Uuid, Uuid, String, DateTime<Utc>, bool)>(
        r#"
        SELECT id, user_id, jti, expires_at, is_valid
        FROM refresh_tokens
        WHERE token_hash = $1
        "#,
    )
    .bind(hash_token(token))
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|(id, user_id, jti, expires_at, is_valid)| StoredRefreshToken {
        id,
        user_id,
        jti,
        expires_at,
        is_valid,
    }))
}

/// Invalidate a single refresh token record.
pub async fn invalidate_refresh_token(pool: &PgPool, token: &str) -> Result<(), AppError> {
    sqlx::query(
        r#"
        UPDATE refresh_tokens
        SET is_valid = FALSE, revoked_at = $1
        WHERE token_hash = $2
        "#,
    )
    .bind(Utc::now())
    .bind(hash_token(token))
    .execute(pool)
    .await?;

    Ok(())
}

/// Invalidate every record in a token family.
pub async fn invalidate_token_family(
    pool: &PgPool,
    user_id: Uuid,
    jti: &str,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        UPDATE refresh_tokens
        SET is_valid = FALSE, revoked_at = $1
        WHERE user_id = $2 AND jti = $3 AND is_valid = TRUE
        "#,
    )
    .bind(Utc::now())
    .bind(user_id)
    .bind(jti)
    .execute(pool)
    .await?;

    tracing::info!(user_id = %user_id, jti = %jti, "Refresh token family invalidated");
    Ok(())
}

/// Replace a refresh token with a successor in the same family.
///
/// The invalidation of the old row is guarded with `is_valid = TRUE`: of two
/// rotations racing on the same stale token, exactly one observes an affected
/// row and wins; the loser fails `InvalidToken`. Both statements run in one
/// transaction, so a crash cannot leave a family with two valid rows.
pub async fn rotate_refresh_token(
    pool: &PgPool,
    old_token: &str,
    user_id: Uuid,
    jti: &str,
    expiry_seconds: i64,
) -> Result<String, AppError> {
    let mut tx = pool.begin().await?;

    let invalidated = sqlx::query(
        r#"
        UPDATE refresh_tokens
        SET is_valid = FALSE, revoked_at = $1
        WHERE token_hash = $2 AND is_valid = TRUE
        "#,
    )
    .bind(Utc::now())
    .bind(hash_token(old_token))
    .execute(&mut tx)
    .await?;

    if invalidated.rows_affected() == 0 {
        // Lost the race, or the record was invalidated out from under us.
        return Err(AppError::Auth(AuthError::InvalidToken));
    }

    let new_token = generate_refresh_token();
    sqlx::query(
        r#"
        INSERT INTO refresh_tokens (id, user_id, jti, token_hash, expires_at, is_valid, created_at)
        VALUES ($1, $2, $3, $4, $5, TRUE, $6)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(jti)
    .bind(hash_token(&new_token))
    .bind(Utc::now() + Duration::seconds(expiry_seconds))
    .bind(Utc::now())
    .execute(&mut tx)
    .await?;

    tx.commit().await?;

    Ok(new_token)
}
