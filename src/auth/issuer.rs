/// Token issuance flows: login, registration, refresh exchange, revocation.
///
/// Each flow is a terminal state machine — every expected failure maps to one
/// `AuthError` kind and nothing here retries. Retrying on authorization
/// failure is the client sender's job.

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::claims::Claims;
use crate::auth::jwt::{generate_access_token, parse_unverified_claims};
use crate::auth::password::{hash_password, verify_password};
use crate::auth::refresh_token::{
    find_refresh_token, generate_refresh_token, invalidate_refresh_token,
    invalidate_token_family, rotate_refresh_token, save_refresh_token,
};
use crate::auth::TokenPair;
use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthError};
use crate::validators::{is_valid_name, is_valid_role, is_valid_username};

/// Profile returned by registration; no tokens are issued until login.
#[derive(Debug, Clone)]
pub struct UserProfile {
    pub id: Uuid,
    pub user_name: String,
    pub name: String,
    pub role: String,
}

/// Mint a fresh token family id.
fn new_token_family_id() -> String {
    format!("JTI{}", Uuid::new_v4())
}

/// Verify credentials and mint a new token pair under a fresh family id.
///
/// Unknown username and wrong password are indistinguishable to the caller.
pub async fn login(
    pool: &PgPool,
    jwt_config: &JwtSettings,
    user_name: &str,
    password: &str,
) -> Result<TokenPair, AppError> {
    let user = sqlx::query_as::<_, (Uuid, String, String, String)>(
        "SELECT id, user_name, role, password_hash FROM users WHERE LOWER(user_name) = LOWER($1)",
    )
    .bind(user_name)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::Auth(AuthError::InvalidCredentials))?;

    let (user_id, user_name, role, password_hash) = user;

    if !verify_password(password, &password_hash)? {
        return Err(AppError::Auth(AuthError::InvalidCredentials));
    }

    let jti = new_token_family_id();
    let access_token = generate_access_token(&user_id, &user_name, &role, &jti, jwt_config)?;
    let refresh_token = generate_refresh_token();
    save_refresh_token(
        pool,
        user_id,
        &jti,
        &refresh_token,
        jwt_config.refresh_token_expiry,
    )
    .await?;

    tracing::info!(user_id = %user_id, jti = %jti, "User logged in");

    Ok(TokenPair {
        access_token,
        refresh_token,
    })
}

/// Create a new principal. The username must be unique case-insensitively;
/// the requested role is created lazily on first use.
pub async fn register(
    pool: &PgPool,
    user_name: &str,
    password: &str,
    name: &str,
    role: &str,
) -> Result<UserProfile, AppError> {
    let user_name = is_valid_username(user_name)?;
    let name = is_valid_name(name)?;
    let role = is_valid_role(role)?;

    let taken = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM users WHERE LOWER(user_name) = LOWER($1)",
    )
    .bind(&user_name)
    .fetch_one(pool)
    .await?;
    if taken > 0 {
        return Err(AppError::Auth(AuthError::UsernameTaken));
    }

    let password_hash = hash_password(password)?;

    sqlx::query("INSERT INTO roles (name, created_at) VALUES ($1, $2) ON CONFLICT (name) DO NOTHING")
        .bind(&role)
        .bind(Utc::now())
        .execute(pool)
        .await?;

    let user_id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO users (id, user_name, name, role, password_hash, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(user_id)
    .bind(&user_name)
    .bind(&name)
    .bind(&role)
    .bind(&password_hash)
    .bind(Utc::now())
    .bind(Utc::now())
    .execute(pool)
    .await?;

    tracing::info!(user_id = %user_id, role = %role, "User registered");

    Ok(UserProfile {
        id: user_id,
        user_name,
        name,
        role,
    })
}

/// Exchange an expired access token plus its paired refresh token for a new
/// pair, rotating the refresh token within the same family.
///
/// Terminal outcomes, in order of evaluation:
/// 1. refresh token unknown or already invalidated   -> `InvalidToken`
/// 2. access token unparseable                       -> `Malformed`
/// 3. stored (user_id, jti) != access token claims   -> `TokenMismatch`,
///    presented record invalidated
/// 4. stored record past expiry                      -> `Expired`, invalidated
/// 5. lost a concurrent rotation race                -> `InvalidToken`
pub async fn refresh(
    pool: &PgPool,
    jwt_config: &JwtSettings,
    access_token: &str,
    refresh_token: &str,
) -> Result<TokenPair, AppError> {
    let stored = find_refresh_token(pool, refresh_token)
        .await?
        .ok_or(AppError::Auth(AuthError::InvalidToken))?;
    if !stored.is_valid {
        tracing::warn!(user_id = %stored.user_id, jti = %stored.jti, "Invalidated refresh token reused");
        return Err(AppError::Auth(AuthError::InvalidToken));
    }

    let claims = parse_unverified_claims(access_token)?;
    let claimed_user = claims.user_id()?;

    if stored.user_id != claimed_user || stored.jti != claims.jti {
        // Possible token substitution; the presented record is burned.
        tracing::warn!(user_id = %stored.user_id, jti = %stored.jti, "Refresh/access pair mismatch");
        invalidate_refresh_token(pool, refresh_token).await?;
        return Err(AppError::Auth(AuthError::TokenMismatch));
    }

    if stored.expires_at <= Utc::now() {
        invalidate_refresh_token(pool, refresh_token).await?;
        return Err(AppError::Auth(AuthError::Expired));
    }

    let new_refresh_token = rotate_refresh_token(
        pool,
        refresh_token,
        stored.user_id,
        &stored.jti,
        jwt_config.refresh_token_expiry,
    )
    .await?;

    // Re-fetch the principal: the role may have changed since first issuance.
    let (user_name, role) =
        sqlx::query_as::<_, (String, String)>("SELECT user_name, role FROM users WHERE id = $1")
            .bind(stored.user_id)
            .fetch_one(pool)
            .await?;

    let new_access_token =
        generate_access_token(&stored.user_id, &user_name, &role, &stored.jti, jwt_config)?;

    tracing::info!(user_id = %stored.user_id, jti = %stored.jti, "Token pair rotated");

    Ok(TokenPair {
        access_token: new_access_token,
        refresh_token: new_refresh_token,
    })
}

/// Invalidate the presented refresh token. When the pair correlates cleanly
/// the whole family is revoked; an unknown token is accepted silently so
/// revocation stays idempotent.
pub async fn revoke(
    pool: &PgPool,
    access_token: &str,
    refresh_token: &str,
) -> Result<(), AppError> {
    let stored = match find_refresh_token(pool, refresh_token).await? {
        Some(stored) => stored,
        None => return Ok(()),
    };

    let correlated = parse_unverified_claims(access_token)
        .ok()
        .and_then(|claims: Claims| claims.user_id().ok().map(|uid| (uid, claims.jti)));

    match correlated {
        Some((user_id, jti)) if user_id == stored.user_id && jti == stored.jti => {
            invalidate_token_family(pool, stored.user_id, &stored.jti).await?;
        }
        _ => {
            invalidate_refresh_token(pool, refresh_token).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn family_ids_carry_prefix_and_are_unique() {
        let a = new_token_family_id();
        let b = new_token_family_id();

        assert!(a.starts_with("JTI"));
        // "JTI" + hyphenated UUID
        assert_eq!(a.len(), 3 + 36);
        assert_ne!(a, b);
    }
}
