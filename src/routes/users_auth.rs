/// Authentication endpoints: login, registration, refresh exchange and
/// revocation, all speaking the `ApiResponse` envelope.
///
/// Expected failures are mapped to 400 envelopes with the published
/// messages; anything unexpected propagates as `AppError` and becomes an
/// opaque 500.

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::api_response::ApiResponse;
use crate::auth::{issuer, TokenPair};
use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthError, DatabaseError, ErrorContext};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub user_name: String,
    pub password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub user_name: String,
    pub password: String,
    pub name: String,
    pub role: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub user_name: String,
    pub name: String,
    pub role: String,
}

/// POST /api/v2/UsersAuth/login
///
/// Credential failures never reveal whether the username exists.
pub async fn login(
    form: web::Json<LoginRequest>,
    pool: web::Data<PgPool>,
    jwt_config: web::Data<JwtSettings>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_login");

    match issuer::login(pool.get_ref(), jwt_config.get_ref(), &form.user_name, &form.password)
        .await
    {
        Ok(pair) => Ok(HttpResponse::Ok().json(ApiResponse::success(serde_json::to_value(pair)?))),
        Err(AppError::Auth(AuthError::InvalidCredentials)) => {
            tracing::warn!(request_id = %context.request_id, "Login rejected");
            Ok(HttpResponse::BadRequest()
                .json(ApiResponse::failure("Username or password is incorrect")))
        }
        Err(e) => Err(e),
    }
}

/// POST /api/v2/UsersAuth/register
///
/// No tokens are issued at registration; the caller logs in afterwards.
pub async fn register(
    form: web::Json<RegisterRequest>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_registration");

    match issuer::register(pool.get_ref(), &form.user_name, &form.password, &form.name, &form.role)
        .await
    {
        Ok(profile) => {
            tracing::info!(request_id = %context.request_id, user_id = %profile.id, "Registration complete");
            let echo = UserResponse {
                id: profile.id.to_string(),
                user_name: profile.user_name,
                name: profile.name,
                role: profile.role,
            };
            Ok(HttpResponse::Ok().json(ApiResponse::success(serde_json::to_value(echo)?)))
        }
        Err(AppError::Auth(AuthError::UsernameTaken))
        | Err(AppError::Database(DatabaseError::UniqueConstraintViolation(_))) => {
            Ok(HttpResponse::BadRequest().json(ApiResponse::failure("Username already exists")))
        }
        Err(AppError::Validation(e)) => {
            tracing::warn!(request_id = %context.request_id, error = %e, "Registration rejected");
            Ok(HttpResponse::BadRequest().json(ApiResponse::failure("Error while registering")))
        }
        Err(e) => Err(e),
    }
}

/// POST /api/v2/UsersAuth/refresh
///
/// Every expected denial collapses to the same "Token Invalid" answer; the
/// distinction between mismatch, expiry and reuse stays server-side.
pub async fn refresh(
    body: web::Json<TokenPair>,
    pool: web::Data<PgPool>,
    jwt_config: web::Data<JwtSettings>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("token_refresh");

    match issuer::refresh(
        pool.get_ref(),
        jwt_config.get_ref(),
        &body.access_token,
        &body.refresh_token,
    )
    .await
    {
        Ok(pair) => Ok(HttpResponse::Ok().json(ApiResponse::success(serde_json::to_value(pair)?))),
        Err(AppError::Auth(kind)) => {
            tracing::warn!(request_id = %context.request_id, kind = %kind, "Refresh denied");
            Ok(HttpResponse::BadRequest().json(ApiResponse::failure("Token Invalid")))
        }
        Err(e) => Err(e),
    }
}

/// POST /api/v2/UsersAuth/revoke
///
/// Always 200 on acceptance; revocation is idempotent.
pub async fn revoke(
    body: web::Json<TokenPair>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    issuer::revoke(pool.get_ref(), &body.access_token, &body.refresh_token).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::accepted()))
}
