/// Bearer-protected user endpoints.

use actix_web::{web, HttpResponse};
use sqlx::PgPool;
use uuid::Uuid;

use crate::api_response::ApiResponse;
use crate::auth::Claims;
use crate::error::AppError;
use crate::routes::users_auth::UserResponse;

/// GET /api/v2/users/me
///
/// Claims are injected by the JWT middleware; the profile is re-read from
/// the store so the response reflects current data, not token claims.
pub async fn get_current_user(
    claims: web::ReqData<Claims>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let user_id = claims.user_id()?;

    let user = sqlx::query_as::<_, (Uuid, String, String, String)>(
        "SELECT id, user_name, name, role FROM users WHERE id = $1",
    )
    .bind(user_id)
    .fetch_one(pool.get_ref())
    .await?;

    let profile = UserResponse {
        id: user.0.to_string(),
        user_name: user.1,
        name: user.2,
        role: user.3,
    };

    Ok(HttpResponse::Ok().json(ApiResponse::success(serde_json::to_value(profile)?)))
}
