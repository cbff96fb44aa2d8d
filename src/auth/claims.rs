/// Access token claim set.
///
/// Self-contained: everything a request handler needs to identify the caller
/// travels inside the token. `jti` links the token to the refresh-token
/// family it was issued alongside and is preserved across rotations.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AuthError};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID as UUID string).
    pub sub: String,
    /// Username.
    pub name: String,
    /// The caller's single role.
    pub role: String,
    /// Token family id shared with the paired refresh token.
    pub jti: String,
    /// Expiration time (Unix timestamp).
    pub exp: i64,
    /// Issued at (Unix timestamp).
    pub iat: i64,
    /// Issuer.
    pub iss: String,
}

impl Claims {
    pub fn new(
        user_id: Uuid,
        name: String,
        role: String,
        jti: String,
        expiry_seconds: i64,
        issuer: String,
    ) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            sub: user_id.to_string(),
            name,
            role,
            jti,
            exp: now + expiry_seconds,
            iat: now,
            iss: issuer,
        }
    }

    /// Extract the user ID from the subject claim.
    pub fn user_id(&self) -> Result<Uuid, AppError> {
        Uuid::parse_str(&self.sub).map_err(|_| AppError::Auth(AuthError::Malformed))
    }

    pub fn is_expired(&self) -> bool {
        self.exp < chrono::Utc::now().timestamp()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_claims(expiry_seconds: i64) -> Claims {
        Claims::new(
            Uuid::new_v4(),
            "john".to_string(),
            "customer".to_string(),
            "JTI-test".to_string(),
            expiry_seconds,
            "test".to_string(),
        )
    }

    #[test]
    fn claims_carry_identity_and_family() {
        let user_id = Uuid::new_v4();
        let claims = Claims::new(
            user_id,
            "john".to_string(),
            "admin".to_string(),
            "JTI-1".to_string(),
            3600,
            "test".to_string(),
        );

        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.role, "admin");
        assert_eq!(claims.jti, "JTI-1");
        assert!(!claims.is_expired());
    }

    #[test]
    fn user_id_round_trips() {
        let claims = sample_claims(3600);
        assert_eq!(claims.user_id().unwrap().to_string(), claims.sub);
    }

    #[test]
    fn garbage_subject_is_rejected() {
        let mut claims = sample_claims(3600);
        claims.sub = "not-a-uuid".to_string();
        assert!(claims.user_id().is_err());
    }

    #[test]
    fn negative_expiry_is_expired() {
        assert!(sample_claims(-10).is_expired());
    }
}
