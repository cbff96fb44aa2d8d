/// Access token signing and validation.
///
/// Stateless: every function is a pure function of the configured secret,
/// the claims and the clock. Two read paths exist on purpose — the full
/// verification used to authorize requests, and an unverified claim decode
/// used only to correlate a refresh request with its stored refresh-token
/// record (an expired token is still trusted for identity extraction there).

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::auth::claims::Claims;
use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthError};

/// Sign a new access token for a user.
pub fn generate_access_token(
    user_id: &Uuid,
    username: &str,
    role: &str,
    jti: &str,
    config: &JwtSettings,
) -> Result<String, AppError> {
    let claims = Claims::new(
        *user_id,
        username.to_string(),
        role.to_string(),
        jti.to_string(),
        config.access_token_expiry,
        config.issuer.clone(),
    );

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
}

/// Validate an access token: signature, issuer and expiry.
///
/// # Errors
/// `AuthError::Expired` for a correctly signed but stale token,
/// `AuthError::InvalidToken` for anything else.
pub fn validate_access_token(token: &str, config: &JwtSettings) -> Result<Claims, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[&config.issuer]);

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| {
        tracing::warn!("Access token validation failed: {}", e);
        match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                AppError::Auth(AuthError::Expired)
            }
            _ => AppError::Auth(AuthError::InvalidToken),
        }
    })
}

/// Decode claims without checking the signature or expiry.
///
/// Used only by the refresh and revoke flows, which must read the subject
/// and family id out of an access token that has typically already expired.
/// Trust decisions are made against the refresh-token store, never against
/// these claims alone.
pub fn parse_unverified_claims(token: &str) -> Result<Claims, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::warn!("Unparseable access token presented: {}", e);
            AppError::Auth(AuthError::Malformed)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get_test_config() -> JwtSettings {
        JwtSettings {
            secret: "test-secret-key-at-least-32-characters-long".to_string(),
            access_token_expiry: 3600,
            refresh_token_expiry: 2592000,
            issuer: "test".to_string(),
        }
    }

    fn expired_token(config: &JwtSettings) -> String {
        let claims = Claims::new(
            Uuid::new_v4(),
            "john".to_string(),
            "customer".to_string(),
            "JTI-old".to_string(),
            -3600,
            config.issuer.clone(),
        );
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.secret.as_bytes()),
        )
        .expect("Failed to encode token")
    }

    #[test]
    fn generate_and_validate_round_trip() {
        let config = get_test_config();
        let user_id = Uuid::new_v4();

        let token = generate_access_token(&user_id, "john", "admin", "JTI-1", &config)
            .expect("Failed to generate token");
        let claims = validate_access_token(&token, &config).expect("Failed to validate token");

        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.name, "john");
        assert_eq!(claims.role, "admin");
        assert_eq!(claims.jti, "JTI-1");
        assert_eq!(claims.iss, "test");
    }

    #[test]
    fn tampered_token_is_rejected() {
        let config = get_test_config();
        let token = generate_access_token(&Uuid::new_v4(), "john", "customer", "JTI-1", &config)
            .expect("Failed to generate token");

        let tampered = format!("{}X", token);
        assert!(validate_access_token(&tampered, &config).is_err());
    }

    #[test]
    fn wrong_issuer_is_rejected() {
        let mut config = get_test_config();
        let token = generate_access_token(&Uuid::new_v4(), "john", "customer", "JTI-1", &config)
            .expect("Failed to generate token");

        config.issuer = "someone-else".to_string();
        assert!(validate_access_token(&token, &config).is_err());
    }

    #[test]
    fn expired_token_fails_validation_with_expired_kind() {
        let config = get_test_config();
        let token = expired_token(&config);

        match validate_access_token(&token, &config) {
            Err(AppError::Auth(AuthError::Expired)) => (),
            other => panic!("Expected Expired, got {:?}", other.map(|c| c.sub)),
        }
    }

    #[test]
    fn expired_token_still_yields_unverified_claims() {
        let config = get_test_config();
        let token = expired_token(&config);

        let claims = parse_unverified_claims(&token).expect("Claims should decode");
        assert_eq!(claims.jti, "JTI-old");
        assert!(claims.is_expired());
    }

    #[test]
    fn garbage_fails_unverified_parse_as_malformed() {
        match parse_unverified_claims("not.a.token") {
            Err(AppError::Auth(AuthError::Malformed)) => (),
            other => panic!("Expected Malformed, got {:?}", other.map(|c| c.sub)),
        }
    }
}
