/// Authentication: token signing/validation, password hashing, the refresh
/// token store and the issuance flows built on top of them.

mod claims;
mod jwt;
mod password;
mod refresh_token;

pub mod issuer;

pub use claims::Claims;
pub use jwt::{generate_access_token, parse_unverified_claims, validate_access_token};
pub use password::{hash_password, verify_password};
pub use refresh_token::{
    find_refresh_token, generate_refresh_token, invalidate_refresh_token,
    invalidate_token_family, rotate_refresh_token, save_refresh_token, StoredRefreshToken,
};

use serde::{Deserialize, Serialize};

/// The externally visible access/refresh pair. Serialized camelCase on the
/// wire; the same shape is used as the body of refresh and revoke requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}
