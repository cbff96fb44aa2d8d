/// Input validators for the registration and login payloads.
/// Length limits double as DoS protection on the public endpoints.

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::ValidationError;

const MAX_USERNAME_LENGTH: usize = 64;
const MIN_USERNAME_LENGTH: usize = 3;
const MAX_NAME_LENGTH: usize = 256;
const MIN_NAME_LENGTH: usize = 1;
const MAX_ROLE_LENGTH: usize = 32;

lazy_static! {
    // Letters, digits and a handful of separators; covers plain handles and
    // email-style usernames.
    static ref USERNAME_REGEX: Regex =
        Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9@._-]*$").unwrap();

    static ref ROLE_REGEX: Regex = Regex::new(r"^[a-zA-Z][a-zA-Z0-9_-]*$").unwrap();
}

/// Validates a username and returns it trimmed.
pub fn is_valid_username(username: &str) -> Result<String, ValidationError> {
    let trimmed = username.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("username".to_string()));
    }
    if trimmed.len() < MIN_USERNAME_LENGTH {
        return Err(ValidationError::TooShort(
            "username".to_string(),
            MIN_USERNAME_LENGTH,
        ));
    }
    if trimmed.len() > MAX_USERNAME_LENGTH {
        return Err(ValidationError::TooLong(
            "username".to_string(),
            MAX_USERNAME_LENGTH,
        ));
    }
    if !USERNAME_REGEX.is_match(trimmed) {
        return Err(ValidationError::InvalidFormat("username".to_string()));
    }

    Ok(trimmed.to_string())
}

/// Validates a display name and returns it trimmed.
pub fn is_valid_name(name: &str) -> Result<String, ValidationError> {
    let trimmed = name.trim();

    if trimmed.is_empty() || trimmed.len() < MIN_NAME_LENGTH {
        return Err(ValidationError::EmptyField("name".to_string()));
    }
    if trimmed.len() > MAX_NAME_LENGTH {
        return Err(ValidationError::TooLong(
            "name".to_string(),
            MAX_NAME_LENGTH,
        ));
    }
    if trimmed.chars().any(|c| c.is_control()) {
        return Err(ValidationError::InvalidFormat("name".to_string()));
    }

    Ok(trimmed.to_string())
}

/// Validates a role name and returns it lowercased; roles are case-folded so
/// "Admin" and "admin" name the same role.
pub fn is_valid_role(role: &str) -> Result<String, ValidationError> {
    let trimmed = role.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("role".to_string()));
    }
    if trimmed.len() > MAX_ROLE_LENGTH {
        return Err(ValidationError::TooLong(
            "role".to_string(),
            MAX_ROLE_LENGTH,
        ));
    }
    if !ROLE_REGEX.is_match(trimmed) {
        return Err(ValidationError::InvalidFormat("role".to_string()));
    }

    Ok(trimmed.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_and_email_style_usernames() {
        for username in ["john", "john.doe", "john@example.com", "user_1-a"] {
            assert!(is_valid_username(username).is_ok(), "{}", username);
        }
    }

    #[test]
    fn rejects_bad_usernames() {
        let long = "a".repeat(MAX_USERNAME_LENGTH + 1);
        for username in ["", "ab", "_leading", "has space", long.as_str()] {
            assert!(is_valid_username(username).is_err(), "{:?}", username);
        }
    }

    #[test]
    fn trims_surrounding_whitespace() {
        assert_eq!(is_valid_username("  john  ").unwrap(), "john");
        assert_eq!(is_valid_name("  John Doe ").unwrap(), "John Doe");
    }

    #[test]
    fn rejects_names_with_control_characters() {
        assert!(is_valid_name("John\u{0000}Doe").is_err());
        assert!(is_valid_name("\n").is_err());
    }

    #[test]
    fn roles_are_case_folded() {
        assert_eq!(is_valid_role("Admin").unwrap(), "admin");
        assert!(is_valid_role("bad role!").is_err());
        assert!(is_valid_role("").is_err());
    }
}
