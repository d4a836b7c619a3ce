use crate::error::ApiError;
use lazy_static::lazy_static;
use regex::Regex;

pub fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub fn check_email(email: &str) -> Result<(), ApiError> {
    if is_valid_email(email) {
        Ok(())
    } else {
        Err(ApiError::validation("invalid email address"))
    }
}

pub fn check_username(username: &str) -> Result<(), ApiError> {
    let len = username.chars().count();
    if !(2..=20).contains(&len) {
        return Err(ApiError::validation(
            "username must be between 2 and 20 characters",
        ));
    }
    if !username.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-') {
        return Err(ApiError::validation(
            "username may only contain letters, digits, '-' and '_'",
        ));
    }
    Ok(())
}

pub fn check_password(password: &str) -> Result<(), ApiError> {
    if password.len() < 8 {
        return Err(ApiError::validation("password too short"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_addresses() {
        assert!(is_valid_email("a@x.com"));
        assert!(is_valid_email("alice.smith+tag@example.co.uk"));
    }

    #[test]
    fn rejects_junk() {
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("a b@x.com"));
        assert!(!is_valid_email("a@x"));
    }

    #[test]
    fn username_bounds() {
        assert!(check_username("al").is_ok());
        assert!(check_username("a").is_err());
        assert!(check_username(&"a".repeat(21)).is_err());
        assert!(check_username("alice bob").is_err());
        assert!(check_username("alice_bob-1").is_ok());
    }

    #[test]
    fn password_minimum_length() {
        assert!(check_password("1234567").is_err());
        assert!(check_password("12345678").is_ok());
    }
}
