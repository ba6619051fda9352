//! Validation helpers for DTOs.

use validator::ValidationError;

const MAX_CONTESTANT_ID_LENGTH: usize = 64;

/// Validates an externally issued contestant identifier: 1 to 64 visible
/// characters with no whitespace.
///
/// # Examples
///
/// ```ignore
/// validate_contestant_id("team-0042")  // Ok
/// validate_contestant_id("")           // Err - empty
/// validate_contestant_id("team 0042")  // Err - whitespace
/// ```
pub fn validate_contestant_id(id: &str) -> Result<(), ValidationError> {
    let length = id.chars().count();
    if length == 0 || length > MAX_CONTESTANT_ID_LENGTH {
        let mut err = ValidationError::new("contestant_id_length");
        err.message = Some(
            format!("Contestant ID must be 1 to {MAX_CONTESTANT_ID_LENGTH} characters (got {length})")
                .into(),
        );
        return Err(err);
    }

    if id.chars().any(|c| c.is_whitespace() || c.is_control()) {
        let mut err = ValidationError::new("contestant_id_format");
        err.message = Some("Contestant ID must not contain whitespace or control characters".into());
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_contestant_id_valid() {
        assert!(validate_contestant_id("team-0042").is_ok());
        assert!(validate_contestant_id("64f1c2e9a7b3").is_ok());
        assert!(validate_contestant_id("joueur_é").is_ok());
    }

    #[test]
    fn test_validate_contestant_id_invalid_length() {
        assert!(validate_contestant_id("").is_err());
        assert!(validate_contestant_id(&"x".repeat(65)).is_err());
    }

    #[test]
    fn test_validate_contestant_id_invalid_format() {
        assert!(validate_contestant_id("team 42").is_err()); // space
        assert!(validate_contestant_id("team\t42").is_err()); // tab
        assert!(validate_contestant_id("team\u{7}").is_err()); // control
    }
}
