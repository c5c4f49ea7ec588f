use unicode_segmentation::UnicodeSegmentation;
use uuid::Uuid;

use super::AppError;

pub fn parse_uuid(value: &str, field: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(value.trim())
        .map_err(|_| AppError::validation_error(format!("{} is not a valid identifier", field)))
}

/// Trims the value and rejects it when blank or longer than `max_graphemes`.
pub fn required_text(value: &str, field: &str, max_graphemes: usize) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation_error(format!("{} is required", field)));
    }
    if trimmed.graphemes(true).count() > max_graphemes {
        return Err(AppError::validation_error(format!(
            "{} must be at most {} characters long",
            field, max_graphemes
        )));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use claim::{assert_err, assert_ok_eq};

    #[test]
    fn blank_text_is_rejected() {
        assert_err!(required_text("   ", "title", 10));
        assert_err!(required_text("", "title", 10));
    }

    #[test]
    fn text_is_trimmed() {
        assert_ok_eq!(required_text("  Gold  ", "title", 10), "Gold".to_string());
    }

    #[test]
    fn length_is_counted_in_graphemes() {
        let accented = "y\u{0306}e\u{0301}";
        assert_ok_eq!(required_text(accented, "title", 2), accented.to_string());
        assert_err!(required_text("abc", "title", 2));
    }

    #[test]
    fn malformed_identifiers_are_validation_errors() {
        let error = parse_uuid("not-a-uuid", "role_id").unwrap_err();
        assert_eq!(error.message(), "role_id is not a valid identifier");
    }
}
