use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

/// Pattern recommended by the WHATWG for `<input type="email">`, anchored at both ends.
static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
    )
    .expect("email pattern must compile")
});

/// Accumulates validation failures for a single form submission.
#[derive(Debug, Default, Clone)]
pub struct Validator {
    general_errors: Vec<String>,
    field_errors: HashMap<String, Vec<String>>,
}

impl Validator {
    /// True when no general or field error has been recorded.
    pub fn valid(&self) -> bool {
        self.general_errors.is_empty() && self.field_errors.is_empty()
    }

    /// Record an error that belongs to a specific form field.
    pub fn add_field_error(&mut self, field: &str, message: impl Into<String>) {
        self.field_errors
            .entry(field.to_owned())
            .or_default()
            .push(message.into());
    }

    /// Record an error that is not tied to any single field.
    pub fn add_general_error(&mut self, message: impl Into<String>) {
        self.general_errors.push(message.into());
    }

    /// Record `message` against `field` unless `ok` holds.
    pub fn check_field(&mut self, ok: bool, field: &str, message: &str) {
        if !ok {
            self.add_field_error(field, message);
        }
    }

    pub fn field_errors(&self, field: &str) -> &[String] {
        self.field_errors
            .get(field)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn general_errors(&self) -> &[String] {
        &self.general_errors
    }

    pub fn has_field_error(&self, field: &str) -> bool {
        !self.field_errors(field).is_empty()
    }
}

/// True when the value contains something other than whitespace.
pub fn not_blank(value: &str) -> bool {
    !value.trim().is_empty()
}

/// True when the value has at most `limit` characters (not bytes).
pub fn max_chars(value: &str, limit: usize) -> bool {
    value.chars().count() <= limit
}

/// True when the value has at least `limit` characters (not bytes).
pub fn min_chars(value: &str, limit: usize) -> bool {
    value.chars().count() >= limit
}

pub fn permitted_value<T: PartialEq>(value: T, permitted: &[T]) -> bool {
    permitted.contains(&value)
}

pub fn is_email_address(value: &str) -> bool {
    EMAIL_REGEX.is_match(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_blank_rejects_whitespace_only_values() {
        assert!(not_blank("hello"));
        assert!(not_blank("  x  "));
        assert!(!not_blank(""));
        assert!(!not_blank(" \t\n "));
    }

    #[test]
    fn char_limits_count_codepoints_not_bytes() {
        let value = "héllo wörld"; // 11 chars, 13 bytes
        assert_eq!(value.len(), 13);
        assert!(max_chars(value, 11));
        assert!(!max_chars(value, 10));
        assert!(min_chars(value, 11));
        assert!(!min_chars(value, 12));

        let emoji = "🦀🦀🦀";
        assert!(max_chars(emoji, 3));
        assert!(min_chars(emoji, 3));
        assert!(!min_chars(emoji, 4));
    }

    #[test]
    fn permitted_value_requires_exact_membership() {
        assert!(!permitted_value(2, &[1, 7, 365]));
        assert!(permitted_value(7, &[1, 7, 365]));
        assert!(!permitted_value(0, &[1, 7, 365]));
        assert!(permitted_value("b", &["a", "b"]));
        assert!(!permitted_value(1, &[]));
    }

    #[test]
    fn email_pattern_is_anchored() {
        assert!(is_email_address("a@b.co"));
        assert!(is_email_address("bob@example.com"));
        assert!(!is_email_address("not-an-email"));
        assert!(!is_email_address("a@"));
        assert!(!is_email_address(" a@b.co"));
        assert!(!is_email_address("a@b.co trailing"));
    }

    #[test]
    fn validator_tracks_field_and_general_errors() {
        let mut validator = Validator::default();
        assert!(validator.valid());

        validator.check_field(true, "title", "never recorded");
        assert!(validator.valid());

        validator.check_field(false, "title", "This field cannot be blank");
        validator.check_field(false, "title", "This field cannot be blank");
        assert!(!validator.valid());
        assert_eq!(validator.field_errors("title").len(), 2);
        assert!(validator.field_errors("content").is_empty());
        assert!(validator.has_field_error("title"));

        let mut general = Validator::default();
        general.add_general_error("Email or password is incorrect");
        assert!(!general.valid());
        assert_eq!(
            general.general_errors(),
            ["Email or password is incorrect".to_string()]
        );
    }
}
