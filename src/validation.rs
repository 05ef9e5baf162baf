//! Character name validation.

use std::collections::HashSet;

use crate::realm::errors::RealmError;

/// Character name validation errors with helpful messages
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum NameError {
    #[error("Name is too short (minimum {min} characters)")]
    TooShort { min: usize },

    #[error("Name is too long (maximum {max} characters)")]
    TooLong { max: usize },

    #[error("Name cannot start or end with whitespace")]
    InvalidWhitespace,

    #[error("Name contains invalid characters: {chars}")]
    InvalidCharacters { chars: String },

    #[error("Name is reserved")]
    Reserved,
}

impl From<NameError> for RealmError {
    fn from(err: NameError) -> Self {
        RealmError::InvalidName(err.to_string())
    }
}

/// Character name rules configuration
#[derive(Debug, Clone)]
pub struct NameRules {
    pub min_length: usize,
    pub max_length: usize,
    pub allow_spaces: bool,
}

impl Default for NameRules {
    fn default() -> Self {
        NameRules {
            min_length: 2,
            max_length: 24,
            allow_spaces: true,
        }
    }
}

fn reserved_names() -> HashSet<&'static str> {
    [
        "admin", "administrator", "root", "system", "moderator", "guard", "king", "queen",
        "steward", "herald", "realm", "world", "calendar", "server", "null", "none",
    ]
    .iter()
    .copied()
    .collect()
}

/// Validate a name against `rules`, returning the trimmed name.
pub fn validate_name(name: &str, rules: &NameRules) -> Result<String, NameError> {
    let trimmed = name.trim();

    if trimmed != name {
        return Err(NameError::InvalidWhitespace);
    }
    let length = trimmed.chars().count();
    if length < rules.min_length {
        return Err(NameError::TooShort {
            min: rules.min_length,
        });
    }
    if length > rules.max_length {
        return Err(NameError::TooLong {
            max: rules.max_length,
        });
    }
    if reserved_names().contains(trimmed.to_lowercase().as_str()) {
        return Err(NameError::Reserved);
    }

    let mut invalid: Vec<char> = trimmed
        .chars()
        .filter(|&ch| {
            let ok = ch.is_alphanumeric()
                || ch == '_'
                || ch == '-'
                || ch == '\''
                || (ch == ' ' && rules.allow_spaces);
            !ok
        })
        .collect();
    if !invalid.is_empty() {
        invalid.sort_unstable();
        invalid.dedup();
        let chars = invalid
            .into_iter()
            .map(|c| {
                if c.is_control() {
                    format!("\\u{{{:04x}}}", c as u32)
                } else {
                    c.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join("");
        return Err(NameError::InvalidCharacters { chars });
    }
    if trimmed.contains("  ") {
        return Err(NameError::InvalidWhitespace);
    }

    Ok(trimmed.to_string())
}

/// Validate a display name with the default rules.
pub fn validate_character_name(name: &str) -> Result<String, RealmError> {
    Ok(validate_name(name, &NameRules::default())?)
}

/// Validate a username (the storage key): no spaces, folded to lowercase.
pub fn validate_username(name: &str) -> Result<String, RealmError> {
    let rules = NameRules {
        allow_spaces: false,
        ..NameRules::default()
    };
    Ok(validate_name(name, &rules)?.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usernames_fold_case_and_reject_spaces() {
        assert_eq!(validate_username("Aldric").unwrap(), "aldric");
        assert!(matches!(
            validate_username("sir aldric"),
            Err(RealmError::InvalidName(_))
        ));
        assert!(validate_username("Admin").is_err());
    }

    #[test]
    fn accepts_ordinary_names() {
        assert_eq!(validate_character_name("Aldric").unwrap(), "Aldric");
        assert_eq!(validate_character_name("Mary-Jane O'Hara").unwrap(), "Mary-Jane O'Hara");
        assert_eq!(validate_character_name("Björn").unwrap(), "Björn");
    }

    #[test]
    fn rejects_bad_names() {
        let rules = NameRules::default();
        assert_eq!(validate_name("a", &rules), Err(NameError::TooShort { min: 2 }));
        assert_eq!(
            validate_name(&"x".repeat(25), &rules),
            Err(NameError::TooLong { max: 24 })
        );
        assert_eq!(validate_name(" bob", &rules), Err(NameError::InvalidWhitespace));
        assert_eq!(validate_name("bo  b", &rules), Err(NameError::InvalidWhitespace));
        assert_eq!(validate_name("Admin", &rules), Err(NameError::Reserved));
        assert!(matches!(
            validate_name("bob/../x", &rules),
            Err(NameError::InvalidCharacters { .. })
        ));
        assert!(matches!(
            validate_name("bob\nsmith", &rules),
            Err(NameError::InvalidCharacters { .. })
        ));
    }

    #[test]
    fn converts_into_realm_error() {
        let err = validate_character_name("x").unwrap_err();
        assert!(matches!(err, RealmError::InvalidName(_)));
    }
}
