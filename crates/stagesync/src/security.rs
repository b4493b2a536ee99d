//! SQL injection safeguards for generated statements.
//!
//! The join-update and staging statements interpolate database, table, and
//! column names as bare identifiers, so every name is validated before it
//! reaches a statement string. Literal escaping covers the catalog probe,
//! where the schema and table names appear in string-literal position.

use crate::error::{Error, Result};

/// MySQL's identifier length limit.
const MAX_IDENTIFIER_LEN: usize = 64;

/// Validate a SQL identifier (database, table, or column name).
///
/// Enforces strict character rules:
/// - Must not be empty
/// - Maximum 64 characters
/// - Must start with an ASCII letter or underscore
/// - May only contain ASCII alphanumeric characters and underscores
///
/// Char-iteration instead of regex keeps validation allocation-free on the
/// statement-building path.
///
/// # Examples
///
/// ```
/// use stagesync::security::validate_identifier;
///
/// assert!(validate_identifier("items").is_ok());
/// assert!(validate_identifier("items_dummy").is_ok());
/// assert!(validate_identifier("_private").is_ok());
///
/// assert!(validate_identifier("x; DROP TABLE items--").is_err());
/// assert!(validate_identifier("").is_err());
/// assert!(validate_identifier("1st").is_err());
/// ```
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::config("SQL identifier cannot be empty"));
    }

    if name.len() > MAX_IDENTIFIER_LEN {
        return Err(Error::config(format!(
            "SQL identifier too long: {} chars (max {})",
            name.len(),
            MAX_IDENTIFIER_LEN
        )));
    }

    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => {
            return Err(Error::config(format!(
                "invalid SQL identifier '{name}': must start with a letter or underscore"
            )));
        }
    }

    for c in chars {
        if !c.is_ascii_alphanumeric() && c != '_' {
            return Err(Error::config(format!(
                "invalid SQL identifier '{name}': contains invalid character '{c}'"
            )));
        }
    }

    Ok(())
}

/// Escape a string value for a single-quoted SQL literal context.
///
/// Replaces `'` with `''`. Used for the `information_schema` existence
/// probe, which is issued as a pre-built SQL string.
pub fn escape_literal(value: &str) -> String {
    if !value.contains('\'') {
        return value.to_string();
    }
    value.replace('\'', "''")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_identifiers() {
        assert!(validate_identifier("items").is_ok());
        assert!(validate_identifier("items_dummy").is_ok());
        assert!(validate_identifier("_private").is_ok());
        assert!(validate_identifier("COLUMN_123").is_ok());
        assert!(validate_identifier("a").is_ok());
    }

    #[test]
    fn test_length_limit() {
        let max = "a".repeat(64);
        assert!(validate_identifier(&max).is_ok());

        let long = "a".repeat(65);
        assert!(validate_identifier(&long).is_err());
    }

    #[test]
    fn test_injection_attempts() {
        assert!(validate_identifier("x; DROP TABLE items--").is_err());
        assert!(validate_identifier("x' OR '1'='1").is_err());
        assert!(validate_identifier("db.table").is_err());
        assert!(validate_identifier("name with space").is_err());
        assert!(validate_identifier("x`").is_err());
        assert!(validate_identifier("x\n").is_err());
        assert!(validate_identifier("x\0").is_err());
        // Unicode smuggling
        assert!(validate_identifier("tabl\u{0435}").is_err());
    }

    #[test]
    fn test_escape_literal() {
        assert_eq!(escape_literal("items"), "items");
        assert_eq!(escape_literal("don't"), "don''t");
        assert_eq!(
            escape_literal("x'; DROP TABLE items--"),
            "x''; DROP TABLE items--"
        );
        assert_eq!(escape_literal(""), "");
    }
}
