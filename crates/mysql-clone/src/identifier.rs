//! Centralized identifier filtering and quoting for SQL injection prevention.
//!
//! Identifiers (schema and table names) cannot be passed as parameters in
//! prepared statements - only data values can be parameterized. Every name
//! that ends up interpolated into a generated statement or an export tool
//! argument goes through this module first:
//!
//! 1. [`is_safe`] - strict allow-list filter (alphanumeric, underscore,
//!    dollar), applied uniformly to exclusion entries and catalog results
//! 2. [`quote`] - backtick quoting with embedded backticks doubled
//!
//! The allow-list is the sole injection defense; quoting is belt on top of
//! it for names that reach generated SQL.

/// Maximum identifier length (MySQL limit).
const MAX_IDENTIFIER_LENGTH: usize = 64;

/// Check a name against the strict identifier allow-list.
///
/// Accepts non-empty names of at most 64 bytes consisting solely of ASCII
/// alphanumerics, underscores, and dollar signs.
pub fn is_safe(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_IDENTIFIER_LENGTH
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// Quote a MySQL identifier using backticks.
///
/// Escapes backticks by doubling them and wraps in backticks.
pub fn quote(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Strip quoting characters and surrounding whitespace from a
/// user-supplied exclusion entry.
pub fn unquote(entry: &str) -> String {
    entry
        .trim()
        .trim_matches(|c| c == '`' || c == '"' || c == '\'')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_safe_accepts_plain_names() {
        assert!(is_safe("users"));
        assert!(is_safe("my_table"));
        assert!(is_safe("Table123"));
        assert!(is_safe("audit$log"));
    }

    #[test]
    fn test_is_safe_rejects_empty() {
        assert!(!is_safe(""));
    }

    #[test]
    fn test_is_safe_rejects_injection_characters() {
        assert!(!is_safe("users; DROP TABLE users"));
        assert!(!is_safe("users--"));
        assert!(!is_safe("users`"));
        assert!(!is_safe("sch.tab"));
        assert!(!is_safe("name with spaces"));
        assert!(!is_safe("tab\0le"));
    }

    #[test]
    fn test_is_safe_rejects_too_long() {
        let long_name = "a".repeat(MAX_IDENTIFIER_LENGTH + 1);
        assert!(!is_safe(&long_name));
        let max_name = "a".repeat(MAX_IDENTIFIER_LENGTH);
        assert!(is_safe(&max_name));
    }

    #[test]
    fn test_quote_normal() {
        assert_eq!(quote("users"), "`users`");
        assert_eq!(quote("my_table"), "`my_table`");
    }

    #[test]
    fn test_quote_escapes_backtick() {
        assert_eq!(quote("table`name"), "`table``name`");
        assert_eq!(quote("a`b`c"), "`a``b``c`");
    }

    #[test]
    fn test_unquote_strips_quoting_and_whitespace() {
        assert_eq!(unquote(" `orders` "), "orders");
        assert_eq!(unquote("\"audit_log\""), "audit_log");
        assert_eq!(unquote("'users'"), "users");
        assert_eq!(unquote("plain"), "plain");
    }
}
