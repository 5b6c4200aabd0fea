use std::sync::OnceLock;

use regex::Regex;

/// Extracts structured information from PostgreSQL constraint violations.
///
/// Postgres reports violations as free text plus an optional constraint name.
/// Constraint names follow the default naming scheme (`{table}_{column}_key`,
/// `{table}_{column}_check`, `{table}_{column}_fkey`), which is the primary
/// source; the message text is the fallback.
pub struct ConstraintParser;

struct Patterns {
    key_value: Regex,
    column: Regex,
    relation: Regex,
}

static PATTERNS: OnceLock<Patterns> = OnceLock::new();

/// Suffixes Postgres appends to generated constraint names.
const CONSTRAINT_SUFFIXES: &[&str] = &["_key", "_check", "_fkey", "_not_null", "_idx", "_pkey"];

impl ConstraintParser {
    fn patterns() -> &'static Patterns {
        PATTERNS.get_or_init(|| Patterns {
            // DETAIL: Key (username)=(alice) already exists.
            key_value: Regex::new(r"Key \(([^)]+)\)=\(([^)]*)\)").expect("static regex"),
            column: Regex::new(r#"column "([^"]+)""#).expect("static regex"),
            // `table "x"` in FK messages, `relation "x"` in not-null/check messages
            relation: Regex::new(r#"(?:table|relation) "([^"]+)""#).expect("static regex"),
        })
    }

    /// Returns `(entity, field, value)` for a unique violation.
    ///
    /// Postgres puts the `Key (field)=(value)` text in the error's DETAIL
    /// field, so `details` is searched before `message`.
    ///
    /// ```
    /// use contacts_rs::error::ConstraintParser;
    ///
    /// let message = "duplicate key value violates unique constraint \"users_username_key\"";
    /// let details = "Key (username)=(alice) already exists.";
    /// let parsed = ConstraintParser::parse_unique_violation(
    ///     message,
    ///     Some(details),
    ///     Some("users_username_key"),
    /// );
    /// assert_eq!(parsed, Some(("users".into(), "username".into(), "alice".into())));
    /// ```
    pub fn parse_unique_violation(
        message: &str,
        details: Option<&str>,
        constraint_name: Option<&str>,
    ) -> Option<(String, String, String)> {
        let detail = details
            .and_then(Self::extract_key_value)
            .or_else(|| Self::extract_key_value(message));

        if let Some((entity, field)) = constraint_name.and_then(Self::parse_constraint_name) {
            let value = detail
                .map(|(_, value)| value)
                .unwrap_or_else(|| "duplicate_value".to_string());
            return Some((entity, field, value));
        }

        let (field, value) = detail?;
        let entity = Self::extract_relation(message).unwrap_or_else(|| "resource".to_string());
        Some((entity, field, value))
    }

    /// Returns `(entity, field)` for a not-null violation.
    pub fn parse_not_null_violation(
        message: &str,
        constraint_name: Option<&str>,
    ) -> Option<(String, String)> {
        let field = Self::extract_column(message)?;
        let entity = Self::extract_relation(message)
            .or_else(|| constraint_name.and_then(Self::parse_constraint_name).map(|(e, _)| e))
            .unwrap_or_else(|| "resource".to_string());
        Some((entity, field))
    }

    /// Returns `(entity, field)` for a check violation.
    pub fn parse_check_violation(
        message: &str,
        constraint_name: Option<&str>,
    ) -> Option<(String, String)> {
        if let Some(parsed) = constraint_name.and_then(Self::parse_constraint_name) {
            return Some(parsed);
        }
        let field = Self::extract_column(message)?;
        let entity = Self::extract_relation(message).unwrap_or_else(|| "resource".to_string());
        Some((entity, field))
    }

    /// Splits a generated constraint name into `(table, column)`.
    ///
    /// The table is the first segment; everything between it and the suffix
    /// is the column, so multi-word columns survive:
    /// `users_username_key` -> `("users", "username")`,
    /// `users_created_at_check` -> `("users", "created_at")`.
    pub fn parse_constraint_name(constraint_name: &str) -> Option<(String, String)> {
        let stem = CONSTRAINT_SUFFIXES
            .iter()
            .find_map(|suffix| constraint_name.strip_suffix(suffix))?;
        let (table, column) = stem.split_once('_')?;
        if table.is_empty() || column.is_empty() {
            return None;
        }
        Some((table.to_string(), column.to_string()))
    }

    /// Extracts `(field, value)` from a `Key (field)=(value)` detail line.
    pub fn extract_key_value(message: &str) -> Option<(String, String)> {
        let caps = Self::patterns().key_value.captures(message)?;
        Some((caps.get(1)?.as_str().to_string(), caps.get(2)?.as_str().to_string()))
    }

    pub fn extract_column(message: &str) -> Option<String> {
        Self::patterns()
            .column
            .captures(message)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }

    pub fn extract_relation(message: &str) -> Option<String> {
        Self::patterns()
            .relation
            .captures(message)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }
}
