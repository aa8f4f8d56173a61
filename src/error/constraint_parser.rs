use std::sync::OnceLock;

use regex::Regex;

/// Tables whose unique constraints follow the naming scheme below.
const KNOWN_TABLES: &[&str] = &[
    "edu_organizations",
    "schools",
    "grades",
    "groups",
    "users",
    "user_roles",
    "directors",
    "headmasters",
    "teachers",
    "students",
    "owners",
    "student_guardians",
];

/// Utility for parsing PostgreSQL constraint violation messages.
///
/// Constraint names in the schema follow `{table}_{columns}_{suffix}` where the
/// columns are joined by `_` and the suffix is `key`, `fkey` or `check`.
pub struct ConstraintParser;

/// Compiled regex patterns for constraint parsing, cached for performance
struct RegexPatterns {
    key_value: Regex,
    column_name: Regex,
    relation_name: Regex,
}

impl RegexPatterns {
    fn new() -> Self {
        // The patterns are literals; failing to compile them is a programming error.
        Self {
            // Matches "Key (field, field)=(value, value)" in DETAIL lines
            key_value: Regex::new(r"Key \(([^)]+)\)=\(([^)]*)\)").unwrap(),
            // Matches column names in quotes
            column_name: Regex::new(r#"column "([^"]+)""#).unwrap(),
            // Matches `table "x"` and `relation "x"`
            relation_name: Regex::new(r#"(?:table|relation) "([^"]+)""#).unwrap(),
        }
    }
}

/// Global regex patterns cache
static REGEX_PATTERNS: OnceLock<RegexPatterns> = OnceLock::new();

impl ConstraintParser {
    fn patterns() -> &'static RegexPatterns {
        REGEX_PATTERNS.get_or_init(RegexPatterns::new)
    }

    /// Parses a unique constraint violation.
    ///
    /// # Returns
    /// Optional tuple of (entity, field, value); multi-column keys keep the
    /// PostgreSQL `a, b` rendering for both field and value.
    pub fn parse_unique_violation(
        message: &str,
        constraint_name: Option<&str>,
    ) -> Option<(String, String, String)> {
        let (field, value) = Self::extract_key_value_from_message(message)?;
        let entity = constraint_name
            .and_then(|constraint| Self::entity_from_constraint(constraint, &field, "_key"))
            .or_else(|| Self::extract_table_from_message(message))
            .unwrap_or_else(|| "resource".to_string());
        Some((entity, field, value))
    }

    /// Parses a not null constraint violation into (entity, field).
    pub fn parse_not_null_violation(message: &str) -> Option<(String, String)> {
        let field = Self::extract_column_from_message(message)?;
        let entity =
            Self::extract_table_from_message(message).unwrap_or_else(|| "resource".to_string());
        Some((entity, field))
    }

    /// Parses a foreign key violation into (entity, field, referenced value).
    pub fn parse_foreign_key_violation(
        message: &str,
        constraint_name: Option<&str>,
    ) -> Option<(String, String, String)> {
        let (field, value) = Self::extract_key_value_from_message(message)?;
        let entity = constraint_name
            .and_then(|constraint| Self::entity_from_constraint(constraint, &field, "_fkey"))
            .or_else(|| Self::extract_table_from_message(message))
            .unwrap_or_else(|| "resource".to_string());
        Some((entity, field, value))
    }

    /// Parses a check constraint violation into (entity, constraint).
    pub fn parse_check_violation(
        message: &str,
        constraint_name: Option<&str>,
    ) -> Option<(String, String)> {
        let entity = Self::extract_table_from_message(message)?;
        let check = constraint_name
            .and_then(|name| name.strip_prefix(entity.as_str()))
            .and_then(|rest| rest.strip_prefix('_'))
            .and_then(|rest| rest.strip_suffix("_check"))
            .unwrap_or("check")
            .to_string();
        Some((entity, check))
    }

    /// Recovers the table name from a constraint named after its columns.
    ///
    /// `student_guardians_user_id_student_id_key` with field
    /// `user_id, student_id` yields `student_guardians`.
    pub fn entity_from_constraint(constraint: &str, field: &str, suffix: &str) -> Option<String> {
        let columns = field
            .split(',')
            .map(str::trim)
            .collect::<Vec<_>>()
            .join("_");
        constraint
            .strip_suffix(suffix)?
            .strip_suffix(columns.as_str())?
            .strip_suffix('_')
            .filter(|entity| !entity.is_empty())
            .map(str::to_string)
    }

    /// Splits a `{table}_{columns}_key` constraint name into (table, columns)
    /// without a DETAIL line to anchor the column list.
    ///
    /// The longest known table prefix wins, so `student_guardians_*` is not
    /// read as a `students` constraint.
    pub fn split_unique_constraint(constraint: &str) -> Option<(String, String)> {
        let body = constraint.strip_suffix("_key")?;
        KNOWN_TABLES
            .iter()
            .filter_map(|table| {
                let columns = body.strip_prefix(table)?.strip_prefix('_')?;
                (!columns.is_empty()).then_some((*table, columns))
            })
            .max_by_key(|(table, _)| table.len())
            .map(|(table, columns)| (table.to_string(), columns.to_string()))
    }

    /// Extracts a quoted column name from a database error message.
    pub fn extract_column_from_message(message: &str) -> Option<String> {
        Self::patterns()
            .column_name
            .captures(message)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }

    /// Extracts the first quoted table or relation name from a message.
    pub fn extract_table_from_message(message: &str) -> Option<String> {
        Self::patterns()
            .relation_name
            .captures(message)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }

    /// Extracts `Key (field)=(value)` from a DETAIL line.
    pub fn extract_key_value_from_message(message: &str) -> Option<(String, String)> {
        Self::patterns().key_value.captures(message).and_then(|caps| {
            let field = caps.get(1)?.as_str().to_string();
            let value = caps.get(2)?.as_str().to_string();
            Some((field, value))
        })
    }

    /// Splits a multi-column key rendering into its parts.
    pub fn split_composite(rendered: &str) -> Vec<&str> {
        rendered.split(',').map(str::trim).collect()
    }
}
