//! Table handles that index definitions are rendered against.
//!
//! Identifier quoting is the table model's job: [`TableIdentity::identifier`]
//! must return text that can be pasted into DDL as-is. Index rendering never
//! quotes or escapes anything it is handed.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Anything that can name the table an index is created on.
pub trait TableIdentity {
    /// Fully qualified, render-ready identifier (e.g. `public.people`)
    fn identifier(&self) -> &str;

    /// Schema the table lives in, when known
    ///
    /// Used to schema-qualify index names in `DROP INDEX` statements.
    fn schema(&self) -> Option<&str> {
        None
    }
}

impl TableIdentity for str {
    fn identifier(&self) -> &str {
        self
    }
}

impl TableIdentity for String {
    fn identifier(&self) -> &str {
        self.as_str()
    }
}

impl<T: TableIdentity + ?Sized> TableIdentity for &T {
    fn identifier(&self) -> &str {
        (**self).identifier()
    }

    fn schema(&self) -> Option<&str> {
        (**self).schema()
    }
}

/// Schema-qualified database object name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "DbObjectNameParts", into = "DbObjectNameParts")]
pub struct DbObjectName {
    schema: String,
    name: String,
    qualified_name: String,
}

#[derive(Serialize, Deserialize)]
struct DbObjectNameParts {
    schema: String,
    name: String,
}

impl From<DbObjectNameParts> for DbObjectName {
    fn from(parts: DbObjectNameParts) -> Self {
        DbObjectName::new(parts.schema, parts.name)
    }
}

impl From<DbObjectName> for DbObjectNameParts {
    fn from(name: DbObjectName) -> Self {
        DbObjectNameParts {
            schema: name.schema,
            name: name.name,
        }
    }
}

impl DbObjectName {
    /// Build a name from already render-ready parts
    #[must_use]
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        let schema = schema.into();
        let name = name.into();
        let qualified_name = format!("{}.{}", schema, name);
        Self {
            schema,
            name,
            qualified_name,
        }
    }

    /// Build a name from raw identifiers, double-quoting each part that
    /// PostgreSQL would otherwise case-fold or reject
    #[must_use]
    pub fn quoted(schema: &str, name: &str) -> Self {
        Self::new(quote_identifier(schema), quote_identifier(name))
    }

    /// Parse `schema.name`, defaulting the schema to `public`
    ///
    /// Splits on the first dot outside of double quotes.
    #[must_use]
    pub fn parse(qualified: &str) -> Self {
        match split_qualified(qualified) {
            (Some(schema), name) => Self::new(schema, name),
            (None, name) => Self::new("public", name),
        }
    }

    /// Schema part as rendered
    pub fn schema_name(&self) -> &str {
        &self.schema
    }

    /// Object name part as rendered
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `schema.name`
    pub fn qualified_name(&self) -> &str {
        &self.qualified_name
    }
}

impl TableIdentity for DbObjectName {
    fn identifier(&self) -> &str {
        &self.qualified_name
    }

    fn schema(&self) -> Option<&str> {
        Some(&self.schema)
    }
}

impl fmt::Display for DbObjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.qualified_name)
    }
}

static PLAIN_IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z_][a-z0-9_$]*$").expect("identifier pattern is valid"));

/// Keywords PostgreSQL reserves outright or allows only as function and type
/// names. Sorted for binary search.
const RESERVED_KEYWORDS: &[&str] = &[
    "all", "analyse", "analyze", "and", "any", "array", "as", "asc", "asymmetric",
    "authorization", "binary", "both", "case", "cast", "check", "collate",
    "collation", "column", "concurrently", "constraint", "create", "cross",
    "current_catalog", "current_date", "current_role", "current_schema",
    "current_time", "current_timestamp", "current_user", "default", "deferrable",
    "desc", "distinct", "do", "else", "end", "except", "false", "fetch", "for",
    "foreign", "freeze", "from", "full", "grant", "group", "having", "ilike", "in",
    "initially", "inner", "intersect", "into", "is", "isnull", "join", "lateral",
    "leading", "left", "like", "limit", "localtime", "localtimestamp", "natural",
    "not", "notnull", "null", "offset", "on", "only", "or", "order", "outer",
    "overlaps", "placing", "primary", "references", "returning", "right", "select",
    "session_user", "similar", "some", "symmetric", "system_user", "table",
    "tablesample", "then", "to", "trailing", "true", "union", "unique", "user",
    "using", "variadic", "verbose", "when", "where", "window", "with",
];

/// Quote an identifier unless it is a plain lower-case name that is not a
/// reserved keyword
pub fn quote_identifier(ident: &str) -> String {
    let plain = PLAIN_IDENTIFIER.is_match(ident) && RESERVED_KEYWORDS.binary_search(&ident).is_err();

    if plain {
        ident.to_string()
    } else {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }
}

/// Split `schema.name` on the first dot that is not inside double quotes
fn split_qualified(qualified: &str) -> (Option<&str>, &str) {
    let mut in_quotes = false;
    for (i, c) in qualified.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            '.' if !in_quotes => return (Some(&qualified[..i]), &qualified[i + 1..]),
            _ => {}
        }
    }
    (None, qualified)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qualified_identifier() {
        let table = DbObjectName::new("public", "people");
        assert_eq!(table.identifier(), "public.people");
        assert_eq!(table.schema(), Some("public"));
        assert_eq!(table.to_string(), "public.people");
    }

    #[test]
    fn test_quoted_only_when_needed() {
        let table = DbObjectName::quoted("Sales", "order items");
        assert_eq!(table.identifier(), "\"Sales\".\"order items\"");

        let plain = DbObjectName::quoted("public", "people_2");
        assert_eq!(plain.identifier(), "public.people_2");
    }

    #[test]
    fn test_reserved_keywords_are_quoted() {
        assert_eq!(DbObjectName::quoted("public", "order").identifier(), "public.\"order\"");
        assert_eq!(DbObjectName::quoted("public", "user").identifier(), "public.\"user\"");
        assert_eq!(DbObjectName::quoted("table", "people").identifier(), "\"table\".people");
        // non-reserved keywords are fine bare
        assert_eq!(quote_identifier("name"), "name");
        assert_eq!(quote_identifier("index"), "index");
        assert!(RESERVED_KEYWORDS.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn test_quote_identifier_escapes_embedded_quotes() {
        assert_eq!(quote_identifier("say\"what"), "\"say\"\"what\"");
        assert_eq!(quote_identifier("1st"), "\"1st\"");
    }

    #[test]
    fn test_parse_defaults_to_public() {
        assert_eq!(DbObjectName::parse("people"), DbObjectName::new("public", "people"));
        assert_eq!(DbObjectName::parse("hr.people"), DbObjectName::new("hr", "people"));
        assert_eq!(
            DbObjectName::parse("\"a.b\".people"),
            DbObjectName::new("\"a.b\"", "people")
        );
    }

    #[test]
    fn test_str_is_a_table_identity() {
        assert_eq!("public.people".identifier(), "public.people");
        assert_eq!("public.people".schema(), None);
        let owned = String::from("people");
        assert_eq!(owned.identifier(), "people");
    }
}
