//! Desired index definitions and their `CREATE INDEX` rendering

use super::actual::ActualIndex;
use super::canonical::same_object;
use super::matching::{self, IndexDifference};
use super::method::{IndexMethod, SortOrder};
use super::reader::{read_index_ddl, read_object_name, IndexElement, ParsedIndex};
use crate::config::MatchConfig;
use crate::error::{DefinitionError, MatchError};
use crate::table::TableIdentity;
use serde::{Deserialize, Serialize};
use sqlparser::ast::Expr;

/// An index the schema should have.
///
/// Built up fluently while a desired schema is assembled, then rendered with
/// [`IndexDefinition::to_ddl`] or compared with an introspected index using
/// [`IndexDefinition::matches`].
///
/// Nothing in here is escaped or quoted. Column names, expressions, the
/// predicate and the tablespace are pasted into the statement verbatim, so
/// they must already be valid SQL fragments.
///
/// # Example
///
/// ```
/// use pg_indexdef::{DbObjectName, IndexDefinition};
///
/// let index = IndexDefinition::new("idx_people_name")
///     .against_columns(["last_name", "first_name"]);
///
/// let ddl = index.to_ddl(&DbObjectName::new("public", "people")).unwrap();
/// assert_eq!(
///     ddl,
///     "CREATE INDEX idx_people_name ON public.people USING btree (last_name ASC, first_name ASC);"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDefinition {
    name: String,
    #[serde(default)]
    pub method: IndexMethod,
    #[serde(default)]
    pub sort_order: SortOrder,
    #[serde(default)]
    pub is_unique: bool,
    #[serde(default)]
    pub is_concurrent: bool,
    /// Key columns, rendered in this order
    #[serde(default)]
    pub columns: Vec<String>,
    /// Key expression for an expression index
    #[serde(default)]
    pub expression: Option<String>,
    /// Non-key columns of a covering index (`INCLUDE`)
    #[serde(default)]
    pub include_columns: Vec<String>,
    /// `WITH (fillfactor=N)`, 10 to 100
    #[serde(default)]
    pub fill_factor: Option<u8>,
    /// Tablespace to build the index in; `default_tablespace` when unset
    #[serde(default)]
    pub table_space: Option<String>,
    /// Condition of a partial index
    #[serde(default)]
    pub predicate: Option<String>,
}

impl IndexDefinition {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            method: IndexMethod::default(),
            sort_order: SortOrder::default(),
            is_unique: false,
            is_concurrent: false,
            columns: Vec::new(),
            expression: None,
            include_columns: Vec::new(),
            fill_factor: None,
            table_space: None,
            predicate: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Index the given columns, replacing any earlier column list
    #[must_use]
    pub fn against_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_expression(mut self, expression: impl Into<String>) -> Self {
        self.expression = Some(expression.into());
        self
    }

    #[must_use]
    pub fn with_method(mut self, method: IndexMethod) -> Self {
        self.method = method;
        self
    }

    #[must_use]
    pub fn sorted(mut self, sort_order: SortOrder) -> Self {
        self.sort_order = sort_order;
        self
    }

    #[must_use]
    pub fn unique(mut self) -> Self {
        self.is_unique = true;
        self
    }

    #[must_use]
    pub fn concurrently(mut self) -> Self {
        self.is_concurrent = true;
        self
    }

    #[must_use]
    pub fn include<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_fill_factor(mut self, fill_factor: u8) -> Self {
        self.fill_factor = Some(fill_factor);
        self
    }

    #[must_use]
    pub fn in_table_space(mut self, table_space: impl Into<String>) -> Self {
        self.table_space = Some(table_space.into());
        self
    }

    #[must_use]
    pub fn with_predicate(mut self, predicate: impl Into<String>) -> Self {
        self.predicate = Some(predicate.into());
        self
    }

    fn expression_text(&self) -> Option<&str> {
        self.expression.as_deref().filter(|e| !e.trim().is_empty())
    }

    /// Check that this definition can be rendered
    ///
    /// # Errors
    ///
    /// - `BlankName` when the name is empty or whitespace
    /// - `MissingTarget` when there are neither columns nor an expression
    /// - `AmbiguousTarget` when there are both
    /// - `InvalidFillFactor` when the fill factor is outside 10..=100
    pub fn validate(&self) -> Result<(), DefinitionError> {
        if self.name.trim().is_empty() {
            return Err(DefinitionError::BlankName);
        }

        match (self.columns.is_empty(), self.expression_text()) {
            (true, None) => {
                return Err(DefinitionError::MissingTarget {
                    index: self.name.clone(),
                })
            }
            (false, Some(_)) => {
                return Err(DefinitionError::AmbiguousTarget {
                    index: self.name.clone(),
                })
            }
            _ => {}
        }

        if let Some(value) = self.fill_factor {
            if !(10..=100).contains(&value) {
                return Err(DefinitionError::InvalidFillFactor {
                    index: self.name.clone(),
                    value,
                });
            }
        }

        Ok(())
    }

    /// Render the `CREATE INDEX` statement for this index on `table`
    ///
    /// `table` must already render as a valid, quoted identifier.
    ///
    /// # Errors
    ///
    /// Returns the first [`DefinitionError`] reported by
    /// [`IndexDefinition::validate`].
    pub fn to_ddl<T: TableIdentity + ?Sized>(&self, table: &T) -> Result<String, DefinitionError> {
        self.validate()?;

        let mut sql = String::from("CREATE ");
        if self.is_unique {
            sql.push_str("UNIQUE ");
        }
        sql.push_str("INDEX ");
        if self.is_concurrent {
            sql.push_str("CONCURRENTLY ");
        }

        sql.push_str(&self.name);
        sql.push_str(" ON ");
        sql.push_str(table.identifier());
        sql.push_str(" USING ");
        sql.push_str(self.method.keyword());
        sql.push(' ');
        sql.push_str(&self.key_clause()?);

        if !self.include_columns.is_empty() {
            sql.push_str(" INCLUDE (");
            sql.push_str(&self.include_columns.join(", "));
            sql.push(')');
        }

        if let Some(fill_factor) = self.fill_factor {
            sql.push_str(&format!(" WITH (fillfactor={})", fill_factor));
        }

        if let Some(table_space) = non_blank(&self.table_space) {
            sql.push_str(" TABLESPACE ");
            sql.push_str(table_space);
        }

        if let Some(predicate) = non_blank(&self.predicate) {
            sql.push_str(" WHERE ");
            sql.push_str(predicate);
        }

        sql.push(';');

        log::debug!("Rendered index {}: {}", self.name, sql);
        Ok(sql)
    }

    /// `(col1 ASC, col2 ASC)` or `(expression ASC)`
    fn key_clause(&self) -> Result<String, DefinitionError> {
        let suffix = self.sort_order.keyword();

        if !self.columns.is_empty() {
            let keys: Vec<String> = self
                .columns
                .iter()
                .map(|column| format!("{} {}", column, suffix))
                .collect();
            return Ok(format!("({})", keys.join(", ")));
        }

        match self.expression_text() {
            Some(expression) => Ok(format!("({} {})", expression, suffix)),
            None => Err(DefinitionError::MissingTarget {
                index: self.name.clone(),
            }),
        }
    }

    /// `DROP INDEX` statement for this index, schema-qualified when the table
    /// knows its schema
    pub fn to_drop_ddl<T: TableIdentity + ?Sized>(&self, table: &T) -> String {
        let mut sql = String::from("DROP INDEX ");
        if self.is_concurrent {
            sql.push_str("CONCURRENTLY ");
        }
        sql.push_str("IF EXISTS ");
        if let Some(schema) = table.schema() {
            sql.push_str(schema);
            sql.push('.');
        }
        sql.push_str(&self.name);
        sql.push(';');
        sql
    }

    /// Whether `actual` already satisfies this definition, using the default
    /// [`MatchConfig`]
    ///
    /// # Errors
    ///
    /// See [`IndexDefinition::differences`].
    pub fn matches<T: TableIdentity + ?Sized>(
        &self,
        actual: &ActualIndex,
        table: &T,
    ) -> Result<bool, MatchError> {
        self.matches_with(actual, table, &MatchConfig::default())
    }

    /// Whether `actual` already satisfies this definition
    ///
    /// # Errors
    ///
    /// See [`IndexDefinition::differences`].
    pub fn matches_with<T: TableIdentity + ?Sized>(
        &self,
        actual: &ActualIndex,
        table: &T,
        config: &MatchConfig,
    ) -> Result<bool, MatchError> {
        Ok(self.differences(actual, table, config)?.is_empty())
    }

    /// Every property on which `actual` differs from this definition
    ///
    /// The definition is rendered against `table` and read back with the same
    /// reader used for `actual.ddl`, so both sides are compared in one shape.
    ///
    /// # Errors
    ///
    /// - `MatchError::Definition` when this definition does not validate
    /// - `MatchError::TableMismatch` when `actual` belongs to another table,
    ///   either by its recorded table or by the `ON` target of its DDL
    /// - `MatchError::UnreadableDefinition` when either statement cannot be read
    pub fn differences<T: TableIdentity + ?Sized>(
        &self,
        actual: &ActualIndex,
        table: &T,
        config: &MatchConfig,
    ) -> Result<Vec<IndexDifference>, MatchError> {
        self.validate()?;

        let target = read_object_name(table.identifier()).map_err(|reason| {
            MatchError::unreadable(&self.name, format!("table {}: {}", table.identifier(), reason))
        })?;
        let recorded = read_object_name(&actual.table).map_err(|reason| {
            MatchError::unreadable(&actual.name, format!("table {}: {}", actual.table, reason))
        })?;
        if !same_object(&target, &recorded) {
            return Err(self.table_mismatch(table, actual.table.clone()));
        }

        let observed = actual.parse()?;
        if !same_object(&target, &observed.table) {
            return Err(self.table_mismatch(table, observed.table.to_string()));
        }

        let expected = self.read_back(table)?;

        let differences = matching::compare(&expected, &observed, config);
        for difference in &differences {
            log::debug!("Index {} differs from {}: {}", self.name, actual.name, difference);
        }
        Ok(differences)
    }

    fn table_mismatch<T: TableIdentity + ?Sized>(&self, table: &T, actual: String) -> MatchError {
        MatchError::TableMismatch {
            index: self.name.clone(),
            expected: table.identifier().to_string(),
            actual,
        }
    }

    /// Render against `table` and read the statement back
    fn read_back<T: TableIdentity + ?Sized>(&self, table: &T) -> Result<ParsedIndex, MatchError> {
        // TABLESPACE is carried next to the statement, as for observed indexes
        let mut rendered = self.clone();
        rendered.table_space = None;
        let ddl = rendered.to_ddl(table)?;

        let mut parsed =
            read_index_ddl(&ddl).map_err(|reason| MatchError::unreadable(&self.name, reason))?;
        parsed.table_space = non_blank(&self.table_space).map(str::to_string);
        Ok(parsed)
    }

    /// Rebuild a definition from an introspected index
    ///
    /// Keys that are all plain column names with one shared ordering become
    /// `columns`. Anything else is folded into `expression`, where every key
    /// but the last spells out its own ordering and the last key's ordering
    /// becomes `sort_order`.
    ///
    /// # Errors
    ///
    /// Returns `MatchError::UnreadableDefinition` when the DDL cannot be read
    /// or uses something a definition cannot hold: an unknown access method,
    /// `NULLS NOT DISTINCT`, a storage parameter other than an integer
    /// `fillfactor`, or a non-default `NULLS FIRST`/`NULLS LAST` on the last
    /// key.
    pub fn from_actual(actual: &ActualIndex) -> Result<Self, MatchError> {
        let parsed = actual.parse()?;

        if parsed.nulls_not_distinct {
            return Err(MatchError::unreadable(
                &actual.name,
                "NULLS NOT DISTINCT cannot be expressed",
            ));
        }

        let method = parsed
            .method
            .parse::<IndexMethod>()
            .map_err(|reason| MatchError::unreadable(&actual.name, reason))?;

        let mut definition = IndexDefinition::new(parsed.name.to_string());
        definition.method = method;
        definition.is_unique = parsed.is_unique;
        definition.is_concurrent = parsed.is_concurrent;
        definition.include_columns = parsed
            .include_columns
            .iter()
            .map(ToString::to_string)
            .collect();
        definition.table_space = parsed.table_space.clone();
        definition.predicate = parsed.predicate.as_ref().map(ToString::to_string);

        for (key, value) in &parsed.storage_parameters {
            if key != "fillfactor" {
                return Err(MatchError::unreadable(
                    &actual.name,
                    format!("storage parameter {}={} cannot be expressed", key, value),
                ));
            }
            let fill_factor = value.parse::<u8>().map_err(|e| {
                MatchError::unreadable(&actual.name, format!("fillfactor '{}': {}", value, e))
            })?;
            definition.fill_factor = Some(fill_factor);
        }

        // Default nulls placement is the same as none at all
        let elements: Vec<IndexElement> = parsed
            .elements
            .iter()
            .map(|e| IndexElement {
                nulls: e.nulls.filter(|n| *n != e.sort_order.default_nulls()),
                ..e.clone()
            })
            .collect();

        let Some((last, leading)) = elements.split_last() else {
            return Err(MatchError::unreadable(&actual.name, "index has no keys"));
        };
        if let Some(nulls) = last.nulls {
            return Err(MatchError::unreadable(
                &actual.name,
                format!("{} on the last key cannot be expressed", nulls),
            ));
        }
        definition.sort_order = last.sort_order;

        let uniform = leading
            .iter()
            .all(|e| e.sort_order == last.sort_order && e.nulls.is_none());

        if uniform
            && elements
                .iter()
                .all(|e| matches!(e.expression, Expr::Identifier(_)))
        {
            definition.columns = elements.iter().map(|e| e.expression.to_string()).collect();
        } else {
            // The rendered suffix only lands on the last key, so the others
            // carry their own ordering
            let mut keys: Vec<String> = leading.iter().map(render_element).collect();
            keys.push(last.expression.to_string());
            definition.expression = Some(keys.join(", "));
        }

        Ok(definition)
    }
}

fn render_element(element: &IndexElement) -> String {
    let mut key = format!("{} {}", element.expression, element.sort_order);
    if let Some(nulls) = element.nulls {
        key.push(' ');
        key.push_str(&nulls.to_string());
    }
    key
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actual(ddl: &str) -> ActualIndex {
        ActualIndex::new("public.people", "idx", ddl)
    }

    #[test]
    fn test_from_actual_plain_columns() {
        let definition = IndexDefinition::from_actual(&actual(
            "CREATE UNIQUE INDEX idx ON public.people USING btree (last_name, \"First\") WHERE (deleted_at IS NULL)",
        ))
        .unwrap();

        assert_eq!(definition.name(), "idx");
        assert!(definition.is_unique);
        assert_eq!(definition.columns, vec!["last_name", "\"First\""]);
        assert_eq!(definition.expression, None);
        assert_eq!(definition.sort_order, SortOrder::Asc);
        assert_eq!(definition.predicate.as_deref(), Some("(deleted_at IS NULL)"));
    }

    #[test]
    fn test_from_actual_expression_keeps_leading_ordering() {
        let definition = IndexDefinition::from_actual(&actual(
            "CREATE INDEX idx ON public.people USING btree (lower((email)::text) DESC NULLS LAST, created_at)",
        ))
        .unwrap();

        assert!(definition.columns.is_empty());
        let expression = definition.expression.as_deref().unwrap();
        assert!(expression.starts_with("lower(("), "{}", expression);
        assert!(expression.ends_with(" DESC NULLS LAST, created_at"), "{}", expression);
        assert_eq!(definition.sort_order, SortOrder::Asc);
    }

    #[test]
    fn test_from_actual_mixed_ordering_on_columns() {
        let definition = IndexDefinition::from_actual(&actual(
            "CREATE INDEX idx ON public.people USING btree (a DESC, b)",
        ))
        .unwrap();
        assert_eq!(definition.expression.as_deref(), Some("a DESC, b"));
        assert_eq!(
            definition.to_ddl("public.people").unwrap(),
            "CREATE INDEX idx ON public.people USING btree (a DESC, b ASC);"
        );
    }

    #[test]
    fn test_from_actual_storage_and_method() {
        let definition = IndexDefinition::from_actual(
            &actual("CREATE INDEX idx ON public.people USING gin (tags) WITH (fillfactor='70')")
                .with_table_space("fast_ssd"),
        )
        .unwrap();

        assert_eq!(definition.method, IndexMethod::Gin);
        assert_eq!(definition.fill_factor, Some(70));
        assert_eq!(definition.table_space.as_deref(), Some("fast_ssd"));
    }

    #[test]
    fn test_from_actual_rejects_unknown_method_and_last_key_nulls() {
        assert!(IndexDefinition::from_actual(&actual(
            "CREATE INDEX idx ON public.people USING bloom (a)"
        ))
        .is_err());
        assert!(IndexDefinition::from_actual(&actual(
            "CREATE INDEX idx ON public.people USING btree (a NULLS FIRST)"
        ))
        .is_err());
        // default placement for DESC
        assert!(IndexDefinition::from_actual(&actual(
            "CREATE INDEX idx ON public.people USING btree (a DESC NULLS FIRST)"
        ))
        .is_ok());
    }

    #[test]
    fn test_from_actual_rejects_what_a_definition_cannot_hold() {
        for ddl in [
            "CREATE INDEX idx ON public.people USING btree (a) WITH (deduplicate_items='off')",
            "CREATE INDEX idx ON public.people USING btree (a) WITH (fillfactor='70', deduplicate_items='off')",
            "CREATE UNIQUE INDEX idx ON public.people USING btree (a) NULLS NOT DISTINCT",
        ] {
            match IndexDefinition::from_actual(&actual(ddl)) {
                Err(MatchError::UnreadableDefinition { index, .. }) => assert_eq!(index, "idx"),
                other => panic!("expected UnreadableDefinition for {}, got {:?}", ddl, other),
            }
        }
    }
}
