//! Indexes as they exist in a live database

use super::reader::{read_index_ddl, ParsedIndex};
use crate::error::MatchError;
use serde::{Deserialize, Serialize};

/// An index introspected from a live database.
///
/// `ddl` is the statement PostgreSQL reports for the index, typically the
/// `indexdef` column of `pg_indexes` or the result of `pg_get_indexdef`.
/// PostgreSQL leaves the tablespace out of that text, so it is carried
/// separately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActualIndex {
    /// Qualified identifier of the owning table (`schemaname.tablename`)
    pub table: String,
    pub name: String,
    pub ddl: String,
    #[serde(default)]
    pub table_space: Option<String>,
}

impl ActualIndex {
    #[must_use]
    pub fn new(table: impl Into<String>, name: impl Into<String>, ddl: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            name: name.into(),
            ddl: ddl.into(),
            table_space: None,
        }
    }

    /// Record the tablespace reported next to the DDL (`pg_indexes.tablespace`)
    #[must_use]
    pub fn with_table_space(mut self, table_space: impl Into<String>) -> Self {
        self.table_space = Some(table_space.into());
        self
    }

    /// Split the reported DDL into clauses, with the recorded tablespace
    ///
    /// # Errors
    ///
    /// Returns `MatchError::UnreadableDefinition` when `ddl` is not a
    /// `CREATE INDEX` statement.
    pub fn parse(&self) -> Result<ParsedIndex, MatchError> {
        let mut parsed =
            read_index_ddl(&self.ddl).map_err(|reason| MatchError::unreadable(&self.name, reason))?;
        parsed.table_space = self
            .table_space
            .as_ref()
            .filter(|ts| !ts.trim().is_empty())
            .cloned();
        Ok(parsed)
    }
}
