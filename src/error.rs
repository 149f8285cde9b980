//! Error types for index definitions and index matching

use thiserror::Error;

/// A desired index definition that cannot be rendered.
///
/// These are model errors: the definition was built incorrectly and has to be
/// fixed by whoever assembled the desired schema. The definition itself stays
/// usable once its fields are corrected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
    /// Index name is empty or whitespace
    #[error("Index name must not be blank")]
    BlankName,

    /// Neither a column list nor an expression was supplied
    #[error("Index '{index}' must specify either an expression or a column list")]
    MissingTarget { index: String },

    /// Both a column list and an expression were supplied
    #[error("Index '{index}' specifies both an expression and a column list; use one or the other")]
    AmbiguousTarget { index: String },

    /// Fill factor outside of what PostgreSQL accepts for indexes
    #[error("Index '{index}' has fill factor {value}; expected a value between 10 and 100")]
    InvalidFillFactor { index: String, value: u8 },
}

/// Failure to compare a desired definition with an observed index.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchError {
    /// The desired side is not a valid definition
    #[error(transparent)]
    Definition(#[from] DefinitionError),

    /// The observed index lives on a different table than the one supplied
    #[error("Index '{index}' was compared against table {expected} but the observed index is on {actual}")]
    TableMismatch {
        index: String,
        expected: String,
        actual: String,
    },

    /// The observed DDL is not a `CREATE INDEX` statement this crate can read
    #[error("Unable to read definition of index '{index}': {reason}")]
    UnreadableDefinition { index: String, reason: String },
}

impl MatchError {
    pub(crate) fn unreadable(index: &str, reason: impl Into<String>) -> Self {
        MatchError::UnreadableDefinition {
            index: index.to_string(),
            reason: reason.into(),
        }
    }
}
