//! # pg-indexdef
//!
//! Desired-state PostgreSQL index definitions.
//!
//! An [`IndexDefinition`] renders itself as a `CREATE INDEX` statement against
//! any [`TableIdentity`], and decides whether an index reported by the
//! database ([`ActualIndex`]) already satisfies it. Introspection, migration
//! planning and connection handling belong to the caller.
//!
//! Rendering is plain templating: identifiers, expressions and predicates are
//! written out exactly as given. Quote them in the table/schema model before
//! they get here (see [`DbObjectName::quoted`]).

pub mod config;
pub mod error;
pub mod index;
pub mod table;

pub use config::MatchConfig;
pub use error::{DefinitionError, MatchError};
pub use index::{
    ActualIndex, IndexDefinition, IndexDifference, IndexElement, IndexMethod, NullsOrder,
    ParsedIndex, SortOrder,
};
pub use table::{DbObjectName, TableIdentity};
