//! Index definitions: rendering desired indexes and matching them against
//! indexes introspected from a live database.
//!
//! - [`IndexDefinition`] is the desired state
//! - [`ActualIndex`] is what the database reports
//! - [`IndexDifference`] describes how the two disagree

pub mod actual;
pub mod canonical;
pub mod definition;
pub mod matching;
pub mod method;
pub mod reader;

pub use actual::ActualIndex;
pub use definition::IndexDefinition;
pub use matching::IndexDifference;
pub use method::{IndexMethod, NullsOrder, SortOrder};
pub use reader::{read_index_ddl, IndexElement, ParsedIndex};
