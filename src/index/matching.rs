//! Structural comparison of a desired index with an observed one

use super::canonical::{canonicalize, fold_ident, fold_object_name};
use super::method::{NullsOrder, SortOrder};
use super::reader::{read_object_name, IndexElement, ParsedIndex};
use crate::config::MatchConfig;
use sqlparser::ast::{Expr, Ident, ObjectName};
use std::fmt;

/// One property on which an observed index falls short of the desired one
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexDifference {
    Name { expected: String, actual: String },
    Uniqueness { expected: bool, actual: bool },
    NullsDistinct { expected: bool, actual: bool },
    Method { expected: String, actual: String },
    /// Key columns/expressions with their ordering, as each side wrote them
    Keys { expected: Vec<String>, actual: Vec<String> },
    IncludeColumns { expected: Vec<String>, actual: Vec<String> },
    StorageParameters { expected: Vec<String>, actual: Vec<String> },
    TableSpace { expected: Option<String>, actual: Option<String> },
    Predicate { expected: Option<String>, actual: Option<String> },
}

impl fmt::Display for IndexDifference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexDifference::Name { expected, actual } => {
                write!(f, "name: expected {}, found {}", expected, actual)
            }
            IndexDifference::Uniqueness { expected, actual } => {
                write!(f, "unique: expected {}, found {}", expected, actual)
            }
            IndexDifference::NullsDistinct { expected, actual } => {
                write!(f, "nulls not distinct: expected {}, found {}", expected, actual)
            }
            IndexDifference::Method { expected, actual } => {
                write!(f, "method: expected {}, found {}", expected, actual)
            }
            IndexDifference::Keys { expected, actual } => write!(
                f,
                "keys: expected ({}), found ({})",
                expected.join(", "),
                actual.join(", ")
            ),
            IndexDifference::IncludeColumns { expected, actual } => write!(
                f,
                "include: expected ({}), found ({})",
                expected.join(", "),
                actual.join(", ")
            ),
            IndexDifference::StorageParameters { expected, actual } => write!(
                f,
                "storage parameters: expected ({}), found ({})",
                expected.join(", "),
                actual.join(", ")
            ),
            IndexDifference::TableSpace { expected, actual } => write!(
                f,
                "tablespace: expected {}, found {}",
                expected.as_deref().unwrap_or("<default>"),
                actual.as_deref().unwrap_or("<default>")
            ),
            IndexDifference::Predicate { expected, actual } => write!(
                f,
                "predicate: expected {}, found {}",
                expected.as_deref().unwrap_or("<none>"),
                actual.as_deref().unwrap_or("<none>")
            ),
        }
    }
}

/// A canonical value and the text it was read from
///
/// Equality only looks at the canonical value; the text is what gets
/// reported.
#[derive(Debug, Clone)]
struct Written<T> {
    canonical: T,
    text: String,
}

impl<T: PartialEq> PartialEq for Written<T> {
    fn eq(&self, other: &Self) -> bool {
        self.canonical == other.canonical
    }
}

fn texts<T>(values: &[Written<T>]) -> Vec<String> {
    values.iter().map(|value| value.text.clone()).collect()
}

type Key = (Expr, SortOrder, Option<NullsOrder>);

/// A parsed index reduced to comparable values
#[derive(Debug, Clone)]
struct CanonicalIndex {
    name: Written<ObjectName>,
    is_unique: bool,
    nulls_not_distinct: bool,
    method: String,
    keys: Vec<Written<Key>>,
    include_columns: Vec<Written<Ident>>,
    storage_parameters: Vec<String>,
    table_space: Option<String>,
    predicate: Option<Written<Expr>>,
}

impl CanonicalIndex {
    fn new(parsed: &ParsedIndex, config: &MatchConfig) -> Self {
        let mut storage_parameters: Vec<String> = parsed
            .storage_parameters
            .iter()
            .map(|(key, value)| format!("{}={}", key, value.to_ascii_lowercase()))
            .collect();
        storage_parameters.sort();

        Self {
            name: Written {
                canonical: fold_object_name(&parsed.name),
                text: parsed.name.to_string(),
            },
            is_unique: parsed.is_unique,
            nulls_not_distinct: parsed.nulls_not_distinct,
            method: parsed.method.to_ascii_lowercase(),
            keys: parsed
                .elements
                .iter()
                .map(|element| canonical_key(element, config))
                .collect(),
            include_columns: parsed
                .include_columns
                .iter()
                .map(|column| Written {
                    canonical: fold_ident(column),
                    text: column.to_string(),
                })
                .collect(),
            storage_parameters,
            table_space: parsed
                .table_space
                .as_deref()
                .map(canonical_table_space)
                .filter(|ts| ts != DEFAULT_TABLE_SPACE),
            predicate: parsed.predicate.as_ref().map(|predicate| Written {
                canonical: canonicalize(predicate, config),
                text: predicate.to_string(),
            }),
        }
    }
}

/// Where an index without a `TABLESPACE` clause lives
const DEFAULT_TABLE_SPACE: &str = "pg_default";

fn canonical_table_space(table_space: &str) -> String {
    match read_object_name(table_space) {
        Ok(name) => fold_object_name(&name).to_string(),
        Err(_) => table_space.trim().to_string(),
    }
}

/// The key expression and ordering; a nulls placement only counts when it
/// isn't the default for the sort order
fn canonical_key(element: &IndexElement, config: &MatchConfig) -> Written<Key> {
    let nulls = element
        .nulls
        .filter(|nulls| *nulls != element.sort_order.default_nulls());

    let mut text = element.expression.to_string();
    if element.sort_order != SortOrder::default() {
        text.push(' ');
        text.push_str(element.sort_order.keyword());
    }
    if let Some(nulls) = nulls {
        text.push(' ');
        text.push_str(&nulls.to_string());
    }

    Written {
        canonical: (
            canonicalize(&element.expression, config),
            element.sort_order,
            nulls,
        ),
        text,
    }
}

/// Everything `observed` lacks relative to `expected`
///
/// Concurrency is a build mode rather than a property of the index and is
/// never compared.
pub(crate) fn compare(
    expected: &ParsedIndex,
    observed: &ParsedIndex,
    config: &MatchConfig,
) -> Vec<IndexDifference> {
    let expected = CanonicalIndex::new(expected, config);
    let observed = CanonicalIndex::new(observed, config);
    let mut differences = Vec::new();

    if config.compare_names && expected.name != observed.name {
        differences.push(IndexDifference::Name {
            expected: expected.name.text.clone(),
            actual: observed.name.text.clone(),
        });
    }
    if expected.is_unique != observed.is_unique {
        differences.push(IndexDifference::Uniqueness {
            expected: expected.is_unique,
            actual: observed.is_unique,
        });
    }
    if expected.nulls_not_distinct != observed.nulls_not_distinct {
        differences.push(IndexDifference::NullsDistinct {
            expected: expected.nulls_not_distinct,
            actual: observed.nulls_not_distinct,
        });
    }
    if expected.method != observed.method {
        differences.push(IndexDifference::Method {
            expected: expected.method,
            actual: observed.method,
        });
    }
    if expected.keys != observed.keys {
        differences.push(IndexDifference::Keys {
            expected: texts(&expected.keys),
            actual: texts(&observed.keys),
        });
    }
    if expected.include_columns != observed.include_columns {
        differences.push(IndexDifference::IncludeColumns {
            expected: texts(&expected.include_columns),
            actual: texts(&observed.include_columns),
        });
    }
    if expected.storage_parameters != observed.storage_parameters {
        differences.push(IndexDifference::StorageParameters {
            expected: expected.storage_parameters,
            actual: observed.storage_parameters,
        });
    }
    // An unnamed (or default) desired tablespace accepts wherever the index
    // ended up
    if config.compare_table_space
        && expected.table_space.is_some()
        && expected.table_space != observed.table_space
    {
        differences.push(IndexDifference::TableSpace {
            expected: expected.table_space,
            actual: observed.table_space,
        });
    }
    if expected.predicate != observed.predicate {
        differences.push(IndexDifference::Predicate {
            expected: expected.predicate.map(|p| p.text),
            actual: observed.predicate.map(|p| p.text),
        });
    }

    differences
}
