//! Reader for `CREATE INDEX` statements as PostgreSQL echoes them back
//! (`pg_get_indexdef`, `pg_indexes.indexdef`).
//!
//! Statements are parsed with `sqlparser`'s PostgreSQL dialect. The reader
//! keeps the parsed expressions as they are; see [`super::canonical`] for the
//! normalization applied before comparison.

use super::method::{NullsOrder, SortOrder};
use sqlparser::ast::{BinaryOperator, CreateIndex, Expr, Ident, ObjectName, Statement, Value};
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;

/// One key of an index: a column or expression plus its ordering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexElement {
    pub expression: Expr,
    pub sort_order: SortOrder,
    pub nulls: Option<NullsOrder>,
}

/// A `CREATE INDEX` statement split into clauses
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedIndex {
    pub name: ObjectName,
    pub table: ObjectName,
    pub is_unique: bool,
    pub is_concurrent: bool,
    /// Access method as written; `btree` when the statement has no `USING`
    pub method: String,
    pub elements: Vec<IndexElement>,
    pub include_columns: Vec<Ident>,
    pub nulls_not_distinct: bool,
    /// `WITH (...)` entries as `(key, value)`, value unquoted
    pub storage_parameters: Vec<(String, String)>,
    /// Never part of the statement grammar; filled in from the catalog
    pub table_space: Option<String>,
    pub predicate: Option<Expr>,
}

/// Parse a `CREATE INDEX` statement into a [`ParsedIndex`]
///
/// `TABLESPACE` is not accepted here: PostgreSQL reports it next to the
/// statement, not inside it.
///
/// # Errors
///
/// Returns a description of why the text is not a single `CREATE INDEX`
/// statement.
pub fn read_index_ddl(ddl: &str) -> Result<ParsedIndex, String> {
    let mut statements =
        Parser::parse_sql(&PostgreSqlDialect {}, ddl).map_err(|e| e.to_string())?;
    if statements.len() != 1 {
        return Err(format!("expected one statement, found {}", statements.len()));
    }

    let CreateIndex {
        name,
        table_name,
        using,
        columns,
        unique,
        concurrently,
        include,
        nulls_distinct,
        with,
        predicate,
        ..
    } = match statements.remove(0) {
        Statement::CreateIndex(create) => create,
        other => return Err(format!("not a CREATE INDEX statement: {}", other)),
    };

    let name = name.ok_or_else(|| "index name is missing".to_string())?;
    if columns.is_empty() {
        return Err("index has no key columns or expressions".to_string());
    }

    let elements = columns
        .into_iter()
        .map(|key| IndexElement {
            expression: key.expr,
            sort_order: match key.asc {
                Some(false) => SortOrder::Desc,
                _ => SortOrder::Asc,
            },
            nulls: key.nulls_first.map(|first| {
                if first {
                    NullsOrder::First
                } else {
                    NullsOrder::Last
                }
            }),
        })
        .collect();

    let storage_parameters = with
        .iter()
        .map(read_storage_parameter)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ParsedIndex {
        name,
        table: table_name,
        is_unique: unique,
        is_concurrent: concurrently,
        method: using
            .map(|method| method.value)
            .unwrap_or_else(|| "btree".to_string()),
        elements,
        include_columns: include,
        nulls_not_distinct: nulls_distinct == Some(false),
        storage_parameters,
        table_space: None,
        predicate,
    })
}

/// Parse a possibly qualified, possibly quoted object name
/// (`"Sales".orders`)
pub fn read_object_name(text: &str) -> Result<ObjectName, String> {
    let dialect = PostgreSqlDialect {};
    let mut parser = Parser::new(&dialect)
        .try_with_sql(text)
        .map_err(|e| e.to_string())?;
    parser.parse_object_name(false).map_err(|e| e.to_string())
}

/// `fillfactor='70'` → `("fillfactor", "70")`
fn read_storage_parameter(param: &Expr) -> Result<(String, String), String> {
    let Expr::BinaryOp {
        left,
        op: BinaryOperator::Eq,
        right,
    } = param
    else {
        return Err(format!("storage parameter '{}' has no value", param));
    };

    let key = match left.as_ref() {
        Expr::Identifier(ident) => ident.value.to_ascii_lowercase(),
        other => return Err(format!("unexpected storage parameter name '{}'", other)),
    };
    let value = match right.as_ref() {
        Expr::Value(Value::SingleQuotedString(s)) => s.clone(),
        Expr::Value(Value::Number(n, _)) => n.clone(),
        Expr::Value(Value::Boolean(b)) => b.to_string(),
        Expr::Identifier(ident) => ident.value.clone(),
        other => other.to_string(),
    };
    Ok((key, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_echoed_unique_partial_index() {
        let parsed = read_index_ddl(
            "CREATE UNIQUE INDEX idx_people_name ON public.people USING btree (last_name, first_name DESC) WHERE (deleted_at IS NULL)",
        )
        .unwrap();

        assert_eq!(parsed.name.to_string(), "idx_people_name");
        assert_eq!(parsed.table.to_string(), "public.people");
        assert!(parsed.is_unique);
        assert!(!parsed.is_concurrent);
        assert_eq!(parsed.method, "btree");
        assert_eq!(parsed.elements.len(), 2);
        assert_eq!(parsed.elements[0].expression.to_string(), "last_name");
        assert_eq!(parsed.elements[0].sort_order, SortOrder::Asc);
        assert_eq!(parsed.elements[1].expression.to_string(), "first_name");
        assert_eq!(parsed.elements[1].sort_order, SortOrder::Desc);
        assert_eq!(
            parsed.predicate.map(|p| p.to_string()).as_deref(),
            Some("(deleted_at IS NULL)")
        );
    }

    #[test]
    fn test_read_optional_clauses() {
        let parsed = read_index_ddl(
            "create index concurrently if not exists \"Idx\" on \"Sales\".orders using gin (tags) \
             include (id, total) nulls not distinct with (fillfactor='70', fastupdate=off) \
             where status <> 'x, y';",
        )
        .unwrap();

        assert!(parsed.is_concurrent);
        assert_eq!(parsed.name.to_string(), "\"Idx\"");
        assert_eq!(parsed.table.to_string(), "\"Sales\".orders");
        assert_eq!(parsed.method, "gin");
        assert_eq!(
            parsed.include_columns,
            vec![Ident::new("id"), Ident::new("total")]
        );
        assert!(parsed.nulls_not_distinct);
        assert_eq!(
            parsed.storage_parameters,
            vec![
                ("fillfactor".to_string(), "70".to_string()),
                ("fastupdate".to_string(), "off".to_string()),
            ]
        );
        assert_eq!(parsed.table_space, None);
        assert_eq!(
            parsed.predicate.map(|p| p.to_string()).as_deref(),
            Some("status <> 'x, y'")
        );
    }

    #[test]
    fn test_missing_using_defaults_to_btree() {
        let parsed = read_index_ddl("CREATE INDEX idx ON people (email)").unwrap();
        assert_eq!(parsed.method, "btree");
        assert_eq!(parsed.elements[0].expression, Expr::Identifier(Ident::new("email")));
    }

    #[test]
    fn test_element_ordering_keywords() {
        let parsed = read_index_ddl(
            "CREATE INDEX idx ON t USING btree (lower((email)::text) DESC NULLS LAST, created_at NULLS FIRST)",
        )
        .unwrap();

        assert_eq!(parsed.elements[0].sort_order, SortOrder::Desc);
        assert_eq!(parsed.elements[0].nulls, Some(NullsOrder::Last));
        assert_eq!(
            parsed.elements[1].expression,
            Expr::Identifier(Ident::new("created_at"))
        );
        assert_eq!(parsed.elements[1].sort_order, SortOrder::Asc);
        assert_eq!(parsed.elements[1].nulls, Some(NullsOrder::First));
    }

    #[test]
    fn test_read_object_name() {
        let name = read_object_name("\"Sales\".orders").unwrap();
        assert_eq!(
            name,
            ObjectName(vec![Ident::with_quote('"', "Sales"), Ident::new("orders")])
        );
        assert!(read_object_name("").is_err());
    }

    #[test]
    fn test_rejects_non_index_statements() {
        assert!(read_index_ddl("CREATE TABLE people (id int)").is_err());
        assert!(read_index_ddl("CREATE INDEX ON people (email)").is_err());
        assert!(read_index_ddl("CREATE INDEX idx ON people (email").is_err());
        assert!(read_index_ddl("CREATE INDEX idx ON people (email) garbage").is_err());
        assert!(read_index_ddl("CREATE INDEX a ON t (x); CREATE INDEX b ON t (y)").is_err());
    }
}
