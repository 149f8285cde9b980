//! Canonical forms of parsed SQL.
//!
//! PostgreSQL never echoes an index definition back the way it was written:
//! it folds case, adds or drops identifier quotes, wraps predicates in
//! parentheses and adds implicit casts. Both sides of a comparison are
//! reduced with [`canonicalize`] so only meaningful differences survive.
//! Parentheses carry no meaning once the expression is a tree, so all of
//! them are dropped.

use crate::config::MatchConfig;
use sqlparser::ast::{visit_expressions_mut, Expr, Ident, ObjectName, Value};
use std::mem;
use std::ops::ControlFlow;

/// Reduce an expression to the form used for comparison
pub fn canonicalize(expr: &Expr, config: &MatchConfig) -> Expr {
    let mut expr = expr.clone();
    // Post-order: children are already canonical when their parent is seen
    let _ = visit_expressions_mut(&mut expr, |node| {
        unwrap_noise(node, config);
        fold_names(node);
        ControlFlow::<()>::Continue(())
    });
    expr
}

/// Fold an identifier the way PostgreSQL resolves it: unquoted names are
/// lower-cased, quoted names keep their case and lose the quotes
pub fn fold_ident(ident: &Ident) -> Ident {
    match ident.quote_style {
        Some(_) => Ident::new(ident.value.clone()),
        None => Ident::new(ident.value.to_lowercase()),
    }
}

pub fn fold_object_name(name: &ObjectName) -> ObjectName {
    ObjectName(name.0.iter().map(fold_ident).collect())
}

/// Canonical `schema.name` comparison; a side without a schema matches any
/// schema
pub fn same_object(left: &ObjectName, right: &ObjectName) -> bool {
    let left = fold_object_name(left);
    let right = fold_object_name(right);

    match (left.0.split_last(), right.0.split_last()) {
        (Some((left_name, left_schema)), Some((right_name, right_schema))) => {
            left_name == right_name
                && (left_schema.is_empty() || right_schema.is_empty() || left_schema == right_schema)
        }
        _ => false,
    }
}

/// Replace `(x)` and, when enabled, `x::type` with `x`
fn unwrap_noise(node: &mut Expr, config: &MatchConfig) {
    loop {
        let inner = match node {
            Expr::Nested(inner) => inner,
            Expr::Cast { expr, .. } if config.strip_casts => expr,
            _ => return,
        };
        let inner = mem::replace(inner.as_mut(), Expr::Value(Value::Null));
        *node = inner;
    }
}

fn fold_names(node: &mut Expr) {
    match node {
        Expr::Identifier(ident) => *ident = fold_ident(ident),
        Expr::CompoundIdentifier(idents) => {
            for ident in idents.iter_mut() {
                *ident = fold_ident(ident);
            }
        }
        Expr::Function(function) => function.name = fold_object_name(&function.name),
        _ => {}
    }
}
