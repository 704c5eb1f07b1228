//! Normalize/quote and optimize stages (§4.3 steps 4-5).
//!
//! "Optimize" here means what a schema-aware rewrite pass can do without a
//! live catalog: qualify bare column references against a single known
//! source, and fold constant arithmetic. When any referenced dependency's
//! column types are unknown, optimization is skipped and every unaliased
//! top-level projection gets an explicit alias instead, so the caller
//! always has a stable column name to key off of.

use std::collections::BTreeMap;

use sqlparser::ast::{
    BinaryOperator, Expr, Ident, ObjectName, Query, Select, SelectItem, SetExpr, TableFactor,
    Value,
};
use strata_core::errors::CoreError;

use crate::canonical::reparse;

/// Qualify table references and normalize identifier casing (§4.3 step 4,
/// "normalize & quote"). `sqlparser`'s `Display` already normalizes
/// keyword casing and spacing; this re-parses to validate the text is a
/// single statement before the optimize stage runs on it.
pub fn normalize_and_quote(sql: &str, dialect: &str) -> Result<Query, CoreError> {
    reparse(sql, dialect)
}

fn top_level_select_mut(query: &mut Query) -> Option<&mut Select> {
    match query.body.as_mut() {
        SetExpr::Select(select) => Some(select),
        _ => None,
    }
}

fn single_source_alias(select: &Select) -> Option<String> {
    if select.from.len() != 1 || !select.from[0].joins.is_empty() {
        return None;
    }
    match &select.from[0].relation {
        TableFactor::Table { name, alias, .. } => Some(
            alias
                .as_ref()
                .map(|a| a.name.value.clone())
                .unwrap_or_else(|| name.to_string()),
        ),
        _ => None,
    }
}

fn qualify_expr(expr: &mut Expr, alias: &str) {
    match expr {
        Expr::Identifier(ident) => {
            *expr = Expr::CompoundIdentifier(vec![
                Ident::new(alias.to_string()),
                ident.clone(),
            ]);
        }
        Expr::BinaryOp { left, right, .. } => {
            qualify_expr(left, alias);
            qualify_expr(right, alias);
        }
        Expr::UnaryOp { expr: inner, .. } | Expr::Nested(inner) | Expr::Cast { expr: inner, .. } => {
            qualify_expr(inner, alias);
        }
        _ => {}
    }
}

fn fold_constants(expr: &mut Expr) {
    match expr {
        Expr::Nested(inner) => fold_constants(inner),
        Expr::UnaryOp { expr: inner, .. } => fold_constants(inner),
        Expr::BinaryOp { left, op, right } => {
            fold_constants(left);
            fold_constants(right);
            if let (Expr::Value(Value::Number(l, _)), Expr::Value(Value::Number(r, _))) =
                (left.as_ref(), right.as_ref())
            {
                if let (Ok(lf), Ok(rf)) = (l.parse::<f64>(), r.parse::<f64>()) {
                    let folded = match op {
                        BinaryOperator::Plus => Some(lf + rf),
                        BinaryOperator::Minus => Some(lf - rf),
                        BinaryOperator::Multiply => Some(lf * rf),
                        BinaryOperator::Divide if rf != 0.0 => Some(lf / rf),
                        _ => None,
                    };
                    if let Some(value) = folded {
                        let text = if value.fract() == 0.0 {
                            format!("{}", value as i64)
                        } else {
                            value.to_string()
                        };
                        *expr = Expr::Value(Value::Number(text, false));
                    }
                }
            }
        }
        _ => {}
    }
}

fn alias_for(expr: &Expr, index: usize) -> Ident {
    match expr {
        Expr::Identifier(ident) => ident.clone(),
        Expr::CompoundIdentifier(parts) => parts.last().cloned().unwrap_or_else(|| Ident::new(format!("col_{index}"))),
        _ => Ident::new(format!("col_{index}")),
    }
}

/// `qualify -> simplify` when every dependency in `known_columns` covers the
/// referenced source; otherwise explicit-alias every bare projection item
/// and skip both passes (§4.3 step 5 schema-presence fallback).
pub fn optimize(
    mut query: Query,
    known_columns: &BTreeMap<String, BTreeMap<String, String>>,
) -> Query {
    let Some(select) = top_level_select_mut(&mut query) else {
        return query;
    };

    let schema_complete = select.from.iter().all(|twj| match &twj.relation {
        TableFactor::Table { name, .. } => known_columns.contains_key(&name.to_string()),
        _ => true,
    });

    if schema_complete {
        if let Some(alias) = single_source_alias(select) {
            for item in &mut select.projection {
                match item {
                    SelectItem::UnnamedExpr(expr) | SelectItem::ExprWithAlias { expr, .. } => {
                        qualify_expr(expr, &alias);
                    }
                    _ => {}
                }
            }
        }
        for item in &mut select.projection {
            match item {
                SelectItem::UnnamedExpr(expr) | SelectItem::ExprWithAlias { expr, .. } => {
                    fold_constants(expr);
                }
                _ => {}
            }
        }
    } else {
        for (index, item) in select.projection.iter_mut().enumerate() {
            if let SelectItem::UnnamedExpr(expr) = item {
                let alias = alias_for(expr, index);
                *item = SelectItem::ExprWithAlias {
                    expr: expr.clone(),
                    alias,
                };
            }
        }
    }

    query
}

pub fn query_to_sql(query: &Query) -> String {
    query.to_string()
}

pub fn table_name_in(name: &ObjectName) -> String {
    name.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_aliases_every_bare_projection() {
        let query = reparse("select a, b from upstream", "generic").unwrap();
        let optimized = optimize(query, &BTreeMap::new());
        let sql = query_to_sql(&optimized);
        assert!(sql.to_lowercase().contains(" as "));
    }

    #[test]
    fn qualifies_when_schema_known() {
        let query = reparse("select a from upstream", "generic").unwrap();
        let mut known = BTreeMap::new();
        known.insert("upstream".to_string(), BTreeMap::from([("a".to_string(), "int".to_string())]));
        let optimized = optimize(query, &known);
        let sql = query_to_sql(&optimized);
        assert!(sql.to_lowercase().contains("upstream.a"));
    }

    #[test]
    fn folds_constant_arithmetic() {
        let query = reparse("select 1 + 2 as total from upstream", "generic").unwrap();
        let mut known = BTreeMap::new();
        known.insert("upstream".to_string(), BTreeMap::new());
        let optimized = optimize(query, &known);
        let sql = query_to_sql(&optimized);
        assert!(sql.contains('3'));
    }
}
