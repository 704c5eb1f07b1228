//! AST canonicalization (§4.2): parse per-dialect, then re-emit a
//! dialect-neutral SQL string. Also the home of the `depends_on` table scan
//! that `Model::depends_on` is populated from (§3 "[ADDED]").

use std::collections::BTreeSet;

use sqlparser::ast::{Query, SetExpr, Statement, TableFactor};
use sqlparser::dialect::{
    BigQueryDialect, ClickHouseDialect, Dialect, DuckDbDialect, GenericDialect, HiveDialect,
    MsSqlDialect, MySqlDialect, PostgreSqlDialect, RedshiftSqlDialect, SQLiteDialect,
    SnowflakeDialect,
};
use sqlparser::parser::Parser;
use strata_core::errors::CoreError;

pub fn dialect_for(name: &str) -> Box<dyn Dialect> {
    match name.to_ascii_lowercase().as_str() {
        "snowflake" => Box::new(SnowflakeDialect {}),
        "bigquery" => Box::new(BigQueryDialect {}),
        "databricks" | "spark" | "hive" => Box::new(HiveDialect {}),
        "postgres" | "postgresql" => Box::new(PostgreSqlDialect {}),
        "mysql" => Box::new(MySqlDialect {}),
        "duckdb" => Box::new(DuckDbDialect {}),
        "redshift" => Box::new(RedshiftSqlDialect {}),
        "mssql" | "tsql" => Box::new(MsSqlDialect {}),
        "sqlite" => Box::new(SQLiteDialect {}),
        "clickhouse" => Box::new(ClickHouseDialect {}),
        _ => Box::new(GenericDialect {}),
    }
}

fn parse(sql: &str, dialect: &str) -> Result<Vec<Statement>, CoreError> {
    let d = dialect_for(dialect);
    Parser::parse_sql(d.as_ref(), sql)
        .map_err(|e| CoreError::config(format!("failed to parse model query: {e}"), "<model-query>"))
}

/// Parse, then re-emit. `sqlparser`'s `Display` impl already lowers the AST
/// back to text with consistent spacing/casing for keywords, which is as
/// far as "dialect-neutral" goes without a full rewrite pass.
pub fn canonical_sql(sql: &str, dialect: &str) -> Result<String, CoreError> {
    let statements = parse(sql, dialect)?;
    let rendered: Vec<String> = statements.iter().map(Statement::to_string).collect();
    Ok(rendered.join(";\n"))
}

/// Parse and return the single top-level query, or `None` if the text isn't
/// exactly one `Statement::Query` (e.g. multiple statements, a DDL
/// statement). Callers treat `None` as "can't be diffed structurally".
pub fn parse_single_query(sql: &str, dialect: &str) -> Result<Option<Box<Query>>, CoreError> {
    let mut statements = parse(sql, dialect)?;
    if statements.len() != 1 {
        return Ok(None);
    }
    match statements.remove(0) {
        Statement::Query(query) => Ok(Some(query)),
        _ => Ok(None),
    }
}

/// Best-effort scan of table references in a query: every `FROM`/`JOIN`
/// relation, recursing into subqueries and set operations, minus any name
/// that a CTE in the same query defines (those resolve internally, not to
/// an upstream model).
pub fn depends_on(sql: &str, dialect: &str) -> Result<BTreeSet<String>, CoreError> {
    let Some(query) = parse_single_query(sql, dialect)? else {
        return Ok(BTreeSet::new());
    };
    let mut refs = BTreeSet::new();
    let mut cte_names = BTreeSet::new();
    collect_query(&query, &mut refs, &mut cte_names);
    for name in &cte_names {
        refs.remove(name);
    }
    Ok(refs)
}

fn collect_query(query: &Query, refs: &mut BTreeSet<String>, cte_names: &mut BTreeSet<String>) {
    if let Some(with) = &query.with {
        for cte in &with.cte_tables {
            cte_names.insert(cte.alias.name.value.clone());
            collect_query(&cte.query, refs, cte_names);
        }
    }
    collect_set_expr(&query.body, refs, cte_names);
}

fn collect_set_expr(expr: &SetExpr, refs: &mut BTreeSet<String>, cte_names: &mut BTreeSet<String>) {
    match expr {
        SetExpr::Select(select) => {
            for twj in &select.from {
                collect_table_factor(&twj.relation, refs, cte_names);
                for join in &twj.joins {
                    collect_table_factor(&join.relation, refs, cte_names);
                }
            }
        }
        SetExpr::Query(q) => collect_query(q, refs, cte_names),
        SetExpr::SetOperation { left, right, .. } => {
            collect_set_expr(left, refs, cte_names);
            collect_set_expr(right, refs, cte_names);
        }
        SetExpr::Values(_) | SetExpr::Insert(_) | SetExpr::Update(_) | SetExpr::Table(_) => {}
    }
}

fn collect_table_factor(
    factor: &TableFactor,
    refs: &mut BTreeSet<String>,
    cte_names: &mut BTreeSet<String>,
) {
    match factor {
        TableFactor::Table { name, .. } => {
            refs.insert(name.to_string());
        }
        TableFactor::Derived { subquery, .. } => {
            collect_query(subquery, refs, cte_names);
        }
        TableFactor::NestedJoin {
            table_with_joins, ..
        } => {
            collect_table_factor(&table_with_joins.relation, refs, cte_names);
            for join in &table_with_joins.joins {
                collect_table_factor(&join.relation, refs, cte_names);
            }
        }
        _ => {}
    }
}
