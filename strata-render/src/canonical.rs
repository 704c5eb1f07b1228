//! Thin wrapper over `strata_fingerprint::canonicalize` for the renderer's
//! own parse needs: a single subqueryable `Query`, never a multi-statement
//! batch (§4.3 "Final result must be a single subqueryable expression").

use sqlparser::ast::Query;
use strata_core::errors::CoreError;
use strata_fingerprint::canonicalize::parse_single_query;

pub fn reparse(sql: &str, dialect: &str) -> Result<Query, CoreError> {
    match parse_single_query(sql, dialect)? {
        Some(query) => Ok(*query),
        None => Err(CoreError::config(
            "rendered text is not a single subqueryable statement",
            "<render>",
        )),
    }
}
