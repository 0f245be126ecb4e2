//! Statement flattener
//!
//! Linearizes a query into PostgreSQL text: `TOP` folds into `LIMIT`, and a
//! `SELECT ALL` quantifier becomes an explicit `OFFSET 0`.

use crate::ast::Query;
use crate::error::Result;
use crate::render::{push_body, select_list};

/// Flatten a query to PostgreSQL text
///
/// Children are expected to be rewritten already; clauses with empty slots
/// are omitted.
pub fn flatten_select(query: &Query) -> Result<String> {
    let mut out = String::from("SELECT");
    let mut offset = query.offset;

    match query.quantifier.as_deref() {
        Some(q) if q.eq_ignore_ascii_case("ALL") => {
            offset.get_or_insert(0);
        }
        Some(q) => {
            out.push(' ');
            out.push_str(&q.to_uppercase());
        }
        None => {}
    }

    out.push(' ');
    out.push_str(&select_list(&query.select_list)?);
    push_body(&mut out, query)?;

    if let Some(limit) = query.effective_limit() {
        out.push_str(&format!(" LIMIT {}", limit));
    }
    if let Some(offset) = offset {
        out.push_str(&format!(" OFFSET {}", offset));
    }
    Ok(out)
}
