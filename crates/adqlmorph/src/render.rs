//! Generic flattening of the AST into text
//!
//! Renders whatever a pass left behind. Nodes no rule touched come out in
//! their ADQL spelling; `Expr::Sql` and friends are substituted verbatim.
//! Rules use these helpers to read their (already rewritten) children.

use std::fmt::{self, Display};

use crate::ast::{
    AccessorKind, BinOp, CompOp, DerivedTable, Expr, JoinKind, JoinSpec, Literal, OrderItem,
    PredicateKind, Query, SelectItem, SetOp, Statement, TableRef, UnaryOp,
};
use crate::error::{DialectError, Result};

// ============ Display for operators ============

impl Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Concat => "||",
            BinOp::And => "AND",
            BinOp::Or => "OR",
        };
        write!(f, "{}", s)
    }
}

impl Display for CompOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CompOp::Eq => "=",
            CompOp::Ne => "<>",
            CompOp::Lt => "<",
            CompOp::Le => "<=",
            CompOp::Gt => ">",
            CompOp::Ge => ">=",
        };
        write!(f, "{}", s)
    }
}

impl Display for SetOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SetOp::Union => "UNION",
            SetOp::Intersect => "INTERSECT",
            SetOp::Except => "EXCEPT",
        };
        write!(f, "{}", s)
    }
}

impl Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Number(text) => write!(f, "{}", text),
            Literal::String(s) => write!(f, "{}", quote(s)),
            Literal::Null => write!(f, "NULL"),
        }
    }
}

/// Quote as an SQL string literal
pub fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

// ============ Expressions ============

/// Flatten an expression to text
pub fn flatten(expr: &Expr) -> Result<String> {
    Ok(match expr {
        Expr::Literal(lit) => lit.to_string(),
        Expr::Column(col) => match &col.qualifier {
            Some(q) => format!("{}.{}", q, col.name),
            None => col.name.clone(),
        },
        Expr::Geometry(ctor) => {
            let mut parts = Vec::with_capacity(ctor.args.len() + 1);
            if let Some(frame) = &ctor.frame {
                parts.push(quote(frame));
            }
            for arg in &ctor.args {
                parts.push(flatten(arg)?);
            }
            format!("{}({})", ctor.shape.adql_name(), parts.join(", "))
        }
        Expr::Predicate(pred) => {
            let name = match pred.kind {
                PredicateKind::Contains => "CONTAINS",
                PredicateKind::Intersects => "INTERSECTS",
            };
            format!("{}({}, {})", name, flatten(&pred.lhs)?, flatten(&pred.rhs)?)
        }
        Expr::Accessor(acc) => {
            let name = match acc.kind {
                AccessorKind::Coord1 => "COORD1",
                AccessorKind::Coord2 => "COORD2",
                AccessorKind::Coordsys => "COORDSYS",
            };
            format!("{}({})", name, flatten(&acc.arg)?)
        }
        Expr::Function(call) => format!("{}({})", call.name, flatten_list(&call.args)?),
        Expr::GeometryFunction(call) => {
            format!("{}({})", call.kind.adql_name(), flatten_list(&call.args)?)
        }
        Expr::Comparison(cmp) => {
            format!("{} {} {}", operand(&cmp.lhs)?, cmp.op, operand(&cmp.rhs)?)
        }
        Expr::Binary(lhs, op, rhs) => format!("{} {} {}", operand(lhs)?, op, operand(rhs)?),
        Expr::Unary(UnaryOp::Neg, inner) => {
            let text = operand(inner)?;
            // `--` starts an SQL comment
            if text.starts_with('-') {
                format!("-({})", text)
            } else {
                format!("-{}", text)
            }
        }
        Expr::Unary(UnaryOp::Not, inner) => format!("NOT {}", operand(inner)?),
        Expr::Subquery(stmt) => format!("({})", flatten_statement(stmt)?),
        Expr::Sql(fragment) => fragment.text.clone(),
        Expr::Region(region) => {
            return Err(DialectError::UnresolvedRegion {
                region: region.to_string(),
            });
        }
    })
}

/// Flatten a comma-separated argument list
pub fn flatten_list(exprs: &[Expr]) -> Result<String> {
    let parts = exprs.iter().map(flatten).collect::<Result<Vec<_>>>()?;
    Ok(parts.join(", "))
}

/// Operands that are themselves operator expressions get parentheses
fn operand(expr: &Expr) -> Result<String> {
    let text = flatten(expr)?;
    if matches!(expr, Expr::Binary(..) | Expr::Comparison(..)) {
        Ok(format!("({})", text))
    } else {
        Ok(text)
    }
}

// ============ Statements ============

/// Flatten a statement to text
pub fn flatten_statement(stmt: &Statement) -> Result<String> {
    match stmt {
        Statement::Select(query) => flatten_query(query),
        Statement::SetOperation { op, all, lhs, rhs } => {
            let all = if *all { " ALL" } else { "" };
            Ok(format!(
                "({}) {}{} ({})",
                flatten_statement(lhs)?,
                op,
                all,
                flatten_statement(rhs)?
            ))
        }
        Statement::Sql(text) => Ok(text.clone()),
    }
}

/// ADQL spelling of a query, with `TOP`
pub fn flatten_query(query: &Query) -> Result<String> {
    let mut out = String::from("SELECT");
    if let Some(quantifier) = &query.quantifier {
        out.push(' ');
        out.push_str(&quantifier.to_uppercase());
    }
    if let Some(limit) = query.effective_limit() {
        out.push_str(&format!(" TOP {}", limit));
    }
    out.push(' ');
    out.push_str(&select_list(&query.select_list)?);
    push_body(&mut out, query)?;
    if let Some(offset) = query.offset {
        out.push_str(&format!(" OFFSET {}", offset));
    }
    Ok(out)
}

/// Append `FROM` through `ORDER BY`, skipping empty clauses
pub(crate) fn push_body(out: &mut String, query: &Query) -> Result<()> {
    if !query.from.is_empty() {
        out.push_str(" FROM ");
        out.push_str(&from_list(&query.from)?);
    }
    if let Some(condition) = &query.where_clause {
        out.push_str(" WHERE ");
        out.push_str(&flatten(condition)?);
    }
    if !query.group_by.is_empty() {
        out.push_str(" GROUP BY ");
        out.push_str(&flatten_list(&query.group_by)?);
    }
    if let Some(condition) = &query.having {
        out.push_str(" HAVING ");
        out.push_str(&flatten(condition)?);
    }
    if !query.order_by.is_empty() {
        out.push_str(" ORDER BY ");
        out.push_str(&order_list(&query.order_by)?);
    }
    Ok(())
}

pub(crate) fn select_list(items: &[SelectItem]) -> Result<String> {
    let parts = items
        .iter()
        .map(|item| match item {
            SelectItem::Star(Some(table)) => Ok(format!("{}.*", table)),
            SelectItem::Star(None) => Ok("*".to_string()),
            SelectItem::Expr { expr, alias } => {
                let text = flatten(expr)?;
                Ok(match alias {
                    Some(alias) => format!("{} AS {}", text, alias),
                    None => text,
                })
            }
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(parts.join(", "))
}

fn order_list(items: &[OrderItem]) -> Result<String> {
    let parts = items
        .iter()
        .map(|item| {
            let dir = if item.descending { "DESC" } else { "ASC" };
            Ok(format!("{} {}", flatten(&item.expr)?, dir))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(parts.join(", "))
}

fn from_list(tables: &[TableRef]) -> Result<String> {
    let parts = tables.iter().map(flatten_table).collect::<Result<Vec<_>>>()?;
    Ok(parts.join(", "))
}

/// Flatten a FROM-clause item
pub fn flatten_table(table: &TableRef) -> Result<String> {
    Ok(match table {
        TableRef::Table { name, alias } => match alias {
            Some(alias) => format!("{} AS {}", name, alias),
            None => name.clone(),
        },
        TableRef::Derived(derived) => flatten_derived(derived)?,
        TableRef::Join {
            left,
            kind,
            right,
            spec,
        } => {
            let natural = if matches!(spec, JoinSpec::Natural) {
                "NATURAL "
            } else {
                ""
            };
            let kind = match kind {
                JoinKind::Inner => "JOIN",
                JoinKind::Left => "LEFT OUTER JOIN",
                JoinKind::Right => "RIGHT OUTER JOIN",
                JoinKind::Full => "FULL OUTER JOIN",
                JoinKind::Cross => "CROSS JOIN",
            };
            let mut out = format!(
                "{} {}{} {}",
                flatten_table(left)?,
                natural,
                kind,
                flatten_table(right)?
            );
            match spec {
                JoinSpec::On(condition) => {
                    out.push_str(" ON ");
                    out.push_str(&flatten(condition)?);
                }
                JoinSpec::Using(columns) => {
                    out.push_str(&format!(" USING ({})", columns.join(", ")));
                }
                JoinSpec::Natural | JoinSpec::None => {}
            }
            out
        }
        TableRef::Sql(text) => text.clone(),
    })
}

/// `(inner) AS name`
pub fn flatten_derived(derived: &DerivedTable) -> Result<String> {
    Ok(format!(
        "({}) AS {}",
        flatten_statement(&derived.statement)?,
        derived.name
    ))
}
