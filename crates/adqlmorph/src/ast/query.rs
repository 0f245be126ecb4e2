//! Statements, queries and FROM-clause items

use serde::{Deserialize, Serialize};

use super::Expr;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Statement {
    Select(Box<Query>),

    /// `lhs UNION [ALL] rhs` and friends
    SetOperation {
        op: SetOp,
        all: bool,
        lhs: Box<Statement>,
        rhs: Box<Statement>,
    },

    /// Text supplied by a rewrite rule; rendered verbatim
    Sql(String),
}

impl From<Query> for Statement {
    fn from(query: Query) -> Self {
        Statement::Select(Box::new(query))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SetOp {
    Union,
    Intersect,
    Except,
}

/// A single `SELECT` query with one slot per clause
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Query {
    /// `DISTINCT` or `ALL`, as written
    pub quantifier: Option<String>,
    /// ADQL `TOP n`
    pub top: Option<u64>,
    pub select_list: Vec<SelectItem>,
    pub from: Vec<TableRef>,
    pub where_clause: Option<Expr>,
    pub group_by: Vec<Expr>,
    pub having: Option<Expr>,
    pub order_by: Vec<OrderItem>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl Query {
    pub fn new(select_list: Vec<SelectItem>, from: Vec<TableRef>) -> Self {
        Self {
            select_list,
            from,
            ..Self::default()
        }
    }

    pub fn with_where(mut self, condition: Expr) -> Self {
        self.where_clause = Some(condition);
        self
    }

    /// Row limit from `TOP` and `LIMIT`; the smaller one wins when both are set
    pub fn effective_limit(&self) -> Option<u64> {
        match (self.top, self.limit) {
            (Some(top), Some(limit)) => Some(top.min(limit)),
            (top, limit) => top.or(limit),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SelectItem {
    /// `*` or `t.*`
    Star(Option<String>),
    Expr { expr: Expr, alias: Option<String> },
}

impl SelectItem {
    pub fn expr(expr: Expr) -> Self {
        SelectItem::Expr { expr, alias: None }
    }

    pub fn aliased(expr: Expr, alias: impl Into<String>) -> Self {
        SelectItem::Expr {
            expr,
            alias: Some(alias.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub expr: Expr,
    #[serde(default)]
    pub descending: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TableRef {
    Table {
        name: String,
        alias: Option<String>,
    },
    Derived(DerivedTable),
    Join {
        left: Box<TableRef>,
        kind: JoinKind,
        right: Box<TableRef>,
        spec: JoinSpec,
    },
    /// Text supplied by a rewrite rule; rendered verbatim
    Sql(String),
}

impl TableRef {
    pub fn table(name: impl Into<String>) -> Self {
        TableRef::Table {
            name: name.into(),
            alias: None,
        }
    }
}

/// A sub-query used as a FROM-clause item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedTable {
    pub statement: Box<Statement>,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
    Cross,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum JoinSpec {
    On(Expr),
    Using(Vec<String>),
    Natural,
    None,
}
