//! AST types for annotated ADQL
//!
//! The tree is produced by an external ADQL parser and annotated (column
//! references resolved to [`FieldInfo`]) before this crate sees it.
//!
//! Split into:
//! - `expr`: value expressions, including the geometry node kinds
//! - `query`: statements, queries and FROM-clause items

pub mod expr;
pub mod query;

use serde::{Deserialize, Serialize};

pub use expr::{
    AccessorKind, Comparison, Expr, FunctionCall, GeometryCtor, GeometryFunction,
    GeometryFunctionKind, GeometryPredicate, PointAccessor, PredicateKind, Shape,
};
pub use query::{
    DerivedTable, JoinKind, JoinSpec, OrderItem, Query, SelectItem, SetOp, Statement, TableRef,
};

// Shared types used by expressions and statements

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    /// Numeric literal, kept in its source spelling
    Number(String),
    String(String),
    Null,
}

impl Literal {
    pub fn number(value: impl ToString) -> Self {
        Literal::Number(value.to_string())
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Literal::Number(text) => text.parse().ok(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Concat,
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Not,
}

/// Column metadata attached by the annotator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldInfo {
    pub name: String,
    /// STC coordinate system, e.g. `ICRS` or `ICRS GEOCENTER`
    pub coord_system: Option<String>,
    pub unit: Option<String>,
    /// Extended type (`point`, `circle`, `polygon`, ...)
    pub xtype: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnRef {
    pub qualifier: Option<String>,
    pub name: String,
    #[serde(default)]
    pub field: Option<FieldInfo>,
}

impl ColumnRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            qualifier: None,
            name: name.into(),
            field: None,
        }
    }

    pub fn with_field(mut self, field: FieldInfo) -> Self {
        self.field = Some(field);
        self
    }
}

/// Verbatim SQL produced by a rewrite rule
///
/// Carries the coordinate system of the node it replaced, so rules running
/// later in the same pass can still ask for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    pub text: String,
    #[serde(default)]
    pub coord_system: Option<String>,
    /// Complete boolean produced by a geometry predicate rule
    #[serde(default)]
    pub predicate: bool,
}
