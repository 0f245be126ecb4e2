//! Value expressions
//!
//! Each geometry-related node kind gets its own struct so a pass can install
//! exactly one rule per kind.

use serde::{Deserialize, Serialize};

use super::query::Statement;
use super::{BinOp, ColumnRef, CompOp, Fragment, Literal, UnaryOp};
use crate::stcs::StcsRegion;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Literal(Literal),

    /// Column reference, possibly annotated with field metadata
    Column(ColumnRef),

    /// `POINT`, `CIRCLE`, `BOX`, `POLYGON`
    Geometry(GeometryCtor),

    /// `CONTAINS`, `INTERSECTS`
    Predicate(GeometryPredicate),

    /// `COORD1`, `COORD2`, `COORDSYS`
    Accessor(PointAccessor),

    /// Numeric or user-defined function call: `LOG(x)`, `RAND()`, ...
    Function(FunctionCall),

    /// `AREA`, `DISTANCE`, `CENTROID`, `REGION`
    GeometryFunction(GeometryFunction),

    /// `a = b`, `a < b`, ...
    Comparison(Comparison),

    Binary(Box<Expr>, BinOp, Box<Expr>),

    Unary(UnaryOp, Box<Expr>),

    /// Scalar sub-query
    Subquery(Box<Statement>),

    /// Text supplied by a rewrite rule; rendered verbatim
    Sql(Fragment),

    /// Unresolved STC-S region algebra; must be resolved before rendering
    Region(StcsRegion),
}

impl Expr {
    pub fn number(value: impl ToString) -> Self {
        Expr::Literal(Literal::number(value))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Expr::Literal(Literal::String(value.into()))
    }

    pub fn column(name: impl Into<String>) -> Self {
        Expr::Column(ColumnRef::new(name))
    }

    pub fn sql(text: impl Into<String>) -> Self {
        Expr::Sql(Fragment {
            text: text.into(),
            coord_system: None,
            predicate: false,
        })
    }

    /// Rule output standing in for a whole `CONTAINS`/`INTERSECTS` test
    pub fn predicate_sql(text: impl Into<String>) -> Self {
        Expr::Sql(Fragment {
            text: text.into(),
            coord_system: None,
            predicate: true,
        })
    }

    pub fn is_predicate_sql(&self) -> bool {
        matches!(self, Expr::Sql(fragment) if fragment.predicate)
    }

    pub fn binop(self, op: BinOp, rhs: Expr) -> Self {
        Expr::Binary(Box::new(self), op, Box::new(rhs))
    }

    pub fn compare(self, op: CompOp, rhs: Expr) -> Self {
        Expr::Comparison(Comparison {
            lhs: Box::new(self),
            op,
            rhs: Box::new(rhs),
        })
    }

    /// Numeric value of a literal, including negated literals
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Expr::Literal(lit) => lit.as_f64(),
            Expr::Unary(UnaryOp::Neg, inner) => inner.as_number().map(|n| -n),
            _ => None,
        }
    }

    /// Coordinate system the expression is known to be in, if any
    pub fn coord_system(&self) -> Option<&str> {
        match self {
            Expr::Geometry(ctor) => ctor.frame.as_deref(),
            Expr::Column(col) => col.field.as_ref()?.coord_system.as_deref(),
            Expr::Sql(fragment) => fragment.coord_system.as_deref(),
            _ => None,
        }
    }
}

// ============ Geometry constructors ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Shape {
    Point,
    Circle,
    Box,
    Polygon,
}

impl Shape {
    pub fn adql_name(self) -> &'static str {
        match self {
            Shape::Point => "POINT",
            Shape::Circle => "CIRCLE",
            Shape::Box => "BOX",
            Shape::Polygon => "POLYGON",
        }
    }
}

/// A geometry constructor call
///
/// `args` holds coordinate expressions only (the parser expands point
/// arguments into their coordinates):
/// - point: `x, y`
/// - circle: `x, y, radius`
/// - box: `x, y, width, height` (center and full extents)
/// - polygon: `x1, y1, x2, y2, ...`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometryCtor {
    pub shape: Shape,
    pub frame: Option<String>,
    pub args: Vec<Expr>,
}

impl GeometryCtor {
    pub fn new(shape: Shape, frame: Option<&str>, args: Vec<Expr>) -> Self {
        Self {
            shape,
            frame: frame.map(str::to_owned),
            args,
        }
    }

    pub fn point(frame: Option<&str>, x: Expr, y: Expr) -> Self {
        Self::new(Shape::Point, frame, vec![x, y])
    }

    pub fn circle(frame: Option<&str>, x: Expr, y: Expr, radius: Expr) -> Self {
        Self::new(Shape::Circle, frame, vec![x, y, radius])
    }

    pub fn boxed(frame: Option<&str>, x: Expr, y: Expr, width: Expr, height: Expr) -> Self {
        Self::new(Shape::Box, frame, vec![x, y, width, height])
    }

    pub fn polygon(frame: Option<&str>, coords: Vec<Expr>) -> Self {
        Self::new(Shape::Polygon, frame, coords)
    }

    /// Whether `args` has the length the shape requires
    pub fn has_valid_arity(&self) -> bool {
        let n = self.args.len();
        match self.shape {
            Shape::Point => n == 2,
            Shape::Circle => n == 3,
            Shape::Box => n == 4,
            Shape::Polygon => n >= 6 && n % 2 == 0,
        }
    }

    pub fn expected_arity(&self) -> &'static str {
        match self.shape {
            Shape::Point => "2",
            Shape::Circle => "3",
            Shape::Box => "4",
            Shape::Polygon => "an even number >= 6",
        }
    }

    pub fn x(&self) -> Option<&Expr> {
        self.args.first()
    }

    pub fn y(&self) -> Option<&Expr> {
        self.args.get(1)
    }

    pub fn radius(&self) -> Option<&Expr> {
        match self.shape {
            Shape::Circle => self.args.get(2),
            _ => None,
        }
    }

    pub fn width(&self) -> Option<&Expr> {
        match self.shape {
            Shape::Box => self.args.get(2),
            _ => None,
        }
    }

    pub fn height(&self) -> Option<&Expr> {
        match self.shape {
            Shape::Box => self.args.get(3),
            _ => None,
        }
    }

    /// Polygon vertex coordinates, flattened
    pub fn coords(&self) -> &[Expr] {
        &self.args
    }

    /// Box corners `(x0, y0, x1, y1)`: the lower-left and upper-right corners
    pub fn corners(&self) -> Option<(Expr, Expr, Expr, Expr)> {
        let (x, y) = (self.x()?, self.y()?);
        let (w, h) = (self.width()?, self.height()?);
        Some((
            offset(x, w, BinOp::Sub),
            offset(y, h, BinOp::Sub),
            offset(x, w, BinOp::Add),
            offset(y, h, BinOp::Add),
        ))
    }
}

/// `center -/+ extent/2`, folded when both operands are literal
fn offset(center: &Expr, extent: &Expr, op: BinOp) -> Expr {
    if let (Some(c), Some(e)) = (center.as_number(), extent.as_number()) {
        let value = match op {
            BinOp::Sub => c - e / 2.0,
            _ => c + e / 2.0,
        };
        return Expr::number(value);
    }
    center
        .clone()
        .binop(op, extent.clone().binop(BinOp::Div, Expr::number(2)))
}

// ============ Predicates and functions ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PredicateKind {
    Contains,
    Intersects,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometryPredicate {
    pub kind: PredicateKind,
    pub lhs: Box<Expr>,
    pub rhs: Box<Expr>,
}

impl GeometryPredicate {
    pub fn contains(lhs: Expr, rhs: Expr) -> Self {
        Self {
            kind: PredicateKind::Contains,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn intersects(lhs: Expr, rhs: Expr) -> Self {
        Self {
            kind: PredicateKind::Intersects,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessorKind {
    Coord1,
    Coord2,
    Coordsys,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointAccessor {
    pub kind: AccessorKind,
    pub arg: Box<Expr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    pub args: Vec<Expr>,
}

impl FunctionCall {
    pub fn new(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeometryFunctionKind {
    Area,
    Distance,
    Centroid,
    Region,
}

impl GeometryFunctionKind {
    pub fn adql_name(self) -> &'static str {
        match self {
            GeometryFunctionKind::Area => "AREA",
            GeometryFunctionKind::Distance => "DISTANCE",
            GeometryFunctionKind::Centroid => "CENTROID",
            GeometryFunctionKind::Region => "REGION",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeometryFunction {
    pub kind: GeometryFunctionKind,
    pub args: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub lhs: Box<Expr>,
    pub op: CompOp,
    pub rhs: Box<Expr>,
}
