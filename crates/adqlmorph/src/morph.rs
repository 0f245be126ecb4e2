//! ADQL to PostgreSQL rewrite rules
//!
//! The general dialect pass: geometry constructors and predicates, point
//! accessors, renamed numeric functions, geometry functions, and the statement
//! flattener. Runs after [`crate::index::SpatialIndexPass`].

use crate::ast::{
    AccessorKind, Comparison, DerivedTable, Expr, FunctionCall, GeometryCtor, GeometryFunction,
    GeometryFunctionKind, GeometryPredicate, PointAccessor, PredicateKind, Query, Shape,
    Statement, TableRef,
};
use crate::config::DialectConfig;
use crate::error::{DialectError, Result};
use crate::pass::{Pass, PassState, Rewrite, discard_boolean_wrapper};
use crate::render::{flatten, flatten_derived, flatten_list, quote};
use crate::rotation::conform;
use crate::statement;

/// ADQL function names PostgreSQL spells differently
const RENAMED_FUNCTIONS: &[(&str, &str)] = &[("LOG", "LN"), ("LOG10", "LOG"), ("TRUNCATE", "TRUNC")];

pub const PLANAR_AREA_WARNING: &str =
    "AREA is evaluated with a planar approximation; results are inexact for large regions";

pub struct DialectMorph {
    config: DialectConfig,
}

impl DialectMorph {
    pub fn new(config: &DialectConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }
}

impl Default for DialectMorph {
    fn default() -> Self {
        Self::new(&DialectConfig::default())
    }
}

fn arity(function: &str, expected: &str, got: usize) -> DialectError {
    DialectError::Arity {
        function: function.to_string(),
        expected: expected.to_string(),
        got,
    }
}

// ============ Geometry constructors ============

fn morph_geometry(node: &GeometryCtor) -> Result<String> {
    if !node.has_valid_arity() {
        return Err(arity(
            node.shape.adql_name(),
            node.expected_arity(),
            node.args.len(),
        ));
    }
    let args = &node.args;

    Ok(match node.shape {
        Shape::Point => format!("POINT({}, {})", flatten(&args[0])?, flatten(&args[1])?),
        Shape::Circle => format!(
            "CIRCLE(POINT({}, {}), {})",
            flatten(&args[0])?,
            flatten(&args[1])?,
            flatten(&args[2])?
        ),
        Shape::Box => {
            let Some((x0, y0, x1, y1)) = node.corners() else {
                return Err(arity("BOX", "4", args.len()));
            };
            format!(
                "POLYGON(BOX(POINT({}, {}), POINT({}, {})))",
                flatten(&x0)?,
                flatten(&y0)?,
                flatten(&x1)?,
                flatten(&y1)?
            )
        }
        Shape::Polygon => {
            let mut coords = Vec::with_capacity(args.len());
            for arg in args {
                let text = flatten(arg)?;
                if arg.as_number().is_none() {
                    return Err(DialectError::NonLiteralPolygon { argument: text });
                }
                coords.push(text);
            }
            let points = coords
                .chunks(2)
                .map(|pair| format!("({}, {})", pair[0], pair[1]))
                .collect::<Vec<_>>();
            format!("'({})'::polygon", points.join(", "))
        }
    })
}

// ============ Predicates ============

fn morph_predicate(node: &GeometryPredicate) -> Result<String> {
    let mut lhs = flatten(&node.lhs)?;
    let rhs = flatten(&node.rhs)?;
    if let (Some(from), Some(to)) = (node.lhs.coord_system(), node.rhs.coord_system()) {
        lhs = conform(&lhs, from, to)?;
    }
    let op = match node.kind {
        PredicateKind::Contains => "~",
        PredicateKind::Intersects => "?#",
    };
    Ok(format!("({}) {} ({})", lhs, op, rhs))
}

// ============ Point accessors ============

fn morph_accessor(node: &PointAccessor) -> Result<String> {
    Ok(match node.kind {
        AccessorKind::Coord1 => format!("({})[0]", flatten(&node.arg)?),
        AccessorKind::Coord2 => format!("({})[1]", flatten(&node.arg)?),
        AccessorKind::Coordsys => {
            let system = node.arg.coord_system().unwrap_or("unknown");
            let cleaned: String = system
                .chars()
                .filter(|c| c.is_alphanumeric() || *c == '_')
                .collect();
            quote(&cleaned)
        }
    })
}

// ============ Numeric functions ============

fn morph_function(node: FunctionCall) -> Result<Rewrite<Expr>> {
    let upper = node.name.to_ascii_uppercase();

    if let Some((_, renamed)) = RENAMED_FUNCTIONS.iter().find(|(adql, _)| *adql == upper) {
        return Ok(Rewrite::Keep(Expr::Function(FunctionCall::new(
            *renamed, node.args,
        ))));
    }

    match upper.as_str() {
        "RAND" => match &node.args[..] {
            [] => Ok(Rewrite::Sql("random()".into())),
            [seed] => {
                let seed = flatten(seed)?;
                Ok(Rewrite::Sql(format!(
                    "setseed({})-setseed({})+random()",
                    seed, seed
                )))
            }
            args => Err(arity("RAND", "0 or 1", args.len())),
        },
        "SQUARE" => match &node.args[..] {
            [x] => Ok(Rewrite::Sql(format!("({})^2", flatten(x)?))),
            args => Err(arity("SQUARE", "1", args.len())),
        },
        _ => Ok(Rewrite::Keep(Expr::Function(node))),
    }
}

// ============ Geometry functions ============

impl DialectMorph {
    fn morph_geometry_function(
        &self,
        node: GeometryFunction,
        state: &mut PassState,
    ) -> Result<Rewrite<Expr>> {
        match node.kind {
            GeometryFunctionKind::Area => {
                state.warn(PLANAR_AREA_WARNING);
                Ok(Rewrite::Keep(Expr::GeometryFunction(node)))
            }
            GeometryFunctionKind::Distance => match node.args.len() {
                2 => Ok(Rewrite::Sql(format!(
                    "{}({})",
                    self.config.distance_function,
                    flatten_list(&node.args)?
                ))),
                4 => Ok(Rewrite::Sql(format!(
                    "{}({})",
                    self.config.distance_function_deg,
                    flatten_list(&node.args)?
                ))),
                n => Err(arity("DISTANCE", "2 or 4", n)),
            },
            GeometryFunctionKind::Centroid => match &node.args[..] {
                [geometry] => Ok(Rewrite::Sql(format!(
                    "{}({})",
                    self.config.centroid_function,
                    flatten(geometry)?
                ))),
                args => Err(arity("CENTROID", "1", args.len())),
            },
            GeometryFunctionKind::Region => Err(DialectError::Unsupported {
                feature: "REGION".into(),
            }),
        }
    }
}

impl Pass for DialectMorph {
    fn name(&self) -> &'static str {
        "dialect-morph"
    }

    fn geometry(&self, node: GeometryCtor, _state: &mut PassState) -> Result<Rewrite<Expr>> {
        morph_geometry(&node).map(Rewrite::Sql)
    }

    fn predicate(&self, node: GeometryPredicate, state: &mut PassState) -> Result<Rewrite<Expr>> {
        let sql = morph_predicate(&node)?;
        state.discard_enclosing_comparison();
        Ok(Rewrite::Sql(sql))
    }

    fn accessor(&self, node: PointAccessor, _state: &mut PassState) -> Result<Rewrite<Expr>> {
        morph_accessor(&node).map(Rewrite::Sql)
    }

    fn function(&self, node: FunctionCall, _state: &mut PassState) -> Result<Rewrite<Expr>> {
        morph_function(node)
    }

    fn geometry_function(
        &self,
        node: GeometryFunction,
        state: &mut PassState,
    ) -> Result<Rewrite<Expr>> {
        self.morph_geometry_function(node, state)
    }

    fn comparison(&self, node: Comparison, state: &mut PassState) -> Result<Rewrite<Expr>> {
        discard_boolean_wrapper(node, state)
    }

    fn query(&self, node: Query, _state: &mut PassState) -> Result<Rewrite<Statement>> {
        statement::flatten_select(&node).map(Rewrite::Sql)
    }

    fn derived_table(
        &self,
        node: DerivedTable,
        _state: &mut PassState,
    ) -> Result<Rewrite<TableRef>> {
        flatten_derived(&node).map(Rewrite::Sql)
    }
}
