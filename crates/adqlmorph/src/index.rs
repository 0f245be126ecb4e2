//! Spatial-index fast path
//!
//! Runs as its own pass before [`crate::morph::DialectMorph`]. Recognizes
//! `CONTAINS(POINT(...), <circle|box|polygon>)` and replaces it with a call
//! into the spherical index (q3c). Anything else is left for the general
//! geometry rules.

use crate::ast::{Comparison, Expr, GeometryCtor, GeometryPredicate, PredicateKind, Shape};
use crate::config::DialectConfig;
use crate::error::Result;
use crate::pass::{Pass, PassState, Rewrite, discard_boolean_wrapper};
use crate::render::{flatten, flatten_list};
use crate::rotation::rotation;

pub struct SpatialIndexPass {
    join_function: String,
    poly_function: String,
}

impl SpatialIndexPass {
    pub fn new(config: &DialectConfig) -> Self {
        Self {
            join_function: config.index_join_function.clone(),
            poly_function: config.index_poly_function.clone(),
        }
    }

    fn index_call(&self, point: &GeometryCtor, shape: &GeometryCtor) -> Result<Option<String>> {
        let (Some(px), Some(py)) = (point.x(), point.y()) else {
            return Ok(None);
        };
        let (px, py) = (flatten(px)?, flatten(py)?);

        let call = match shape.shape {
            Shape::Circle => {
                let (Some(x), Some(y), Some(r)) = (shape.x(), shape.y(), shape.radius()) else {
                    return Ok(None);
                };
                format!(
                    "{}({}, {}, {}, {}, {})",
                    self.join_function,
                    px,
                    py,
                    flatten(x)?,
                    flatten(y)?,
                    flatten(r)?
                )
            }
            Shape::Box => {
                let Some((x0, y0, x1, y1)) = shape.corners() else {
                    return Ok(None);
                };
                let (x0, y0, x1, y1) = (flatten(&x0)?, flatten(&y0)?, flatten(&x1)?, flatten(&y1)?);
                format!(
                    "{}({}, {}, ARRAY[{}, {}, {}, {}, {}, {}, {}, {}])",
                    self.poly_function, px, py, x0, y0, x0, y1, x1, y1, x1, y0
                )
            }
            Shape::Polygon => format!(
                "{}({}, {}, ARRAY[{}])",
                self.poly_function,
                px,
                py,
                flatten_list(shape.coords())?
            ),
            Shape::Point => return Ok(None),
        };
        Ok(Some(call))
    }
}

/// Whether the index can compare the two frames without a rotation
fn same_frame(point: &GeometryCtor, shape: &GeometryCtor) -> bool {
    match (&point.frame, &shape.frame) {
        (Some(a), Some(b)) => matches!(rotation(a, b), Ok(None)),
        _ => true,
    }
}

impl Pass for SpatialIndexPass {
    fn name(&self) -> &'static str {
        "spatial-index"
    }

    fn predicate(&self, node: GeometryPredicate, state: &mut PassState) -> Result<Rewrite<Expr>> {
        if node.kind != PredicateKind::Contains {
            return Ok(Rewrite::Keep(Expr::Predicate(node)));
        }
        let (Expr::Geometry(point), Expr::Geometry(shape)) = (node.lhs.as_ref(), node.rhs.as_ref())
        else {
            return Ok(Rewrite::Keep(Expr::Predicate(node)));
        };
        if point.shape != Shape::Point
            || !point.has_valid_arity()
            || !shape.has_valid_arity()
            || !same_frame(point, shape)
        {
            return Ok(Rewrite::Keep(Expr::Predicate(node)));
        }

        match self.index_call(point, shape)? {
            Some(call) => {
                log::trace!("index fast path for CONTAINS with {:?}", shape.shape);
                state.discard_enclosing_comparison();
                Ok(Rewrite::Sql(call))
            }
            None => Ok(Rewrite::Keep(Expr::Predicate(node))),
        }
    }

    fn comparison(&self, node: Comparison, state: &mut PassState) -> Result<Rewrite<Expr>> {
        discard_boolean_wrapper(node, state)
    }
}
