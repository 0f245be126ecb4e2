//! adqlmorph - ADQL to PostgreSQL dialect back end
//!
//! Turns an annotated ADQL syntax tree into PostgreSQL text for a database
//! carrying the pgSphere and q3c extensions.
//!
//! ## Quick Start
//!
//! ```ignore
//! use adqlmorph::{compile, DialectConfig, Statement};
//!
//! let statement: Statement = serde_json::from_str(&ast_json)?;
//! let compiled = compile(statement, &DialectConfig::default())?;
//! println!("{}", compiled.sql);
//! for warning in &compiled.warnings {
//!     eprintln!("warning: {warning}");
//! }
//! ```
//!
//! ## Passes
//!
//! Compilation is two ordered tree passes:
//!
//! - [`SpatialIndexPass`]: `1 = CONTAINS(POINT(...), CIRCLE(...))` → `q3c_join(...)`
//! - [`DialectMorph`]: geometry → pgSphere operators, `LOG10` → `LOG`,
//!   `TOP n` → `LIMIT n`, and the rest
//!
//! The index pass must run first; the general morph would otherwise turn the
//! same predicates into pgSphere `~` operators.
//!
//! ## STC-S
//!
//! ```ignore
//! use adqlmorph::{parse_stcs, StcsValue};
//!
//! match parse_stcs("Circle ICRS 10 20 0.5")? {
//!     StcsValue::Concrete(geometry) => store(geometry.to_string()),
//!     StcsValue::UnresolvedRegion(region) => reject(region),
//! }
//! ```

pub mod ast;
pub mod config;
mod error;
pub mod frames;
pub mod geom;
mod index;
mod morph;
pub mod pass;
pub mod render;
pub mod rotation;
mod statement;
pub mod stcs;

// ============ Primary Public API ============

pub use ast::{Expr, Query, Statement};
pub use config::DialectConfig;
pub use error::{DialectError, Result};
pub use frames::{Frame, tap_system_to_frame};
pub use geom::Geometry;
pub use index::SpatialIndexPass;
pub use morph::{DialectMorph, PLANAR_AREA_WARNING};
pub use pass::{Compiled, Pass, PassOutput, PassState, Pipeline, Rewrite, run_pass};
pub use rotation::{conform, rotation};
pub use statement::flatten_select;
pub use stcs::{StcsError, StcsRegion, StcsValue, parse_stcs};

/// The pass sequence for a configuration
pub fn pipeline(config: &DialectConfig) -> Pipeline {
    let mut pipeline = Pipeline::new();
    if config.spatial_index {
        pipeline = pipeline.then(SpatialIndexPass::new(config));
    }
    pipeline.then(DialectMorph::new(config))
}

/// Compile a statement to PostgreSQL
pub fn compile(statement: Statement, config: &DialectConfig) -> Result<Compiled> {
    pipeline(config).render(statement)
}

/// Compile with the default configuration
pub fn morph(statement: Statement) -> Result<Compiled> {
    compile(statement, &DialectConfig::default())
}
