//! Single-traversal rewrite engine
//!
//! A [`Pass`] has one method per rewritable node kind, so a pass can carry at
//! most one rule for any kind. When two rule sets need the same kind they run
//! as separate passes, in order, through a [`Pipeline`].
//!
//! Traversal is post-order: a rule sees its children already rewritten and
//! reads them through [`crate::render::flatten`]. A rule returning
//! [`Rewrite::Sql`] fixes the node's final text; the engine never descends
//! into it again.

use crate::ast::{
    Comparison, CompOp, DerivedTable, Expr, Fragment, FunctionCall, GeometryCtor,
    GeometryFunction, GeometryFunctionKind, GeometryPredicate, JoinSpec, OrderItem,
    PointAccessor, Query, SelectItem, Statement, TableRef,
};
use crate::error::{DialectError, Result};
use crate::render::{flatten, flatten_statement};

/// What a rule did with its node
#[derive(Debug, Clone, PartialEq)]
pub enum Rewrite<T> {
    /// Keep the (possibly rebuilt) node and render it generically
    Keep(T),
    /// Use this text verbatim for the node
    Sql(String),
}

/// Mutable state scoped to one `run_pass` call
#[derive(Debug, Default)]
pub struct PassState {
    discard_comparison: bool,
    warnings: Vec<String>,
}

impl PassState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark that the enclosing `= 1` comparison is redundant
    pub fn discard_enclosing_comparison(&mut self) {
        self.discard_comparison = true;
    }

    /// Read and clear the discard flag
    pub fn take_discard(&mut self) -> bool {
        std::mem::take(&mut self.discard_comparison)
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::debug!("warning: {}", message);
        self.warnings.push(message);
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }
}

/// A rule table: one optional rule per node kind
///
/// Every method defaults to keeping the node unchanged.
pub trait Pass: Send + Sync {
    fn name(&self) -> &'static str;

    fn geometry(&self, node: GeometryCtor, _state: &mut PassState) -> Result<Rewrite<Expr>> {
        Ok(Rewrite::Keep(Expr::Geometry(node)))
    }

    fn predicate(
        &self,
        node: GeometryPredicate,
        _state: &mut PassState,
    ) -> Result<Rewrite<Expr>> {
        Ok(Rewrite::Keep(Expr::Predicate(node)))
    }

    fn accessor(&self, node: PointAccessor, _state: &mut PassState) -> Result<Rewrite<Expr>> {
        Ok(Rewrite::Keep(Expr::Accessor(node)))
    }

    fn function(&self, node: FunctionCall, _state: &mut PassState) -> Result<Rewrite<Expr>> {
        Ok(Rewrite::Keep(Expr::Function(node)))
    }

    fn geometry_function(
        &self,
        node: GeometryFunction,
        _state: &mut PassState,
    ) -> Result<Rewrite<Expr>> {
        Ok(Rewrite::Keep(Expr::GeometryFunction(node)))
    }

    fn comparison(&self, node: Comparison, _state: &mut PassState) -> Result<Rewrite<Expr>> {
        Ok(Rewrite::Keep(Expr::Comparison(node)))
    }

    fn query(&self, node: Query, _state: &mut PassState) -> Result<Rewrite<Statement>> {
        Ok(Rewrite::Keep(Statement::Select(Box::new(node))))
    }

    fn derived_table(
        &self,
        node: DerivedTable,
        _state: &mut PassState,
    ) -> Result<Rewrite<TableRef>> {
        Ok(Rewrite::Keep(TableRef::Derived(node)))
    }
}

/// Result of a pass: the rewritten tree and the warnings it raised
#[derive(Debug, Clone, PartialEq)]
pub struct PassOutput {
    pub statement: Statement,
    pub warnings: Vec<String>,
}

/// Run one pass over a statement
pub fn run_pass(statement: Statement, pass: &dyn Pass) -> Result<PassOutput> {
    log::debug!("running pass {}", pass.name());
    let mut walker = Walker {
        pass,
        state: PassState::new(),
    };
    let statement = walker.statement(statement)?;
    let warnings = walker.state.warnings;
    log::debug!("pass {} done, {} warning(s)", pass.name(), warnings.len());
    Ok(PassOutput {
        statement,
        warnings,
    })
}

struct Walker<'a> {
    pass: &'a dyn Pass,
    state: PassState,
}

impl Walker<'_> {
    fn statement(&mut self, statement: Statement) -> Result<Statement> {
        match statement {
            Statement::Select(query) => {
                let query = self.query_children(*query)?;
                let rewrite = self.pass.query(query, &mut self.state)?;
                Ok(self.settle(rewrite, Statement::Sql))
            }
            Statement::SetOperation { op, all, lhs, rhs } => Ok(Statement::SetOperation {
                op,
                all,
                lhs: Box::new(self.statement(*lhs)?),
                rhs: Box::new(self.statement(*rhs)?),
            }),
            Statement::Sql(text) => Ok(Statement::Sql(text)),
        }
    }

    fn query_children(&mut self, query: Query) -> Result<Query> {
        let Query {
            quantifier,
            top,
            select_list,
            from,
            where_clause,
            group_by,
            having,
            order_by,
            limit,
            offset,
        } = query;

        let select_list = select_list
            .into_iter()
            .map(|item| match item {
                SelectItem::Expr { expr, alias } => Ok(SelectItem::Expr {
                    expr: self.expr(expr)?,
                    alias,
                }),
                star => Ok(star),
            })
            .collect::<Result<Vec<_>>>()?;
        let from = from
            .into_iter()
            .map(|table| self.table(table))
            .collect::<Result<Vec<_>>>()?;
        let where_clause = where_clause.map(|e| self.expr(e)).transpose()?;
        let group_by = self.exprs(group_by)?;
        let having = having.map(|e| self.expr(e)).transpose()?;
        let order_by = order_by
            .into_iter()
            .map(|item| {
                Ok(OrderItem {
                    expr: self.expr(item.expr)?,
                    descending: item.descending,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Query {
            quantifier,
            top,
            select_list,
            from,
            where_clause,
            group_by,
            having,
            order_by,
            limit,
            offset,
        })
    }

    fn table(&mut self, table: TableRef) -> Result<TableRef> {
        match table {
            TableRef::Derived(derived) => {
                let statement = self.statement(*derived.statement)?;
                let node = DerivedTable {
                    statement: Box::new(statement),
                    name: derived.name,
                };
                let rewrite = self.pass.derived_table(node, &mut self.state)?;
                Ok(self.settle(rewrite, TableRef::Sql))
            }
            TableRef::Join {
                left,
                kind,
                right,
                spec,
            } => {
                let left = Box::new(self.table(*left)?);
                let right = Box::new(self.table(*right)?);
                let spec = match spec {
                    JoinSpec::On(condition) => JoinSpec::On(self.expr(condition)?),
                    other => other,
                };
                Ok(TableRef::Join {
                    left,
                    kind,
                    right,
                    spec,
                })
            }
            other => Ok(other),
        }
    }

    fn exprs(&mut self, exprs: Vec<Expr>) -> Result<Vec<Expr>> {
        exprs.into_iter().map(|e| self.expr(e)).collect()
    }

    fn expr(&mut self, expr: Expr) -> Result<Expr> {
        let (rewrite, coord_system, predicate) = match expr {
            leaf @ (Expr::Literal(_) | Expr::Column(_) | Expr::Sql(_) | Expr::Region(_)) => {
                return Ok(leaf);
            }
            Expr::Geometry(mut node) => {
                node.args = self.exprs(node.args)?;
                let frame = node.frame.clone();
                (self.pass.geometry(node, &mut self.state)?, frame, false)
            }
            Expr::Predicate(mut node) => {
                node.lhs = Box::new(self.expr(*node.lhs)?);
                node.rhs = Box::new(self.expr(*node.rhs)?);
                let rewrite = self.pass.predicate(node, &mut self.state)?;
                // the flag travels on the fragment, never past this node
                (rewrite, None, self.state.take_discard())
            }
            Expr::Accessor(mut node) => {
                node.arg = Box::new(self.expr(*node.arg)?);
                (self.pass.accessor(node, &mut self.state)?, None, false)
            }
            Expr::Function(mut node) => {
                node.args = self.exprs(node.args)?;
                (self.pass.function(node, &mut self.state)?, None, false)
            }
            Expr::GeometryFunction(mut node) => {
                node.args = self.exprs(node.args)?;
                let frame = match node.kind {
                    GeometryFunctionKind::Centroid => {
                        node.args.first().and_then(Expr::coord_system).map(str::to_owned)
                    }
                    _ => None,
                };
                (self.pass.geometry_function(node, &mut self.state)?, frame, false)
            }
            Expr::Comparison(mut node) => {
                node.lhs = Box::new(self.expr(*node.lhs)?);
                node.rhs = Box::new(self.expr(*node.rhs)?);
                if node.lhs.is_predicate_sql() || node.rhs.is_predicate_sql() {
                    self.state.discard_enclosing_comparison();
                }
                let rewrite = self.pass.comparison(node, &mut self.state)?;
                self.state.take_discard();
                (rewrite, None, false)
            }
            Expr::Binary(lhs, op, rhs) => {
                let lhs = self.expr(*lhs)?;
                let rhs = self.expr(*rhs)?;
                return Ok(Expr::Binary(Box::new(lhs), op, Box::new(rhs)));
            }
            Expr::Unary(op, inner) => {
                return Ok(Expr::Unary(op, Box::new(self.expr(*inner)?)));
            }
            Expr::Subquery(statement) => {
                return Ok(Expr::Subquery(Box::new(self.statement(*statement)?)));
            }
        };

        Ok(match rewrite {
            Rewrite::Keep(expr) => expr,
            Rewrite::Sql(text) => {
                log::trace!("{}: rewrote node to {}", self.pass.name(), text);
                Expr::Sql(Fragment {
                    text,
                    coord_system,
                    predicate,
                })
            }
        })
    }

    fn settle<T>(&self, rewrite: Rewrite<T>, sql: impl FnOnce(String) -> T) -> T {
        match rewrite {
            Rewrite::Keep(node) => node,
            Rewrite::Sql(text) => {
                log::trace!("{}: rewrote statement node to {}", self.pass.name(), text);
                sql(text)
            }
        }
    }
}

/// Comparison rule shared by every pass that rewrites geometry predicates
///
/// ADQL spells a predicate test as `1 = CONTAINS(...)`. Once a predicate rule
/// has produced a real boolean expression and raised the discard flag, the
/// integer comparison is dropped (`= 0` becomes a negation).
pub fn discard_boolean_wrapper(node: Comparison, state: &mut PassState) -> Result<Rewrite<Expr>> {
    if !state.take_discard() {
        return Ok(Rewrite::Keep(Expr::Comparison(node)));
    }

    let (predicate, truth) = match (node.lhs.as_number(), node.rhs.as_number()) {
        (Some(n), None) if node.rhs.is_predicate_sql() => (&node.rhs, n),
        (None, Some(n)) if node.lhs.is_predicate_sql() => (&node.lhs, n),
        _ => return Err(bad_comparison(&node)),
    };
    let text = flatten(predicate)?;
    let negated = match node.op {
        CompOp::Eq if truth == 1.0 => false,
        CompOp::Ne if truth == 0.0 => false,
        CompOp::Eq if truth == 0.0 => true,
        CompOp::Ne if truth == 1.0 => true,
        _ => return Err(bad_comparison(&node)),
    };
    if negated {
        Ok(Rewrite::Sql(format!("NOT ({})", text)))
    } else {
        Ok(Rewrite::Sql(text))
    }
}

fn bad_comparison(node: &Comparison) -> DialectError {
    let comparison = flatten(&Expr::Comparison(node.clone())).unwrap_or_else(|e| e.to_string());
    DialectError::PredicateComparison { comparison }
}

// ============ Pipeline ============

/// Output of a full compilation
#[derive(Debug, Clone, PartialEq)]
pub struct Compiled {
    pub sql: String,
    /// Caveats about the translation; never failures
    pub warnings: Vec<String>,
}

/// Passes applied in order, each over the previous pass's output
#[derive(Default)]
pub struct Pipeline {
    passes: Vec<Box<dyn Pass>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(mut self, pass: impl Pass + 'static) -> Self {
        self.passes.push(Box::new(pass));
        self
    }

    pub fn pass_names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    /// Run every pass, collecting warnings from all of them
    pub fn run(&self, statement: Statement) -> Result<PassOutput> {
        let mut statement = statement;
        let mut warnings = Vec::new();
        for pass in &self.passes {
            let output = run_pass(statement, pass.as_ref())?;
            statement = output.statement;
            warnings.extend(output.warnings);
        }
        Ok(PassOutput {
            statement,
            warnings,
        })
    }

    /// Run every pass and flatten the result
    pub fn render(&self, statement: Statement) -> Result<Compiled> {
        let output = self.run(statement)?;
        Ok(Compiled {
            sql: flatten_statement(&output.statement)?,
            warnings: output.warnings,
        })
    }
}
