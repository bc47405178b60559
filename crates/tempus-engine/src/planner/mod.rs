//! Query planner.
//!
//! Translates a sealed [`Statement`] plus a storage handle into an
//! executable [`Plan`]. Mutation statements (CREATE, DROP, INSERT,
//! DELETE, SHOW) compile to small dedicated plans; QUERY, CONSTRUCT, and
//! DECONSTRUCT compile to a join plan over the sorted graph pattern (see
//! [`query`]).
//!
//! Semantic and plan errors are raised here, at construction, whenever
//! the statement's structure decides them; execution surfaces storage,
//! runtime, and cancellation errors, plus the two data-dependent
//! semantic checks (sum over a dynamically typed object binding, and
//! group constancy under the implicit single group) that only values
//! can answer.

use std::sync::Arc;

use tracing::debug;

use tempus_common::types::Triple;
use tempus_common::utils::context::Context;
use tempus_common::utils::error::{Error, Result};
use tempus_core::storage::{Graph, Store};
use tempus_core::table::{Cell, Row, Table};

use crate::semantic::{Statement, StatementType};

mod query;
pub mod tracer;

use query::QueryPlan;
pub use tracer::Tracer;
use tracer::trace;

/// Binding name of the single column a SHOW plan produces.
const SHOW_GRAPH_BINDING: &str = "?graph";

/// An executable plan.
pub trait Plan: Send {
    /// Runs the plan to completion, producing the result table. Mutation
    /// plans return an empty table.
    ///
    /// # Errors
    ///
    /// Returns storage errors verbatim, `Exec` errors for runtime
    /// failures, `Canceled` if the context is canceled, and `Semantic`
    /// for the data-dependent aggregation checks that cannot be decided
    /// at plan construction.
    fn execute(&mut self, ctx: &Context) -> Result<Table>;
}

/// Builds plans for statements against one store.
///
/// Follows the builder convention: configure with `with_*`, then call
/// [`Planner::plan`] per statement.
pub struct Planner {
    store: Arc<dyn Store>,
    chunk_size: usize,
    tracer: Tracer,
}

impl Planner {
    /// Creates a planner over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            chunk_size: 0,
            tracer: None,
        }
    }

    /// Sets the streaming chunk size. Zero permits full materialization.
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Installs a tracer receiving human-readable plan steps. The next
    /// built plan takes ownership of it.
    #[must_use]
    pub fn with_tracer(mut self, tracer: Box<dyn std::io::Write + Send>) -> Self {
        self.tracer = Some(tracer);
        self
    }

    /// Builds a plan for the statement.
    ///
    /// # Errors
    ///
    /// Returns `Plan` and `Semantic` errors for malformed statements and
    /// storage errors for unresolvable graphs.
    pub fn plan(&mut self, ctx: &Context, stm: &Statement) -> Result<Box<dyn Plan>> {
        let kind = stm
            .kind()
            .ok_or_else(|| Error::Plan("statement has no type".to_string()))?;
        debug!(%kind, "planning statement");
        let tracer = self.tracer.take();
        match kind {
            StatementType::Create => Ok(Box::new(CreatePlan {
                store: Arc::clone(&self.store),
                graphs: stm.graph_names().to_vec(),
                tracer,
            })),
            StatementType::Drop => Ok(Box::new(DropPlan {
                store: Arc::clone(&self.store),
                graphs: stm.graph_names().to_vec(),
                tracer,
            })),
            StatementType::Insert => Ok(Box::new(MutateDataPlan::new(
                ctx,
                &self.store,
                stm,
                false,
                tracer,
            )?)),
            StatementType::Delete => Ok(Box::new(MutateDataPlan::new(
                ctx,
                &self.store,
                stm,
                true,
                tracer,
            )?)),
            StatementType::Show => Ok(Box::new(ShowPlan {
                store: Arc::clone(&self.store),
                tracer,
            })),
            StatementType::Query | StatementType::Construct | StatementType::Deconstruct => Ok(
                Box::new(QueryPlan::new(ctx, &self.store, stm, self.chunk_size, tracer)?),
            ),
        }
    }
}

/// Plan for `create graph`.
struct CreatePlan {
    store: Arc<dyn Store>,
    graphs: Vec<String>,
    tracer: Tracer,
}

impl Plan for CreatePlan {
    fn execute(&mut self, ctx: &Context) -> Result<Table> {
        for name in &self.graphs {
            self.store.new_graph(ctx, name)?;
            trace(&mut self.tracer, || vec![format!("created graph {name}")]);
        }
        Table::new(Vec::new())
    }
}

/// Plan for `drop graph`.
struct DropPlan {
    store: Arc<dyn Store>,
    graphs: Vec<String>,
    tracer: Tracer,
}

impl Plan for DropPlan {
    fn execute(&mut self, ctx: &Context) -> Result<Table> {
        for name in &self.graphs {
            self.store.delete_graph(ctx, name)?;
            trace(&mut self.tracer, || vec![format!("dropped graph {name}")]);
        }
        Table::new(Vec::new())
    }
}

/// Plan for `insert data into` / `delete data from`.
///
/// Graphs are resolved at plan construction so an unknown graph fails
/// before any mutation happens. The graph's set semantics make both
/// directions idempotent.
struct MutateDataPlan {
    graphs: Vec<Arc<dyn Graph>>,
    data: Vec<Triple>,
    remove: bool,
    tracer: Tracer,
}

impl MutateDataPlan {
    fn new(
        ctx: &Context,
        store: &Arc<dyn Store>,
        stm: &Statement,
        remove: bool,
        tracer: Tracer,
    ) -> Result<Self> {
        if stm.graph_names().is_empty() {
            return Err(Error::Plan(format!(
                "{} statement does not address any graph",
                stm.kind().unwrap_or(StatementType::Insert)
            )));
        }
        let graphs = stm
            .graph_names()
            .iter()
            .map(|name| store.graph(ctx, name))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            graphs,
            data: stm.data().to_vec(),
            remove,
            tracer,
        })
    }
}

impl Plan for MutateDataPlan {
    fn execute(&mut self, ctx: &Context) -> Result<Table> {
        for graph in &self.graphs {
            if self.remove {
                graph.remove_triples(ctx, &self.data)?;
            } else {
                graph.add_triples(ctx, &self.data)?;
            }
            trace(&mut self.tracer, || {
                let verb = if self.remove { "removed" } else { "added" };
                vec![format!(
                    "{verb} {} triples in graph {}",
                    self.data.len(),
                    graph.id()
                )]
            });
        }
        Table::new(Vec::new())
    }
}

/// Plan for `show graphs`.
struct ShowPlan {
    store: Arc<dyn Store>,
    tracer: Tracer,
}

impl Plan for ShowPlan {
    fn execute(&mut self, ctx: &Context) -> Result<Table> {
        let names = self.store.graph_names(ctx)?;
        trace(&mut self.tracer, || {
            vec![format!("store has {} graphs", names.len())]
        });
        let mut table = Table::new(vec![SHOW_GRAPH_BINDING.to_string()])?;
        for name in names {
            let mut row = Row::new();
            row.insert(SHOW_GRAPH_BINDING.to_string(), Cell::Text(name));
            table.add_row(row);
        }
        Ok(table)
    }
}
