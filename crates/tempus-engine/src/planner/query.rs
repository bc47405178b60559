//! Join plans for QUERY, CONSTRUCT, and DECONSTRUCT statements.
//!
//! Plan construction orders the graph pattern by descending specificity,
//! folds the statement's global temporal window into each clause, and
//! validates everything that can be checked before values exist. Execution
//! streams each clause from storage on a worker thread, materializes one
//! row per matching triple, and folds the clause tables into a left-deep
//! natural join before post-processing reshapes the result.

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use tracing::debug;

use tempus_common::types::{Anchor, Node, Object, Predicate, Triple};
use tempus_common::utils::context::Context;
use tempus_common::utils::error::{Error, Result};
use tempus_core::storage::{triple_channel, Graph, Lookup, Store, DEFAULT_SINK_CAPACITY};
use tempus_core::table::{AggregateFunction, AggregateSpec, Cell, Row, SortKey, Table};

use crate::semantic::{
    ConstructClause, Expr, GraphClause, Projection, Statement, StatementType,
};

use super::tracer::{trace, Tracer};
use super::Plan;

/// One pattern clause with its effective lookup, ready to execute.
struct PlannedClause {
    clause: GraphClause,
    lookup: Lookup,
}

/// Destinations and templates for CONSTRUCT/DECONSTRUCT.
struct ConstructSpec {
    outputs: Vec<Arc<dyn Graph>>,
    clauses: Vec<ConstructClause>,
    remove: bool,
}

/// The join plan for QUERY, CONSTRUCT, and DECONSTRUCT statements.
pub(crate) struct QueryPlan {
    graphs: Vec<Arc<dyn Graph>>,
    clauses: Vec<PlannedClause>,
    projections: Vec<Projection>,
    group_by: Vec<String>,
    order_by: Vec<SortKey>,
    having: Option<Expr>,
    limit: Option<u64>,
    chunk_size: usize,
    tracer: Tracer,
    construct: Option<ConstructSpec>,
}

impl QueryPlan {
    /// Builds and validates the plan. Everything the statement's
    /// structure can decide fails here; only the data-dependent
    /// aggregation checks are left to execution.
    pub(crate) fn new(
        ctx: &Context,
        store: &Arc<dyn Store>,
        stm: &Statement,
        chunk_size: usize,
        mut tracer: Tracer,
    ) -> Result<Self> {
        let kind = stm
            .kind()
            .ok_or_else(|| Error::Plan("statement has no type".to_string()))?;

        if stm.graph_names().is_empty() {
            return Err(Error::Plan(format!(
                "{kind} statement does not address any graph"
            )));
        }
        let graphs = stm
            .graph_names()
            .iter()
            .map(|name| store.graph(ctx, name))
            .collect::<Result<Vec<_>>>()?;

        if stm.graph_pattern_clauses().is_empty() {
            return Err(Error::Plan(format!(
                "{kind} statement has an empty graph pattern"
            )));
        }

        let produced = stm.bindings_map();
        if kind == StatementType::Query && stm.projections().is_empty() {
            return Err(Error::Plan("query statement has no projection".to_string()));
        }
        for name in stm.input_bindings() {
            if !produced.contains_key(&name) {
                return Err(Error::Semantic(format!(
                    "binding {name:?} is not produced by the graph pattern"
                )));
            }
        }
        if let Some(having) = stm.having() {
            for name in having.bindings() {
                if !produced.contains_key(name) {
                    return Err(Error::Semantic(format!(
                        "having references binding {name:?} which is not produced by the graph pattern"
                    )));
                }
            }
        }
        validate_grouping(stm)?;
        for projection in stm.projections() {
            if projection.aggregator == Some(AggregateFunction::Sum)
                && !binding_may_be_numeric(stm, &projection.binding)
            {
                return Err(Error::Semantic(format!(
                    "sum over binding {:?}, which can never hold a numeric literal",
                    projection.binding
                )));
            }
        }

        let outputs = stm.output_bindings();
        for key in stm.order_by() {
            if !produced.contains_key(&key.binding) && !outputs.contains(&key.binding) {
                return Err(Error::Semantic(format!(
                    "order by references unknown binding {:?}",
                    key.binding
                )));
            }
        }

        let (global_lower, global_upper) = stm.time_window();
        let mut clauses = Vec::new();
        for mut clause in stm.sorted_graph_pattern_clauses() {
            let (p_lower, p_upper) = intersect_window(
                clause.p_lower_bound,
                clause.p_upper_bound,
                global_lower,
                global_upper,
            )?;
            clause.p_lower_bound = p_lower;
            clause.p_upper_bound = p_upper;
            if object_is_temporal(&clause) {
                let (o_lower, o_upper) = intersect_window(
                    clause.o_lower_bound,
                    clause.o_upper_bound,
                    global_lower,
                    global_upper,
                )?;
                clause.o_lower_bound = o_lower;
                clause.o_upper_bound = o_upper;
            }
            let lookup = Lookup {
                max_elements: None,
                lower_anchor: p_lower,
                upper_anchor: p_upper,
            };
            clauses.push(PlannedClause { clause, lookup });
        }

        let construct = match kind {
            StatementType::Construct | StatementType::Deconstruct => {
                if stm.construct_clauses().is_empty() {
                    return Err(Error::Plan(format!(
                        "{kind} statement has no construct clauses"
                    )));
                }
                if stm.output_graph_names().is_empty() {
                    return Err(Error::Plan(format!(
                        "{kind} statement has no destination graph"
                    )));
                }
                let remove = kind == StatementType::Deconstruct;
                if remove
                    && stm
                        .construct_clauses()
                        .iter()
                        .any(|c| !c.reification_clauses().is_empty())
                {
                    return Err(Error::Semantic(
                        "deconstruct does not support reification clauses".to_string(),
                    ));
                }
                let outputs = stm
                    .output_graph_names()
                    .iter()
                    .map(|name| store.graph(ctx, name))
                    .collect::<Result<Vec<_>>>()?;
                Some(ConstructSpec {
                    outputs,
                    clauses: stm.construct_clauses().to_vec(),
                    remove,
                })
            }
            _ => None,
        };

        trace(&mut tracer, || {
            clauses
                .iter()
                .enumerate()
                .map(|(i, p)| {
                    format!(
                        "clause {i}: specificity {} bindings {:?}",
                        p.clause.specificity(),
                        p.clause.bindings()
                    )
                })
                .collect()
        });

        Ok(Self {
            graphs,
            clauses,
            projections: stm.projections().to_vec(),
            group_by: stm.group_by().to_vec(),
            order_by: stm.order_by().to_vec(),
            having: stm.having().cloned(),
            limit: stm.limit(),
            chunk_size,
            tracer,
            construct,
        })
    }

    /// Evaluates the graph pattern into the joined binding table.
    fn evaluate_pattern(&mut self, ctx: &Context) -> Result<Table> {
        let mut acc: Option<Table> = None;
        for planned in &self.clauses {
            let (bindings, rows) = clause_rows(ctx, &self.graphs, planned, self.chunk_size)?;
            let row_count = rows.len();
            debug!(
                specificity = planned.clause.specificity(),
                rows = row_count,
                "materialized clause"
            );
            trace(&mut self.tracer, move || {
                vec![format!("clause produced {row_count} rows")]
            });
            acc = Some(match acc {
                None => {
                    let mut table = clause_table(&bindings)?;
                    for row in rows {
                        table.add_row(row);
                    }
                    table
                }
                Some(left) => join_chunked(&left, &bindings, rows, self.chunk_size)?,
            });
        }
        acc.ok_or_else(|| Error::Plan("statement has an empty graph pattern".to_string()))
    }
}

impl Plan for QueryPlan {
    fn execute(&mut self, ctx: &Context) -> Result<Table> {
        let table = self.evaluate_pattern(ctx)?;
        if let Some(spec) = &self.construct {
            return apply_construct(ctx, &mut self.tracer, spec, &table);
        }
        post_process(
            &mut self.tracer,
            &self.projections,
            &self.group_by,
            &self.order_by,
            self.having.as_ref(),
            self.limit,
            table,
        )
    }
}

/// True when the object position carries any temporal requirement.
fn object_is_temporal(clause: &GraphClause) -> bool {
    clause.o_temporal
        || clause.o_anchor_binding.is_some()
        || clause.o_anchor_alias.is_some()
        || clause.o_lower_bound.is_some()
        || clause.o_upper_bound.is_some()
}

/// True when the predicate position carries any temporal requirement.
fn predicate_is_temporal(clause: &GraphClause) -> bool {
    clause.p_temporal || clause.p_anchor_binding.is_some() || clause.p_anchor_alias.is_some()
}

/// Intersects a clause window with the statement window. A strictly
/// empty intersection is a semantic error; a single-instant window is
/// still valid.
fn intersect_window(
    lower: Option<Anchor>,
    upper: Option<Anchor>,
    global_lower: Option<Anchor>,
    global_upper: Option<Anchor>,
) -> Result<(Option<Anchor>, Option<Anchor>)> {
    let lower = match (lower, global_lower) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    };
    let upper = match (upper, global_upper) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    };
    if let (Some(l), Some(u)) = (lower, upper) {
        if l > u {
            return Err(Error::Semantic(
                "the clause and statement temporal windows do not intersect".to_string(),
            ));
        }
    }
    Ok((lower, upper))
}

/// True when some pattern position could bind `binding` to a numeric
/// literal. Only the object value positions are dynamically typed; every
/// other position yields nodes, predicates, text, or timestamps, so a
/// `sum()` over a binding they alone produce is rejected while the plan
/// is being built.
fn binding_may_be_numeric(stm: &Statement, binding: &str) -> bool {
    stm.graph_pattern_clauses().iter().any(|clause| {
        clause.o_binding.as_deref() == Some(binding)
            || clause.o_alias.as_deref() == Some(binding)
    })
}

/// Validates GROUP BY coverage: every key is projected without an
/// aggregator and every projection is either grouped or aggregated.
fn validate_grouping(stm: &Statement) -> Result<()> {
    if stm.group_by().is_empty() {
        return Ok(());
    }
    for key in stm.group_by() {
        let projected = stm
            .projections()
            .iter()
            .any(|p| p.aggregator.is_none() && (p.binding == *key || p.output_name() == key));
        if !projected {
            return Err(Error::Semantic(format!(
                "group by binding {key:?} is not projected"
            )));
        }
    }
    for projection in stm.projections() {
        if projection.aggregator.is_none()
            && !stm
                .group_by()
                .iter()
                .any(|key| *key == projection.binding || key == projection.output_name())
        {
            return Err(Error::Semantic(format!(
                "projection {:?} is neither grouped nor aggregated",
                projection.output_name()
            )));
        }
    }
    Ok(())
}

/// Creates an empty table with the clause's deduplicated bindings.
fn clause_table(bindings: &[String]) -> Result<Table> {
    let mut table = Table::new(Vec::new())?;
    for binding in bindings {
        table.add_binding(binding);
    }
    Ok(table)
}

/// Materializes one clause across every source graph: selects the access
/// path from the concrete positions and binds each matching triple.
fn clause_rows(
    ctx: &Context,
    graphs: &[Arc<dyn Graph>],
    planned: &PlannedClause,
    chunk_size: usize,
) -> Result<(Vec<String>, Vec<Row>)> {
    let clause = &planned.clause;
    let mut bindings: Vec<String> = Vec::new();
    for binding in clause.bindings() {
        if !bindings.iter().any(|b| b == binding) {
            bindings.push(binding.to_string());
        }
    }

    let mut rows = Vec::new();
    for graph in graphs {
        if let (Some(s), Some(p), Some(o)) = (&clause.s, &clause.p, &clause.o) {
            // Fully concrete clause: existence probe.
            if planned.lookup.accepts(p) {
                let probe = Triple::new(s.clone(), p.clone(), o.clone());
                if graph.exists(ctx, &probe)? {
                    if let Some(row) = bind_triple(clause, &probe) {
                        rows.push(row);
                    }
                }
            }
        } else {
            stream_rows(ctx, graph, planned, chunk_size, &mut rows)?;
        }
    }
    Ok((bindings, rows))
}

/// Streams one indexed lookup on a worker thread and binds the results.
/// The consumer drains or drops the channel before joining the worker,
/// so producers never leak.
fn stream_rows(
    ctx: &Context,
    graph: &Arc<dyn Graph>,
    planned: &PlannedClause,
    chunk_size: usize,
    rows: &mut Vec<Row>,
) -> Result<()> {
    let capacity = if chunk_size > 0 {
        chunk_size
    } else {
        DEFAULT_SINK_CAPACITY
    };
    let (sink, rx) = triple_channel(capacity);

    let worker_graph = Arc::clone(graph);
    let worker_ctx = ctx.clone();
    let lookup = planned.lookup.clone();
    let s = planned.clause.s.clone();
    let p = planned.clause.p.clone();
    let o = planned.clause.o.clone();
    let worker = thread::spawn(move || -> Result<()> {
        match (s, p, o) {
            (Some(s), Some(p), None) => worker_graph
                .triples_for_subject_and_predicate(&worker_ctx, &s, &p, &lookup, sink),
            (Some(s), None, Some(o)) => {
                worker_graph.triples_for_subject_and_object(&worker_ctx, &s, &o, &lookup, sink)
            }
            (None, Some(p), Some(o)) => {
                worker_graph.triples_for_predicate_and_object(&worker_ctx, &p, &o, &lookup, sink)
            }
            (Some(s), None, None) => {
                worker_graph.triples_for_subject(&worker_ctx, &s, &lookup, sink)
            }
            (None, Some(p), None) => {
                worker_graph.triples_for_predicate(&worker_ctx, &p, &lookup, sink)
            }
            (None, None, Some(o)) => {
                worker_graph.triples_for_object(&worker_ctx, &o, &lookup, sink)
            }
            _ => worker_graph.triples(&worker_ctx, &lookup, sink),
        }
    });

    let consumed = (|| -> Result<()> {
        for triple in rx.iter() {
            ctx.check()?;
            if let Some(row) = bind_triple(&planned.clause, &triple) {
                rows.push(row);
            }
        }
        Ok(())
    })();
    drop(rx);
    let produced = worker
        .join()
        .map_err(|_| Error::Exec("lookup worker panicked".to_string()))?;
    consumed?;
    produced
}

/// Inserts a cell under an optional binding, rejecting the row when the
/// same name was already bound to a different value within the clause.
fn put(row: &mut Row, name: Option<&String>, cell: Cell) -> bool {
    match name {
        None => true,
        Some(name) => match row.get(name) {
            Some(existing) => *existing == cell,
            None => {
                row.insert(name.clone(), cell);
                true
            }
        },
    }
}

/// Extracts a clause's bindings from one matched triple, or rejects the
/// triple when it violates a local constraint (`p_id`/`o_id` name
/// filters, temporal requirements, the object anchor window, or two
/// same-named bindings disagreeing).
#[allow(clippy::too_many_lines)]
fn bind_triple(clause: &GraphClause, triple: &Triple) -> Option<Row> {
    let predicate = triple.predicate();
    if let Some(p_id) = &clause.p_id {
        if predicate.id() != p_id {
            return None;
        }
    }
    if predicate_is_temporal(clause) && !predicate.is_temporal() {
        return None;
    }

    let object = triple.object();
    let object_predicate = object.as_predicate();
    if let Some(o_id) = &clause.o_id {
        match object_predicate {
            Some(op) if op.id() == o_id => {}
            _ => return None,
        }
    }
    if object_is_temporal(clause) {
        match object_predicate.and_then(Predicate::anchor) {
            Some(anchor) => {
                if clause.o_lower_bound.is_some_and(|lower| *anchor < lower) {
                    return None;
                }
                if clause.o_upper_bound.is_some_and(|upper| *anchor > upper) {
                    return None;
                }
            }
            None => return None,
        }
    }

    let mut row = Row::new();

    // Subject side.
    let subject = triple.subject();
    if !put(&mut row, clause.s_binding.as_ref(), Cell::Node(subject.clone()))
        || !put(&mut row, clause.s_alias.as_ref(), Cell::Node(subject.clone()))
        || !put(
            &mut row,
            clause.s_type_alias.as_ref(),
            Cell::Text(subject.kind().to_string()),
        )
        || !put(
            &mut row,
            clause.s_id_alias.as_ref(),
            Cell::Text(subject.id().to_string()),
        )
    {
        return None;
    }

    // Predicate side.
    if !put(
        &mut row,
        clause.p_binding.as_ref(),
        Cell::Predicate(predicate.clone()),
    ) || !put(
        &mut row,
        clause.p_alias.as_ref(),
        Cell::Predicate(predicate.clone()),
    ) || !put(
        &mut row,
        clause.p_id_alias.as_ref(),
        Cell::Text(predicate.id().to_string()),
    ) {
        return None;
    }
    if clause.p_anchor_binding.is_some() || clause.p_anchor_alias.is_some() {
        let anchor = *predicate.anchor()?;
        if !put(&mut row, clause.p_anchor_binding.as_ref(), Cell::Time(anchor))
            || !put(&mut row, clause.p_anchor_alias.as_ref(), Cell::Time(anchor))
        {
            return None;
        }
    }
    if let (Some(alias), Some(bound)) = (&clause.p_lower_bound_alias, clause.p_lower_bound) {
        if !put(&mut row, Some(alias), Cell::Time(bound)) {
            return None;
        }
    }
    if let (Some(alias), Some(bound)) = (&clause.p_upper_bound_alias, clause.p_upper_bound) {
        if !put(&mut row, Some(alias), Cell::Time(bound)) {
            return None;
        }
    }

    // Object side.
    if !put(&mut row, clause.o_binding.as_ref(), Cell::from_object(object))
        || !put(&mut row, clause.o_alias.as_ref(), Cell::from_object(object))
    {
        return None;
    }
    if let Some(alias) = &clause.o_id_alias {
        let id = match object {
            Object::Node(n) => n.id().to_string(),
            Object::Predicate(p) => p.id().to_string(),
            Object::Literal(_) => return None,
        };
        if !put(&mut row, Some(alias), Cell::Text(id)) {
            return None;
        }
    }
    if let Some(alias) = &clause.o_type_alias {
        let kind = match object {
            Object::Node(n) => n.kind().to_string(),
            Object::Literal(l) => l.type_name().to_string(),
            Object::Predicate(_) => return None,
        };
        if !put(&mut row, Some(alias), Cell::Text(kind)) {
            return None;
        }
    }
    if clause.o_anchor_binding.is_some() || clause.o_anchor_alias.is_some() {
        let anchor = *object_predicate.and_then(Predicate::anchor)?;
        if !put(&mut row, clause.o_anchor_binding.as_ref(), Cell::Time(anchor))
            || !put(&mut row, clause.o_anchor_alias.as_ref(), Cell::Time(anchor))
        {
            return None;
        }
    }
    if let (Some(alias), Some(bound)) = (&clause.o_lower_bound_alias, clause.o_lower_bound) {
        if !put(&mut row, Some(alias), Cell::Time(bound)) {
            return None;
        }
    }
    if let (Some(alias), Some(bound)) = (&clause.o_upper_bound_alias, clause.o_upper_bound) {
        if !put(&mut row, Some(alias), Cell::Time(bound)) {
            return None;
        }
    }

    Some(row)
}

/// Joins the accumulated table with a clause's rows, chunk by chunk when
/// a chunk size is set.
fn join_chunked(
    left: &Table,
    bindings: &[String],
    rows: Vec<Row>,
    chunk_size: usize,
) -> Result<Table> {
    if chunk_size == 0 || rows.len() <= chunk_size {
        let mut right = clause_table(bindings)?;
        for row in rows {
            right.add_row(row);
        }
        return left.inner_join(&right);
    }

    let mut joined: Option<Table> = None;
    for chunk in rows.chunks(chunk_size) {
        let mut right = clause_table(bindings)?;
        for row in chunk {
            right.add_row(row.clone());
        }
        let partial = left.inner_join(&right)?;
        match &mut joined {
            None => joined = Some(partial),
            Some(table) => {
                for row in partial.rows() {
                    table.add_row(row.clone());
                }
            }
        }
    }
    // rows.len() > chunk_size >= 1, so at least one chunk was joined.
    joined.map_or_else(|| left.inner_join(&clause_table(bindings)?), Ok)
}

/// Applies post-processing in order: HAVING, grouping/aggregation,
/// ORDER BY, LIMIT, and the final projection to output names.
fn post_process(
    tracer: &mut Tracer,
    projections: &[Projection],
    group_by: &[String],
    order_by: &[SortKey],
    having: Option<&Expr>,
    limit: Option<u64>,
    mut table: Table,
) -> Result<Table> {
    if let Some(expr) = having {
        let before = table.num_rows();
        table.filter(|row| expr.evaluate(row));
        let kept = table.num_rows();
        trace(tracer, move || {
            vec![format!("having kept {kept} of {before} rows")]
        });
    }

    let has_aggregator = projections.iter().any(|p| p.aggregator.is_some());
    if !group_by.is_empty() || has_aggregator {
        let mut seen = HashSet::new();
        let mut sources = Vec::new();
        for projection in projections {
            if seen.insert(projection.binding.clone()) {
                sources.push((projection.binding.clone(), projection.binding.clone()));
            }
        }
        table.project(&sources)?;
        let specs: Vec<AggregateSpec> = projections
            .iter()
            .filter_map(|p| {
                p.aggregator.map(|function| AggregateSpec {
                    input: p.binding.clone(),
                    output: p.output_name().to_string(),
                    function,
                })
            })
            .collect();
        // Group keys may name output aliases; the projected table
        // carries source bindings, so resolve aliases back to them.
        let keys: Vec<String> = group_by
            .iter()
            .map(|key| {
                projections
                    .iter()
                    .find(|p| p.aggregator.is_none() && p.output_name() == key)
                    .map_or_else(|| key.clone(), |p| p.binding.clone())
            })
            .collect();
        table.group_by(&keys, &specs)?;
        let groups = table.num_rows();
        trace(tracer, move || vec![format!("grouped into {groups} rows")]);
    }

    if !order_by.is_empty() {
        table.sort(order_by);
    }
    if let Some(n) = limit {
        table.limit(n);
    }

    let spec: Vec<(String, String)> = projections
        .iter()
        .map(|p| {
            let output = p.output_name().to_string();
            if p.aggregator.is_some() {
                (output.clone(), output)
            } else {
                (p.binding.clone(), output)
            }
        })
        .collect();
    table.project(&spec)?;
    Ok(table)
}

/// Instantiates the construct templates per result row and applies them
/// to every destination graph.
fn apply_construct(
    ctx: &Context,
    tracer: &mut Tracer,
    spec: &ConstructSpec,
    table: &Table,
) -> Result<Table> {
    let mut triples = Vec::new();
    for row in table.rows() {
        for clause in &spec.clauses {
            triples.extend(instantiate_construct(clause, row)?);
        }
    }
    let count = triples.len();
    let verb = if spec.remove { "removing" } else { "adding" };
    trace(tracer, move || {
        vec![format!("{verb} {count} constructed triples")]
    });
    for graph in &spec.outputs {
        if spec.remove {
            graph.remove_triples(ctx, &triples)?;
        } else {
            graph.add_triples(ctx, &triples)?;
        }
    }
    Table::new(Vec::new())
}

fn instantiate_construct(clause: &ConstructClause, row: &Row) -> Result<Vec<Triple>> {
    let subject = construct_subject(clause.s.as_ref(), clause.s_binding.as_ref(), row)?;
    let predicate = construct_predicate(
        clause.p.as_ref(),
        clause.p_id.as_ref(),
        clause.p_binding.as_ref(),
        clause.p_anchor_binding.as_ref(),
        row,
    )?;
    let object = construct_object(
        clause.o.as_ref(),
        clause.o_id.as_ref(),
        clause.o_binding.as_ref(),
        clause.o_anchor_binding.as_ref(),
        row,
    )?;
    let base = Triple::new(subject, predicate, object);

    if clause.reification_clauses().is_empty() {
        return Ok(vec![base]);
    }
    let (mut triples, blank) = base.reify();
    for reification in clause.reification_clauses() {
        let p = construct_predicate(
            reification.p.as_ref(),
            reification.p_id.as_ref(),
            reification.p_binding.as_ref(),
            reification.p_anchor_binding.as_ref(),
            row,
        )?;
        let o = construct_object(
            reification.o.as_ref(),
            reification.o_id.as_ref(),
            reification.o_binding.as_ref(),
            reification.o_anchor_binding.as_ref(),
            row,
        )?;
        triples.push(Triple::new(blank.clone(), p, o));
    }
    Ok(triples)
}

fn construct_subject(s: Option<&Node>, binding: Option<&String>, row: &Row) -> Result<Node> {
    if let Some(node) = s {
        return Ok(node.clone());
    }
    let name =
        binding.ok_or_else(|| Error::Exec("construct clause has no subject".to_string()))?;
    match row.get(name) {
        Some(Cell::Node(node)) => Ok(node.clone()),
        Some(other) => Err(Error::Exec(format!(
            "construct subject {name:?} is bound to non-node value {other}"
        ))),
        None => Err(Error::Exec(format!("construct subject {name:?} is unbound"))),
    }
}

fn construct_predicate(
    p: Option<&Predicate>,
    p_id: Option<&String>,
    binding: Option<&String>,
    anchor_binding: Option<&String>,
    row: &Row,
) -> Result<Predicate> {
    if let Some(predicate) = p {
        return Ok(predicate.clone());
    }
    if let Some(name) = binding {
        return match row.get(name) {
            Some(Cell::Predicate(predicate)) => Ok(predicate.clone()),
            Some(other) => Err(Error::Exec(format!(
                "construct predicate {name:?} is bound to non-predicate value {other}"
            ))),
            None => Err(Error::Exec(format!(
                "construct predicate {name:?} is unbound"
            ))),
        };
    }
    let id = p_id.ok_or_else(|| Error::Exec("construct clause has no predicate".to_string()))?;
    match anchor_binding {
        None => Ok(Predicate::immutable(id.clone())),
        Some(name) => match row.get(name) {
            Some(Cell::Time(anchor)) => Ok(Predicate::temporal(id.clone(), *anchor)),
            Some(other) => Err(Error::Exec(format!(
                "construct anchor {name:?} is bound to non-time value {other}"
            ))),
            None => Err(Error::Exec(format!("construct anchor {name:?} is unbound"))),
        },
    }
}

fn construct_object(
    o: Option<&Object>,
    o_id: Option<&String>,
    binding: Option<&String>,
    anchor_binding: Option<&String>,
    row: &Row,
) -> Result<Object> {
    if let Some(object) = o {
        return Ok(object.clone());
    }
    if let Some(name) = binding {
        return match row.get(name) {
            Some(Cell::Node(n)) => Ok(Object::Node(n.clone())),
            Some(Cell::Predicate(p)) => Ok(Object::Predicate(p.clone())),
            Some(Cell::Literal(l)) => Ok(Object::Literal(l.clone())),
            Some(other) => Err(Error::Exec(format!(
                "construct object {name:?} is bound to non-object value {other}"
            ))),
            None => Err(Error::Exec(format!("construct object {name:?} is unbound"))),
        };
    }
    if o_id.is_none() {
        return Err(Error::Exec("construct clause has no object".to_string()));
    }
    construct_predicate(None, o_id, None, anchor_binding, row).map(Object::Predicate)
}
