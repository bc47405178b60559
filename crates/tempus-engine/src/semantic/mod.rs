//! Semantic statement IR.
//!
//! A [`Statement`] captures the logical form of a BQL query or mutation:
//! the statement kind, the graphs it addresses, literal data for
//! mutations, the WHERE graph pattern, the SELECT projection list, the
//! CONSTRUCT/DECONSTRUCT body, and the statement modifiers.
//!
//! The (external) parser assembles the statement incrementally through the
//! scratch-promote lifecycle: `reset_working_*` installs a fresh scratch
//! record, the parser mutates it through `working_*_mut`, and
//! `add_working_*` promotes a non-empty scratch into the permanent list.
//! Promotion is a move; an empty scratch is silently discarded. After the
//! parse the statement is sealed and read only for the planner.

use std::collections::HashMap;

use tempus_common::types::{Anchor, Node, Object, Predicate, Triple};
use tempus_core::table::{AggregateFunction, SortKey};

mod expression;

pub use expression::{ComparisonOp, Expr, Operand};

/// The kind of a parsed statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementType {
    /// `select ... from ... where {...}`.
    Query,
    /// `insert data into ... {...}`.
    Insert,
    /// `delete data from ... {...}`.
    Delete,
    /// `create graph ...`.
    Create,
    /// `drop graph ...`.
    Drop,
    /// `construct {...} into ... from ... where {...}`.
    Construct,
    /// `deconstruct {...} in ... from ... where {...}`.
    Deconstruct,
    /// `show graphs`.
    Show,
}

impl std::fmt::Display for StatementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            StatementType::Query => "query",
            StatementType::Insert => "insert",
            StatementType::Delete => "delete",
            StatementType::Create => "create",
            StatementType::Drop => "drop",
            StatementType::Construct => "construct",
            StatementType::Deconstruct => "deconstruct",
            StatementType::Show => "show",
        };
        write!(f, "{name}")
    }
}

/// One line of the WHERE pattern: `S P O` with optional bindings and
/// aliases for every position and component.
///
/// A position is *concrete* when its `s`/`p`/`o` field is set. `p_id` and
/// `o_id` name a predicate without fixing its anchor (anchor-range and
/// anchor-binding syntax); they are filters, not bindings. The
/// `p_temporal`/`o_temporal` flags record that the position used temporal
/// syntax and must therefore match temporal predicates only.
#[derive(Debug, Clone, Default, PartialEq)]
#[allow(clippy::struct_excessive_bools)]
pub struct GraphClause {
    /// Concrete subject.
    pub s: Option<Node>,
    /// Subject binding (`?s`).
    pub s_binding: Option<String>,
    /// Subject alias (`/u<joe> as ?s`).
    pub s_alias: Option<String>,
    /// Alias exposing the subject's kind.
    pub s_type_alias: Option<String>,
    /// Alias exposing the subject's id (`?s ID ?id`).
    pub s_id_alias: Option<String>,

    /// Concrete predicate, anchor included.
    pub p: Option<Predicate>,
    /// Predicate name filter when the anchor is ranged or bound.
    pub p_id: Option<String>,
    /// Predicate binding.
    pub p_binding: Option<String>,
    /// Predicate alias.
    pub p_alias: Option<String>,
    /// Alias exposing the predicate name.
    pub p_id_alias: Option<String>,
    /// Binding receiving the predicate anchor (`"p"@[?t]`).
    pub p_anchor_binding: Option<String>,
    /// Alias exposing the predicate anchor.
    pub p_anchor_alias: Option<String>,
    /// Inclusive lower anchor bound (`"p"@[lo,hi]`).
    pub p_lower_bound: Option<Anchor>,
    /// Inclusive upper anchor bound.
    pub p_upper_bound: Option<Anchor>,
    /// Alias exposing the lower anchor bound.
    pub p_lower_bound_alias: Option<String>,
    /// Alias exposing the upper anchor bound.
    pub p_upper_bound_alias: Option<String>,
    /// The predicate position used temporal syntax.
    pub p_temporal: bool,

    /// Concrete object.
    pub o: Option<Object>,
    /// Predicate-object name filter when the anchor is ranged or bound.
    pub o_id: Option<String>,
    /// Object binding.
    pub o_binding: Option<String>,
    /// Object alias.
    pub o_alias: Option<String>,
    /// Alias exposing a literal object's type or a node object's kind.
    pub o_type_alias: Option<String>,
    /// Alias exposing a node or predicate object's id.
    pub o_id_alias: Option<String>,
    /// Binding receiving a predicate object's anchor.
    pub o_anchor_binding: Option<String>,
    /// Alias exposing a predicate object's anchor.
    pub o_anchor_alias: Option<String>,
    /// Inclusive lower anchor bound on predicate objects.
    pub o_lower_bound: Option<Anchor>,
    /// Inclusive upper anchor bound on predicate objects.
    pub o_upper_bound: Option<Anchor>,
    /// Alias exposing the object-side lower bound.
    pub o_lower_bound_alias: Option<String>,
    /// Alias exposing the object-side upper bound.
    pub o_upper_bound_alias: Option<String>,
    /// The object position used temporal syntax.
    pub o_temporal: bool,
}

impl GraphClause {
    /// Number of concrete positions among `{s, p, o}`, 0 to 3. The
    /// planner's primary sort key: more specific clauses run first.
    #[must_use]
    pub fn specificity(&self) -> usize {
        usize::from(self.s.is_some()) + usize::from(self.p.is_some()) + usize::from(self.o.is_some())
    }

    /// True when every field still has its default value.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// The binding and alias names this clause sets, in canonical field
    /// order. `p_id`/`o_id` are names, not bindings, and are excluded.
    #[must_use]
    pub fn bindings(&self) -> Vec<&str> {
        [
            &self.s_binding,
            &self.s_alias,
            &self.s_type_alias,
            &self.s_id_alias,
            &self.p_binding,
            &self.p_alias,
            &self.p_id_alias,
            &self.p_anchor_binding,
            &self.p_anchor_alias,
            &self.p_lower_bound_alias,
            &self.p_upper_bound_alias,
            &self.o_binding,
            &self.o_alias,
            &self.o_type_alias,
            &self.o_id_alias,
            &self.o_anchor_binding,
            &self.o_anchor_alias,
            &self.o_lower_bound_alias,
            &self.o_upper_bound_alias,
        ]
        .into_iter()
        .filter_map(|field| field.as_deref())
        .collect()
    }
}

/// One SELECT item: a source binding, an optional alias, and an optional
/// aggregator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Projection {
    /// Source binding the projection reads.
    pub binding: String,
    /// Output alias (`?x as ?y`).
    pub alias: Option<String>,
    /// Aggregator (`count(?x)`, `count(distinct ?x)`, `sum(?x)`).
    pub aggregator: Option<AggregateFunction>,
}

impl Projection {
    /// True when every field still has its default value.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// The exposed output name: the alias if present, else the source
    /// binding.
    #[must_use]
    pub fn output_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.binding)
    }
}

/// One reification statement inside a construct clause: a `P O` pair
/// attached to the blank node reifying the clause's base triple.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReificationClause {
    /// Concrete predicate.
    pub p: Option<Predicate>,
    /// Predicate name when the anchor comes from a binding.
    pub p_id: Option<String>,
    /// Predicate binding.
    pub p_binding: Option<String>,
    /// Binding providing the predicate anchor.
    pub p_anchor_binding: Option<String>,
    /// Concrete object.
    pub o: Option<Object>,
    /// Predicate-object name when its anchor comes from a binding.
    pub o_id: Option<String>,
    /// Object binding.
    pub o_binding: Option<String>,
    /// Binding providing a predicate object's anchor.
    pub o_anchor_binding: Option<String>,
}

impl ReificationClause {
    /// True when every field still has its default value.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// One CONSTRUCT/DECONSTRUCT statement: an `S P O` template plus optional
/// reification statements about the emitted triple.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConstructClause {
    /// Concrete subject.
    pub s: Option<Node>,
    /// Subject binding.
    pub s_binding: Option<String>,
    /// Concrete predicate.
    pub p: Option<Predicate>,
    /// Predicate name when the anchor comes from a binding.
    pub p_id: Option<String>,
    /// Predicate binding.
    pub p_binding: Option<String>,
    /// Binding providing the predicate anchor.
    pub p_anchor_binding: Option<String>,
    /// Concrete object.
    pub o: Option<Object>,
    /// Predicate-object name when its anchor comes from a binding.
    pub o_id: Option<String>,
    /// Object binding.
    pub o_binding: Option<String>,
    /// Binding providing a predicate object's anchor.
    pub o_anchor_binding: Option<String>,

    reification_clauses: Vec<ReificationClause>,
    working_reification: Option<ReificationClause>,
}

impl ConstructClause {
    /// True when no position is set and no reification clause was
    /// promoted. An initialized-but-empty reification scratch does not
    /// count: emptiness is semantic, not structural.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.s.is_none()
            && self.s_binding.is_none()
            && self.p.is_none()
            && self.p_id.is_none()
            && self.p_binding.is_none()
            && self.p_anchor_binding.is_none()
            && self.o.is_none()
            && self.o_id.is_none()
            && self.o_binding.is_none()
            && self.o_anchor_binding.is_none()
            && self.reification_clauses.is_empty()
    }

    /// Installs a fresh scratch reification clause.
    pub fn reset_working_reification_clause(&mut self) {
        self.working_reification = Some(ReificationClause::default());
    }

    /// Returns the scratch reification clause, if initialized.
    pub fn working_reification_clause(&mut self) -> Option<&mut ReificationClause> {
        self.working_reification.as_mut()
    }

    /// Promotes a non-empty scratch reification clause; empty scratch is
    /// discarded. The scratch resets either way.
    pub fn add_working_reification_clause(&mut self) {
        if let Some(clause) = self.working_reification.take() {
            if !clause.is_empty() {
                self.reification_clauses.push(clause);
            }
        }
        self.working_reification = Some(ReificationClause::default());
    }

    /// Returns the promoted reification clauses.
    #[must_use]
    pub fn reification_clauses(&self) -> &[ReificationClause] {
        &self.reification_clauses
    }

    /// Binding names used as inputs, in canonical field order: the outer
    /// clause's `*_binding`/`*_anchor_binding` fields, then those of each
    /// reification clause.
    fn input_bindings(&self) -> Vec<&str> {
        let mut out: Vec<&str> = [
            &self.s_binding,
            &self.p_binding,
            &self.p_anchor_binding,
            &self.o_binding,
            &self.o_anchor_binding,
        ]
        .into_iter()
        .filter_map(|field| field.as_deref())
        .collect();
        for reification in &self.reification_clauses {
            out.extend(
                [
                    &reification.p_binding,
                    &reification.p_anchor_binding,
                    &reification.o_binding,
                    &reification.o_anchor_binding,
                ]
                .into_iter()
                .filter_map(|field| field.as_deref()),
            );
        }
        out
    }
}

/// The semantic statement a parse produces and a planner consumes.
#[derive(Debug, Clone, Default)]
pub struct Statement {
    kind: Option<StatementType>,
    graphs: Vec<String>,
    output_graphs: Vec<String>,
    data: Vec<Triple>,
    pattern: Vec<GraphClause>,
    working_clause: Option<GraphClause>,
    projection: Vec<Projection>,
    working_projection: Option<Projection>,
    construct_clauses: Vec<ConstructClause>,
    working_construct: Option<ConstructClause>,
    group_by: Vec<String>,
    order_by: Vec<SortKey>,
    having: Option<Expr>,
    limit: Option<u64>,
    lower_anchor: Option<Anchor>,
    upper_anchor: Option<Anchor>,
}

impl Statement {
    /// Creates an empty statement.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the statement kind. A statement has exactly one kind once set.
    pub fn bind_type(&mut self, kind: StatementType) {
        self.kind = Some(kind);
    }

    /// Returns the statement kind, if bound.
    #[must_use]
    pub fn kind(&self) -> Option<StatementType> {
        self.kind
    }

    /// Appends a source graph identifier.
    pub fn add_graph(&mut self, name: impl Into<String>) {
        self.graphs.push(name.into());
    }

    /// Returns the source graph identifiers, in order.
    #[must_use]
    pub fn graph_names(&self) -> &[String] {
        &self.graphs
    }

    /// Appends a destination graph for CONSTRUCT/DECONSTRUCT.
    pub fn add_output_graph(&mut self, name: impl Into<String>) {
        self.output_graphs.push(name.into());
    }

    /// Returns the destination graph identifiers, in order.
    #[must_use]
    pub fn output_graph_names(&self) -> &[String] {
        &self.output_graphs
    }

    /// Appends a literal data triple for INSERT/DELETE.
    pub fn add_data(&mut self, triple: Triple) {
        self.data.push(triple);
    }

    /// Returns the literal data triples, in order.
    #[must_use]
    pub fn data(&self) -> &[Triple] {
        &self.data
    }

    // ==================== Graph pattern lifecycle ====================

    /// Installs a fresh scratch graph clause.
    pub fn reset_working_graph_clause(&mut self) {
        self.working_clause = Some(GraphClause::default());
    }

    /// Returns the scratch graph clause, if initialized.
    pub fn working_clause(&mut self) -> Option<&mut GraphClause> {
        self.working_clause.as_mut()
    }

    /// Promotes a non-empty scratch clause into the pattern; an empty
    /// scratch is discarded. The scratch resets either way.
    pub fn add_working_graph_clause(&mut self) {
        if let Some(clause) = self.working_clause.take() {
            if !clause.is_empty() {
                self.pattern.push(clause);
            }
        }
        self.working_clause = Some(GraphClause::default());
    }

    /// Returns the finalized pattern, in insertion order.
    #[must_use]
    pub fn graph_pattern_clauses(&self) -> &[GraphClause] {
        &self.pattern
    }

    /// Returns the pattern ordered by descending specificity, stable
    /// within equal specificity.
    #[must_use]
    pub fn sorted_graph_pattern_clauses(&self) -> Vec<GraphClause> {
        let mut clauses = self.pattern.clone();
        clauses.sort_by_key(|c| std::cmp::Reverse(c.specificity()));
        clauses
    }

    // ==================== Projection lifecycle ====================

    /// Installs a fresh scratch projection.
    pub fn reset_projection(&mut self) {
        self.working_projection = Some(Projection::default());
    }

    /// Returns the scratch projection, if initialized.
    pub fn working_projection(&mut self) -> Option<&mut Projection> {
        self.working_projection.as_mut()
    }

    /// Promotes a non-empty scratch projection; empty scratch is
    /// discarded. The scratch resets either way.
    pub fn add_working_projection(&mut self) {
        if let Some(projection) = self.working_projection.take() {
            if !projection.is_empty() {
                self.projection.push(projection);
            }
        }
        self.working_projection = Some(Projection::default());
    }

    /// Returns the promoted projections, in order.
    #[must_use]
    pub fn projections(&self) -> &[Projection] {
        &self.projection
    }

    // ==================== Construct lifecycle ====================

    /// Installs a fresh scratch construct clause.
    pub fn reset_working_construct_clause(&mut self) {
        self.working_construct = Some(ConstructClause::default());
    }

    /// Returns the scratch construct clause, if initialized.
    pub fn working_construct_clause(&mut self) -> Option<&mut ConstructClause> {
        self.working_construct.as_mut()
    }

    /// Promotes a non-empty scratch construct clause; empty scratch is
    /// discarded. The scratch resets either way.
    pub fn add_working_construct_clause(&mut self) {
        if let Some(clause) = self.working_construct.take() {
            if !clause.is_empty() {
                self.construct_clauses.push(clause);
            }
        }
        self.working_construct = Some(ConstructClause::default());
    }

    /// Returns the promoted construct clauses, in order.
    #[must_use]
    pub fn construct_clauses(&self) -> &[ConstructClause] {
        &self.construct_clauses
    }

    // ==================== Modifiers ====================

    /// Appends a GROUP BY key.
    pub fn add_group_by(&mut self, binding: impl Into<String>) {
        self.group_by.push(binding.into());
    }

    /// Returns the GROUP BY keys, in order.
    #[must_use]
    pub fn group_by(&self) -> &[String] {
        &self.group_by
    }

    /// Appends an ORDER BY key.
    pub fn add_order_by(&mut self, key: SortKey) {
        self.order_by.push(key);
    }

    /// Returns the ORDER BY keys, in order.
    #[must_use]
    pub fn order_by(&self) -> &[SortKey] {
        &self.order_by
    }

    /// Sets the HAVING predicate.
    pub fn set_having(&mut self, expr: Expr) {
        self.having = Some(expr);
    }

    /// Returns the HAVING predicate, if any.
    #[must_use]
    pub fn having(&self) -> Option<&Expr> {
        self.having.as_ref()
    }

    /// Sets the LIMIT row count.
    pub fn set_limit(&mut self, limit: u64) {
        self.limit = Some(limit);
    }

    /// Returns the LIMIT row count, if any.
    #[must_use]
    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    /// Sets the global `before` window: temporal anchors at or before the
    /// instant.
    pub fn set_before(&mut self, anchor: Anchor) {
        self.upper_anchor = Some(anchor);
    }

    /// Sets the global `after` window: temporal anchors at or after the
    /// instant.
    pub fn set_after(&mut self, anchor: Anchor) {
        self.lower_anchor = Some(anchor);
    }

    /// Sets the global `between` window (inclusive on both ends).
    pub fn set_between(&mut self, lower: Anchor, upper: Anchor) {
        self.lower_anchor = Some(lower);
        self.upper_anchor = Some(upper);
    }

    /// Returns the global temporal window as `(lower, upper)`.
    #[must_use]
    pub fn time_window(&self) -> (Option<Anchor>, Option<Anchor>) {
        (self.lower_anchor, self.upper_anchor)
    }

    // ==================== Binding summaries ====================

    /// Returns each binding name with the number of binding/alias fields
    /// referencing it across all promoted pattern clauses. Shared names
    /// are the planner's join keys.
    #[must_use]
    pub fn bindings_map(&self) -> HashMap<String, usize> {
        let mut map = HashMap::new();
        for clause in &self.pattern {
            for name in clause.bindings() {
                *map.entry(name.to_string()).or_insert(0) += 1;
            }
        }
        map
    }

    /// Ordered input bindings: every projection's source binding, then
    /// every binding the construct clauses consume (outer clause before
    /// its reifications, in order).
    #[must_use]
    pub fn input_bindings(&self) -> Vec<String> {
        let mut out: Vec<String> = self
            .projection
            .iter()
            .filter(|p| !p.binding.is_empty())
            .map(|p| p.binding.clone())
            .collect();
        for clause in &self.construct_clauses {
            out.extend(clause.input_bindings().into_iter().map(String::from));
        }
        out
    }

    /// Ordered output bindings: each projection's alias when present,
    /// else its source binding.
    #[must_use]
    pub fn output_bindings(&self) -> Vec<String> {
        self.projection
            .iter()
            .map(|p| p.output_name().to_string())
            .collect()
    }
}
