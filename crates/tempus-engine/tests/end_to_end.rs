//! End-to-end statement execution against the in-memory backend.
//!
//! These tests drive the semantic IR directly, the way the BQL parser
//! would, then plan and execute against a `MemoryStore`.

use std::sync::Arc;

use anyhow::Result;

use tempus_common::types::{parse_anchor, Literal, Node, Object, Predicate, Triple};
use tempus_common::utils::context::Context;
use tempus_common::utils::error::Error;
use tempus_core::storage::Store;
use tempus_core::table::{AggregateFunction, Cell, SortKey, Table};
use tempus_core::MemoryStore;
use tempus_engine::semantic::{ComparisonOp, Expr, GraphClause, Statement, StatementType};
use tempus_engine::Planner;

const FAMILY_TRIPLES: &str = r#"/u<joe> "parent_of"@[] /u<mary>
/u<joe> "parent_of"@[] /u<peter>
/u<peter> "parent_of"@[] /u<john>
/u<peter> "parent_of"@[] /u<eve>"#;

const PURCHASE_TRIPLES: &str = r#"/u<peter> "bought"@[2016-01-01T00:00:00-08:00] /c<mini>
/u<peter> "bought"@[2016-02-01T00:00:00-08:00] /c<model s>
/u<peter> "bought"@[2016-03-01T00:00:00-08:00] /c<model x>
/u<peter> "bought"@[2016-04-01T00:00:00-08:00] /c<model y>"#;

const EVENT_TRIPLES: &str = r#"/l<barcelona> "predicate"@[] "turned"@[2016-01-01T00:00:00-08:00]
/l<barcelona> "predicate"@[] "turned"@[2016-02-01T00:00:00-08:00]
/l<barcelona> "predicate"@[] "turned"@[2016-03-01T00:00:00-08:00]
/l<barcelona> "predicate"@[] "turned"@[2016-04-01T00:00:00-08:00]"#;

const REIFICATION_TRIPLES: &str = r#"/_<c175b457> "_predicate"@[] "/some/immutable/id"@[]
/_<c175b457> "_subject"@[] /aid</some/subject/id>
/_<c175b457> "_object"@[] /aid</some/object/id>
/_<cd8bae87> "_object"@[2017-05-23T16:41:12.187373-07:00] /aid</some/object/id>
/_<cd8bae87> "_predicate"@[2017-05-23T16:41:12.187373-07:00] "/some/temporal/id"@[2017-05-23T16:41:12.187373-07:00]
/_<cd8bae87> "_subject"@[2017-05-23T16:41:12.187373-07:00] /aid</some/subject/id>
/aid</some/subject/id> "/some/temporal/id"@[2017-05-23T16:41:12.187373-07:00] /aid</some/object/id>
/aid</some/subject/id> "/some/immutable/id"@[] /aid</some/object/id>"#;

fn store_with_graph(name: &str, triples: &str) -> Result<Arc<dyn Store>> {
    let ctx = Context::new();
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let graph = store.new_graph(&ctx, name)?;
    let parsed: Vec<Triple> = triples
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(Triple::parse)
        .collect::<tempus_common::Result<_>>()?;
    graph.add_triples(&ctx, &parsed)?;
    Ok(store)
}

fn run(store: &Arc<dyn Store>, stm: &Statement) -> tempus_common::Result<Table> {
    let ctx = Context::new();
    Planner::new(Arc::clone(store)).plan(&ctx, stm)?.execute(&ctx)
}

/// Starts a query statement with plain projections and an initialized
/// pattern scratch.
fn new_query(graph: &str, projections: &[&str]) -> Statement {
    let mut stm = Statement::new();
    stm.bind_type(StatementType::Query);
    stm.add_graph(graph);
    stm.reset_projection();
    for binding in projections {
        stm.working_projection().unwrap().binding = (*binding).to_string();
        stm.add_working_projection();
    }
    stm.reset_working_graph_clause();
    stm
}

fn add_clause(stm: &mut Statement, configure: impl FnOnce(&mut GraphClause)) {
    configure(stm.working_clause().unwrap());
    stm.add_working_graph_clause();
}

fn node(text: &str) -> Node {
    Node::parse(text).unwrap()
}

fn immutable(id: &str) -> Predicate {
    Predicate::immutable(id)
}

fn scan_all(stm: &mut Statement) {
    add_clause(stm, |c| {
        c.s_binding = Some("?s".to_string());
        c.p_binding = Some("?p".to_string());
        c.o_binding = Some("?o".to_string());
    });
}

#[test]
fn create_insert_scan() -> Result<()> {
    let ctx = Context::new();
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let mut planner = Planner::new(Arc::clone(&store));

    let mut create = Statement::new();
    create.bind_type(StatementType::Create);
    create.add_graph("?a");
    planner.plan(&ctx, &create)?.execute(&ctx)?;

    let mut insert = Statement::new();
    insert.bind_type(StatementType::Insert);
    insert.add_graph("?a");
    for line in [
        r#"/_<foo> "bar"@[] /_<foo>"#,
        r#"/_<foo> "bar"@[] "bar"@[1975-01-01T00:01:01.999999999Z]"#,
        r#"/_<foo> "bar"@[] "yeah"^^type:text"#,
    ] {
        insert.add_data(Triple::parse(line)?);
    }
    planner.plan(&ctx, &insert)?.execute(&ctx)?;

    let mut query = new_query("?a", &["?s", "?p", "?o"]);
    scan_all(&mut query);
    let table = run(&store, &query)?;
    assert_eq!(table.bindings().len(), 3);
    assert_eq!(table.num_rows(), 3);
    Ok(())
}

#[test]
fn delete_empties_graph() -> Result<()> {
    let ctx = Context::new();
    let store = store_with_graph("?a", FAMILY_TRIPLES)?;
    let mut planner = Planner::new(Arc::clone(&store));

    let mut delete = Statement::new();
    delete.bind_type(StatementType::Delete);
    delete.add_graph("?a");
    for line in FAMILY_TRIPLES.lines() {
        delete.add_data(Triple::parse(line)?);
    }
    planner.plan(&ctx, &delete)?.execute(&ctx)?;

    let mut query = new_query("?a", &["?s", "?p", "?o"]);
    scan_all(&mut query);
    let table = run(&store, &query)?;
    assert_eq!(table.num_rows(), 0);
    Ok(())
}

#[test]
fn clause_chaining_joins_on_shared_binding() -> Result<()> {
    let store = store_with_graph("?test", FAMILY_TRIPLES)?;

    // select ?o from ?test where {/u<joe> "parent_of"@[] ?o. ?o "parent_of"@[] /u<john>}
    let mut query = new_query("?test", &["?o"]);
    add_clause(&mut query, |c| {
        c.s = Some(node("/u<joe>"));
        c.p = Some(immutable("parent_of"));
        c.o_binding = Some("?o".to_string());
    });
    add_clause(&mut query, |c| {
        c.s_binding = Some("?o".to_string());
        c.p = Some(immutable("parent_of"));
        c.o = Some(Object::Node(node("/u<john>")));
    });

    let table = run(&store, &query)?;
    assert_eq!(table.bindings(), &["?o".to_string()]);
    assert_eq!(table.num_rows(), 1);
    assert_eq!(table.rows()[0]["?o"], Cell::Node(node("/u<peter>")));
    Ok(())
}

#[test]
fn fully_concrete_clause_with_aliases() -> Result<()> {
    let store = store_with_graph("?test", FAMILY_TRIPLES)?;

    // {/u<joe> as ?s "parent_of"@[] as ?p /u<mary> as ?o} matches once.
    let mut query = new_query("?test", &["?s", "?p", "?o"]);
    add_clause(&mut query, |c| {
        c.s = Some(node("/u<joe>"));
        c.s_alias = Some("?s".to_string());
        c.p = Some(immutable("parent_of"));
        c.p_alias = Some("?p".to_string());
        c.o = Some(Object::Node(node("/u<mary>")));
        c.o_alias = Some("?o".to_string());
    });
    let table = run(&store, &query)?;
    assert_eq!(table.bindings().len(), 3);
    assert_eq!(table.num_rows(), 1);

    // The same clause with an unknown subject matches nothing but keeps
    // its binding columns.
    let mut query = new_query("?test", &["?s", "?p", "?o"]);
    add_clause(&mut query, |c| {
        c.s = Some(node("/u<unknown>"));
        c.s_alias = Some("?s".to_string());
        c.p = Some(immutable("parent_of"));
        c.p_alias = Some("?p".to_string());
        c.o = Some(Object::Node(node("/u<mary>")));
        c.o_alias = Some("?o".to_string());
    });
    let table = run(&store, &query)?;
    assert_eq!(table.bindings().len(), 3);
    assert_eq!(table.num_rows(), 0);
    Ok(())
}

#[test]
fn disconnected_clauses_cross_product() -> Result<()> {
    let store = store_with_graph("?test", FAMILY_TRIPLES)?;

    let mut query = new_query("?test", &["?s", "?p", "?o", "?k", "?l", "?m"]);
    scan_all(&mut query);
    add_clause(&mut query, |c| {
        c.s_binding = Some("?k".to_string());
        c.p_binding = Some("?l".to_string());
        c.o_binding = Some("?m".to_string());
    });
    let table = run(&store, &query)?;
    assert_eq!(table.bindings().len(), 6);
    assert_eq!(table.num_rows(), 16);
    Ok(())
}

#[test]
fn grandparent_aggregation() -> Result<()> {
    let store = store_with_graph("?test", FAMILY_TRIPLES)?;

    // select ?grandparent, count(?name) as ?grandchildren
    // where {/u<joe> as ?grandparent "parent_of"@[] ?off .
    //        ?off "parent_of"@[] ?name}
    // group by ?grandparent
    let mut query = new_query("?test", &[]);
    query.working_projection().unwrap().binding = "?grandparent".to_string();
    query.add_working_projection();
    {
        let p = query.working_projection().unwrap();
        p.binding = "?name".to_string();
        p.alias = Some("?grandchildren".to_string());
        p.aggregator = Some(AggregateFunction::Count { distinct: false });
    }
    query.add_working_projection();
    query.add_group_by("?grandparent");

    add_clause(&mut query, |c| {
        c.s = Some(node("/u<joe>"));
        c.s_alias = Some("?grandparent".to_string());
        c.p = Some(immutable("parent_of"));
        c.o_binding = Some("?off".to_string());
    });
    add_clause(&mut query, |c| {
        c.s_binding = Some("?off".to_string());
        c.p = Some(immutable("parent_of"));
        c.o_binding = Some("?name".to_string());
    });

    let table = run(&store, &query)?;
    assert_eq!(
        table.bindings(),
        &["?grandparent".to_string(), "?grandchildren".to_string()]
    );
    assert_eq!(table.num_rows(), 1);
    assert_eq!(
        table.rows()[0]["?grandchildren"],
        Cell::Literal(Literal::Int64(2))
    );
    Ok(())
}

#[test]
fn grandparent_aggregation_through_id_alias() -> Result<()> {
    let store = store_with_graph("?test", FAMILY_TRIPLES)?;

    // select ?grandparent, count(?grandparent) as ?number_of_grandchildren
    // where {?gp ID ?grandparent "parent_of"@[] ?c . ?c "parent_of"@[] ?gc}
    // group by ?grandparent
    let mut query = new_query("?test", &[]);
    query.working_projection().unwrap().binding = "?grandparent".to_string();
    query.add_working_projection();
    {
        let p = query.working_projection().unwrap();
        p.binding = "?grandparent".to_string();
        p.alias = Some("?number_of_grandchildren".to_string());
        p.aggregator = Some(AggregateFunction::Count { distinct: false });
    }
    query.add_working_projection();
    query.add_group_by("?grandparent");

    add_clause(&mut query, |c| {
        c.s_binding = Some("?gp".to_string());
        c.s_id_alias = Some("?grandparent".to_string());
        c.p = Some(immutable("parent_of"));
        c.o_binding = Some("?c".to_string());
    });
    add_clause(&mut query, |c| {
        c.s_binding = Some("?c".to_string());
        c.p = Some(immutable("parent_of"));
        c.o_binding = Some("?gc".to_string());
    });

    let table = run(&store, &query)?;
    assert_eq!(table.bindings().len(), 2);
    assert_eq!(table.num_rows(), 1);
    assert_eq!(table.rows()[0]["?grandparent"], Cell::Text("joe".to_string()));
    assert_eq!(
        table.rows()[0]["?number_of_grandchildren"],
        Cell::Literal(Literal::Int64(2))
    );
    Ok(())
}

/// Builds the `{/u<peter> "bought"@[lo,hi] ?o}` query.
fn bought_query(lower: Option<&str>, upper: Option<&str>) -> Statement {
    let mut query = new_query("?test", &["?o"]);
    let lower = lower.map(|t| parse_anchor(t).unwrap());
    let upper = upper.map(|t| parse_anchor(t).unwrap());
    add_clause(&mut query, move |c| {
        c.s = Some(node("/u<peter>"));
        c.p_id = Some("bought".to_string());
        c.p_temporal = true;
        c.p_lower_bound = lower;
        c.p_upper_bound = upper;
        c.o_binding = Some("?o".to_string());
    });
    query
}

#[test]
fn temporal_bounds_on_predicate() -> Result<()> {
    let store = store_with_graph("?test", PURCHASE_TRIPLES)?;

    // Unbounded range matches all four purchases.
    let table = run(&store, &bought_query(None, None))?;
    assert_eq!(table.num_rows(), 4);

    let table = run(
        &store,
        &bought_query(Some("2015-01-01T00:00:00-08:00"), Some("2017-01-01T00:00:00-08:00")),
    )?;
    assert_eq!(table.num_rows(), 4);

    let table = run(&store, &bought_query(None, Some("2015-01-01T00:00:00-08:00")))?;
    assert_eq!(table.num_rows(), 0);

    let table = run(&store, &bought_query(Some("2017-01-01T00:00:00-08:00"), None))?;
    assert_eq!(table.num_rows(), 0);
    Ok(())
}

#[test]
fn temporal_bounds_on_predicate_object() -> Result<()> {
    let store = store_with_graph("?test", EVENT_TRIPLES)?;

    // {/l<barcelona> "predicate"@[] "turned"@[lo,hi] as ?o}
    let turned = |lower: Option<&str>, upper: Option<&str>| {
        let mut query = new_query("?test", &["?o"]);
        let lower = lower.map(|t| parse_anchor(t).unwrap());
        let upper = upper.map(|t| parse_anchor(t).unwrap());
        add_clause(&mut query, move |c| {
            c.s = Some(node("/l<barcelona>"));
            c.p = Some(immutable("predicate"));
            c.o_id = Some("turned".to_string());
            c.o_temporal = true;
            c.o_lower_bound = lower;
            c.o_upper_bound = upper;
            c.o_alias = Some("?o".to_string());
        });
        query
    };

    assert_eq!(run(&store, &turned(None, None))?.num_rows(), 4);
    assert_eq!(
        run(
            &store,
            &turned(Some("2015-01-01T00:00:00-08:00"), Some("2017-01-01T00:00:00-08:00"))
        )?
        .num_rows(),
        4
    );
    assert_eq!(
        run(&store, &turned(None, Some("2015-01-01T00:00:00-08:00")))?.num_rows(),
        0
    );
    assert_eq!(
        run(&store, &turned(Some("2017-01-01T00:00:00-08:00"), None))?.num_rows(),
        0
    );
    Ok(())
}

#[test]
fn statement_window_intersects_clause_window() -> Result<()> {
    let store = store_with_graph("?test", PURCHASE_TRIPLES)?;

    // between 2014 and 2017 intersected with [2015,2017] keeps all rows.
    let mut query = bought_query(
        Some("2015-01-01T00:00:00-08:00"),
        Some("2017-01-01T00:00:00-08:00"),
    );
    query.set_between(
        parse_anchor("2014-01-01T00:00:00-08:00")?,
        parse_anchor("2017-01-01T00:00:00-08:00")?,
    );
    assert_eq!(run(&store, &query)?.num_rows(), 4);

    // before 2014 is disjoint from [2015,2017]: the plan is rejected.
    let mut query = bought_query(
        Some("2015-01-01T00:00:00-08:00"),
        Some("2017-01-01T00:00:00-08:00"),
    );
    query.set_before(parse_anchor("2014-01-01T00:00:00-08:00")?);
    let ctx = Context::new();
    let err = Planner::new(Arc::clone(&store)).plan(&ctx, &query);
    assert!(matches!(err, Err(Error::Semantic(_))));

    // A statement window alone prefilters temporal predicates.
    let mut query = bought_query(None, None);
    query.set_before(parse_anchor("2014-01-01T00:00:00-08:00")?);
    assert_eq!(run(&store, &query)?.num_rows(), 0);
    Ok(())
}

#[test]
fn statement_window_ignores_immutable_predicates() -> Result<()> {
    let store = store_with_graph("?test", FAMILY_TRIPLES)?;

    let mut query = new_query("?test", &["?o"]);
    add_clause(&mut query, |c| {
        c.s = Some(node("/u<joe>"));
        c.p = Some(immutable("parent_of"));
        c.o_binding = Some("?o".to_string());
    });
    query.set_before(parse_anchor("2014-01-01T00:00:00-08:00")?);
    assert_eq!(run(&store, &query)?.num_rows(), 2);
    Ok(())
}

#[test]
fn anchor_binding_matches_temporal_only() -> Result<()> {
    let triples = r#"/room<Hallway> "connects_to"@[] /room<Kitchen>
/item/book<000> "in"@[2016-04-10T04:21:00.000000000Z] /room<Hallway>
/item/book<000> "in"@[2016-04-10T04:23:00.000000000Z] /room<Kitchen>
/item/book<000> "in"@[2016-04-10T04:25:00.000000000Z] /room<Bedroom>"#;
    let store = store_with_graph("?test", triples)?;

    // select ?item, ?t where {?item "in"@[?t] /room<Bedroom>}
    let mut query = new_query("?test", &["?item", "?t"]);
    add_clause(&mut query, |c| {
        c.s_binding = Some("?item".to_string());
        c.p_id = Some("in".to_string());
        c.p_temporal = true;
        c.p_anchor_binding = Some("?t".to_string());
        c.o = Some(Object::Node(node("/room<Bedroom>")));
    });

    let table = run(&store, &query)?;
    assert_eq!(table.bindings().len(), 2);
    assert_eq!(table.num_rows(), 1);
    assert_eq!(
        table.rows()[0]["?t"],
        Cell::Time(parse_anchor("2016-04-10T04:25:00Z")?)
    );
    Ok(())
}

#[test]
fn reification_resolution() -> Result<()> {
    let store = store_with_graph("?test", REIFICATION_TRIPLES)?;

    // select ?bn, ?p where {
    //   ?bn "_subject"@[,]   /aid</some/subject/id>.
    //   ?bn "_predicate"@[,] ?p .
    //   ?bn "_object"@[,]    /aid</some/object/id> }
    let mut query = new_query("?test", &["?bn", "?p"]);
    add_clause(&mut query, |c| {
        c.s_binding = Some("?bn".to_string());
        c.p_id = Some("_subject".to_string());
        c.p_temporal = true;
        c.o = Some(Object::Node(node("/aid</some/subject/id>")));
    });
    add_clause(&mut query, |c| {
        c.s_binding = Some("?bn".to_string());
        c.p_id = Some("_predicate".to_string());
        c.p_temporal = true;
        c.o_binding = Some("?p".to_string());
    });
    add_clause(&mut query, |c| {
        c.s_binding = Some("?bn".to_string());
        c.p_id = Some("_object".to_string());
        c.p_temporal = true;
        c.o = Some(Object::Node(node("/aid</some/object/id>")));
    });

    let table = run(&store, &query)?;
    assert_eq!(table.bindings().len(), 2);
    assert_eq!(table.num_rows(), 1);
    assert_eq!(table.rows()[0]["?bn"], Cell::Node(node("/_<cd8bae87>")));
    match &table.rows()[0]["?p"] {
        Cell::Predicate(p) => assert_eq!(p.id(), "/some/temporal/id"),
        other => panic!("expected predicate cell, got {other}"),
    }
    Ok(())
}

#[test]
fn having_contradiction_filters_everything() -> Result<()> {
    let store = store_with_graph("?test", FAMILY_TRIPLES)?;

    let mut query = new_query("?test", &["?s", "?p", "?o"]);
    scan_all(&mut query);
    query.set_having(Expr::not(Expr::compare_bindings(ComparisonOp::Eq, "?s", "?s")));
    let table = run(&store, &query)?;
    assert_eq!(table.bindings().len(), 3);
    assert_eq!(table.num_rows(), 0);
    Ok(())
}

#[test]
fn limit_truncates() -> Result<()> {
    let store = store_with_graph("?test", PURCHASE_TRIPLES)?;

    let mut query = bought_query(
        Some("2015-01-01T00:00:00-08:00"),
        Some("2017-01-01T00:00:00-08:00"),
    );
    query.set_limit(2);
    assert_eq!(run(&store, &query)?.num_rows(), 2);
    Ok(())
}

#[test]
fn order_by_sorts_rows() -> Result<()> {
    let store = store_with_graph("?test", PURCHASE_TRIPLES)?;

    let mut query = bought_query(None, None);
    query.add_order_by(SortKey::asc("?o"));
    let table = run(&store, &query)?;
    let ids: Vec<String> = table
        .rows()
        .iter()
        .map(|r| match &r["?o"] {
            Cell::Node(n) => n.id().to_string(),
            other => panic!("expected node, got {other}"),
        })
        .collect();
    assert_eq!(ids, ["mini", "model s", "model x", "model y"]);
    Ok(())
}

#[test]
fn projection_aliases_rename_columns() -> Result<()> {
    let store = store_with_graph("?test", FAMILY_TRIPLES)?;

    let mut query = new_query("?test", &[]);
    for (binding, alias) in [("?s", "?s1"), ("?p", "?p1"), ("?o", "?o1")] {
        let p = query.working_projection().unwrap();
        p.binding = binding.to_string();
        p.alias = Some(alias.to_string());
        query.add_working_projection();
    }
    scan_all(&mut query);
    let table = run(&store, &query)?;
    assert_eq!(
        table.bindings(),
        &["?s1".to_string(), "?p1".to_string(), "?o1".to_string()]
    );
    assert_eq!(table.num_rows(), 4);
    Ok(())
}

#[test]
fn unbound_projection_is_rejected_at_plan_time() -> Result<()> {
    let store = store_with_graph("?test", FAMILY_TRIPLES)?;

    let mut query = new_query("?test", &["?nope"]);
    scan_all(&mut query);
    let ctx = Context::new();
    let err = Planner::new(Arc::clone(&store)).plan(&ctx, &query);
    assert!(matches!(err, Err(Error::Semantic(_))));
    Ok(())
}

#[test]
fn sum_over_statically_non_numeric_binding_is_rejected_at_plan_time() -> Result<()> {
    let store = store_with_graph("?test", FAMILY_TRIPLES)?;

    // ?s is only ever a subject node: no data could make sum(?s) valid.
    let mut query = new_query("?test", &[]);
    {
        let p = query.working_projection().unwrap();
        p.binding = "?s".to_string();
        p.alias = Some("?total".to_string());
        p.aggregator = Some(AggregateFunction::Sum);
    }
    query.add_working_projection();
    scan_all(&mut query);

    let ctx = Context::new();
    let err = Planner::new(Arc::clone(&store)).plan(&ctx, &query);
    assert!(matches!(err, Err(Error::Semantic(_))));
    Ok(())
}

#[test]
fn sum_over_non_numeric_object_fails_at_bind_time() -> Result<()> {
    let store = store_with_graph("?test", FAMILY_TRIPLES)?;

    // ?o is an object binding, so its literal type is only known once
    // values are bound; here every object turns out to be a node.
    let mut query = new_query("?test", &[]);
    {
        let p = query.working_projection().unwrap();
        p.binding = "?o".to_string();
        p.alias = Some("?total".to_string());
        p.aggregator = Some(AggregateFunction::Sum);
    }
    query.add_working_projection();
    scan_all(&mut query);

    let ctx = Context::new();
    let mut plan = Planner::new(Arc::clone(&store)).plan(&ctx, &query)?;
    assert!(matches!(plan.execute(&ctx), Err(Error::Semantic(_))));
    Ok(())
}

#[test]
fn construct_and_deconstruct_round_trip() -> Result<()> {
    let ctx = Context::new();
    let store = store_with_graph("?test", FAMILY_TRIPLES)?;
    store.new_graph(&ctx, "?dest")?;

    // construct {?o "child_of"@[] ?s} into ?dest
    // from ?test where {?s "parent_of"@[] ?o}
    let mut construct = Statement::new();
    construct.bind_type(StatementType::Construct);
    construct.add_graph("?test");
    construct.add_output_graph("?dest");
    construct.reset_working_graph_clause();
    add_clause(&mut construct, |c| {
        c.s_binding = Some("?s".to_string());
        c.p = Some(immutable("parent_of"));
        c.o_binding = Some("?o".to_string());
    });
    construct.reset_working_construct_clause();
    {
        let clause = construct.working_construct_clause().unwrap();
        clause.s_binding = Some("?o".to_string());
        clause.p = Some(immutable("child_of"));
        clause.o_binding = Some("?s".to_string());
    }
    construct.add_working_construct_clause();

    run(&store, &construct)?;

    let mut scan = new_query("?dest", &["?s", "?p", "?o"]);
    scan_all(&mut scan);
    assert_eq!(run(&store, &scan)?.num_rows(), 4);

    // The same statement as a deconstruct removes what it constructed.
    let mut deconstruct = construct.clone();
    deconstruct.bind_type(StatementType::Deconstruct);
    run(&store, &deconstruct)?;

    let mut scan = new_query("?dest", &["?s", "?p", "?o"]);
    scan_all(&mut scan);
    assert_eq!(run(&store, &scan)?.num_rows(), 0);
    Ok(())
}

#[test]
fn construct_with_reification_emits_reified_triples() -> Result<()> {
    let ctx = Context::new();
    let store = store_with_graph("?test", PURCHASE_TRIPLES)?;
    store.new_graph(&ctx, "?dest")?;

    // construct {?s "acquired"@[?t] ?o . "_source"@[] /g<test>}
    // for a single matched purchase.
    let mut construct = Statement::new();
    construct.bind_type(StatementType::Construct);
    construct.add_graph("?test");
    construct.add_output_graph("?dest");
    construct.reset_working_graph_clause();
    add_clause(&mut construct, |c| {
        c.s_binding = Some("?s".to_string());
        c.p_id = Some("bought".to_string());
        c.p_temporal = true;
        c.p_anchor_binding = Some("?t".to_string());
        c.o = Some(Object::Node(node("/c<mini>")));
        c.o_alias = Some("?o".to_string());
    });
    construct.reset_working_construct_clause();
    {
        let clause = construct.working_construct_clause().unwrap();
        clause.s_binding = Some("?s".to_string());
        clause.p_id = Some("acquired".to_string());
        clause.p_anchor_binding = Some("?t".to_string());
        clause.o_binding = Some("?o".to_string());
        clause.reset_working_reification_clause();
        {
            let reification = clause.working_reification_clause().unwrap();
            reification.p = Some(immutable("_source"));
            reification.o = Some(Object::Node(node("/g<test>")));
        }
        clause.add_working_reification_clause();
    }
    construct.add_working_construct_clause();

    run(&store, &construct)?;

    // One matched row: the base triple, its three reification triples,
    // and the extra _source statement.
    let mut scan = new_query("?dest", &["?s", "?p", "?o"]);
    scan_all(&mut scan);
    assert_eq!(run(&store, &scan)?.num_rows(), 5);

    // The _source statement hangs off a blank node.
    let mut source = new_query("?dest", &["?bn"]);
    add_clause(&mut source, |c| {
        c.s_binding = Some("?bn".to_string());
        c.p = Some(immutable("_source"));
        c.o = Some(Object::Node(node("/g<test>")));
    });
    let table = run(&store, &source)?;
    assert_eq!(table.num_rows(), 1);
    match &table.rows()[0]["?bn"] {
        Cell::Node(n) => assert!(n.is_blank()),
        other => panic!("expected node cell, got {other}"),
    }
    Ok(())
}

#[test]
fn chunked_execution_matches_batch_execution() -> Result<()> {
    let store = store_with_graph("?test", FAMILY_TRIPLES)?;

    let mut query = new_query("?test", &["?o"]);
    add_clause(&mut query, |c| {
        c.s = Some(node("/u<joe>"));
        c.p = Some(immutable("parent_of"));
        c.o_binding = Some("?o".to_string());
    });
    add_clause(&mut query, |c| {
        c.s_binding = Some("?o".to_string());
        c.p = Some(immutable("parent_of"));
        c.o = Some(Object::Node(node("/u<john>")));
    });

    let ctx = Context::new();
    let batch = Planner::new(Arc::clone(&store))
        .plan(&ctx, &query)?
        .execute(&ctx)?;
    let chunked = Planner::new(Arc::clone(&store))
        .with_chunk_size(1)
        .plan(&ctx, &query)?
        .execute(&ctx)?;
    assert_eq!(batch.num_rows(), chunked.num_rows());
    assert_eq!(batch.bindings(), chunked.bindings());
    Ok(())
}

#[test]
fn canceled_context_aborts_execution() -> Result<()> {
    let store = store_with_graph("?test", FAMILY_TRIPLES)?;

    let mut query = new_query("?test", &["?s", "?p", "?o"]);
    scan_all(&mut query);

    let ctx = Context::new();
    let mut plan = Planner::new(Arc::clone(&store)).plan(&ctx, &query)?;
    ctx.cancel();
    assert!(matches!(plan.execute(&ctx), Err(Error::Canceled)));
    Ok(())
}
