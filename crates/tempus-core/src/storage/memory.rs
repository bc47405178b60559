//! In-memory storage backend.
//!
//! Each graph keeps its triples keyed by canonical textual form plus six
//! secondary indexes (S, P, O, SP, SO, PO), so every access path the
//! planner selects is an index hit. Mutations take the graph's write lock;
//! lookups snapshot the matching triples under the read lock and stream
//! them without holding it.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use tempus_common::types::{Node, Object, Predicate, Triple};
use tempus_common::utils::context::Context;
use tempus_common::utils::error::{Result, StorageError};

use super::{Graph, Lookup, Store, TripleSink};

/// Separator for composite index keys. Never appears in canonical forms.
const KEY_SEP: char = '\u{0}';

/// An in-memory store of named graphs.
#[derive(Default)]
pub struct MemoryStore {
    graphs: RwLock<HashMap<String, Arc<MemoryGraph>>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn new_graph(&self, ctx: &Context, id: &str) -> Result<Arc<dyn Graph>> {
        ctx.check()?;
        let mut graphs = self.graphs.write();
        if graphs.contains_key(id) {
            return Err(StorageError::GraphAlreadyExists(id.to_string()).into());
        }
        let graph = Arc::new(MemoryGraph::new(id));
        graphs.insert(id.to_string(), Arc::clone(&graph));
        debug!(graph = id, "created graph");
        Ok(graph)
    }

    fn delete_graph(&self, ctx: &Context, id: &str) -> Result<()> {
        ctx.check()?;
        match self.graphs.write().remove(id) {
            Some(_) => {
                debug!(graph = id, "deleted graph");
                Ok(())
            }
            None => Err(StorageError::GraphNotFound(id.to_string()).into()),
        }
    }

    fn graph(&self, ctx: &Context, id: &str) -> Result<Arc<dyn Graph>> {
        ctx.check()?;
        self.graphs
            .read()
            .get(id)
            .cloned()
            .map(|g| g as Arc<dyn Graph>)
            .ok_or_else(|| StorageError::GraphNotFound(id.to_string()).into())
    }

    fn graph_names(&self, ctx: &Context) -> Result<Vec<String>> {
        ctx.check()?;
        let mut names: Vec<String> = self.graphs.read().keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}

/// Triple map plus the six secondary indexes, guarded as one unit.
#[derive(Default)]
struct TripleIndex {
    /// Canonical form -> triple. The canonical form doubles as identity,
    /// which is what gives the graph its set semantics.
    triples: HashMap<String, Triple>,
    by_s: HashMap<String, HashSet<String>>,
    by_p: HashMap<String, HashSet<String>>,
    by_o: HashMap<String, HashSet<String>>,
    by_sp: HashMap<String, HashSet<String>>,
    by_so: HashMap<String, HashSet<String>>,
    by_po: HashMap<String, HashSet<String>>,
}

impl TripleIndex {
    fn insert(&mut self, triple: &Triple) {
        let key = triple.to_string();
        if self.triples.contains_key(&key) {
            return;
        }
        let (s, p, o) = component_keys(triple);
        self.by_s.entry(s.clone()).or_default().insert(key.clone());
        self.by_p.entry(p.clone()).or_default().insert(key.clone());
        self.by_o.entry(o.clone()).or_default().insert(key.clone());
        self.by_sp
            .entry(pair_key(&s, &p))
            .or_default()
            .insert(key.clone());
        self.by_so
            .entry(pair_key(&s, &o))
            .or_default()
            .insert(key.clone());
        self.by_po
            .entry(pair_key(&p, &o))
            .or_default()
            .insert(key.clone());
        self.triples.insert(key, triple.clone());
    }

    fn remove(&mut self, triple: &Triple) {
        let key = triple.to_string();
        if self.triples.remove(&key).is_none() {
            return;
        }
        let (s, p, o) = component_keys(triple);
        let mut prune = |index: &mut HashMap<String, HashSet<String>>, bucket: &str| {
            if let Some(keys) = index.get_mut(bucket) {
                keys.remove(&key);
                if keys.is_empty() {
                    index.remove(bucket);
                }
            }
        };
        prune(&mut self.by_s, &s);
        prune(&mut self.by_p, &p);
        prune(&mut self.by_o, &o);
        prune(&mut self.by_sp, &pair_key(&s, &p));
        prune(&mut self.by_so, &pair_key(&s, &o));
        prune(&mut self.by_po, &pair_key(&p, &o));
    }

    /// Clones the triples behind a set of index keys.
    fn collect(&self, keys: Option<&HashSet<String>>) -> Vec<Triple> {
        match keys {
            Some(keys) => keys
                .iter()
                .filter_map(|k| self.triples.get(k).cloned())
                .collect(),
            None => Vec::new(),
        }
    }
}

fn component_keys(triple: &Triple) -> (String, String, String) {
    (
        triple.subject().to_string(),
        triple.predicate().to_string(),
        triple.object().to_string(),
    )
}

fn pair_key(a: &str, b: &str) -> String {
    format!("{a}{KEY_SEP}{b}")
}

/// An in-memory graph.
pub struct MemoryGraph {
    id: String,
    index: RwLock<TripleIndex>,
}

impl MemoryGraph {
    fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            index: RwLock::new(TripleIndex::default()),
        }
    }

    /// Snapshots the matching triples, then streams them through the sink
    /// applying the lookup filters. The read lock is released before the
    /// first send so slow consumers never block writers.
    fn emit(
        &self,
        ctx: &Context,
        lookup: &Lookup,
        sink: &TripleSink,
        matches: Vec<Triple>,
    ) -> Result<()> {
        let mut sent = 0usize;
        for triple in matches {
            ctx.check()?;
            if !lookup.accepts(triple.predicate()) {
                continue;
            }
            if let Some(max) = lookup.max_elements {
                if sent >= max {
                    break;
                }
            }
            sink.send(ctx, triple)?;
            sent += 1;
        }
        Ok(())
    }
}

impl Graph for MemoryGraph {
    fn id(&self) -> &str {
        &self.id
    }

    fn add_triples(&self, ctx: &Context, triples: &[Triple]) -> Result<()> {
        ctx.check()?;
        let mut index = self.index.write();
        for triple in triples {
            index.insert(triple);
        }
        debug!(graph = %self.id, count = triples.len(), "added triples");
        Ok(())
    }

    fn remove_triples(&self, ctx: &Context, triples: &[Triple]) -> Result<()> {
        ctx.check()?;
        let mut index = self.index.write();
        for triple in triples {
            index.remove(triple);
        }
        debug!(graph = %self.id, count = triples.len(), "removed triples");
        Ok(())
    }

    fn exists(&self, ctx: &Context, triple: &Triple) -> Result<bool> {
        ctx.check()?;
        Ok(self.index.read().triples.contains_key(&triple.to_string()))
    }

    fn triples(&self, ctx: &Context, lookup: &Lookup, sink: TripleSink) -> Result<()> {
        let matches: Vec<Triple> = self.index.read().triples.values().cloned().collect();
        self.emit(ctx, lookup, &sink, matches)
    }

    fn triples_for_subject(
        &self,
        ctx: &Context,
        subject: &Node,
        lookup: &Lookup,
        sink: TripleSink,
    ) -> Result<()> {
        let matches = {
            let index = self.index.read();
            index.collect(index.by_s.get(&subject.to_string()))
        };
        self.emit(ctx, lookup, &sink, matches)
    }

    fn triples_for_predicate(
        &self,
        ctx: &Context,
        predicate: &Predicate,
        lookup: &Lookup,
        sink: TripleSink,
    ) -> Result<()> {
        let matches = {
            let index = self.index.read();
            index.collect(index.by_p.get(&predicate.to_string()))
        };
        self.emit(ctx, lookup, &sink, matches)
    }

    fn triples_for_object(
        &self,
        ctx: &Context,
        object: &Object,
        lookup: &Lookup,
        sink: TripleSink,
    ) -> Result<()> {
        let matches = {
            let index = self.index.read();
            index.collect(index.by_o.get(&object.to_string()))
        };
        self.emit(ctx, lookup, &sink, matches)
    }

    fn triples_for_subject_and_predicate(
        &self,
        ctx: &Context,
        subject: &Node,
        predicate: &Predicate,
        lookup: &Lookup,
        sink: TripleSink,
    ) -> Result<()> {
        let matches = {
            let index = self.index.read();
            let key = pair_key(&subject.to_string(), &predicate.to_string());
            index.collect(index.by_sp.get(&key))
        };
        self.emit(ctx, lookup, &sink, matches)
    }

    fn triples_for_subject_and_object(
        &self,
        ctx: &Context,
        subject: &Node,
        object: &Object,
        lookup: &Lookup,
        sink: TripleSink,
    ) -> Result<()> {
        let matches = {
            let index = self.index.read();
            let key = pair_key(&subject.to_string(), &object.to_string());
            index.collect(index.by_so.get(&key))
        };
        self.emit(ctx, lookup, &sink, matches)
    }

    fn triples_for_predicate_and_object(
        &self,
        ctx: &Context,
        predicate: &Predicate,
        object: &Object,
        lookup: &Lookup,
        sink: TripleSink,
    ) -> Result<()> {
        let matches = {
            let index = self.index.read();
            let key = pair_key(&predicate.to_string(), &object.to_string());
            index.collect(index.by_po.get(&key))
        };
        self.emit(ctx, lookup, &sink, matches)
    }
}
