//! Abstract storage contract.
//!
//! A storage backend exposes a [`Store`] of named [`Graph`]s. Graphs are
//! mutable multisets of triples with set semantics (double insertion and
//! absent removal are no-ops). Lookups *stream*: the backend writes matches
//! into a bounded [`TripleSink`] while the caller consumes the other end of
//! the channel, typically from another thread. The producer owns closing
//! the sink, on completion or on error, by dropping it.

use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::sync::Arc;

use tempus_common::types::{Anchor, Node, Object, Predicate, Triple};
use tempus_common::utils::context::Context;
use tempus_common::utils::error::{Error, Result};

pub mod memory;

/// Default bound for lookup channels when the caller does not size them.
pub const DEFAULT_SINK_CAPACITY: usize = 1024;

/// Filters applied by the backend while streaming a lookup.
///
/// The anchor window constrains *temporal* predicates only; immutable
/// predicates are timeless and always pass. The default lookup is
/// unbounded.
#[derive(Debug, Clone, Default)]
pub struct Lookup {
    /// Maximum number of triples to emit; `None` is unbounded.
    pub max_elements: Option<usize>,
    /// Inclusive lower bound on temporal predicate anchors.
    pub lower_anchor: Option<Anchor>,
    /// Inclusive upper bound on temporal predicate anchors.
    pub upper_anchor: Option<Anchor>,
}

impl Lookup {
    /// Returns the unbounded lookup.
    #[must_use]
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Returns true if the predicate passes the anchor window. Immutable
    /// predicates always pass.
    #[must_use]
    pub fn accepts(&self, predicate: &Predicate) -> bool {
        match predicate.anchor() {
            None => true,
            Some(anchor) => {
                self.lower_anchor.map_or(true, |lower| *anchor >= lower)
                    && self.upper_anchor.map_or(true, |upper| *anchor <= upper)
            }
        }
    }
}

/// Producer side of a streaming lookup.
///
/// The sink closes when dropped; producers drop it on completion or error,
/// which is how end-of-stream is signaled to the consumer.
pub struct TripleSink {
    tx: SyncSender<Triple>,
}

impl TripleSink {
    /// Sends one triple, blocking while the channel is full.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Canceled`] if the context was canceled or the
    /// consumer has gone away. A consumer that stopped reading has either
    /// failed or canceled, and it drops its receiver to unblock producers;
    /// the producer should unwind either way.
    pub fn send(&self, ctx: &Context, triple: Triple) -> Result<()> {
        ctx.check()?;
        self.tx.send(triple).map_err(|_| Error::Canceled)
    }
}

/// Creates a bounded lookup channel of the given capacity.
#[must_use]
pub fn triple_channel(capacity: usize) -> (TripleSink, Receiver<Triple>) {
    let (tx, rx) = sync_channel(capacity.max(1));
    (TripleSink { tx }, rx)
}

/// A store of named graphs.
///
/// Graph identifiers start with `?` and are unique within a store. The
/// store is shared across queries; implementations must be safe to use
/// from multiple threads.
pub trait Store: Send + Sync {
    /// Creates a new graph.
    ///
    /// # Errors
    ///
    /// Fails with [`StorageError::GraphAlreadyExists`] if the id is taken.
    ///
    /// [`StorageError::GraphAlreadyExists`]: tempus_common::utils::error::StorageError::GraphAlreadyExists
    fn new_graph(&self, ctx: &Context, id: &str) -> Result<Arc<dyn Graph>>;

    /// Deletes a graph and all its triples.
    ///
    /// # Errors
    ///
    /// Fails with [`StorageError::GraphNotFound`] if the graph is absent.
    ///
    /// [`StorageError::GraphNotFound`]: tempus_common::utils::error::StorageError::GraphNotFound
    fn delete_graph(&self, ctx: &Context, id: &str) -> Result<()>;

    /// Returns a handle to an existing graph.
    ///
    /// # Errors
    ///
    /// Fails with [`StorageError::GraphNotFound`] if the graph is absent.
    ///
    /// [`StorageError::GraphNotFound`]: tempus_common::utils::error::StorageError::GraphNotFound
    fn graph(&self, ctx: &Context, id: &str) -> Result<Arc<dyn Graph>>;

    /// Returns the identifiers of all graphs in the store.
    ///
    /// # Errors
    ///
    /// Fails if the backend cannot enumerate its graphs.
    fn graph_names(&self, ctx: &Context) -> Result<Vec<String>>;
}

/// A named, mutable set of triples with indexed, streaming lookups.
///
/// Mutations require exclusive access to the graph; lookups require shared
/// access. Every lookup applies the [`Lookup`] filters and writes matches
/// into the provided sink.
#[allow(clippy::missing_errors_doc)]
pub trait Graph: Send + Sync {
    /// Returns the graph identifier.
    fn id(&self) -> &str;

    /// Adds triples to the graph. Already-present triples are no-ops.
    fn add_triples(&self, ctx: &Context, triples: &[Triple]) -> Result<()>;

    /// Removes triples from the graph. Absent triples are no-ops.
    fn remove_triples(&self, ctx: &Context, triples: &[Triple]) -> Result<()>;

    /// Returns true if the exact triple is present.
    fn exists(&self, ctx: &Context, triple: &Triple) -> Result<bool>;

    /// Streams every triple in the graph.
    fn triples(&self, ctx: &Context, lookup: &Lookup, sink: TripleSink) -> Result<()>;

    /// Streams the triples with the given subject.
    fn triples_for_subject(
        &self,
        ctx: &Context,
        subject: &Node,
        lookup: &Lookup,
        sink: TripleSink,
    ) -> Result<()>;

    /// Streams the triples with the given predicate (name and anchor).
    fn triples_for_predicate(
        &self,
        ctx: &Context,
        predicate: &Predicate,
        lookup: &Lookup,
        sink: TripleSink,
    ) -> Result<()>;

    /// Streams the triples with the given object.
    fn triples_for_object(
        &self,
        ctx: &Context,
        object: &Object,
        lookup: &Lookup,
        sink: TripleSink,
    ) -> Result<()>;

    /// Streams the triples with the given subject and predicate.
    fn triples_for_subject_and_predicate(
        &self,
        ctx: &Context,
        subject: &Node,
        predicate: &Predicate,
        lookup: &Lookup,
        sink: TripleSink,
    ) -> Result<()>;

    /// Streams the triples with the given subject and object.
    fn triples_for_subject_and_object(
        &self,
        ctx: &Context,
        subject: &Node,
        object: &Object,
        lookup: &Lookup,
        sink: TripleSink,
    ) -> Result<()>;

    /// Streams the triples with the given predicate and object.
    fn triples_for_predicate_and_object(
        &self,
        ctx: &Context,
        predicate: &Predicate,
        object: &Object,
        lookup: &Lookup,
        sink: TripleSink,
    ) -> Result<()>;
}
