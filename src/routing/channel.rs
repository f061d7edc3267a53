//! Channels: one routing line of an audio object.

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::engine::config::TickContext;
use crate::recall::{RecallGraph, RecallId, RecyclingContext, ScopeFlags, Stage};

use super::recycling::Recycling;

/// One line of an audio object: a contiguous recycling slice, an optional
/// link to a downstream input channel, the ledger of run identities active
/// on this line, and the recall container.
///
/// The routing tree is acyclic by construction; links only ever point
/// downstream.
pub struct Channel {
    index: usize,
    first_recycling: usize,
    last_recycling: usize,
    recyclings: Vec<Arc<Recycling>>,
    link: Mutex<Option<Arc<Channel>>>,
    recall_ids: Mutex<Vec<Arc<RecallId>>>,
    graph: Mutex<RecallGraph>,
}

impl Channel {
    pub(crate) fn new(index: usize, recyclings: Vec<Arc<Recycling>>) -> Arc<Self> {
        let first_recycling = recyclings.first().map(|r| r.index()).unwrap_or(0);
        let last_recycling = first_recycling + recyclings.len();
        Arc::new(Self {
            index,
            first_recycling,
            last_recycling,
            recyclings,
            link: Mutex::new(None),
            recall_ids: Mutex::new(Vec::new()),
            graph: Mutex::new(RecallGraph::new()),
        })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Half-open global recycling range.
    pub fn recycling_range(&self) -> (usize, usize) {
        (self.first_recycling, self.last_recycling)
    }

    pub fn recyclings(&self) -> &[Arc<Recycling>] {
        &self.recyclings
    }

    pub fn set_link(&self, target: Option<Arc<Channel>>) {
        *self.link.lock() = target;
    }

    pub fn link(&self) -> Option<Arc<Channel>> {
        self.link.lock().clone()
    }

    pub fn register_recall_id(&self, id: Arc<RecallId>) {
        self.recall_ids.lock().push(id);
    }

    pub fn unregister_recall_id(&self, id: &Arc<RecallId>) {
        self.recall_ids.lock().retain(|i| !Arc::ptr_eq(i, id));
    }

    /// Direct lookup on the channel-local ledger by recycling context.
    pub fn find_recall_id_by_context(
        &self,
        context: &Arc<RecyclingContext>,
    ) -> Option<Arc<RecallId>> {
        self.recall_ids
            .lock()
            .iter()
            .find(|id| Arc::ptr_eq(id.context(), context))
            .cloned()
    }

    pub fn recall_id_count(&self) -> usize {
        self.recall_ids.lock().len()
    }

    /// The channel's recall container. Callers restructuring the graph from
    /// outside the engine tick must go through the task queue instead.
    pub fn graph(&self) -> MutexGuard<'_, RecallGraph> {
        self.graph.lock()
    }

    /// Dispatch one stage to every playable top-level instance matching
    /// `scope`, in container order.
    pub fn play(&self, scope: ScopeFlags, stage: Stage, tick: &TickContext) {
        let mut graph = self.graph.lock();
        for root in graph.playable_roots(scope) {
            graph.run_stage(root, stage, tick);
        }
    }
}

impl std::fmt::Debug for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("index", &self.index)
            .field("first_recycling", &self.first_recycling)
            .field("last_recycling", &self.last_recycling)
            .finish()
    }
}
