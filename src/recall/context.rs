//! Per-run identity of a routing subtree.
//!
//! Every run traversing the routing tree gets its own recycling context, and
//! every sub-audio reached through a channel link gets a child context
//! appended to the parent's child list. Two concurrent runs (say playback and
//! a sequencer preview) therefore never share contexts. The positional index
//! of a child in the list is a stable lookup key: resolving which child
//! context corresponds to a downstream channel means scanning for the child
//! whose range starts at that channel's first recycling.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

pub struct RecyclingContext {
    parent: Mutex<Weak<RecyclingContext>>,
    children: Mutex<Vec<Arc<RecyclingContext>>>,
    /// Half-open recycling range this context governs.
    first_recycling: usize,
    last_recycling: usize,
}

impl RecyclingContext {
    pub fn new(first_recycling: usize, last_recycling: usize) -> Arc<Self> {
        Arc::new(Self {
            parent: Mutex::new(Weak::new()),
            children: Mutex::new(Vec::new()),
            first_recycling,
            last_recycling,
        })
    }

    /// Manufacture a child context for a recursively linked sub-audio and
    /// append it to `parent`'s child list.
    pub fn child(parent: &Arc<Self>, first_recycling: usize, last_recycling: usize) -> Arc<Self> {
        let child = Arc::new(Self {
            parent: Mutex::new(Arc::downgrade(parent)),
            children: Mutex::new(Vec::new()),
            first_recycling,
            last_recycling,
        });
        parent.children.lock().push(child.clone());
        child
    }

    pub fn parent(&self) -> Option<Arc<RecyclingContext>> {
        self.parent.lock().upgrade()
    }

    pub fn recycling_range(&self) -> (usize, usize) {
        (self.first_recycling, self.last_recycling)
    }

    pub fn child_count(&self) -> usize {
        self.children.lock().len()
    }

    pub fn child_at(&self, position: usize) -> Option<Arc<RecyclingContext>> {
        self.children.lock().get(position).cloned()
    }

    /// Position of the child context governing the range that starts at
    /// `first_recycling`. Linear scan; `None` when no child matches.
    pub fn find_child_position(&self, first_recycling: usize) -> Option<usize> {
        self.children
            .lock()
            .iter()
            .position(|c| c.first_recycling == first_recycling)
    }
}

impl std::fmt::Debug for RecyclingContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecyclingContext")
            .field("first_recycling", &self.first_recycling)
            .field("last_recycling", &self.last_recycling)
            .field("children", &self.child_count())
            .finish()
    }
}
