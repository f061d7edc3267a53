//! The recall arena and its staged traversal.
//!
//! Nodes are stored in a generational arena and addressed by handle, so
//! parent, child and container links are plain indices: no reference counts,
//! no ownership cycles. The arena owns each node's behavior object (the
//! polymorphic stage dispatch); during a stage visit the behavior is taken
//! out of its slot, run against the graph, and put back, which lets a
//! behavior recurse into children through the same `&mut` graph.
//!
//! Structural mutation discipline: nothing here unlinks a node while a
//! traversal is on the stack. `cancel` only marks flags and tears down
//! wiring; the actual unlink happens later through `remove`, driven by the
//! task queue.

use std::sync::Arc;

use crate::engine::config::TickContext;

use super::dependency::{Orientation, RecallDependency};
use super::id::{RecallId, ScopeFlags};
use super::stage::Stage;
use super::state::{RecallFlags, RecallState};

/// Generational index into a [`RecallGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecallHandle {
    index: u32,
    generation: u32,
}

/// Polymorphic stage dispatch of one recall kind.
///
/// The default `run_stage` recurses pre-order into the node's children;
/// concrete kinds override it to perform work before (or instead of)
/// recursing. Duplication copies behavior, never in-flight data.
pub trait RecallBehavior: Send {
    /// Stable kind name, also the key dependency resolution matches on.
    fn kind(&self) -> &'static str;

    fn orientation(&self) -> Orientation {
        Orientation::Output
    }

    fn run_stage(
        &mut self,
        graph: &mut RecallGraph,
        handle: RecallHandle,
        stage: Stage,
        tick: &TickContext,
    ) {
        graph.run_children(handle, stage, tick);
    }

    fn duplicate(&self) -> Box<dyn RecallBehavior>;

    /// Static wiring, established once per instance.
    fn connect(&mut self) {}
    fn disconnect(&mut self) {}

    /// Per-run wiring, established at run start and torn down on cancel.
    fn connect_dynamic(&mut self) {}
    fn disconnect_dynamic(&mut self) {}
}

pub struct RecallNode {
    pub name: String,
    state: RecallState,
    flags: RecallFlags,
    recall_id: Option<Arc<RecallId>>,
    /// Back-reference to the template this instance was duplicated from.
    container: Option<RecallHandle>,
    parent: Option<RecallHandle>,
    /// Insertion order is execution order.
    children: Vec<RecallHandle>,
    dependencies: Vec<RecallDependency>,
    /// Successfully resolved providers, by kind.
    resolved: Vec<(&'static str, RecallHandle)>,
    /// Readiness counters adjusted through `notify_dependency`, by kind.
    dependency_ready: Vec<(&'static str, i32)>,
    behavior: Option<Box<dyn RecallBehavior>>,
}

impl RecallNode {
    pub fn state(&self) -> RecallState {
        self.state
    }

    pub fn flags(&self) -> RecallFlags {
        self.flags
    }

    pub fn recall_id(&self) -> Option<&Arc<RecallId>> {
        self.recall_id.as_ref()
    }

    pub fn container(&self) -> Option<RecallHandle> {
        self.container
    }

    pub fn parent(&self) -> Option<RecallHandle> {
        self.parent
    }

    pub fn children(&self) -> &[RecallHandle] {
        &self.children
    }

    pub fn dependencies(&self) -> &[RecallDependency] {
        &self.dependencies
    }

    pub fn resolved(&self, kind: &str) -> Option<RecallHandle> {
        self.resolved
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, h)| *h)
    }

    pub fn dependency_ready(&self, kind: &str) -> i32 {
        self.dependency_ready
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, n)| *n)
            .unwrap_or(0)
    }

    /// True once every declared dependency has announced readiness.
    pub fn is_ready(&self) -> bool {
        self.dependencies
            .iter()
            .all(|d| self.dependency_ready(d.kind) > 0)
    }

    pub fn kind(&self) -> Option<&'static str> {
        self.behavior.as_ref().map(|b| b.kind())
    }
}

struct Slot {
    generation: u32,
    node: Option<RecallNode>,
}

/// Arena of recall nodes forming one container's tree.
#[derive(Default)]
pub struct RecallGraph {
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl RecallGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, node: RecallNode) -> RecallHandle {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            RecallHandle {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                node: Some(node),
            });
            RecallHandle {
                index,
                generation: 0,
            }
        }
    }

    fn release(&mut self, handle: RecallHandle) {
        if let Some(slot) = self.slots.get_mut(handle.index as usize) {
            if slot.generation == handle.generation {
                slot.node = None;
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(handle.index);
            }
        }
    }

    pub fn get(&self, handle: RecallHandle) -> Option<&RecallNode> {
        self.slots
            .get(handle.index as usize)
            .filter(|s| s.generation == handle.generation)
            .and_then(|s| s.node.as_ref())
    }

    pub fn get_mut(&mut self, handle: RecallHandle) -> Option<&mut RecallNode> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|s| s.generation == handle.generation)
            .and_then(|s| s.node.as_mut())
    }

    pub fn contains(&self, handle: RecallHandle) -> bool {
        self.get(handle).is_some()
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.node.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every live handle, in slot order.
    pub fn handles(&self) -> Vec<RecallHandle> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.node.is_some())
            .map(|(i, s)| RecallHandle {
                index: i as u32,
                generation: s.generation,
            })
            .collect()
    }

    /// Register an inert prototype. Templates are never executed, only
    /// duplicated.
    pub fn add_template(
        &mut self,
        name: impl Into<String>,
        behavior: Box<dyn RecallBehavior>,
    ) -> RecallHandle {
        self.insert(RecallNode {
            name: name.into(),
            state: RecallState::Template,
            flags: RecallFlags::default(),
            recall_id: None,
            container: None,
            parent: None,
            children: Vec::new(),
            dependencies: Vec::new(),
            resolved: Vec::new(),
            dependency_ready: Vec::new(),
            behavior: Some(behavior),
        })
    }

    pub fn set_dependencies(&mut self, handle: RecallHandle, dependencies: Vec<RecallDependency>) {
        if let Some(node) = self.get_mut(handle) {
            node.dependencies = dependencies;
        }
    }

    pub fn set_propagate_done(&mut self, handle: RecallHandle, propagate: bool) {
        if let Some(node) = self.get_mut(handle) {
            node.flags.propagate_done = propagate;
        }
    }

    /// Duplicate `source` into a fresh instance bound to `recall_id`.
    ///
    /// The duplicate copies behavior (via [`RecallBehavior::duplicate`]) and
    /// the declared dependencies, starts at `Instantiated` with the template
    /// flag cleared regardless of the source's state, and has its static and
    /// dynamic wiring connected.
    pub fn duplicate(
        &mut self,
        source: RecallHandle,
        recall_id: &Arc<RecallId>,
    ) -> crate::Result<RecallHandle> {
        let src = self.get(source).ok_or(crate::Error::StaleHandle)?;
        let mut behavior = src
            .behavior
            .as_ref()
            .ok_or(crate::Error::StaleHandle)?
            .duplicate();
        let name = src.name.clone();
        let dependencies = src.dependencies.clone();
        let mut flags = RecallFlags {
            propagate_done: src.flags.propagate_done,
            ..RecallFlags::default()
        };

        behavior.connect();
        flags.connected = true;
        behavior.connect_dynamic();
        flags.dynamic_connected = true;

        log::trace!("duplicating recall '{}'", name);
        let handle = self.insert(RecallNode {
            name,
            state: RecallState::Instantiated,
            flags,
            recall_id: Some(recall_id.clone()),
            container: Some(source),
            parent: None,
            children: Vec::new(),
            dependencies,
            resolved: Vec::new(),
            dependency_ready: Vec::new(),
            behavior: Some(behavior),
        });
        Ok(handle)
    }

    /// Link `child` under `parent`, appending to the execution order.
    ///
    /// The child's recall id must equal the parent's at attach time.
    pub fn attach_child(&mut self, parent: RecallHandle, child: RecallHandle) {
        let parent_id = self.get(parent).and_then(|n| n.recall_id.clone());
        let child_id = self.get(child).and_then(|n| n.recall_id.clone());
        let ids_match = match (&parent_id, &child_id) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        };
        assert!(ids_match, "child recall id must match parent at attach time");

        if let Some(node) = self.get_mut(child) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.get_mut(parent) {
            node.children.push(child);
        }
    }

    /// Dispatch one stage to a node and, transitively, every descendant.
    ///
    /// A pending cancel is observed here, before dispatch: the visit turns
    /// into the actual cancellation and the stage is not run. Templates,
    /// hidden nodes and done nodes are skipped.
    pub fn run_stage(
        &mut self,
        handle: RecallHandle,
        stage: Stage,
        tick: &TickContext,
    ) {
        let (state, flags) = match self.get(handle) {
            Some(node) => (node.state, node.flags),
            None => return,
        };
        if state == RecallState::Template {
            log::warn!("refusing to run a template recall");
            return;
        }
        if flags.cancel_pending {
            self.cancel(handle);
            return;
        }
        if flags.hide || state == RecallState::Done || state == RecallState::Removed {
            return;
        }

        match self.get_mut(handle).and_then(|n| n.behavior.take()) {
            Some(mut behavior) => {
                behavior.run_stage(self, handle, stage, tick);
                if let Some(node) = self.get_mut(handle) {
                    node.behavior = Some(behavior);
                }
            }
            // Behavior already taken by an outer visit of the same node;
            // fall back to the default traversal.
            None => self.run_children(handle, stage, tick),
        }

        if stage == Stage::InitPost {
            if let Some(node) = self.get_mut(handle) {
                if node.state == RecallState::Instantiated {
                    node.state = RecallState::RunInitialized;
                }
            }
        }
    }

    /// Default traversal: visit every child with the identical stage, in
    /// insertion order.
    pub fn run_children(&mut self, handle: RecallHandle, stage: Stage, tick: &TickContext) {
        let children = match self.get(handle) {
            Some(node) => node.children.clone(),
            None => return,
        };
        for child in children {
            self.run_stage(child, stage, tick);
        }
    }

    /// Mark a node done. Does not recurse.
    pub fn done(&mut self, handle: RecallHandle) {
        if let Some(node) = self.get_mut(handle) {
            if node.state == RecallState::Done {
                return;
            }
            node.state = RecallState::Done;
            log::debug!("recall '{}' done", node.name);
        }
    }

    /// Request cooperative cancellation; takes effect at the node's next
    /// stage visit.
    pub fn request_cancel(&mut self, handle: RecallHandle) {
        if let Some(node) = self.get_mut(handle) {
            node.flags.cancel_pending = true;
        }
    }

    /// Cancel a node: children first, depth-first, then tear down the node's
    /// wiring and mark it hidden and pending removal. Idempotent.
    pub fn cancel(&mut self, handle: RecallHandle) {
        let children = {
            let Some(node) = self.get(handle) else { return };
            if node.flags.hide && node.flags.removal_pending {
                return;
            }
            node.children.clone()
        };
        for child in children {
            self.cancel(child);
        }

        if let Some(node) = self.get_mut(handle) {
            if let Some(behavior) = node.behavior.as_mut() {
                if node.flags.dynamic_connected {
                    behavior.disconnect_dynamic();
                }
                if node.flags.connected {
                    behavior.disconnect();
                }
            }
            node.flags.dynamic_connected = false;
            node.flags.connected = false;
            node.flags.cancel_pending = false;
            node.flags.hide = true;
            node.flags.removal_pending = true;
            log::debug!("recall '{}' canceled", node.name);
        }
    }

    /// Unlink a node from its parent and free its subtree. On a parentless
    /// node this logs and returns: top-level template removal is a caller
    /// error, not a panic.
    pub fn remove(&mut self, handle: RecallHandle) {
        let Some(node) = self.get(handle) else {
            log::warn!("remove: stale recall handle");
            return;
        };
        let Some(parent) = node.parent else {
            log::warn!("cannot remove top-level recall '{}'", node.name);
            return;
        };

        if let Some(p) = self.get_mut(parent) {
            p.children.retain(|&c| c != handle);
        }
        self.free_subtree(handle);

        let cascade = self.get(parent).is_some_and(|p| {
            p.children.is_empty() && p.flags.propagate_done && p.state != RecallState::Done
        });
        if cascade {
            self.done(parent);
        }
    }

    /// Unlink and free a top-level instance (run teardown path; unlike
    /// `remove` this accepts parentless nodes).
    pub fn remove_root(&mut self, handle: RecallHandle) {
        if self.get(handle).is_some_and(|n| n.parent.is_some()) {
            self.remove(handle);
        } else {
            self.free_subtree(handle);
        }
    }

    fn free_subtree(&mut self, handle: RecallHandle) {
        let children = match self.get_mut(handle) {
            Some(node) => {
                node.state = RecallState::Removed;
                node.children.clone()
            }
            None => return,
        };
        for child in children {
            self.free_subtree(child);
        }
        self.release(handle);
    }

    /// Resolve the declared dependencies of a duplicated instance.
    ///
    /// Orientation parity picks the identity to resolve under: matching
    /// orientations use the node's own recall id, mismatched ones the id of
    /// the parent recycling context. A dependency with no matching duplicated
    /// sibling logs a warning and is skipped; the instance keeps running
    /// degraded.
    pub fn resolve_dependencies(&mut self, handle: RecallHandle) {
        let (dependencies, own_id, own_orientation, name) = {
            let Some(node) = self.get(handle) else { return };
            let Some(id) = node.recall_id.clone() else {
                log::warn!("cannot resolve dependencies of '{}': no recall id", node.name);
                return;
            };
            let orientation = node
                .behavior
                .as_ref()
                .map(|b| b.orientation())
                .unwrap_or(Orientation::Output);
            (node.dependencies.clone(), id, orientation, node.name.clone())
        };

        for dep in dependencies {
            let target_context = if dep.orientation == own_orientation {
                Some(own_id.context().clone())
            } else {
                own_id.context().parent()
            };
            let Some(target_context) = target_context else {
                log::warn!(
                    "unresolved dependency '{}' of '{}': no parent context",
                    dep.kind,
                    name
                );
                continue;
            };

            let found = self.find_by_kind_and_context(dep.kind, &target_context);
            match found {
                Some(provider) => {
                    if let Some(node) = self.get_mut(handle) {
                        node.resolved.push((dep.kind, provider));
                    }
                }
                None => {
                    log::warn!("unresolved dependency '{}' of '{}'", dep.kind, name);
                }
            }
        }
    }

    fn find_by_kind_and_context(
        &self,
        kind: &'static str,
        context: &Arc<super::context::RecyclingContext>,
    ) -> Option<RecallHandle> {
        self.handles().into_iter().find(|&h| {
            let Some(node) = self.get(h) else { return false };
            node.state != RecallState::Template
                && node.kind() == Some(kind)
                && node
                    .recall_id
                    .as_ref()
                    .is_some_and(|id| Arc::ptr_eq(id.context(), context))
        })
    }

    /// Adjust a node's readiness counter for one dependency kind.
    pub fn notify_dependency(&mut self, handle: RecallHandle, kind: &'static str, delta: i32) {
        if let Some(node) = self.get_mut(handle) {
            match node.dependency_ready.iter_mut().find(|(k, _)| *k == kind) {
                Some((_, n)) => *n += delta,
                None => node.dependency_ready.push((kind, delta)),
            }
        }
    }

    /// Let a provider announce readiness to every sibling under the same
    /// recall id that declared a dependency on its kind.
    pub fn announce_dependency(&mut self, provider: RecallHandle, delta: i32) {
        let (kind, id) = {
            let Some(node) = self.get(provider) else { return };
            let Some(kind) = node.kind() else { return };
            let Some(id) = node.recall_id.clone() else { return };
            (kind, id)
        };
        let dependents: Vec<RecallHandle> = self
            .handles()
            .into_iter()
            .filter(|&h| {
                h != provider
                    && self.get(h).is_some_and(|n| {
                        n.recall_id.as_ref().is_some_and(|i| Arc::ptr_eq(i, &id))
                            && n.dependencies.iter().any(|d| d.kind == kind)
                    })
            })
            .collect();
        for dependent in dependents {
            self.notify_dependency(dependent, kind, delta);
        }
    }

    /// Top-level templates, in slot order.
    pub fn templates(&self) -> Vec<RecallHandle> {
        self.handles()
            .into_iter()
            .filter(|&h| {
                self.get(h)
                    .is_some_and(|n| n.state == RecallState::Template && n.parent.is_none())
            })
            .collect()
    }

    /// Top-level instances whose scope intersects `scope` and which are
    /// neither hidden nor finished.
    pub fn playable_roots(&self, scope: ScopeFlags) -> Vec<RecallHandle> {
        self.handles()
            .into_iter()
            .filter(|&h| {
                self.get(h).is_some_and(|n| {
                    n.parent.is_none()
                        && n.state != RecallState::Template
                        && n.state != RecallState::Removed
                        && !n.flags.hide
                        && n.recall_id
                            .as_ref()
                            .is_some_and(|id| id.scope().intersects(scope))
                })
            })
            .collect()
    }

    /// Top-level instances carrying exactly this recall id.
    pub fn roots_for(&self, recall_id: &Arc<RecallId>) -> Vec<RecallHandle> {
        self.handles()
            .into_iter()
            .filter(|&h| {
                self.get(h).is_some_and(|n| {
                    n.parent.is_none()
                        && n.recall_id
                            .as_ref()
                            .is_some_and(|id| Arc::ptr_eq(id, recall_id))
                })
            })
            .collect()
    }
}
