//! Run start and teardown across a link chain.
//!
//! Starting a run manufactures a fresh recycling context for the top channel
//! and, hop by hop through the link chain, one child context per downstream
//! channel, so concurrent runs never share identity. Each hop duplicates the
//! local templates under its identity and resolves their dependencies.
//!
//! Teardown only cancels; unlinking the canceled instances is the task
//! queue's job.

use std::sync::Arc;

use crate::engine::config::TickContext;
use crate::recall::{RecallId, RecyclingContext, ScopeFlags, Stage};

use super::channel::Channel;

/// Start one run on `channel`, recursing through its link chain. Returns the
/// top-level run identity.
pub fn start_run(channel: &Arc<Channel>, scope: ScopeFlags) -> Arc<RecallId> {
    let (first, last) = channel.recycling_range();
    let context = RecyclingContext::new(first, last);
    let id = RecallId::new(context.clone(), scope);
    instantiate(channel, &id);
    descend(channel, &context, scope);
    id
}

fn descend(channel: &Arc<Channel>, parent_context: &Arc<RecyclingContext>, scope: ScopeFlags) {
    if let Some(down) = channel.link() {
        let (first, last) = down.recycling_range();
        let child_context = RecyclingContext::child(parent_context, first, last);
        let child_id = RecallId::new(child_context.clone(), scope);
        instantiate(&down, &child_id);
        descend(&down, &child_context, scope);
    }
}

fn instantiate(channel: &Arc<Channel>, id: &Arc<RecallId>) {
    channel.register_recall_id(id.clone());
    let mut graph = channel.graph();
    let instances: Vec<_> = graph
        .templates()
        .into_iter()
        .filter_map(|t| graph.duplicate(t, id).ok())
        .collect();
    for instance in instances {
        graph.resolve_dependencies(instance);
    }
}

/// Apply `f` to `channel` and every channel reachable through its link
/// chain, top down.
pub fn for_each_in_chain(channel: &Arc<Channel>, mut f: impl FnMut(&Arc<Channel>)) {
    let mut current = Some(channel.clone());
    while let Some(ch) = current {
        f(&ch);
        current = ch.link();
    }
}

/// Run the three init stages over the whole chain, one stage at a time.
pub fn init_run(channel: &Arc<Channel>, scope: ScopeFlags, tick: &TickContext) {
    for stage in Stage::INIT {
        for_each_in_chain(channel, |ch| ch.play(scope, stage, tick));
    }
}

/// The (channel, identity) pairs of one run, top channel first, following
/// child contexts hop by hop through the link chain. Stops (with a warning)
/// at the first hop whose channel has no registered child id.
pub fn chain_identities(
    channel: &Arc<Channel>,
    id: &Arc<RecallId>,
) -> Vec<(Arc<Channel>, Arc<RecallId>)> {
    let mut pairs = Vec::new();
    let mut current = Some((channel.clone(), id.clone()));
    while let Some((ch, id)) = current {
        current = ch.link().and_then(|down| {
            let context = id.context();
            let child_id = context
                .find_child_position(down.recycling_range().0)
                .and_then(|pos| context.child_at(pos))
                .and_then(|child_context| down.find_recall_id_by_context(&child_context));
            match child_id {
                Some(child_id) => Some((down, child_id)),
                None => {
                    log::warn!(
                        "no child recall id registered on channel {}",
                        down.index()
                    );
                    None
                }
            }
        });
        pairs.push((ch, id));
    }
    pairs
}

/// Cancel every instance of this run across the chain. Unlinking is deferred
/// to tasks.
pub fn cancel_run(channel: &Arc<Channel>, id: &Arc<RecallId>) {
    for (ch, id) in chain_identities(channel, id) {
        let mut graph = ch.graph();
        for root in graph.roots_for(&id) {
            graph.cancel(root);
        }
    }
}
