//! The copy-pattern recall: reads the step grid once per sequencer
//! subdivision and feeds audio signals into its channel's recyclings.
//!
//! This is the reference recall tying the pattern store, the run identity
//! model and the recycling pool together. All shared state it touches is
//! guarded by per-object locks held for the individual access only: the two
//! bank ports, the pattern's index ports and bitmap, and each recycling's
//! signal list.

use std::sync::{Arc, Weak};

use crate::engine::config::TickContext;
use crate::pattern::Pattern;
use crate::port::Port;
use crate::routing::{AudioSignal, Channel};

use super::dependency::{Orientation, RecallDependency};
use super::node::{RecallBehavior, RecallGraph, RecallHandle};
use super::providers::{CountBeatsRun, DelayRun};
use super::stage::Stage;
use super::RecallId;

pub struct CopyPattern {
    pattern: Arc<Pattern>,
    bank_0: Arc<Port>,
    bank_1: Arc<Port>,
    /// The channel owning this recall. Weak: the channel's container owns
    /// the behavior, not the other way around.
    channel: Weak<Channel>,
}

impl CopyPattern {
    pub const KIND: &'static str = "copy-pattern-channel-run";

    pub fn new(
        pattern: Arc<Pattern>,
        channel: &Arc<Channel>,
        bank_0: Arc<Port>,
        bank_1: Arc<Port>,
    ) -> Self {
        Self {
            pattern,
            bank_0,
            bank_1,
            channel: Arc::downgrade(channel),
        }
    }

    /// The standard dependency declarations of a copy-pattern template.
    pub fn dependencies() -> Vec<RecallDependency> {
        vec![
            RecallDependency::new(DelayRun::KIND, Orientation::Input),
            RecallDependency::new(CountBeatsRun::KIND, Orientation::Output),
        ]
    }

    /// Register a copy-pattern template with its dependencies on a channel's
    /// container.
    pub fn install(
        channel: &Arc<Channel>,
        pattern: Arc<Pattern>,
        bank_0: Arc<Port>,
        bank_1: Arc<Port>,
    ) -> RecallHandle {
        let mut graph = channel.graph();
        let template = graph.add_template(
            "copy-pattern",
            Box::new(CopyPattern::new(pattern, channel, bank_0, bank_1)),
        );
        graph.set_dependencies(template, Self::dependencies());
        template
    }

    fn produce(&self, graph: &mut RecallGraph, handle: RecallHandle, tick: &TickContext) {
        let Some(channel) = self.channel.upgrade() else {
            log::warn!("copy-pattern: owning channel is gone");
            return;
        };

        let i = self.bank_0.safe_read().as_uint();
        let j = self.bank_1.safe_read().as_uint();
        self.pattern.select_bank(i, j);

        let dim = self.pattern.dim();
        let step = tick.step(dim.steps);
        if !self.pattern.get_bit(i as usize, j as usize, step) {
            return;
        }

        let Some(own_id) = graph.get(handle).and_then(|n| n.recall_id().cloned()) else {
            log::warn!("copy-pattern: instance has no recall id, skipping production");
            return;
        };
        let target_id = self.resolve_target_id(&channel, &own_id);

        for recycling in channel.recyclings() {
            recycling.add_signal(AudioSignal::new(Some(target_id.clone()), tick));
        }
    }

    /// Resolve the identity produced signals are bound to. A linked channel
    /// routes through the matching child context; when no child id is
    /// registered there, production falls back to the local id.
    fn resolve_target_id(&self, channel: &Arc<Channel>, own_id: &Arc<RecallId>) -> Arc<RecallId> {
        let Some(down) = channel.link() else {
            return own_id.clone();
        };
        let context = own_id.context();
        let child_id = context
            .find_child_position(down.recycling_range().0)
            .and_then(|pos| context.child_at(pos))
            .and_then(|child_context| down.find_recall_id_by_context(&child_context));
        match child_id {
            Some(id) => id,
            None => {
                log::warn!(
                    "copy-pattern: no recall id for linked channel {}, using local id",
                    down.index()
                );
                own_id.clone()
            }
        }
    }
}

impl RecallBehavior for CopyPattern {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn orientation(&self) -> Orientation {
        Orientation::Input
    }

    fn run_stage(
        &mut self,
        graph: &mut RecallGraph,
        handle: RecallHandle,
        stage: Stage,
        tick: &TickContext,
    ) {
        // Only a fresh grid step produces; interpolated sub-frames do not.
        if stage == Stage::Pre && tick.is_step_boundary() {
            self.produce(graph, handle, tick);
        }
        graph.run_children(handle, stage, tick);
    }

    fn duplicate(&self) -> Box<dyn RecallBehavior> {
        Box::new(CopyPattern {
            pattern: self.pattern.clone(),
            bank_0: self.bank_0.clone(),
            bank_1: self.bank_1.clone(),
            channel: self.channel.clone(),
        })
    }
}
