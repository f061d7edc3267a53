//! Audio objects: groups of channels plus their recycling pool.

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::engine::config::TickContext;
use crate::recall::{RecallGraph, ScopeFlags, Stage};

use super::channel::Channel;
use super::recycling::Recycling;

/// A machine in the routing tree: `channels` lines, each owning
/// `recyclings_per_channel` recyclings, plus an audio-level recall
/// container.
pub struct Audio {
    name: String,
    channels: Vec<Arc<Channel>>,
    recyclings: Vec<Arc<Recycling>>,
    graph: Mutex<RecallGraph>,
}

impl Audio {
    /// Build an audio whose recyclings start at the global index
    /// `first_recycling`. Callers keep recycling indices unique across the
    /// whole tree.
    pub fn new(
        name: impl Into<String>,
        channels: usize,
        recyclings_per_channel: usize,
        first_recycling: usize,
    ) -> Arc<Self> {
        let recyclings: Vec<Arc<Recycling>> = (0..channels * recyclings_per_channel)
            .map(|i| Recycling::new(first_recycling + i))
            .collect();
        let channels = (0..channels)
            .map(|c| {
                let slice =
                    recyclings[c * recyclings_per_channel..(c + 1) * recyclings_per_channel].to_vec();
                Channel::new(c, slice)
            })
            .collect();
        Arc::new(Self {
            name: name.into(),
            channels,
            recyclings,
            graph: Mutex::new(RecallGraph::new()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn channels(&self) -> &[Arc<Channel>] {
        &self.channels
    }

    pub fn channel(&self, index: usize) -> crate::Result<&Arc<Channel>> {
        self.channels
            .get(index)
            .ok_or(crate::Error::ChannelOutOfRange(index))
    }

    pub fn recyclings(&self) -> &[Arc<Recycling>] {
        &self.recyclings
    }

    /// Audio-level recall container.
    pub fn graph(&self) -> MutexGuard<'_, RecallGraph> {
        self.graph.lock()
    }

    /// Dispatch one stage to the audio-level container.
    pub fn play(&self, scope: ScopeFlags, stage: Stage, tick: &TickContext) {
        let mut graph = self.graph.lock();
        for root in graph.playable_roots(scope) {
            graph.run_stage(root, stage, tick);
        }
    }
}
