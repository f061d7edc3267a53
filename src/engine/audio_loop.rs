//! The root clock driver.
//!
//! One `run_tick` call corresponds to one buffer callback from the soundcard
//! collaborator. Per tick, in order: drain the control inlet, drain the task
//! queue exactly once, dispatch the three run stages to every inline domain,
//! queue the same stage invocations to delegated branch workers, authorize
//! the workers once, and block until every branch reports its contribution
//! complete.
//!
//! This thread is the only one that begins or finishes structural mutation;
//! everything else enqueues tasks.

use std::sync::Arc;

use crate::recall::{RecallId, ScopeFlags, Stage};
use crate::routing::{self, Audio, Channel};
use crate::task::{DrainReport, FnTask, TaskQueue};
use crate::worker::{WorkerEntry, WorkerHandle};

use super::config::{SoundcardConfig, TickContext};
use super::control::MessageReceiver;
use super::delay::DelayCounter;

/// A domain the loop dispatches stages to.
#[derive(Clone)]
pub enum PlayDomain {
    Channel(Arc<Channel>),
    Audio(Arc<Audio>),
}

impl PlayDomain {
    fn play(&self, scope: ScopeFlags, stage: Stage, tick: &TickContext) {
        match self {
            PlayDomain::Channel(channel) => channel.play(scope, stage, tick),
            PlayDomain::Audio(audio) => audio.play(scope, stage, tick),
        }
    }

    fn worker_entry(&self, scope: ScopeFlags, stage: Stage) -> WorkerEntry {
        match self {
            PlayDomain::Channel(channel) => WorkerEntry::Channel {
                channel: channel.clone(),
                scope,
                stage,
            },
            PlayDomain::Audio(audio) => WorkerEntry::Audio {
                audio: audio.clone(),
                scope,
                stage,
            },
        }
    }
}

struct Branch {
    worker: WorkerHandle,
    domains: Vec<(PlayDomain, ScopeFlags)>,
}

/// Outcome of one tick.
#[derive(Debug, Clone, Copy)]
pub struct TickReport {
    pub tick: TickContext,
    pub tasks: DrainReport,
    /// Stage invocations executed by branch workers this tick.
    pub delegated: usize,
}

pub struct AudioLoop {
    delay: DelayCounter,
    task_queue: Arc<TaskQueue>,
    inline: Vec<(PlayDomain, ScopeFlags)>,
    branches: Vec<Branch>,
    control: Option<Box<dyn MessageReceiver + Send>>,
}

impl AudioLoop {
    pub fn new(config: SoundcardConfig) -> Self {
        Self {
            delay: DelayCounter::new(config),
            task_queue: Arc::new(TaskQueue::new()),
            inline: Vec::new(),
            branches: Vec::new(),
            control: None,
        }
    }

    /// The structural-mutation queue. Producers on any thread append;
    /// only `run_tick` drains.
    pub fn task_queue(&self) -> Arc<TaskQueue> {
        self.task_queue.clone()
    }

    /// Install the control inlet drained at every tick boundary.
    pub fn set_control(&mut self, receiver: impl MessageReceiver + Send + 'static) {
        self.control = Some(Box::new(receiver));
    }

    /// Register a domain played inline on the clock thread.
    pub fn add_channel(&mut self, channel: Arc<Channel>, scope: ScopeFlags) {
        self.inline.push((PlayDomain::Channel(channel), scope));
    }

    pub fn add_audio(&mut self, audio: Arc<Audio>, scope: ScopeFlags) {
        self.inline.push((PlayDomain::Audio(audio), scope));
    }

    /// Delegate a set of domains to their own branch worker. The branch
    /// covers the half-open recycling range; restructuring that range must
    /// hold the worker's branch lock.
    pub fn delegate_branch(
        &mut self,
        first_recycling: usize,
        last_recycling: usize,
        domains: Vec<(PlayDomain, ScopeFlags)>,
    ) -> &WorkerHandle {
        let worker = WorkerHandle::spawn(first_recycling, last_recycling);
        self.branches.push(Branch { worker, domains });
        &self.branches.last().expect("just pushed").worker
    }

    /// Start a run on a channel chain: manufacture identities, duplicate
    /// templates, run the three init stages.
    pub fn start_run(&mut self, channel: &Arc<Channel>, scope: ScopeFlags) -> Arc<RecallId> {
        let tick = self.delay.current();
        let id = routing::start_run(channel, scope);
        routing::init_run(channel, scope, &tick);
        log::debug!("run started on channel {}", channel.index());
        id
    }

    /// Cancel a run and schedule the unlink of its instances for the next
    /// drain. Cancellation itself only marks and disconnects; the tree shape
    /// changes inside the task.
    pub fn cancel_run(&self, channel: &Arc<Channel>, id: &Arc<RecallId>) {
        routing::cancel_run(channel, id);

        let targets = routing::chain_identities(channel, id);
        self.task_queue.append(Box::new(FnTask::new("unlink-run", move || {
            for (channel, id) in &targets {
                {
                    let mut graph = channel.graph();
                    for root in graph.roots_for(id) {
                        graph.remove_root(root);
                    }
                }
                channel.unregister_recall_id(id);
            }
            Ok(())
        })));
    }

    /// Drive one tick.
    pub fn run_tick(&mut self) -> TickReport {
        let tick = self.delay.advance();

        if let Some(control) = self.control.as_mut() {
            while let Some(message) = control.pop() {
                message.apply();
            }
        }

        let tasks = self.task_queue.drain();

        for stage in Stage::RUN {
            for (domain, scope) in &self.inline {
                domain.play(*scope, stage, &tick);
            }
            for branch in &self.branches {
                for (domain, scope) in &branch.domains {
                    branch.worker.queue(domain.worker_entry(*scope, stage));
                }
            }
        }

        for branch in &self.branches {
            if let Err(e) = branch.worker.authorize_tick(tick) {
                log::warn!(
                    "branch {:?} not authorized: {}",
                    branch.worker.recycling_range(),
                    e
                );
            }
        }
        let mut delegated = 0;
        for branch in &self.branches {
            match branch.worker.wait_tick_done() {
                Ok(summary) => delegated += summary.executed,
                Err(e) => log::warn!(
                    "branch {:?} lost: {}",
                    branch.worker.recycling_range(),
                    e
                ),
            }
        }

        TickReport {
            tick,
            tasks,
            delegated,
        }
    }

    /// Stop and join every branch worker.
    pub fn shutdown(&mut self) {
        for branch in self.branches.drain(..) {
            branch.worker.shutdown();
        }
    }
}
