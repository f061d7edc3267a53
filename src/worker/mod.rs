/*
Branch workers
==============

A branch worker executes queued stage invocations for one contiguous branch
of the routing tree on its own thread, so independent branches can run their
per-tick work in parallel. Delegation is opt-in per branch.

Synchronization follows the "authorize, then drain once" contract with one
bounded single-producer channel per direction: the clock thread authorizes a
tick, the worker swaps out its whole queue, executes every entry in FIFO
order while holding the branch lock, then reports completion. Entries queued
after the swap wait for the next authorized tick. The branch lock is shared
with any other thread that restructures the same branch; it is held for the
whole drain, not per entry.

Every `authorize_tick` must be paired with a `wait_tick_done` before the
next authorization.
*/

use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use parking_lot::Mutex;

use crate::engine::config::TickContext;
use crate::recall::{ScopeFlags, Stage};
use crate::routing::{Audio, Channel};
use crate::{Error, Result};

/// One queued stage invocation.
pub enum WorkerEntry {
    Channel {
        channel: Arc<Channel>,
        scope: ScopeFlags,
        stage: Stage,
    },
    Audio {
        audio: Arc<Audio>,
        scope: ScopeFlags,
        stage: Stage,
    },
}

impl WorkerEntry {
    fn execute(&self, tick: &TickContext) {
        match self {
            WorkerEntry::Channel {
                channel,
                scope,
                stage,
            } => channel.play(*scope, *stage, tick),
            WorkerEntry::Audio { audio, scope, stage } => audio.play(*scope, *stage, tick),
        }
    }
}

enum TickMessage {
    Tick(TickContext),
    Shutdown,
}

/// What one authorized drain did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrainSummary {
    pub executed: usize,
}

/// Clock-side handle of one branch worker thread.
pub struct WorkerHandle {
    first_recycling: usize,
    last_recycling: usize,
    queue: Arc<Mutex<Vec<WorkerEntry>>>,
    branch_lock: Arc<Mutex<()>>,
    tick_tx: Sender<TickMessage>,
    done_rx: Receiver<DrainSummary>,
    join: Option<JoinHandle<()>>,
}

impl WorkerHandle {
    /// Spawn a worker for the branch covering the half-open recycling range.
    pub fn spawn(first_recycling: usize, last_recycling: usize) -> Self {
        let queue: Arc<Mutex<Vec<WorkerEntry>>> = Arc::new(Mutex::new(Vec::new()));
        let branch_lock = Arc::new(Mutex::new(()));
        let (tick_tx, tick_rx) = bounded(1);
        let (done_tx, done_rx) = bounded(1);

        let thread_queue = queue.clone();
        let thread_lock = branch_lock.clone();
        let join = std::thread::Builder::new()
            .name(format!("branch-{}-{}", first_recycling, last_recycling))
            .spawn(move || worker_loop(thread_queue, thread_lock, tick_rx, done_tx))
            .expect("spawn branch worker");

        Self {
            first_recycling,
            last_recycling,
            queue,
            branch_lock,
            tick_tx,
            done_rx,
            join: Some(join),
        }
    }

    /// Half-open recycling range this worker may execute.
    pub fn recycling_range(&self) -> (usize, usize) {
        (self.first_recycling, self.last_recycling)
    }

    /// The lock every thread restructuring this branch must hold.
    pub fn branch_lock(&self) -> &Arc<Mutex<()>> {
        &self.branch_lock
    }

    /// Append a stage invocation for the next authorized tick.
    pub fn queue(&self, entry: WorkerEntry) {
        self.queue.lock().push(entry);
    }

    pub fn queued(&self) -> usize {
        self.queue.lock().len()
    }

    /// Signal the worker that a new tick has begun.
    pub fn authorize_tick(&self, tick: TickContext) -> Result<()> {
        match self.tick_tx.try_send(TickMessage::Tick(tick)) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(Error::TickAlreadyAuthorized),
            Err(TrySendError::Disconnected(_)) => Err(Error::WorkerShutDown),
        }
    }

    /// Block until the worker reports the authorized drain complete.
    pub fn wait_tick_done(&self) -> Result<DrainSummary> {
        self.done_rx.recv().map_err(|_| Error::WorkerShutDown)
    }

    /// Stop the worker thread and join it.
    pub fn shutdown(mut self) {
        let _ = self.tick_tx.send(TickMessage::Shutdown);
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        let _ = self.tick_tx.try_send(TickMessage::Shutdown);
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

fn worker_loop(
    queue: Arc<Mutex<Vec<WorkerEntry>>>,
    branch_lock: Arc<Mutex<()>>,
    tick_rx: Receiver<TickMessage>,
    done_tx: Sender<DrainSummary>,
) {
    while let Ok(TickMessage::Tick(tick)) = tick_rx.recv() {
        let branch = branch_lock.lock();
        // Swap the whole list out; entries queued from here on belong to the
        // next authorized tick.
        let batch = std::mem::take(&mut *queue.lock());
        let mut executed = 0;
        for entry in &batch {
            entry.execute(&tick);
            executed += 1;
        }
        drop(branch);

        if done_tx.send(DrainSummary { executed }).is_err() {
            break;
        }
    }
}
