/*
Task queue
==========

Anything that changes the shape of the routing tree or a recall container
(add/remove channel, unlink a finished recall) is never performed inline from
a stage traversal. It is wrapped as a task, appended here, and drained
exactly once per tick by the root clock thread.

The queue is double-buffered: `append` pushes onto the pending side under a
short lock, `drain` swaps the whole pending batch out in one move and then
launches the batch under a single global launch lock. A task appended while a
drain is running lands in the next drain's batch, never the current one, and
no two `launch` calls ever overlap.
*/

use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::{Condvar, Mutex};

/// A deferred structural mutation.
pub trait Task: Send {
    fn name(&self) -> &str {
        "task"
    }

    fn launch(&mut self) -> crate::Result<()>;
}

/// Adapter running a closure as a task.
pub struct FnTask<F> {
    name: String,
    f: F,
}

impl<F> FnTask<F>
where
    F: FnMut() -> crate::Result<()> + Send,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> Task for FnTask<F>
where
    F: FnMut() -> crate::Result<()> + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn launch(&mut self) -> crate::Result<()> {
        (self.f)()
    }
}

/// Outcome of one drain cycle. A failing task is skipped and logged, the
/// rest of the batch still runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub launched: usize,
    pub failed: usize,
}

#[derive(Default)]
pub struct TaskQueue {
    pending: Mutex<Vec<Box<dyn Task>>>,
    queued: AtomicUsize,
    launch_lock: Mutex<()>,
    /// Completed drain cycles; bumped under `cycle`'s lock and broadcast.
    cycle: Mutex<u64>,
    drained: Condvar,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Producer side: append one task for the next drain.
    pub fn append(&self, task: Box<dyn Task>) {
        self.pending.lock().push(task);
        self.queued.fetch_add(1, Ordering::SeqCst);
    }

    /// Append several tasks, keeping their relative order.
    pub fn append_batch(&self, tasks: Vec<Box<dyn Task>>) {
        let count = tasks.len();
        self.pending.lock().extend(tasks);
        self.queued.fetch_add(count, Ordering::SeqCst);
    }

    /// Tasks currently waiting for the next drain.
    pub fn queued(&self) -> usize {
        self.queued.load(Ordering::SeqCst)
    }

    /// Consumer side, called once per tick by the clock thread: swap the
    /// pending batch out, launch every task in append order under the global
    /// launch lock, then wake `wait_sync` callers.
    pub fn drain(&self) -> DrainReport {
        let mut executing = {
            let mut pending = self.pending.lock();
            std::mem::take(&mut *pending)
        };
        self.queued.fetch_sub(executing.len(), Ordering::SeqCst);

        let mut report = DrainReport::default();
        {
            let _launch = self.launch_lock.lock();
            for task in executing.iter_mut() {
                match task.launch() {
                    Ok(()) => report.launched += 1,
                    Err(e) => {
                        log::warn!("task '{}' failed: {}", task.name(), e);
                        report.failed += 1;
                    }
                }
            }
        }
        // Release the batch's backing storage before waking waiters.
        drop(executing);

        *self.cycle.lock() += 1;
        self.drained.notify_all();
        report
    }

    /// Block until the next drain cycle completes.
    pub fn wait_sync(&self) {
        let mut cycle = self.cycle.lock();
        let seen = *cycle;
        while *cycle == seen {
            self.drained.wait(&mut cycle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex as StdMutex};

    fn record(trace: &Arc<StdMutex<Vec<&'static str>>>, name: &'static str) -> Box<dyn Task> {
        let trace = trace.clone();
        Box::new(FnTask::new(name, move || {
            trace.lock().unwrap().push(name);
            Ok(())
        }))
    }

    #[test]
    fn test_drain_preserves_append_order() {
        let queue = TaskQueue::new();
        let trace = Arc::new(StdMutex::new(Vec::new()));

        queue.append(record(&trace, "t1"));
        queue.append(record(&trace, "t2"));
        queue.append(record(&trace, "t3"));
        assert_eq!(queue.queued(), 3);

        let report = queue.drain();

        assert_eq!(report, DrainReport { launched: 3, failed: 0 });
        assert_eq!(queue.queued(), 0);
        assert_eq!(*trace.lock().unwrap(), vec!["t1", "t2", "t3"]);
    }

    #[test]
    fn test_each_task_launches_exactly_once() {
        let queue = TaskQueue::new();
        let trace = Arc::new(StdMutex::new(Vec::new()));
        queue.append(record(&trace, "t1"));

        queue.drain();
        queue.drain();

        assert_eq!(*trace.lock().unwrap(), vec!["t1"]);
    }

    #[test]
    fn test_task_appended_mid_drain_lands_in_next_batch() {
        let queue = Arc::new(TaskQueue::new());
        let trace = Arc::new(StdMutex::new(Vec::new()));

        // t1 appends t2 from within its own launch.
        let inner_queue = queue.clone();
        let inner_trace = trace.clone();
        queue.append(Box::new(FnTask::new("t1", move || {
            inner_trace.lock().unwrap().push("t1");
            inner_queue.append(record(&inner_trace, "t2"));
            Ok(())
        })));

        let report = queue.drain();
        assert_eq!(report.launched, 1);
        assert_eq!(*trace.lock().unwrap(), vec!["t1"]);
        assert_eq!(queue.queued(), 1);

        queue.drain();
        assert_eq!(*trace.lock().unwrap(), vec!["t1", "t2"]);
    }

    #[test]
    fn test_failing_task_is_skipped_and_counted() {
        let queue = TaskQueue::new();
        let trace = Arc::new(StdMutex::new(Vec::new()));

        queue.append(record(&trace, "t1"));
        queue.append(Box::new(FnTask::new("boom", || {
            Err(crate::Error::TaskFailed("no such channel".into()))
        })));
        queue.append(record(&trace, "t3"));

        let report = queue.drain();

        assert_eq!(report, DrainReport { launched: 2, failed: 1 });
        assert_eq!(*trace.lock().unwrap(), vec!["t1", "t3"]);
    }

    #[test]
    fn test_append_batch_keeps_order() {
        let queue = TaskQueue::new();
        let trace = Arc::new(StdMutex::new(Vec::new()));

        queue.append_batch(vec![record(&trace, "a"), record(&trace, "b")]);
        queue.append(record(&trace, "c"));
        queue.drain();

        assert_eq!(*trace.lock().unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_wait_sync_wakes_after_drain() {
        let queue = Arc::new(TaskQueue::new());
        let trace = Arc::new(StdMutex::new(Vec::new()));
        queue.append(record(&trace, "t1"));

        let waiter_queue = queue.clone();
        let waiter_trace = trace.clone();
        let waiter = std::thread::spawn(move || {
            waiter_queue.wait_sync();
            // The drain has fully completed by the time we wake.
            assert_eq!(*waiter_trace.lock().unwrap(), vec!["t1"]);
        });

        // Give the waiter a moment to block, then drain.
        std::thread::sleep(std::time::Duration::from_millis(20));
        queue.drain();
        waiter.join().unwrap();
    }
}
