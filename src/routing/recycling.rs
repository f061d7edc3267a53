//! Buffer-pool nodes of the routing tree.

use std::sync::Arc;

use parking_lot::Mutex;

use super::signal::AudioSignal;

/// A recycling pools the signals produced into one routing slot. The lock is
/// taken for the individual list operation only, never across a stage.
pub struct Recycling {
    /// Global index across the routing tree.
    index: usize,
    signals: Mutex<Vec<Arc<AudioSignal>>>,
}

impl Recycling {
    pub fn new(index: usize) -> Arc<Self> {
        Arc::new(Self {
            index,
            signals: Mutex::new(Vec::new()),
        })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn add_signal(&self, signal: Arc<AudioSignal>) {
        self.signals.lock().push(signal);
    }

    pub fn remove_signal(&self, signal: &Arc<AudioSignal>) {
        self.signals.lock().retain(|s| !Arc::ptr_eq(s, signal));
    }

    pub fn signal_count(&self) -> usize {
        self.signals.lock().len()
    }

    /// Snapshot of the current signal list.
    pub fn signals(&self) -> Vec<Arc<AudioSignal>> {
        self.signals.lock().clone()
    }
}
