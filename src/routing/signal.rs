//! Audio signals produced into recyclings.

use std::sync::Arc;

use crate::engine::config::TickContext;
use crate::recall::RecallId;

/// Envelope parameters a fresh signal is wired with.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Envelope {
    pub attack: f64,
    pub decay: f64,
    pub sustain: f64,
    pub release: f64,
}

impl Default for Envelope {
    fn default() -> Self {
        Self {
            attack: 0.25,
            decay: 0.25,
            sustain: 0.5,
            release: 0.25,
        }
    }
}

/// One produced signal, bound to the run identity that produced it.
#[derive(Debug)]
pub struct AudioSignal {
    recall_id: Option<Arc<RecallId>>,
    /// Step counter at production time.
    note: u64,
    delay: u64,
    attack: u32,
    envelope: Envelope,
}

impl AudioSignal {
    /// Allocate a signal with default envelope parameters, stamped from the
    /// producing tick.
    pub fn new(recall_id: Option<Arc<RecallId>>, tick: &TickContext) -> Arc<Self> {
        Arc::new(Self {
            recall_id,
            note: tick.note_offset,
            delay: tick.delay,
            attack: tick.attack,
            envelope: Envelope::default(),
        })
    }

    pub fn recall_id(&self) -> Option<&Arc<RecallId>> {
        self.recall_id.as_ref()
    }

    pub fn note(&self) -> u64 {
        self.note
    }

    pub fn delay(&self) -> u64 {
        self.delay
    }

    pub fn attack(&self) -> u32 {
        self.attack
    }

    pub fn envelope(&self) -> Envelope {
        self.envelope
    }
}
