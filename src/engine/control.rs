//! Lock-free control inlet.
//!
//! Surfaces push commands into a ring buffer; the clock thread drains them
//! at the top of every tick, before the task queue runs, so port writes and
//! pattern edits land at tick boundaries and never race a stage traversal.

use std::sync::Arc;

use crate::pattern::Pattern;
use crate::port::{Port, PortValue};

pub enum ControlMessage {
    SetPort {
        port: Arc<Port>,
        value: PortValue,
    },
    ToggleBit {
        pattern: Arc<Pattern>,
        bank_0: usize,
        bank_1: usize,
        step: usize,
    },
    SelectBank {
        pattern: Arc<Pattern>,
        bank_0: u64,
        bank_1: u64,
    },
}

impl ControlMessage {
    pub fn apply(self) {
        match self {
            ControlMessage::SetPort { port, value } => port.safe_write(value),
            ControlMessage::ToggleBit {
                pattern,
                bank_0,
                bank_1,
                step,
            } => pattern.toggle_bit(bank_0, bank_1, step),
            ControlMessage::SelectBank {
                pattern,
                bank_0,
                bank_1,
            } => pattern.select_bank(bank_0, bank_1),
        }
    }
}

pub trait MessageReceiver {
    fn pop(&mut self) -> Option<ControlMessage>;
}

#[cfg(feature = "rtrb")]
impl MessageReceiver for rtrb::Consumer<ControlMessage> {
    fn pop(&mut self) -> Option<ControlMessage> {
        rtrb::Consumer::pop(self).ok()
    }
}

/// Build the control ring buffer pair.
#[cfg(feature = "rtrb")]
pub fn control_channel(
    capacity: usize,
) -> (rtrb::Producer<ControlMessage>, rtrb::Consumer<ControlMessage>) {
    rtrb::RingBuffer::new(capacity)
}
