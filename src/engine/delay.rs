//! Sequencer subdivision counters derived from the soundcard config.

use super::config::{SoundcardConfig, TickContext};

/// Turns the stream of buffer callbacks into per-tick counters: absolute
/// tick, step counter, and the sub-step offset recalls use to tell a fresh
/// grid step from an interpolated sub-frame.
pub struct DelayCounter {
    config: SoundcardConfig,
    /// Ticks per sequencer step, fixed at construction.
    delay: u64,
    tick: u64,
}

impl DelayCounter {
    pub fn new(config: SoundcardConfig) -> Self {
        Self {
            config,
            delay: config.ticks_per_step(),
            tick: 0,
        }
    }

    /// The context of the tick about to run, without advancing.
    pub fn current(&self) -> TickContext {
        self.context_at(self.tick)
    }

    /// Produce the next tick's context and advance.
    pub fn advance(&mut self) -> TickContext {
        let context = self.context_at(self.tick);
        self.tick += 1;
        context
    }

    fn context_at(&self, tick: u64) -> TickContext {
        TickContext {
            sample_rate: self.config.sample_rate,
            buffer_size: self.config.buffer_size,
            tick,
            delay: self.delay,
            sub_offset: tick % self.delay,
            note_offset: tick / self.delay,
            attack: 0,
        }
    }
}
