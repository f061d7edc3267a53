//! Soundcard-facing configuration and the per-tick view handed to recalls.

/// What the soundcard collaborator tells us about the stream.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SoundcardConfig {
    pub sample_rate: u32,
    pub buffer_size: u32,
    pub bpm: f64,
}

impl Default for SoundcardConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            buffer_size: 512,
            bpm: 120.0,
        }
    }
}

impl SoundcardConfig {
    /// Buffer callbacks per second.
    pub fn tick_rate(&self) -> f64 {
        self.sample_rate as f64 / self.buffer_size as f64
    }

    /// Ticks per sequencer step (16th notes: four subdivisions per beat),
    /// floored to at least one tick.
    pub fn ticks_per_step(&self) -> u64 {
        let seconds_per_step = 60.0 / self.bpm / 4.0;
        ((seconds_per_step * self.tick_rate()).round() as u64).max(1)
    }
}

/// Per-tick counters consumed by recalls.
///
/// `sub_offset` is the tick position inside the current sequencer step; a
/// value of zero marks a fresh grid step rather than an interpolated
/// sub-frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickContext {
    pub sample_rate: u32,
    pub buffer_size: u32,
    /// Absolute tick counter since the loop started.
    pub tick: u64,
    /// Ticks per sequencer step.
    pub delay: u64,
    /// Tick position inside the current step.
    pub sub_offset: u64,
    /// Absolute step counter.
    pub note_offset: u64,
    /// Sample offset of the step edge inside the current buffer.
    pub attack: u32,
}

impl TickContext {
    /// True when this tick marks a new grid step.
    pub fn is_step_boundary(&self) -> bool {
        self.sub_offset == 0
    }

    /// The current step wrapped to a cycle of `steps`.
    pub fn step(&self, steps: usize) -> usize {
        (self.note_offset % steps as u64) as usize
    }
}
