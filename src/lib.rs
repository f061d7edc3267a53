pub mod engine;
pub mod error;
pub mod pattern; // Bit-packed step storage
pub mod port;
pub mod recall; // Duplicable processing nodes and run identity
pub mod routing;
pub mod task;
pub mod worker;

pub use error::{Error, Result};

/// Word width of the pattern bitmap storage.
pub const BITS_PER_WORD: usize = u32::BITS as usize;

/// Default sequencer subdivisions per pattern cycle.
pub const DEFAULT_STEPS: usize = 16;
