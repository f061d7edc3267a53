pub mod audio_loop;
pub mod config;
pub mod control;
pub mod delay;

pub use audio_loop::{AudioLoop, PlayDomain, TickReport};
pub use config::{SoundcardConfig, TickContext};
pub use control::{ControlMessage, MessageReceiver};
pub use delay::DelayCounter;

#[cfg(feature = "rtrb")]
pub use control::control_channel;
