//! Crate error type.
//!
//! Most degraded conditions in the engine (unresolvable dependencies, missing
//! recall ids) are logged and survived rather than surfaced as errors; the
//! variants here cover genuine caller mistakes and shutdown races.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("channel index {0} out of range")]
    ChannelOutOfRange(usize),

    #[error("stale recall handle")]
    StaleHandle,

    #[error("worker has shut down")]
    WorkerShutDown,

    #[error("task failed: {0}")]
    TaskFailed(String),

    #[error("worker tick already authorized")]
    TickAlreadyAuthorized,
}

pub type Result<T> = std::result::Result<T, Error>;
