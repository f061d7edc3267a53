//! Declared dependencies between sibling recalls.
//!
//! A template declares which sibling kinds its instances need at run time
//! (the sequencer's delay and beat counters). Duplication carries the
//! declarations over; resolution then finds the already-duplicated sibling
//! instance under the right run identity. Which identity is "right" depends
//! on orientation parity: a recall looking for a dependency on its own side
//! of the tree resolves under its own id, one looking across resolves under
//! the parent context's id.

/// Which side of the routing tree a recall is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Orientation {
    Input,
    Output,
}

/// One declared dependency: the provider kind an instance must find among
/// its siblings once duplicated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecallDependency {
    /// Behavior kind of the provider, e.g. `"delay-audio-run"`.
    pub kind: &'static str,
    pub orientation: Orientation,
}

impl RecallDependency {
    pub fn new(kind: &'static str, orientation: Orientation) -> Self {
        Self { kind, orientation }
    }
}
