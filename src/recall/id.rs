//! Run identity.
//!
//! A `RecallId` names one concurrent run traversing the routing tree: the
//! recycling context it operates on plus the sound scopes it belongs to.
//! Ids are shared (`Arc`), never owned by the recalls that carry them.

use std::sync::Arc;

use super::context::RecyclingContext;

/// Sound scopes a run belongs to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScopeFlags {
    pub playback: bool,
    pub sequencer: bool,
    pub notation: bool,
}

impl ScopeFlags {
    pub fn playback() -> Self {
        Self {
            playback: true,
            ..Self::default()
        }
    }

    pub fn sequencer() -> Self {
        Self {
            sequencer: true,
            ..Self::default()
        }
    }

    pub fn notation() -> Self {
        Self {
            notation: true,
            ..Self::default()
        }
    }

    /// True when the two scope sets share at least one scope.
    pub fn intersects(self, other: ScopeFlags) -> bool {
        (self.playback && other.playback)
            || (self.sequencer && other.sequencer)
            || (self.notation && other.notation)
    }
}

/// Identity of one run: a recycling context plus scope flags.
#[derive(Debug)]
pub struct RecallId {
    context: Arc<RecyclingContext>,
    scope: ScopeFlags,
}

impl RecallId {
    pub fn new(context: Arc<RecyclingContext>, scope: ScopeFlags) -> Arc<Self> {
        Arc::new(Self { context, scope })
    }

    pub fn context(&self) -> &Arc<RecyclingContext> {
        &self.context
    }

    pub fn scope(&self) -> ScopeFlags {
        self.scope
    }
}
