/// One lifecycle phase of a recall run.
///
/// The three init stages run once when a run starts; the three run stages
/// cycle every tick for the lifetime of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Stage {
    InitPre,
    InitInter,
    InitPost,
    Pre,
    Inter,
    Post,
}

impl Stage {
    /// Run-start stages, in dispatch order.
    pub const INIT: [Stage; 3] = [Stage::InitPre, Stage::InitInter, Stage::InitPost];

    /// Per-tick stages, in dispatch order.
    pub const RUN: [Stage; 3] = [Stage::Pre, Stage::Inter, Stage::Post];

    pub fn is_init(self) -> bool {
        matches!(self, Stage::InitPre | Stage::InitInter | Stage::InitPost)
    }
}
