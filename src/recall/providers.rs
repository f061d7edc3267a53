//! Stock behaviors: the inert passthrough and the two counter providers
//! other recalls declare dependencies on.

use crate::engine::config::TickContext;

use super::dependency::Orientation;
use super::node::{RecallBehavior, RecallGraph, RecallHandle};
use super::stage::Stage;

/// Behavior that only recurses. Useful as a grouping parent and in tests.
pub struct Passthrough {
    kind: &'static str,
    orientation: Orientation,
}

impl Passthrough {
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            orientation: Orientation::Output,
        }
    }

    pub fn with_orientation(kind: &'static str, orientation: Orientation) -> Self {
        Self { kind, orientation }
    }
}

impl RecallBehavior for Passthrough {
    fn kind(&self) -> &'static str {
        self.kind
    }

    fn orientation(&self) -> Orientation {
        self.orientation
    }

    fn duplicate(&self) -> Box<dyn RecallBehavior> {
        Box::new(Passthrough {
            kind: self.kind,
            orientation: self.orientation,
        })
    }
}

/// Sequencer subdivision counter. Announces readiness to its dependents at
/// run start and mirrors the step counter every boundary tick.
#[derive(Default)]
pub struct DelayRun {
    steps_seen: u64,
}

impl DelayRun {
    pub const KIND: &'static str = "delay-audio-run";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn steps_seen(&self) -> u64 {
        self.steps_seen
    }
}

impl RecallBehavior for DelayRun {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn orientation(&self) -> Orientation {
        Orientation::Input
    }

    fn run_stage(
        &mut self,
        graph: &mut RecallGraph,
        handle: RecallHandle,
        stage: Stage,
        tick: &TickContext,
    ) {
        match stage {
            Stage::InitPost => graph.announce_dependency(handle, 1),
            Stage::Pre if tick.is_step_boundary() => self.steps_seen += 1,
            _ => {}
        }
        graph.run_children(handle, stage, tick);
    }

    fn duplicate(&self) -> Box<dyn RecallBehavior> {
        // Counters are in-flight data and start fresh on the duplicate.
        Box::new(DelayRun::default())
    }
}

/// Beat counter (four steps per beat). Same announce discipline as
/// [`DelayRun`], attached to the output side.
#[derive(Default)]
pub struct CountBeatsRun {
    beats_seen: u64,
}

impl CountBeatsRun {
    pub const KIND: &'static str = "count-beats-audio-run";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn beats_seen(&self) -> u64 {
        self.beats_seen
    }
}

impl RecallBehavior for CountBeatsRun {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn run_stage(
        &mut self,
        graph: &mut RecallGraph,
        handle: RecallHandle,
        stage: Stage,
        tick: &TickContext,
    ) {
        match stage {
            Stage::InitPost => graph.announce_dependency(handle, 1),
            Stage::Pre if tick.is_step_boundary() && tick.note_offset % 4 == 0 => {
                self.beats_seen += 1;
            }
            _ => {}
        }
        graph.run_children(handle, stage, tick);
    }

    fn duplicate(&self) -> Box<dyn RecallBehavior> {
        Box::new(CountBeatsRun::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recall::context::RecyclingContext;
    use crate::recall::dependency::RecallDependency;
    use crate::recall::id::{RecallId, ScopeFlags};

    fn tick_at(note_offset: u64, sub_offset: u64) -> TickContext {
        TickContext {
            sample_rate: 44_100,
            buffer_size: 512,
            tick: 0,
            delay: 11,
            sub_offset,
            note_offset,
            attack: 0,
        }
    }

    #[test]
    fn test_delay_run_announces_at_init_post() {
        let mut graph = RecallGraph::new();
        let id = RecallId::new(RecyclingContext::new(0, 1), ScopeFlags::sequencer());

        let delay_template = graph.add_template("delay", Box::new(DelayRun::new()));
        let delay = graph.duplicate(delay_template, &id).unwrap();

        let dependent_template = graph.add_template(
            "copy",
            Box::new(Passthrough::with_orientation("copy", Orientation::Input)),
        );
        graph.set_dependencies(
            dependent_template,
            vec![RecallDependency::new(DelayRun::KIND, Orientation::Input)],
        );
        let dependent = graph.duplicate(dependent_template, &id).unwrap();

        assert!(!graph.get(dependent).unwrap().is_ready());
        graph.run_stage(delay, Stage::InitPost, &tick_at(0, 0));
        assert!(graph.get(dependent).unwrap().is_ready());
    }

    #[test]
    fn test_count_beats_announces_like_delay() {
        let mut graph = RecallGraph::new();
        let id = RecallId::new(RecyclingContext::new(0, 1), ScopeFlags::sequencer());

        let count_template = graph.add_template("count", Box::new(CountBeatsRun::new()));
        let count = graph.duplicate(count_template, &id).unwrap();

        let dependent_template = graph.add_template("copy", Box::new(Passthrough::new("copy")));
        graph.set_dependencies(
            dependent_template,
            vec![RecallDependency::new(CountBeatsRun::KIND, Orientation::Output)],
        );
        let dependent = graph.duplicate(dependent_template, &id).unwrap();

        graph.run_stage(count, Stage::InitPost, &tick_at(0, 0));
        assert_eq!(
            graph.get(dependent).unwrap().dependency_ready(CountBeatsRun::KIND),
            1
        );
        // Sub-frame ticks dispatch cleanly without re-announcing.
        graph.run_stage(count, Stage::Pre, &tick_at(0, 1));
        assert_eq!(
            graph.get(dependent).unwrap().dependency_ready(CountBeatsRun::KIND),
            1
        );
    }
}
