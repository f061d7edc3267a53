//! End-to-end run lifecycle: template installation, run start, staged ticks,
//! signal production, cancellation and deferred unlink.

use std::sync::Arc;

use tactus::engine::{AudioLoop, PlayDomain, SoundcardConfig};
use tactus::pattern::store::PatternDim;
use tactus::pattern::Pattern;
use tactus::port::Port;
use tactus::recall::providers::{CountBeatsRun, DelayRun};
use tactus::recall::{CopyPattern, ScopeFlags};
use tactus::routing::{Audio, Channel};
use tactus::task::FnTask;

/// One tick per sequencer step.
fn step_config() -> SoundcardConfig {
    SoundcardConfig {
        sample_rate: 48_000,
        buffer_size: 48_000,
        bpm: 240.0,
    }
}

fn pattern_16() -> Arc<Pattern> {
    Pattern::new(
        PatternDim {
            bank0: 1,
            bank1: 1,
            steps: 16,
        },
        0,
    )
}

/// A sequencer machine feeding a downstream synth machine, with the full
/// template set on the sequencer channel.
fn machine_pair() -> (Arc<Channel>, Arc<Channel>, Arc<Pattern>) {
    let sequencer = Audio::new("drum-machine", 1, 2, 0);
    let synth = Audio::new("synth", 1, 2, 2);
    let top = sequencer.channel(0).unwrap().clone();
    let down = synth.channel(0).unwrap().clone();
    top.set_link(Some(down.clone()));

    let pattern = pattern_16();
    {
        let mut graph = top.graph();
        graph.add_template("delay", Box::new(DelayRun::new()));
        graph.add_template("count-beats", Box::new(CountBeatsRun::new()));
    }
    CopyPattern::install(
        &top,
        pattern.clone(),
        Port::uint("bank-index-0", 0),
        Port::uint("bank-index-1", 0),
    );

    (top, down, pattern)
}

#[test]
fn full_sequencer_cycle_produces_into_child_identity() {
    let (top, down, pattern) = machine_pair();
    pattern.toggle_bit(0, 0, 0);
    pattern.toggle_bit(0, 0, 4);
    pattern.toggle_bit(0, 0, 8);

    let mut audio_loop = AudioLoop::new(step_config());
    audio_loop.add_channel(top.clone(), ScopeFlags::sequencer());

    let id = audio_loop.start_run(&top, ScopeFlags::sequencer());
    for _ in 0..16 {
        audio_loop.run_tick();
    }

    // Three steps hit, one signal each per recycling of the top channel.
    for recycling in top.recyclings() {
        assert_eq!(recycling.signal_count(), 3);
    }

    // Every signal is bound to the downstream child identity, not the local
    // one.
    let child_context = id.context().child_at(0).unwrap();
    let child_id = down.find_recall_id_by_context(&child_context).unwrap();
    for signal in top.recyclings()[0].signals() {
        assert!(Arc::ptr_eq(signal.recall_id().unwrap(), &child_id));
    }
}

#[test]
fn cancel_then_drain_leaves_only_templates() {
    let (top, down, pattern) = machine_pair();
    pattern.toggle_bit(0, 0, 0);

    let mut audio_loop = AudioLoop::new(step_config());
    audio_loop.add_channel(top.clone(), ScopeFlags::sequencer());

    let id = audio_loop.start_run(&top, ScopeFlags::sequencer());
    audio_loop.run_tick();
    let produced = top.recyclings()[0].signal_count();
    assert_eq!(produced, 1);

    audio_loop.cancel_run(&top, &id);
    // Cancellation is cooperative: instances are hidden, not yet unlinked.
    assert_eq!(top.graph().len(), 6);

    audio_loop.run_tick();

    // The drain unlinked all three instances on the top channel and the
    // downstream instance ledger entry.
    assert_eq!(top.graph().len(), 3);
    assert_eq!(top.recall_id_count(), 0);
    assert_eq!(down.recall_id_count(), 0);

    // A canceled run produces nothing more.
    audio_loop.run_tick();
    assert_eq!(top.recyclings()[0].signal_count(), produced);
}

#[test]
fn concurrent_runs_are_isolated_by_scope_and_context() {
    let (top, _down, pattern) = machine_pair();
    pattern.toggle_bit(0, 0, 0);

    let mut audio_loop = AudioLoop::new(step_config());
    audio_loop.add_channel(top.clone(), ScopeFlags::sequencer());

    let play_id = audio_loop.start_run(&top, ScopeFlags::playback());
    let seq_id = audio_loop.start_run(&top, ScopeFlags::sequencer());
    assert!(!Arc::ptr_eq(play_id.context(), seq_id.context()));

    audio_loop.run_tick();

    // Only the sequencer-scoped instances played: one production, not two.
    assert_eq!(top.recyclings()[0].signal_count(), 1);
}

#[test]
fn structural_tasks_run_between_stages_never_inside() {
    let (top, _down, pattern) = machine_pair();
    pattern.toggle_bit(0, 0, 0);

    let mut audio_loop = AudioLoop::new(step_config());
    audio_loop.add_channel(top.clone(), ScopeFlags::sequencer());
    audio_loop.start_run(&top, ScopeFlags::sequencer());

    // A task that restructures the channel's container while runs exist.
    let task_channel = top.clone();
    let queue = audio_loop.task_queue();
    queue.append(Box::new(FnTask::new("add-template", move || {
        task_channel
            .graph()
            .add_template("late-delay", Box::new(DelayRun::new()));
        Ok(())
    })));

    let before = top.graph().len();
    let report = audio_loop.run_tick();

    assert_eq!(report.tasks.launched, 1);
    assert_eq!(top.graph().len(), before + 1);
    // The tick still played normally after the drain.
    assert_eq!(top.recyclings()[0].signal_count(), 1);
}

#[test]
fn delegated_branch_matches_inline_behavior() {
    let (inline_top, _d1, inline_pattern) = machine_pair();
    let (branch_top, _d2, branch_pattern) = machine_pair();
    for pattern in [&inline_pattern, &branch_pattern] {
        pattern.toggle_bit(0, 0, 0);
        pattern.toggle_bit(0, 0, 2);
    }

    let mut audio_loop = AudioLoop::new(step_config());
    audio_loop.add_channel(inline_top.clone(), ScopeFlags::sequencer());
    let (first, last) = branch_top.recycling_range();
    audio_loop.delegate_branch(
        first,
        last,
        vec![(
            PlayDomain::Channel(branch_top.clone()),
            ScopeFlags::sequencer(),
        )],
    );

    audio_loop.start_run(&inline_top, ScopeFlags::sequencer());
    audio_loop.start_run(&branch_top, ScopeFlags::sequencer());
    for _ in 0..4 {
        audio_loop.run_tick();
    }
    audio_loop.shutdown();

    assert_eq!(
        inline_top.recyclings()[0].signal_count(),
        branch_top.recyclings()[0].signal_count()
    );
    assert_eq!(branch_top.recyclings()[0].signal_count(), 2);
}
