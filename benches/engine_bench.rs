//! Benchmarks for the per-tick hot paths.
//!
//! Run with: cargo bench
//!
//! The clock thread has one buffer period to finish a whole tick: drain the
//! task queue, walk every recall tree, touch the pattern store. Reference
//! deadlines at 44.1kHz:
//!   - 256 frames  = 5.8ms per tick
//!   - 512 frames  = 11.6ms per tick
//!   - 1024 frames = 23.2ms per tick
//!
//! Benchmark groups:
//!   - pattern/*   Bit store reads, toggles and resizes
//!   - recall/*    Stage traversal over growing trees
//!   - task/*      Queue append/drain cycles

use std::hint::black_box;
use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use tactus::engine::TickContext;
use tactus::pattern::store::PatternDim;
use tactus::pattern::Pattern;
use tactus::recall::providers::Passthrough;
use tactus::recall::{RecallGraph, RecallId, RecyclingContext, ScopeFlags, Stage};
use tactus::task::{FnTask, TaskQueue};

const STEP_COUNTS: &[usize] = &[16, 64, 256];

fn tick() -> TickContext {
    TickContext {
        sample_rate: 44_100,
        buffer_size: 512,
        tick: 0,
        delay: 11,
        sub_offset: 0,
        note_offset: 0,
        attack: 0,
    }
}

fn bench_pattern(c: &mut Criterion) {
    let mut group = c.benchmark_group("pattern");

    for &steps in STEP_COUNTS {
        let pattern = Pattern::new(
            PatternDim {
                bank0: 4,
                bank1: 4,
                steps,
            },
            0,
        );
        pattern.toggle_bit(0, 0, steps / 2);

        group.bench_with_input(BenchmarkId::new("get_bit", steps), &steps, |b, &steps| {
            b.iter(|| pattern.get_bit(black_box(0), black_box(0), black_box(steps / 2)))
        });

        group.bench_with_input(BenchmarkId::new("toggle_bit", steps), &steps, |b, &steps| {
            b.iter(|| pattern.toggle_bit(black_box(0), black_box(0), black_box(steps - 1)))
        });
    }

    group.bench_function("set_dim/grow_steps", |b| {
        b.iter(|| {
            let pattern = Pattern::new(
                PatternDim {
                    bank0: 4,
                    bank1: 4,
                    steps: 16,
                },
                0,
            );
            pattern.set_dim(black_box(PatternDim {
                bank0: 4,
                bank1: 4,
                steps: 256,
            }));
        })
    });

    group.finish();
}

fn bench_recall(c: &mut Criterion) {
    let mut group = c.benchmark_group("recall");
    let tick = tick();

    for &width in &[4usize, 16, 64] {
        // One root with `width` children, each with one grandchild.
        let mut graph = RecallGraph::new();
        let id = RecallId::new(RecyclingContext::new(0, 1), ScopeFlags::sequencer());
        let template = graph.add_template("node", Box::new(Passthrough::new("node")));
        let root = graph.duplicate(template, &id).unwrap();
        for _ in 0..width {
            let child = graph.duplicate(template, &id).unwrap();
            let grandchild = graph.duplicate(template, &id).unwrap();
            graph.attach_child(root, child);
            graph.attach_child(child, grandchild);
        }

        group.bench_with_input(
            BenchmarkId::new("run_stage", width),
            &width,
            |b, _| {
                b.iter(|| graph.run_stage(black_box(root), Stage::Pre, &tick));
            },
        );
    }

    group.finish();
}

fn bench_task_queue(c: &mut Criterion) {
    let mut group = c.benchmark_group("task");

    for &batch in &[4usize, 32, 128] {
        group.bench_with_input(
            BenchmarkId::new("append_drain", batch),
            &batch,
            |b, &batch| {
                let queue = Arc::new(TaskQueue::new());
                b.iter(|| {
                    for _ in 0..batch {
                        queue.append(Box::new(FnTask::new("noop", || Ok(()))));
                    }
                    black_box(queue.drain());
                })
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_pattern, bench_recall, bench_task_queue);
criterion_main!(benches);
