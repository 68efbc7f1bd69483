//! Benchmarks for the evolutionary optimizer.
//!
//! Run:
//! - cargo bench

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use cyclefit::core::clip::ClipData;
use cyclefit::core::interval::Interval;
use cyclefit::core::phase::PhaseFunction;
use cyclefit::core::velocity::{VelocityParams, VelocityProfile};
use cyclefit::evo::evolution::{EvolutionSettings, PhaseEvolution};
use cyclefit::evo::population::{Bounds, EvolveCtx, FitnessTargets, Population};
use std::f32::consts::PI;

const FRAMERATE: f32 = 30.0;
const INTERVAL_LENS: [usize; 3] = [30, 150, 600];
const WINDOW_SECS: [f32; 3] = [1.0, 2.5, 5.0];

fn targets(frames: usize) -> Vec<f32> {
    (0..frames)
        .map(|i| {
            let t = i as f32 / FRAMERATE;
            2.0 + 1.5 * (1.5 * t).sin()
        })
        .collect()
}

fn clip(frames: usize) -> ClipData {
    ClipData {
        framerate: FRAMERATE,
        bone_names: vec!["root".into()],
        velocities: targets(frames).into_iter().map(|v| vec![v]).collect(),
        symmetry: Vec::new(),
    }
}

fn bench_population_evolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("population_evolve");
    group.sample_size(50);

    for &len in &INTERVAL_LENS {
        let same = targets(len);
        let opposite = vec![0.0f32; len];
        let bounds = Bounds::new(10.0, 2.5, PI, 10.0, 5.0);
        let ctx = EvolveCtx {
            bounds: &bounds,
            behaviour: 1.0,
            steep_penalty: true,
            targets: FitnessTargets {
                same: &same,
                opposite: &opposite,
            },
        };
        let mut population = Population::new(Interval::new(0, len - 1), FRAMERATE, 7, &ctx);
        let pivot = [0.0f32; 5];

        let id = BenchmarkId::new("frames", len);
        group.bench_function(id, |b| {
            b.iter(|| {
                population.evolve(black_box(&ctx), &pivot, &pivot);
                black_box(population.fitness());
            });
        });
    }

    group.finish();
}

fn bench_evolution_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("evolution_tick");
    group.sample_size(20);

    let clip = clip(300);
    let mut params = VelocityParams::new(1);
    params.select_all();
    let profile = VelocityProfile::compute(&clip, &params);

    for &window_sec in &WINDOW_SECS {
        let settings = EvolutionSettings {
            window_sec,
            ..EvolutionSettings::default()
        };
        let mut evolution = PhaseEvolution::new(&clip, settings, 7, &profile);
        let mut fun = PhaseFunction::new(clip.total_frames());

        let id = BenchmarkId::new("window_sec", format!("{window_sec}"));
        group.bench_function(id, |b| {
            b.iter(|| {
                evolution.tick(black_box(&profile), &mut fun);
                black_box(fun.phase_at(0));
            });
        });
    }

    group.finish();
}

criterion_group!(population_step, bench_population_evolve, bench_evolution_tick);
criterion_main!(population_step);
