use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam_channel::{Receiver, Sender};

use crate::core::clip::ClipData;
use crate::core::phase::PhaseFunction;
use crate::core::velocity::{VelocityParams, VelocityProfile};
use crate::evo::evolution::{EvolutionSettings, PhaseEvolution};
use crate::evo::individual::Genes;

/// Hot-reloadable optimizer parameters, applied between generations.
#[derive(Debug, Clone)]
pub enum EvolutionUpdate {
    Window(f32),
    Amplitude(f32),
    Frequency(f32),
    Shift(f32),
    Offset(f32),
    Slope(f32),
    Behaviour(f32),
    Blending(f32),
    VelocityCap(f32),
    VelocityThreshold(f32),
    BoneMask(Vec<bool>),
}

/// Published after every generation; the latest one wins.
#[derive(Debug, Clone)]
pub struct PhaseSnapshot {
    pub tick: u64,
    pub mean_fitness: f32,
    /// Per-gene maximum absolute winner value, for host-side display.
    pub peaks: Genes,
    pub phase: Vec<f32>,
    pub keys: Vec<bool>,
    pub cycle: Vec<f32>,
    pub normalised_cycle: Vec<f32>,
}

fn snapshot(evolution: &PhaseEvolution, fun: &PhaseFunction) -> PhaseSnapshot {
    PhaseSnapshot {
        tick: evolution.ticks(),
        mean_fitness: evolution.mean_fitness(),
        peaks: evolution.peak_configuration(),
        phase: fun.phase().to_vec(),
        keys: fun.keys().to_vec(),
        cycle: fun.cycle().to_vec(),
        normalised_cycle: fun.normalised_cycle().to_vec(),
    }
}

/// Optimizer worker: owns the evolution state, advances one generation per
/// loop iteration, applies queued parameter updates between generations,
/// and publishes the latest snapshot for the host thread to consume. Runs
/// until the stop flag is raised or the tick budget (0 = unlimited) is
/// spent, then returns the final phase function.
pub fn run(
    clip: ClipData,
    mut params: VelocityParams,
    settings: EvolutionSettings,
    seed: u64,
    max_ticks: u64,
    stop: Arc<AtomicBool>,
    update_rx: Receiver<EvolutionUpdate>,
    result_tx: Sender<PhaseSnapshot>,
) -> PhaseFunction {
    let mut profile = VelocityProfile::compute(&clip, &params);
    let mut evolution = PhaseEvolution::new(&clip, settings, seed, &profile);
    let mut fun = PhaseFunction::new(clip.total_frames());

    while !stop.load(Ordering::Relaxed) && (max_ticks == 0 || evolution.ticks() < max_ticks) {
        let mut velocity_dirty = false;
        for update in update_rx.try_iter() {
            match update {
                EvolutionUpdate::Window(v) => evolution.set_window(v, &clip, &profile),
                EvolutionUpdate::Amplitude(v) => evolution.set_amplitude(v),
                EvolutionUpdate::Frequency(v) => evolution.set_frequency(v),
                EvolutionUpdate::Shift(v) => evolution.set_shift(v),
                EvolutionUpdate::Offset(v) => evolution.set_offset(v),
                EvolutionUpdate::Slope(v) => evolution.set_slope(v),
                EvolutionUpdate::Behaviour(v) => evolution.set_behaviour(v),
                EvolutionUpdate::Blending(v) => evolution.set_blending(v),
                EvolutionUpdate::VelocityCap(v) => {
                    params.set_cap(v);
                    velocity_dirty = true;
                }
                EvolutionUpdate::VelocityThreshold(v) => {
                    params.set_threshold(v);
                    velocity_dirty = true;
                }
                EvolutionUpdate::BoneMask(mask) => {
                    params.set_selected(mask);
                    velocity_dirty = true;
                }
            }
        }
        if velocity_dirty {
            profile.recompute(&clip, &params);
        }

        evolution.tick(&profile, &mut fun);
        let _ = result_tx.try_send(snapshot(&evolution, &fun));
    }

    fun
}
