use crate::core::clip::ClipData;
use crate::core::interval::partition;
use crate::core::phase::{PhaseAssignment, PhaseFunction};
use crate::core::velocity::VelocityProfile;
use crate::evo::individual::{GENE_COUNT, Genes};
use crate::evo::phenotype::Deriv;
use crate::evo::population::{Bounds, EvolveCtx, FitnessTargets, Population};
use tracing::debug;

/// Search-space and scheduling knobs for the optimizer.
#[derive(Debug, Clone)]
pub struct EvolutionSettings {
    pub bounds: Bounds,
    /// Probability of breeding an offspring instead of rerolling it.
    pub behaviour: f32,
    /// Cross-fade width at interval seams in [0,1]; 0 disables blending.
    pub blending: f32,
    pub window_sec: f32,
    pub steep_penalty: bool,
}

impl Default for EvolutionSettings {
    fn default() -> Self {
        Self {
            bounds: Bounds::new(10.0, 2.5, std::f32::consts::PI, 10.0, 5.0),
            behaviour: 1.0,
            blending: 1.0,
            window_sec: 5.0,
            steep_penalty: true,
        }
    }
}

/// Anytime optimizer over one clip: one population per window interval,
/// advanced a single generation per [`PhaseEvolution::tick`], with seam
/// blending and keyframe extraction on every commit.
pub struct PhaseEvolution {
    settings: EvolutionSettings,
    framerate: f32,
    total_frames: usize,
    seed: u64,
    populations: Vec<Population>,
    ticks: u64,
}

impl PhaseEvolution {
    pub fn new(
        clip: &ClipData,
        settings: EvolutionSettings,
        seed: u64,
        profile: &VelocityProfile,
    ) -> Self {
        let mut evolution = Self {
            settings,
            framerate: clip.framerate,
            total_frames: clip.total_frames(),
            seed,
            populations: Vec::new(),
            ticks: 0,
        };
        evolution.rebuild(clip, profile);
        evolution
    }

    /// Repartition the timeline and restart every population. Runs on
    /// construction and whenever the window length changes.
    fn rebuild(&mut self, clip: &ClipData, profile: &VelocityProfile) {
        let ctx = EvolveCtx {
            bounds: &self.settings.bounds,
            behaviour: self.settings.behaviour,
            steep_penalty: self.settings.steep_penalty,
            targets: FitnessTargets {
                same: &profile.regular,
                opposite: &profile.inverse,
            },
        };
        let intervals = partition(clip, self.settings.window_sec);
        self.populations = intervals
            .iter()
            .enumerate()
            .map(|(i, &interval)| {
                Population::new(
                    interval,
                    self.framerate,
                    self.seed.wrapping_add(i as u64),
                    &ctx,
                )
            })
            .collect();
        self.ticks = 0;
        debug!(
            windows = self.populations.len(),
            window_sec = self.settings.window_sec,
            "initialised populations"
        );
    }

    pub fn settings(&self) -> &EvolutionSettings {
        &self.settings
    }

    pub fn populations(&self) -> &[Population] {
        &self.populations
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn set_window(&mut self, value: f32, clip: &ClipData, profile: &VelocityProfile) {
        if value != self.settings.window_sec {
            self.settings.window_sec = value;
            self.rebuild(clip, profile);
        }
    }

    pub fn set_behaviour(&mut self, value: f32) {
        self.settings.behaviour = value.clamp(0.0, 1.0);
    }

    pub fn set_blending(&mut self, value: f32) {
        self.settings.blending = value.clamp(0.0, 1.0);
    }

    pub fn set_amplitude(&mut self, value: f32) {
        self.settings.bounds.set_amplitude(value);
    }

    pub fn set_frequency(&mut self, value: f32) {
        self.settings.bounds.set_frequency(value);
    }

    pub fn set_shift(&mut self, value: f32) {
        self.settings.bounds.set_shift(value);
    }

    pub fn set_offset(&mut self, value: f32) {
        self.settings.bounds.set_offset(value);
    }

    pub fn set_slope(&mut self, value: f32) {
        self.settings.bounds.set_slope(value);
    }

    /// One optimizer generation across all windows, then a full commit into
    /// the phase function. Pivot lookups read the winners snapshotted before
    /// any population advances, so the outcome is independent of window
    /// order.
    pub fn tick(&mut self, profile: &VelocityProfile, fun: &mut PhaseFunction) {
        for population in &mut self.populations {
            let interval = population.interval;
            population.active = profile.interval_energy(interval.start, interval.end) > 0.0;
        }

        let winners: Vec<Genes> = self
            .populations
            .iter()
            .map(|population| population.winner().genes)
            .collect();

        let ctx = EvolveCtx {
            bounds: &self.settings.bounds,
            behaviour: self.settings.behaviour,
            steep_penalty: self.settings.steep_penalty,
            targets: FitnessTargets {
                same: &profile.regular,
                opposite: &profile.inverse,
            },
        };
        for i in 0..self.populations.len() {
            let prev_pivot = pivot_before(&self.populations, &winners, i);
            let next_pivot = pivot_after(&self.populations, &winners, i);
            self.populations[i].evolve(&ctx, &prev_pivot, &next_pivot);
        }

        self.ticks += 1;
        self.assign(fun);
    }

    /// Winning phenotype evaluated at `frame`, cross-faded with the
    /// neighboring window's winner inside the seam band. The band half-width
    /// is `0.5 * (1 - blending)` around the interval midpoint.
    pub fn blended(&self, order: Deriv, interval: usize, frame: usize) -> f32 {
        let count = self.populations.len();
        let idx = interval.min(count - 1);
        let current = &self.populations[idx];
        let value = current
            .phenotype
            .evaluate(&current.winner().genes, frame, order);
        if current.interval.len() < 2 {
            return value;
        }
        let pivot = (frame as f32 - current.interval.start as f32)
            / (current.interval.len() - 1) as f32
            - 0.5;
        let threshold = 0.5 * (1.0 - self.settings.blending);
        let band = 0.5 - threshold;
        if band <= 0.0 {
            return value;
        }
        if pivot < -threshold && idx > 0 {
            let neighbor = &self.populations[idx - 1];
            let other = neighbor
                .phenotype
                .evaluate(&neighbor.winner().genes, frame, order);
            let blend = 0.5 * (pivot + threshold) / -band;
            return (1.0 - blend) * value + blend * other;
        }
        if pivot > threshold && idx + 1 < count {
            let neighbor = &self.populations[idx + 1];
            let other = neighbor
                .phenotype
                .evaluate(&neighbor.winner().genes, frame, order);
            let blend = 0.5 * (pivot - threshold) / band;
            return (1.0 - blend) * value + blend * other;
        }
        value
    }

    /// Publish the current winners: blended cycle signal, its min-max
    /// normalised form, and keyframes at the curvature sign changes, all
    /// handed to the phase function in a single commit.
    fn assign(&self, fun: &mut PhaseFunction) {
        let frames = self.total_frames;
        let mut cycle = vec![0.0f32; frames];
        let mut min = f32::MAX;
        let mut max = f32::MIN;
        for (i, population) in self.populations.iter().enumerate() {
            for j in population.interval.start..=population.interval.end {
                let value = self.blended(Deriv::Value, i, j);
                cycle[j] = value;
                min = min.min(value);
                max = max.max(value);
            }
        }

        let span = max - min;
        let normalised_cycle = if span.is_finite() && span > 0.0 {
            cycle.iter().map(|&v| (v - min) / span).collect()
        } else {
            vec![0.0; frames]
        };

        // A key sits where the blended curvature crosses from non-positive
        // to non-negative; the lookahead past the interval end evaluates the
        // analytic model, never the buffers.
        let mut keys = vec![false; frames];
        for (i, population) in self.populations.iter().enumerate() {
            for j in population.interval.start..=population.interval.end {
                if self.blended(Deriv::Second, i, j) <= 0.0
                    && self.blended(Deriv::Second, i, j + 1) >= 0.0
                {
                    keys[j] = true;
                }
            }
        }

        fun.commit(PhaseAssignment {
            cycle,
            normalised_cycle,
            keys,
        });
    }

    /// Mean winner fitness across all windows; the anytime progress signal.
    pub fn mean_fitness(&self) -> f32 {
        if self.populations.is_empty() {
            return 0.0;
        }
        let sum: f32 = self
            .populations
            .iter()
            .map(|population| population.fitness())
            .sum();
        sum / self.populations.len() as f32
    }

    /// Per-gene maximum absolute winner value across all windows.
    pub fn peak_configuration(&self) -> Genes {
        let mut peaks = [0.0f32; GENE_COUNT];
        for population in &self.populations {
            for (peak, &gene) in peaks.iter_mut().zip(population.winner().genes.iter()) {
                *peak = peak.max(gene.abs());
            }
        }
        peaks
    }
}

/// Winner genes of the nearest active window before `index`, falling back
/// to the first window.
fn pivot_before(populations: &[Population], winners: &[Genes], index: usize) -> Genes {
    populations[..index]
        .iter()
        .rposition(|population| population.active)
        .map(|j| winners[j])
        .unwrap_or(winners[0])
}

/// Winner genes of the nearest active window after `index`, falling back
/// to the last window.
fn pivot_after(populations: &[Population], winners: &[Genes], index: usize) -> Genes {
    populations[index + 1..]
        .iter()
        .position(|population| population.active)
        .map(|j| winners[index + 1 + j])
        .unwrap_or(winners[winners.len() - 1])
}
