use crate::core::interval::Interval;
use crate::evo::individual::{
    AMPLITUDE, FREQUENCY, GENE_COUNT, Genes, Individual, OFFSET, SHIFT, SLOPE,
};
use crate::evo::phenotype::Phenotype;
use rand::{Rng, SeedableRng, rngs::SmallRng};

pub const POPULATION_SIZE: usize = 50;

/// Per-gene search bounds. Amplitude, shift, offset, and slope are
/// symmetric around zero; frequency is non-negative.
#[derive(Debug, Clone, Default)]
pub struct Bounds {
    pub lower: Genes,
    pub upper: Genes,
}

impl Bounds {
    pub fn new(amplitude: f32, frequency: f32, shift: f32, offset: f32, slope: f32) -> Self {
        let mut bounds = Self::default();
        bounds.set_amplitude(amplitude);
        bounds.set_frequency(frequency);
        bounds.set_shift(shift);
        bounds.set_offset(offset);
        bounds.set_slope(slope);
        bounds
    }

    pub fn set_amplitude(&mut self, value: f32) {
        self.lower[AMPLITUDE] = -value;
        self.upper[AMPLITUDE] = value;
    }

    pub fn set_frequency(&mut self, value: f32) {
        self.lower[FREQUENCY] = 0.0;
        self.upper[FREQUENCY] = value;
    }

    pub fn set_shift(&mut self, value: f32) {
        self.lower[SHIFT] = -value;
        self.upper[SHIFT] = value;
    }

    pub fn set_offset(&mut self, value: f32) {
        self.lower[OFFSET] = -value;
        self.upper[OFFSET] = value;
    }

    pub fn set_slope(&mut self, value: f32) {
        self.lower[SLOPE] = -value;
        self.upper[SLOPE] = value;
    }

    pub fn span(&self, gene: usize) -> f32 {
        self.upper[gene] - self.lower[gene]
    }

    pub fn clamp_gene(&self, gene: usize, value: f32) -> f32 {
        value.clamp(self.lower[gene], self.upper[gene])
    }
}

/// Velocity targets seen from one polarity: `same` is the polarity being
/// fitted, `opposite` enters the fitness negated.
#[derive(Debug, Clone, Copy)]
pub struct FitnessTargets<'a> {
    pub same: &'a [f32],
    pub opposite: &'a [f32],
}

/// Read-only evolution inputs for one generational step.
#[derive(Debug, Clone, Copy)]
pub struct EvolveCtx<'a> {
    pub bounds: &'a Bounds,
    pub behaviour: f32,
    pub steep_penalty: bool,
    pub targets: FitnessTargets<'a>,
}

/// One evolutionary population bound to one interval. Advances exactly one
/// generation per orchestrator tick.
pub struct Population {
    pub interval: Interval,
    pub phenotype: Phenotype,
    pub active: bool,
    individuals: Vec<Individual>,
    offspring: Vec<Individual>,
    rank_probabilities: Vec<f32>,
    rank_probability_sum: f32,
    rng: SmallRng,
}

impl Population {
    pub fn new(interval: Interval, framerate: f32, seed: u64, ctx: &EvolveCtx) -> Self {
        let size = POPULATION_SIZE;
        let rank_sum = (size * (size + 1)) as f32 / 2.0;
        let rank_probabilities: Vec<f32> =
            (0..size).map(|i| (size - i) as f32 / rank_sum).collect();
        let rank_probability_sum = rank_probabilities.iter().sum();

        let mut population = Self {
            interval,
            phenotype: Phenotype::new(interval, framerate),
            active: true,
            individuals: vec![Individual::default(); size],
            offspring: vec![Individual::default(); size],
            rank_probabilities,
            rank_probability_sum,
            rng: SmallRng::seed_from_u64(seed),
        };

        for i in 0..size {
            let mut genes = [0.0; GENE_COUNT];
            reroll(&mut genes, ctx.bounds, &mut population.rng);
            population.individuals[i].genes = genes;
            population.individuals[i].fitness =
                compute_fitness(&population.phenotype, ctx, &genes);
        }
        sort_by_fitness(&mut population.individuals);
        assign_extinctions(&mut population.individuals);
        population
    }

    pub fn winner(&self) -> &Individual {
        &self.individuals[0]
    }

    pub fn fitness(&self) -> f32 {
        self.winner().fitness
    }

    pub fn individuals(&self) -> &[Individual] {
        &self.individuals
    }

    /// One generational step. Inactive intervals skip the search and are
    /// forced to a degenerate configuration continuous with the nearest
    /// active neighbors' winners.
    pub fn evolve(&mut self, ctx: &EvolveCtx, prev_pivot: &Genes, next_pivot: &Genes) {
        if !self.active {
            self.force_degenerate(prev_pivot, next_pivot);
            return;
        }

        let pheno = self.phenotype;

        // Elitism plus memetic local search.
        let elite = self.individuals[0].clone();
        copy_clamped(&elite, &mut self.offspring[0], ctx.bounds);
        exploit(&pheno, ctx, &mut self.offspring[0], &mut self.rng);

        for o in 1..POPULATION_SIZE {
            if self.rng.random::<f32>() <= ctx.behaviour {
                let pa = self.select_index();
                let mut pb = self.select_index();
                while pb == pa {
                    pb = self.select_index();
                }
                let mut proto = self.select_index();
                while proto == pa || proto == pb {
                    proto = self.select_index();
                }
                let parent_a = self.individuals[pa].clone();
                let parent_b = self.individuals[pb].clone();
                let prototype = self.individuals[proto].clone();

                let mutation_rate = mutation_probability(&parent_a, &parent_b);
                let mutation_strength = mutation_strength(&parent_a, &parent_b);

                let mut genes = [0.0; GENE_COUNT];
                let mut momentum_out = [0.0; GENE_COUNT];
                for i in 0..GENE_COUNT {
                    // Recombination: coin-flip base parent plus combined momentum.
                    let momentum = self.rng.random::<f32>() * parent_a.momentum[i]
                        + self.rng.random::<f32>() * parent_b.momentum[i];
                    let mut gene = if self.rng.random::<f32>() < 0.5 {
                        parent_a.genes[i] + momentum
                    } else {
                        parent_b.genes[i] + momentum
                    };
                    let base = gene;

                    // Mutation scaled by the parents' average extinction.
                    if self.rng.random::<f32>() <= mutation_rate {
                        let amount = mutation_strength * ctx.bounds.span(i);
                        if amount > 0.0 {
                            gene += self.rng.random_range(-amount..amount);
                        }
                    }

                    // Adoption: blend toward the parent midpoint and the prototype.
                    let weight = self.rng.random::<f32>();
                    gene += weight
                        * self.rng.random::<f32>()
                        * (0.5 * (parent_a.genes[i] + parent_b.genes[i]) - gene)
                        + (1.0 - weight)
                            * self.rng.random::<f32>()
                            * (prototype.genes[i] - gene);

                    gene = ctx.bounds.clamp_gene(i, gene);
                    momentum_out[i] = self.rng.random::<f32>() * momentum + (gene - base);
                    genes[i] = gene;
                }

                let offspring = &mut self.offspring[o];
                offspring.genes = genes;
                offspring.momentum = momentum_out;
            } else {
                // Diversity injection: uniform reroll within bounds.
                let offspring = &mut self.offspring[o];
                offspring.momentum = [0.0; GENE_COUNT];
                reroll(&mut offspring.genes, ctx.bounds, &mut self.rng);
            }
        }

        for offspring in &mut self.offspring {
            offspring.fitness = compute_fitness(&pheno, ctx, &offspring.genes);
        }
        sort_by_fitness(&mut self.offspring);
        assign_extinctions(&mut self.offspring);

        for i in 0..POPULATION_SIZE {
            let next = self.offspring[i].clone();
            copy_clamped(&next, &mut self.individuals[i], ctx.bounds);
        }
    }

    /// Deterministic no-motion configuration: unit amplitude and frequency,
    /// shift/offset averaged from the neighboring active winners, no slope.
    fn force_degenerate(&mut self, prev_pivot: &Genes, next_pivot: &Genes) {
        for individual in &mut self.individuals {
            individual.genes[AMPLITUDE] = 1.0;
            individual.genes[FREQUENCY] = 1.0;
            individual.genes[SHIFT] = 0.5 * (prev_pivot[SHIFT] + next_pivot[SHIFT]);
            individual.genes[OFFSET] = 0.5 * (prev_pivot[OFFSET] + next_pivot[OFFSET]);
            individual.genes[SLOPE] = 0.0;
            individual.momentum = [0.0; GENE_COUNT];
            individual.fitness = 0.0;
            individual.extinction = 0.0;
        }
    }

    /// Rank-weighted sampling: first individual whose cumulative rank mass
    /// exceeds a uniform draw.
    fn select_index(&mut self) -> usize {
        let mut value = self.rng.random::<f32>() as f64 * self.rank_probability_sum as f64;
        for (i, &p) in self.rank_probabilities.iter().enumerate() {
            value -= p as f64;
            if value <= 0.0 {
                return i;
            }
        }
        POPULATION_SIZE - 1
    }
}

/// Multi-objective RMSE against both velocity polarities. The steep variant
/// squares the per-frame squared error again before averaging.
pub fn compute_fitness(pheno: &Phenotype, ctx: &EvolveCtx, genes: &Genes) -> f32 {
    let interval = pheno.interval;
    let mut acc = 0.0f32;
    for frame in interval.start..=interval.end {
        let same = ctx.targets.same.get(frame).copied().unwrap_or(0.0);
        let opposite = ctx.targets.opposite.get(frame).copied().unwrap_or(0.0);
        let x = pheno.value(genes, frame);
        let error = (same - x) * (same - x) + (-opposite - x) * (-opposite - x);
        acc += if ctx.steep_penalty { error * error } else { error };
    }
    (acc / interval.len() as f32).sqrt()
}

/// Coordinate-wise hill climb on a single individual. Perturbation size
/// scales with the individual's own fitness and the gene's bound span;
/// accepted deltas become the gene's momentum. Fitness never increases.
pub(crate) fn exploit(
    pheno: &Phenotype,
    ctx: &EvolveCtx,
    individual: &mut Individual,
    rng: &mut SmallRng,
) {
    individual.fitness = compute_fitness(pheno, ctx, &individual.genes);
    for i in 0..GENE_COUNT {
        let gene = individual.genes[i];
        let span = ctx.bounds.span(i);

        let inc = ctx
            .bounds
            .clamp_gene(i, gene + rng.random::<f32>() * individual.fitness * span);
        individual.genes[i] = inc;
        let inc_fitness = compute_fitness(pheno, ctx, &individual.genes);

        let dec = ctx
            .bounds
            .clamp_gene(i, gene - rng.random::<f32>() * individual.fitness * span);
        individual.genes[i] = dec;
        let dec_fitness = compute_fitness(pheno, ctx, &individual.genes);

        individual.genes[i] = gene;

        if inc_fitness < individual.fitness {
            individual.genes[i] = inc;
            individual.momentum[i] = inc - gene;
            individual.fitness = inc_fitness;
        }
        if dec_fitness < individual.fitness {
            individual.genes[i] = dec;
            individual.momentum[i] = dec - gene;
            individual.fitness = dec_fitness;
        }
    }
}

fn mutation_probability(parent_a: &Individual, parent_b: &Individual) -> f32 {
    let extinction = 0.5 * (parent_a.extinction + parent_b.extinction);
    let inverse = 1.0 / GENE_COUNT as f32;
    extinction * (1.0 - inverse) + inverse
}

fn mutation_strength(parent_a: &Individual, parent_b: &Individual) -> f32 {
    0.5 * (parent_a.extinction + parent_b.extinction)
}

fn reroll(genes: &mut Genes, bounds: &Bounds, rng: &mut SmallRng) {
    for i in 0..GENE_COUNT {
        genes[i] = if bounds.span(i) > 0.0 {
            rng.random_range(bounds.lower[i]..bounds.upper[i])
        } else {
            bounds.lower[i]
        };
    }
}

fn copy_clamped(from: &Individual, to: &mut Individual, bounds: &Bounds) {
    for i in 0..GENE_COUNT {
        to.genes[i] = bounds.clamp_gene(i, from.genes[i]);
        to.momentum[i] = from.momentum[i];
    }
    to.fitness = from.fitness;
    to.extinction = from.extinction;
}

fn sort_by_fitness(individuals: &mut [Individual]) {
    individuals.sort_by(|a, b| a.fitness.total_cmp(&b.fitness));
}

/// Rank-based extinction: the elite lands at 0, the weakest at 1.
fn assign_extinctions(individuals: &mut [Individual]) {
    let size = individuals.len();
    let min = individuals[0].fitness;
    let max = individuals[size - 1].fitness;
    if max <= 0.0 {
        for individual in individuals {
            individual.extinction = 0.0;
        }
        return;
    }
    for (i, individual) in individuals.iter_mut().enumerate() {
        let grading = i as f32 / (size - 1) as f32;
        individual.extinction = (individual.fitness + min * (grading - 1.0)) / max;
    }
}
