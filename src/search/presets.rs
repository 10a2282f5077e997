//! Classic algorithms assembled from the generic blocks.
//!
//! Every preset returns an ordinary [`SearchEngine`]: there is no
//! algorithm-specific loop. A preset only picks an initializer, an operator
//! pipeline, and a selection/replacement pair.
//!
//! | Preset | Pipeline | Selection | Replacement |
//! |--------|----------|-----------|-------------|
//! | [`genetic_algorithm`] | BLX-α → Gaussian | Tournament(3) | Generational, elitism 1 |
//! | [`simulated_annealing`] | Gaussian | Sequential | Annealing |
//! | [`evolution_strategy`] | Gaussian | Random | (μ+λ) or (μ,λ) |
//! | [`differential_evolution`] | DE/rand/1/bin | Sequential | One-to-one |
//! | [`harmony_search`] | memory consideration → pitch adjustment | Sequential | Steady state |
//! | [`hill_climbing`] | k Gaussian neighbours | Sequential | (μ+λ) |
//! | [`random_search`] | random restart | Sequential | (μ+λ) |
//! | [`particle_swarm`] | velocity/position update | Sequential | Generational, elitism 0 |
//!
//! Step sizes are expressed as fractions of the mean width of the search
//! box.

use super::config::SearchConfig;
use super::runner::SearchEngine;
use crate::encoding::{Bounds, BoundedVectorEncoding, ParticleEncoding};
use crate::error::{Error, Result};
use crate::initializer::{ParticleInitializer, UniformVectorInitializer};
use crate::objective::{Objective, ObjectiveFn};
use crate::operator::{
    BlxAlphaCrossover, DifferentialMutation, GaussianMutation, MultiParentCrossover, Neighborhood,
    Operator, Pipeline, RandomRestart, SwarmUpdate,
};
use crate::replacement::{CoolingSchedule, Replacement};
use crate::selection::Selection;
use crate::termination::Termination;

/// Settings shared by all presets.
#[derive(Debug, Clone, PartialEq)]
pub struct PresetSettings {
    pub population_size: usize,
    pub termination: Termination,
    pub seed: Option<u64>,
    pub workers: usize,
}

impl Default for PresetSettings {
    fn default() -> Self {
        Self {
            population_size: 50,
            termination: Termination::MaxGenerations(200),
            seed: None,
            workers: 1,
        }
    }
}

impl PresetSettings {
    pub fn with_population_size(mut self, n: usize) -> Self {
        self.population_size = n;
        self
    }

    pub fn with_termination(mut self, termination: Termination) -> Self {
        self.termination = termination;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    fn config<G>(&self) -> SearchConfig<G> {
        let config = SearchConfig::default()
            .with_population_size(self.population_size)
            .with_termination(self.termination.clone())
            .with_workers(self.workers);
        match self.seed {
            Some(seed) => config.with_seed(seed),
            None => config,
        }
    }
}

type VectorEngine<F> = SearchEngine<BoundedVectorEncoding, F>;

/// `fraction` of the mean box width.
fn step_size(bounds: &Bounds, fraction: f64) -> f64 {
    let dim = bounds.dim().max(1) as f64;
    let mean_width = (0..bounds.dim()).map(|i| bounds.range(i)).sum::<f64>() / dim;
    (mean_width * fraction).max(f64::EPSILON)
}

fn vector_engine<F>(
    objective: Objective<BoundedVectorEncoding, F>,
    stages: Vec<Box<dyn Operator<Vec<f64>>>>,
    config: SearchConfig<Vec<f64>>,
) -> Result<VectorEngine<F>>
where
    F: ObjectiveFn<Vec<f64>>,
{
    let initializer = UniformVectorInitializer::new(objective.encoding().bounds().clone());
    SearchEngine::new(objective, initializer, Pipeline::new(stages)?, config)
}

/// Real-coded genetic algorithm: BLX-0.5 crossover followed by Gaussian
/// mutation (σ = 5% of the box), tournament selection and one elite.
pub fn genetic_algorithm<F>(
    objective: Objective<BoundedVectorEncoding, F>,
    settings: PresetSettings,
) -> Result<VectorEngine<F>>
where
    F: ObjectiveFn<Vec<f64>>,
{
    let sigma = step_size(objective.encoding().bounds(), 0.05);
    vector_engine(
        objective,
        vec![
            Box::new(BlxAlphaCrossover::new(0.5)),
            Box::new(GaussianMutation::new(sigma)?),
        ],
        settings
            .config()
            .with_selection(Selection::Tournament(3))
            .with_replacement(Replacement::Generational { elitism: 1 }),
    )
}

/// Simulated annealing: every member follows its own Metropolis trajectory
/// (population size 1 gives the textbook algorithm).
pub fn simulated_annealing<F>(
    objective: Objective<BoundedVectorEncoding, F>,
    settings: PresetSettings,
    initial_temperature: f64,
    cooling: CoolingSchedule,
) -> Result<VectorEngine<F>>
where
    F: ObjectiveFn<Vec<f64>>,
{
    let sigma = step_size(objective.encoding().bounds(), 0.1);
    vector_engine(
        objective,
        vec![Box::new(GaussianMutation::new(sigma)?)],
        settings
            .config()
            .with_selection(Selection::Sequential)
            .with_replacement(Replacement::Annealing {
                initial_temperature,
                cooling,
            }),
    )
}

/// (μ+λ) or (μ,λ) evolution strategy with μ = population size.
pub fn evolution_strategy<F>(
    objective: Objective<BoundedVectorEncoding, F>,
    settings: PresetSettings,
    lambda: usize,
    plus: bool,
) -> Result<VectorEngine<F>>
where
    F: ObjectiveFn<Vec<f64>>,
{
    let sigma = step_size(objective.encoding().bounds(), 0.1);
    let replacement = if plus {
        Replacement::MuPlusLambda
    } else {
        Replacement::MuCommaLambda
    };
    vector_engine(
        objective,
        vec![Box::new(GaussianMutation::new(sigma)?)],
        settings
            .config()
            .with_offspring_count(lambda)
            .with_selection(Selection::Random)
            .with_replacement(replacement),
    )
}

/// DE/rand/1/bin: member `i` competes with the trial vector built for it.
pub fn differential_evolution<F>(
    objective: Objective<BoundedVectorEncoding, F>,
    settings: PresetSettings,
    f: f64,
    cr: f64,
) -> Result<VectorEngine<F>>
where
    F: ObjectiveFn<Vec<f64>>,
{
    if settings.population_size < 4 {
        return Err(Error::Configuration(format!(
            "differential evolution needs at least 4 members, got {}",
            settings.population_size
        )));
    }
    vector_engine(
        objective,
        vec![Box::new(DifferentialMutation::new(f, cr)?)],
        settings
            .config()
            .with_selection(Selection::Sequential)
            .with_replacement(Replacement::OneToOne),
    )
}

/// Harmony search: one new harmony per generation, composed gene by gene
/// from the memory (probability `hmcr`) or at random, then pitch-adjusted
/// per gene with probability `par`. It replaces the worst harmony if
/// better.
pub fn harmony_search<F>(
    objective: Objective<BoundedVectorEncoding, F>,
    settings: PresetSettings,
    hmcr: f64,
    par: f64,
) -> Result<VectorEngine<F>>
where
    F: ObjectiveFn<Vec<f64>>,
{
    let bounds = objective.encoding().bounds().clone();
    let bandwidth = step_size(&bounds, 0.01);
    vector_engine(
        objective,
        vec![
            Box::new(MultiParentCrossover::new().with_consideration_rate(hmcr, bounds)?),
            Box::new(GaussianMutation::new(bandwidth)?.with_rate(par)?),
        ],
        settings
            .config()
            .with_selection(Selection::Sequential)
            .with_replacement(Replacement::SteadyState),
    )
}

/// Each member samples `neighbours` Gaussian neighbours; the best μ of
/// members and neighbours survive.
pub fn hill_climbing<F>(
    objective: Objective<BoundedVectorEncoding, F>,
    settings: PresetSettings,
    neighbours: usize,
) -> Result<VectorEngine<F>>
where
    F: ObjectiveFn<Vec<f64>>,
{
    let sigma = step_size(objective.encoding().bounds(), 0.05);
    let offspring = settings.population_size.saturating_mul(neighbours);
    vector_engine(
        objective,
        vec![Box::new(Neighborhood::<Vec<f64>>::new(
            GaussianMutation::new(sigma)?,
            neighbours,
        )?)],
        settings
            .config()
            .with_offspring_count(offspring)
            .with_selection(Selection::Sequential)
            .with_replacement(Replacement::MuPlusLambda),
    )
}

/// Uniform sampling of the box, keeping the best μ points seen.
pub fn random_search<F>(
    objective: Objective<BoundedVectorEncoding, F>,
    settings: PresetSettings,
) -> Result<VectorEngine<F>>
where
    F: ObjectiveFn<Vec<f64>>,
{
    vector_engine(
        objective,
        vec![Box::new(RandomRestart)],
        settings
            .config()
            .with_selection(Selection::Sequential)
            .with_replacement(Replacement::MuPlusLambda),
    )
}

/// Particle swarm optimization over the objective's box.
///
/// Particles carry their own velocity and personal best; the engine's
/// best-ever individual is the global attractor.
pub fn particle_swarm<F>(
    objective: Objective<ParticleEncoding, F>,
    settings: PresetSettings,
    update: SwarmUpdate,
) -> Result<SearchEngine<ParticleEncoding, F>>
where
    F: ObjectiveFn<Vec<f64>>,
{
    let initializer = ParticleInitializer::new(objective.encoding().bounds().clone());
    SearchEngine::new(
        objective,
        initializer,
        Pipeline::from_operator(update),
        settings
            .config()
            .with_selection(Selection::Sequential)
            .with_replacement(Replacement::Generational { elitism: 0 }),
    )
}
