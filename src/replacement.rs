//! Survivor selection: merging offspring into the population.
//!
//! Every strategy returns a population of exactly the old size and never
//! modifies the old population, so a failed generation leaves it intact.

use crate::error::{Error, Result};
use crate::individual::{compare_fitness, Individual};
use crate::population::Population;
use rand::Rng;
use std::cmp::Ordering;

/// Temperature schedule for [`Replacement::Annealing`].
///
/// # References
///
/// - Kirkpatrick, Gelatt & Vecchi (1983), geometric cooling
/// - Lundy & Mees (1986), "Convergence of an annealing algorithm"
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CoolingSchedule {
    /// `T(g) = T0 · alpha^g`, `alpha` in `(0, 1)`.
    Geometric { alpha: f64 },

    /// Straight line from `T0` down to `min_temperature` over `steps`
    /// generations, then constant.
    Linear { min_temperature: f64, steps: usize },

    /// `T(g) = T0 / (1 + g · beta · T0)`.
    LundyMees { beta: f64 },
}

impl Default for CoolingSchedule {
    fn default() -> Self {
        CoolingSchedule::Geometric { alpha: 0.95 }
    }
}

impl CoolingSchedule {
    /// Temperature at generation `generation`.
    pub fn temperature(&self, initial: f64, generation: usize) -> f64 {
        let g = generation as f64;
        match *self {
            CoolingSchedule::Geometric { alpha } => initial * alpha.powf(g),
            CoolingSchedule::Linear {
                min_temperature,
                steps,
            } => {
                let t = initial - g * (initial - min_temperature) / steps.max(1) as f64;
                t.max(min_temperature)
            }
            CoolingSchedule::LundyMees { beta } => initial / (1.0 + g * beta * initial),
        }
    }

    pub fn validate(&self) -> Result<()> {
        match *self {
            CoolingSchedule::Geometric { alpha } if !(alpha > 0.0 && alpha < 1.0) => Err(
                Error::Configuration(format!("cooling alpha must be in (0, 1), got {alpha}")),
            ),
            CoolingSchedule::Linear { steps: 0, .. } => Err(Error::Configuration(
                "linear cooling needs at least one step".into(),
            )),
            CoolingSchedule::Linear {
                min_temperature, ..
            } if !(min_temperature >= 0.0 && min_temperature.is_finite()) => {
                Err(Error::Configuration(format!(
                    "minimum temperature must be finite and non-negative, got {min_temperature}"
                )))
            }
            CoolingSchedule::LundyMees { beta } if !(beta > 0.0 && beta.is_finite()) => Err(
                Error::Configuration(format!("Lundy-Mees beta must be positive, got {beta}")),
            ),
            _ => Ok(()),
        }
    }
}

/// Survivor selection strategy.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Replacement {
    /// The best `elitism` parents survive, offspring fill the rest in
    /// order. If there are too few offspring, the best remaining parents
    /// fill the gap.
    Generational { elitism: usize },

    /// Each offspring, in order, replaces the current worst member if it
    /// is strictly better (the newcomer loses ties).
    SteadyState,

    /// (μ+λ): the best μ of parents and offspring; parents win ties.
    MuPlusLambda,

    /// (μ,λ): the best μ offspring. Needs λ ≥ μ; if the evaluation budget
    /// cut the batch short, the best parents fill in.
    MuCommaLambda,

    /// Offspring `i` replaces parent `i` if it is at least as good.
    OneToOne,

    /// Offspring `i` replaces parent `i` under the Metropolis criterion
    /// at the scheduled temperature.
    Annealing {
        initial_temperature: f64,
        cooling: CoolingSchedule,
    },
}

impl Default for Replacement {
    fn default() -> Self {
        Replacement::Generational { elitism: 1 }
    }
}

impl Replacement {
    /// Offspring per generation when the configuration does not say.
    pub fn default_offspring(&self, population_size: usize) -> usize {
        match self {
            Replacement::SteadyState => 1,
            _ => population_size,
        }
    }

    /// Checks parameters against the population and batch sizes.
    pub fn validate(&self, population_size: usize, offspring_count: usize) -> Result<()> {
        match *self {
            Replacement::Generational { elitism } if elitism >= population_size => {
                Err(Error::Configuration(format!(
                    "elitism {elitism} leaves no room for offspring in a population of {population_size}"
                )))
            }
            Replacement::MuCommaLambda if offspring_count < population_size => {
                Err(Error::Configuration(format!(
                    "(mu, lambda) needs lambda >= mu, got lambda = {offspring_count}, mu = {population_size}"
                )))
            }
            Replacement::Annealing {
                initial_temperature,
                cooling,
            } => {
                if !(initial_temperature > 0.0 && initial_temperature.is_finite()) {
                    return Err(Error::Configuration(format!(
                        "initial temperature must be positive, got {initial_temperature}"
                    )));
                }
                cooling.validate()
            }
            _ => Ok(()),
        }
    }

    /// Builds the next population from `old` and the evaluated `offspring`.
    ///
    /// `generation` is the generation being completed (drives cooling).
    pub fn merge<G: Clone, R: Rng + ?Sized>(
        &self,
        old: &Population<G>,
        offspring: Vec<Individual<G>>,
        rng: &mut R,
        generation: usize,
    ) -> Result<Population<G>> {
        let mu = old.size();
        let next = match *self {
            Replacement::Generational { elitism } => {
                let order = old.sorted_indices();
                let elite = elitism.min(mu);
                let mut next: Vec<Individual<G>> = order[..elite]
                    .iter()
                    .map(|&i| old.individuals()[i].clone())
                    .collect();
                next.extend(offspring.into_iter().take(mu - elite));
                let missing = mu - next.len();
                next.extend(
                    order[elite..]
                        .iter()
                        .take(missing)
                        .map(|&i| old.individuals()[i].clone()),
                );
                next
            }
            Replacement::SteadyState => {
                let mut next = old.individuals().to_vec();
                for child in offspring {
                    let Some(worst) = worst_slot(&next) else {
                        break;
                    };
                    if compare_fitness(child.fitness(), next[worst].fitness()) == Ordering::Less {
                        next[worst] = child;
                    }
                }
                next
            }
            Replacement::MuPlusLambda => {
                let mut pool = old.individuals().to_vec();
                pool.extend(offspring);
                pool.sort_by(|a, b| compare_fitness(a.fitness(), b.fitness()));
                pool.truncate(mu);
                pool
            }
            Replacement::MuCommaLambda => {
                let mut pool = offspring;
                pool.sort_by(|a, b| compare_fitness(a.fitness(), b.fitness()));
                pool.truncate(mu);
                let missing = mu - pool.len();
                pool.extend(
                    old.sorted_indices()
                        .into_iter()
                        .take(missing)
                        .map(|i| old.individuals()[i].clone()),
                );
                pool
            }
            Replacement::OneToOne => {
                let mut next = old.individuals().to_vec();
                for (slot, child) in next.iter_mut().zip(offspring) {
                    if compare_fitness(child.fitness(), slot.fitness()) != Ordering::Greater {
                        *slot = child;
                    }
                }
                next
            }
            Replacement::Annealing {
                initial_temperature,
                cooling,
            } => {
                let temperature = cooling.temperature(initial_temperature, generation);
                let mut next = old.individuals().to_vec();
                for (slot, child) in next.iter_mut().zip(offspring) {
                    if metropolis(slot.fitness(), child.fitness(), temperature, rng) {
                        *slot = child;
                    }
                }
                next
            }
        };

        if next.len() != mu {
            return Err(Error::Configuration(format!(
                "replacement produced {} individuals for a population of {mu}",
                next.len()
            )));
        }
        Ok(Population::new(next))
    }
}

/// Index of the worst member; the last one on ties.
fn worst_slot<G>(individuals: &[Individual<G>]) -> Option<usize> {
    (0..individuals.len()).reduce(|worst, i| {
        if compare_fitness(individuals[i].fitness(), individuals[worst].fitness()).is_ge() {
            i
        } else {
            worst
        }
    })
}

/// Metropolis acceptance: improvements always, worsening by `Δ` with
/// probability `exp(−Δ/T)`.
fn metropolis<R: Rng + ?Sized>(
    current: Option<f64>,
    candidate: Option<f64>,
    temperature: f64,
    rng: &mut R,
) -> bool {
    match (current, candidate) {
        (_, None) => false,
        (None, Some(_)) => true,
        (Some(c), Some(n)) => {
            if n <= c {
                return true;
            }
            if temperature <= 0.0 {
                return false;
            }
            let p = (-(n - c) / temperature).exp();
            p.is_finite() && rng.random::<f64>() < p
        }
    }
}
