//! Counting, direction-normalizing objective wrapper.

use super::types::{BatchFnObjective, Direction, FnObjective, ObjectiveFn};
use crate::encoding::Encoding;
use crate::error::{Error, Result};
use crate::individual::{Evaluation, Individual};
use std::sync::atomic::{AtomicU64, Ordering};

/// Encoding + user function + direction, with an evaluation counter.
///
/// The counter is the budget that
/// [`Termination::MaxEvaluations`](crate::termination::Termination::MaxEvaluations)
/// checks. It is incremented exactly once per successful call of the user
/// function and never for cached results.
///
/// # Examples
///
/// ```
/// use u_metadesign::encoding::{Bounds, BoundedVectorEncoding};
/// use u_metadesign::objective::{Direction, Objective};
/// use u_metadesign::individual::Individual;
///
/// let encoding = BoundedVectorEncoding::new(Bounds::uniform(2, -5.0, 5.0).unwrap());
/// let objective = Objective::from_fn(encoding, Direction::Maximize, |x: &Vec<f64>| {
///     Ok(-(x[0] * x[0] + x[1] * x[1]))
/// });
///
/// let eval = objective.evaluate(&Individual::new(vec![1.0, 2.0])).unwrap();
/// assert_eq!(eval.objective, -5.0);
/// assert_eq!(eval.fitness, 5.0); // normalized: lower is better
/// assert_eq!(objective.evaluations(), 1);
/// ```
pub struct Objective<E, F> {
    encoding: E,
    function: F,
    direction: Direction,
    recalculate: bool,
    counter: AtomicU64,
}

impl<E, C> Objective<E, FnObjective<C>> {
    /// Builds an objective from a closure over phenotypes.
    pub fn from_fn(encoding: E, direction: Direction, f: C) -> Self
    where
        E: Encoding,
        C: Fn(&E::Phenotype) -> anyhow::Result<f64> + Send + Sync,
    {
        Objective {
            encoding,
            function: FnObjective::new(f),
            direction,
            recalculate: false,
            counter: AtomicU64::new(0),
        }
    }
}

impl<E, C> Objective<E, BatchFnObjective<C>> {
    /// Builds an objective from a closure that scores a whole batch.
    pub fn from_batch_fn(encoding: E, direction: Direction, f: C) -> Self
    where
        E: Encoding,
        C: Fn(&[&E::Phenotype]) -> anyhow::Result<Vec<f64>> + Send + Sync,
    {
        Objective {
            encoding,
            function: BatchFnObjective::new(f),
            direction,
            recalculate: false,
            counter: AtomicU64::new(0),
        }
    }
}

impl<E, F> Objective<E, F>
where
    E: Encoding,
    F: ObjectiveFn<E::Phenotype>,
{
    pub fn new(encoding: E, function: F, direction: Direction) -> Self {
        Self {
            encoding,
            function,
            direction,
            recalculate: false,
            counter: AtomicU64::new(0),
        }
    }

    /// Re-evaluates individuals even when they carry a cached evaluation.
    ///
    /// Useful for noisy or time-varying objectives. Off by default.
    pub fn with_recalculate(mut self, recalculate: bool) -> Self {
        self.recalculate = recalculate;
        self
    }

    pub fn encoding(&self) -> &E {
        &self.encoding
    }

    pub fn function(&self) -> &F {
        &self.function
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn recalculates(&self) -> bool {
        self.recalculate
    }

    /// Whether [`evaluate`](Self::evaluate) would call the user function.
    pub fn needs_evaluation(&self, individual: &Individual<E::Genotype>) -> bool {
        self.recalculate || !individual.is_evaluated()
    }

    /// Evaluates an individual, reusing its cached evaluation when allowed.
    pub fn evaluate(&self, individual: &Individual<E::Genotype>) -> Result<Evaluation> {
        match individual.evaluation() {
            Some(cached) if !self.recalculate => Ok(*cached),
            _ => self.evaluate_genotype(individual.genotype()),
        }
    }

    /// Decodes and evaluates a genotype unconditionally.
    ///
    /// A user-function failure is wrapped in
    /// [`Error::ObjectiveEvaluation`] with the genotype attached; the engine
    /// fills in the generation. Failed calls are not counted.
    pub fn evaluate_genotype(&self, genotype: &E::Genotype) -> Result<Evaluation> {
        let phenotype = self.encoding.decode(genotype)?;
        let raw = self.function.evaluate(&phenotype);
        self.score(genotype, &phenotype, raw)
    }

    /// Decodes and evaluates several genotypes with one
    /// [`ObjectiveFn::evaluate_batch`] call.
    ///
    /// Stops at the first failure; evaluations before it are counted.
    pub fn evaluate_genotypes(&self, genotypes: &[&E::Genotype]) -> Result<Vec<Evaluation>> {
        let phenotypes = genotypes
            .iter()
            .map(|g| self.encoding.decode(g))
            .collect::<Result<Vec<_>>>()?;
        let views: Vec<&E::Phenotype> = phenotypes.iter().collect();
        let raw = self.function.evaluate_batch(&views);
        if raw.len() != genotypes.len() {
            return Err(Error::ObjectiveEvaluation {
                genotype: format!("batch of {}", genotypes.len()),
                generation: 0,
                source: anyhow::anyhow!(
                    "`{}` returned {} values for {} phenotypes",
                    self.function.name(),
                    raw.len(),
                    genotypes.len()
                ),
            });
        }
        genotypes
            .iter()
            .zip(&phenotypes)
            .zip(raw)
            .map(|((genotype, phenotype), raw)| self.score(genotype, phenotype, raw))
            .collect()
    }

    fn score(
        &self,
        genotype: &E::Genotype,
        phenotype: &E::Phenotype,
        raw: anyhow::Result<f64>,
    ) -> Result<Evaluation> {
        let objective = raw.map_err(|source| Error::ObjectiveEvaluation {
            genotype: format!("{genotype:?}"),
            generation: 0,
            source,
        })?;
        let penalty = self.function.penalty(phenotype).max(0.0);
        self.counter.fetch_add(1, Ordering::Relaxed);

        let fitness = self.direction.normalize(objective) + penalty;
        Ok(Evaluation {
            // Non-finite values rank worst in either direction.
            fitness: if fitness.is_finite() { fitness } else { f64::INFINITY },
            objective,
        })
    }

    /// Maps a normalized fitness back to the user's direction.
    ///
    /// Exact for unpenalized values only.
    pub fn denormalize(&self, fitness: f64) -> f64 {
        self.direction.denormalize(fitness)
    }

    /// Decodes a genotype through the encoding.
    pub fn decode(&self, genotype: &E::Genotype) -> Result<E::Phenotype> {
        self.encoding.decode(genotype)
    }

    /// Number of successful user-function calls so far.
    pub fn evaluations(&self) -> u64 {
        self.counter.load(Ordering::Relaxed)
    }

    /// Resets the evaluation counter to zero.
    pub fn reset_evaluations(&self) {
        self.counter.store(0, Ordering::Relaxed);
    }

    /// Restores the counter from a checkpoint.
    pub(crate) fn restore_evaluations(&self, evaluations: u64) {
        self.counter.store(evaluations, Ordering::Relaxed);
    }
}
