//! Candidate solutions.
//!
//! An [`Individual`] pairs a genotype with its cached [`Evaluation`]. The
//! cache is invalidated by every genotype mutation, and operators are
//! expected to build new individuals through
//! [`OperatorContext::offspring`](crate::operator::OperatorContext::offspring)
//! instead of editing shared ones.

use std::cmp::Ordering;

/// Result of evaluating one genotype.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Evaluation {
    /// Normalized fitness: lower is better regardless of the optimization
    /// direction. Includes any constraint penalty.
    pub fitness: f64,

    /// Raw value returned by the user function, in the user's direction.
    pub objective: f64,
}

/// A genotype plus its (possibly undefined) fitness.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Individual<G> {
    genotype: G,
    evaluation: Option<Evaluation>,
    birth: usize,
    evaluations: u32,
}

impl<G> Individual<G> {
    /// Creates an unevaluated individual born in generation 0.
    pub fn new(genotype: G) -> Self {
        Self::born(genotype, 0)
    }

    /// Creates an unevaluated individual born in `generation`.
    pub fn born(genotype: G, generation: usize) -> Self {
        Self {
            genotype,
            evaluation: None,
            birth: generation,
            evaluations: 0,
        }
    }

    /// Returns the genotype.
    pub fn genotype(&self) -> &G {
        &self.genotype
    }

    /// Mutable access to the genotype. Clears the cached evaluation.
    pub fn genotype_mut(&mut self) -> &mut G {
        self.evaluation = None;
        &mut self.genotype
    }

    /// Consumes the individual, returning its genotype.
    pub fn into_genotype(self) -> G {
        self.genotype
    }

    /// Replaces the genotype through `f`, clearing the cached evaluation.
    pub fn map_genotype(self, f: impl FnOnce(G) -> G) -> Self {
        Self {
            genotype: f(self.genotype),
            evaluation: None,
            birth: self.birth,
            evaluations: 0,
        }
    }

    /// Returns the cached evaluation, if any.
    pub fn evaluation(&self) -> Option<&Evaluation> {
        self.evaluation.as_ref()
    }

    /// Normalized fitness (lower is better), if evaluated.
    pub fn fitness(&self) -> Option<f64> {
        self.evaluation.map(|e| e.fitness)
    }

    /// Raw objective value, if evaluated.
    pub fn objective(&self) -> Option<f64> {
        self.evaluation.map(|e| e.objective)
    }

    /// Whether a cached evaluation is present.
    pub fn is_evaluated(&self) -> bool {
        self.evaluation.is_some()
    }

    /// Stores an evaluation result.
    pub fn set_evaluation(&mut self, evaluation: Evaluation) {
        self.evaluation = Some(evaluation);
        self.evaluations = self.evaluations.saturating_add(1);
    }

    /// Builder form of [`set_evaluation`](Self::set_evaluation).
    pub fn with_evaluation(mut self, evaluation: Evaluation) -> Self {
        self.set_evaluation(evaluation);
        self
    }

    /// Generation in which this individual was created.
    pub fn birth(&self) -> usize {
        self.birth
    }

    /// Age relative to `generation`.
    pub fn age(&self, generation: usize) -> usize {
        generation.saturating_sub(self.birth)
    }

    /// Number of times this genotype has been evaluated.
    pub fn evaluations(&self) -> u32 {
        self.evaluations
    }

    /// Strict improvement test. Unevaluated individuals are never better.
    pub fn is_better_than(&self, other: &Self) -> bool {
        compare_fitness(self.fitness(), other.fitness()) == Ordering::Less
    }
}

/// Total order on optional fitness values: evaluated before unevaluated,
/// lower before higher.
pub fn compare_fitness(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
