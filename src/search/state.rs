//! Search state, status and run results.

use crate::individual::Individual;
use crate::objective::Direction;
use std::fmt;
use std::time::Duration;

/// Which budget ran out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Budget {
    Evaluations,
    Generations,
    Time,
}

/// Which convergence criterion fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Convergence {
    TargetReached,
    Stagnation,
}

/// Why a run finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TerminationReason {
    Converged(Convergence),
    BudgetExceeded(Budget),
    /// The cancellation token was set.
    StoppedExternally,
    /// An error aborted the run; no result is available.
    Failed,
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationReason::Converged(Convergence::TargetReached) => write!(f, "target reached"),
            TerminationReason::Converged(Convergence::Stagnation) => write!(f, "stagnated"),
            TerminationReason::BudgetExceeded(Budget::Evaluations) => {
                write!(f, "evaluation budget exhausted")
            }
            TerminationReason::BudgetExceeded(Budget::Generations) => {
                write!(f, "generation limit reached")
            }
            TerminationReason::BudgetExceeded(Budget::Time) => write!(f, "time limit reached"),
            TerminationReason::StoppedExternally => write!(f, "cancelled"),
            TerminationReason::Failed => write!(f, "failed"),
        }
    }
}

/// Engine lifecycle.
///
/// ```text
/// Uninitialized --initialize--> Initialized --step--> Running --step--> ...
///        \                          \                    \
///         +------------------------- +--------------------+--> Finished(reason)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SearchStatus {
    Uninitialized,
    Initialized,
    Running,
    Finished(TerminationReason),
}

impl SearchStatus {
    pub fn is_finished(&self) -> bool {
        matches!(self, SearchStatus::Finished(_))
    }
}

/// Read-only view of one completed generation, handed to observers.
///
/// Fitness values are normalized (lower is better); `best_objective` is in
/// the user's direction.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Snapshot {
    pub generation: usize,
    pub evaluations: u64,
    pub elapsed: Duration,
    /// Best-ever fitness.
    pub best_fitness: Option<f64>,
    /// Best-ever raw objective.
    pub best_objective: Option<f64>,
    /// Mean fitness of the current population.
    pub mean_fitness: Option<f64>,
    /// Worst fitness of the current population.
    pub worst_fitness: Option<f64>,
    pub population_size: usize,
}

/// Progress of one search, read by termination criteria and reporters.
///
/// The best individual is an independent copy, never a reference into the
/// live population.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SearchState<G> {
    generation: usize,
    evaluations: u64,
    elapsed: Duration,
    best: Option<Individual<G>>,
    best_history: Vec<f64>,
    objective_history: Vec<f64>,
    direction: Direction,
    snapshots: Vec<Snapshot>,
}

impl<G> SearchState<G> {
    pub fn new(direction: Direction) -> Self {
        Self {
            generation: 0,
            evaluations: 0,
            elapsed: Duration::ZERO,
            best: None,
            best_history: Vec::new(),
            objective_history: Vec::new(),
            direction,
            snapshots: Vec::new(),
        }
    }

    /// Completed generations (0 after initialization).
    pub fn generation(&self) -> usize {
        self.generation
    }

    /// Objective evaluations consumed.
    pub fn evaluations(&self) -> u64 {
        self.evaluations
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Best individual found so far.
    pub fn best(&self) -> Option<&Individual<G>> {
        self.best.as_ref()
    }

    /// Normalized fitness of the best individual.
    pub fn best_fitness(&self) -> Option<f64> {
        self.best.as_ref().and_then(|b| b.fitness())
    }

    /// Raw objective of the best individual.
    pub fn best_objective(&self) -> Option<f64> {
        self.best.as_ref().and_then(|b| b.objective())
    }

    /// Best-ever normalized fitness after initialization and after every
    /// generation. Non-increasing.
    pub fn best_history(&self) -> &[f64] {
        &self.best_history
    }

    /// Same as [`best_history`](Self::best_history), as raw objective values.
    pub fn objective_history(&self) -> &[f64] {
        &self.objective_history
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Per-generation snapshots (only kept with `retain_history`).
    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    pub(crate) fn set_generation(&mut self, generation: usize) {
        self.generation = generation;
    }

    pub(crate) fn set_evaluations(&mut self, evaluations: u64) {
        self.evaluations = evaluations;
    }

    pub(crate) fn set_elapsed(&mut self, elapsed: Duration) {
        self.elapsed = elapsed;
    }

    /// Records the current best-ever value in the histories.
    pub(crate) fn record_best(&mut self) {
        if let Some(best) = &self.best {
            if let Some(e) = best.evaluation() {
                self.best_history.push(e.fitness);
                self.objective_history.push(e.objective);
            }
        }
    }

    pub(crate) fn push_snapshot(&mut self, snapshot: Snapshot) {
        self.snapshots.push(snapshot);
    }
}

impl<G: Clone> SearchState<G> {
    /// Adopts `candidate` as the best if it is strictly better; the first
    /// one found wins ties. Returns whether it was adopted.
    pub(crate) fn offer(&mut self, candidate: &Individual<G>) -> bool {
        let improved = match &self.best {
            None => candidate.is_evaluated(),
            Some(best) => candidate.is_better_than(best),
        };
        if improved {
            self.best = Some(candidate.clone());
        }
        improved
    }
}

/// Compact, serializable description of a finished run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SearchSummary {
    pub reason: TerminationReason,
    pub generations: usize,
    pub evaluations: u64,
    pub elapsed: Duration,
    pub best_fitness: f64,
    /// Raw objective of the best individual, in the user's direction.
    pub best_objective: f64,
    pub direction: Direction,
}

/// Outcome of a finished run.
#[derive(Debug, Clone)]
pub struct SearchResult<P, G> {
    /// Best individual found.
    pub best: Individual<G>,
    /// Its decoded phenotype.
    pub phenotype: P,
    /// Its raw objective value.
    pub objective: f64,
    /// Its normalized fitness (penalty included).
    pub fitness: f64,
    pub reason: TerminationReason,
    pub summary: SearchSummary,
    /// Best-ever raw objective after initialization and each generation.
    pub history: Vec<f64>,
    /// Per-generation snapshots, if retained.
    pub snapshots: Vec<Snapshot>,
}
