//! Stopping criteria.
//!
//! Criteria are pure predicates over [`SearchState`]: evaluating one twice
//! on the same state gives the same answer, and nothing is counted or
//! mutated by asking.

use crate::error::{Error, Result};
use crate::search::{Budget, Convergence, SearchState, TerminationReason};
use std::time::Duration;

/// When to stop a search.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use u_metadesign::termination::Termination;
///
/// let stop = Termination::MaxEvaluations(10_000)
///     .or(Termination::TimeLimit(Duration::from_secs(5)))
///     .or(Termination::Stagnation { window: 50, tolerance: 1e-9 });
/// assert_eq!(stop.evaluation_cap(), Some(10_000));
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Termination {
    /// Stop once this many objective evaluations have been spent. The
    /// engine never exceeds it.
    MaxEvaluations(u64),

    /// Stop after this many generations.
    MaxGenerations(usize),

    /// Stop once the wall time since the run started reaches this. Checked
    /// at generation boundaries.
    TimeLimit(Duration),

    /// Stop once the best raw objective reaches this value, in the
    /// objective's own direction (≤ when minimizing, ≥ when maximizing).
    TargetFitness(f64),

    /// Stop when the best fitness improved by no more than `tolerance`
    /// over the last `window` generations.
    Stagnation { window: usize, tolerance: f64 },

    /// Stop when any member says so. Empty never stops.
    Any(Vec<Termination>),

    /// Stop when every member says so. Empty never stops.
    All(Vec<Termination>),
}

impl Default for Termination {
    fn default() -> Self {
        Termination::MaxGenerations(500)
    }
}

impl Termination {
    /// `self` or `other`, flattening nested `Any`.
    pub fn or(self, other: Termination) -> Termination {
        match self {
            Termination::Any(mut members) => {
                members.push(other);
                Termination::Any(members)
            }
            first => Termination::Any(vec![first, other]),
        }
    }

    /// `self` and `other`, flattening nested `All`.
    pub fn and(self, other: Termination) -> Termination {
        match self {
            Termination::All(mut members) => {
                members.push(other);
                Termination::All(members)
            }
            first => Termination::All(vec![first, other]),
        }
    }

    pub fn should_stop<G>(&self, state: &SearchState<G>) -> bool {
        self.reason(state).is_some()
    }

    /// The reason this criterion fires on `state`, if it does.
    ///
    /// For `Any` and `All` the first firing member names the reason.
    pub fn reason<G>(&self, state: &SearchState<G>) -> Option<TerminationReason> {
        match self {
            Termination::MaxEvaluations(n) => (state.evaluations() >= *n)
                .then_some(TerminationReason::BudgetExceeded(Budget::Evaluations)),
            Termination::MaxGenerations(n) => (state.generation() >= *n)
                .then_some(TerminationReason::BudgetExceeded(Budget::Generations)),
            Termination::TimeLimit(limit) => (state.elapsed() >= *limit)
                .then_some(TerminationReason::BudgetExceeded(Budget::Time)),
            Termination::TargetFitness(target) => {
                let best = state.best_fitness()?;
                (best <= state.direction().normalize(*target))
                    .then_some(TerminationReason::Converged(Convergence::TargetReached))
            }
            Termination::Stagnation { window, tolerance } => {
                let history = state.best_history();
                let n = history.len();
                (n > *window && !improved(history[n - 1 - window], history[n - 1], *tolerance))
                    .then_some(TerminationReason::Converged(Convergence::Stagnation))
            }
            Termination::Any(members) => members.iter().find_map(|m| m.reason(state)),
            Termination::All(members) => {
                let mut reasons = members.iter().map(|m| m.reason(state));
                let first = reasons.next()??;
                reasons.all(|r| r.is_some()).then_some(first)
            }
        }
    }

    /// How far the search is towards this criterion, in `[0, 1]`.
    ///
    /// Budgets report the spent fraction; `Any` reports the most advanced
    /// member and `All` the least advanced one. Convergence criteria have
    /// no notion of progress and give `None`.
    pub fn progress<G>(&self, state: &SearchState<G>) -> Option<f64> {
        let fraction = |spent: f64, budget: f64| {
            if budget > 0.0 {
                (spent / budget).clamp(0.0, 1.0)
            } else {
                1.0
            }
        };
        match self {
            Termination::MaxEvaluations(n) => Some(fraction(state.evaluations() as f64, *n as f64)),
            Termination::MaxGenerations(n) => Some(fraction(state.generation() as f64, *n as f64)),
            Termination::TimeLimit(limit) => Some(fraction(
                state.elapsed().as_secs_f64(),
                limit.as_secs_f64(),
            )),
            Termination::TargetFitness(_) | Termination::Stagnation { .. } => None,
            Termination::Any(members) => members
                .iter()
                .filter_map(|m| m.progress(state))
                .reduce(f64::max),
            Termination::All(members) => members
                .iter()
                .filter_map(|m| m.progress(state))
                .reduce(f64::min),
        }
    }

    /// Hard evaluation cap implied by this criterion, if any.
    ///
    /// The engine trims offspring batches so that this cap is never
    /// exceeded.
    pub fn evaluation_cap(&self) -> Option<u64> {
        match self {
            Termination::MaxEvaluations(n) => Some(*n),
            Termination::Any(members) => members.iter().filter_map(|m| m.evaluation_cap()).min(),
            _ => None,
        }
    }

    /// Whether this criterion is guaranteed to fire eventually.
    pub fn is_bounded(&self) -> bool {
        match self {
            Termination::MaxEvaluations(_)
            | Termination::MaxGenerations(_)
            | Termination::TimeLimit(_) => true,
            Termination::TargetFitness(_) | Termination::Stagnation { .. } => false,
            Termination::Any(members) => members.iter().any(Termination::is_bounded),
            Termination::All(members) => {
                !members.is_empty() && members.iter().all(Termination::is_bounded)
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Termination::Stagnation { window, tolerance } => {
                if *window == 0 {
                    return Err(Error::Configuration(
                        "stagnation window must be at least 1".into(),
                    ));
                }
                if !(*tolerance >= 0.0 && tolerance.is_finite()) {
                    return Err(Error::Configuration(format!(
                        "stagnation tolerance must be finite and non-negative, got {tolerance}"
                    )));
                }
                Ok(())
            }
            Termination::TargetFitness(t) if t.is_nan() => {
                Err(Error::Configuration("target fitness is NaN".into()))
            }
            Termination::Any(members) | Termination::All(members) => {
                members.iter().try_for_each(Termination::validate)
            }
            _ => Ok(()),
        }
    }
}

/// Whether the best fitness moved from `before` to `after` by more than
/// `tolerance`. An unchanged value never counts, infinite ones included.
fn improved(before: f64, after: f64, tolerance: f64) -> bool {
    before != after && before - after > tolerance
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::individual::{Evaluation, Individual};
    use crate::objective::Direction;

    fn state(direction: Direction, history: &[f64]) -> SearchState<u8> {
        let mut s = SearchState::new(direction);
        for &f in history {
            s.offer(&Individual::new(0u8).with_evaluation(Evaluation {
                fitness: f,
                objective: direction.denormalize(f),
            }));
            s.record_best();
        }
        s.set_generation(history.len().saturating_sub(1));
        s
    }

    #[test]
    fn test_budgets() {
        let mut s = state(Direction::Minimize, &[1.0]);
        s.set_evaluations(99);
        s.set_generation(9);
        s.set_elapsed(Duration::from_millis(10));
        assert!(!Termination::MaxEvaluations(100).should_stop(&s));
        assert!(!Termination::MaxGenerations(10).should_stop(&s));
        assert!(!Termination::TimeLimit(Duration::from_millis(11)).should_stop(&s));

        s.set_evaluations(100);
        s.set_generation(10);
        assert_eq!(
            Termination::MaxEvaluations(100).reason(&s),
            Some(TerminationReason::BudgetExceeded(Budget::Evaluations))
        );
        assert_eq!(
            Termination::MaxGenerations(10).reason(&s),
            Some(TerminationReason::BudgetExceeded(Budget::Generations))
        );
    }

    #[test]
    fn test_target_respects_direction() {
        let s = state(Direction::Maximize, &[-5.0]);
        assert_eq!(s.best_objective(), Some(5.0));
        assert!(Termination::TargetFitness(5.0).should_stop(&s));
        assert!(Termination::TargetFitness(4.0).should_stop(&s));
        assert!(!Termination::TargetFitness(6.0).should_stop(&s));

        let s = state(Direction::Minimize, &[0.5]);
        assert!(Termination::TargetFitness(1.0).should_stop(&s));
        assert!(!Termination::TargetFitness(0.1).should_stop(&s));
        assert!(!Termination::TargetFitness(0.0).should_stop(&SearchState::<u8>::new(Direction::Minimize)));
    }

    #[test]
    fn test_stagnation_window() {
        let t = Termination::Stagnation {
            window: 2,
            tolerance: 0.0,
        };
        assert!(!t.should_stop(&state(Direction::Minimize, &[3.0, 3.0])));
        assert!(t.should_stop(&state(Direction::Minimize, &[3.0, 3.0, 3.0])));
        assert!(!t.should_stop(&state(Direction::Minimize, &[4.0, 3.0, 3.0])));
        assert_eq!(
            t.reason(&state(Direction::Minimize, &[4.0, 3.0, 3.0, 3.0])),
            Some(TerminationReason::Converged(Convergence::Stagnation))
        );
    }

    #[test]
    fn test_stagnation_on_constant_infinite_best() {
        let t = Termination::Stagnation {
            window: 3,
            tolerance: 0.0,
        };
        let inf = f64::INFINITY;
        assert_eq!(
            t.reason(&state(Direction::Minimize, &[inf, inf, inf, inf])),
            Some(TerminationReason::Converged(Convergence::Stagnation))
        );
        assert!(!t.should_stop(&state(Direction::Minimize, &[inf, inf, inf, 2.0])));
    }

    #[test]
    fn test_progress() {
        let mut s = state(Direction::Minimize, &[1.0]);
        s.set_generation(5);
        s.set_evaluations(30);
        assert_eq!(Termination::MaxGenerations(20).progress(&s), Some(0.25));
        assert_eq!(Termination::MaxEvaluations(20).progress(&s), Some(1.0));
        assert_eq!(Termination::TargetFitness(0.0).progress(&s), None);

        let any = Termination::MaxGenerations(20).or(Termination::MaxEvaluations(60));
        assert_eq!(any.progress(&s), Some(0.5));
        let all = Termination::MaxGenerations(20).and(Termination::MaxEvaluations(60));
        assert_eq!(all.progress(&s), Some(0.25));
        assert_eq!(
            Termination::TargetFitness(0.0)
                .or(Termination::MaxGenerations(10))
                .progress(&s),
            Some(0.5)
        );
    }

    #[test]
    fn test_combinators() {
        let mut s = state(Direction::Minimize, &[1.0]);
        s.set_generation(5);
        let any = Termination::MaxGenerations(5).or(Termination::MaxEvaluations(10));
        let all = Termination::MaxGenerations(5).and(Termination::MaxEvaluations(10));
        assert!(any.should_stop(&s));
        assert!(!all.should_stop(&s));
        s.set_evaluations(10);
        assert_eq!(
            all.reason(&s),
            Some(TerminationReason::BudgetExceeded(Budget::Generations))
        );
        assert!(!Termination::Any(vec![]).should_stop(&s));
        assert!(!Termination::All(vec![]).should_stop(&s));
    }

    #[test]
    fn test_pure_and_idempotent() {
        let s = state(Direction::Minimize, &[2.0, 2.0]);
        let t = Termination::Stagnation {
            window: 1,
            tolerance: 0.0,
        };
        let before = s.clone();
        assert_eq!(t.reason(&s), t.reason(&s));
        assert_eq!(s, before);
    }

    #[test]
    fn test_evaluation_cap_and_bounds() {
        let t = Termination::MaxEvaluations(500)
            .or(Termination::MaxEvaluations(200))
            .or(Termination::TargetFitness(0.0));
        assert_eq!(t.evaluation_cap(), Some(200));
        assert!(t.is_bounded());
        assert_eq!(
            Termination::MaxEvaluations(5)
                .and(Termination::MaxGenerations(1))
                .evaluation_cap(),
            None
        );
        assert!(!Termination::TargetFitness(0.0).is_bounded());
        assert!(!Termination::All(vec![]).is_bounded());
    }

    #[test]
    fn test_validate() {
        assert!(Termination::Stagnation {
            window: 0,
            tolerance: 0.0
        }
        .validate()
        .is_err());
        assert!(Termination::MaxGenerations(1)
            .or(Termination::Stagnation {
                window: 3,
                tolerance: -1.0
            })
            .validate()
            .is_err());
        assert!(Termination::default().validate().is_ok());
    }
}
