//! Parent selection.
//!
//! Selection decides which individuals feed the operator pipeline.
//! Different strategies give different selection pressure.
//!
//! All strategies work on normalized fitness (lower is better) and only
//! consider evaluated individuals.
//!
//! # References
//!
//! - Blickle & Thiele (1996), "A Comparison of Selection Schemes used in
//!   Evolutionary Algorithms"
//! - Baker (1985), "Adaptive Selection Methods for Genetic Algorithms"

use crate::error::{Error, Result};
use crate::individual::{compare_fitness, Individual};
use crate::population::Population;
use rand::Rng;

/// Parent selection strategy.
///
/// # Examples
///
/// ```
/// use u_metadesign::selection::Selection;
///
/// // Tournament with size 3 (moderate selection pressure)
/// let sel = Selection::Tournament(3);
/// assert!(sel.validate().is_ok());
/// assert!(Selection::Tournament(0).validate().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Selection {
    /// Draw `k` candidates with replacement, keep the best (first drawn
    /// wins ties).
    ///
    /// - k=2: light pressure
    /// - k=3-5: moderate pressure (typical default)
    /// - k>5: strong pressure (risk of premature convergence)
    Tournament(usize),

    /// Fitness-proportionate selection with inverted weights
    /// `max − f + ε`. Individuals with non-finite fitness get no weight.
    Roulette,

    /// Linear ranking with selection pressure 2: the best gets weight
    /// `n`, the worst weight 1.
    Rank,

    /// The `n` best, deterministically. Cycles if more parents are
    /// requested than there are candidates.
    Elitist,

    /// Uniform with replacement.
    Random,

    /// Population order, cycling. Pairs offspring `i` with parent `i`.
    Sequential,
}

impl Default for Selection {
    fn default() -> Self {
        Selection::Tournament(3)
    }
}

impl Selection {
    /// Checks parameters.
    pub fn validate(&self) -> Result<()> {
        match self {
            Selection::Tournament(0) => Err(Error::Configuration(
                "tournament size must be at least 1".into(),
            )),
            _ => Ok(()),
        }
    }

    /// Selects `n` parents (cloned) from the evaluated members of
    /// `population`.
    ///
    /// # Errors
    ///
    /// [`Error::Selection`] if there is no evaluated member, or (roulette)
    /// no member with finite fitness.
    pub fn select<G: Clone, R: Rng + ?Sized>(
        &self,
        population: &Population<G>,
        n: usize,
        rng: &mut R,
    ) -> Result<Vec<Individual<G>>> {
        let candidates: Vec<&Individual<G>> =
            population.iter().filter(|i| i.is_evaluated()).collect();
        if candidates.is_empty() {
            return Err(Error::Selection(format!(
                "no evaluated individual among {}",
                population.size()
            )));
        }

        let picked: Vec<usize> = match *self {
            Selection::Tournament(k) => (0..n).map(|_| tournament(&candidates, k, rng)).collect(),
            Selection::Roulette => roulette(&candidates, n, rng)?,
            Selection::Rank => rank(&candidates, n, rng),
            Selection::Elitist => {
                let order = sorted(&candidates);
                (0..n).map(|i| order[i % order.len()]).collect()
            }
            Selection::Random => (0..n)
                .map(|_| rng.random_range(0..candidates.len()))
                .collect(),
            Selection::Sequential => (0..n).map(|i| i % candidates.len()).collect(),
        };
        Ok(picked.into_iter().map(|i| candidates[i].clone()).collect())
    }
}

fn sorted<G>(candidates: &[&Individual<G>]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..candidates.len()).collect();
    order.sort_by(|&a, &b| compare_fitness(candidates[a].fitness(), candidates[b].fitness()));
    order
}

fn tournament<G, R: Rng + ?Sized>(candidates: &[&Individual<G>], k: usize, rng: &mut R) -> usize {
    let n = candidates.len();
    let mut best = rng.random_range(0..n);
    for _ in 1..k.max(1) {
        let idx = rng.random_range(0..n);
        if candidates[idx].is_better_than(candidates[best]) {
            best = idx;
        }
    }
    best
}

/// Cumulative-weight draw; `weights` must have a positive total.
fn spin<R: Rng + ?Sized>(weights: &[f64], total: f64, rng: &mut R) -> usize {
    let target = rng.random_range(0.0..total);
    let mut acc = 0.0;
    for (i, &w) in weights.iter().enumerate() {
        acc += w;
        if acc > target {
            return i;
        }
    }
    // rounding: fall back to the last positive weight
    weights.iter().rposition(|&w| w > 0.0).unwrap_or(0)
}

fn roulette<G, R: Rng + ?Sized>(
    candidates: &[&Individual<G>],
    n: usize,
    rng: &mut R,
) -> Result<Vec<usize>> {
    let fitness: Vec<Option<f64>> = candidates
        .iter()
        .map(|c| c.fitness().filter(|f| f.is_finite()))
        .collect();
    let max = fitness
        .iter()
        .flatten()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);
    if max == f64::NEG_INFINITY {
        return Err(Error::Selection(
            "roulette needs at least one finite fitness".into(),
        ));
    }

    let epsilon = 1e-10;
    let weights: Vec<f64> = fitness
        .iter()
        .map(|f| match f {
            Some(f) => (max - f).max(0.0) + epsilon,
            None => 0.0,
        })
        .collect();
    let total: f64 = weights.iter().sum();
    if !(total.is_finite() && total > 0.0) {
        // extreme spreads overflow; fall back to uniform among finite ones
        let finite: Vec<usize> = (0..fitness.len()).filter(|&i| fitness[i].is_some()).collect();
        return Ok((0..n)
            .map(|_| finite[rng.random_range(0..finite.len())])
            .collect());
    }
    Ok((0..n).map(|_| spin(&weights, total, rng)).collect())
}

fn rank<G, R: Rng + ?Sized>(candidates: &[&Individual<G>], n: usize, rng: &mut R) -> Vec<usize> {
    let order = sorted(candidates);
    let m = order.len();
    // order[0] is best and gets weight m
    let weights: Vec<f64> = (0..m).map(|r| (m - r) as f64).collect();
    let total = (m * (m + 1) / 2) as f64;
    (0..n).map(|_| order[spin(&weights, total, rng)]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::individual::Evaluation;
    use crate::random::create_rng;

    fn population(fitness: &[Option<f64>]) -> Population<usize> {
        fitness
            .iter()
            .enumerate()
            .map(|(tag, f)| {
                let ind = Individual::new(tag);
                match f {
                    Some(f) => ind.with_evaluation(Evaluation {
                        fitness: *f,
                        objective: *f,
                    }),
                    None => ind,
                }
            })
            .collect()
    }

    fn tags(selected: &[Individual<usize>]) -> Vec<usize> {
        selected.iter().map(|i| *i.genotype()).collect()
    }

    #[test]
    fn test_unevaluated_never_selected() {
        let pop = population(&[None, Some(1.0), None, Some(2.0)]);
        let mut rng = create_rng(42);
        for sel in [
            Selection::Tournament(2),
            Selection::Roulette,
            Selection::Rank,
            Selection::Elitist,
            Selection::Random,
            Selection::Sequential,
        ] {
            let picked = sel.select(&pop, 50, &mut rng).unwrap();
            assert_eq!(picked.len(), 50);
            assert!(
                picked.iter().all(|i| *i.genotype() == 1 || *i.genotype() == 3),
                "{sel:?} selected an unevaluated individual"
            );
        }
    }

    #[test]
    fn test_empty_candidates_is_error() {
        let pop = population(&[None, None]);
        let mut rng = create_rng(42);
        assert!(matches!(
            Selection::Tournament(3).select(&pop, 1, &mut rng),
            Err(Error::Selection(_))
        ));
    }

    #[test]
    fn test_roulette_needs_finite() {
        let pop = population(&[Some(f64::INFINITY), Some(f64::INFINITY)]);
        let mut rng = create_rng(42);
        assert!(matches!(
            Selection::Roulette.select(&pop, 1, &mut rng),
            Err(Error::Selection(_))
        ));

        let pop = population(&[Some(f64::INFINITY), Some(4.0)]);
        let picked = Selection::Roulette.select(&pop, 20, &mut rng).unwrap();
        assert!(tags(&picked).iter().all(|&t| t == 1));
    }

    #[test]
    fn test_roulette_favors_best() {
        let pop = population(&[Some(0.0), Some(10.0), Some(10.0)]);
        let mut rng = create_rng(7);
        let picked = Selection::Roulette.select(&pop, 1000, &mut rng).unwrap();
        let best = tags(&picked).iter().filter(|&&t| t == 0).count();
        assert!(best > 900, "best picked only {best} times");
    }

    #[test]
    fn test_tournament_pressure() {
        let pop = population(&[Some(5.0), Some(1.0), Some(3.0), Some(4.0)]);
        let mut rng = create_rng(3);
        let picked = Selection::Tournament(10).select(&pop, 200, &mut rng).unwrap();
        let best = tags(&picked).iter().filter(|&&t| t == 1).count();
        assert!(best > 150, "tournament(10) picked the best only {best} times");
    }

    #[test]
    fn test_rank_favors_better() {
        let pop = population(&[Some(3.0), Some(1.0), Some(2.0)]);
        let mut rng = create_rng(11);
        let picked = Selection::Rank.select(&pop, 3000, &mut rng).unwrap();
        let count = |t| tags(&picked).iter().filter(|&&x| x == t).count();
        assert!(count(1) > count(2) && count(2) > count(0));
    }

    #[test]
    fn test_elitist_and_sequential_are_deterministic() {
        let pop = population(&[Some(3.0), Some(1.0), Some(2.0)]);
        let mut rng = create_rng(1);
        let elite = Selection::Elitist.select(&pop, 4, &mut rng).unwrap();
        assert_eq!(tags(&elite), vec![1, 2, 0, 1]);
        let seq = Selection::Sequential.select(&pop, 4, &mut rng).unwrap();
        assert_eq!(tags(&seq), vec![0, 1, 2, 0]);
    }

    #[test]
    fn test_selection_keeps_cached_fitness() {
        let pop = population(&[Some(2.0)]);
        let mut rng = create_rng(1);
        let picked = Selection::Random.select(&pop, 2, &mut rng).unwrap();
        assert!(picked.iter().all(|i| i.fitness() == Some(2.0)));
    }
}
