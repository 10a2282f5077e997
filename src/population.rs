//! Ordered collection of individuals.

use crate::error::{Error, Result};
use crate::individual::{compare_fitness, Individual};

/// Summary statistics over the evaluated members of a population.
///
/// All values are normalized fitness (lower is better).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FitnessStats {
    pub best: f64,
    pub worst: f64,
    pub mean: f64,
    /// Population standard deviation.
    pub std_dev: f64,
}

/// The live population of one search.
///
/// Order is meaningful: some strategies (sequential selection, one-to-one
/// replacement, annealing) pair offspring with parents by position.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Population<G> {
    individuals: Vec<Individual<G>>,
}

impl<G> Population<G> {
    pub fn new(individuals: Vec<Individual<G>>) -> Self {
        Self { individuals }
    }

    pub fn size(&self) -> usize {
        self.individuals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.individuals.is_empty()
    }

    pub fn individuals(&self) -> &[Individual<G>] {
        &self.individuals
    }

    pub fn into_individuals(self) -> Vec<Individual<G>> {
        self.individuals
    }

    pub fn get(&self, index: usize) -> Option<&Individual<G>> {
        self.individuals.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Individual<G>> {
        self.individuals.iter()
    }

    /// Stable sort by fitness: best first, unevaluated last, ties keep
    /// their current order.
    pub fn sort(&mut self) {
        self.individuals
            .sort_by(|a, b| compare_fitness(a.fitness(), b.fitness()));
    }

    /// Indices in [`sort`](Self::sort) order, without reordering.
    pub fn sorted_indices(&self) -> Vec<usize> {
        let mut idx: Vec<usize> = (0..self.individuals.len()).collect();
        idx.sort_by(|&a, &b| {
            compare_fitness(self.individuals[a].fitness(), self.individuals[b].fitness())
        });
        idx
    }

    /// Best evaluated individual; the first one on ties.
    pub fn best(&self) -> Option<&Individual<G>> {
        self.individuals
            .iter()
            .filter(|i| i.is_evaluated())
            .reduce(|best, i| if i.is_better_than(best) { i } else { best })
    }

    /// Worst evaluated individual; the last one on ties.
    pub fn worst(&self) -> Option<&Individual<G>> {
        self.worst_index().map(|i| &self.individuals[i])
    }

    pub(crate) fn worst_index(&self) -> Option<usize> {
        self.individuals
            .iter()
            .enumerate()
            .filter(|(_, ind)| ind.is_evaluated())
            .reduce(|worst, cur| {
                if compare_fitness(cur.1.fitness(), worst.1.fitness()).is_ge() {
                    cur
                } else {
                    worst
                }
            })
            .map(|(i, _)| i)
    }

    /// Replaces the members at `indices` by `replacements`, pairwise.
    ///
    /// # Errors
    ///
    /// [`Error::Configuration`] if the lengths differ or an index is out of
    /// range; the population is left unchanged.
    pub fn replace(&mut self, indices: &[usize], replacements: Vec<Individual<G>>) -> Result<()> {
        if indices.len() != replacements.len() {
            return Err(Error::Configuration(format!(
                "replace got {} indices but {} individuals",
                indices.len(),
                replacements.len()
            )));
        }
        if let Some(&bad) = indices.iter().find(|&&i| i >= self.individuals.len()) {
            return Err(Error::Configuration(format!(
                "replace index {bad} out of range for population of {}",
                self.individuals.len()
            )));
        }
        for (&i, ind) in indices.iter().zip(replacements) {
            self.individuals[i] = ind;
        }
        Ok(())
    }

    pub fn evaluated_count(&self) -> usize {
        self.individuals.iter().filter(|i| i.is_evaluated()).count()
    }

    /// Statistics over evaluated members; `None` if there are none.
    pub fn fitness_stats(&self) -> Option<FitnessStats> {
        let values: Vec<f64> = self.individuals.iter().filter_map(|i| i.fitness()).collect();
        if values.is_empty() {
            return None;
        }
        let n = values.len() as f64;
        let best = values.iter().copied().fold(f64::INFINITY, f64::min);
        let worst = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        Some(FitnessStats {
            best,
            worst,
            mean,
            std_dev: variance.sqrt(),
        })
    }

    /// Mean pairwise distance between genotypes under `metric`.
    ///
    /// 0 for populations of fewer than two members.
    pub fn diversity<F>(&self, metric: F) -> f64
    where
        F: Fn(&G, &G) -> f64,
    {
        let n = self.individuals.len();
        if n < 2 {
            return 0.0;
        }
        let mut total = 0.0;
        for i in 0..n {
            for j in (i + 1)..n {
                total += metric(self.individuals[i].genotype(), self.individuals[j].genotype());
            }
        }
        total / (n * (n - 1) / 2) as f64
    }

    /// Splits into `k` contiguous islands of near-equal size.
    ///
    /// # Errors
    ///
    /// [`Error::Configuration`] if `k` is zero or exceeds the size.
    pub fn split_islands(self, k: usize) -> Result<Vec<Population<G>>> {
        let n = self.individuals.len();
        if k == 0 || k > n {
            return Err(Error::Configuration(format!(
                "cannot split {n} individuals into {k} islands"
            )));
        }
        let (base, extra) = (n / k, n % k);
        let mut rest = self.individuals.into_iter();
        Ok((0..k)
            .map(|i| {
                let take = base + usize::from(i < extra);
                Population::new(rest.by_ref().take(take).collect())
            })
            .collect())
    }

    /// Concatenates islands back into one population.
    pub fn from_islands(islands: Vec<Population<G>>) -> Self {
        Self::new(islands.into_iter().flat_map(|p| p.individuals).collect())
    }
}

impl<G> FromIterator<Individual<G>> for Population<G> {
    fn from_iter<I: IntoIterator<Item = Individual<G>>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::individual::Evaluation;

    fn ind(tag: u32, fitness: Option<f64>) -> Individual<u32> {
        let i = Individual::new(tag);
        match fitness {
            Some(f) => i.with_evaluation(Evaluation {
                fitness: f,
                objective: f,
            }),
            None => i,
        }
    }

    fn pop() -> Population<u32> {
        Population::new(vec![
            ind(0, Some(3.0)),
            ind(1, None),
            ind(2, Some(1.0)),
            ind(3, Some(3.0)),
            ind(4, Some(1.0)),
        ])
    }

    #[test]
    fn test_sort_is_stable_with_unevaluated_last() {
        let mut p = pop();
        p.sort();
        let tags: Vec<u32> = p.iter().map(|i| *i.genotype()).collect();
        assert_eq!(tags, vec![2, 4, 0, 3, 1]);
        assert_eq!(pop().sorted_indices(), vec![2, 4, 0, 3, 1]);
    }

    #[test]
    fn test_best_and_worst_ties() {
        let p = pop();
        assert_eq!(p.best().map(|i| *i.genotype()), Some(2));
        assert_eq!(p.worst().map(|i| *i.genotype()), Some(3));
        assert!(Population::new(vec![ind(0, None)]).best().is_none());
    }

    #[test]
    fn test_replace_checks_lengths() {
        let mut p = pop();
        assert!(p.replace(&[0, 1], vec![ind(9, Some(0.0))]).is_err());
        assert!(p.replace(&[7], vec![ind(9, Some(0.0))]).is_err());
        assert_eq!(p, pop());
        p.replace(&[1], vec![ind(9, Some(0.0))]).unwrap();
        assert_eq!(p.size(), 5);
        assert_eq!(p.get(1).map(|i| *i.genotype()), Some(9));
    }

    #[test]
    fn test_fitness_stats() {
        let s = pop().fitness_stats().unwrap();
        assert_eq!(s.best, 1.0);
        assert_eq!(s.worst, 3.0);
        assert_eq!(s.mean, 2.0);
        assert!((s.std_dev - 1.0).abs() < 1e-12);
        assert_eq!(pop().evaluated_count(), 4);
    }

    #[test]
    fn test_diversity() {
        let p: Population<u32> = (0..3).map(|t| ind(t, None)).collect();
        let d = p.diversity(|a, b| (*a as f64 - *b as f64).abs());
        // pairs: 1, 2, 1
        assert!((d - 4.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_islands_round_trip() {
        let islands = pop().split_islands(2).unwrap();
        assert_eq!(islands[0].size(), 3);
        assert_eq!(islands[1].size(), 2);
        assert_eq!(Population::from_islands(islands), pop());
        assert!(pop().split_islands(0).is_err());
        assert!(pop().split_islands(6).is_err());
    }
}
