//! Search configuration.
//!
//! [`SearchConfig`] holds every parameter of the generation loop that is
//! not an operator: sizes, strategies, stopping rule, seed and workers.

use crate::error::{Error, Result};
use crate::replacement::Replacement;
use crate::selection::Selection;
use crate::termination::Termination;

/// Configuration of a [`SearchEngine`](super::SearchEngine).
///
/// # Defaults
///
/// ```
/// use u_metadesign::search::SearchConfig;
///
/// let config = SearchConfig::<Vec<f64>>::default();
/// assert_eq!(config.population_size, 100);
/// assert_eq!(config.workers, 1);
/// ```
///
/// # Builder Pattern
///
/// ```
/// use u_metadesign::replacement::Replacement;
/// use u_metadesign::search::SearchConfig;
/// use u_metadesign::selection::Selection;
/// use u_metadesign::termination::Termination;
///
/// let config = SearchConfig::<Vec<f64>>::default()
///     .with_population_size(40)
///     .with_selection(Selection::Tournament(2))
///     .with_replacement(Replacement::Generational { elitism: 2 })
///     .with_termination(Termination::MaxEvaluations(4_000))
///     .with_seed(7);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct SearchConfig<G> {
    /// Number of individuals kept between generations.
    pub population_size: usize,

    /// Offspring produced per generation.
    ///
    /// `None` uses the replacement strategy's default: one for steady
    /// state, the population size otherwise.
    pub offspring_count: Option<usize>,

    pub selection: Selection,

    pub replacement: Replacement,

    pub termination: Termination,

    /// Random seed for reproducibility.
    ///
    /// `None` draws a seed from the OS; the drawn seed is reported by
    /// [`SearchEngine::seed`](super::SearchEngine::seed).
    pub seed: Option<u64>,

    /// Evaluation threads. 1 evaluates on the calling thread.
    pub workers: usize,

    /// Keep a [`Snapshot`](super::Snapshot) of every generation.
    pub retain_history: bool,

    /// Genotypes placed in the initial population before random ones.
    pub initial_population: Vec<G>,
}

impl<G> Default for SearchConfig<G> {
    fn default() -> Self {
        Self {
            population_size: 100,
            offspring_count: None,
            selection: Selection::default(),
            replacement: Replacement::default(),
            termination: Termination::default(),
            seed: None,
            workers: 1,
            retain_history: false,
            initial_population: Vec::new(),
        }
    }
}

impl<G> SearchConfig<G> {
    pub fn with_population_size(mut self, n: usize) -> Self {
        self.population_size = n;
        self
    }

    pub fn with_offspring_count(mut self, n: usize) -> Self {
        self.offspring_count = Some(n);
        self
    }

    pub fn with_selection(mut self, selection: Selection) -> Self {
        self.selection = selection;
        self
    }

    pub fn with_replacement(mut self, replacement: Replacement) -> Self {
        self.replacement = replacement;
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

    pub fn with_retain_history(mut self, retain: bool) -> Self {
        self.retain_history = retain;
        self
    }

    /// Seeds the initial population with known genotypes.
    pub fn with_initial_population(mut self, genotypes: Vec<G>) -> Self {
        self.initial_population = genotypes;
        self
    }

    /// Offspring per generation after applying the default.
    pub fn effective_offspring_count(&self) -> usize {
        self.offspring_count
            .unwrap_or_else(|| self.replacement.default_offspring(self.population_size))
    }

    /// Checks that the configuration is internally consistent.
    pub fn validate(&self) -> Result<()> {
        if self.population_size == 0 {
            return Err(Error::Configuration("population_size must be > 0".into()));
        }
        if self.offspring_count == Some(0) {
            return Err(Error::Configuration("offspring_count must be > 0".into()));
        }
        if self.workers == 0 {
            return Err(Error::Configuration("workers must be > 0".into()));
        }
        if self.initial_population.len() > self.population_size {
            return Err(Error::Configuration(format!(
                "{} initial genotypes exceed population_size {}",
                self.initial_population.len(),
                self.population_size
            )));
        }
        self.selection.validate()?;
        self.replacement
            .validate(self.population_size, self.effective_offspring_count())?;
        self.termination.validate()?;
        if let Some(cap) = self.termination.evaluation_cap() {
            if cap < self.population_size as u64 {
                return Err(Error::Configuration(format!(
                    "evaluation budget {cap} cannot cover the initial population of {}",
                    self.population_size
                )));
            }
        }
        Ok(())
    }
}
