//! Repeated runs of several algorithms on the same problem.
//!
//! Each entry is a closure that builds and runs one search from a seed.
//! Repetition `r` of every entry receives the same seed, so algorithms are
//! compared on common random streams.

use crate::error::{Error, Result};
use crate::individual::compare_fitness;
use crate::random::derive_seed;
use crate::search::SearchSummary;
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::{debug, info, instrument};

type Runner = Box<dyn FnMut(u64) -> Result<SearchSummary>>;

/// min / mean / max / sample standard deviation of one measurement.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Stats {
    pub min: f64,
    pub mean: f64,
    pub max: f64,
    /// Sample standard deviation (n − 1); 0 for a single value.
    pub std_dev: f64,
}

impl Stats {
    /// `None` for an empty slice.
    pub fn of(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let n = values.len() as f64;
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean = values.iter().sum::<f64>() / n;
        let std_dev = if values.len() < 2 {
            0.0
        } else {
            (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt()
        };
        Some(Self {
            min,
            mean,
            max,
            std_dev,
        })
    }
}

/// One run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RunRecord {
    pub name: String,
    pub repetition: usize,
    pub seed: u64,
    pub summary: SearchSummary,
}

/// Aggregates for one algorithm.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ComparisonRow {
    pub name: String,
    /// Best raw objective per run.
    pub objective: Stats,
    /// Wall time per run, in seconds.
    pub seconds: Stats,
    pub evaluations: Stats,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ComparisonReport {
    /// One row per algorithm, in registration order.
    pub rows: Vec<ComparisonRow>,
    /// Every run, in execution order.
    pub runs: Vec<RunRecord>,
    /// The run with the best fitness overall (earliest on ties).
    pub best: RunRecord,
}

impl ComparisonReport {
    pub fn row(&self, name: &str) -> Option<&ComparisonRow> {
        self.rows.iter().find(|r| r.name == name)
    }
}

/// Runs every registered algorithm `repetitions` times.
///
/// # Examples
///
/// ```
/// use u_metadesign::comparison::Comparison;
/// use u_metadesign::encoding::{Bounds, BoundedVectorEncoding};
/// use u_metadesign::objective::{Direction, Objective};
/// use u_metadesign::search::presets::{self, PresetSettings};
/// use u_metadesign::termination::Termination;
///
/// fn problem() -> Objective<BoundedVectorEncoding, impl u_metadesign::objective::ObjectiveFn<Vec<f64>>> {
///     let bounds = Bounds::uniform(2, -5.0, 5.0).unwrap();
///     Objective::from_fn(BoundedVectorEncoding::new(bounds), Direction::Minimize, |x: &Vec<f64>| {
///         Ok(x.iter().map(|v| v * v).sum())
///     })
/// }
///
/// let settings = || PresetSettings::default()
///     .with_population_size(10)
///     .with_termination(Termination::MaxGenerations(20));
///
/// let mut comparison = Comparison::new(3)
///     .add("GA", move |seed| {
///         let mut engine = presets::genetic_algorithm(problem(), settings().with_seed(seed))?;
///         Ok(engine.run()?.summary)
///     })
///     .add("RS", move |seed| {
///         let mut engine = presets::random_search(problem(), settings().with_seed(seed))?;
///         Ok(engine.run()?.summary)
///     });
///
/// let report = comparison.run().unwrap();
/// assert_eq!(report.rows.len(), 2);
/// assert_eq!(report.runs.len(), 6);
/// ```
pub struct Comparison {
    repetitions: usize,
    base_seed: u64,
    entries: Vec<(String, Runner)>,
    requested: Vec<String>,
}

impl Comparison {
    pub fn new(repetitions: usize) -> Self {
        Self {
            repetitions,
            base_seed: 0,
            entries: Vec::new(),
            requested: Vec::new(),
        }
    }

    /// Seed from which the per-repetition seeds are derived.
    pub fn with_base_seed(mut self, seed: u64) -> Self {
        self.base_seed = seed;
        self
    }

    /// Registers an algorithm. A repeated name gets a numeric suffix:
    /// the second "GA" becomes "GA2", the third "GA3". The suffix is
    /// bumped past any name already taken, so every entry stays distinct.
    pub fn add(
        mut self,
        name: impl Into<String>,
        run: impl FnMut(u64) -> Result<SearchSummary> + 'static,
    ) -> Self {
        let requested = name.into();
        self.requested.push(requested.clone());
        let repeats = self.requested.iter().filter(|n| **n == requested).count();
        let mut name = if repeats == 1 {
            requested.clone()
        } else {
            format!("{requested}{repeats}")
        };
        let mut suffix = repeats.max(1);
        while self.entries.iter().any(|(n, _)| *n == name) {
            suffix += 1;
            name = format!("{requested}{suffix}");
        }
        self.entries.push((name, Box::new(run)));
        self
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Runs everything and aggregates.
    ///
    /// # Errors
    ///
    /// [`Error::Configuration`] without entries or repetitions; the first
    /// run error otherwise.
    #[instrument(skip(self), fields(algorithms = self.entries.len(), repetitions = self.repetitions))]
    pub fn run(&mut self) -> Result<ComparisonReport> {
        if self.entries.is_empty() {
            return Err(Error::Configuration("nothing to compare".into()));
        }
        if self.repetitions == 0 {
            return Err(Error::Configuration("repetitions must be > 0".into()));
        }

        let mut runs = Vec::with_capacity(self.entries.len() * self.repetitions);
        for (name, run) in &mut self.entries {
            for repetition in 0..self.repetitions {
                let seed = derive_seed(self.base_seed, repetition as u64);
                let summary = run(seed)?;
                debug!(
                    algorithm = %name,
                    repetition,
                    objective = summary.best_objective,
                    "run complete"
                );
                runs.push(RunRecord {
                    name: name.clone(),
                    repetition,
                    seed,
                    summary,
                });
            }
            info!(algorithm = %name, "algorithm finished");
        }

        let mut grouped: HashMap<&str, Vec<&RunRecord>> = HashMap::new();
        for record in &runs {
            grouped.entry(record.name.as_str()).or_default().push(record);
        }
        let rows = self
            .entries
            .iter()
            .filter_map(|(name, _)| {
                let records = grouped.get(name.as_str())?;
                let column = |f: fn(&SearchSummary) -> f64| -> Option<Stats> {
                    Stats::of(&records.iter().map(|r| f(&r.summary)).collect::<Vec<_>>())
                };
                Some(ComparisonRow {
                    name: name.clone(),
                    objective: column(|s| s.best_objective)?,
                    seconds: column(|s| s.elapsed.as_secs_f64())?,
                    evaluations: column(|s| s.evaluations as f64)?,
                })
            })
            .collect();

        let best = runs
            .iter()
            .reduce(|best, r| {
                if compare_fitness(Some(r.summary.best_fitness), Some(best.summary.best_fitness))
                    == Ordering::Less
                {
                    r
                } else {
                    best
                }
            })
            .cloned()
            .ok_or_else(|| Error::State("no runs recorded".into()))?;

        Ok(ComparisonReport { rows, runs, best })
    }
}
