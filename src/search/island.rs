//! Island model: several engines evolving side by side with periodic
//! migration of their best members.

use super::runner::SearchEngine;
use super::state::{SearchResult, SearchStatus, SearchSummary};
use crate::encoding::Encoding;
use crate::error::{Error, Result};
use crate::individual::compare_fitness;
use crate::objective::ObjectiveFn;
use std::cmp::Ordering;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Migration policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Migration {
    /// Generations between migrations.
    pub interval: usize,
    /// Best members copied from each island to the next one.
    pub migrants: usize,
}

impl Default for Migration {
    fn default() -> Self {
        Self {
            interval: 10,
            migrants: 2,
        }
    }
}

/// Outcome of an island run.
#[derive(Debug, Clone)]
pub struct IslandResult<P, G> {
    /// Result of the island that found the overall best.
    pub best: SearchResult<P, G>,
    /// Index of that island.
    pub island: usize,
    /// One summary per island, in island order.
    pub islands: Vec<SearchSummary>,
}

impl<P, G> IslandResult<P, G> {
    /// Objective evaluations summed over all islands.
    pub fn total_evaluations(&self) -> u64 {
        self.islands.iter().map(|s| s.evaluations).sum()
    }
}

/// Runs k engines in lock-step. Every `interval` generations each island
/// sends copies of its best `migrants` to the next island in a ring; they
/// replace the receiver's worst members.
///
/// All engines must optimize the same objective so that migrated
/// evaluations stay meaningful. Islands that finish early stop taking part
/// in migration; the model runs until every island has finished.
pub struct IslandModel<E: Encoding, F> {
    islands: Vec<SearchEngine<E, F>>,
    migration: Migration,
    cancel: Arc<AtomicBool>,
}

impl<E, F> IslandModel<E, F>
where
    E: Encoding,
    F: ObjectiveFn<E::Phenotype>,
{
    /// Wraps `islands`. All of them share one cancellation token.
    pub fn new(islands: Vec<SearchEngine<E, F>>, migration: Migration) -> Result<Self> {
        if islands.is_empty() {
            return Err(Error::Configuration("island model needs at least one island".into()));
        }
        if migration.interval == 0 {
            return Err(Error::Configuration("migration interval must be > 0".into()));
        }
        let cancel = Arc::new(AtomicBool::new(false));
        let islands = islands
            .into_iter()
            .map(|e| e.with_cancel(Arc::clone(&cancel)))
            .collect();
        Ok(Self {
            islands,
            migration,
            cancel,
        })
    }

    pub fn islands(&self) -> &[SearchEngine<E, F>] {
        &self.islands
    }

    pub fn cancel_token(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Runs every island to completion.
    ///
    /// # Errors
    ///
    /// The first island error aborts the whole model.
    #[instrument(skip(self), fields(islands = self.islands.len()))]
    pub fn run(&mut self) -> Result<IslandResult<E::Phenotype, E::Genotype>> {
        for island in &mut self.islands {
            if island.status() == SearchStatus::Uninitialized {
                island.initialize()?;
            }
        }

        let mut generation = 0usize;
        while self.islands.iter().any(|i| !i.status().is_finished()) {
            for island in self.islands.iter_mut().filter(|i| !i.status().is_finished()) {
                island.step()?;
            }
            generation += 1;
            if generation % self.migration.interval == 0 {
                self.migrate()?;
            }
        }

        let results: Vec<_> = self
            .islands
            .iter()
            .map(|i| i.result())
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| Error::State("an island finished without a result".into()))?;
        let islands: Vec<SearchSummary> = results.iter().map(|r| r.summary.clone()).collect();
        let (island, best) = results
            .into_iter()
            .enumerate()
            .reduce(|a, b| {
                if compare_fitness(Some(b.1.fitness), Some(a.1.fitness)) == Ordering::Less {
                    b
                } else {
                    a
                }
            })
            .ok_or_else(|| Error::State("no islands".into()))?;

        info!(island, best = best.objective, "island model finished");
        Ok(IslandResult {
            best,
            island,
            islands,
        })
    }

    /// One ring migration among the islands that are still running.
    fn migrate(&mut self) -> Result<()> {
        let active: Vec<usize> = (0..self.islands.len())
            .filter(|&i| !self.islands[i].status().is_finished())
            .collect();
        if active.len() < 2 || self.migration.migrants == 0 {
            return Ok(());
        }
        let outgoing: Vec<_> = active
            .iter()
            .map(|&i| self.islands[i].emigrants(self.migration.migrants))
            .collect();
        for (k, migrants) in outgoing.into_iter().enumerate() {
            let target = active[(k + 1) % active.len()];
            self.islands[target].immigrate(migrants)?;
        }
        debug!(islands = active.len(), migrants = self.migration.migrants, "migration");
        Ok(())
    }
}
