//! Resumable engine snapshots.

use super::state::{SearchState, SearchStatus};
use crate::population::Population;
use crate::random::SearchRng;
use std::time::Duration;

/// Everything needed to continue a run exactly where it stopped.
///
/// Taken by [`SearchEngine::checkpoint`](super::SearchEngine::checkpoint)
/// and consumed by [`SearchEngine::resume`](super::SearchEngine::resume).
/// The random generator is captured mid-stream, so a resumed run follows
/// the same trajectory as the uninterrupted one would have, given the same
/// operators and configuration.
///
/// With the `serde` feature a checkpoint can be written to disk and read
/// back by a later process.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Checkpoint<G> {
    pub(crate) population: Population<G>,
    pub(crate) state: SearchState<G>,
    pub(crate) status: SearchStatus,
    pub(crate) rng: SearchRng,
    pub(crate) evaluations: u64,
    pub(crate) elapsed: Duration,
    pub(crate) seed: u64,
}

impl<G> Checkpoint<G> {
    pub fn population(&self) -> &Population<G> {
        &self.population
    }

    pub fn state(&self) -> &SearchState<G> {
        &self.state
    }

    pub fn status(&self) -> SearchStatus {
        self.status
    }

    pub fn generation(&self) -> usize {
        self.state.generation()
    }

    pub fn evaluations(&self) -> u64 {
        self.evaluations
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }
}
