//! The search engine.
//!
//! # Lifecycle
//!
//! [`SearchEngine::new`] validates the configuration,
//! [`initialize`](SearchEngine::initialize) builds and evaluates the first
//! population, [`step`](SearchEngine::step) runs one generation and
//! [`run`](SearchEngine::run) does both until a [`Termination`] criterion
//! fires.
//!
//! # Variants
//!
//! - [`IslandModel`]: several engines with ring migration.
//! - [`presets`]: classic algorithms expressed as engine configurations.
//!
//! [`Termination`]: crate::termination::Termination

mod checkpoint;
mod config;
mod island;
pub mod presets;
mod runner;
mod state;

pub use checkpoint::Checkpoint;
pub use config::SearchConfig;
pub use island::{IslandModel, IslandResult, Migration};
pub use presets::PresetSettings;
pub use runner::SearchEngine;
pub use state::{
    Budget, Convergence, SearchResult, SearchState, SearchStatus, SearchSummary, Snapshot,
    TerminationReason,
};
