//! Composable metaheuristic search engine.
//!
//! Instead of one hard-wired loop per algorithm, a search is assembled from
//! small interchangeable blocks:
//!
//! - **Encoding**: maps the genotype operators work on to the phenotype
//!   the objective sees, and repairs out-of-domain genotypes.
//! - **Objective**: user function plus optimization direction; counts
//!   evaluations and normalizes fitness so that lower is always better.
//! - **Operators**: mutation, crossover, local search and restart blocks
//!   with declared arities, chained into an arity-checked pipeline.
//! - **Selection / Replacement**: who breeds and who survives.
//! - **Termination**: composable stopping criteria.
//!
//! The [`search::SearchEngine`] drives these blocks through a generation
//! loop with deterministic seeding, optional parallel evaluation, observers,
//! cancellation and checkpoints. Genetic algorithms, simulated annealing,
//! evolution strategies, differential evolution, harmony search, hill
//! climbing, random search and particle swarm are all configurations of
//! the same engine (see [`search::presets`]).
//!
//! # Architecture
//!
//! The crate contains no domain concepts. Scheduling, routing, design
//! problems and the like are expressed by consumers through encodings and
//! objective functions.
//!
//! # Features
//!
//! - `parallel` (default): evaluate offspring on a rayon thread pool when
//!   `workers > 1`.
//! - `serde`: serialization of configurations, snapshots, summaries and
//!   checkpoints.

pub mod benchmarks;
pub mod comparison;
pub mod encoding;
pub mod error;
pub mod individual;
pub mod initializer;
pub mod objective;
pub mod operator;
pub mod population;
pub mod random;
pub mod replacement;
pub mod search;
pub mod selection;
pub mod termination;

pub use error::{Error, Result};
