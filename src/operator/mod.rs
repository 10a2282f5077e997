//! Variation operators and their composition.
//!
//! Every operator declares an input/output [`Arity`]. Operators are chained
//! into a [`Pipeline`], whose construction rejects incompatible neighbours
//! with [`Error::ArityMismatch`](crate::error::Error::ArityMismatch) before
//! any evaluation budget is spent.
//!
//! # Families
//!
//! - generic: [`Identity`], [`RandomRestart`], [`WithProbability`],
//!   [`Neighborhood`], [`Pipeline`]
//! - real vectors: [`GaussianMutation`], [`UniformMutation`],
//!   [`BlxAlphaCrossover`], [`DifferentialMutation`],
//!   [`MultiParentCrossover`]
//! - sequences: [`OnePointCrossover`], [`UniformCrossover`],
//!   [`BitFlipMutation`], [`SplitOperator`]
//! - permutations: [`PermutationOperator`] and the free functions in
//!   [`permutation`]
//! - particles: [`SwarmUpdate`]
//!
//! Parameters such as the Gaussian σ or a [`WithProbability`] rate can
//! follow a [`Schedule`] driven by search progress.

mod generic;
pub mod permutation;
mod pipeline;
mod real;
mod schedule;
mod sequence;
mod swarm;
mod types;

pub use generic::{Identity, Neighborhood, RandomRestart, WithProbability};
pub use permutation::PermutationOperator;
pub use pipeline::Pipeline;
pub use real::{
    BlxAlphaCrossover, DifferentialMutation, GaussianMutation, MultiParentCrossover,
    UniformMutation,
};
pub use schedule::{Schedule, Shape};
pub use sequence::{BitFlipMutation, OnePointCrossover, SplitOperator, UniformCrossover};
pub use swarm::SwarmUpdate;
pub use types::{Arity, Capability, Operator, OperatorContext};
