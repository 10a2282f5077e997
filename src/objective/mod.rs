//! Objective functions.
//!
//! Users implement [`ObjectiveFn`] (or wrap a closure in [`FnObjective`]);
//! [`Objective`] combines it with an [`Encoding`](crate::encoding::Encoding)
//! and an optimization [`Direction`], normalizes results to "lower is
//! better", and counts evaluations.
//!
//! Functions that evaluate many candidates at once override
//! [`ObjectiveFn::evaluate_batch`] or wrap a closure in
//! [`BatchFnObjective`]; the engine hands every generation's offspring to
//! it in one call per worker.

mod evaluator;
mod types;

pub use evaluator::Objective;
pub use types::{BatchFnObjective, Direction, FnObjective, ObjectiveFn};
