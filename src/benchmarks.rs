//! Standard test functions.
//!
//! All real-valued functions are minimized and have their global minimum
//! 0 at the point listed. Pair them with [`Objective::from_fn`] through a
//! closure, e.g. `|x: &Vec<f64>| Ok(sphere(x))`.
//!
//! | Function | Usual domain | Minimum at |
//! |----------|--------------|------------|
//! | [`sphere`] | [-5.12, 5.12]^n | origin |
//! | [`rastrigin`] | [-5.12, 5.12]^n | origin |
//! | [`rosenbrock`] | [-5, 10]^n | (1, …, 1) |
//! | [`ackley`] | [-32.768, 32.768]^n | origin |
//!
//! [`onemax`] is maximized (n at all ones).
//!
//! [`Objective::from_fn`]: crate::objective::Objective::from_fn

use std::f64::consts::{E, PI};

pub fn sphere(x: &[f64]) -> f64 {
    x.iter().map(|v| v * v).sum()
}

/// Highly multimodal: a cosine grid over a sphere.
pub fn rastrigin(x: &[f64]) -> f64 {
    const A: f64 = 10.0;
    A * x.len() as f64
        + x.iter()
            .map(|v| v * v - A * (2.0 * PI * v).cos())
            .sum::<f64>()
}

/// Narrow curved valley. Needs at least two dimensions to be interesting;
/// returns 0 for fewer.
pub fn rosenbrock(x: &[f64]) -> f64 {
    x.windows(2)
        .map(|w| 100.0 * (w[1] - w[0] * w[0]).powi(2) + (1.0 - w[0]).powi(2))
        .sum()
}

pub fn ackley(x: &[f64]) -> f64 {
    if x.is_empty() {
        return 0.0;
    }
    let n = x.len() as f64;
    let squares = x.iter().map(|v| v * v).sum::<f64>() / n;
    let cosines = x.iter().map(|v| (2.0 * PI * v).cos()).sum::<f64>() / n;
    -20.0 * (-0.2 * squares.sqrt()).exp() - cosines.exp() + 20.0 + E
}

/// Number of set bits.
pub fn onemax(bits: &[bool]) -> f64 {
    bits.iter().filter(|&&b| b).count() as f64
}
