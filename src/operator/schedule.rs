//! Operator parameters that change with search progress.
//!
//! The engine computes a progress fraction in `[0, 1]` from the
//! termination criterion before every generation and hands it to
//! [`Operator::update`](super::Operator::update). Operators built with a
//! [`Schedule`] move their parameter from `start` to `end` as progress goes
//! from 0 to 1.

use crate::error::{Error, Result};

/// Interpolation between the two end points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Shape {
    /// `start + (end - start) * p`.
    Linear,
    /// `start * (end / start)^p`; both ends must be positive.
    Exponential,
}

/// A parameter value as a function of search progress.
///
/// # Examples
///
/// ```
/// use u_metadesign::operator::Schedule;
///
/// let sigma = Schedule::linear(1.0, 0.1);
/// assert_eq!(sigma.value(0.0), 1.0);
/// assert!((sigma.value(0.5) - 0.55).abs() < 1e-12);
/// assert!((sigma.value(7.0) - 0.1).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Schedule {
    pub start: f64,
    pub end: f64,
    pub shape: Shape,
}

impl Schedule {
    pub fn linear(start: f64, end: f64) -> Self {
        Self {
            start,
            end,
            shape: Shape::Linear,
        }
    }

    pub fn exponential(start: f64, end: f64) -> Self {
        Self {
            start,
            end,
            shape: Shape::Exponential,
        }
    }

    /// Value at `progress`, clamped to `[0, 1]`. NaN progress counts as 0.
    pub fn value(&self, progress: f64) -> f64 {
        let p = if progress.is_nan() {
            0.0
        } else {
            progress.clamp(0.0, 1.0)
        };
        match self.shape {
            Shape::Linear => self.start + (self.end - self.start) * p,
            Shape::Exponential => self.start * (self.end / self.start).powf(p),
        }
    }

    /// Checks that both end points lie in `range` (and are positive for
    /// the exponential shape). `what` names the parameter in the error.
    pub fn validate(&self, what: &str, range: std::ops::RangeInclusive<f64>) -> Result<()> {
        let ends = [self.start, self.end];
        if !ends.iter().all(|v| v.is_finite() && range.contains(v)) {
            return Err(Error::Configuration(format!(
                "{what} schedule must stay within [{}, {}], got {} -> {}",
                range.start(),
                range.end(),
                self.start,
                self.end
            )));
        }
        if self.shape == Shape::Exponential && ends.iter().any(|&v| v <= 0.0) {
            return Err(Error::Configuration(format!(
                "exponential {what} schedule needs positive end points"
            )));
        }
        Ok(())
    }
}
