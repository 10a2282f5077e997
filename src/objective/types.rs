//! User-facing objective traits.

/// Optimization direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Direction {
    #[default]
    Minimize,
    Maximize,
}

impl Direction {
    /// Multiplier that maps raw values to "lower is better".
    pub fn sign(self) -> f64 {
        match self {
            Direction::Minimize => 1.0,
            Direction::Maximize => -1.0,
        }
    }

    /// Raw objective → normalized fitness (without penalty).
    pub fn normalize(self, raw: f64) -> f64 {
        self.sign() * raw
    }

    /// Normalized fitness → value in the user's direction.
    pub fn denormalize(self, fitness: f64) -> f64 {
        self.sign() * fitness
    }

    /// Whether raw value `a` is strictly better than `b`.
    pub fn is_better(self, a: f64, b: f64) -> bool {
        self.normalize(a) < self.normalize(b)
    }
}

/// A user-supplied objective over phenotypes of type `P`.
///
/// # Thread Safety
///
/// Must be `Send + Sync`: offspring may be evaluated on a worker pool.
///
/// # Failure
///
/// Returning `Err` aborts the run; the engine never retries or scores a
/// failed evaluation.
pub trait ObjectiveFn<P: ?Sized>: Send + Sync {
    /// Computes the raw objective value.
    fn evaluate(&self, phenotype: &P) -> anyhow::Result<f64>;

    /// Constraint-violation penalty added to the normalized fitness.
    ///
    /// Must be non-negative; larger means further from feasibility.
    /// The default is 0 (unconstrained).
    fn penalty(&self, _phenotype: &P) -> f64 {
        0.0
    }

    /// Display name used in logs and reports.
    fn name(&self) -> &str {
        "objective"
    }

    /// Evaluates a batch of phenotypes, one result per input, in order.
    ///
    /// Override when the function is cheaper in bulk (a vectorized
    /// simulator, a batched model call). The default calls
    /// [`evaluate`](Self::evaluate) in order and stops calling at the
    /// first failure; the remaining slots are reported as skipped.
    fn evaluate_batch(&self, phenotypes: &[&P]) -> Vec<anyhow::Result<f64>> {
        let mut failed = false;
        phenotypes
            .iter()
            .map(|p| {
                if failed {
                    return Err(anyhow::anyhow!("skipped after an earlier failure in the batch"));
                }
                let result = self.evaluate(p);
                failed = result.is_err();
                result
            })
            .collect()
    }
}

/// Adapts a closure `Fn(&P) -> anyhow::Result<f64>` into an [`ObjectiveFn`].
pub struct FnObjective<F> {
    f: F,
    name: String,
}

impl<F> FnObjective<F> {
    pub fn new(f: F) -> Self {
        Self {
            f,
            name: "objective".into(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl<P: ?Sized, F> ObjectiveFn<P> for FnObjective<F>
where
    F: Fn(&P) -> anyhow::Result<f64> + Send + Sync,
{
    fn evaluate(&self, phenotype: &P) -> anyhow::Result<f64> {
        (self.f)(phenotype)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Adapts a closure over a whole batch, `Fn(&[&P]) -> anyhow::Result<Vec<f64>>`,
/// into an [`ObjectiveFn`].
///
/// Single evaluations go through the same closure with a batch of one.
/// A failing call fails the whole batch.
pub struct BatchFnObjective<F> {
    f: F,
    name: String,
}

impl<F> BatchFnObjective<F> {
    pub fn new(f: F) -> Self {
        Self {
            f,
            name: "batch objective".into(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl<P: ?Sized, F> ObjectiveFn<P> for BatchFnObjective<F>
where
    F: Fn(&[&P]) -> anyhow::Result<Vec<f64>> + Send + Sync,
{
    fn evaluate(&self, phenotype: &P) -> anyhow::Result<f64> {
        let values = (self.f)(&[phenotype])?;
        match values.as_slice() {
            [value] => Ok(*value),
            _ => anyhow::bail!("batch of one returned {} values", values.len()),
        }
    }

    fn evaluate_batch(&self, phenotypes: &[&P]) -> Vec<anyhow::Result<f64>> {
        match (self.f)(phenotypes) {
            Ok(values) => values.into_iter().map(Ok).collect(),
            Err(e) => {
                let mut out: Vec<anyhow::Result<f64>> = vec![Err(e)];
                out.extend(
                    (1..phenotypes.len()).map(|_| Err(anyhow::anyhow!("batch evaluation failed"))),
                );
                out
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}
