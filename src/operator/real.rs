//! Operators on real-valued vectors (`Vec<f64>`).
//!
//! None of these clip to bounds themselves; the engine passes every new
//! genotype through the encoding's `repair` before evaluation.
//!
//! # References
//!
//! - Eshelman & Schaffer (1993), "Real-Coded Genetic Algorithms and
//!   Interval-Schemata" (BLX-α)
//! - Storn & Price (1997), "Differential Evolution"
//! - Geem, Kim & Loganathan (2001), "A New Heuristic Optimization
//!   Algorithm: Harmony Search"

use super::schedule::Schedule;
use super::types::{check_inputs, Arity, Capability, Operator, OperatorContext};
use crate::encoding::Bounds;
use crate::error::{Error, Result};
use crate::individual::Individual;
use rand::Rng;
use rand_distr::{Distribution, Normal};

/// Picks genes to mutate: each with probability `rate`, or, when `rate` is
/// `None`, each with probability `1/n` and at least one.
fn mutation_mask<R: Rng + ?Sized>(n: usize, rate: Option<f64>, rng: &mut R) -> Vec<bool> {
    match rate {
        Some(r) => (0..n).map(|_| rng.random_bool(r)).collect(),
        None => {
            if n == 0 {
                return Vec::new();
            }
            let p = 1.0 / n as f64;
            let mut mask: Vec<bool> = (0..n).map(|_| rng.random_bool(p)).collect();
            if !mask.iter().any(|&m| m) {
                mask[rng.random_range(0..n)] = true;
            }
            mask
        }
    }
}

fn check_rate(rate: f64) -> Result<f64> {
    if (0.0..=1.0).contains(&rate) {
        Ok(rate)
    } else {
        Err(Error::Configuration(format!(
            "mutation rate must be in [0, 1], got {rate}"
        )))
    }
}

/// Adds N(0, σ²) noise to selected genes.
#[derive(Debug, Clone, Copy)]
pub struct GaussianMutation {
    normal: Normal<f64>,
    rate: Option<f64>,
    sigma_schedule: Option<Schedule>,
}

impl GaussianMutation {
    /// # Errors
    ///
    /// [`Error::Configuration`] unless `sigma` is finite and positive.
    pub fn new(sigma: f64) -> Result<Self> {
        if !(sigma.is_finite() && sigma > 0.0) {
            return Err(Error::Configuration(format!(
                "gaussian sigma must be positive, got {sigma}"
            )));
        }
        let normal = Normal::new(0.0, sigma)
            .map_err(|e| Error::Configuration(format!("gaussian sigma: {e}")))?;
        Ok(Self {
            normal,
            rate: None,
            sigma_schedule: None,
        })
    }

    /// Anneals σ along `schedule` as the search progresses, starting
    /// from `schedule.start`.
    pub fn with_sigma_schedule(mut self, schedule: Schedule) -> Result<Self> {
        schedule.validate("sigma", f64::MIN_POSITIVE..=f64::MAX)?;
        self.normal = Normal::new(0.0, schedule.start)
            .map_err(|e| Error::Configuration(format!("gaussian sigma: {e}")))?;
        self.sigma_schedule = Some(schedule);
        Ok(self)
    }

    /// Per-gene mutation probability. The default mutates one gene on
    /// average (and always at least one).
    pub fn with_rate(mut self, rate: f64) -> Result<Self> {
        self.rate = Some(check_rate(rate)?);
        Ok(self)
    }

    pub fn sigma(&self) -> f64 {
        self.normal.std_dev()
    }
}

impl Operator<Vec<f64>> for GaussianMutation {
    fn name(&self) -> &str {
        "gaussian"
    }

    fn arity(&self) -> (Arity, Arity) {
        (Arity::Fixed(1), Arity::Fixed(1))
    }

    fn capability(&self) -> Capability {
        Capability::Mutation
    }

    fn apply(
        &self,
        inputs: Vec<Individual<Vec<f64>>>,
        ctx: &mut OperatorContext<'_, Vec<f64>>,
    ) -> Result<Vec<Individual<Vec<f64>>>> {
        let mut out = Vec::with_capacity(inputs.len());
        for parent in inputs {
            let mut genes = parent.into_genotype();
            let mask = mutation_mask(genes.len(), self.rate, ctx.rng);
            for (gene, hit) in genes.iter_mut().zip(mask) {
                if hit {
                    *gene += self.normal.sample(ctx.rng);
                }
            }
            out.push(ctx.offspring(genes));
        }
        Ok(out)
    }

    fn update(&mut self, progress: f64) {
        let Some(schedule) = self.sigma_schedule else {
            return;
        };
        if let Ok(normal) = Normal::new(0.0, schedule.value(progress)) {
            self.normal = normal;
        }
    }
}

/// Resets selected genes uniformly within their bounds.
#[derive(Debug, Clone)]
pub struct UniformMutation {
    bounds: Bounds,
    rate: Option<f64>,
}

impl UniformMutation {
    pub fn new(bounds: Bounds) -> Self {
        Self { bounds, rate: None }
    }

    pub fn with_rate(mut self, rate: f64) -> Result<Self> {
        self.rate = Some(check_rate(rate)?);
        Ok(self)
    }
}

impl Operator<Vec<f64>> for UniformMutation {
    fn name(&self) -> &str {
        "uniform-reset"
    }

    fn arity(&self) -> (Arity, Arity) {
        (Arity::Fixed(1), Arity::Fixed(1))
    }

    fn capability(&self) -> Capability {
        Capability::Mutation
    }

    fn apply(
        &self,
        inputs: Vec<Individual<Vec<f64>>>,
        ctx: &mut OperatorContext<'_, Vec<f64>>,
    ) -> Result<Vec<Individual<Vec<f64>>>> {
        let mut out = Vec::with_capacity(inputs.len());
        for parent in inputs {
            let mut genes = parent.into_genotype();
            if genes.len() != self.bounds.dim() {
                return Err(Error::Encoding(format!(
                    "uniform reset expects {} genes, got {}",
                    self.bounds.dim(),
                    genes.len()
                )));
            }
            let mask = mutation_mask(genes.len(), self.rate, ctx.rng);
            for (i, hit) in mask.into_iter().enumerate() {
                if hit {
                    let (lo, hi) = (self.bounds.lower(i), self.bounds.upper(i));
                    genes[i] = if hi > lo { ctx.rng.random_range(lo..=hi) } else { lo };
                }
            }
            out.push(ctx.offspring(genes));
        }
        Ok(out)
    }
}

/// BLX-α blend crossover: one child per pair, each gene uniform in the
/// parents' interval widened by `α` times its length on both sides.
#[derive(Debug, Clone, Copy)]
pub struct BlxAlphaCrossover {
    alpha: f64,
}

impl BlxAlphaCrossover {
    /// `alpha` is taken by absolute value; 0.5 is the usual choice.
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha: if alpha.is_finite() { alpha.abs() } else { 0.5 },
        }
    }
}

impl Operator<Vec<f64>> for BlxAlphaCrossover {
    fn name(&self) -> &str {
        "blx-alpha"
    }

    fn arity(&self) -> (Arity, Arity) {
        (Arity::Fixed(2), Arity::Fixed(1))
    }

    fn capability(&self) -> Capability {
        Capability::Crossover
    }

    fn apply(
        &self,
        inputs: Vec<Individual<Vec<f64>>>,
        ctx: &mut OperatorContext<'_, Vec<f64>>,
    ) -> Result<Vec<Individual<Vec<f64>>>> {
        check_inputs(self.name(), &inputs, 2)?;
        let (a, b) = (inputs[0].genotype(), inputs[1].genotype());
        if a.len() != b.len() {
            return Err(Error::Encoding("parents have different lengths".into()));
        }
        let genes: Vec<f64> = a
            .iter()
            .zip(b)
            .map(|(&x, &y)| {
                let (lo, hi) = (x.min(y), x.max(y));
                let spread = hi - lo;
                if spread < 1e-15 {
                    lo
                } else {
                    ctx.rng
                        .random_range((lo - self.alpha * spread)..=(hi + self.alpha * spread))
                }
            })
            .collect();
        Ok(vec![ctx.offspring(genes)])
    }
}

/// DE/rand/1/bin: `trial = x` with genes crossed (rate `cr`) from
/// `a + f·(b − c)`, where `a`, `b`, `c` are distinct random members of the
/// current population other than the target `x` itself. The target is the
/// first member whose genotype equals `x`; when `x` is not a member only
/// the three donors need to be distinct.
///
/// Pair with [`Selection::Sequential`](crate::selection::Selection::Sequential)
/// and [`Replacement::OneToOne`](crate::replacement::Replacement::OneToOne)
/// for the classic algorithm.
#[derive(Debug, Clone, Copy)]
pub struct DifferentialMutation {
    f: f64,
    cr: f64,
}

impl DifferentialMutation {
    /// # Errors
    ///
    /// [`Error::Configuration`] if `f` is not in `(0, 2]` or `cr` not in
    /// `[0, 1]`.
    pub fn new(f: f64, cr: f64) -> Result<Self> {
        if !(f > 0.0 && f <= 2.0) {
            return Err(Error::Configuration(format!(
                "differential weight must be in (0, 2], got {f}"
            )));
        }
        Ok(Self {
            f,
            cr: check_rate(cr)?,
        })
    }
}

impl Default for DifferentialMutation {
    fn default() -> Self {
        Self { f: 0.8, cr: 0.9 }
    }
}

impl Operator<Vec<f64>> for DifferentialMutation {
    fn name(&self) -> &str {
        "de-rand-1-bin"
    }

    fn arity(&self) -> (Arity, Arity) {
        (Arity::Fixed(1), Arity::Fixed(1))
    }

    fn capability(&self) -> Capability {
        Capability::Mutation
    }

    fn apply(
        &self,
        inputs: Vec<Individual<Vec<f64>>>,
        ctx: &mut OperatorContext<'_, Vec<f64>>,
    ) -> Result<Vec<Individual<Vec<f64>>>> {
        let n = ctx.population.len();
        let population = ctx.population;
        let mut out = Vec::with_capacity(inputs.len());
        for target in inputs {
            let x = target.genotype();
            let mut taken: Vec<usize> = population
                .iter()
                .position(|member| member.genotype() == x)
                .into_iter()
                .collect();
            let needed = taken.len() + 3;
            if n < needed {
                return Err(Error::Configuration(format!(
                    "differential mutation needs a population of at least {needed}, got {n}"
                )));
            }
            for _ in 0..3 {
                let mut pick = ctx.rng.random_range(0..n);
                while taken.contains(&pick) {
                    pick = ctx.rng.random_range(0..n);
                }
                taken.push(pick);
            }
            let (a, b, c) = (taken[needed - 3], taken[needed - 2], taken[needed - 1]);
            let (va, vb, vc) = (
                population[a].genotype(),
                population[b].genotype(),
                population[c].genotype(),
            );
            if va.len() != x.len() || vb.len() != x.len() || vc.len() != x.len() {
                return Err(Error::Encoding(
                    "population members have different lengths".into(),
                ));
            }

            let forced = ctx.rng.random_range(0..x.len().max(1));
            let trial: Vec<f64> = (0..x.len())
                .map(|j| {
                    if j == forced || ctx.rng.random_bool(self.cr) {
                        va[j] + self.f * (vb[j] - vc[j])
                    } else {
                        x[j]
                    }
                })
                .collect();
            out.push(ctx.offspring(trial));
        }
        Ok(out)
    }
}

/// Builds one child whose every gene is copied from a random input.
///
/// With [`with_consideration_rate`](Self::with_consideration_rate) a gene
/// is instead drawn uniformly from the bounds with probability `1 − rate`,
/// which is harmony search's memory-consideration step.
#[derive(Debug, Clone)]
pub struct MultiParentCrossover {
    random_draw: Option<(f64, Bounds)>,
}

impl MultiParentCrossover {
    pub fn new() -> Self {
        Self { random_draw: None }
    }

    pub fn with_consideration_rate(mut self, rate: f64, bounds: Bounds) -> Result<Self> {
        let rate = check_rate(rate)?;
        self.random_draw = Some((rate, bounds));
        Ok(self)
    }
}

impl Default for MultiParentCrossover {
    fn default() -> Self {
        Self::new()
    }
}

impl Operator<Vec<f64>> for MultiParentCrossover {
    fn name(&self) -> &str {
        "multi-parent"
    }

    fn arity(&self) -> (Arity, Arity) {
        (Arity::Any, Arity::Fixed(1))
    }

    fn capability(&self) -> Capability {
        Capability::Crossover
    }

    fn apply(
        &self,
        inputs: Vec<Individual<Vec<f64>>>,
        ctx: &mut OperatorContext<'_, Vec<f64>>,
    ) -> Result<Vec<Individual<Vec<f64>>>> {
        let dim = inputs
            .first()
            .map(|i| i.genotype().len())
            .ok_or_else(|| Error::Selection("multi-parent crossover got no parents".into()))?;
        if inputs.iter().any(|i| i.genotype().len() != dim) {
            return Err(Error::Encoding("parents have different lengths".into()));
        }
        if let Some((_, bounds)) = &self.random_draw {
            if bounds.dim() != dim {
                return Err(Error::Encoding(format!(
                    "harmony bounds have {} dimensions, genotype has {dim}",
                    bounds.dim()
                )));
            }
        }

        let genes: Vec<f64> = (0..dim)
            .map(|j| match &self.random_draw {
                Some((rate, bounds)) if !ctx.rng.random_bool(*rate) => {
                    let (lo, hi) = (bounds.lower(j), bounds.upper(j));
                    if hi > lo {
                        ctx.rng.random_range(lo..=hi)
                    } else {
                        lo
                    }
                }
                _ => inputs[ctx.rng.random_range(0..inputs.len())].genotype()[j],
            })
            .collect();
        Ok(vec![ctx.offspring(genes)])
    }
}
