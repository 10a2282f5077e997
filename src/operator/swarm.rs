//! Particle swarm velocity/position update.
//!
//! Kennedy & Eberhart (1995), with the inertia weight of Shi & Eberhart
//! (1998).

use super::types::{Arity, Capability, Operator, OperatorContext};
use crate::encoding::Particle;
use crate::error::{Error, Result};
use crate::individual::Individual;
use rand::Rng;

/// Moves each particle once.
///
/// Before moving, the particle's memory is refreshed from the fitness the
/// input individual carries. The social attractor is the position of the
/// best individual found so far ([`OperatorContext::best`]); without one,
/// the particle's own memory is used.
#[derive(Debug, Clone, Copy)]
pub struct SwarmUpdate {
    inertia: f64,
    cognitive: f64,
    social: f64,
    max_velocity: Option<f64>,
}

impl Default for SwarmUpdate {
    /// Clerc's constriction-equivalent parameters.
    fn default() -> Self {
        Self {
            inertia: 0.7298,
            cognitive: 1.49618,
            social: 1.49618,
            max_velocity: None,
        }
    }
}

impl SwarmUpdate {
    /// # Errors
    ///
    /// [`Error::Configuration`] for negative or non-finite coefficients.
    pub fn new(inertia: f64, cognitive: f64, social: f64) -> Result<Self> {
        for (name, value) in [("inertia", inertia), ("cognitive", cognitive), ("social", social)] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(Error::Configuration(format!(
                    "swarm {name} coefficient must be non-negative, got {value}"
                )));
            }
        }
        Ok(Self {
            inertia,
            cognitive,
            social,
            max_velocity: None,
        })
    }

    /// Clamps every velocity component to `±max_velocity`.
    pub fn with_max_velocity(mut self, max_velocity: f64) -> Self {
        self.max_velocity = Some(max_velocity.abs());
        self
    }
}

impl Operator<Particle> for SwarmUpdate {
    fn name(&self) -> &str {
        "swarm"
    }

    fn arity(&self) -> (Arity, Arity) {
        (Arity::Fixed(1), Arity::Fixed(1))
    }

    fn capability(&self) -> Capability {
        Capability::Mutation
    }

    fn apply(
        &self,
        inputs: Vec<Individual<Particle>>,
        ctx: &mut OperatorContext<'_, Particle>,
    ) -> Result<Vec<Individual<Particle>>> {
        let global = ctx.best.map(|b| b.genotype().position.clone());
        let mut out = Vec::with_capacity(inputs.len());
        for current in inputs {
            let fitness = current.fitness();
            let mut p = current.into_genotype();
            let dim = p.position.len();
            if p.velocity.len() != dim || p.personal_best.len() != dim {
                return Err(Error::Encoding("particle vectors have different lengths".into()));
            }
            if let Some(f) = fitness {
                if f < p.personal_best_fitness {
                    p.personal_best = p.position.clone();
                    p.personal_best_fitness = f;
                }
            }
            let attractor = match &global {
                Some(g) if g.len() == dim => g.as_slice(),
                _ => p.personal_best.as_slice(),
            };

            let mut velocity = Vec::with_capacity(dim);
            for j in 0..dim {
                let r1: f64 = ctx.rng.random();
                let r2: f64 = ctx.rng.random();
                let mut v = self.inertia * p.velocity[j]
                    + self.cognitive * r1 * (p.personal_best[j] - p.position[j])
                    + self.social * r2 * (attractor[j] - p.position[j]);
                if let Some(vmax) = self.max_velocity {
                    v = v.clamp(-vmax, vmax);
                }
                velocity.push(v);
            }
            for (x, v) in p.position.iter_mut().zip(&velocity) {
                *x += v;
            }
            p.velocity = velocity;
            out.push(ctx.offspring(p));
        }
        Ok(out)
    }
}
