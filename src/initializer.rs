//! Random genotype generation.
//!
//! The engine seeds its population from user-supplied genotypes first and
//! fills the rest from an [`Initializer`]. Operators that restart a search
//! point (e.g. [`RandomRestart`](crate::operator::RandomRestart)) draw from
//! the same initializer through the operator context.

use crate::encoding::{Bounds, Particle};
use crate::random::{shuffle, SearchRng};
use rand::Rng;

/// Creates random genotypes.
///
/// Takes the concrete [`SearchRng`] so it can be used as a trait object.
pub trait Initializer<G>: Send + Sync {
    /// Produces one random genotype.
    fn create(&self, rng: &mut SearchRng) -> G;
}

/// Uniformly distributed real vectors inside `bounds`.
///
/// With [`integer`](Self::integer), each gene is rounded to the nearest
/// integer (and clipped back into the box).
#[derive(Debug, Clone)]
pub struct UniformVectorInitializer {
    bounds: Bounds,
    round: bool,
}

impl UniformVectorInitializer {
    pub fn new(bounds: Bounds) -> Self {
        Self {
            bounds,
            round: false,
        }
    }

    /// Integer-valued genes.
    pub fn integer(bounds: Bounds) -> Self {
        Self {
            bounds,
            round: true,
        }
    }
}

impl Initializer<Vec<f64>> for UniformVectorInitializer {
    fn create(&self, rng: &mut SearchRng) -> Vec<f64> {
        let values: Vec<f64> = (0..self.bounds.dim())
            .map(|i| {
                let (lo, hi) = (self.bounds.lower(i), self.bounds.upper(i));
                let v = if hi > lo { rng.random_range(lo..=hi) } else { lo };
                if self.round {
                    v.round()
                } else {
                    v
                }
            })
            .collect();
        if self.round {
            self.bounds.clip(values)
        } else {
            values
        }
    }
}

/// Random permutations of `0..n`.
#[derive(Debug, Clone, Copy)]
pub struct PermutationInitializer {
    n: usize,
}

impl PermutationInitializer {
    pub fn new(n: usize) -> Self {
        Self { n }
    }
}

impl Initializer<Vec<usize>> for PermutationInitializer {
    fn create(&self, rng: &mut SearchRng) -> Vec<usize> {
        let mut perm: Vec<usize> = (0..self.n).collect();
        shuffle(&mut perm, rng);
        perm
    }
}

/// Random bit strings where each bit is set with probability `p`.
#[derive(Debug, Clone, Copy)]
pub struct BinaryInitializer {
    n: usize,
    p: f64,
}

impl BinaryInitializer {
    pub fn new(n: usize) -> Self {
        Self { n, p: 0.5 }
    }

    /// Sets the probability of a `true` bit (clamped to `[0, 1]`).
    pub fn with_probability(mut self, p: f64) -> Self {
        self.p = if p.is_nan() { 0.5 } else { p.clamp(0.0, 1.0) };
        self
    }
}

impl Initializer<Vec<bool>> for BinaryInitializer {
    fn create(&self, rng: &mut SearchRng) -> Vec<bool> {
        (0..self.n).map(|_| rng.random_bool(self.p)).collect()
    }
}

/// Particles at uniform positions with uniform velocities in
/// `±velocity_fraction × range`.
#[derive(Debug, Clone)]
pub struct ParticleInitializer {
    bounds: Bounds,
    velocity_fraction: f64,
}

impl ParticleInitializer {
    pub fn new(bounds: Bounds) -> Self {
        Self {
            bounds,
            velocity_fraction: 0.1,
        }
    }

    pub fn with_velocity_fraction(mut self, fraction: f64) -> Self {
        self.velocity_fraction = fraction.abs();
        self
    }
}

impl Initializer<Particle> for ParticleInitializer {
    fn create(&self, rng: &mut SearchRng) -> Particle {
        let position = UniformVectorInitializer::new(self.bounds.clone()).create(rng);
        let velocity = (0..self.bounds.dim())
            .map(|i| {
                let vmax = self.velocity_fraction * self.bounds.range(i);
                if vmax > 0.0 {
                    rng.random_range(-vmax..=vmax)
                } else {
                    0.0
                }
            })
            .collect();
        let mut particle = Particle::at_rest(position);
        particle.velocity = velocity;
        particle
    }
}

/// Adapts a closure into an [`Initializer`].
pub struct FnInitializer<F> {
    f: F,
}

impl<F> FnInitializer<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<G, F> Initializer<G> for FnInitializer<F>
where
    F: Fn(&mut SearchRng) -> G + Send + Sync,
{
    fn create(&self, rng: &mut SearchRng) -> G {
        (self.f)(rng)
    }
}
