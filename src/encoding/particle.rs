//! Particle representation for swarm optimization.

use super::types::Encoding;
use super::vector::Bounds;
use crate::error::{Error, Result};

/// A PSO particle: position, velocity and personal memory.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Particle {
    pub position: Vec<f64>,
    pub velocity: Vec<f64>,
    /// Best position this particle has visited.
    pub personal_best: Vec<f64>,
    /// Normalized fitness at `personal_best` (`+inf` until known).
    pub personal_best_fitness: f64,
}

impl Particle {
    /// A particle at rest at `position` with no memory.
    pub fn at_rest(position: Vec<f64>) -> Self {
        let dim = position.len();
        Self {
            personal_best: position.clone(),
            position,
            velocity: vec![0.0; dim],
            personal_best_fitness: f64::INFINITY,
        }
    }
}

/// Decodes a particle to its position inside `bounds`.
///
/// Encoding a position yields a particle at rest, so the round trip holds
/// on positions.
#[derive(Debug, Clone)]
pub struct ParticleEncoding {
    bounds: Bounds,
}

impl ParticleEncoding {
    pub fn new(bounds: Bounds) -> Self {
        Self { bounds }
    }

    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }
}

impl Encoding for ParticleEncoding {
    type Genotype = Particle;
    type Phenotype = Vec<f64>;

    fn encode(&self, position: &Vec<f64>) -> Result<Particle> {
        if !self.bounds.contains(position) {
            return Err(Error::Encoding(format!(
                "position of length {} outside the search box",
                position.len()
            )));
        }
        Ok(Particle::at_rest(position.clone()))
    }

    fn decode(&self, particle: &Particle) -> Result<Vec<f64>> {
        if particle.velocity.len() != particle.position.len() {
            return Err(Error::Encoding(
                "particle velocity and position lengths differ".into(),
            ));
        }
        if !self.bounds.contains(&particle.position) {
            return Err(Error::Encoding(
                "particle position outside the search box".into(),
            ));
        }
        Ok(particle.position.clone())
    }

    /// Clips the position and zeroes velocity components that hit a wall.
    fn repair(&self, mut particle: Particle) -> Particle {
        let clipped = self.bounds.clip(particle.position.clone());
        for (i, (&before, &after)) in particle.position.iter().zip(clipped.iter()).enumerate() {
            if before != after {
                if let Some(v) = particle.velocity.get_mut(i) {
                    *v = 0.0;
                }
            }
        }
        particle.position = clipped;
        particle
    }
}
