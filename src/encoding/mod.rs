//! Genotype ⇄ phenotype mappings.
//!
//! The engine manipulates genotypes only; the objective function sees the
//! decoded phenotype. Every encoding satisfies the round-trip law
//! `decode(encode(x)) == x` for valid phenotypes `x`, and decodes every
//! genotype it can itself produce.
//!
//! # Encodings
//!
//! - [`IdentityEncoding`]: genotype is the phenotype
//! - [`BoundedVectorEncoding`]: real vector inside per-gene bounds; repair clips
//! - [`RoundingEncoding`]: real genotype, integer phenotype
//! - [`RandomKeyEncoding`]: real keys decoded to a permutation (Bean, 1994)
//! - [`ParticleEncoding`]: PSO particle decoded to its position

mod keys;
mod particle;
mod types;
mod vector;

pub use keys::RandomKeyEncoding;
pub use particle::{Particle, ParticleEncoding};
pub use types::{Encoding, IdentityEncoding};
pub use vector::{Bounds, BoundedVectorEncoding, RoundingEncoding};
