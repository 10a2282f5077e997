//! Core encoding trait.

use crate::error::Result;
use std::fmt::Debug;
use std::marker::PhantomData;

/// Bidirectional mapping between the representation operators work on
/// (genotype) and the one the objective function consumes (phenotype).
///
/// # Thread Safety
///
/// `Encoding` must be `Send + Sync` because decoding happens inside
/// objective evaluation, which may run on a worker pool.
pub trait Encoding: Send + Sync {
    /// Representation manipulated by operators.
    type Genotype: Clone + Debug + Send + Sync + 'static;

    /// Representation consumed by the objective function.
    type Phenotype;

    /// Maps a phenotype to a genotype.
    ///
    /// Fails with [`Error::Encoding`](crate::Error::Encoding) if the
    /// phenotype is not valid for this encoding.
    fn encode(&self, phenotype: &Self::Phenotype) -> Result<Self::Genotype>;

    /// Maps a genotype to its phenotype.
    ///
    /// Fails with [`Error::Encoding`](crate::Error::Encoding) if the
    /// genotype is outside the declared domain.
    fn decode(&self, genotype: &Self::Genotype) -> Result<Self::Phenotype>;

    /// Moves an operator-produced genotype back into the domain.
    ///
    /// Called by the engine on every new offspring before evaluation.
    /// The default implementation returns the genotype unchanged.
    fn repair(&self, genotype: Self::Genotype) -> Self::Genotype {
        genotype
    }
}

/// Encoding in which the genotype is the phenotype.
#[derive(Debug, Clone, Copy)]
pub struct IdentityEncoding<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> IdentityEncoding<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for IdentityEncoding<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Encoding for IdentityEncoding<T>
where
    T: Clone + Debug + Send + Sync + 'static,
{
    type Genotype = T;
    type Phenotype = T;

    fn encode(&self, phenotype: &T) -> Result<T> {
        Ok(phenotype.clone())
    }

    fn decode(&self, genotype: &T) -> Result<T> {
        Ok(genotype.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_round_trip() {
        let enc = IdentityEncoding::<Vec<u8>>::new();
        let x = vec![1u8, 2, 3];
        let g = enc.encode(&x).unwrap();
        assert_eq!(enc.decode(&g).unwrap(), x);
    }

    #[test]
    fn test_default_repair_is_identity() {
        let enc = IdentityEncoding::<i32>::default();
        assert_eq!(enc.repair(-4), -4);
    }
}
