//! Random-key encoding for permutation problems.
//!
//! A chromosome of `n` keys in `[0, 1]` decodes to the permutation that
//! sorts the keys ascending. Any real-vector operator then produces a
//! valid permutation.
//!
//! # References
//!
//! - Bean (1994), "Genetic Algorithms and Random Keys for Sequencing and
//!   Optimization"
//! - Gonçalves & Resende (2011), "Biased random-key genetic algorithms for
//!   combinatorial optimization"

use super::types::Encoding;
use crate::error::{Error, Result};

/// Keys in `[0, 1]` ⇄ permutation of `0..n`.
#[derive(Debug, Clone, Copy)]
pub struct RandomKeyEncoding {
    n: usize,
}

impl RandomKeyEncoding {
    pub fn new(n: usize) -> Self {
        Self { n }
    }

    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }
}

impl Encoding for RandomKeyEncoding {
    type Genotype = Vec<f64>;
    type Phenotype = Vec<usize>;

    /// Places element `perm[i]` at key `(i + 0.5) / n`.
    fn encode(&self, perm: &Vec<usize>) -> Result<Vec<f64>> {
        if perm.len() != self.n {
            return Err(Error::Encoding(format!(
                "permutation has length {}, expected {}",
                perm.len(),
                self.n
            )));
        }
        let mut seen = vec![false; self.n];
        let mut keys = vec![0.0; self.n];
        for (rank, &item) in perm.iter().enumerate() {
            if item >= self.n || seen[item] {
                return Err(Error::Encoding(format!(
                    "{perm:?} is not a permutation of 0..{}",
                    self.n
                )));
            }
            seen[item] = true;
            keys[item] = (rank as f64 + 0.5) / self.n as f64;
        }
        Ok(keys)
    }

    /// Stable argsort of the keys; equal keys keep index order.
    fn decode(&self, keys: &Vec<f64>) -> Result<Vec<usize>> {
        if keys.len() != self.n {
            return Err(Error::Encoding(format!(
                "key vector has length {}, expected {}",
                keys.len(),
                self.n
            )));
        }
        if let Some(i) = keys.iter().position(|k| !k.is_finite()) {
            return Err(Error::Encoding(format!("key {i} is not finite")));
        }
        let mut order: Vec<usize> = (0..self.n).collect();
        order.sort_by(|&a, &b| keys[a].total_cmp(&keys[b]));
        Ok(order)
    }

    fn repair(&self, keys: Vec<f64>) -> Vec<f64> {
        keys.into_iter()
            .map(|k| if k.is_nan() { 0.0 } else { k.clamp(0.0, 1.0) })
            .collect()
    }
}
