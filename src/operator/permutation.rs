//! Permutation operators (`Vec<usize>` over `0..n`).
//!
//! The free functions work on index slices and are usable outside the
//! engine; [`PermutationOperator`] wraps them as an [`Operator`].
//!
//! # Crossover
//!
//! - [`order_crossover`] (OX): Davis (1985), keeps relative order
//! - [`pmx_crossover`] (PMX): Goldberg & Lingle (1985), keeps absolute position
//!
//! # Mutation
//!
//! - [`swap_mutation`]: exchange two positions, O(1)
//! - [`insert_mutation`]: move one element elsewhere, O(n)
//! - [`invert_mutation`]: reverse a segment (2-opt), O(n)
//! - [`scramble_mutation`]: shuffle the values at `k` random positions
//! - [`roll_mutation`]: rotate a random segment by `k`
//!
//! # References
//!
//! - Davis (1985), "Applying Adaptive Algorithms to Epistatic Domains"
//! - Goldberg & Lingle (1985), "Alleles, Loci, and the Traveling Salesman Problem"

use super::types::{check_inputs, Arity, Capability, Operator, OperatorContext};
use crate::error::{Error, Result};
use crate::individual::Individual;
use rand::seq::index;
use rand::Rng;

/// Order crossover.
///
/// Copies a random segment from one parent and fills the remaining
/// positions with the other parent's elements in their order, starting
/// after the segment and wrapping around.
///
/// # Panics
/// Panics if the parents have different lengths or are not permutations
/// of `0..n`.
pub fn order_crossover<R: Rng + ?Sized>(
    parent1: &[usize],
    parent2: &[usize],
    rng: &mut R,
) -> (Vec<usize>, Vec<usize>) {
    let n = parent1.len();
    assert_eq!(n, parent2.len(), "parents must have equal length");
    if n < 2 {
        return (parent1.to_vec(), parent2.to_vec());
    }
    let (start, end) = random_segment(n, rng);
    (
        ox_child(parent1, parent2, start, end),
        ox_child(parent2, parent1, start, end),
    )
}

fn ox_child(template: &[usize], donor: &[usize], start: usize, end: usize) -> Vec<usize> {
    let n = template.len();
    let mut child = vec![usize::MAX; n];
    let mut taken = vec![false; n];
    for i in start..=end {
        child[i] = template[i];
        taken[template[i]] = true;
    }
    let mut pos = (end + 1) % n;
    for offset in 0..n {
        let value = donor[(end + 1 + offset) % n];
        if !taken[value] {
            child[pos] = value;
            pos = (pos + 1) % n;
        }
    }
    child
}

/// Partially mapped crossover.
///
/// Copies a random segment from one parent; elements of the other
/// parent's segment are placed by following the segment mapping until a
/// position outside it is found; the rest comes from the other parent.
///
/// # Panics
/// Panics if the parents have different lengths or are not permutations
/// of `0..n`.
pub fn pmx_crossover<R: Rng + ?Sized>(
    parent1: &[usize],
    parent2: &[usize],
    rng: &mut R,
) -> (Vec<usize>, Vec<usize>) {
    let n = parent1.len();
    assert_eq!(n, parent2.len(), "parents must have equal length");
    if n < 2 {
        return (parent1.to_vec(), parent2.to_vec());
    }
    let (start, end) = random_segment(n, rng);
    (
        pmx_child(parent1, parent2, start, end),
        pmx_child(parent2, parent1, start, end),
    )
}

fn pmx_child(template: &[usize], donor: &[usize], start: usize, end: usize) -> Vec<usize> {
    let n = template.len();
    // where each value sits in the donor
    let mut donor_pos = vec![0usize; n];
    for (i, &v) in donor.iter().enumerate() {
        donor_pos[v] = i;
    }

    let mut child = vec![usize::MAX; n];
    let mut placed = vec![false; n];
    for i in start..=end {
        child[i] = template[i];
        placed[template[i]] = true;
    }

    for i in start..=end {
        let value = donor[i];
        if placed[value] {
            continue;
        }
        let mut pos = i;
        loop {
            let target = donor_pos[template[pos]];
            if target < start || target > end {
                child[target] = value;
                placed[value] = true;
                break;
            }
            pos = target;
        }
    }

    for (slot, &value) in child.iter_mut().zip(donor) {
        if *slot == usize::MAX {
            *slot = value;
        }
    }
    child
}

/// Exchanges two random positions.
pub fn swap_mutation<R: Rng + ?Sized>(perm: &mut [usize], rng: &mut R) {
    let n = perm.len();
    if n < 2 {
        return;
    }
    let i = rng.random_range(0..n);
    let j = rng.random_range(0..n);
    perm.swap(i, j);
}

/// Removes one element and reinserts it at a random position.
pub fn insert_mutation<R: Rng + ?Sized>(perm: &mut Vec<usize>, rng: &mut R) {
    let n = perm.len();
    if n < 2 {
        return;
    }
    let item = perm.remove(rng.random_range(0..n));
    perm.insert(rng.random_range(0..n), item);
}

/// Reverses a random segment.
pub fn invert_mutation<R: Rng + ?Sized>(perm: &mut [usize], rng: &mut R) {
    let n = perm.len();
    if n < 2 {
        return;
    }
    let (start, end) = random_segment(n, rng);
    perm[start..=end].reverse();
}

/// Shuffles the values found at `k` distinct random positions among those
/// positions. `k` is capped at the length.
pub fn scramble_mutation<R: Rng + ?Sized>(perm: &mut [usize], k: usize, rng: &mut R) {
    let n = perm.len();
    let k = k.min(n);
    if k < 2 {
        return;
    }
    let positions = index::sample(rng, n, k).into_vec();
    let mut values: Vec<usize> = positions.iter().map(|&p| perm[p]).collect();
    crate::random::shuffle(&mut values, rng);
    for (&p, v) in positions.iter().zip(values) {
        perm[p] = v;
    }
}

/// Rotates a random segment right by `k` places.
///
/// `k = 1` on a segment is a single insert move.
pub fn roll_mutation<R: Rng + ?Sized>(perm: &mut [usize], k: usize, rng: &mut R) {
    let n = perm.len();
    if n < 2 {
        return;
    }
    let (start, end) = random_segment(n, rng);
    let segment = &mut perm[start..=end];
    let len = segment.len();
    segment.rotate_right(k % len);
}

/// Random segment `[start, end]` with `start <= end < n`.
fn random_segment<R: Rng + ?Sized>(n: usize, rng: &mut R) -> (usize, usize) {
    let a = rng.random_range(0..n);
    let b = rng.random_range(0..n);
    (a.min(b), a.max(b))
}

/// Checks that `perm` is a permutation of `0..perm.len()`.
pub fn is_permutation(perm: &[usize]) -> bool {
    let mut seen = vec![false; perm.len()];
    for &v in perm {
        match seen.get_mut(v) {
            Some(s) if !*s => *s = true,
            _ => return false,
        }
    }
    true
}

/// Permutation operator methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PermutationOperator {
    Swap,
    Insert,
    /// Scramble `k` positions.
    Scramble(usize),
    Invert,
    /// Rotate a random segment by `k`.
    Roll(usize),
    /// 2→2
    Pmx,
    /// 2→2
    OrderCrossover,
}

impl PermutationOperator {
    fn is_crossover(self) -> bool {
        matches!(self, PermutationOperator::Pmx | PermutationOperator::OrderCrossover)
    }
}

impl Operator<Vec<usize>> for PermutationOperator {
    fn name(&self) -> &str {
        match self {
            PermutationOperator::Swap => "swap",
            PermutationOperator::Insert => "insert",
            PermutationOperator::Scramble(_) => "scramble",
            PermutationOperator::Invert => "invert",
            PermutationOperator::Roll(_) => "roll",
            PermutationOperator::Pmx => "pmx",
            PermutationOperator::OrderCrossover => "order-crossover",
        }
    }

    fn arity(&self) -> (Arity, Arity) {
        if self.is_crossover() {
            (Arity::Fixed(2), Arity::Fixed(2))
        } else {
            (Arity::Fixed(1), Arity::Fixed(1))
        }
    }

    fn capability(&self) -> Capability {
        if self.is_crossover() {
            Capability::Crossover
        } else {
            Capability::Mutation
        }
    }

    fn apply(
        &self,
        inputs: Vec<Individual<Vec<usize>>>,
        ctx: &mut OperatorContext<'_, Vec<usize>>,
    ) -> Result<Vec<Individual<Vec<usize>>>> {
        if let Some(bad) = inputs.iter().find(|i| !is_permutation(i.genotype())) {
            return Err(Error::Encoding(format!(
                "not a permutation: {:?}",
                bad.genotype()
            )));
        }

        if self.is_crossover() {
            check_inputs(self.name(), &inputs, 2)?;
            let (p1, p2) = (inputs[0].genotype(), inputs[1].genotype());
            if p1.len() != p2.len() {
                return Err(Error::Encoding("parents have different lengths".into()));
            }
            let (c1, c2) = match self {
                PermutationOperator::Pmx => pmx_crossover(p1, p2, ctx.rng),
                _ => order_crossover(p1, p2, ctx.rng),
            };
            return Ok(vec![ctx.offspring(c1), ctx.offspring(c2)]);
        }

        let mut out = Vec::with_capacity(inputs.len());
        for parent in inputs {
            let mut perm = parent.into_genotype();
            match *self {
                PermutationOperator::Swap => swap_mutation(&mut perm, ctx.rng),
                PermutationOperator::Insert => insert_mutation(&mut perm, ctx.rng),
                PermutationOperator::Scramble(k) => scramble_mutation(&mut perm, k, ctx.rng),
                PermutationOperator::Invert => invert_mutation(&mut perm, ctx.rng),
                PermutationOperator::Roll(k) => roll_mutation(&mut perm, k, ctx.rng),
                PermutationOperator::Pmx | PermutationOperator::OrderCrossover => {}
            }
            out.push(ctx.offspring(perm));
        }
        Ok(out)
    }
}
