//! Core operator trait, arities and the per-call context.

use crate::error::{Error, Result};
use crate::individual::Individual;
use crate::initializer::Initializer;
use crate::random::SearchRng;
use std::fmt;

/// How many individuals an operator consumes or produces per application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Arity {
    /// Exactly `n` individuals.
    Fixed(usize),
    /// Any number of individuals (whole batches).
    Any,
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Fixed(n) => write!(f, "{n}"),
            Arity::Any => write!(f, "any"),
        }
    }
}

/// Coarse role of an operator, used for logging and preset assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Capability {
    Mutation,
    Crossover,
    LocalSearch,
    Restart,
    Identity,
    Composite,
}

/// Everything an operator may read while producing offspring.
///
/// The random generator is the engine's own instance, passed explicitly.
/// Operators never use thread-local or global randomness, which is what
/// makes a seeded run reproducible.
pub struct OperatorContext<'a, G> {
    pub rng: &'a mut SearchRng,
    /// Read-only view of the current population.
    pub population: &'a [Individual<G>],
    /// Best individual found so far, if any.
    pub best: Option<&'a Individual<G>>,
    pub initializer: &'a dyn Initializer<G>,
    /// Generation being produced (1 for the first offspring batch).
    pub generation: usize,
}

impl<'a, G> OperatorContext<'a, G> {
    pub fn new(
        rng: &'a mut SearchRng,
        population: &'a [Individual<G>],
        initializer: &'a dyn Initializer<G>,
    ) -> Self {
        Self {
            rng,
            population,
            best: None,
            initializer,
            generation: 0,
        }
    }

    pub fn with_best(mut self, best: Option<&'a Individual<G>>) -> Self {
        self.best = best;
        self
    }

    pub fn at_generation(mut self, generation: usize) -> Self {
        self.generation = generation;
        self
    }

    /// Wraps a freshly produced genotype as an unevaluated offspring.
    pub fn offspring(&self, genotype: G) -> Individual<G> {
        Individual::born(genotype, self.generation)
    }
}

/// A transformation from `m` individuals to `n` individuals.
///
/// Operators must not mutate their inputs in place and hand them back with
/// a stale evaluation: any genotype change goes through
/// [`OperatorContext::offspring`] or
/// [`Individual::map_genotype`](crate::individual::Individual::map_genotype),
/// both of which produce unevaluated individuals. An operator that leaves
/// an input untouched may return it as-is, keeping its cached fitness.
///
/// 1→1 operators are applied to every input they are given, so they also
/// work on batches.
pub trait Operator<G>: Send + Sync {
    /// Short name used in logs and composite names.
    fn name(&self) -> &str;

    /// `(input, output)` arity of one application.
    fn arity(&self) -> (Arity, Arity);

    fn capability(&self) -> Capability;

    /// Produces offspring from `inputs`.
    fn apply(
        &self,
        inputs: Vec<Individual<G>>,
        ctx: &mut OperatorContext<'_, G>,
    ) -> Result<Vec<Individual<G>>>;

    /// Called by the engine before each generation with the search
    /// progress in `[0, 1]`. Scheduled parameters move here; the default
    /// does nothing.
    fn update(&mut self, _progress: f64) {}
}

impl<G> Operator<G> for Box<dyn Operator<G>> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn arity(&self) -> (Arity, Arity) {
        (**self).arity()
    }

    fn capability(&self) -> Capability {
        (**self).capability()
    }

    fn apply(
        &self,
        inputs: Vec<Individual<G>>,
        ctx: &mut OperatorContext<'_, G>,
    ) -> Result<Vec<Individual<G>>> {
        (**self).apply(inputs, ctx)
    }

    fn update(&mut self, progress: f64) {
        (**self).update(progress)
    }
}

/// Fails unless exactly `expected` inputs were supplied.
pub(crate) fn check_inputs<G>(
    operator: &str,
    inputs: &[Individual<G>],
    expected: usize,
) -> Result<()> {
    if inputs.len() == expected {
        Ok(())
    } else {
        Err(Error::ArityMismatch {
            upstream: "caller".into(),
            produced: inputs.len().to_string(),
            downstream: operator.into(),
            consumed: expected.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::initializer::FnInitializer;
    use crate::random::create_rng;

    #[test]
    fn test_arity_display() {
        assert_eq!(Arity::Fixed(2).to_string(), "2");
        assert_eq!(Arity::Any.to_string(), "any");
    }

    #[test]
    fn test_offspring_is_unevaluated_and_dated() {
        let mut rng = create_rng(1);
        let init = FnInitializer::new(|_: &mut SearchRng| 0u8);
        let ctx = OperatorContext::new(&mut rng, &[], &init).at_generation(4);
        let child = ctx.offspring(7u8);
        assert!(!child.is_evaluated());
        assert_eq!(child.birth(), 4);
    }

    #[test]
    fn test_check_inputs() {
        let inputs = vec![Individual::new(1u8)];
        assert!(check_inputs("x", &inputs, 1).is_ok());
        assert!(matches!(
            check_inputs("x", &inputs, 2),
            Err(Error::ArityMismatch { .. })
        ));
    }
}
