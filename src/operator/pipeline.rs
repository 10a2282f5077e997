//! Sequential composition of operators.

use super::types::{Arity, Capability, Operator, OperatorContext};
use crate::error::{Error, Result};
use crate::individual::Individual;

/// Operators applied one after another, output of each feeding the next.
///
/// Composition is checked once, at construction:
///
/// | producer  | consumer   | accepted when                     |
/// |-----------|------------|-----------------------------------|
/// | anything  | `Any`      | always                            |
/// | `Fixed(n)`| `Fixed(k)` | `n > 0`, `k > 0` and `n % k == 0` |
/// | `Any`     | `Fixed(1)` | always                            |
/// | `Any`     | `Fixed(k)` | never for `k > 1`                 |
///
/// A `Fixed(k)` stage is applied to consecutive chunks of `k` individuals.
/// `Fixed(0)` input (a generator) is only allowed in the first stage.
///
/// # Examples
///
/// ```
/// use u_metadesign::operator::{
///     Arity, BlxAlphaCrossover, GaussianMutation, Operator, OnePointCrossover, Pipeline,
/// };
///
/// let ga: Pipeline<Vec<f64>> = Pipeline::new(vec![
///     Box::new(OnePointCrossover::new()),
///     Box::new(GaussianMutation::new(0.1).unwrap()),
/// ])
/// .unwrap();
/// assert_eq!(ga.arity(), (Arity::Fixed(2), Arity::Fixed(2)));
///
/// // 2 -> 1 cannot feed 2 -> 2.
/// let bad: Result<Pipeline<Vec<f64>>, _> = Pipeline::new(vec![
///     Box::new(BlxAlphaCrossover::new(0.5)),
///     Box::new(OnePointCrossover::new()),
/// ]);
/// assert!(bad.is_err());
/// ```
pub struct Pipeline<G> {
    stages: Vec<Box<dyn Operator<G>>>,
    name: String,
    arity: (Arity, Arity),
}

impl<G> std::fmt::Debug for Pipeline<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

impl<G> Pipeline<G> {
    /// Validates and builds a pipeline.
    ///
    /// # Errors
    ///
    /// [`Error::Configuration`] for an empty stage list,
    /// [`Error::ArityMismatch`] naming the first incompatible pair.
    pub fn new(stages: Vec<Box<dyn Operator<G>>>) -> Result<Self> {
        let first = stages
            .first()
            .ok_or_else(|| Error::Configuration("pipeline has no stages".into()))?;
        let input = first.arity().0;
        let mut flowing = first.arity().1;

        for pair in stages.windows(2) {
            let (up, down) = (&pair[0], &pair[1]);
            let produced = up.arity().1;
            let (consumed, emitted) = down.arity();
            if !compatible(produced, consumed) {
                return Err(Error::ArityMismatch {
                    upstream: up.name().to_string(),
                    produced: produced.to_string(),
                    downstream: down.name().to_string(),
                    consumed: consumed.to_string(),
                });
            }
            flowing = match (flowing, consumed, emitted) {
                (_, Arity::Any, out) => out,
                (Arity::Fixed(n), Arity::Fixed(k), Arity::Fixed(m)) => Arity::Fixed(n / k * m),
                _ => Arity::Any,
            };
        }

        let name = stages
            .iter()
            .map(|s| s.name())
            .collect::<Vec<_>>()
            .join("+");
        Ok(Self {
            stages,
            name,
            arity: (input, flowing),
        })
    }

    /// A single-stage pipeline.
    pub fn from_operator(operator: impl Operator<G> + 'static) -> Self {
        let arity = operator.arity();
        Self {
            name: operator.name().to_string(),
            stages: vec![Box::new(operator)],
            arity,
        }
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn stages(&self) -> &[Box<dyn Operator<G>>] {
        &self.stages
    }
}

fn compatible(produced: Arity, consumed: Arity) -> bool {
    match (produced, consumed) {
        (_, Arity::Any) => true,
        (Arity::Fixed(n), Arity::Fixed(k)) => n > 0 && k > 0 && n % k == 0,
        (Arity::Any, Arity::Fixed(k)) => k == 1,
    }
}

impl<G: Send + Sync> Operator<G> for Pipeline<G> {
    fn name(&self) -> &str {
        &self.name
    }

    fn arity(&self) -> (Arity, Arity) {
        self.arity
    }

    fn capability(&self) -> Capability {
        if self.stages.len() == 1 {
            self.stages[0].capability()
        } else {
            Capability::Composite
        }
    }

    fn apply(
        &self,
        inputs: Vec<Individual<G>>,
        ctx: &mut OperatorContext<'_, G>,
    ) -> Result<Vec<Individual<G>>> {
        let mut batch = inputs;
        for stage in &self.stages {
            batch = match stage.arity().0 {
                Arity::Any | Arity::Fixed(0) => stage.apply(batch, ctx)?,
                Arity::Fixed(k) => {
                    if batch.len() % k != 0 {
                        return Err(Error::ArityMismatch {
                            upstream: self.name.clone(),
                            produced: batch.len().to_string(),
                            downstream: stage.name().to_string(),
                            consumed: k.to_string(),
                        });
                    }
                    let mut out = Vec::with_capacity(batch.len());
                    let mut rest = batch.into_iter();
                    loop {
                        let chunk: Vec<_> = rest.by_ref().take(k).collect();
                        if chunk.is_empty() {
                            break;
                        }
                        out.extend(stage.apply(chunk, ctx)?);
                    }
                    out
                }
            };
        }
        Ok(batch)
    }

    fn update(&mut self, progress: f64) {
        for stage in &mut self.stages {
            stage.update(progress);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::initializer::FnInitializer;
    use crate::operator::Identity;
    use crate::random::{create_rng, SearchRng};

    /// Test operator with configurable arity; tags each output.
    struct Tagged {
        name: String,
        input: Arity,
        output: Arity,
    }

    fn op(name: &str, input: Arity, output: Arity) -> Box<dyn Operator<Vec<u32>>> {
        Box::new(Tagged {
            name: name.into(),
            input,
            output,
        })
    }

    impl Operator<Vec<u32>> for Tagged {
        fn name(&self) -> &str {
            &self.name
        }

        fn arity(&self) -> (Arity, Arity) {
            (self.input, self.output)
        }

        fn capability(&self) -> Capability {
            Capability::Mutation
        }

        fn apply(
            &self,
            inputs: Vec<Individual<Vec<u32>>>,
            ctx: &mut OperatorContext<'_, Vec<u32>>,
        ) -> Result<Vec<Individual<Vec<u32>>>> {
            let n = match self.output {
                Arity::Fixed(m) => m,
                Arity::Any => inputs.len(),
            };
            let merged: Vec<u32> = inputs.iter().flat_map(|i| i.genotype().clone()).collect();
            Ok((0..n).map(|_| ctx.offspring(merged.clone())).collect())
        }
    }

    #[test]
    fn test_rejects_empty() {
        let err = Pipeline::<Vec<u32>>::new(vec![]).err();
        assert!(matches!(err, Some(Error::Configuration(_))));
    }

    #[test]
    fn test_compatibility_rules() {
        use Arity::*;
        assert!(Pipeline::new(vec![op("a", Fixed(2), Fixed(2)), op("b", Fixed(1), Fixed(1))]).is_ok());
        assert!(Pipeline::new(vec![op("a", Fixed(2), Fixed(4)), op("b", Fixed(2), Fixed(1))]).is_ok());
        assert!(Pipeline::new(vec![op("a", Fixed(1), Any), op("b", Fixed(1), Fixed(1))]).is_ok());
        assert!(Pipeline::new(vec![op("a", Fixed(1), Fixed(3)), op("b", Any, Fixed(1))]).is_ok());

        let err = Pipeline::new(vec![op("cx", Fixed(2), Fixed(1)), op("tri", Fixed(3), Fixed(1))])
            .err();
        match err {
            Some(Error::ArityMismatch {
                upstream,
                downstream,
                produced,
                consumed,
            }) => {
                assert_eq!(upstream, "cx");
                assert_eq!(downstream, "tri");
                assert_eq!(produced, "1");
                assert_eq!(consumed, "3");
            }
            _ => panic!("expected arity mismatch"),
        }

        assert!(Pipeline::new(vec![op("a", Any, Any), op("b", Fixed(2), Fixed(1))]).is_err());
        assert!(Pipeline::new(vec![op("a", Fixed(1), Fixed(1)), op("gen", Fixed(0), Fixed(1))]).is_err());
    }

    #[test]
    fn test_overall_arity() {
        use Arity::*;
        let p = Pipeline::new(vec![
            op("a", Fixed(2), Fixed(4)),
            op("b", Fixed(2), Fixed(1)),
            op("c", Fixed(1), Fixed(1)),
        ])
        .unwrap();
        assert_eq!(p.arity(), (Fixed(2), Fixed(2)));
        assert_eq!(p.name(), "a+b+c");
        assert_eq!(p.capability(), Capability::Composite);

        let p = Pipeline::new(vec![op("a", Fixed(1), Any), op("b", Fixed(1), Fixed(1))]).unwrap();
        assert_eq!(p.arity(), (Fixed(1), Any));
    }

    #[test]
    fn test_chunked_application() {
        use Arity::*;
        let p = Pipeline::new(vec![op("dup", Fixed(1), Fixed(2)), op("merge", Fixed(2), Fixed(1))])
            .unwrap();
        let mut rng = create_rng(1);
        let init = FnInitializer::new(|_: &mut SearchRng| vec![0u32]);
        let mut ctx = OperatorContext::new(&mut rng, &[], &init);
        let out = p.apply(vec![Individual::new(vec![7])], &mut ctx).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].genotype(), &vec![7, 7]);
    }

    #[test]
    fn test_single_stage_keeps_capability() {
        let p: Pipeline<Vec<u32>> = Pipeline::from_operator(Identity);
        assert_eq!(p.capability(), Capability::Identity);
        assert_eq!(p.arity(), (Arity::Any, Arity::Any));
    }
}
