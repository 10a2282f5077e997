//! Representation-independent operators.

use super::schedule::Schedule;
use super::types::{Arity, Capability, Operator, OperatorContext};
use crate::error::{Error, Result};
use crate::individual::Individual;
use rand::Rng;

/// Passes individuals through untouched, cached fitness included.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl<G> Operator<G> for Identity {
    fn name(&self) -> &str {
        "identity"
    }

    fn arity(&self) -> (Arity, Arity) {
        (Arity::Any, Arity::Any)
    }

    fn capability(&self) -> Capability {
        Capability::Identity
    }

    fn apply(
        &self,
        inputs: Vec<Individual<G>>,
        _ctx: &mut OperatorContext<'_, G>,
    ) -> Result<Vec<Individual<G>>> {
        Ok(inputs)
    }
}

/// Replaces each input by a fresh genotype from the initializer.
///
/// The random-search preset is this operator alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomRestart;

impl<G> Operator<G> for RandomRestart {
    fn name(&self) -> &str {
        "random-restart"
    }

    fn arity(&self) -> (Arity, Arity) {
        (Arity::Fixed(1), Arity::Fixed(1))
    }

    fn capability(&self) -> Capability {
        Capability::Restart
    }

    fn apply(
        &self,
        inputs: Vec<Individual<G>>,
        ctx: &mut OperatorContext<'_, G>,
    ) -> Result<Vec<Individual<G>>> {
        let initializer = ctx.initializer;
        Ok(inputs
            .iter()
            .map(|_| {
                let genotype = initializer.create(ctx.rng);
                ctx.offspring(genotype)
            })
            .collect())
    }
}

/// Applies `inner` with probability `p`, otherwise passes inputs through.
///
/// This is how crossover and mutation rates are expressed. The inner
/// operator must produce as many individuals as it consumes.
pub struct WithProbability<G> {
    inner: Box<dyn Operator<G>>,
    probability: f64,
    schedule: Option<Schedule>,
    name: String,
}

impl<G> WithProbability<G> {
    pub fn new(inner: impl Operator<G> + 'static, probability: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&probability) {
            return Err(Error::Configuration(format!(
                "probability must be in [0, 1], got {probability}"
            )));
        }
        let (input, output) = inner.arity();
        if input != output {
            return Err(Error::ArityMismatch {
                upstream: inner.name().to_string(),
                produced: output.to_string(),
                downstream: "pass-through".into(),
                consumed: input.to_string(),
            });
        }
        let name = format!("{}@{probability}", inner.name());
        Ok(Self {
            inner: Box::new(inner),
            probability,
            schedule: None,
            name,
        })
    }

    /// Moves the probability along `schedule` as the search progresses,
    /// starting from `schedule.start`.
    pub fn with_schedule(mut self, schedule: Schedule) -> Result<Self> {
        schedule.validate("probability", 0.0..=1.0)?;
        self.probability = schedule.start;
        self.schedule = Some(schedule);
        Ok(self)
    }

    pub fn probability(&self) -> f64 {
        self.probability
    }
}

impl<G: Send + Sync> Operator<G> for WithProbability<G> {
    fn name(&self) -> &str {
        &self.name
    }

    fn arity(&self) -> (Arity, Arity) {
        self.inner.arity()
    }

    fn capability(&self) -> Capability {
        self.inner.capability()
    }

    fn apply(
        &self,
        inputs: Vec<Individual<G>>,
        ctx: &mut OperatorContext<'_, G>,
    ) -> Result<Vec<Individual<G>>> {
        if ctx.rng.random_bool(self.probability) {
            self.inner.apply(inputs, ctx)
        } else {
            Ok(inputs)
        }
    }

    fn update(&mut self, progress: f64) {
        if let Some(schedule) = &self.schedule {
            self.probability = schedule.value(progress).clamp(0.0, 1.0);
        }
        self.inner.update(progress);
    }
}

/// Samples `samples` neighbours of each input with a 1→1 move operator.
///
/// Followed by elitist selection or a plus-replacement, this is a
/// best-improvement local search.
pub struct Neighborhood<G> {
    inner: Box<dyn Operator<G>>,
    samples: usize,
    name: String,
}

impl<G> Neighborhood<G> {
    pub fn new(inner: impl Operator<G> + 'static, samples: usize) -> Result<Self> {
        if samples == 0 {
            return Err(Error::Configuration(
                "neighborhood needs at least one sample".into(),
            ));
        }
        if inner.arity() != (Arity::Fixed(1), Arity::Fixed(1)) {
            let (input, output) = inner.arity();
            return Err(Error::ArityMismatch {
                upstream: inner.name().to_string(),
                produced: output.to_string(),
                downstream: "neighborhood".into(),
                consumed: input.to_string(),
            });
        }
        let name = format!("{}x{samples}", inner.name());
        Ok(Self {
            inner: Box::new(inner),
            samples,
            name,
        })
    }
}

impl<G: Clone + Send + Sync> Operator<G> for Neighborhood<G> {
    fn name(&self) -> &str {
        &self.name
    }

    fn arity(&self) -> (Arity, Arity) {
        (Arity::Fixed(1), Arity::Fixed(self.samples))
    }

    fn capability(&self) -> Capability {
        Capability::LocalSearch
    }

    fn apply(
        &self,
        inputs: Vec<Individual<G>>,
        ctx: &mut OperatorContext<'_, G>,
    ) -> Result<Vec<Individual<G>>> {
        let mut out = Vec::with_capacity(inputs.len() * self.samples);
        for center in &inputs {
            for _ in 0..self.samples {
                out.extend(self.inner.apply(vec![center.clone()], ctx)?);
            }
        }
        Ok(out)
    }

    fn update(&mut self, progress: f64) {
        self.inner.update(progress);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::individual::Evaluation;
    use crate::initializer::FnInitializer;
    use crate::operator::GaussianMutation;
    use crate::random::{create_rng, SearchRng};

    fn evaluated(x: f64) -> Individual<Vec<f64>> {
        Individual::new(vec![x]).with_evaluation(Evaluation {
            fitness: x,
            objective: x,
        })
    }

    #[test]
    fn test_identity_keeps_cache() {
        let mut rng = create_rng(42);
        let init = FnInitializer::new(|_: &mut SearchRng| vec![0.0]);
        let mut ctx = OperatorContext::new(&mut rng, &[], &init);
        let out = Identity.apply(vec![evaluated(1.0), evaluated(2.0)], &mut ctx).unwrap();
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|i| i.is_evaluated()));
    }

    #[test]
    fn test_random_restart_uses_initializer() {
        let mut rng = create_rng(42);
        let init = FnInitializer::new(|_: &mut SearchRng| vec![9.0]);
        let mut ctx = OperatorContext::new(&mut rng, &[], &init).at_generation(3);
        let out = RandomRestart.apply(vec![evaluated(1.0)], &mut ctx).unwrap();
        assert_eq!(out[0].genotype(), &vec![9.0]);
        assert!(!out[0].is_evaluated());
        assert_eq!(out[0].birth(), 3);
    }

    #[test]
    fn test_with_probability_extremes() {
        let mut rng = create_rng(42);
        let init = FnInitializer::new(|_: &mut SearchRng| vec![9.0]);
        let mut ctx = OperatorContext::new(&mut rng, &[], &init);

        let never = WithProbability::new(RandomRestart, 0.0).unwrap();
        let out = never.apply(vec![evaluated(1.0)], &mut ctx).unwrap();
        assert_eq!(out[0].genotype(), &vec![1.0]);
        assert!(out[0].is_evaluated());

        let always = WithProbability::new(RandomRestart, 1.0).unwrap();
        let out = always.apply(vec![evaluated(1.0)], &mut ctx).unwrap();
        assert_eq!(out[0].genotype(), &vec![9.0]);
    }

    #[test]
    fn test_with_probability_validation() {
        assert!(WithProbability::<Vec<f64>>::new(RandomRestart, 1.5).is_err());
        assert!(WithProbability::<Vec<f64>>::new(RandomRestart, f64::NAN).is_err());
        let fan_out = Neighborhood::new(RandomRestart, 3).unwrap();
        assert!(matches!(
            WithProbability::<Vec<f64>>::new(fan_out, 0.5),
            Err(Error::ArityMismatch { .. })
        ));
    }

    #[test]
    fn test_neighborhood_samples() {
        let mut rng = create_rng(7);
        let init = FnInitializer::new(|_: &mut SearchRng| vec![0.0]);
        let mut ctx = OperatorContext::new(&mut rng, &[], &init);
        let op = Neighborhood::new(GaussianMutation::new(0.1).unwrap(), 5).unwrap();
        assert_eq!(op.arity(), (Arity::Fixed(1), Arity::Fixed(5)));
        let out = op.apply(vec![evaluated(1.0)], &mut ctx).unwrap();
        assert_eq!(out.len(), 5);
        assert!(out.iter().all(|i| !i.is_evaluated()));
        assert!(out.iter().all(|i| (i.genotype()[0] - 1.0).abs() < 1.0));
        assert!(Neighborhood::<Vec<f64>>::new(RandomRestart, 0).is_err());
    }

    #[test]
    fn test_with_probability_schedule() {
        let mut op = WithProbability::<Vec<f64>>::new(GaussianMutation::new(0.1).unwrap(), 0.5)
            .unwrap()
            .with_schedule(Schedule::linear(1.0, 0.0))
            .unwrap();
        assert_eq!(op.probability(), 1.0);
        op.update(0.25);
        assert_eq!(op.probability(), 0.75);
        op.update(1.0);
        assert_eq!(op.probability(), 0.0);

        let mut rng = create_rng(5);
        let init = FnInitializer::new(|_: &mut SearchRng| vec![0.0]);
        let mut ctx = OperatorContext::new(&mut rng, &[], &init);
        let out = op.apply(vec![evaluated(1.0)], &mut ctx).unwrap();
        assert!(out[0].is_evaluated(), "probability 0 passes inputs through");

        assert!(WithProbability::<Vec<f64>>::new(Identity, 0.5)
            .unwrap()
            .with_schedule(Schedule::linear(0.0, 2.0))
            .is_err());
    }
}
