//! Operators on generic gene sequences (`Vec<T>`).

use super::types::{check_inputs, Arity, Capability, Operator, OperatorContext};
use crate::error::{Error, Result};
use crate::individual::Individual;
use rand::Rng;

fn parent_pair<T>(inputs: &[Individual<Vec<T>>], name: &str) -> Result<usize> {
    check_inputs(name, inputs, 2)?;
    let n = inputs[0].genotype().len();
    if inputs[1].genotype().len() != n {
        return Err(Error::Encoding(format!(
            "{name}: parents have lengths {} and {}",
            n,
            inputs[1].genotype().len()
        )));
    }
    Ok(n)
}

/// Single cut point; children swap tails.
#[derive(Debug, Clone, Copy, Default)]
pub struct OnePointCrossover;

impl OnePointCrossover {
    pub fn new() -> Self {
        Self
    }
}

impl<T: Clone + Send + Sync> Operator<Vec<T>> for OnePointCrossover {
    fn name(&self) -> &str {
        "one-point"
    }

    fn arity(&self) -> (Arity, Arity) {
        (Arity::Fixed(2), Arity::Fixed(2))
    }

    fn capability(&self) -> Capability {
        Capability::Crossover
    }

    fn apply(
        &self,
        inputs: Vec<Individual<Vec<T>>>,
        ctx: &mut OperatorContext<'_, Vec<T>>,
    ) -> Result<Vec<Individual<Vec<T>>>> {
        let n = parent_pair(&inputs, "one-point")?;
        if n < 2 {
            return Ok(inputs);
        }
        let cut = ctx.rng.random_range(1..n);
        let (a, b) = (inputs[0].genotype(), inputs[1].genotype());
        let c1: Vec<T> = a[..cut].iter().chain(&b[cut..]).cloned().collect();
        let c2: Vec<T> = b[..cut].iter().chain(&a[cut..]).cloned().collect();
        Ok(vec![ctx.offspring(c1), ctx.offspring(c2)])
    }
}

/// Each gene position is swapped between the children with probability ½.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformCrossover;

impl UniformCrossover {
    pub fn new() -> Self {
        Self
    }
}

impl<T: Clone + Send + Sync> Operator<Vec<T>> for UniformCrossover {
    fn name(&self) -> &str {
        "uniform"
    }

    fn arity(&self) -> (Arity, Arity) {
        (Arity::Fixed(2), Arity::Fixed(2))
    }

    fn capability(&self) -> Capability {
        Capability::Crossover
    }

    fn apply(
        &self,
        inputs: Vec<Individual<Vec<T>>>,
        ctx: &mut OperatorContext<'_, Vec<T>>,
    ) -> Result<Vec<Individual<Vec<T>>>> {
        parent_pair(&inputs, "uniform")?;
        let mut c1 = inputs[0].genotype().clone();
        let mut c2 = inputs[1].genotype().clone();
        for i in 0..c1.len() {
            if ctx.rng.random_bool(0.5) {
                std::mem::swap(&mut c1[i], &mut c2[i]);
            }
        }
        Ok(vec![ctx.offspring(c1), ctx.offspring(c2)])
    }
}

/// Flips each bit with probability `rate` (default `1/n`, at least one bit).
#[derive(Debug, Clone, Copy, Default)]
pub struct BitFlipMutation {
    rate: Option<f64>,
}

impl BitFlipMutation {
    pub fn new() -> Self {
        Self { rate: None }
    }

    pub fn with_rate(rate: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&rate) {
            return Err(Error::Configuration(format!(
                "bit-flip rate must be in [0, 1], got {rate}"
            )));
        }
        Ok(Self { rate: Some(rate) })
    }
}

impl Operator<Vec<bool>> for BitFlipMutation {
    fn name(&self) -> &str {
        "bit-flip"
    }

    fn arity(&self) -> (Arity, Arity) {
        (Arity::Fixed(1), Arity::Fixed(1))
    }

    fn capability(&self) -> Capability {
        Capability::Mutation
    }

    fn apply(
        &self,
        inputs: Vec<Individual<Vec<bool>>>,
        ctx: &mut OperatorContext<'_, Vec<bool>>,
    ) -> Result<Vec<Individual<Vec<bool>>>> {
        let mut out = Vec::with_capacity(inputs.len());
        for parent in inputs {
            let mut bits = parent.into_genotype();
            let n = bits.len();
            match self.rate {
                Some(rate) => {
                    for bit in bits.iter_mut() {
                        if ctx.rng.random_bool(rate) {
                            *bit = !*bit;
                        }
                    }
                }
                None if n > 0 => {
                    let p = 1.0 / n as f64;
                    let mut flipped = false;
                    for bit in bits.iter_mut() {
                        if ctx.rng.random_bool(p) {
                            *bit = !*bit;
                            flipped = true;
                        }
                    }
                    if !flipped {
                        let i = ctx.rng.random_range(0..n);
                        bits[i] = !bits[i];
                    }
                }
                None => {}
            }
            out.push(ctx.offspring(bits));
        }
        Ok(out)
    }
}

/// Applies a different 1→1 operator to each group of genes.
///
/// `mask[i]` names the operator (by index) responsible for gene `i`. Each
/// operator sees only its own genes, gathered in order, and its result is
/// scattered back into place. Genes of mixed nature (e.g. continuous and
/// integer) can be handled this way inside one genotype.
pub struct SplitOperator<T> {
    operators: Vec<Box<dyn Operator<Vec<T>>>>,
    mask: Vec<usize>,
    name: String,
}

impl<T> SplitOperator<T> {
    /// # Errors
    ///
    /// [`Error::Configuration`] if a mask entry has no operator or no
    /// operators are given, [`Error::ArityMismatch`] if an operator is not 1→1.
    pub fn new(operators: Vec<Box<dyn Operator<Vec<T>>>>, mask: Vec<usize>) -> Result<Self> {
        if operators.is_empty() {
            return Err(Error::Configuration("split operator needs operators".into()));
        }
        if let Some(&bad) = mask.iter().find(|&&m| m >= operators.len()) {
            return Err(Error::Configuration(format!(
                "mask refers to operator {bad}, only {} given",
                operators.len()
            )));
        }
        for op in &operators {
            let (input, output) = op.arity();
            if (input, output) != (Arity::Fixed(1), Arity::Fixed(1)) {
                return Err(Error::ArityMismatch {
                    upstream: "split".into(),
                    produced: "1".into(),
                    downstream: op.name().to_string(),
                    consumed: format!("{input}->{output}"),
                });
            }
        }
        let name = format!(
            "split({})",
            operators.iter().map(|o| o.name()).collect::<Vec<_>>().join(",")
        );
        Ok(Self {
            operators,
            mask,
            name,
        })
    }
}

impl<T: Clone + Send + Sync> Operator<Vec<T>> for SplitOperator<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn arity(&self) -> (Arity, Arity) {
        (Arity::Fixed(1), Arity::Fixed(1))
    }

    fn capability(&self) -> Capability {
        Capability::Composite
    }

    fn apply(
        &self,
        inputs: Vec<Individual<Vec<T>>>,
        ctx: &mut OperatorContext<'_, Vec<T>>,
    ) -> Result<Vec<Individual<Vec<T>>>> {
        let mut out = Vec::with_capacity(inputs.len());
        for parent in inputs {
            let mut genes = parent.into_genotype();
            if genes.len() != self.mask.len() {
                return Err(Error::Encoding(format!(
                    "split mask covers {} genes, genotype has {}",
                    self.mask.len(),
                    genes.len()
                )));
            }
            for (k, op) in self.operators.iter().enumerate() {
                let positions: Vec<usize> = (0..genes.len()).filter(|&i| self.mask[i] == k).collect();
                if positions.is_empty() {
                    continue;
                }
                let part: Vec<T> = positions.iter().map(|&i| genes[i].clone()).collect();
                let changed = op.apply(vec![Individual::new(part)], ctx)?;
                let part = changed
                    .into_iter()
                    .next()
                    .map(Individual::into_genotype)
                    .filter(|p| p.len() == positions.len())
                    .ok_or_else(|| {
                        Error::Encoding(format!("`{}` changed the gene count", op.name()))
                    })?;
                for (&i, value) in positions.iter().zip(part) {
                    genes[i] = value;
                }
            }
            out.push(ctx.offspring(genes));
        }
        Ok(out)
    }

    fn update(&mut self, progress: f64) {
        for op in &mut self.operators {
            op.update(progress);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::initializer::FnInitializer;
    use crate::operator::{GaussianMutation, RandomRestart};
    use crate::random::{create_rng, SearchRng};

    #[test]
    fn test_one_point_preserves_genes_per_position() {
        let mut rng = create_rng(42);
        let init = FnInitializer::new(|_: &mut SearchRng| vec![0u8; 6]);
        let mut ctx = OperatorContext::new(&mut rng, &[], &init);
        let a = Individual::new(vec![0u8; 6]);
        let b = Individual::new(vec![1u8; 6]);
        for _ in 0..30 {
            let out = OnePointCrossover.apply(vec![a.clone(), b.clone()], &mut ctx).unwrap();
            let (c1, c2) = (out[0].genotype(), out[1].genotype());
            for i in 0..6 {
                assert_eq!(c1[i] + c2[i], 1, "position {i} lost a gene");
            }
            assert_eq!(c1[0], 0);
            assert_eq!(c1[5], 1);
        }
    }

    #[test]
    fn test_one_point_length_mismatch() {
        let mut rng = create_rng(42);
        let init = FnInitializer::new(|_: &mut SearchRng| vec![0u8]);
        let mut ctx = OperatorContext::new(&mut rng, &[], &init);
        let res = OnePointCrossover.apply(
            vec![Individual::new(vec![0u8; 3]), Individual::new(vec![0u8; 4])],
            &mut ctx,
        );
        assert!(matches!(res, Err(Error::Encoding(_))));
        let res = OnePointCrossover.apply(vec![Individual::new(vec![0u8; 3])], &mut ctx);
        assert!(matches!(res, Err(Error::ArityMismatch { .. })));
    }

    #[test]
    fn test_uniform_crossover_complements() {
        let mut rng = create_rng(1);
        let init = FnInitializer::new(|_: &mut SearchRng| vec![false; 8]);
        let mut ctx = OperatorContext::new(&mut rng, &[], &init);
        let out = UniformCrossover
            .apply(
                vec![Individual::new(vec![false; 8]), Individual::new(vec![true; 8])],
                &mut ctx,
            )
            .unwrap();
        for i in 0..8 {
            assert_ne!(out[0].genotype()[i], out[1].genotype()[i]);
        }
    }

    #[test]
    fn test_bit_flip() {
        let mut rng = create_rng(9);
        let init = FnInitializer::new(|_: &mut SearchRng| vec![false; 8]);
        let mut ctx = OperatorContext::new(&mut rng, &[], &init);
        let out = BitFlipMutation::new()
            .apply(vec![Individual::new(vec![false; 8])], &mut ctx)
            .unwrap();
        assert!(out[0].genotype().iter().any(|&b| b));

        let all = BitFlipMutation::with_rate(1.0).unwrap();
        let out = all.apply(vec![Individual::new(vec![false; 8])], &mut ctx).unwrap();
        assert!(out[0].genotype().iter().all(|&b| b));
        assert!(BitFlipMutation::with_rate(-0.1).is_err());
    }

    #[test]
    fn test_split_touches_only_masked_genes() {
        let mut rng = create_rng(4);
        let init = FnInitializer::new(|_: &mut SearchRng| vec![42.0]);
        let mut ctx = OperatorContext::new(&mut rng, &[], &init);
        let op = SplitOperator::<f64>::new(
            vec![
                Box::new(GaussianMutation::new(1.0).unwrap().with_rate(1.0).unwrap()),
                Box::new(RandomRestart),
            ],
            vec![1, 0, 1, 0],
        );
        // RandomRestart over a 2-gene slice yields a 1-gene genotype
        let op = op.unwrap();
        let res = op.apply(vec![Individual::new(vec![0.0; 4])], &mut ctx);
        assert!(matches!(res, Err(Error::Encoding(_))));

        let op = SplitOperator::<f64>::new(
            vec![Box::new(GaussianMutation::new(1.0).unwrap().with_rate(1.0).unwrap())],
            vec![0, 0],
        )
        .unwrap();
        let out = op.apply(vec![Individual::new(vec![0.0, 0.0])], &mut ctx).unwrap();
        assert!(out[0].genotype().iter().all(|&g| g != 0.0));
    }

    #[test]
    fn test_split_keeps_unmasked_genes() {
        let mut rng = create_rng(4);
        let init = FnInitializer::new(|_: &mut SearchRng| vec![7.0, 7.0]);
        let mut ctx = OperatorContext::new(&mut rng, &[], &init);
        let op = SplitOperator::<f64>::new(
            vec![
                Box::new(GaussianMutation::new(1.0).unwrap().with_rate(0.0).unwrap()),
                Box::new(RandomRestart),
            ],
            vec![0, 1, 0, 1],
        )
        .unwrap();
        let out = op.apply(vec![Individual::new(vec![1.0, 2.0, 3.0, 4.0])], &mut ctx).unwrap();
        assert_eq!(out[0].genotype(), &vec![1.0, 7.0, 3.0, 7.0]);
    }

    #[test]
    fn test_split_validation() {
        let ops: Vec<Box<dyn Operator<Vec<f64>>>> = vec![Box::new(RandomRestart)];
        assert!(SplitOperator::new(ops, vec![0, 1]).is_err());
        assert!(SplitOperator::<f64>::new(vec![], vec![]).is_err());
    }
}
