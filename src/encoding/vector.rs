//! Real-vector encodings and search-space bounds.

use super::types::Encoding;
use crate::error::{Error, Result};

/// Per-gene closed interval `[lower_i, upper_i]`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Bounds {
    lower: Vec<f64>,
    upper: Vec<f64>,
}

impl Bounds {
    /// Creates bounds from explicit per-gene limits.
    ///
    /// Fails if the lengths differ or the vectors are empty. Also fails
    /// when a limit or the width `upper - lower` is not finite, or a lower
    /// limit exceeds its upper limit.
    pub fn new(lower: Vec<f64>, upper: Vec<f64>) -> Result<Self> {
        if lower.len() != upper.len() {
            return Err(Error::Configuration(format!(
                "bounds length mismatch: {} lower vs {} upper",
                lower.len(),
                upper.len()
            )));
        }
        if lower.is_empty() {
            return Err(Error::Configuration("bounds must have at least one gene".into()));
        }
        for (i, (&lo, &hi)) in lower.iter().zip(upper.iter()).enumerate() {
            if !lo.is_finite() || !hi.is_finite() {
                return Err(Error::Configuration(format!(
                    "bounds for gene {i} must be finite"
                )));
            }
            if lo > hi {
                return Err(Error::Configuration(format!(
                    "lower bound {lo} exceeds upper bound {hi} for gene {i}"
                )));
            }
            if !(hi - lo).is_finite() {
                return Err(Error::Configuration(format!(
                    "bounds for gene {i} are too wide: [{lo}, {hi}]"
                )));
            }
        }
        Ok(Self { lower, upper })
    }

    /// Same interval `[lower, upper]` for `dim` genes.
    pub fn uniform(dim: usize, lower: f64, upper: f64) -> Result<Self> {
        Self::new(vec![lower; dim], vec![upper; dim])
    }

    /// Number of genes.
    pub fn dim(&self) -> usize {
        self.lower.len()
    }

    pub fn lower(&self, gene: usize) -> f64 {
        self.lower[gene]
    }

    pub fn upper(&self, gene: usize) -> f64 {
        self.upper[gene]
    }

    /// Width of the interval for `gene`.
    pub fn range(&self, gene: usize) -> f64 {
        self.upper[gene] - self.lower[gene]
    }

    /// Whether `values` has the right length and lies inside the bounds.
    pub fn contains(&self, values: &[f64]) -> bool {
        values.len() == self.dim()
            && values
                .iter()
                .enumerate()
                .all(|(i, &v)| v >= self.lower[i] && v <= self.upper[i])
    }

    /// Clips every gene into its interval. NaN maps to the lower bound.
    pub fn clip(&self, mut values: Vec<f64>) -> Vec<f64> {
        for (i, v) in values.iter_mut().enumerate().take(self.dim()) {
            *v = if v.is_nan() {
                self.lower[i]
            } else {
                v.clamp(self.lower[i], self.upper[i])
            };
        }
        values
    }

    fn check(&self, values: &[f64], what: &str) -> Result<()> {
        if values.len() != self.dim() {
            return Err(Error::Encoding(format!(
                "{what} has length {}, expected {}",
                values.len(),
                self.dim()
            )));
        }
        for (i, &v) in values.iter().enumerate() {
            if !v.is_finite() {
                return Err(Error::Encoding(format!("{what} gene {i} is not finite")));
            }
            if v < self.lower[i] || v > self.upper[i] {
                return Err(Error::Encoding(format!(
                    "{what} gene {i} = {v} outside [{}, {}]",
                    self.lower[i], self.upper[i]
                )));
            }
        }
        Ok(())
    }
}

/// Real vector constrained to a box.
///
/// Decoding rejects vectors of the wrong length or outside the box;
/// [`repair`](Encoding::repair) clips operator output back into it.
#[derive(Debug, Clone)]
pub struct BoundedVectorEncoding {
    bounds: Bounds,
}

impl BoundedVectorEncoding {
    pub fn new(bounds: Bounds) -> Self {
        Self { bounds }
    }

    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }
}

impl Encoding for BoundedVectorEncoding {
    type Genotype = Vec<f64>;
    type Phenotype = Vec<f64>;

    fn encode(&self, phenotype: &Vec<f64>) -> Result<Vec<f64>> {
        self.bounds.check(phenotype, "phenotype")?;
        Ok(phenotype.clone())
    }

    fn decode(&self, genotype: &Vec<f64>) -> Result<Vec<f64>> {
        self.bounds.check(genotype, "genotype")?;
        Ok(genotype.clone())
    }

    fn repair(&self, genotype: Vec<f64>) -> Vec<f64> {
        self.bounds.clip(genotype)
    }
}

/// Real-valued genotype decoded to integers by rounding.
///
/// Lets real-vector operators search integer spaces. With bounds, repair
/// clips genes into the box and decoding rejects values outside it.
#[derive(Debug, Clone)]
pub struct RoundingEncoding {
    dim: usize,
    bounds: Option<Bounds>,
}

impl RoundingEncoding {
    /// Unbounded integer vectors of length `dim`.
    pub fn new(dim: usize) -> Self {
        Self { dim, bounds: None }
    }

    /// Integer vectors inside `bounds`.
    pub fn bounded(bounds: Bounds) -> Self {
        Self {
            dim: bounds.dim(),
            bounds: Some(bounds),
        }
    }

    pub fn bounds(&self) -> Option<&Bounds> {
        self.bounds.as_ref()
    }
}

impl Encoding for RoundingEncoding {
    type Genotype = Vec<f64>;
    type Phenotype = Vec<i64>;

    fn encode(&self, phenotype: &Vec<i64>) -> Result<Vec<f64>> {
        let genotype: Vec<f64> = phenotype.iter().map(|&v| v as f64).collect();
        match &self.bounds {
            Some(b) => b.check(&genotype, "phenotype")?,
            None if genotype.len() != self.dim => {
                return Err(Error::Encoding(format!(
                    "phenotype has length {}, expected {}",
                    genotype.len(),
                    self.dim
                )))
            }
            None => {}
        }
        Ok(genotype)
    }

    fn decode(&self, genotype: &Vec<f64>) -> Result<Vec<i64>> {
        if genotype.len() != self.dim {
            return Err(Error::Encoding(format!(
                "genotype has length {}, expected {}",
                genotype.len(),
                self.dim
            )));
        }
        let rounded: Vec<f64> = genotype.iter().map(|v| v.round()).collect();
        match &self.bounds {
            Some(b) => b.check(&rounded, "genotype")?,
            None => {
                if let Some(i) = rounded.iter().position(|v| !v.is_finite()) {
                    return Err(Error::Encoding(format!("genotype gene {i} is not finite")));
                }
            }
        }
        Ok(rounded.into_iter().map(|v| v as i64).collect())
    }

    fn repair(&self, genotype: Vec<f64>) -> Vec<f64> {
        match &self.bounds {
            Some(b) => b.clip(genotype),
            None => genotype,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_validation() {
        assert!(Bounds::new(vec![0.0], vec![1.0, 2.0]).is_err());
        assert!(Bounds::new(vec![], vec![]).is_err());
        assert!(Bounds::new(vec![2.0], vec![1.0]).is_err());
        assert!(Bounds::new(vec![f64::NEG_INFINITY], vec![1.0]).is_err());
        assert!(Bounds::uniform(3, -1.0, 1.0).is_ok());
    }

    #[test]
    fn test_bounds_reject_overflowing_width() {
        assert!(Bounds::uniform(1, -f64::MAX, f64::MAX).is_err());
        assert!(Bounds::uniform(1, -f64::MAX / 2.0, f64::MAX / 2.0).is_ok());
    }

    #[test]
    fn test_clip() {
        let b = Bounds::uniform(3, -1.0, 1.0).unwrap();
        assert_eq!(b.clip(vec![-5.0, 0.5, f64::NAN]), vec![-1.0, 0.5, -1.0]);
    }

    #[test]
    fn test_bounded_decode_rejects_out_of_domain() {
        let enc = BoundedVectorEncoding::new(Bounds::uniform(2, 0.0, 1.0).unwrap());
        assert!(enc.decode(&vec![0.5, 0.5]).is_ok());
        assert!(matches!(enc.decode(&vec![0.5]), Err(Error::Encoding(_))));
        assert!(matches!(enc.decode(&vec![0.5, 1.5]), Err(Error::Encoding(_))));
        assert!(matches!(
            enc.decode(&vec![0.5, f64::NAN]),
            Err(Error::Encoding(_))
        ));
    }

    #[test]
    fn test_bounded_repair_lands_in_domain() {
        let enc = BoundedVectorEncoding::new(Bounds::uniform(2, 0.0, 1.0).unwrap());
        let repaired = enc.repair(vec![-3.0, 9.0]);
        assert!(enc.decode(&repaired).is_ok());
    }

    #[test]
    fn test_rounding_round_trip() {
        let enc = RoundingEncoding::new(3);
        let x = vec![-4i64, 0, 17];
        assert_eq!(enc.decode(&enc.encode(&x).unwrap()).unwrap(), x);
    }

    #[test]
    fn test_rounding_decodes_nearest_integer() {
        let enc = RoundingEncoding::new(2);
        assert_eq!(enc.decode(&vec![1.4, -2.6]).unwrap(), vec![1, -3]);
    }

    #[test]
    fn test_rounding_bounded_rejects_out_of_range() {
        let enc = RoundingEncoding::bounded(Bounds::uniform(1, 0.0, 10.0).unwrap());
        assert!(enc.decode(&vec![11.2]).is_err());
        assert!(enc.encode(&vec![11]).is_err());
        assert_eq!(enc.decode(&enc.repair(vec![11.2])).unwrap(), vec![10]);
    }
}
