//! Error taxonomy for the search engine.
//!
//! Construction-time problems ([`Error::ArityMismatch`],
//! [`Error::Configuration`]) are reported before any objective evaluation
//! is spent. Run-time problems ([`Error::ObjectiveEvaluation`],
//! [`Error::Encoding`], [`Error::Selection`]) abort the current generation
//! and surface to the caller unchanged.

/// Errors produced by encodings, operators, strategies and the engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A genotype or phenotype lies outside the domain of an encoding.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// The user-supplied objective function failed.
    ///
    /// Carries the offending genotype (in `Debug` form) and the generation
    /// in which the evaluation was attempted (0 = initial population).
    #[error("objective evaluation failed at generation {generation} for genotype {genotype}: {source}")]
    ObjectiveEvaluation {
        genotype: String,
        generation: usize,
        #[source]
        source: anyhow::Error,
    },

    /// Two chained operators do not agree on how many individuals flow
    /// between them.
    #[error("arity mismatch: `{upstream}` produces {produced} but `{downstream}` consumes {consumed}")]
    ArityMismatch {
        upstream: String,
        produced: String,
        downstream: String,
        consumed: String,
    },

    /// No individual with a usable fitness was available for selection.
    #[error("selection error: {0}")]
    Selection(String),

    /// Invalid or contradictory configuration.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The engine was driven in an order its state machine does not allow.
    #[error("invalid engine state: {0}")]
    State(String),
}

impl Error {
    /// Attaches the generation number to an objective evaluation failure.
    ///
    /// Other variants are returned unchanged.
    pub fn at_generation(self, generation: usize) -> Self {
        match self {
            Error::ObjectiveEvaluation {
                genotype, source, ..
            } => Error::ObjectiveEvaluation {
                genotype,
                generation,
                source,
            },
            other => other,
        }
    }

    /// Returns `true` if this error came from the objective function.
    pub fn is_evaluation_failure(&self) -> bool {
        matches!(self, Error::ObjectiveEvaluation { .. })
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_at_generation_rewrites_evaluation_errors() {
        let err = Error::ObjectiveEvaluation {
            genotype: "[1.0]".into(),
            generation: 0,
            source: anyhow::anyhow!("boom"),
        };
        match err.at_generation(7) {
            Error::ObjectiveEvaluation {
                generation,
                genotype,
                ..
            } => {
                assert_eq!(generation, 7);
                assert_eq!(genotype, "[1.0]");
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn test_at_generation_leaves_other_variants() {
        let err = Error::Selection("empty".into()).at_generation(3);
        assert!(matches!(err, Error::Selection(_)));
        assert!(!err.is_evaluation_failure());
    }

    #[test]
    fn test_display_mentions_genotype() {
        let err = Error::ObjectiveEvaluation {
            genotype: "[13.0]".into(),
            generation: 2,
            source: anyhow::anyhow!("bad input"),
        };
        let msg = err.to_string();
        assert!(msg.contains("[13.0]"), "{msg}");
        assert!(msg.contains("generation 2"), "{msg}");
    }
}
