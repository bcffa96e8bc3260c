use std::fmt;

use crate::combine::CombinerKind;
use crate::error::{Error, Result};

/// Outcome of checking a parallel result against the sequential baseline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Verdict<A> {
    /// Parallel result equals the baseline.
    Consistent,
    /// The unsynchronized combiner diverged. Expected-possible; recorded as
    /// data, never raised as an error.
    RaceObserved { expected: A, observed: A },
}

/// Compares `observed` against `expected` for one combiner.
///
/// Deterministic combiners (critical, reduction) use an associative and
/// commutative operation, so any disagreement with the sequential fold is a
/// defect and comes back as a hard `Mismatch` error. The unsynchronized
/// combiner is allowed to diverge; its divergence is the measurement.
pub fn verify<A>(kind: CombinerKind, expected: A, observed: A) -> Result<Verdict<A>>
where
    A: Copy + PartialEq + fmt::Debug,
{
    if observed == expected {
        return Ok(Verdict::Consistent);
    }
    if kind.is_deterministic() {
        return Err(Error::Mismatch {
            combiner: kind.label(),
            expected: format!("{expected:?}"),
            observed: format!("{observed:?}"),
        });
    }
    Ok(Verdict::RaceObserved { expected, observed })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consistent_result_passes() {
        for kind in [
            CombinerKind::Critical,
            CombinerKind::Reduction,
            CombinerKind::Unsynchronized,
        ] {
            assert_eq!(verify(kind, 4950i64, 4950).unwrap(), Verdict::Consistent);
        }
    }

    #[test]
    fn test_deterministic_mismatch_is_hard_failure() {
        for kind in [CombinerKind::Critical, CombinerKind::Reduction] {
            let err = verify(kind, 4950i64, 4949).unwrap_err();
            assert!(matches!(err, Error::Mismatch { .. }));
        }
    }

    #[test]
    fn test_race_divergence_is_data() {
        let verdict = verify(CombinerKind::Unsynchronized, 100i64, 97).unwrap();
        assert_eq!(
            verdict,
            Verdict::RaceObserved {
                expected: 100,
                observed: 97
            }
        );
    }
}
