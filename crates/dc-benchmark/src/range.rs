//! Closed batch-size range swept by a benchmark run.

use dc_types::{BatchSize, BenchmarkError};
use serde::{Deserialize, Serialize};

/// Inclusive batch-size range `[min, max]` walked in `step` increments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenchmarkRange {
    pub min: BatchSize,
    pub max: BatchSize,
    pub step: BatchSize,
}

impl BenchmarkRange {
    /// Build a validated range.
    ///
    /// Fails with [`BenchmarkError::InvalidRange`] when `min` is zero, `min`
    /// exceeds `max`, or `step` is zero.
    pub fn new(min: BatchSize, max: BatchSize, step: BatchSize) -> Result<Self, BenchmarkError> {
        let range = Self { min, max, step };
        range.validate()?;
        Ok(range)
    }

    /// Re-check the invariants; useful for ranges built from deserialized input.
    pub fn validate(&self) -> Result<(), BenchmarkError> {
        if self.min == 0 || self.min > self.max || self.step == 0 {
            return Err(BenchmarkError::InvalidRange {
                min: self.min,
                max: self.max,
                step: self.step,
            });
        }
        Ok(())
    }

    /// Ascending candidate batch sizes: `min, min + step, ...` up to `max`.
    pub fn batch_sizes(&self) -> impl Iterator<Item = BatchSize> {
        // step == 0 would panic in step_by; an invalid range yields nothing.
        let step = self.step.max(1) as usize;
        let (min, max) = if self.validate().is_ok() {
            (self.min, self.max)
        } else {
            (1, 0)
        };
        (min..=max).step_by(step)
    }

    /// Number of candidates in the range.
    pub fn len(&self) -> usize {
        if self.validate().is_err() {
            return 0;
        }
        ((self.max - self.min) / self.step) as usize + 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for BenchmarkRange {
    fn default() -> Self {
        Self {
            min: 1,
            max: 100,
            step: 10,
        }
    }
}

impl std::fmt::Display for BenchmarkRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..={} step {}", self.min, self.max, self.step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stepped_range_stops_at_max() {
        let range = BenchmarkRange::new(1, 10, 3).unwrap();
        assert_eq!(range.batch_sizes().collect::<Vec<_>>(), vec![1, 4, 7, 10]);
        assert_eq!(range.len(), 4);
    }

    #[test]
    fn step_overshooting_max_is_excluded() {
        let range = BenchmarkRange::new(1, 100, 10).unwrap();
        let sizes: Vec<_> = range.batch_sizes().collect();
        assert_eq!(sizes.first(), Some(&1));
        assert_eq!(sizes.last(), Some(&91));
        assert_eq!(sizes.len(), range.len());
    }

    #[test]
    fn single_point_range() {
        let range = BenchmarkRange::new(7, 7, 5).unwrap();
        assert_eq!(range.batch_sizes().collect::<Vec<_>>(), vec![7]);
    }

    #[test]
    fn min_greater_than_max_is_rejected() {
        let err = BenchmarkRange::new(5, 3, 1).unwrap_err();
        assert_eq!(
            err,
            BenchmarkError::InvalidRange {
                min: 5,
                max: 3,
                step: 1
            }
        );
    }

    #[test]
    fn zero_step_and_zero_min_are_rejected() {
        assert!(BenchmarkRange::new(1, 10, 0).is_err());
        assert!(BenchmarkRange::new(0, 10, 1).is_err());
    }

    #[test]
    fn unvalidated_invalid_range_yields_nothing() {
        let range = BenchmarkRange {
            min: 9,
            max: 2,
            step: 0,
        };
        assert_eq!(range.batch_sizes().count(), 0);
        assert!(range.is_empty());
    }

    #[test]
    fn range_round_trips_through_json() {
        let range = BenchmarkRange::default();
        let json = serde_json::to_string(&range).unwrap();
        let back: BenchmarkRange = serde_json::from_str(&json).unwrap();
        assert_eq!(range, back);
    }
}
