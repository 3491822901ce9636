//! Batch-size sweep: evaluate every candidate once and keep the fastest.

use chrono::{DateTime, Utc};
use dc_types::{BatchSize, BenchmarkError, EvaluationError, ObjectId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cache::{CachedBatchSize, IdealBatchSizeCache};
use crate::range::BenchmarkRange;
use crate::timing::TimingFunction;

/// Unique sweep run identifier.
pub type SweepId = Uuid;

/// Elapsed seconds per successfully evaluated batch size.
pub type BenchmarkResult = BTreeMap<BatchSize, f64>;

/// Outcome of timing a single batch size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EvaluationOutcome {
    Success { elapsed_seconds: f64 },
    Failure { reason: String },
}

/// One evaluated candidate of a sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub batch_size: BatchSize,
    pub outcome: EvaluationOutcome,
}

impl Evaluation {
    pub fn success(batch_size: BatchSize, elapsed_seconds: f64) -> Self {
        Self {
            batch_size,
            outcome: EvaluationOutcome::Success { elapsed_seconds },
        }
    }

    pub fn failure(batch_size: BatchSize, reason: impl Into<String>) -> Self {
        Self {
            batch_size,
            outcome: EvaluationOutcome::Failure {
                reason: reason.into(),
            },
        }
    }

    pub fn elapsed_seconds(&self) -> Option<f64> {
        match self.outcome {
            EvaluationOutcome::Success { elapsed_seconds } => Some(elapsed_seconds),
            EvaluationOutcome::Failure { .. } => None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.elapsed_seconds().is_some()
    }
}

/// Pick the batch size with the strictly smallest elapsed time.
///
/// Only successful evaluations are considered. On ties the first one in
/// `evaluations` order wins, which for a sweep is the smaller batch size.
pub fn select_ideal(evaluations: &[Evaluation]) -> Option<(BatchSize, f64)> {
    let mut best: Option<(BatchSize, f64)> = None;
    for evaluation in evaluations {
        let Some(elapsed) = evaluation.elapsed_seconds() else {
            continue;
        };
        let improves = match best {
            None => true,
            Some((_, best_elapsed)) => elapsed < best_elapsed,
        };
        if improves {
            best = Some((evaluation.batch_size, elapsed));
        }
    }
    best
}

/// Record of a completed sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepReport {
    pub id: SweepId,
    pub object: ObjectId,
    pub range: BenchmarkRange,
    /// Every candidate in ascending batch-size order, failures included.
    pub evaluations: Vec<Evaluation>,
    pub ideal_batch_size: BatchSize,
    pub ideal_elapsed_seconds: f64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl SweepReport {
    /// Successful measurements only.
    pub fn results(&self) -> BenchmarkResult {
        self.evaluations
            .iter()
            .filter_map(|e| e.elapsed_seconds().map(|elapsed| (e.batch_size, elapsed)))
            .collect()
    }

    /// Batch sizes whose evaluation failed, with the diagnostic message.
    pub fn failures(&self) -> impl Iterator<Item = (BatchSize, &str)> {
        self.evaluations.iter().filter_map(|e| match &e.outcome {
            EvaluationOutcome::Failure { reason } => Some((e.batch_size, reason.as_str())),
            EvaluationOutcome::Success { .. } => None,
        })
    }
}

/// A single synchronous pass over a [`BenchmarkRange`] for one object.
#[derive(Debug, Clone)]
pub struct ParameterSweep {
    object: ObjectId,
    range: BenchmarkRange,
}

impl ParameterSweep {
    pub fn new(object: ObjectId, range: BenchmarkRange) -> Self {
        Self { object, range }
    }

    pub fn object(&self) -> &ObjectId {
        &self.object
    }

    pub fn range(&self) -> &BenchmarkRange {
        &self.range
    }

    /// Time every candidate in ascending order without touching any cache.
    ///
    /// Failed timing calls are recorded and the pass continues.
    pub fn evaluate<T>(&self, timing: &mut T) -> Result<Vec<Evaluation>, BenchmarkError>
    where
        T: TimingFunction + ?Sized,
    {
        self.range.validate()?;

        let mut evaluations = Vec::new();
        for batch_size in self.range.batch_sizes() {
            let measured = timing
                .measure(&self.object, batch_size)
                .and_then(check_elapsed);
            let evaluation = match measured {
                Ok(elapsed_seconds) => {
                    debug!(
                        object = %self.object,
                        batch_size,
                        elapsed_seconds,
                        "batch size evaluated"
                    );
                    Evaluation::success(batch_size, elapsed_seconds)
                }
                Err(e) => {
                    warn!(
                        object = %self.object,
                        batch_size,
                        error = %e,
                        "batch size evaluation failed"
                    );
                    Evaluation::failure(batch_size, e.to_string())
                }
            };
            evaluations.push(evaluation);
        }
        Ok(evaluations)
    }

    /// Run the sweep and, on success, overwrite the cached ideal batch size.
    ///
    /// An invalid range fails before any evaluation. If every evaluation fails
    /// the sweep fails with [`BenchmarkError::NoValidResults`] and the cache is
    /// left as it was.
    pub fn run<T>(
        self,
        timing: &mut T,
        cache: &mut IdealBatchSizeCache,
    ) -> Result<SweepReport, BenchmarkError>
    where
        T: TimingFunction + ?Sized,
    {
        self.range.validate()?;

        if let Some(previous) = cache.get(&self.object) {
            info!(
                object = %self.object,
                previous,
                "existing ideal batch size will be overwritten by this sweep"
            );
        }

        info!(object = %self.object, range = %self.range, "starting batch size sweep");
        let started_at = Utc::now();
        let evaluations = self.evaluate(timing)?;
        let finished_at = Utc::now();

        let Some((ideal_batch_size, ideal_elapsed_seconds)) = select_ideal(&evaluations) else {
            warn!(
                object = %self.object,
                attempted = evaluations.len(),
                "sweep produced no valid results"
            );
            return Err(BenchmarkError::NoValidResults {
                object: self.object.to_string(),
                attempted: evaluations.len(),
            });
        };

        cache.record(
            self.object.clone(),
            CachedBatchSize {
                batch_size: ideal_batch_size,
                elapsed_seconds: ideal_elapsed_seconds,
                range: self.range,
                measured_at: finished_at,
            },
        );
        info!(
            object = %self.object,
            ideal_batch_size,
            ideal_elapsed_seconds,
            "ideal batch size determined"
        );

        Ok(SweepReport {
            id: Uuid::new_v4(),
            object: self.object,
            range: self.range,
            evaluations,
            ideal_batch_size,
            ideal_elapsed_seconds,
            started_at,
            finished_at,
        })
    }
}

fn check_elapsed(elapsed: f64) -> Result<f64, EvaluationError> {
    if elapsed.is_finite() && elapsed >= 0.0 {
        Ok(elapsed)
    } else {
        Err(EvaluationError::InvalidElapsed { value: elapsed })
    }
}
