//! Timing functions measure how long one batch size takes for one object.

use dc_types::{BatchSize, EvaluationError, ObjectId};
use std::fmt::Display;
use std::time::Instant;

/// Caller-supplied collaborator that times one batch size for one object.
///
/// Implementations return the elapsed time in seconds or fail. A failure only
/// excludes that batch size from the sweep.
pub trait TimingFunction {
    fn measure(&mut self, object: &ObjectId, batch_size: BatchSize) -> Result<f64, EvaluationError>;
}

impl<F, E> TimingFunction for F
where
    F: FnMut(&ObjectId, BatchSize) -> Result<f64, E>,
    E: Display,
{
    fn measure(
        &mut self,
        object: &ObjectId,
        batch_size: BatchSize,
    ) -> Result<f64, EvaluationError> {
        self(object, batch_size).map_err(|e| EvaluationError::failed(e.to_string()))
    }
}

/// Adapts a workload into a timing function by measuring its wall-clock time.
pub struct WallClock<W> {
    workload: W,
}

impl<W, E> WallClock<W>
where
    W: FnMut(&ObjectId, BatchSize) -> Result<(), E>,
    E: Display,
{
    pub fn new(workload: W) -> Self {
        Self { workload }
    }
}

impl<W, E> TimingFunction for WallClock<W>
where
    W: FnMut(&ObjectId, BatchSize) -> Result<(), E>,
    E: Display,
{
    fn measure(
        &mut self,
        object: &ObjectId,
        batch_size: BatchSize,
    ) -> Result<f64, EvaluationError> {
        let started = Instant::now();
        (self.workload)(object, batch_size).map_err(|e| EvaluationError::failed(e.to_string()))?;
        Ok(started.elapsed().as_secs_f64())
    }
}
