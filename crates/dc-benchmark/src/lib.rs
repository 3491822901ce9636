//! # dc-benchmark
//!
//! Batch-size benchmarking for Data Cockpit.
//!
//! Provides the benchmark range definition, the timing-function seam, the
//! sweep driver that picks the fastest batch size, and the cache that remembers
//! the ideal batch size per object.

mod cache;
mod range;
mod sweep;
mod timing;

pub use cache::{CacheSnapshot, CachedBatchSize, IdealBatchSizeCache, SnapshotEntry};
pub use range::BenchmarkRange;
pub use sweep::{
    select_ideal, BenchmarkResult, Evaluation, EvaluationOutcome, ParameterSweep, SweepId,
    SweepReport,
};
pub use timing::{TimingFunction, WallClock};
