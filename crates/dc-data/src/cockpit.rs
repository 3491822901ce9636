//! Coordinator tying dataset selection, batch size settings and the ideal
//! batch size cache together.

use dc_benchmark::{
    BenchmarkRange, IdealBatchSizeCache, ParameterSweep, SweepReport, TimingFunction,
};
use dc_types::{BatchSize, BenchmarkError, CockpitResult, ObjectId, SelectionError};
use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::batch::BatchSizeSetting;
use crate::config::CockpitConfig;
use crate::listing::ObjectStore;
use crate::selection::{DatasetSelection, DatasetSource};

/// Owns the state behind one cockpit session.
///
/// Everything is driven from a single caller through `&mut self`; the cache
/// is an owned value so sessions are isolated from each other.
#[derive(Debug)]
pub struct Cockpit {
    config: CockpitConfig,
    selection: DatasetSelection,
    settings: BTreeMap<DatasetSource, BatchSizeSetting>,
    cache: IdealBatchSizeCache,
    benchmarking_enabled: bool,
    focused: Option<DatasetSource>,
}

impl Cockpit {
    pub fn new(config: CockpitConfig) -> Self {
        Self::with_cache(config, IdealBatchSizeCache::new())
    }

    pub fn with_cache(config: CockpitConfig, cache: IdealBatchSizeCache) -> Self {
        let settings = DatasetSource::ALL
            .iter()
            .map(|source| (*source, config.batch_setting))
            .collect();
        Self {
            benchmarking_enabled: config.benchmarking_enabled,
            config,
            selection: DatasetSelection::new(),
            settings,
            cache,
            focused: None,
        }
    }

    pub fn config(&self) -> &CockpitConfig {
        &self.config
    }

    pub fn selection(&self) -> &DatasetSelection {
        &self.selection
    }

    pub fn cache(&self) -> &IdealBatchSizeCache {
        &self.cache
    }

    pub fn into_cache(self) -> IdealBatchSizeCache {
        self.cache
    }

    pub fn setting(&self, source: DatasetSource) -> BatchSizeSetting {
        self.settings
            .get(&source)
            .copied()
            .unwrap_or(self.config.batch_setting)
    }

    fn setting_mut(&mut self, source: DatasetSource) -> &mut BatchSizeSetting {
        self.settings.entry(source).or_insert(self.config.batch_setting)
    }

    /// Set the batch size of a source directly, clamped to its bounds.
    pub fn set_batch_size(&mut self, source: DatasetSource, value: BatchSize) -> BatchSize {
        self.setting_mut(source).update(value, None, None)
    }

    pub fn benchmarking_enabled(&self) -> bool {
        self.benchmarking_enabled
    }

    pub fn set_benchmarking(&mut self, enabled: bool) {
        info!("Benchmarking {}", if enabled { "enabled" } else { "disabled" });
        self.benchmarking_enabled = enabled;
    }

    pub fn select(&mut self, source: DatasetSource, object: ObjectId) {
        info!(source = %source, object = %object, "dataset selected");
        self.selection.select(source, object);
    }

    pub fn clear_selection(&mut self, source: DatasetSource) {
        self.selection.clear(source);
    }

    /// Select a key returned by an object listing.
    ///
    /// Empty keys and folder entries (ending in `/`) clear the source's
    /// selection instead.
    pub fn select_listed<S>(
        &mut self,
        source: DatasetSource,
        store: &S,
        container: &str,
        key: &str,
    ) -> Option<ObjectId>
    where
        S: ObjectStore + ?Sized,
    {
        if key.is_empty() || key.ends_with('/') {
            warn!(source = %source, key, "not a selectable object, clearing selection");
            self.selection.clear(source);
            return None;
        }
        let object = store.object_id(container, key);
        self.select(source, object.clone());
        Some(object)
    }

    /// Sweep `range` for the active dataset.
    ///
    /// On success the ideal batch size is cached and the active source's
    /// setting takes the range bounds and the ideal value.
    pub fn run_benchmark<T>(
        &mut self,
        range: BenchmarkRange,
        timing: &mut T,
    ) -> CockpitResult<SweepReport>
    where
        T: TimingFunction + ?Sized,
    {
        let (source, object) = self
            .selection
            .active()
            .map(|(source, object)| (source, object.clone()))
            .ok_or(SelectionError::NoDatasetSelected)?;

        let report = ParameterSweep::new(object, range).run(timing, &mut self.cache)?;

        let applied = self
            .setting_mut(source)
            .update(report.ideal_batch_size, Some(range.min), Some(range.max));
        info!(
            source = %source,
            object = %report.object,
            batch_size = applied,
            "batch size setting updated from benchmark"
        );
        Ok(report)
    }

    /// [`run_benchmark`](Self::run_benchmark) over the configured default range.
    pub fn run_default_benchmark<T>(&mut self, timing: &mut T) -> CockpitResult<SweepReport>
    where
        T: TimingFunction + ?Sized,
    {
        let range = self.config.benchmark_range;
        self.run_benchmark(range, timing)
    }

    /// A source gained focus: restore its cached ideal batch size, if any.
    pub fn focus(&mut self, source: DatasetSource) -> Option<BatchSize> {
        self.focused = Some(source);
        let object = self.selection.get(source)?;
        let ideal = self.cache.get(object)?;
        Some(self.setting_mut(source).update(ideal, None, None))
    }

    pub fn focused(&self) -> Option<DatasetSource> {
        self.focused
    }

    /// Batch size of the focused source, or `None` while that source has
    /// nothing selected.
    pub fn focused_batch_size(&self) -> Option<BatchSize> {
        let source = self.focused?;
        self.selection.get(source)?;
        Some(self.setting(source).value)
    }

    /// Object and batch size to hand to the partitioning step.
    ///
    /// Prefers the cached ideal batch size; falls back to the active source's
    /// setting unless benchmarking is enabled, in which case a sweep must have
    /// run first.
    pub fn processing_batch_size(&self) -> CockpitResult<(ObjectId, BatchSize)> {
        let (source, object) = self
            .selection
            .active()
            .ok_or(SelectionError::NoDatasetSelected)?;

        if let Some(ideal) = self.cache.get(object) {
            return Ok((object.clone(), ideal));
        }
        if self.benchmarking_enabled {
            return Err(BenchmarkError::NotRun {
                object: object.to_string(),
            }
            .into());
        }
        Ok((object.clone(), self.setting(source).value))
    }
}
