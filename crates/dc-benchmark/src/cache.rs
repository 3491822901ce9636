use chrono::{DateTime, Utc};
use dc_types::{BatchSize, CockpitResult, ObjectId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::range::BenchmarkRange;

/// Ideal batch size remembered for one object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedBatchSize {
    pub batch_size: BatchSize,
    /// Elapsed seconds measured for the winning batch size
    pub elapsed_seconds: f64,
    /// Range of the sweep that produced this entry
    pub range: BenchmarkRange,
    pub measured_at: DateTime<Utc>,
}

/// Ideal batch size per object, written only by completed sweeps.
///
/// Entries are replaced wholesale on re-run; nothing is merged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdealBatchSizeCache {
    entries: HashMap<ObjectId, CachedBatchSize>,
}

impl IdealBatchSizeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, object: &ObjectId) -> Option<BatchSize> {
        self.entries.get(object).map(|entry| entry.batch_size)
    }

    pub fn entry(&self, object: &ObjectId) -> Option<&CachedBatchSize> {
        self.entries.get(object)
    }

    /// Overwrite the entry for `object`, returning the replaced one.
    pub fn record(&mut self, object: ObjectId, entry: CachedBatchSize) -> Option<CachedBatchSize> {
        self.entries.insert(object, entry)
    }

    pub fn remove(&mut self, object: &ObjectId) -> Option<CachedBatchSize> {
        self.entries.remove(object)
    }

    pub fn contains(&self, object: &ObjectId) -> bool {
        self.entries.contains_key(object)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ObjectId, &CachedBatchSize)> {
        self.entries.iter()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Serializable copy of the cache, ordered by object id.
    pub fn to_snapshot(&self) -> CacheSnapshot {
        let mut entries: Vec<_> = self
            .entries
            .iter()
            .map(|(object, entry)| SnapshotEntry {
                object: object.clone(),
                cached: entry.clone(),
            })
            .collect();
        entries.sort_by(|a, b| a.object.cmp(&b.object));
        CacheSnapshot { entries }
    }

    pub fn from_snapshot(snapshot: CacheSnapshot) -> Self {
        let entries = snapshot
            .entries
            .into_iter()
            .map(|entry| (entry.object, entry.cached))
            .collect();
        Self { entries }
    }

    /// Load a snapshot written by [`save_json`](Self::save_json).
    ///
    /// A missing file yields an empty cache.
    pub fn load_json<P: AsRef<Path>>(path: P) -> CockpitResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!("No cache file at {}, starting empty", path.display());
            return Ok(Self::new());
        }

        let contents = std::fs::read_to_string(path)?;
        let snapshot: CacheSnapshot = serde_json::from_str(&contents)?;
        tracing::debug!(
            "Loaded {} cached batch sizes from {}",
            snapshot.entries.len(),
            path.display()
        );
        Ok(Self::from_snapshot(snapshot))
    }

    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> CockpitResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.to_snapshot())?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// On-disk form of [`IdealBatchSizeCache`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheSnapshot {
    pub entries: Vec<SnapshotEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub object: ObjectId,
    #[serde(flatten)]
    pub cached: CachedBatchSize,
}
