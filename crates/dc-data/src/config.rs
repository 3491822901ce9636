use dc_benchmark::BenchmarkRange;
use dc_types::{config_error, BatchSize, CockpitResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::batch::BatchSizeSetting;
use crate::listing::DEFAULT_PAGE_SIZE;

pub const ENV_MIN_BATCH: &str = "DATA_COCKPIT_MIN_BATCH";
pub const ENV_MAX_BATCH: &str = "DATA_COCKPIT_MAX_BATCH";
pub const ENV_STEP: &str = "DATA_COCKPIT_STEP";
pub const ENV_BENCHMARKING: &str = "DATA_COCKPIT_BENCHMARKING";
pub const ENV_CACHE: &str = "DATA_COCKPIT_CACHE";

/// Cockpit configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CockpitConfig {
    /// Range swept when no explicit range is given
    pub benchmark_range: BenchmarkRange,
    /// Initial batch size setting of every dataset source
    pub batch_setting: BatchSizeSetting,
    /// Require a benchmark before a batch size is handed to processing
    pub benchmarking_enabled: bool,
    /// Entries requested per listing page
    pub page_size: usize,
    /// Where the ideal batch size cache is persisted
    pub cache_path: Option<PathBuf>,
}

impl Default for CockpitConfig {
    fn default() -> Self {
        Self {
            benchmark_range: BenchmarkRange::default(),
            batch_setting: BatchSizeSetting::default(),
            benchmarking_enabled: false,
            page_size: DEFAULT_PAGE_SIZE,
            cache_path: None,
        }
    }
}

impl CockpitConfig {
    /// Defaults overridden by `DATA_COCKPIT_*` environment variables.
    pub fn from_env() -> CockpitResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable name.
    pub fn from_lookup<F>(lookup: F) -> CockpitResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup(ENV_MIN_BATCH) {
            config.benchmark_range.min = parse_batch_size(ENV_MIN_BATCH, &value)?;
        }
        if let Some(value) = lookup(ENV_MAX_BATCH) {
            config.benchmark_range.max = parse_batch_size(ENV_MAX_BATCH, &value)?;
        }
        if let Some(value) = lookup(ENV_STEP) {
            config.benchmark_range.step = parse_batch_size(ENV_STEP, &value)?;
        }
        if let Some(value) = lookup(ENV_BENCHMARKING) {
            config.benchmarking_enabled = parse_flag(ENV_BENCHMARKING, &value)?;
        }
        if let Some(value) = lookup(ENV_CACHE) {
            if !value.trim().is_empty() {
                config.cache_path = Some(PathBuf::from(value.trim()));
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> CockpitResult<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> CockpitResult<()> {
        self.benchmark_range.validate()?;
        if self.page_size == 0 {
            return Err(config_error!("page_size must be at least 1"));
        }
        if self.batch_setting.min > self.batch_setting.max {
            return Err(config_error!(
                "batch setting bounds are inverted: {} > {}",
                self.batch_setting.min,
                self.batch_setting.max
            ));
        }
        Ok(())
    }

    /// Configured cache path, or the per-user default.
    pub fn resolved_cache_path(&self) -> PathBuf {
        self.cache_path.clone().unwrap_or_else(default_cache_path)
    }
}

/// `<data dir>/data-cockpit/ideal_batch_sizes.json`
pub fn default_cache_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("data-cockpit")
        .join("ideal_batch_sizes.json")
}

fn parse_batch_size(name: &str, value: &str) -> CockpitResult<BatchSize> {
    value
        .trim()
        .parse::<BatchSize>()
        .map_err(|e| config_error!("{name} must be a positive integer, got {value:?}: {e}"))
}

fn parse_flag(name: &str, value: &str) -> CockpitResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" | "enabled" => Ok(true),
        "0" | "false" | "no" | "off" | "disabled" => Ok(false),
        _ => Err(config_error!("{name} must be a boolean flag, got {value:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dc_types::{BenchmarkError, CockpitError};
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults_without_overrides() {
        let config = CockpitConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, CockpitConfig::default());
        assert_eq!(config.benchmark_range, BenchmarkRange { min: 1, max: 100, step: 10 });
        assert!(!config.benchmarking_enabled);
    }

    #[test]
    fn environment_overrides() {
        let config = CockpitConfig::from_lookup(lookup(&[
            (ENV_MIN_BATCH, "2"),
            (ENV_MAX_BATCH, " 64 "),
            (ENV_STEP, "4"),
            (ENV_BENCHMARKING, "Enabled"),
            (ENV_CACHE, "/tmp/cockpit/cache.json"),
        ]))
        .unwrap();

        assert_eq!(config.benchmark_range, BenchmarkRange { min: 2, max: 64, step: 4 });
        assert!(config.benchmarking_enabled);
        assert_eq!(config.resolved_cache_path(), PathBuf::from("/tmp/cockpit/cache.json"));
    }

    #[test]
    fn invalid_values_are_config_errors() {
        let err = CockpitConfig::from_lookup(lookup(&[(ENV_STEP, "ten")])).unwrap_err();
        assert!(matches!(err, CockpitError::Config(_)));

        let err = CockpitConfig::from_lookup(lookup(&[(ENV_BENCHMARKING, "maybe")])).unwrap_err();
        assert!(matches!(err, CockpitError::Config(_)));
    }

    #[test]
    fn inverted_range_is_rejected() {
        let err = CockpitConfig::from_lookup(lookup(&[(ENV_MIN_BATCH, "50"), (ENV_MAX_BATCH, "5")]))
            .unwrap_err();
        assert!(matches!(
            err,
            CockpitError::Benchmark(BenchmarkError::InvalidRange { min: 50, max: 5, .. })
        ));
    }

    #[test]
    fn json_file_with_partial_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cockpit.json");
        std::fs::write(
            &path,
            r#"{"benchmarking_enabled": true, "benchmark_range": {"min": 8, "max": 32, "step": 8}}"#,
        )
        .unwrap();

        let config = CockpitConfig::from_json_file(&path).unwrap();
        assert!(config.benchmarking_enabled);
        assert_eq!(config.benchmark_range.batch_sizes().collect::<Vec<_>>(), vec![8, 16, 24, 32]);
        assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn default_cache_path_is_namespaced() {
        let path = default_cache_path();
        assert!(path.ends_with("data-cockpit/ideal_batch_sizes.json"));
    }
}
