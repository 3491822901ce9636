use dc_types::BatchSize;
use serde::{Deserialize, Serialize};

/// Batch size chosen for one dataset source, kept within its bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSizeSetting {
    pub value: BatchSize,
    pub min: BatchSize,
    pub max: BatchSize,
}

impl BatchSizeSetting {
    pub fn new(value: BatchSize, min: BatchSize, max: BatchSize) -> Self {
        let mut setting = Self::default();
        setting.update(value, Some(min), Some(max));
        setting
    }

    /// Apply optional new bounds, then clamp `value` into them.
    ///
    /// A new minimum above the maximum raises the maximum to match.
    pub fn update(
        &mut self,
        value: BatchSize,
        min: Option<BatchSize>,
        max: Option<BatchSize>,
    ) -> BatchSize {
        if let Some(min) = min {
            self.min = min;
        }
        if let Some(max) = max {
            self.max = max;
        }
        if self.min > self.max {
            self.max = self.min;
        }
        self.value = value.clamp(self.min, self.max);
        self.value
    }
}

impl Default for BatchSizeSetting {
    fn default() -> Self {
        Self {
            value: 5,
            min: 1,
            max: 100,
        }
    }
}
