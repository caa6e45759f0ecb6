// Copyright 2026 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-index extent caching with a running average and prefix sums.

use alloc::vec::Vec;

/// Caches measured item extents along the virtualization axis.
///
/// Indices that were never measured are estimated from a running average
/// over every measurement recorded so far (falling back to a seed estimate
/// while nothing is measured). A prefix-sum array of start offsets is
/// rebuilt lazily and binary-searched to map scroll offsets to indices.
///
/// # Example
///
/// ```rust
/// use trellis_virtual_list::ExtentCache;
///
/// let mut cache = ExtentCache::new(20.0);
/// cache.set_len(100);
///
/// // Nothing measured: the seed estimate stands in everywhere.
/// assert_eq!(cache.total_extent(), 2000.0);
///
/// // Measuring refines both the item and the estimate for the rest.
/// cache.record(0, 40.0, 100.0);
/// assert_eq!(cache.extent_of(0), 40.0);
/// assert_eq!(cache.extent_of(1), 40.0); // running average
/// assert_eq!(cache.total_extent(), 100.0 * 40.0);
/// ```
#[derive(Clone, Debug)]
pub struct ExtentCache {
    len: usize,
    measured: Vec<Option<f64>>,
    secondary: Vec<Option<f64>>,
    measured_sum: f64,
    measured_count: usize,
    seed_estimate: f64,
    offsets: Vec<f64>,
    offsets_valid: bool,
}

impl ExtentCache {
    /// Creates an empty cache with a seed estimate for unmeasured items.
    ///
    /// # Panics
    ///
    /// Panics unless the seed estimate is finite and positive.
    #[must_use]
    pub fn new(seed_estimate: f64) -> Self {
        assert!(
            seed_estimate.is_finite() && seed_estimate > 0.0,
            "Seed estimate must be finite and positive"
        );
        Self {
            len: 0,
            measured: Vec::new(),
            secondary: Vec::new(),
            measured_sum: 0.0,
            measured_count: 0,
            seed_estimate,
            offsets: Vec::new(),
            offsets_valid: false,
        }
    }

    /// Returns the number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the cache covers no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Resizes the cache; measurements past the new length are dropped.
    pub fn set_len(&mut self, len: usize) {
        if len == self.len {
            return;
        }
        if len < self.len {
            for dropped in self.measured.drain(len..).flatten() {
                self.measured_sum -= dropped;
                self.measured_count -= 1;
            }
            self.secondary.truncate(len);
        } else {
            self.measured.resize(len, None);
            self.secondary.resize(len, None);
        }
        self.len = len;
        self.offsets_valid = false;
    }

    /// Returns the current estimate for unmeasured items: the running
    /// average when anything was measured, the seed otherwise.
    #[must_use]
    pub fn estimate(&self) -> f64 {
        if self.measured_count > 0 {
            #[expect(clippy::cast_precision_loss, reason = "item counts are small")]
            let count = self.measured_count as f64;
            self.measured_sum / count
        } else {
            self.seed_estimate
        }
    }

    /// Returns the (measured or estimated) extent of one item.
    #[must_use]
    pub fn extent_of(&self, index: usize) -> f64 {
        self.measured
            .get(index)
            .copied()
            .flatten()
            .unwrap_or_else(|| self.estimate())
    }

    /// Returns the measured secondary-axis extent of one item, if any.
    #[must_use]
    pub fn secondary_of(&self, index: usize) -> Option<f64> {
        self.secondary.get(index).copied().flatten()
    }

    /// Records a measurement, updating the running average.
    ///
    /// Non-finite or negative extents are ignored.
    pub fn record(&mut self, index: usize, primary: f64, secondary: f64) {
        if index >= self.len || !primary.is_finite() || primary < 0.0 {
            return;
        }
        let previous = self.measured[index];
        if previous == Some(primary) {
            if secondary.is_finite() {
                self.secondary[index] = Some(secondary);
            }
            return;
        }
        if let Some(previous) = previous {
            self.measured_sum -= previous;
            self.measured_count -= 1;
        }
        self.measured[index] = Some(primary);
        self.measured_sum += primary;
        self.measured_count += 1;
        if secondary.is_finite() {
            self.secondary[index] = Some(secondary);
        }
        self.offsets_valid = false;
    }

    fn rebuild_offsets(&mut self) {
        if self.offsets_valid {
            return;
        }
        let estimate = self.estimate();
        self.offsets.clear();
        self.offsets.reserve(self.len + 1);
        let mut running = 0.0;
        self.offsets.push(0.0);
        for index in 0..self.len {
            running += self.measured[index].unwrap_or(estimate);
            self.offsets.push(running);
        }
        self.offsets_valid = true;
    }

    /// Returns the start offset of one item.
    #[must_use]
    pub fn offset_of(&mut self, index: usize) -> f64 {
        self.rebuild_offsets();
        self.offsets[index.min(self.len)]
    }

    /// Returns the total extent of all items, measured or estimated.
    #[must_use]
    pub fn total_extent(&mut self) -> f64 {
        self.rebuild_offsets();
        self.offsets.last().copied().unwrap_or(0.0)
    }

    /// Returns the last index whose start offset is `<= offset`.
    ///
    /// Clamped to valid indices; callers must ensure the cache is
    /// non-empty.
    #[must_use]
    pub fn index_at_offset(&mut self, offset: f64) -> usize {
        self.rebuild_offsets();
        let upper = self.offsets[..=self.len]
            .partition_point(|&start| start <= offset);
        upper.saturating_sub(1).min(self.len.saturating_sub(1))
    }

    /// Returns the last index whose start offset is strictly `< offset`.
    ///
    /// An item starting exactly at the viewport's far edge is not visible.
    #[must_use]
    pub fn last_index_before(&mut self, offset: f64) -> usize {
        self.rebuild_offsets();
        let upper = self.offsets[..=self.len]
            .partition_point(|&start| start < offset);
        upper.saturating_sub(1).min(self.len.saturating_sub(1))
    }
}
