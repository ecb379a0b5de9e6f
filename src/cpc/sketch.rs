// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use std::hash::Hash;

use crate::codec::SketchBytes;
use crate::common::NumStdDev;
use crate::cpc::estimator;
use crate::cpc::icon_estimator::column_weight;
use crate::cpc::pair_table::PairTable;
use crate::cpc::serialization;
use crate::cpc::{determine_correct_offset, flavor_of, Flavor, MAX_LG_K, MIN_LG_K};
use crate::error::Error;
use crate::hash::{MurmurHash3X64128, DEFAULT_UPDATE_SEED};

/// A Compressed Probabilistic Counting (CPC) sketch.
///
/// Estimates the number of distinct values streamed through [`CpcSketch::update`] using memory
/// proportional to `2^lg_k`. See the [module-level documentation](crate::cpc) for an overview of
/// how the internal representation evolves as the sketch fills.
#[derive(Debug, Clone)]
pub struct CpcSketch {
    lg_k: u8,
    seed: u64,
    num_coupons: u32,
    window_offset: u8,
    sliding_window: Option<Vec<u8>>,
    table: PairTable,
    kxp: f64,
    hip_est_accum: f64,
    hip_err_accum: f64,
    first_interesting_column: u8,
    merge_flag: bool,
}

impl CpcSketch {
    /// Constructs an empty sketch with the given `lg_k`, using the crate's default hash seed.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::ErrorKind::InvalidArgument`] if `lg_k` is outside `[4, 26]`.
    ///
    /// # Examples
    ///
    /// ```
    /// use cpc_sketch::cpc::CpcSketch;
    ///
    /// let sketch = CpcSketch::new(11).unwrap();
    /// assert!(sketch.is_empty());
    /// ```
    pub fn new(lg_k: u8) -> Result<Self, Error> {
        Self::with_seed(lg_k, DEFAULT_UPDATE_SEED)
    }

    /// Constructs an empty sketch with the given `lg_k` and hash seed.
    ///
    /// Two sketches can only be merged if they share the same seed.
    pub fn with_seed(lg_k: u8, seed: u64) -> Result<Self, Error> {
        if !(MIN_LG_K..=MAX_LG_K).contains(&lg_k) {
            return Err(Error::invalid_argument(format!(
                "lg_k must be in [{MIN_LG_K}, {MAX_LG_K}], got {lg_k}"
            ))
            .with_context("lg_k", lg_k));
        }
        let k = 1u64 << lg_k;
        Ok(Self {
            lg_k,
            seed,
            num_coupons: 0,
            window_offset: 0,
            sliding_window: None,
            table: PairTable::new(2.min(lg_k), lg_k + 6),
            kxp: k as f64,
            hip_est_accum: 0.0,
            hip_err_accum: 0.0,
            first_interesting_column: 0,
            merge_flag: false,
        })
    }

    /// Returns `true` if no items have ever been accepted into this sketch.
    pub fn is_empty(&self) -> bool {
        self.num_coupons == 0
    }

    /// Returns this sketch's `lg_k`.
    pub fn lg_k(&self) -> u8 {
        self.lg_k
    }

    /// Returns this sketch's hash seed.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub(crate) fn num_coupons(&self) -> u32 {
        self.num_coupons
    }

    pub(crate) fn window_offset(&self) -> u8 {
        self.window_offset
    }

    pub(crate) fn sliding_window(&self) -> Option<&[u8]> {
        self.sliding_window.as_deref()
    }

    pub(crate) fn table(&self) -> &PairTable {
        &self.table
    }

    pub(crate) fn kxp(&self) -> f64 {
        self.kxp
    }

    pub(crate) fn hip_est_accum(&self) -> f64 {
        self.hip_est_accum
    }

    pub(crate) fn merge_flag(&self) -> bool {
        self.merge_flag
    }

    pub(crate) fn first_interesting_column(&self) -> u8 {
        self.first_interesting_column
    }

    /// Returns this sketch's current storage flavor.
    pub(crate) fn flavor(&self) -> Flavor {
        flavor_of(self.num_coupons as u64, self.lg_k)
    }

    /// Feeds a single value into the sketch.
    ///
    /// `value` is hashed with a seeded 128-bit Murmur3 variant; repeated updates with values that
    /// hash identically are idempotent.
    pub fn update<T: Hash>(&mut self, value: T) {
        let mut hasher = MurmurHash3X64128::with_seed(self.seed);
        value.hash(&mut hasher);
        let (hash0, hash1) = hasher.finish128();
        let (row, col) = Self::row_col(hash0, hash1, self.lg_k);
        self.update_row_col(row, col);
    }

    fn row_col(hash0: u64, hash1: u64, lg_k: u8) -> (u32, u8) {
        let row = (hash0 >> (64 - lg_k)) as u32;
        let col = (hash1 | 1).leading_zeros().min(63) as u8;
        (row, col)
    }

    pub(crate) fn update_row_col(&mut self, row: u32, col: u8) {
        if col < self.window_offset {
            return;
        }
        let accepted = if col < self.window_offset + 8 && self.sliding_window.is_some() {
            let window = self.sliding_window.as_mut().unwrap();
            let bit = 1u8 << (col - self.window_offset);
            let was_set = window[row as usize] & bit != 0;
            if was_set {
                false
            } else {
                window[row as usize] |= bit;
                true
            }
        } else {
            self.table.maybe_insert((row << 6) | col as u32)
        };

        if accepted {
            self.num_coupons += 1;
            self.on_new_coupon(col);
            self.restore_invariants();
            self.recompute_first_interesting_column();
        }
    }

    /// Recomputes the minimum column among entries still in the surprising-value table, or the
    /// window offset if the table is currently empty. Called after every update, since both the
    /// table's contents and the window offset can change on each accepted coupon.
    fn recompute_first_interesting_column(&mut self) {
        self.first_interesting_column = first_interesting_column_of(&self.table, self.window_offset);
    }

    /// Updates the HIP martingale accumulators for a newly-accepted coupon at `col`.
    fn on_new_coupon(&mut self, col: u8) {
        let k = (1u64 << self.lg_k) as f64;
        self.hip_est_accum += k / self.kxp;
        self.hip_err_accum += (k / self.kxp).powi(2);
        self.kxp -= column_weight(col);
    }

    /// Restores the flavor/window-offset invariants after an update has changed `num_coupons`.
    fn restore_invariants(&mut self) {
        let k = 1u64 << self.lg_k;
        if self.sliding_window.is_none() {
            // promotion from a table-only representation (SPARSE/HYBRID) to a windowed one
            // happens once coupon density crosses the PINNED boundary (k/2 in §4.3).
            if 2 * (self.num_coupons as u64) >= k {
                self.promote_to_windowed();
            }
            return;
        }

        let target = determine_correct_offset(self.num_coupons as u64, self.lg_k);
        while self.window_offset < target {
            self.advance_window_offset();
        }
    }

    fn promote_to_windowed(&mut self) {
        let k = 1usize << self.lg_k;
        let mut window = vec![0u8; k];
        let items = self.table.unwrapping_get_items();
        let mut remaining = Vec::with_capacity(items.len());
        for item in items {
            let row = item >> 6;
            let col = (item & 0x3f) as u8;
            if col < 8 {
                window[row as usize] |= 1 << col;
            } else {
                remaining.push(item);
            }
        }
        self.table.clear();
        for item in remaining {
            self.table.maybe_insert(item);
        }
        self.sliding_window = Some(window);
    }

    /// Slides the window up by exactly one column, evicting any set bit at the vacated column
    /// into the surprising-value table.
    fn advance_window_offset(&mut self) {
        let window = self.sliding_window.as_mut().unwrap();
        for (row, byte) in window.iter_mut().enumerate() {
            if *byte & 1 != 0 {
                let evicted = ((row as u32) << 6) | self.window_offset as u32;
                self.table.maybe_insert(evicted);
            }
            *byte >>= 1;
        }
        self.window_offset += 1;
    }

    /// Returns the ICON-based cardinality estimate. Always defined, even for a merged sketch.
    pub fn estimate(&self) -> f64 {
        estimator::estimate(self.lg_k, self.num_coupons)
    }

    /// Returns the ICON-based lower confidence bound at the given width.
    pub fn lower_bound(&self, kappa: NumStdDev) -> f64 {
        estimator::lower_bound(self.lg_k, self.num_coupons, kappa)
    }

    /// Returns the ICON-based upper confidence bound at the given width.
    pub fn upper_bound(&self, kappa: NumStdDev) -> f64 {
        estimator::upper_bound(self.lg_k, self.num_coupons, kappa)
    }

    /// Returns the history-independent-processing (HIP) cardinality estimate.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::ErrorKind::MergedSketchHipUndefined`] if this sketch was produced
    /// by [`crate::cpc::CpcUnion::to_sketch`].
    pub fn hip_estimate(&self) -> Result<f64, Error> {
        estimator::hip_estimate(self.merge_flag, self.hip_est_accum)
    }

    /// Returns the HIP-based lower confidence bound at the given width.
    pub fn hip_lower_bound(&self, kappa: NumStdDev) -> Result<f64, Error> {
        estimator::hip_lower_bound(self.merge_flag, self.lg_k, self.num_coupons, self.hip_est_accum, kappa)
    }

    /// Returns the HIP-based upper confidence bound at the given width.
    pub fn hip_upper_bound(&self, kappa: NumStdDev) -> Result<f64, Error> {
        estimator::hip_upper_bound(self.merge_flag, self.lg_k, self.num_coupons, self.hip_est_accum, kappa)
    }

    /// Serializes this sketch to its compact, compressed binary form.
    pub fn serialize(&self) -> Vec<u8> {
        let mut bytes = SketchBytes::with_capacity(64);
        serialization::write(self, &mut bytes);
        bytes.into_bytes()
    }

    /// Deserializes a sketch previously produced by [`CpcSketch::serialize`].
    pub fn deserialize(bytes: &[u8]) -> Result<Self, Error> {
        serialization::read(bytes)
    }

    /// Materialises the conceptual `k x 64` bit matrix this sketch represents.
    ///
    /// Used by the merge engine to combine sketches without depending on their sparse/windowed
    /// representation directly.
    pub(crate) fn bit_matrix(&self) -> Vec<u64> {
        let k = 1usize << self.lg_k;
        let mut matrix = vec![0u64; k];
        if let Some(window) = &self.sliding_window {
            for (row, &byte) in window.iter().enumerate() {
                matrix[row] |= (byte as u64) << self.window_offset;
            }
        }
        for item in self.table.unwrapping_get_items() {
            let row = (item >> 6) as usize;
            let col = item & 0x3f;
            matrix[row] |= 1u64 << col;
        }
        matrix
    }

    /// Marks this sketch as the result of a union, making its HIP-based queries undefined.
    pub(crate) fn with_merge_flag(mut self) -> Self {
        self.merge_flag = true;
        self
    }

    /// Constructs a sketch directly from already-known internal state.
    ///
    /// Used by deserialization and by [`crate::cpc::CpcUnion::to_sketch`] to build a result
    /// sketch without replaying a stream of updates.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        lg_k: u8,
        seed: u64,
        num_coupons: u32,
        window_offset: u8,
        sliding_window: Option<Vec<u8>>,
        table: PairTable,
        kxp: f64,
        hip_est_accum: f64,
        hip_err_accum: f64,
        first_interesting_column: u8,
        merge_flag: bool,
    ) -> Self {
        Self {
            lg_k,
            seed,
            num_coupons,
            window_offset,
            sliding_window,
            table,
            kxp,
            hip_est_accum,
            hip_err_accum,
            first_interesting_column,
            merge_flag,
        }
    }

    pub(crate) fn hip_err_accum(&self) -> f64 {
        self.hip_err_accum
    }
}

/// The minimum column among `table`'s entries, or `window_offset` if `table` is empty.
///
/// Shared between the direct-update path above and `union.rs`'s matrix-to-sketch reconstruction,
/// since both need the same hint computed from the same two pieces of state.
pub(crate) fn first_interesting_column_of(table: &PairTable, window_offset: u8) -> u8 {
    table
        .unwrapping_get_items()
        .iter()
        .map(|&item| (item & 0x3f) as u8)
        .min()
        .unwrap_or(window_offset)
}

impl PartialEq for CpcSketch {
    /// Field-wise equality matching §8's round-trip law: two sketches are equal if their window
    /// and table contents match as sets, and their scalar fields match exactly (HIP accumulators
    /// are ignored once either sketch is a merge result, since they are then undefined).
    fn eq(&self, other: &Self) -> bool {
        if self.lg_k != other.lg_k
            || self.num_coupons != other.num_coupons
            || self.window_offset != other.window_offset
            || self.merge_flag != other.merge_flag
        {
            return false;
        }
        if self.sliding_window != other.sliding_window {
            return false;
        }
        let mut a = self.table.unwrapping_get_items();
        let mut b = other.table.unwrapping_get_items();
        a.sort_unstable();
        b.sort_unstable();
        if a != b {
            return false;
        }
        if !self.merge_flag {
            return self.kxp == other.kxp && self.hip_est_accum == other.hip_est_accum;
        }
        true
    }
}
