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

//! A Compressed Probabilistic Counting (CPC) sketch for cardinality estimation.
//!
//! A CPC sketch estimates the number of distinct items streamed through [`CpcSketch::update`]
//! using bounded memory proportional to `2^lg_k`. Internally it models a conceptual `k x 64` bit
//! matrix of "coupons" (row, column) derived from a 128-bit hash of each item, and walks through a
//! sequence of increasingly compact storage flavors as it fills up.
//!
//! ```
//! use cpc_sketch::cpc::CpcSketch;
//!
//! let mut sketch = CpcSketch::new(11).unwrap();
//! for i in 0..10_000u64 {
//!     sketch.update(&i);
//! }
//! let estimate = sketch.estimate();
//! assert!((estimate - 10_000.0).abs() / 10_000.0 < 0.05);
//! ```

mod compression;
mod cpc_confidence;
mod estimator;
mod icon_estimator;
mod pair_table;
mod serialization;
mod sketch;
mod union;
mod wrapper;

pub use self::sketch::CpcSketch;
pub use self::union::CpcUnion;
pub use self::wrapper::CpcWrapper;

/// The smallest value of `lg_k` this crate will construct a sketch with.
///
/// Below this, the sparse-to-windowed transition math and the empirical confidence tables both
/// lose their footing.
pub const MIN_LG_K: u8 = 4;

/// The largest value of `lg_k` this crate will construct a sketch with.
///
/// Matches the largest `lg_k` for which `num_coupons` (a `u32`) cannot overflow: `k * 64` stays
/// well under `u32::MAX` even at this ceiling.
pub const MAX_LG_K: u8 = 26;

/// The `lg_k` used when a caller does not specify one.
pub const DEFAULT_LG_K: u8 = 11;

/// The storage "flavor" a sketch occupies, determined entirely by its `lg_k` and `num_coupons`.
///
/// A sketch walks through these in order as it accumulates coupons; it never reverts to an
/// earlier flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flavor {
    /// No coupons have been collected yet.
    Empty,
    /// Coupons are stored individually in a sparse hash table; `0 < num_coupons < 3k/32`.
    Sparse,
    /// Still table-backed, but dense enough that a bit-matrix row format would already pay off;
    /// `3k/32 <= num_coupons < k/2`.
    Hybrid,
    /// A single all-zero "window" column has been pinned per row, with exceptions (surprises)
    /// kept in the table; `k/2 <= num_coupons` and `window_offset == 0`.
    Pinned,
    /// Like `Pinned`, but the window has slid to a higher starting column as occupancy grew;
    /// `window_offset > 0`.
    Sliding,
}

/// Computes the flavor a sketch with `num_coupons` coupons and the given `lg_k` currently
/// occupies.
pub(crate) fn flavor_of(num_coupons: u64, lg_k: u8) -> Flavor {
    let k = 1u64 << lg_k;
    let c = num_coupons;
    if c == 0 {
        Flavor::Empty
    } else if 32 * c < 3 * k {
        Flavor::Sparse
    } else if 2 * c < k {
        Flavor::Hybrid
    } else if determine_correct_offset(c, lg_k) == 0 {
        Flavor::Pinned
    } else {
        Flavor::Sliding
    }
}

/// Computes the sliding window's starting column for a sketch with `num_coupons` coupons.
///
/// Mirrors the upstream formula `offset = max(0, floor((8c - 19k) / (8k)))`, computed with
/// integer arithmetic as `tmp = 8c - 19k; if tmp <= 0 { 0 } else { tmp >> (lg_k + 3) }`.
pub(crate) fn determine_correct_offset(num_coupons: u64, lg_k: u8) -> u8 {
    let k = 1i64 << lg_k;
    let c = num_coupons as i64;
    let tmp = 8 * c - 19 * k;
    if tmp <= 0 {
        0
    } else {
        (tmp >> (lg_k + 3)) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_at_zero_coupons() {
        assert_eq!(flavor_of(0, 11), Flavor::Empty);
    }

    #[test]
    fn sparse_then_hybrid_then_pinned_boundaries() {
        let lg_k = 11u8;
        let k = 1u64 << lg_k;
        assert_eq!(flavor_of(3 * k / 32 - 1, lg_k), Flavor::Sparse);
        assert_eq!(flavor_of(3 * k / 32, lg_k), Flavor::Hybrid);
        assert_eq!(flavor_of(k / 2 - 1, lg_k), Flavor::Hybrid);
        assert_eq!(flavor_of(k / 2, lg_k), Flavor::Pinned);
    }

    #[test]
    fn offset_becomes_positive_at_sliding_boundary() {
        let lg_k = 11u8;
        let k = 1u64 << lg_k;
        // c/k = 27/8 is exactly where offset first becomes 1.
        let c = (27 * k) / 8;
        assert_eq!(determine_correct_offset(c, lg_k), 1);
        assert_eq!(flavor_of(c, lg_k), Flavor::Sliding);
        assert_eq!(determine_correct_offset(c - 1, lg_k), 0);
    }

    #[test]
    fn offset_is_monotone_nondecreasing() {
        let lg_k = 10u8;
        let k = 1u64 << lg_k;
        let mut prev = 0u8;
        for c in (0..(64 * k)).step_by(17) {
            let off = determine_correct_offset(c, lg_k);
            assert!(off >= prev);
            prev = off;
        }
    }
}
