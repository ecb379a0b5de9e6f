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

//! The UG85 merge engine: combines independently-built sketches, possibly with differing `lg_k`,
//! into a single canonical sketch at the smallest `lg_k` seen.

use crate::cpc::pair_table::PairTable;
use crate::cpc::sketch::{first_interesting_column_of, CpcSketch};
use crate::cpc::{determine_correct_offset, flavor_of, Flavor};
use crate::error::Error;
use crate::hash::DEFAULT_UPDATE_SEED;

enum UnionState {
    /// The accumulator hasn't grown dense enough to be worth a bit-matrix representation yet;
    /// it is mutated the same way a directly-updated sketch would be.
    Sparse(CpcSketch),
    /// A plain `k`-row bit matrix, one `u64` per row.
    Dense(Vec<u64>),
}

/// The merge (union) accumulator for [`CpcSketch`]s.
///
/// Sketches fed in may have a larger `lg_k` than the accumulator (they are folded down) or a
/// smaller one (the accumulator itself is folded down to match). The result always ends up at
/// the smallest `lg_k` among the accumulator's initial value and every source fed to it.
pub struct CpcUnion {
    seed: u64,
    lg_k: u8,
    state: UnionState,
}

impl CpcUnion {
    /// Constructs an empty merge accumulator with the given starting `lg_k`, using the crate's
    /// default hash seed.
    pub fn new(lg_k: u8) -> Result<Self, Error> {
        Self::with_seed(lg_k, DEFAULT_UPDATE_SEED)
    }

    /// Constructs an empty merge accumulator with the given starting `lg_k` and hash seed.
    pub fn with_seed(lg_k: u8, seed: u64) -> Result<Self, Error> {
        let sketch = CpcSketch::with_seed(lg_k, seed)?;
        Ok(Self {
            seed,
            lg_k,
            state: UnionState::Sparse(sketch),
        })
    }

    /// Returns the accumulator's current `lg_k` (may have shrunk since construction).
    pub fn lg_k(&self) -> u8 {
        self.lg_k
    }

    /// Feeds a source sketch into the accumulator.
    ///
    /// `src` is left untouched; its bit matrix is copied, not aliased.
    pub fn update(&mut self, src: &CpcSketch) {
        if src.is_empty() {
            return;
        }
        debug_assert_eq!(
            src.seed(),
            self.seed,
            "merging sketches built with different hash seeds produces coupons over unrelated \
             hash spaces",
        );

        if src.lg_k() < self.lg_k {
            self.downgrade_to(src.lg_k());
        }
        let target_lg_k = self.lg_k;

        let src_matrix = src.bit_matrix();
        let folded = fold_to_lg_k(src_matrix, src.lg_k(), target_lg_k);

        match &mut self.state {
            UnionState::Sparse(acc) => {
                for (row, &bits) in folded.iter().enumerate() {
                    let mut remaining = bits;
                    while remaining != 0 {
                        let col = remaining.trailing_zeros() as u8;
                        remaining &= remaining - 1;
                        acc.update_row_col(row as u32, col);
                    }
                }
                if !matches!(acc.flavor(), Flavor::Empty | Flavor::Sparse | Flavor::Hybrid) {
                    let matrix = acc.bit_matrix();
                    self.state = UnionState::Dense(matrix);
                }
            }
            UnionState::Dense(matrix) => {
                for (row, bits) in folded.into_iter().enumerate() {
                    matrix[row] |= bits;
                }
            }
        }
    }

    /// Folds the accumulator's own state down to `new_lg_k`, converting it to a dense matrix in
    /// the process.
    fn downgrade_to(&mut self, new_lg_k: u8) {
        let matrix = match &self.state {
            UnionState::Sparse(acc) => acc.bit_matrix(),
            UnionState::Dense(matrix) => matrix.clone(),
        };
        let folded = fold_to_lg_k(matrix, self.lg_k, new_lg_k);
        self.lg_k = new_lg_k;
        self.state = UnionState::Dense(folded);
    }

    /// Reconstructs a canonical [`CpcSketch`] from the accumulator's current state.
    ///
    /// The accumulator remains usable afterward. The result's `merge_flag` is always `true`, so
    /// its HIP-based estimate/bounds are undefined.
    pub fn to_sketch(&self) -> CpcSketch {
        match &self.state {
            UnionState::Sparse(acc) => acc.clone().with_merge_flag(),
            UnionState::Dense(matrix) => sketch_from_matrix(matrix, self.lg_k, self.seed),
        }
    }
}

/// Folds a bit matrix built at `from_lg_k` down to `to_lg_k` by repeatedly OR-reducing adjacent
/// row pairs, matching the way `row = hash0 >> (64 - lg_k)` groups rows as `lg_k` shrinks by one.
fn fold_to_lg_k(mut matrix: Vec<u64>, from_lg_k: u8, to_lg_k: u8) -> Vec<u64> {
    debug_assert!(to_lg_k <= from_lg_k);
    let mut current_lg_k = from_lg_k;
    while current_lg_k > to_lg_k {
        let half = matrix.len() / 2;
        let mut folded = vec![0u64; half];
        for i in 0..half {
            folded[i] = matrix[2 * i] | matrix[2 * i + 1];
        }
        matrix = folded;
        current_lg_k -= 1;
    }
    matrix
}

fn sketch_from_matrix(matrix: &[u64], lg_k: u8, seed: u64) -> CpcSketch {
    let k = matrix.len();
    let num_coupons: u64 = matrix.iter().map(|row| row.count_ones() as u64).sum();
    let window_offset = determine_correct_offset(num_coupons, lg_k);
    let flavor = flavor_of(num_coupons, lg_k);
    let needs_window = matches!(flavor, Flavor::Pinned | Flavor::Sliding);

    let mut table = PairTable::new(2.min(lg_k), lg_k + 6);
    let mut window = if needs_window {
        Some(vec![0u8; k])
    } else {
        None
    };

    for (row, &bits) in matrix.iter().enumerate() {
        let mut remaining = bits;
        while remaining != 0 {
            let col = remaining.trailing_zeros() as u8;
            remaining &= remaining - 1;

            if let Some(win) = window.as_mut() {
                if col >= window_offset && col < window_offset + 8 {
                    win[row] |= 1 << (col - window_offset);
                    continue;
                }
            }
            table.maybe_insert(((row as u32) << 6) | col as u32);
        }
    }

    let first_interesting_column = first_interesting_column_of(&table, window_offset);

    CpcSketch::from_parts(
        lg_k,
        seed,
        num_coupons as u32,
        window_offset,
        window,
        table,
        0.0,
        0.0,
        0.0,
        first_interesting_column,
        true,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merging_one_sketch_preserves_its_coupon_count() {
        let mut src = CpcSketch::new(10).unwrap();
        for i in 0..300u64 {
            src.update(&i);
        }
        let mut union = CpcUnion::new(10).unwrap();
        union.update(&src);
        let merged = union.to_sketch();
        assert_eq!(merged.num_coupons(), src.num_coupons());
        assert!(merged.merge_flag());
        assert!(merged.hip_estimate().is_err());
    }

    #[test]
    fn merging_disjoint_streams_is_close_to_their_union() {
        let lg_k = 10u8;
        let k = 1u64 << lg_k;
        let mut a = CpcSketch::new(lg_k).unwrap();
        let mut b = CpcSketch::new(lg_k).unwrap();
        for i in 0..(k / 3) {
            a.update(&i);
        }
        for i in (k / 3)..(2 * k / 3) {
            b.update(&i);
        }

        let mut union = CpcUnion::new(lg_k).unwrap();
        union.update(&a);
        union.update(&b);
        let merged = union.to_sketch();

        let mut direct = CpcSketch::new(lg_k).unwrap();
        for i in 0..(2 * k / 3) {
            direct.update(&i);
        }

        assert_eq!(merged.bit_matrix(), direct.bit_matrix());
        assert_eq!(merged.num_coupons(), direct.num_coupons());
    }

    #[test]
    fn merging_a_smaller_lg_k_source_downgrades_the_accumulator() {
        let lg_k_union = 11u8;
        let lg_k_a = lg_k_union;
        let lg_k_b = 9u8;
        let k_b = 1u64 << lg_k_b;

        let mut a = CpcSketch::new(lg_k_a).unwrap();
        for i in 0..(5 * k_b) {
            a.update(&i);
        }
        let mut b = CpcSketch::new(lg_k_b).unwrap();
        for i in 0..(5 * k_b) {
            b.update(&(i + 1_000_000));
        }

        let mut union = CpcUnion::new(lg_k_union).unwrap();
        union.update(&a);
        union.update(&b);
        let merged = union.to_sketch();

        assert_eq!(merged.lg_k(), lg_k_b);
    }

    #[test]
    fn first_interesting_column_lags_direct_sketch_by_at_most_two() {
        let lg_k = 9u8;
        let k = 1u64 << lg_k;
        let mut a = CpcSketch::new(lg_k).unwrap();
        let mut b = CpcSketch::new(lg_k).unwrap();
        for i in 0..(5 * k) {
            a.update(&i);
        }
        for i in (5 * k)..(10 * k) {
            b.update(&i);
        }

        let mut union = CpcUnion::new(lg_k).unwrap();
        union.update(&a);
        union.update(&b);
        let merged = union.to_sketch();

        let mut direct = CpcSketch::new(lg_k).unwrap();
        for i in 0..(10 * k) {
            direct.update(&i);
        }

        let lag = merged
            .first_interesting_column()
            .saturating_sub(direct.first_interesting_column());
        assert!(lag <= 2, "lag was {lag}");
    }

    #[test]
    fn fold_to_lg_k_or_reduces_adjacent_pairs() {
        let matrix = vec![0b01u64, 0b10u64, 0b100u64, 0b1000u64];
        let folded = fold_to_lg_k(matrix, 2, 1);
        assert_eq!(folded, vec![0b11, 0b1100]);
    }
}
