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

//! The inversion-of-coupon-count (ICON) estimator.
//!
//! Given the number of coupons collected by a sketch, this returns the cardinality `n` whose
//! *expected* coupon count under the sketch's insertion model equals the observed count. The
//! expected-value function is monotone increasing in `n`, so the inversion is done by bisection.

/// The per-column weight used by both the ICON model and the HIP martingale update: column `j`
/// is selected with probability `2^-(j+1)` for `j < 63`, with column 63 absorbing the remaining
/// tail probability mass.
pub(crate) fn column_weight(col: u8) -> f64 {
    if col < 63 {
        2f64.powi(-(col as i32 + 1))
    } else {
        2f64.powi(-63)
    }
}

fn expected_coupons(k: f64, n: f64) -> f64 {
    let mut sum = 0.0;
    for col in 0..64u8 {
        sum += 1.0 - (1.0 - column_weight(col) / k).powf(n);
    }
    k * sum
}

/// Returns the ICON cardinality estimate for a sketch with `lg_k` and `num_coupons`.
pub(crate) fn icon_estimate(lg_k: u8, num_coupons: u32) -> f64 {
    if num_coupons == 0 {
        return 0.0;
    }
    let k = (1u64 << lg_k) as f64;
    let c = num_coupons as f64;

    let mut hi = c.max(1.0);
    while expected_coupons(k, hi) < c {
        hi *= 2.0;
    }
    let mut lo = 0.0f64;
    for _ in 0..64 {
        let mid = 0.5 * (lo + hi);
        if expected_coupons(k, mid) < c {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    0.5 * (lo + hi)
}
