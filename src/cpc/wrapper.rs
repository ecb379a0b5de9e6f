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

//! A read-only, allocation-light view over a serialized CPC sketch.

use crate::codec::assert;
use crate::codec::family::Family;
use crate::codec::SketchSlice;
use crate::common::NumStdDev;
use crate::cpc::estimator;
use crate::cpc::serialization::SERIAL_VERSION;
use crate::error::Error;

/// A view over a serialized [`crate::cpc::CpcSketch`] that can answer estimate and
/// confidence-bound queries without reconstructing the sketch's sparse table or sliding window.
#[derive(Debug, Clone, Copy)]
pub struct CpcWrapper {
    lg_k: u8,
    num_coupons: u32,
    merge_flag: bool,
    hip_est_accum: f64,
}

impl CpcWrapper {
    /// Parses just enough of a serialized sketch's header to answer estimate queries.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::ErrorKind::MalformedDeserializeData`] if `bytes` is truncated, has
    /// an unsupported serial version, or does not carry the CPC family id.
    pub fn new(bytes: &[u8]) -> Result<Self, Error> {
        let mut slice = SketchSlice::new(bytes);

        let preamble_ints = slice
            .read_u8()
            .map_err(assert::insufficient_data("preamble_ints"))?;
        assert::ensure_preamble_ints_in(&[1, 2], preamble_ints)?;

        let serial_version = slice
            .read_u8()
            .map_err(assert::insufficient_data("serial_version"))?;
        assert::ensure_serial_version_is(SERIAL_VERSION, serial_version)?;

        let family_id = slice
            .read_u8()
            .map_err(assert::insufficient_data("family_id"))?;
        Family::CPC.validate_id(family_id)?;

        let lg_k = slice.read_u8().map_err(assert::insufficient_data("lg_k"))?;
        let _first_interesting_column = slice
            .read_u8()
            .map_err(assert::insufficient_data("first_interesting_column"))?;
        let flags = slice.read_u8().map_err(assert::insufficient_data("flags"))?;
        let _seed_hash = slice
            .read_u16_le()
            .map_err(assert::insufficient_data("seed_hash"))?;

        const FLAG_COMPRESSED: u8 = 1 << 0;
        if flags & FLAG_COMPRESSED == 0 {
            return Err(Error::compression_state_mismatch(
                "only compressed sketches are supported",
            ));
        }

        if preamble_ints == 1 {
            return Ok(Self {
                lg_k,
                num_coupons: 0,
                merge_flag: false,
                hip_est_accum: 0.0,
            });
        }

        let num_coupons = slice
            .read_u32_le()
            .map_err(assert::insufficient_data("num_coupons"))?;

        const FLAG_HAS_HIP: u8 = 1 << 1;
        let has_hip = flags & FLAG_HAS_HIP != 0;
        let hip_est_accum = if has_hip {
            let kxp = slice
                .read_f64_le()
                .map_err(assert::insufficient_data("kxp"))?;
            let _ = kxp;
            slice
                .read_f64_le()
                .map_err(assert::insufficient_data("hip_est_accum"))?
        } else {
            0.0
        };

        Ok(Self {
            lg_k,
            num_coupons,
            merge_flag: !has_hip,
            hip_est_accum,
        })
    }

    /// Returns `true` if the wrapped sketch has never accepted an item.
    pub fn is_empty(&self) -> bool {
        self.num_coupons == 0
    }

    /// Returns the wrapped sketch's `lg_k`.
    pub fn lg_k(&self) -> u8 {
        self.lg_k
    }

    /// Returns the ICON-based cardinality estimate.
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

    /// Returns the HIP-based cardinality estimate.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::ErrorKind::MergedSketchHipUndefined`] if the wrapped sketch was
    /// produced by a union.
    pub fn hip_estimate(&self) -> Result<f64, Error> {
        estimator::hip_estimate(self.merge_flag, self.hip_est_accum)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpc::CpcSketch;

    #[test]
    fn wraps_an_empty_sketch() {
        let sketch = CpcSketch::new(10).unwrap();
        let wrapper = CpcWrapper::new(&sketch.serialize()).unwrap();
        assert!(wrapper.is_empty());
        assert_eq!(wrapper.estimate(), 0.0);
    }

    #[test]
    fn matches_the_owned_sketch_estimate() {
        let mut sketch = CpcSketch::new(11).unwrap();
        for i in 0..2000u64 {
            sketch.update(&i);
        }
        let wrapper = CpcWrapper::new(&sketch.serialize()).unwrap();
        assert_eq!(wrapper.lg_k(), sketch.lg_k());
        assert_eq!(wrapper.estimate(), sketch.estimate());
        assert_eq!(wrapper.hip_estimate().unwrap(), sketch.hip_estimate().unwrap());
    }

    #[test]
    fn rejects_malformed_bytes() {
        assert!(CpcWrapper::new(&[]).is_err());
        assert!(CpcWrapper::new(&[9, 9, 9, 9]).is_err());
    }

    #[test]
    fn rejects_an_uncompressed_buffer() {
        let sketch = CpcSketch::new(10).unwrap();
        let mut bytes = sketch.serialize();
        bytes[5] &= !1; // clear the compressed flag
        let err = CpcWrapper::new(&bytes).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::CompressionStateMismatch);
    }
}
