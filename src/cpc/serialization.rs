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

//! Binary framing for [`CpcSketch::serialize`]/[`CpcSketch::deserialize`].
//!
//! Layout: `preamble_ints, serial_version, family_id, lg_k, first_interesting_column, flags,
//! seed_hash` (8 bytes, always present), followed by `num_coupons` (unless the sketch is empty),
//! `kxp`/`hip_est_accum` (iff the HIP flag is set), and then the compressed window and/or
//! surprising-value payloads (each: a base-bit count, an item count, a word count, and the word
//! buffer itself), each present iff its corresponding flag is set.

use crate::codec::assert;
use crate::codec::family::Family;
use crate::codec::{SketchBytes, SketchSlice};
use crate::cpc::pair_table::{introspective_insertion_sort, PairTable};
use crate::cpc::sketch::CpcSketch;
use crate::cpc::{compression, determine_correct_offset};
use crate::error::Error;
use crate::hash::{compute_seed_hash, DEFAULT_UPDATE_SEED};

pub(crate) const SERIAL_VERSION: u8 = 1;

const FLAG_COMPRESSED: u8 = 1 << 0;
const FLAG_HAS_HIP: u8 = 1 << 1;
const FLAG_HAS_TABLE: u8 = 1 << 2;
const FLAG_HAS_WINDOW: u8 = 1 << 3;

fn make_flags(has_hip: bool, has_table: bool, has_window: bool) -> u8 {
    let mut flags = FLAG_COMPRESSED;
    if has_hip {
        flags |= FLAG_HAS_HIP;
    }
    if has_table {
        flags |= FLAG_HAS_TABLE;
    }
    if has_window {
        flags |= FLAG_HAS_WINDOW;
    }
    flags
}

/// The preamble is 1 int (just the fixed 8-byte header) when the sketch is empty, and 2 ints
/// once any variable-length payload follows.
fn make_preamble_ints(is_empty: bool) -> u8 {
    if is_empty {
        1
    } else {
        2
    }
}

pub(crate) fn write(sketch: &CpcSketch, bytes: &mut SketchBytes) {
    let is_empty = sketch.is_empty();
    let has_hip = !sketch.merge_flag();
    let has_table = !sketch.table().is_empty();
    let has_window = sketch.sliding_window().is_some();

    bytes.write_u8(make_preamble_ints(is_empty));
    bytes.write_u8(SERIAL_VERSION);
    bytes.write_u8(Family::CPC.id);
    bytes.write_u8(sketch.lg_k());
    bytes.write_u8(sketch.first_interesting_column());
    bytes.write_u8(make_flags(has_hip, has_table, has_window));
    bytes.write_u16_le(compute_seed_hash(sketch.seed()));

    if is_empty {
        return;
    }

    bytes.write_u32_le(sketch.num_coupons());

    if has_hip {
        bytes.write_f64_le(sketch.kxp());
        bytes.write_f64_le(sketch.hip_est_accum());
    }

    if has_window {
        let (num_base_bits, words, num_pairs) =
            compression::compress_window(sketch.sliding_window().unwrap(), sketch.lg_k());
        bytes.write_u8(num_base_bits);
        bytes.write_u32_le(num_pairs);
        bytes.write_u32_le(words.len() as u32);
        for word in &words {
            bytes.write_u32_le(*word);
        }
    }

    if has_table {
        let mut items = sketch.table().unwrapping_get_items();
        introspective_insertion_sort(&mut items);
        let (num_base_bits, words) = compression::compress_surprising_values(&items, sketch.lg_k());
        bytes.write_u8(num_base_bits);
        bytes.write_u32_le(items.len() as u32);
        bytes.write_u32_le(words.len() as u32);
        for word in &words {
            bytes.write_u32_le(*word);
        }
    }
}

pub(crate) fn read(buf: &[u8]) -> Result<CpcSketch, Error> {
    let mut slice = SketchSlice::new(buf);

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
    let first_interesting_column = slice
        .read_u8()
        .map_err(assert::insufficient_data("first_interesting_column"))?;
    let flags = slice.read_u8().map_err(assert::insufficient_data("flags"))?;
    let _seed_hash = slice
        .read_u16_le()
        .map_err(assert::insufficient_data("seed_hash"))?;

    if flags & FLAG_COMPRESSED == 0 {
        return Err(Error::compression_state_mismatch(
            "only compressed sketches are supported",
        ));
    }

    if preamble_ints == 1 {
        return CpcSketch::new(lg_k);
    }

    let num_coupons = slice
        .read_u32_le()
        .map_err(assert::insufficient_data("num_coupons"))?;

    let has_hip = flags & FLAG_HAS_HIP != 0;
    let has_table = flags & FLAG_HAS_TABLE != 0;
    let has_window = flags & FLAG_HAS_WINDOW != 0;

    let (kxp, hip_est_accum) = if has_hip {
        let kxp = slice
            .read_f64_le()
            .map_err(assert::insufficient_data("kxp"))?;
        let hip_est_accum = slice
            .read_f64_le()
            .map_err(assert::insufficient_data("hip_est_accum"))?;
        (kxp, hip_est_accum)
    } else {
        (0.0, 0.0)
    };

    let sliding_window = if has_window {
        let num_base_bits = slice
            .read_u8()
            .map_err(assert::insufficient_data("window_base_bits"))?;
        let num_pairs = slice
            .read_u32_le()
            .map_err(assert::insufficient_data("window_num_pairs"))?;
        let num_words = slice
            .read_u32_le()
            .map_err(assert::insufficient_data("window_num_words"))?;
        let words = slice
            .read_u32_le_vec(num_words as usize)
            .map_err(assert::insufficient_data("window_words"))?;
        Some(compression::decompress_window(
            &words,
            num_base_bits,
            num_pairs,
            lg_k,
        ))
    } else {
        None
    };

    let table = if has_table {
        let num_base_bits = slice
            .read_u8()
            .map_err(assert::insufficient_data("table_base_bits"))?;
        let num_items = slice
            .read_u32_le()
            .map_err(assert::insufficient_data("table_num_items"))?;
        let num_words = slice
            .read_u32_le()
            .map_err(assert::insufficient_data("table_num_words"))?;
        let words = slice
            .read_u32_le_vec(num_words as usize)
            .map_err(assert::insufficient_data("table_words"))?;
        let items = compression::decompress_surprising_values(&words, num_base_bits, num_items);
        PairTable::from_slots(lg_k + 6, num_items, &items)
    } else {
        PairTable::new(2.min(lg_k), lg_k + 6)
    };

    let merge_flag = !has_hip;
    let window_offset = determine_correct_offset(num_coupons as u64, lg_k);

    Ok(CpcSketch::from_parts(
        lg_k,
        DEFAULT_UPDATE_SEED,
        num_coupons,
        window_offset,
        sliding_window,
        table,
        kxp,
        hip_est_accum,
        0.0,
        first_interesting_column,
        merge_flag,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preamble_ints_matches_emptiness() {
        assert_eq!(make_preamble_ints(true), 1);
        assert_eq!(make_preamble_ints(false), 2);
    }

    #[test]
    fn flags_round_trip_through_bit_positions() {
        let flags = make_flags(true, true, true);
        assert_ne!(flags & FLAG_COMPRESSED, 0);
        assert_ne!(flags & FLAG_HAS_HIP, 0);
        assert_ne!(flags & FLAG_HAS_TABLE, 0);
        assert_ne!(flags & FLAG_HAS_WINDOW, 0);

        let flags = make_flags(false, false, false);
        assert_ne!(flags & FLAG_COMPRESSED, 0);
        assert_eq!(flags & FLAG_HAS_HIP, 0);
        assert_eq!(flags & FLAG_HAS_TABLE, 0);
        assert_eq!(flags & FLAG_HAS_WINDOW, 0);
    }

    #[test]
    fn rejects_truncated_bytes() {
        let err = read(&[2]).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::MalformedDeserializeData);
    }

    #[test]
    fn rejects_wrong_family_id() {
        let bytes = [2u8, SERIAL_VERSION, 0xFF, 10, 0, 0, 0, 0];
        let err = read(&bytes).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::MalformedDeserializeData);
    }

    #[test]
    fn rejects_buffer_with_compressed_flag_cleared() {
        let sketch = CpcSketch::new(10).unwrap();
        let mut bytes = sketch.serialize();
        bytes[5] &= !FLAG_COMPRESSED;
        let err = read(&bytes).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::CompressionStateMismatch);
    }
}
