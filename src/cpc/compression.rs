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

//! Golomb-coded compression of the sliding window and the surprising-value table.
//!
//! Both payloads are sorted ascending and delta-coded: each successive value's difference from
//! the previous one is written as a Golomb code (a unary quotient followed by a fixed-width
//! remainder) with a base-bit count chosen from the payload's density against `k`. This crate
//! uses the same primitive for both payloads rather than the length-limited Huffman-style window
//! code of the reference family, a simplification recorded in `DESIGN.md`.

/// Chooses the Golomb parameter (as a power-of-two exponent) for a payload of `num_items`
/// distinct values drawn from a universe of size `k`.
///
/// `floor(log2((k - c) / max(c, 1)))`, clamped to 0 whenever the ratio is not at least 1 (in
/// particular whenever `c >= k`).
pub(crate) fn golomb_choose_number_of_base_bits(num_items: u32, k: u64) -> u8 {
    let c = num_items as u64;
    if k <= c {
        return 0;
    }
    let diff = k - c;
    let denom = c.max(1);
    let ratio = diff as f64 / denom as f64;
    if ratio < 1.0 {
        0
    } else {
        ratio.log2().floor() as u8
    }
}

struct BitWriter {
    words: Vec<u32>,
    buf: u64,
    bits_in_buf: u32,
}

impl BitWriter {
    fn new() -> Self {
        Self {
            words: Vec::new(),
            buf: 0,
            bits_in_buf: 0,
        }
    }

    fn write_bits(&mut self, value: u64, num_bits: u32) {
        if num_bits == 0 {
            return;
        }
        let mask = if num_bits >= 64 {
            u64::MAX
        } else {
            (1u64 << num_bits) - 1
        };
        self.buf |= (value & mask) << self.bits_in_buf;
        self.bits_in_buf += num_bits;
        while self.bits_in_buf >= 32 {
            self.words.push((self.buf & 0xffff_ffff) as u32);
            self.buf >>= 32;
            self.bits_in_buf -= 32;
        }
    }

    fn write_unary(&mut self, quotient: u32) {
        for _ in 0..quotient {
            self.write_bits(0, 1);
        }
        self.write_bits(1, 1);
    }

    fn finish(mut self) -> Vec<u32> {
        if self.bits_in_buf > 0 {
            self.words.push((self.buf & 0xffff_ffff) as u32);
        }
        self.words
    }
}

struct BitReader<'a> {
    words: &'a [u32],
    word_idx: usize,
    buf: u64,
    bits_in_buf: u32,
}

impl<'a> BitReader<'a> {
    fn new(words: &'a [u32]) -> Self {
        Self {
            words,
            word_idx: 0,
            buf: 0,
            bits_in_buf: 0,
        }
    }

    fn refill(&mut self) {
        while self.bits_in_buf <= 32 && self.word_idx < self.words.len() {
            self.buf |= (self.words[self.word_idx] as u64) << self.bits_in_buf;
            self.bits_in_buf += 32;
            self.word_idx += 1;
        }
    }

    fn read_bits(&mut self, num_bits: u32) -> u64 {
        if num_bits == 0 {
            return 0;
        }
        self.refill();
        let mask = if num_bits >= 64 {
            u64::MAX
        } else {
            (1u64 << num_bits) - 1
        };
        let val = self.buf & mask;
        self.buf >>= num_bits;
        self.bits_in_buf = self.bits_in_buf.saturating_sub(num_bits);
        val
    }

    fn read_unary(&mut self) -> u32 {
        let mut q = 0u32;
        loop {
            if self.read_bits(1) == 1 {
                break;
            }
            q += 1;
        }
        q
    }
}

/// Golomb-compresses an ascending, distinct sequence of 32-bit values into a word buffer.
pub(crate) fn low_level_compress_pairs(sorted_values: &[u32], num_base_bits: u8) -> Vec<u32> {
    let mut writer = BitWriter::new();
    let mut prev = 0u32;
    for &value in sorted_values {
        let delta = value - prev;
        prev = value;
        let quotient = delta >> num_base_bits;
        writer.write_unary(quotient);
        if num_base_bits > 0 {
            let remainder = delta & ((1u32 << num_base_bits) - 1);
            writer.write_bits(remainder as u64, num_base_bits as u32);
        }
    }
    writer.finish()
}

/// Inverts [`low_level_compress_pairs`], reproducing the original ascending sequence bit-identically.
pub(crate) fn low_level_uncompress_pairs(
    words: &[u32],
    num_base_bits: u8,
    num_items: u32,
) -> Vec<u32> {
    let mut reader = BitReader::new(words);
    let mut prev = 0u32;
    let mut out = Vec::with_capacity(num_items as usize);
    for _ in 0..num_items {
        let quotient = reader.read_unary();
        let remainder = if num_base_bits > 0 {
            reader.read_bits(num_base_bits as u32) as u32
        } else {
            0
        };
        let delta = (quotient << num_base_bits) | remainder;
        prev += delta;
        out.push(prev);
    }
    out
}

/// Compresses the sorted surprising-value pairs, returning the chosen base-bit count and the
/// encoded word buffer.
pub(crate) fn compress_surprising_values(sorted_pairs: &[u32], lg_k: u8) -> (u8, Vec<u32>) {
    let k = 1u64 << lg_k;
    let num_base_bits = golomb_choose_number_of_base_bits(sorted_pairs.len() as u32, k);
    let words = low_level_compress_pairs(sorted_pairs, num_base_bits);
    (num_base_bits, words)
}

pub(crate) fn decompress_surprising_values(
    words: &[u32],
    num_base_bits: u8,
    num_items: u32,
) -> Vec<u32> {
    low_level_uncompress_pairs(words, num_base_bits, num_items)
}

/// Flattens a sliding window's set bits into ascending `(row << 3) | bit_position` pairs.
fn window_to_pairs(window: &[u8]) -> Vec<u32> {
    let mut pairs = Vec::new();
    for (row, &byte) in window.iter().enumerate() {
        for bit in 0..8u8 {
            if byte & (1 << bit) != 0 {
                pairs.push(((row as u32) << 3) | bit as u32);
            }
        }
    }
    pairs
}

fn pairs_to_window(pairs: &[u32], k: usize) -> Vec<u8> {
    let mut window = vec![0u8; k];
    for &pair in pairs {
        let row = (pair >> 3) as usize;
        let bit = (pair & 0x7) as u8;
        window[row] |= 1 << bit;
    }
    window
}

/// Compresses a sliding window, returning the chosen base-bit count, the encoded word buffer,
/// and the number of set-bit pairs encoded.
pub(crate) fn compress_window(window: &[u8], lg_k: u8) -> (u8, Vec<u32>, u32) {
    let pairs = window_to_pairs(window);
    let k = 1u64 << lg_k;
    let num_base_bits = golomb_choose_number_of_base_bits(pairs.len() as u32, k);
    let words = low_level_compress_pairs(&pairs, num_base_bits);
    (num_base_bits, words, pairs.len() as u32)
}

pub(crate) fn decompress_window(
    words: &[u32],
    num_base_bits: u8,
    num_pairs: u32,
    lg_k: u8,
) -> Vec<u8> {
    let k = 1usize << lg_k;
    let pairs = low_level_uncompress_pairs(words, num_base_bits, num_pairs);
    pairs_to_window(&pairs, k)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn low_level_round_trips_across_base_bit_widths() {
        let values: Vec<u32> = vec![3, 10, 11, 50, 51, 52, 1000, 1500, 70000];
        for bb in 0..=11u8 {
            let words = low_level_compress_pairs(&values, bb);
            let restored = low_level_uncompress_pairs(&words, bb, values.len() as u32);
            assert_eq!(restored, values, "mismatch at num_base_bits={bb}");
        }
    }

    #[test]
    fn low_level_round_trips_empty_input() {
        let values: Vec<u32> = vec![];
        let words = low_level_compress_pairs(&values, 5);
        let restored = low_level_uncompress_pairs(&words, 5, 0);
        assert_eq!(restored, values);
    }

    #[test]
    fn base_bits_is_zero_when_payload_is_dense() {
        assert_eq!(golomb_choose_number_of_base_bits(2048, 2048), 0);
        assert_eq!(golomb_choose_number_of_base_bits(3000, 2048), 0);
    }

    #[test]
    fn base_bits_grows_with_sparsity() {
        let sparse = golomb_choose_number_of_base_bits(4, 1 << 20);
        let dense = golomb_choose_number_of_base_bits(1 << 18, 1 << 20);
        assert!(sparse > dense);
    }

    #[test]
    fn surprising_values_round_trip() {
        let lg_k = 10u8;
        let mut pairs: Vec<u32> = (0..200u32).map(|i| i * 37 + 5).collect();
        pairs.sort_unstable();
        let (bb, words) = compress_surprising_values(&pairs, lg_k);
        let restored = decompress_surprising_values(&words, bb, pairs.len() as u32);
        assert_eq!(restored, pairs);
    }

    #[test]
    fn window_round_trips() {
        let lg_k = 8u8;
        let k = 1usize << lg_k;
        let mut window = vec![0u8; k];
        for (row, byte) in window.iter_mut().enumerate() {
            if row % 3 == 0 {
                *byte = 0b0010_1001;
            }
        }
        let (bb, words, num_pairs) = compress_window(&window, lg_k);
        let restored = decompress_window(&words, bb, num_pairs, lg_k);
        assert_eq!(restored, window);
    }

    #[test]
    fn empty_window_round_trips() {
        let lg_k = 6u8;
        let k = 1usize << lg_k;
        let window = vec![0u8; k];
        let (bb, words, num_pairs) = compress_window(&window, lg_k);
        assert_eq!(num_pairs, 0);
        let restored = decompress_window(&words, bb, num_pairs, lg_k);
        assert_eq!(restored, window);
    }
}
