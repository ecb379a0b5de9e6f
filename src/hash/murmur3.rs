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

use std::hash::Hasher;

/// A 128-bit variant of MurmurHash3, used to derive the `(row, col)` coupon for every value
/// inserted into a sketch.
///
/// This wraps the `mur3` crate's `murmurhash3_x64_128` function behind the standard
/// [`Hasher`] interface so that any [`std::hash::Hash`] value can be hashed with
/// `value.hash(&mut hasher)` before the 128-bit digest is read back with [`finish128`].
///
/// [`finish128`]: MurmurHash3X64128::finish128
#[derive(Debug, Clone)]
pub struct MurmurHash3X64128 {
    seed: u32,
    buffer: Vec<u8>,
}

impl MurmurHash3X64128 {
    /// Creates a hasher seeded with `seed`.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed: seed as u32,
            buffer: Vec::new(),
        }
    }

    /// Consumes the buffered bytes and returns the full 128-bit digest as `(h1, h2)`.
    pub fn finish128(&self) -> (u64, u64) {
        mur3::murmurhash3_x64_128(&self.buffer, self.seed)
    }
}

impl Hasher for MurmurHash3X64128 {
    fn finish(&self) -> u64 {
        self.finish128().0
    }

    fn write(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_known_vectors() {
        let (h1, h2) = mur3::murmurhash3_x64_128(b"The quick brown fox jumps over the lazy dog", 0);
        assert_eq!(h1, 0xe34bbc7bbc071b6c);
        assert_eq!(h2, 0x7a433ca9c49a9347);
    }

    #[test]
    fn same_value_hashes_identically() {
        use std::hash::Hash;

        let mut h1 = MurmurHash3X64128::with_seed(123);
        let mut h2 = MurmurHash3X64128::with_seed(123);
        42i64.hash(&mut h1);
        42i64.hash(&mut h2);
        assert_eq!(h1.finish128(), h2.finish128());
    }

    #[test]
    fn different_seeds_diverge() {
        use std::hash::Hash;

        let mut h1 = MurmurHash3X64128::with_seed(1);
        let mut h2 = MurmurHash3X64128::with_seed(2);
        42i64.hash(&mut h1);
        42i64.hash(&mut h2);
        assert_ne!(h1.finish128(), h2.finish128());
    }
}
