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

//! Hashing primitives shared by every sketch in this crate.

mod murmur3;

pub use self::murmur3::MurmurHash3X64128;

/// The default hash seed used when a caller does not supply one of their own.
///
/// Matches the conventional default seed used across the sketch family so that sketches built
/// with default settings remain compatible with each other.
pub const DEFAULT_UPDATE_SEED: u64 = 9001;

/// Folds a hash seed down to the 16-bit "seed hash" stored in a sketch's preamble.
///
/// Two sketches can only be merged if their seed hashes match; this is a cheap way to catch an
/// attempt to merge sketches built with different, incompatible seeds without storing the full
/// seed in every serialized image.
pub(crate) fn compute_seed_hash(seed: u64) -> u16 {
    let mut hasher = MurmurHash3X64128::with_seed(0);
    std::hash::Hasher::write_u64(&mut hasher, seed);
    let (h1, _) = hasher.finish128();
    let folded = (h1 & 0xffff) as u16;
    if folded == 0 { 1 } else { folded }
}
