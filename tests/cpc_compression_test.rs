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

//! Exercises the Golomb-coded serialized form through the public `serialize`/`deserialize` API,
//! at each of the densities that drive a distinct payload shape (sparse table only, windowed with
//! a surviving table, and windowed with an empty table).

use cpc_sketch::cpc::CpcSketch;

fn round_trips(lg_k: u8, n: u64) {
    let mut sketch = CpcSketch::new(lg_k).unwrap();
    for i in 0..n {
        sketch.update(i);
    }
    let bytes = sketch.serialize();
    let restored = CpcSketch::deserialize(&bytes).unwrap();
    assert_eq!(sketch, restored, "mismatch at lg_k={lg_k}, n={n}");
    assert_eq!(restored.estimate(), sketch.estimate());
}

#[test]
fn empty_sketch_round_trips() {
    round_trips(11, 0);
}

#[test]
fn sparse_table_only_round_trips() {
    let lg_k = 10u8;
    round_trips(lg_k, 10);
}

#[test]
fn hybrid_table_only_round_trips() {
    let lg_k = 10u8;
    let k = 1u64 << lg_k;
    round_trips(lg_k, k / 8);
}

#[test]
fn windowed_with_surviving_table_round_trips() {
    let lg_k = 9u8;
    let k = 1u64 << lg_k;
    round_trips(lg_k, 5 * k);
}

#[test]
fn deeply_windowed_round_trips() {
    let lg_k = 8u8;
    let k = 1u64 << lg_k;
    round_trips(lg_k, 40 * k);
}

#[test]
fn serialized_form_is_smaller_than_a_naive_bitmap_at_moderate_fill() {
    let lg_k = 12u8;
    let k = 1u64 << lg_k;
    let mut sketch = CpcSketch::new(lg_k).unwrap();
    for i in 0..(k / 4) {
        sketch.update(i);
    }
    let bytes = sketch.serialize();
    // A dense k x 64 bitmap would take k * 8 bytes; compressed, sparse data should undercut it
    // by a wide margin at quarter-fill density.
    assert!(
        (bytes.len() as u64) < k * 8,
        "serialized len {} was not smaller than a dense bitmap of {} bytes",
        bytes.len(),
        k * 8
    );
}

#[test]
fn repeated_updates_do_not_change_the_serialized_form() {
    let mut sketch = CpcSketch::new(10).unwrap();
    for i in 0..500u64 {
        sketch.update(i);
    }
    let first = sketch.serialize();
    for i in 0..500u64 {
        sketch.update(i);
    }
    let second = sketch.serialize();
    assert_eq!(first, second);
}
