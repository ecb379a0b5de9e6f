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

use cpc_sketch::common::NumStdDev;
use cpc_sketch::cpc::CpcSketch;
use googletest::assert_that;
use googletest::prelude::ge;
use googletest::prelude::le;
use googletest::prelude::near;

const RELATIVE_ERROR_FOR_LG_K_12: f64 = 0.05;

#[test]
fn test_empty() {
    let sketch = CpcSketch::new(4).unwrap();
    assert!(sketch.is_empty());
    assert_eq!(sketch.estimate(), 0.0);
    assert_eq!(sketch.lower_bound(NumStdDev::One), 0.0);
    assert_eq!(sketch.upper_bound(NumStdDev::One), 0.0);
    assert!(sketch.hip_estimate().unwrap() == 0.0);
}

#[test]
fn test_rejects_out_of_range_lg_k() {
    assert!(CpcSketch::new(3).is_err());
    assert!(CpcSketch::new(27).is_err());
}

#[test]
fn test_one_value() {
    let mut sketch = CpcSketch::new(10).unwrap();
    sketch.update(1);
    assert!(!sketch.is_empty());
    assert_that!(sketch.estimate(), ge(sketch.lower_bound(NumStdDev::Two)));
    assert_that!(sketch.estimate(), le(sketch.upper_bound(NumStdDev::Two)));
    assert_that!(sketch.upper_bound(NumStdDev::Two), ge(1.0));
}

#[test]
fn test_many_values() {
    const N: usize = 1000;
    const N_F64: f64 = N as f64;

    let mut sketch = CpcSketch::new(12).unwrap();
    for i in 0..N {
        sketch.update(i);
    }
    assert!(!sketch.is_empty());
    assert_that!(
        sketch.estimate(),
        near(N_F64, RELATIVE_ERROR_FOR_LG_K_12 * N_F64)
    );
    assert_that!(sketch.estimate(), ge(sketch.lower_bound(NumStdDev::Three)));
    assert_that!(sketch.estimate(), le(sketch.upper_bound(NumStdDev::Three)));
}

#[test]
fn test_repeated_update_is_idempotent() {
    let mut sketch = CpcSketch::new(8).unwrap();
    for _ in 0..100 {
        sketch.update("the same value every time");
    }
    assert_eq!(sketch.estimate(), sketch.estimate());
    let mut single = CpcSketch::new(8).unwrap();
    single.update("the same value every time");
    assert_eq!(sketch.hip_estimate().unwrap(), single.hip_estimate().unwrap());
}

#[test]
fn test_crosses_into_windowed_representation() {
    let lg_k = 8u8;
    let k = 1u64 << lg_k;
    let mut sketch = CpcSketch::new(lg_k).unwrap();
    for i in 0..(10 * k) {
        sketch.update(i);
    }
    assert!(!sketch.is_empty());
    assert_that!(
        sketch.estimate(),
        near((10 * k) as f64, 0.1 * (10 * k) as f64)
    );
}

#[test]
fn test_serialize_deserialize_round_trip() {
    let mut sketch = CpcSketch::new(11).unwrap();
    for i in 0..2000u64 {
        sketch.update(i);
    }
    let bytes = sketch.serialize();
    let restored = CpcSketch::deserialize(&bytes).unwrap();
    assert_eq!(restored.estimate(), sketch.estimate());
    assert_eq!(restored.lg_k(), sketch.lg_k());
}
