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

//! A software library of stochastic streaming algorithms (a.k.a. sketches).
//!
//! This crate currently implements the Compressed Probabilistic Counting (CPC) sketch, a
//! fixed-memory cardinality estimator that transitions through a hybrid sparse/dense
//! representation as it fills, and supports a Golomb-coded compact serialized form plus
//! merging of sketches built with differing `lg_k` parameters.
//!
//! # Example
//!
//! ```
//! # use cpc_sketch::common::NumStdDev;
//! # use cpc_sketch::cpc::CpcSketch;
//! let mut sketch = CpcSketch::new(11).unwrap();
//! for i in 0..10_000u64 {
//!     sketch.update(i);
//! }
//! let estimate = sketch.estimate();
//! assert!(estimate > sketch.lower_bound(NumStdDev::Two));
//! assert!(estimate < sketch.upper_bound(NumStdDev::Two));
//! ```

pub(crate) mod codec;
pub mod common;
pub mod cpc;
pub mod error;
pub mod hash;
