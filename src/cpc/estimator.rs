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

//! Free functions backing the estimate/bound methods on [`crate::cpc::CpcSketch`] and
//! [`crate::cpc::CpcWrapper`].
//!
//! `estimate`/`lower_bound`/`upper_bound` are ICON-based and always defined, even on a sketch
//! produced by a union. The HIP-based counterparts are only meaningful on a sketch that has been
//! fed updates directly, so they are `Result`-wrapped and fail once `merge_flag` is set.

use crate::common::NumStdDev;
use crate::cpc::cpc_confidence;
use crate::cpc::icon_estimator::icon_estimate;
use crate::error::Error;

pub(crate) fn estimate(lg_k: u8, num_coupons: u32) -> f64 {
    icon_estimate(lg_k, num_coupons)
}

pub(crate) fn lower_bound(lg_k: u8, num_coupons: u32, kappa: NumStdDev) -> f64 {
    cpc_confidence::icon_confidence_lb(lg_k, num_coupons, kappa)
}

pub(crate) fn upper_bound(lg_k: u8, num_coupons: u32, kappa: NumStdDev) -> f64 {
    cpc_confidence::icon_confidence_ub(lg_k, num_coupons, kappa)
}

pub(crate) fn hip_estimate(merge_flag: bool, hip_est_accum: f64) -> Result<f64, Error> {
    if merge_flag {
        Err(Error::merged_sketch_hip_undefined())
    } else {
        Ok(hip_est_accum)
    }
}

pub(crate) fn hip_lower_bound(
    merge_flag: bool,
    lg_k: u8,
    num_coupons: u32,
    hip_est_accum: f64,
    kappa: NumStdDev,
) -> Result<f64, Error> {
    if merge_flag {
        return Err(Error::merged_sketch_hip_undefined());
    }
    Ok(cpc_confidence::hip_confidence_lb(
        lg_k,
        num_coupons,
        hip_est_accum,
        kappa,
    ))
}

pub(crate) fn hip_upper_bound(
    merge_flag: bool,
    lg_k: u8,
    num_coupons: u32,
    hip_est_accum: f64,
    kappa: NumStdDev,
) -> Result<f64, Error> {
    if merge_flag {
        return Err(Error::merged_sketch_hip_undefined());
    }
    Ok(cpc_confidence::hip_confidence_ub(
        lg_k,
        num_coupons,
        hip_est_accum,
        kappa,
    ))
}
