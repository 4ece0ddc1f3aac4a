// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of GridArb.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

use std::collections::HashSet;

use gridarb_types::{DeviceType, HorizonPrices};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::switching::{SwitchVars, SwitchingPolicy, add_switching_constraints};
use crate::coefficients::horizon_length;
use crate::error::{OptimizeError, OptimizeResult, check_non_negative};
use crate::model::{IntegerProgram, VarId};
use crate::normalizer::check_params;

/// Single-site dispatch over a forecast horizon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynamicDispatchRequest {
    pub devices: Vec<DeviceType>,
    /// Site power ceiling (W), applied per interval
    pub power_cap_w: f64,
    pub prices: HorizonPrices,
    #[serde(default)]
    pub switching: SwitchingPolicy,
}

/// Built dynamic model with its variable layout
#[derive(Debug, Clone)]
pub struct DynamicModel {
    pub program: IntegerProgram,
    pub device_ids: Vec<String>,
    /// `x[d][t]`
    pub x: Vec<Vec<VarId>>,
    pub switches: SwitchVars,
    pub horizon_length: usize,
}

/// Build the dynamic single-site program.
///
/// Variables `x[d,t]` in `[0, fleet_cap[d]]`, objective
/// `Σ (hash_yield*h[t] + token_yield*g[t] - power*e[t]) * x[d,t]`, one power row per
/// interval and the downtime rows of the chosen switching policy.
pub fn build_dynamic(request: &DynamicDispatchRequest) -> OptimizeResult<DynamicModel> {
    let horizon = horizon_length(&request.prices)?;
    check_non_negative("site power cap", "site", request.power_cap_w)?;

    if request.devices.is_empty() {
        return Err(OptimizeError::Configuration(
            "no device types to dispatch".to_owned(),
        ));
    }
    let mut seen = HashSet::new();
    for device in &request.devices {
        if !seen.insert(device.id.as_str()) {
            return Err(OptimizeError::DuplicateKey {
                kind: "device",
                key: device.id.clone(),
            });
        }
        check_params(&device.id, &device.params())?;
    }

    let prices = &request.prices;
    let mut program = IntegerProgram::new();
    let mut x = Vec::with_capacity(request.devices.len());

    for device in &request.devices {
        let params = device.params();
        let series: Vec<VarId> = (0..horizon)
            .map(|t| {
                let var = program.add_integer(
                    format!("x[{},{t}]", device.id),
                    0.0,
                    f64::from(device.fleet_cap),
                );
                let margin = params.unit_margin(prices.hash[t], prices.token[t], prices.energy[t]);
                program.add_objective_term(var, margin);
                var
            })
            .collect();
        x.push(series);
    }

    for t in 0..horizon {
        let terms = request
            .devices
            .iter()
            .zip(&x)
            .map(|(device, series)| (series[t], device.power_w))
            .collect();
        program.add_leq(format!("power_cap[{t}]"), terms, request.power_cap_w);
    }

    let device_ids: Vec<String> = request.devices.iter().map(|d| d.id.clone()).collect();
    let caps: Vec<u32> = request.devices.iter().map(|d| d.fleet_cap).collect();
    let switches =
        add_switching_constraints(&mut program, &x, &caps, &device_ids, request.switching);

    debug!(
        devices = device_ids.len(),
        horizon,
        vars = program.num_vars(),
        rows = program.num_constraints(),
        policy = ?request.switching,
        "Built dynamic dispatch model"
    );

    Ok(DynamicModel {
        program,
        device_ids,
        x,
        switches,
        horizon_length: horizon,
    })
}
