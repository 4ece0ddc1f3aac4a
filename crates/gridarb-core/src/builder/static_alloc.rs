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

use std::collections::BTreeMap;

use gridarb_types::DeviceParams;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::coefficients::{CoefficientTable, aggregate};
use crate::error::{OptimizeError, OptimizeResult, check_finite, check_non_negative};
use crate::model::{IntegerProgram, VarId};
use crate::normalizer::check_params;
use crate::table::ParamTable;

/// Multi-site allocation held constant over the horizon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticAllocationRequest {
    pub sites: Vec<String>,
    pub devices: Vec<String>,
    pub horizon_length: usize,
    /// `site -> device -> params`; every `(site, device)` must be present
    pub device_params: BTreeMap<String, BTreeMap<String, DeviceParams>>,
    /// `site -> energy price per interval`
    pub energy_prices: BTreeMap<String, Vec<f64>>,
    pub hash_prices: Vec<f64>,
    pub token_prices: Vec<f64>,
    /// `site -> power ceiling (W)`
    pub power_caps: BTreeMap<String, f64>,
    /// Global cap on energy spend over the horizon; no row when absent
    #[serde(default)]
    pub energy_budget: Option<f64>,
}

/// Built static model with its variable layout
#[derive(Debug, Clone)]
pub struct StaticModel {
    pub program: IntegerProgram,
    pub table: ParamTable,
    pub coefficients: CoefficientTable,
    /// `x[s][d]`
    pub x: Vec<Vec<VarId>>,
}

impl StaticModel {
    pub fn sites(&self) -> &[String] {
        self.table.sites()
    }

    pub fn devices(&self) -> &[String] {
        self.table.devices()
    }
}

/// Build the static multi-site program.
///
/// Variables `x[s,d]` in `[0, fleet_cap[s][d]]`, objective `Σ profit[s,d] * x[s,d]`,
/// one power row per site and one energy-budget row when a budget is given.
pub fn build_static(request: &StaticAllocationRequest) -> OptimizeResult<StaticModel> {
    if request.sites.is_empty() {
        return Err(OptimizeError::Configuration("no sites to allocate".to_owned()));
    }
    if request.devices.is_empty() {
        return Err(OptimizeError::Configuration(
            "no device types to allocate".to_owned(),
        ));
    }

    let table = ParamTable::from_nested(&request.sites, &request.devices, &request.device_params)?;
    for (site, device, params) in table.iter() {
        check_params(&format!("{site}/{device}"), params)?;
    }

    let coefficients = aggregate(
        &table,
        request.horizon_length,
        &request.hash_prices,
        &request.token_prices,
        &request.energy_prices,
    )?;

    let mut caps = Vec::with_capacity(request.sites.len());
    for site in &request.sites {
        let cap = request
            .power_caps
            .get(site)
            .copied()
            .ok_or_else(|| OptimizeError::missing("power cap", site))?;
        check_non_negative("site power cap", site, cap)?;
        caps.push(cap);
    }
    if let Some(budget) = request.energy_budget {
        check_finite("energy budget", "global", budget)?;
    }

    let mut program = IntegerProgram::new();
    let mut x = Vec::with_capacity(request.sites.len());
    for (s, site) in table.sites().iter().enumerate() {
        let row: Vec<VarId> = table
            .devices()
            .iter()
            .enumerate()
            .map(|(d, device)| {
                let params = table.at(s, d);
                let var = program.add_integer(
                    format!("x[{site},{device}]"),
                    0.0,
                    f64::from(params.fleet_cap),
                );
                program.add_objective_term(var, coefficients.profit(s, d));
                var
            })
            .collect();
        x.push(row);
    }

    for (s, site) in table.sites().iter().enumerate() {
        let terms = x[s]
            .iter()
            .enumerate()
            .map(|(d, &var)| (var, table.at(s, d).power_w))
            .collect();
        program.add_leq(format!("power_cap[{site}]"), terms, caps[s]);
    }

    if let Some(budget) = request.energy_budget {
        let mut terms = Vec::with_capacity(program.num_vars());
        for (s, row) in x.iter().enumerate() {
            for (d, &var) in row.iter().enumerate() {
                terms.push((var, coefficients.energy(s, d)));
            }
        }
        program.add_leq("energy_budget", terms, budget);
    }

    debug!(
        sites = request.sites.len(),
        devices = request.devices.len(),
        horizon = request.horizon_length,
        vars = program.num_vars(),
        rows = program.num_constraints(),
        budget = ?request.energy_budget,
        "Built static allocation model"
    );

    Ok(StaticModel {
        program,
        table,
        coefficients,
        x,
    })
}
