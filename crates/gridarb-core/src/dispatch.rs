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

//! Public entry points.
//!
//! Each call validates its request, builds a fresh program, hands it to the injected
//! solver and reshapes the answer. Nothing is shared between calls.

use std::collections::BTreeMap;

use gridarb_types::{
    Allocation, AllocationResult, AllocationSummary, DispatchResult, PriceSnapshot, SiteRecord,
};
use tracing::info;

use crate::builder::{DynamicDispatchRequest, StaticAllocationRequest, build_dynamic, build_static};
use crate::error::OptimizeResult;
use crate::extract::{extract_allocation, extract_schedule};
use crate::normalizer::normalize;
use crate::solver::{SolveOptions, SolverBackend};

/// Schedule one site's devices across the horizon with switching downtime
pub fn optimize_dynamic_dispatch(
    request: &DynamicDispatchRequest,
    solver: &dyn SolverBackend,
    options: &SolveOptions,
) -> OptimizeResult<DispatchResult> {
    let model = build_dynamic(request)?;
    info!(
        solver = solver.name(),
        devices = model.device_ids.len(),
        horizon = model.horizon_length,
        "Solving dynamic dispatch"
    );
    let outcome = solver.solve(&model.program, options);
    extract_schedule(&model, outcome)
}

/// Choose one unit count per `(site, device)` for the whole horizon
pub fn optimize_static_allocation(
    request: &StaticAllocationRequest,
    solver: &dyn SolverBackend,
    options: &SolveOptions,
) -> OptimizeResult<AllocationResult> {
    let model = build_static(request)?;
    info!(
        solver = solver.name(),
        sites = model.sites().len(),
        devices = model.devices().len(),
        horizon = request.horizon_length,
        "Solving static allocation"
    );
    let outcome = solver.solve(&model.program, options);
    extract_allocation(&model, outcome)
}

/// Best fixed configuration of one site over a short window of price snapshots.
///
/// Only the site power cap applies; there is no energy budget.
pub fn optimize_site_window(
    site: &SiteRecord,
    snapshots: &[PriceSnapshot],
    solver: &dyn SolverBackend,
    options: &SolveOptions,
) -> OptimizeResult<AllocationResult> {
    let catalog = normalize(std::slice::from_ref(site))?;
    let energy = BTreeMap::from([(
        site.site_id.clone(),
        snapshots.iter().map(|s| s.energy_price).collect(),
    )]);
    let request = catalog.static_request(
        snapshots.iter().map(|s| s.hash_price).collect(),
        snapshots.iter().map(|s| s.token_price).collect(),
        &energy,
        None,
    )?;
    optimize_static_allocation(&request, solver, options)
}

/// Profit, unit and power digest of an allocation under a request's prices
pub fn summarize_allocation(
    request: &StaticAllocationRequest,
    allocation: &Allocation,
) -> OptimizeResult<AllocationSummary> {
    let model = build_static(request)?;
    let mut summary = AllocationSummary::default();

    for (s, site) in model.sites().iter().enumerate() {
        let mut site_power = 0.0;
        for (d, device) in model.devices().iter().enumerate() {
            let count = allocation.get(site, device);
            let units = f64::from(count);
            summary.total_profit += model.coefficients.profit(s, d) * units;
            summary.total_energy_cost += model.coefficients.energy(s, d) * units;
            site_power += model.table.at(s, d).power_w * units;
            *summary
                .per_device_counts
                .entry(device.clone())
                .or_default() += u64::from(count);
        }
        summary.per_site_power_w.insert(site.clone(), site_power);
    }

    Ok(summary)
}

/// Write chosen unit counts back into catalog records as `optimal_machines`
pub fn annotate_site_records(records: &mut [SiteRecord], allocation: &Allocation) {
    for record in records {
        let site = record.site_id.clone();
        for (kind, miner) in &mut record.miners {
            miner.optimal_machines = Some(allocation.get(&site, kind));
        }
        for (kind, accel) in &mut record.inference {
            accel.optimal_machines = Some(allocation.get(&site, kind));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_annotate_writes_every_kind() {
        let mut records = vec![
            SiteRecord::new("TX", 1000.0)
                .with_miner("air", 4, 1.0, 10.0)
                .with_inference("gpu", 2, 1.0, 10.0),
        ];
        let mut allocation = Allocation::default();
        allocation.set("TX", "air", 3);

        annotate_site_records(&mut records, &allocation);
        assert_eq!(records[0].miners["air"].optimal_machines, Some(3));
        assert_eq!(records[0].inference["gpu"].optimal_machines, Some(0));
    }
}
