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

//! Result extraction: raw solver values in, integer schedules out.

use gridarb_types::{Allocation, AllocationResult, DeviceSchedule, DispatchResult, SolveStatus};
use tracing::info;

use crate::builder::{DynamicModel, StaticModel};
use crate::error::{OptimizeError, OptimizeResult};
use crate::model::IntegerProgram;
use crate::solver::SolveOutcome;

/// Round every value to the nearest integer and check it against its variable bounds
pub fn round_values(program: &IntegerProgram, values: &[f64]) -> OptimizeResult<Vec<f64>> {
    if values.len() != program.num_vars() {
        return Err(OptimizeError::SolverContract(format!(
            "solver returned {} values for {} variables",
            values.len(),
            program.num_vars()
        )));
    }

    program
        .variables()
        .iter()
        .zip(values)
        .map(|(def, &raw)| {
            let rounded = raw.round();
            if !rounded.is_finite() || rounded < def.lower || rounded > def.upper {
                return Err(OptimizeError::SolverContract(format!(
                    "{} = {raw} outside [{}, {}]",
                    def.name, def.lower, def.upper
                )));
            }
            Ok(rounded)
        })
        .collect()
}

/// Values of a usable outcome, or `None` when the status carries no solution
fn solution_values(outcome: SolveOutcome) -> OptimizeResult<Option<(SolveStatus, Vec<f64>)>> {
    match outcome.status {
        SolveStatus::Optimal | SolveStatus::FeasibleSuboptimal => outcome
            .values
            .map(|values| Some((outcome.status, values)))
            .ok_or_else(|| {
                OptimizeError::SolverContract(format!(
                    "status {} without variable values",
                    outcome.status
                ))
            }),
        SolveStatus::Unbounded => Err(OptimizeError::SolverContract(
            "solver reported an unbounded model; every variable is bounded".to_owned(),
        )),
        SolveStatus::Infeasible | SolveStatus::SolverError => Ok(None),
    }
}

/// Reshape a dynamic-mode outcome into a per-device schedule
pub fn extract_schedule(model: &DynamicModel, outcome: SolveOutcome) -> OptimizeResult<DispatchResult> {
    let Some((status, values)) = solution_values(outcome.clone())? else {
        info!(status = %outcome.status, "Dynamic dispatch produced no schedule");
        return Ok(DispatchResult::without_solution(outcome.status));
    };

    let rounded = round_values(&model.program, &values)?;
    let mut schedule = DeviceSchedule::default();
    for (device, series) in model.device_ids.iter().zip(&model.x) {
        let counts = series.iter().map(|id| rounded[id.index()] as u32).collect();
        schedule.counts.insert(device.clone(), counts);
    }
    let objective = model.program.evaluate_objective(&rounded);

    info!(%status, objective, "Dynamic dispatch solved");
    Ok(DispatchResult {
        status,
        schedule: Some(schedule),
        objective_value: Some(objective),
    })
}

/// Reshape a static-mode outcome into a `(site, device)` allocation
pub fn extract_allocation(model: &StaticModel, outcome: SolveOutcome) -> OptimizeResult<AllocationResult> {
    let Some((status, values)) = solution_values(outcome.clone())? else {
        info!(status = %outcome.status, "Static allocation produced no allocation");
        return Ok(AllocationResult::without_solution(outcome.status));
    };

    let rounded = round_values(&model.program, &values)?;
    let mut allocation = Allocation::default();
    for (s, site) in model.sites().iter().enumerate() {
        for (d, device) in model.devices().iter().enumerate() {
            allocation.set(site, device, rounded[model.x[s][d].index()] as u32);
        }
    }
    let objective = model.program.evaluate_objective(&rounded);

    info!(%status, objective, units = allocation.total_units(), "Static allocation solved");
    Ok(AllocationResult {
        status,
        allocation: Some(allocation),
        objective_value: Some(objective),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn program() -> IntegerProgram {
        let mut program = IntegerProgram::new();
        let a = program.add_integer("x[a]", 0.0, 3.0);
        program.add_objective_term(a, 2.0);
        program
    }

    #[test]
    fn test_rounds_near_integers() {
        let rounded = round_values(&program(), &[2.999_999_7]).unwrap();
        assert_eq!(rounded, vec![3.0]);
        let rounded = round_values(&program(), &[-0.000_001]).unwrap();
        assert_eq!(rounded, vec![0.0]);
    }

    #[test]
    fn test_out_of_bounds_is_contract_error() {
        let err = round_values(&program(), &[4.0]).unwrap_err();
        assert!(matches!(err, OptimizeError::SolverContract(_)));
        assert!(err.to_string().contains("x[a]"));
        assert!(!err.is_configuration());

        assert!(round_values(&program(), &[f64::NAN]).is_err());
        assert!(round_values(&program(), &[]).is_err());
    }

    #[test]
    fn test_solution_values_by_status() {
        let infeasible = SolveOutcome::status_only(SolveStatus::Infeasible);
        assert_eq!(solution_values(infeasible).unwrap(), None);

        let unbounded = SolveOutcome::status_only(SolveStatus::Unbounded);
        assert!(matches!(
            solution_values(unbounded),
            Err(OptimizeError::SolverContract(_))
        ));

        let missing = SolveOutcome::status_only(SolveStatus::Optimal);
        assert!(solution_values(missing).is_err());

        let suboptimal = SolveOutcome::solved(SolveStatus::FeasibleSuboptimal, vec![1.0], 2.0);
        assert_eq!(
            solution_values(suboptimal).unwrap(),
            Some((SolveStatus::FeasibleSuboptimal, vec![1.0]))
        );
    }
}
