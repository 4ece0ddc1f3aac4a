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

use std::time::Duration;

use good_lp::{SolverModel, WithTimeLimit};

use super::{
    SolveOptions, SolveOutcome, SolverBackend, Translated, backstop, collect, run_with_deadline,
    translate,
};
use crate::model::IntegerProgram;

/// Pure-Rust branch-and-bound through `good_lp`'s microlp backend.
///
/// microlp stops at the time limit and hands back its incumbent, reported as
/// `FeasibleSuboptimal`. With no incumbent yet the outcome is `SolverError`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MicroLpSolver;

impl SolverBackend for MicroLpSolver {
    fn name(&self) -> &str {
        "microlp"
    }

    fn solve(&self, program: &IntegerProgram, options: &SolveOptions) -> SolveOutcome {
        let program = program.clone();
        let time_limit = options.time_limit;
        run_with_deadline(&backstop(options), move || solve_blocking(&program, time_limit))
    }
}

fn solve_blocking(program: &IntegerProgram, time_limit: Duration) -> SolveOutcome {
    let Translated {
        vars,
        handles,
        objective,
        rows,
    } = translate(program);

    let mut model = vars
        .maximise(objective)
        .using(good_lp::microlp)
        .with_time_limit(time_limit.as_secs_f64());
    for row in rows {
        model = model.with(row);
    }

    collect("microlp", program, &handles, model.solve())
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use gridarb_types::SolveStatus;

    use super::*;
    use crate::solver::DEADLINE_GRACE;

    #[test]
    fn test_small_knapsack() {
        // max 5a + 4b  s.t. 6a + 4b <= 24, a + 2b <= 6, a,b in [0, 10]
        let mut program = IntegerProgram::new();
        let a = program.add_integer("a", 0.0, 10.0);
        let b = program.add_integer("b", 0.0, 10.0);
        program.add_objective_term(a, 5.0);
        program.add_objective_term(b, 4.0);
        program.add_leq("r1", vec![(a, 6.0), (b, 4.0)], 24.0);
        program.add_leq("r2", vec![(a, 1.0), (b, 2.0)], 6.0);

        let outcome = MicroLpSolver.solve(&program, &SolveOptions::default());
        assert_eq!(outcome.status, SolveStatus::Optimal);
        // LP relaxation peaks at 21 (a=3, b=1.5); best integer point is a=4, b=0
        assert!((outcome.objective_value.unwrap() - 20.0).abs() < 1e-6);
    }

    #[test]
    fn test_infeasible_program() {
        let mut program = IntegerProgram::new();
        let a = program.add_integer("a", 0.0, 10.0);
        program.add_objective_term(a, 1.0);
        program.add_leq("neg", vec![(a, 1.0)], -1.0);

        let outcome = MicroLpSolver.solve(&program, &SolveOptions::default());
        assert_eq!(outcome.status, SolveStatus::Infeasible);
        assert!(outcome.values.is_none());
    }

    // Strongly correlated 0/1 knapsack (value = weight + 10): the relaxation is
    // tight but proving optimality takes far longer than a second.
    fn hard_knapsack(items: usize) -> IntegerProgram {
        let mut program = IntegerProgram::new();
        let mut row = Vec::with_capacity(items);
        let mut total = 0.0;
        for i in 0..items {
            let weight = (20 + (i * 37 + i * i * 11) % 83) as f64;
            let x = program.add_binary(format!("x{i}"));
            program.add_objective_term(x, weight + 10.0);
            row.push((x, weight));
            total += weight;
        }
        program.add_leq("capacity", row, (total / 2.0).floor());
        program
    }

    #[test]
    fn test_time_limit_returns_incumbent() {
        let program = hard_knapsack(70);
        let limit = Duration::from_secs(1);

        let started = Instant::now();
        let outcome = MicroLpSolver.solve(&program, &SolveOptions::with_time_limit(limit));
        let elapsed = started.elapsed();

        assert_eq!(outcome.status, SolveStatus::FeasibleSuboptimal);
        let values = outcome.values.expect("incumbent values");
        assert!(program.is_feasible(&values));
        assert!(outcome.objective_value.unwrap() > 0.0);
        // Stopped by the engine, not by the outer deadline
        assert!(elapsed < limit + DEADLINE_GRACE);
    }

    #[test]
    fn test_zero_time_limit_without_incumbent() {
        let program = hard_knapsack(10);

        let options = SolveOptions::with_time_limit(Duration::ZERO);
        let outcome = MicroLpSolver.solve(&program, &options);
        assert_eq!(outcome.status, SolveStatus::SolverError);
        assert!(outcome.values.is_none());
        assert!(outcome.objective_value.is_none());
    }
}
