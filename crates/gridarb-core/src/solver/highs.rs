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

use good_lp::{SolverModel, WithTimeLimit};

use super::{
    SolveOptions, SolveOutcome, SolverBackend, Translated, backstop, collect, run_with_deadline,
    translate,
};
use crate::model::IntegerProgram;

/// HiGHS through `good_lp`, with the engine's native time limit.
///
/// The engine's termination status decides between `Optimal` and
/// `FeasibleSuboptimal`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HighsSolver;

impl SolverBackend for HighsSolver {
    fn name(&self) -> &str {
        "highs"
    }

    fn solve(&self, program: &IntegerProgram, options: &SolveOptions) -> SolveOutcome {
        let program = program.clone();
        let time_limit = options.time_limit.as_secs_f64();
        run_with_deadline(&backstop(options), move || solve_blocking(&program, time_limit))
    }
}

fn solve_blocking(program: &IntegerProgram, time_limit_secs: f64) -> SolveOutcome {
    let Translated {
        vars,
        handles,
        objective,
        rows,
    } = translate(program);

    let mut model = vars
        .maximise(objective)
        .using(good_lp::highs)
        .with_time_limit(time_limit_secs);
    for row in rows {
        model = model.with(row);
    }

    collect("highs", program, &handles, model.solve())
}

#[cfg(test)]
mod tests {
    use gridarb_types::SolveStatus;

    use super::*;

    #[test]
    fn test_quick_solve_is_optimal() {
        let mut program = IntegerProgram::new();
        let a = program.add_integer("a", 0.0, 10.0);
        let b = program.add_integer("b", 0.0, 10.0);
        program.add_objective_term(a, 5.0);
        program.add_objective_term(b, 4.0);
        program.add_leq("r1", vec![(a, 6.0), (b, 4.0)], 24.0);
        program.add_leq("r2", vec![(a, 1.0), (b, 2.0)], 6.0);

        let outcome = HighsSolver.solve(&program, &SolveOptions::default());
        assert_eq!(outcome.status, SolveStatus::Optimal);
        assert!((outcome.objective_value.unwrap() - 20.0).abs() < 1e-6);
    }
}
