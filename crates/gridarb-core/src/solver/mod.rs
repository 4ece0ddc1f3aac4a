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

//! Solver adapter.
//!
//! The branch-and-bound engine is injected through [`SolverBackend`]. Backends receive
//! a finished `IntegerProgram` and return a status plus raw variable values; they never
//! modify the model or retry. Engines get the time limit natively and stop with their
//! incumbent; the worker thread plus crossbeam deadline is only a backstop for an engine
//! that overruns, and the cancel path for callers.

#[cfg(feature = "highs")]
mod highs;
mod microlp;

use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, after, bounded, never, select};
use good_lp::{
    Expression, ProblemVariables, ResolutionError, Solution, SolutionStatus, Variable, variable,
};
use gridarb_types::SolveStatus;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[cfg(feature = "highs")]
pub use highs::HighsSolver;
pub use microlp::MicroLpSolver;

use crate::model::{IntegerProgram, VarKind};

/// Raw result of one solver run
#[derive(Debug, Clone, PartialEq)]
pub struct SolveOutcome {
    pub status: SolveStatus,
    /// Variable values indexed by `VarId`, present when a solution exists
    pub values: Option<Vec<f64>>,
    /// Objective recomputed from `values`, not the engine's own figure
    pub objective_value: Option<f64>,
}

impl SolveOutcome {
    pub fn solved(status: SolveStatus, values: Vec<f64>, objective_value: f64) -> Self {
        Self {
            status,
            values: Some(values),
            objective_value: Some(objective_value),
        }
    }

    pub fn status_only(status: SolveStatus) -> Self {
        Self {
            status,
            values: None,
            objective_value: None,
        }
    }
}

/// An injected MILP engine
pub trait SolverBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Solve `program` (maximise), honouring the deadline and cancel signal in `options`
    fn solve(&self, program: &IntegerProgram, options: &SolveOptions) -> SolveOutcome;
}

fn default_time_limit() -> Duration {
    Duration::from_secs(30)
}

/// Per-solve settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolveOptions {
    /// Wall-clock limit for the solve
    #[serde(
        rename = "time_limit_secs",
        with = "duration_secs",
        default = "default_time_limit"
    )]
    pub time_limit: Duration,

    /// Optional cooperative cancellation
    #[serde(skip)]
    pub cancel: Option<CancelSignal>,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            time_limit: default_time_limit(),
            cancel: None,
        }
    }
}

impl SolveOptions {
    pub fn with_time_limit(time_limit: Duration) -> Self {
        Self {
            time_limit,
            cancel: None,
        }
    }

    #[must_use]
    pub fn cancellable(mut self, signal: CancelSignal) -> Self {
        self.cancel = Some(signal);
        self
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

/// Caller side of a cancellation channel
#[derive(Debug, Clone)]
pub struct CancelHandle {
    sender: Sender<()>,
}

impl CancelHandle {
    /// Request cancellation; repeated calls are no-ops
    pub fn cancel(&self) {
        let _ = self.sender.try_send(());
    }
}

/// Solver side of a cancellation channel
#[derive(Debug, Clone)]
pub struct CancelSignal {
    receiver: Receiver<()>,
}

/// Create a connected cancel handle and signal
pub fn cancel_pair() -> (CancelHandle, CancelSignal) {
    let (sender, receiver) = bounded(1);
    (CancelHandle { sender }, CancelSignal { receiver })
}

// Headroom between an engine's own limit and the outer deadline
pub(crate) const DEADLINE_GRACE: Duration = Duration::from_secs(2);

/// Outer deadline for an engine that enforces `options.time_limit` itself
pub(crate) fn backstop(options: &SolveOptions) -> SolveOptions {
    SolveOptions {
        time_limit: options.time_limit.saturating_add(DEADLINE_GRACE),
        cancel: options.cancel.clone(),
    }
}

/// Status of a returned incumbent, from the engine's termination reason
pub(crate) fn incumbent_status(status: SolutionStatus) -> SolveStatus {
    match status {
        SolutionStatus::Optimal => SolveStatus::Optimal,
        SolutionStatus::TimeLimit | SolutionStatus::GapLimit => SolveStatus::FeasibleSuboptimal,
    }
}

/// Turn an engine's answer into an outcome.
///
/// An `Other` error covers a limit reached before any incumbent existed, and
/// engine states with no usable solution.
pub(crate) fn collect<S: Solution>(
    engine: &str,
    program: &IntegerProgram,
    handles: &[Variable],
    result: Result<S, ResolutionError>,
) -> SolveOutcome {
    match result {
        Ok(solution) => {
            let values: Vec<f64> = handles.iter().map(|&v| solution.value(v)).collect();
            let objective = program.evaluate_objective(&values);
            let status = incumbent_status(solution.status());
            if status == SolveStatus::FeasibleSuboptimal {
                warn!(engine, objective, "Search stopped early, returning incumbent");
            } else {
                debug!(engine, objective, "Solver proved optimality");
            }
            SolveOutcome::solved(status, values, objective)
        }
        Err(ResolutionError::Infeasible) => SolveOutcome::status_only(SolveStatus::Infeasible),
        Err(ResolutionError::Unbounded) => SolveOutcome::status_only(SolveStatus::Unbounded),
        Err(ResolutionError::Other(reason)) => {
            warn!(engine, reason, "Solver stopped without a solution");
            SolveOutcome::status_only(SolveStatus::SolverError)
        }
        Err(err) => {
            warn!(engine, "Solver failed: {}", err);
            SolveOutcome::status_only(SolveStatus::SolverError)
        }
    }
}

/// Run `solve` on a worker thread and wait for its result, the deadline or cancellation.
///
/// On deadline or cancellation the worker is abandoned and the outcome is
/// `SolverError`. Dropping the `CancelHandle` does not cancel.
pub fn run_with_deadline<F>(options: &SolveOptions, solve: F) -> SolveOutcome
where
    F: FnOnce() -> SolveOutcome + Send + 'static,
{
    let (tx, rx) = bounded(1);
    let spawned = thread::Builder::new()
        .name("gridarb-solve".to_owned())
        .spawn(move || {
            let _ = tx.send(solve());
        });
    if let Err(e) = spawned {
        warn!("Failed to spawn solver thread: {}", e);
        return SolveOutcome::status_only(SolveStatus::SolverError);
    }

    let deadline = after(options.time_limit);
    let mut cancel = options
        .cancel
        .as_ref()
        .map_or_else(never, |signal| signal.receiver.clone());

    loop {
        select! {
            recv(rx) -> outcome => {
                return outcome.unwrap_or_else(|_| {
                    warn!("Solver thread exited without a result");
                    SolveOutcome::status_only(SolveStatus::SolverError)
                });
            }
            recv(deadline) -> _ => {
                warn!(
                    "Solver overran its deadline of {:.1}s, abandoning worker",
                    options.time_limit.as_secs_f64()
                );
                return SolveOutcome::status_only(SolveStatus::SolverError);
            }
            recv(cancel) -> msg => {
                if msg.is_ok() {
                    warn!("Solve cancelled by caller");
                    return SolveOutcome::status_only(SolveStatus::SolverError);
                }
                cancel = never();
            }
        }
    }
}

/// Translate a program into `good_lp` variables, objective and rows
pub(crate) struct Translated {
    pub vars: ProblemVariables,
    pub handles: Vec<Variable>,
    pub objective: Expression,
    pub rows: Vec<good_lp::Constraint>,
}

pub(crate) fn translate(program: &IntegerProgram) -> Translated {
    let mut vars = ProblemVariables::new();
    let handles: Vec<Variable> = program
        .variables()
        .iter()
        .map(|def| {
            let definition = match def.kind {
                VarKind::Binary => variable().binary(),
                VarKind::Integer => variable().integer().min(def.lower).max(def.upper),
            };
            vars.add(definition.name(def.name.clone()))
        })
        .collect();

    let objective: Expression = program
        .objective()
        .iter()
        .map(|&(id, coef)| coef * handles[id.index()])
        .sum();

    let rows = program
        .constraints()
        .iter()
        .map(|row| {
            let lhs: Expression = row
                .terms
                .iter()
                .map(|&(id, coef)| coef * handles[id.index()])
                .sum();
            good_lp::constraint::leq(lhs, row.rhs)
        })
        .collect();

    Translated {
        vars,
        handles,
        objective,
        rows,
    }
}
