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

//! GridArb optimisation core.
//!
//! Allocates hash miners and inference accelerators across sites and schedules them
//! over a forecast horizon as a mixed-integer program:
//!
//! - `normalizer` turns heterogeneous site catalogs into a dense parameter table
//! - `coefficients` folds price series into per-unit horizon totals
//! - `builder` emits the integer program (dynamic single-site or static multi-site)
//! - `solver` runs an injected MILP engine under a deadline
//! - `extract` rounds and reshapes the answer
//! - `dispatch` ties them together into the public entry points

pub mod builder;
pub mod coefficients;
pub mod dispatch;
pub mod error;
pub mod extract;
pub mod model;
pub mod normalizer;
pub mod solver;
pub mod table;

pub use builder::{DynamicDispatchRequest, StaticAllocationRequest, SwitchingPolicy};
pub use dispatch::{
    annotate_site_records, optimize_dynamic_dispatch, optimize_site_window,
    optimize_static_allocation, summarize_allocation,
};
pub use error::{OptimizeError, OptimizeResult};
pub use model::IntegerProgram;
pub use normalizer::{NormalizedCatalog, normalize};
pub use solver::{
    CancelHandle, CancelSignal, MicroLpSolver, SolveOptions, SolveOutcome, SolverBackend,
    cancel_pair,
};
#[cfg(feature = "highs")]
pub use solver::HighsSolver;
pub use table::ParamTable;

// Re-export the data model so callers need one dependency
pub use gridarb_types;
