// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of GridArb.

//! CLI module for the `gridarb` command-line interface.

pub mod args;
pub mod config;
pub mod data_loaders;
pub mod formatters;

pub use args::{AllocateArgs, Cli, Commands, DispatchArgs, SwitchingArg, WindowArgs};
pub use config::ProblemConfig;
pub use data_loaders::{
    CsvPriceLoader, JsonPriceLoader, OptimizationData, OptimizationResponse, PriceLoader,
    SiteCatalog, SyntheticLoader,
};
pub use formatters::{CsvFormatter, LpFormatter, TableFormatter};
