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

//! Command-line front end for the GridArb optimiser
//!
//! This crate wires catalogs, price sources and output formats around
//! `gridarb-core` so allocations and schedules can be explored from a shell.
//!
//! # Features
//!
//! - **Market Scenarios**: Synthetic hash, token and energy price curves
//! - **Price Files**: CSV columns or JSON snapshot arrays
//! - **Site Catalogs**: Registry JSON in, catalog annotated with `optimal_machines` out
//! - **Dashboard Payloads**: The `optimization-data` request and response shapes
//!
//! # Example
//!
//! ```ignore
//! use gridarb_sim::cli::{ProblemConfig, SiteCatalog};
//!
//! let config = ProblemConfig::from_file("problem.toml")?;
//! let catalog = SiteCatalog::from_file(&config.problem.catalog)?;
//! let request = config.build_request(&catalog, chrono::Utc::now())?;
//! ```

pub mod cli;
pub mod price_scenarios;

// Re-exports for convenience
pub use price_scenarios::{MarketScenario, PRICE_PRESETS, PriceScenarioPreset};
