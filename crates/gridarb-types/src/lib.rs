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

//! Shared data model for GridArb.
//!
//! Plain serde types exchanged between the optimisation core and its callers:
//! site catalogs, price forecasts and the schedules/allocations that come back.

pub mod catalog;
pub mod pricing;
pub mod schedule;

pub use catalog::{DeviceParams, DeviceType, InferenceSpec, MinerSpec, SiteRecord};
pub use pricing::{HorizonPrices, PriceSnapshot};
pub use schedule::{
    Allocation, AllocationResult, AllocationSummary, DeviceSchedule, DispatchResult, SolveStatus,
};
