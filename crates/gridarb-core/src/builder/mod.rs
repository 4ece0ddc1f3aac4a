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

//! Problem builder: validated requests in, `IntegerProgram` plus variable layout out.
//!
//! Two modes share the model type:
//! - dynamic: one site, counts may change every interval, switching costs downtime
//! - static: many sites, one count per `(site, device)` for the whole horizon

pub mod dynamic;
pub mod static_alloc;
pub mod switching;

pub use dynamic::{DynamicDispatchRequest, DynamicModel, build_dynamic};
pub use static_alloc::{StaticAllocationRequest, StaticModel, build_static};
pub use switching::{SwitchVars, SwitchingPolicy, add_switching_constraints};
