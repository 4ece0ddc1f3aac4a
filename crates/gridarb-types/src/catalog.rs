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

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ============= Device Catalog Records =============

/// A hash miner entry of a site catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinerSpec {
    /// Maximum installable units at this site (fleet cap)
    pub max_machines: i64,

    /// Hash-rate yield per unit
    pub hashrate: f64,

    /// Power draw per unit (W)
    pub power: f64,

    /// Units chosen by the last optimisation run, written back by the caller
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optimal_machines: Option<u32>,
}

/// An inference accelerator entry of a site catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceSpec {
    /// Maximum installable units at this site (fleet cap)
    pub max_machines: i64,

    /// Token-inference yield per unit
    pub tokens: f64,

    /// Power draw per unit (W)
    pub power: f64,

    /// Units chosen by the last optimisation run, written back by the caller
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optimal_machines: Option<u32>,
}

/// One facility as delivered by the catalog collaborator.
///
/// Keys of `miners` and `inference` are device kinds (`air`, `hydro`, `gpu`, ...).
/// Sites may disagree on which kinds they carry and on their specs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteRecord {
    /// Site identifier, unique across a catalog
    pub site_id: String,

    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Power ceiling of the site (W)
    pub power_cap_w: f64,

    /// Hash miners installed at the site
    #[serde(default)]
    pub miners: BTreeMap<String, MinerSpec>,

    /// Inference accelerators installed at the site
    #[serde(default)]
    pub inference: BTreeMap<String, InferenceSpec>,

    /// Per-interval energy price forecast for this site
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub energy_prices: Option<Vec<f64>>,

    /// When the catalog entry was last touched (collaborator clock, no zone)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<NaiveDateTime>,
}

impl SiteRecord {
    /// Create an empty site with the given power ceiling
    pub fn new(site_id: impl Into<String>, power_cap_w: f64) -> Self {
        Self {
            site_id: site_id.into(),
            name: None,
            power_cap_w,
            miners: BTreeMap::new(),
            inference: BTreeMap::new(),
            energy_prices: None,
            updated_at: None,
        }
    }

    /// Builder-style helper to add a miner kind
    #[must_use]
    pub fn with_miner(mut self, kind: &str, max_machines: i64, hashrate: f64, power: f64) -> Self {
        self.miners.insert(
            kind.to_owned(),
            MinerSpec {
                max_machines,
                hashrate,
                power,
                optimal_machines: None,
            },
        );
        self
    }

    /// Builder-style helper to add an inference kind
    #[must_use]
    pub fn with_inference(mut self, kind: &str, max_machines: i64, tokens: f64, power: f64) -> Self {
        self.inference.insert(
            kind.to_owned(),
            InferenceSpec {
                max_machines,
                tokens,
                power,
                optimal_machines: None,
            },
        );
        self
    }

    /// Device kinds declared at this site (miners first, then inference)
    pub fn device_kinds(&self) -> impl Iterator<Item = &str> {
        self.miners
            .keys()
            .chain(self.inference.keys())
            .map(String::as_str)
    }
}

// ============= Normalised Parameters =============

/// Uniform per-unit parameters of one device kind at one site
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DeviceParams {
    /// Power draw per unit (W)
    pub power_w: f64,

    /// Maximum active units
    pub fleet_cap: u32,

    /// Hash-rate yield per unit
    pub hash_yield: f64,

    /// Token-inference yield per unit
    pub token_yield: f64,
}

impl DeviceParams {
    /// Parameters of a device that is not installed: never schedulable
    pub const ABSENT: Self = Self {
        power_w: 0.0,
        fleet_cap: 0,
        hash_yield: 0.0,
        token_yield: 0.0,
    };

    /// Net margin of one unit for one interval at the given prices
    pub fn unit_margin(&self, hash_price: f64, token_price: f64, energy_price: f64) -> f64 {
        self.hash_yield * hash_price + self.token_yield * token_price - self.power_w * energy_price
    }
}

/// A device type of a single-site dynamic dispatch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceType {
    /// Device identifier (`air`, `gpu`, ...)
    pub id: String,

    /// Hash-rate yield per unit
    #[serde(default)]
    pub hash_yield: f64,

    /// Token-inference yield per unit
    #[serde(default)]
    pub token_yield: f64,

    /// Power draw per unit (W)
    pub power_w: f64,

    /// Maximum installable units (fleet cap)
    pub fleet_cap: u32,
}

impl DeviceType {
    pub fn new(
        id: impl Into<String>,
        hash_yield: f64,
        token_yield: f64,
        power_w: f64,
        fleet_cap: u32,
    ) -> Self {
        Self {
            id: id.into(),
            hash_yield,
            token_yield,
            power_w,
            fleet_cap,
        }
    }

    /// View as uniform parameters
    pub fn params(&self) -> DeviceParams {
        DeviceParams {
            power_w: self.power_w,
            fleet_cap: self.fleet_cap,
            hash_yield: self.hash_yield,
            token_yield: self.token_yield,
        }
    }
}
