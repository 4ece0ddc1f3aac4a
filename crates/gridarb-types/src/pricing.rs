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

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============= Price Forecasts =============

/// Forecast prices over a horizon of T equal-length intervals.
///
/// All three series must have the same length; the optimiser rejects anything else.
/// Negative values are legal (negative energy prices happen on real markets).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HorizonPrices {
    /// Revenue per unit of hash-rate per interval
    pub hash: Vec<f64>,

    /// Revenue per unit of token-inference per interval
    pub token: Vec<f64>,

    /// Energy cost per watt per interval
    pub energy: Vec<f64>,
}

impl HorizonPrices {
    pub fn new(hash: Vec<f64>, token: Vec<f64>, energy: Vec<f64>) -> Self {
        Self {
            hash,
            token,
            energy,
        }
    }

    /// Horizon length taken from the hash series
    pub fn len(&self) -> usize {
        self.hash.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hash.is_empty()
    }

    /// Build a horizon from single-interval snapshots
    pub fn from_snapshots(snapshots: &[PriceSnapshot]) -> Self {
        Self {
            hash: snapshots.iter().map(|s| s.hash_price).collect(),
            token: snapshots.iter().map(|s| s.token_price).collect(),
            energy: snapshots.iter().map(|s| s.energy_price).collect(),
        }
    }

    /// Iterate the horizon as snapshots without timestamps.
    /// Stops at the shortest series.
    pub fn snapshots(&self) -> impl Iterator<Item = PriceSnapshot> + '_ {
        self.hash
            .iter()
            .zip(&self.token)
            .zip(&self.energy)
            .map(|((&hash_price, &token_price), &energy_price)| PriceSnapshot {
                timestamp: None,
                energy_price,
                hash_price,
                token_price,
            })
    }
}

/// Prices of one interval, as delivered by the market-data collaborator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceSnapshot {
    /// Start of the interval
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,

    /// Energy cost per watt
    pub energy_price: f64,

    /// Revenue per unit of hash-rate
    pub hash_price: f64,

    /// Revenue per unit of token-inference
    pub token_price: f64,
}
