// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of GridArb.

//! Synthetic market scenarios for allocation and dispatch runs.
//!
//! Each scenario produces hourly snapshots of the three prices the optimiser consumes:
//!
//! - **Steady**: flat hash and token revenue, day/night energy tariff
//! - **Volatile**: energy swings hard between overnight valleys and evening peaks
//! - **Negative Energy**: midday renewable surplus pushes energy below zero
//! - **Hash Rally**: hash revenue climbs steadily across the horizon
//! - **Token Slump**: token revenue decays while energy stays elevated
//!
//! Energy prices are per watt per interval, so a 50 $/MWh tariff over one hour is
//! `0.00005`.

use chrono::{DateTime, Duration, Utc};
use gridarb_types::{HorizonPrices, PriceSnapshot};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Interval length used for synthetic horizons
pub const INTERVAL_MINUTES: i64 = 60;

// Base revenue per unit of hash-rate and per unit of token throughput per hour
const BASE_HASH_PRICE: f64 = 0.002;
const BASE_TOKEN_PRICE: f64 = 0.01;

/// Market scenario types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MarketScenario {
    Steady,
    Volatile,
    NegativeEnergy,
    HashRally,
    TokenSlump,

    /// Explicit price curves, repeated if shorter than the horizon
    Custom {
        hash: Vec<f64>,
        token: Vec<f64>,
        energy: Vec<f64>,
    },
}

impl MarketScenario {
    /// Parse a preset id; unknown ids return `None`
    pub fn from_id(id: &str) -> Option<Self> {
        PRICE_PRESETS
            .iter()
            .find(|p| p.id == id.to_lowercase())
            .map(|p| p.scenario.clone())
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Steady => "Steady",
            Self::Volatile => "Volatile",
            Self::NegativeEnergy => "Negative Energy",
            Self::HashRally => "Hash Rally",
            Self::TokenSlump => "Token Slump",
            Self::Custom { .. } => "Custom",
        }
    }

    /// Generate `horizon` hourly snapshots starting at `start`
    pub fn generate(&self, start: DateTime<Utc>, horizon: usize) -> Vec<PriceSnapshot> {
        self.generate_with(start, horizon, &mut rand::thread_rng())
    }

    /// Same as [`generate`](Self::generate) with a caller-supplied RNG
    pub fn generate_with<R: Rng>(
        &self,
        start: DateTime<Utc>,
        horizon: usize,
        rng: &mut R,
    ) -> Vec<PriceSnapshot> {
        (0..horizon)
            .map(|i| {
                let (hash_price, token_price, energy_price) = self.prices_at(i, horizon, rng);
                PriceSnapshot {
                    timestamp: Some(start + Duration::minutes(i as i64 * INTERVAL_MINUTES)),
                    energy_price,
                    hash_price,
                    token_price,
                }
            })
            .collect()
    }

    /// Generate straight into a horizon
    pub fn horizon(&self, start: DateTime<Utc>, horizon: usize) -> HorizonPrices {
        HorizonPrices::from_snapshots(&self.generate(start, horizon))
    }

    fn prices_at<R: Rng>(&self, i: usize, horizon: usize, rng: &mut R) -> (f64, f64, f64) {
        let hour = i % 24;
        let progress = if horizon > 1 {
            i as f64 / (horizon - 1) as f64
        } else {
            0.0
        };

        match self {
            Self::Steady => (
                jitter(rng, BASE_HASH_PRICE, 0.02),
                jitter(rng, BASE_TOKEN_PRICE, 0.02),
                jitter(rng, day_night_tariff(hour), 0.05),
            ),
            Self::Volatile => {
                let energy = match hour {
                    0..=4 => rng.gen_range(0.000_005..0.000_02),
                    5..=9 => rng.gen_range(0.00006..0.00012),
                    10..=15 => rng.gen_range(0.00002..0.00005),
                    16..=20 => rng.gen_range(0.00015..0.0003),
                    _ => rng.gen_range(0.00003..0.00006),
                };
                (
                    jitter(rng, BASE_HASH_PRICE, 0.10),
                    jitter(rng, BASE_TOKEN_PRICE, 0.10),
                    energy,
                )
            }
            Self::NegativeEnergy => {
                let energy = if (11..=14).contains(&hour) {
                    -0.00002 * (1.0 + rng.gen_range(-0.3..0.3))
                } else {
                    jitter(rng, day_night_tariff(hour), 0.10)
                };
                (
                    jitter(rng, BASE_HASH_PRICE, 0.05),
                    jitter(rng, BASE_TOKEN_PRICE, 0.05),
                    energy,
                )
            }
            Self::HashRally => (
                jitter(rng, BASE_HASH_PRICE * (1.0 + progress), 0.03),
                jitter(rng, BASE_TOKEN_PRICE, 0.03),
                jitter(rng, day_night_tariff(hour), 0.05),
            ),
            Self::TokenSlump => (
                jitter(rng, BASE_HASH_PRICE, 0.03),
                jitter(rng, BASE_TOKEN_PRICE * (1.0 - 0.7 * progress), 0.03),
                jitter(rng, day_night_tariff(hour) * 1.5, 0.05),
            ),
            Self::Custom {
                hash,
                token,
                energy,
            } => (cycle(hash, i), cycle(token, i), cycle(energy, i)),
        }
    }
}

/// 30 $/MWh overnight, 70 $/MWh during the day
fn day_night_tariff(hour: usize) -> f64 {
    if (7..=21).contains(&hour) {
        0.00007
    } else {
        0.00003
    }
}

fn jitter<R: Rng>(rng: &mut R, base: f64, spread: f64) -> f64 {
    base * (1.0 + rng.gen_range(-spread..=spread))
}

fn cycle(series: &[f64], i: usize) -> f64 {
    if series.is_empty() {
        0.0
    } else {
        series[i % series.len()]
    }
}

/// Market scenario preset with metadata
#[derive(Debug, Clone)]
pub struct PriceScenarioPreset {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub scenario: MarketScenario,
}

/// Available market scenario presets
pub const PRICE_PRESETS: &[PriceScenarioPreset] = &[
    PriceScenarioPreset {
        id: "steady",
        name: "Steady",
        description: "Flat hash and token revenue with a day/night energy tariff",
        scenario: MarketScenario::Steady,
    },
    PriceScenarioPreset {
        id: "volatile",
        name: "Volatile",
        description: "Energy swings between cheap overnight valleys and steep evening peaks",
        scenario: MarketScenario::Volatile,
    },
    PriceScenarioPreset {
        id: "negative_energy",
        name: "Negative Energy",
        description: "Negative energy prices around midday (renewable surplus)",
        scenario: MarketScenario::NegativeEnergy,
    },
    PriceScenarioPreset {
        id: "hash_rally",
        name: "Hash Rally",
        description: "Hash revenue doubles over the horizon",
        scenario: MarketScenario::HashRally,
    },
    PriceScenarioPreset {
        id: "token_slump",
        name: "Token Slump",
        description: "Token revenue decays while energy stays elevated",
        scenario: MarketScenario::TokenSlump,
    },
];

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 15, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_all_presets_generate_full_horizon() {
        for preset in PRICE_PRESETS {
            let snaps = preset.scenario.generate(start(), 48);
            assert_eq!(snaps.len(), 48, "Preset '{}' should generate 48 intervals", preset.id);
            assert!(
                snaps.iter().all(|s| s.energy_price.is_finite()),
                "Preset '{}' produced non-finite prices",
                preset.id
            );
            assert_eq!(
                snaps[1].timestamp.unwrap() - snaps[0].timestamp.unwrap(),
                Duration::minutes(INTERVAL_MINUTES)
            );
        }
    }

    #[test]
    fn test_negative_energy_scenario_dips_below_zero_midday() {
        let mut rng = StdRng::seed_from_u64(7);
        let snaps = MarketScenario::NegativeEnergy.generate_with(start(), 24, &mut rng);
        assert!(snaps[11..=14].iter().all(|s| s.energy_price < 0.0));
        assert!(snaps[0].energy_price > 0.0);
    }

    #[test]
    fn test_hash_rally_rises() {
        let mut rng = StdRng::seed_from_u64(1);
        let snaps = MarketScenario::HashRally.generate_with(start(), 24, &mut rng);
        assert!(snaps[23].hash_price > snaps[0].hash_price * 1.5);
    }

    #[test]
    fn test_volatile_evening_beats_night() {
        let mut rng = StdRng::seed_from_u64(3);
        let snaps = MarketScenario::Volatile.generate_with(start(), 24, &mut rng);
        let night: f64 = snaps[0..5].iter().map(|s| s.energy_price).sum::<f64>() / 5.0;
        let evening: f64 = snaps[16..21].iter().map(|s| s.energy_price).sum::<f64>() / 5.0;
        assert!(evening > night * 5.0);
    }

    #[test]
    fn test_custom_cycles_short_series() {
        let scenario = MarketScenario::Custom {
            hash: vec![1.0, 2.0],
            token: vec![3.0],
            energy: vec![],
        };
        let prices = HorizonPrices::from_snapshots(&scenario.generate(start(), 3));
        assert_eq!(prices.hash, vec![1.0, 2.0, 1.0]);
        assert_eq!(prices.token, vec![3.0, 3.0, 3.0]);
        assert_eq!(prices.energy, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_preset_lookup() {
        assert_eq!(MarketScenario::from_id("Volatile"), Some(MarketScenario::Volatile));
        assert_eq!(MarketScenario::from_id("nope"), None);
    }
}
