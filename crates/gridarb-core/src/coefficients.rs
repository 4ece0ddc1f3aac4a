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

//! Horizon coefficient aggregation for static allocation.
//!
//! A static allocation keeps the same unit counts for the whole horizon, so per-interval
//! prices collapse into two numbers per `(site, device)`: total profit per unit and total
//! energy spend per unit.

use std::collections::BTreeMap;

use gridarb_types::HorizonPrices;

use crate::error::{OptimizeError, OptimizeResult, check_finite};
use crate::table::ParamTable;

/// Per-unit horizon totals, laid out like the `ParamTable` they came from
#[derive(Debug, Clone, PartialEq)]
pub struct CoefficientTable {
    width: usize,
    profit: Vec<f64>,
    energy: Vec<f64>,
}

impl CoefficientTable {
    /// Net profit of one unit over the horizon
    pub fn profit(&self, s: usize, d: usize) -> f64 {
        self.profit[s * self.width + d]
    }

    /// Energy spend of one unit over the horizon
    pub fn energy(&self, s: usize, d: usize) -> f64 {
        self.energy[s * self.width + d]
    }
}

/// Check a horizon series against the expected length and for finite values
pub(crate) fn check_series(name: &str, series: &[f64], expected: usize) -> OptimizeResult<()> {
    if series.len() != expected {
        return Err(OptimizeError::series_length(name, expected, series.len()));
    }
    for (t, value) in series.iter().enumerate() {
        check_finite("price", &format!("{name}[{t}]"), *value)?;
    }
    Ok(())
}

/// Validate a dynamic-mode horizon and return its length T
pub fn horizon_length(prices: &HorizonPrices) -> OptimizeResult<usize> {
    let t = prices.hash.len();
    if t == 0 {
        return Err(OptimizeError::EmptyHorizon);
    }
    check_series("hash", &prices.hash, t)?;
    check_series("token", &prices.token, t)?;
    check_series("energy", &prices.energy, t)?;
    Ok(t)
}

/// Aggregate horizon coefficients for every cell of `table`.
///
/// `profit = Σ_t (hash_yield*h[t] + token_yield*g[t] - power*e[s][t])` and
/// `energy = Σ_t power*e[s][t]`, each over exactly `horizon_length` terms.
pub fn aggregate(
    table: &ParamTable,
    horizon_length: usize,
    hash_prices: &[f64],
    token_prices: &[f64],
    energy_prices: &BTreeMap<String, Vec<f64>>,
) -> OptimizeResult<CoefficientTable> {
    if horizon_length == 0 {
        return Err(OptimizeError::EmptyHorizon);
    }
    check_series("hash", hash_prices, horizon_length)?;
    check_series("token", token_prices, horizon_length)?;

    let hash_total: f64 = hash_prices.iter().sum();
    let token_total: f64 = token_prices.iter().sum();

    let width = table.devices().len();
    let mut profit = Vec::with_capacity(table.sites().len() * width);
    let mut energy = Vec::with_capacity(table.sites().len() * width);

    for (s, site) in table.sites().iter().enumerate() {
        let series = energy_prices
            .get(site)
            .ok_or_else(|| OptimizeError::missing("energy price series", site))?;
        check_series(&format!("energy[{site}]"), series, horizon_length)?;
        let energy_total: f64 = series.iter().sum();

        for d in 0..width {
            let params = table.at(s, d);
            let spend = params.power_w * energy_total;
            profit.push(params.hash_yield * hash_total + params.token_yield * token_total - spend);
            energy.push(spend);
        }
    }

    Ok(CoefficientTable {
        width,
        profit,
        energy,
    })
}

#[cfg(test)]
mod tests {
    use gridarb_types::DeviceParams;

    use super::*;

    fn table() -> ParamTable {
        let mut table = ParamTable::new(
            vec!["TX".to_owned(), "ND".to_owned()],
            vec!["air".to_owned(), "gpu".to_owned()],
        )
        .unwrap();
        table
            .set(
                "TX",
                "air",
                DeviceParams {
                    power_w: 10.0,
                    fleet_cap: 3,
                    hash_yield: 2.0,
                    token_yield: 0.0,
                },
            )
            .unwrap();
        table
            .set(
                "ND",
                "gpu",
                DeviceParams {
                    power_w: 4.0,
                    fleet_cap: 1,
                    hash_yield: 0.0,
                    token_yield: 5.0,
                },
            )
            .unwrap();
        table
    }

    fn energy() -> BTreeMap<String, Vec<f64>> {
        BTreeMap::from([
            ("TX".to_owned(), vec![0.5, 1.5]),
            ("ND".to_owned(), vec![-1.0, 0.0]),
        ])
    }

    #[test]
    fn test_coefficients_sum_over_horizon() {
        let coeffs = aggregate(&table(), 2, &[3.0, 1.0], &[1.0, 2.0], &energy()).unwrap();

        // TX/air: 2*(3+1) - 10*(0.5+1.5) = 8 - 20
        assert!((coeffs.profit(0, 0) - (-12.0)).abs() < 1e-9);
        assert!((coeffs.energy(0, 0) - 20.0).abs() < 1e-9);

        // ND/gpu: 5*(1+2) - 4*(-1) = 15 + 4, energy spend is negative
        assert!((coeffs.profit(1, 1) - 19.0).abs() < 1e-9);
        assert!((coeffs.energy(1, 1) - (-4.0)).abs() < 1e-9);

        // Absent cells contribute nothing
        assert_eq!(coeffs.profit(1, 0), 0.0);
    }

    #[test]
    fn test_length_mismatch_is_rejected() {
        let err = aggregate(&table(), 2, &[3.0], &[1.0, 2.0], &energy()).unwrap_err();
        assert!(matches!(err, OptimizeError::SeriesLength { expected: 2, actual: 1, .. }));

        let mut short = energy();
        short.insert("ND".to_owned(), vec![1.0, 2.0, 3.0]);
        let err = aggregate(&table(), 2, &[3.0, 1.0], &[1.0, 2.0], &short).unwrap_err();
        assert!(matches!(err, OptimizeError::SeriesLength { actual: 3, .. }));
    }

    #[test]
    fn test_missing_site_energy_and_empty_horizon() {
        let mut partial = energy();
        partial.remove("TX");
        let err = aggregate(&table(), 2, &[3.0, 1.0], &[1.0, 2.0], &partial).unwrap_err();
        assert_eq!(err, OptimizeError::missing("energy price series", "TX"));

        let err = aggregate(&table(), 0, &[], &[], &energy()).unwrap_err();
        assert_eq!(err, OptimizeError::EmptyHorizon);
    }

    #[test]
    fn test_dynamic_horizon_validation() {
        let prices = HorizonPrices::new(vec![1.0, 2.0], vec![0.0, 0.0], vec![0.1]);
        assert!(matches!(
            horizon_length(&prices),
            Err(OptimizeError::SeriesLength { .. })
        ));
        assert_eq!(
            horizon_length(&HorizonPrices::default()),
            Err(OptimizeError::EmptyHorizon)
        );

        let nan = HorizonPrices::new(vec![f64::NAN], vec![0.0], vec![0.1]);
        assert!(matches!(
            horizon_length(&nan),
            Err(OptimizeError::InvalidValue { .. })
        ));
    }
}
