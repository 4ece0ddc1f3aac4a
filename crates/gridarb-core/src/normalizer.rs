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

//! Site catalog normalisation.
//!
//! Catalog records arrive heterogeneous: each site lists only the device kinds it
//! actually has, split into miners and inference accelerators. The normaliser turns
//! them into one dense `ParamTable` over the union of device kinds so the model
//! builder never has to special-case missing entries.

use std::collections::{BTreeMap, BTreeSet};

use gridarb_types::{DeviceParams, SiteRecord};
use tracing::debug;

use crate::builder::StaticAllocationRequest;
use crate::error::{OptimizeError, OptimizeResult, check_non_negative};
use crate::table::ParamTable;

/// Dense view of a site catalog
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedCatalog {
    /// Site ids in catalog order
    pub sites: Vec<String>,
    /// Sorted union of device kinds across all sites
    pub devices: Vec<String>,
    pub table: ParamTable,
    pub power_caps: BTreeMap<String, f64>,
    /// Energy series carried by the records themselves
    pub energy_prices: BTreeMap<String, Vec<f64>>,
}

/// Normalise catalog records into a dense parameter table.
///
/// Absent `(site, device)` cells are filled with zero power, zero yield and zero cap.
pub fn normalize(records: &[SiteRecord]) -> OptimizeResult<NormalizedCatalog> {
    if records.is_empty() {
        return Err(OptimizeError::Configuration(
            "site catalog is empty".to_owned(),
        ));
    }

    let mut seen = BTreeSet::new();
    let mut devices = BTreeSet::new();
    for record in records {
        if !seen.insert(record.site_id.as_str()) {
            return Err(OptimizeError::DuplicateKey {
                kind: "site",
                key: record.site_id.clone(),
            });
        }
        if let Some(kind) = record
            .miners
            .keys()
            .find(|kind| record.inference.contains_key(*kind))
        {
            return Err(OptimizeError::DuplicateKey {
                kind: "device kind (miner and inference)",
                key: format!("{}/{kind}", record.site_id),
            });
        }
        devices.extend(record.device_kinds().map(str::to_owned));
    }

    let sites: Vec<String> = records.iter().map(|r| r.site_id.clone()).collect();
    let devices: Vec<String> = devices.into_iter().collect();
    let mut table = ParamTable::new(sites.clone(), devices.clone())?;
    let mut power_caps = BTreeMap::new();
    let mut energy_prices = BTreeMap::new();

    for record in records {
        let site = record.site_id.as_str();
        check_non_negative("site power cap", site, record.power_cap_w)?;
        power_caps.insert(record.site_id.clone(), record.power_cap_w);

        for (kind, miner) in &record.miners {
            let key = format!("{site}/{kind}");
            let params = DeviceParams {
                power_w: miner.power,
                fleet_cap: fleet_cap(&key, miner.max_machines)?,
                hash_yield: miner.hashrate,
                token_yield: 0.0,
            };
            check_params(&key, &params)?;
            table.set(site, kind, params)?;
        }

        for (kind, accel) in &record.inference {
            let key = format!("{site}/{kind}");
            let params = DeviceParams {
                power_w: accel.power,
                fleet_cap: fleet_cap(&key, accel.max_machines)?,
                hash_yield: 0.0,
                token_yield: accel.tokens,
            };
            check_params(&key, &params)?;
            table.set(site, kind, params)?;
        }

        if let Some(series) = &record.energy_prices {
            energy_prices.insert(record.site_id.clone(), series.clone());
        }
    }

    debug!(
        sites = sites.len(),
        devices = devices.len(),
        "Normalised site catalog"
    );

    Ok(NormalizedCatalog {
        sites,
        devices,
        table,
        power_caps,
        energy_prices,
    })
}

impl NormalizedCatalog {
    /// Build a static allocation request over the whole catalog.
    ///
    /// Energy series come from `energy_overrides` first, then from the records.
    /// The horizon length is taken from the hash price series.
    pub fn static_request(
        &self,
        hash_prices: Vec<f64>,
        token_prices: Vec<f64>,
        energy_overrides: &BTreeMap<String, Vec<f64>>,
        energy_budget: Option<f64>,
    ) -> OptimizeResult<StaticAllocationRequest> {
        let mut energy_prices = BTreeMap::new();
        for site in &self.sites {
            let series = energy_overrides
                .get(site)
                .or_else(|| self.energy_prices.get(site))
                .ok_or_else(|| OptimizeError::missing("energy price series", site))?;
            energy_prices.insert(site.clone(), series.clone());
        }

        Ok(StaticAllocationRequest {
            sites: self.sites.clone(),
            devices: self.devices.clone(),
            horizon_length: hash_prices.len(),
            device_params: self.table.to_nested(),
            energy_prices,
            hash_prices,
            token_prices,
            power_caps: self.power_caps.clone(),
            energy_budget,
        })
    }
}

fn fleet_cap(key: &str, max_machines: i64) -> OptimizeResult<u32> {
    if max_machines < 0 {
        return Err(OptimizeError::NegativeParameter {
            parameter: "fleet cap",
            key: key.to_owned(),
            value: max_machines as f64,
        });
    }
    u32::try_from(max_machines).map_err(|_| OptimizeError::InvalidValue {
        parameter: "fleet cap",
        key: key.to_owned(),
        value: max_machines as f64,
    })
}

pub(crate) fn check_params(key: &str, params: &DeviceParams) -> OptimizeResult<()> {
    check_non_negative("power", key, params.power_w)?;
    check_non_negative("hash yield", key, params.hash_yield)?;
    check_non_negative("token yield", key, params.token_yield)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Vec<SiteRecord> {
        vec![
            SiteRecord::new("TX", 70000.0)
                .with_miner("air", 8, 800.0, 3000.0)
                .with_inference("gpu", 25, 90.0, 450.0),
            SiteRecord::new("ND", 50000.0).with_miner("hydro", 4, 1200.0, 5000.0),
        ]
    }

    #[test]
    fn test_union_of_device_kinds_is_sorted() {
        let normalized = normalize(&catalog()).unwrap();
        assert_eq!(normalized.sites, vec!["TX", "ND"]);
        assert_eq!(normalized.devices, vec!["air", "gpu", "hydro"]);
        assert_eq!(normalized.power_caps["ND"], 50000.0);
    }

    #[test]
    fn test_absent_devices_are_never_schedulable() {
        let normalized = normalize(&catalog()).unwrap();
        let cell = normalized.table.get("ND", "gpu").unwrap();
        assert_eq!(*cell, DeviceParams::ABSENT);

        let gpu = normalized.table.get("TX", "gpu").unwrap();
        assert_eq!(gpu.token_yield, 90.0);
        assert_eq!(gpu.hash_yield, 0.0);
        assert_eq!(gpu.fleet_cap, 25);

        let air = normalized.table.get("TX", "air").unwrap();
        assert_eq!(air.hash_yield, 800.0);
        assert_eq!(air.token_yield, 0.0);
    }

    #[test]
    fn test_rejects_bad_catalogs() {
        assert!(normalize(&[]).unwrap_err().is_configuration());

        let dup = vec![SiteRecord::new("TX", 1.0), SiteRecord::new("TX", 2.0)];
        assert!(matches!(
            normalize(&dup),
            Err(OptimizeError::DuplicateKey { kind: "site", .. })
        ));

        let negative_cap = vec![SiteRecord::new("TX", 1.0).with_miner("air", -1, 1.0, 1.0)];
        assert!(matches!(
            normalize(&negative_cap),
            Err(OptimizeError::NegativeParameter {
                parameter: "fleet cap",
                ..
            })
        ));

        let negative_power = vec![SiteRecord::new("TX", -5.0)];
        assert!(matches!(
            normalize(&negative_power),
            Err(OptimizeError::NegativeParameter { .. })
        ));

        let both = vec![
            SiteRecord::new("TX", 1.0)
                .with_miner("asic", 1, 1.0, 1.0)
                .with_inference("asic", 1, 1.0, 1.0),
        ];
        assert!(matches!(
            normalize(&both),
            Err(OptimizeError::DuplicateKey { .. })
        ));
    }

    #[test]
    fn test_static_request_needs_energy_for_every_site() {
        let mut records = catalog();
        records[0].energy_prices = Some(vec![0.1, 0.2]);
        let normalized = normalize(&records).unwrap();

        let err = normalized
            .static_request(vec![1.0, 1.0], vec![1.0, 1.0], &BTreeMap::new(), None)
            .unwrap_err();
        assert_eq!(err, OptimizeError::missing("energy price series", "ND"));

        let overrides = BTreeMap::from([("ND".to_owned(), vec![0.3, 0.3])]);
        let request = normalized
            .static_request(vec![1.0, 1.0], vec![1.0, 1.0], &overrides, Some(10.0))
            .unwrap();
        assert_eq!(request.horizon_length, 2);
        assert_eq!(request.energy_prices["TX"], vec![0.1, 0.2]);
        assert_eq!(request.energy_prices["ND"], vec![0.3, 0.3]);
        assert_eq!(request.device_params["ND"]["gpu"], DeviceParams::ABSENT);
    }
}
