// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of GridArb.

//! Loaders for catalogs, price series, device lists and optimisation payloads.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use gridarb_core::StaticAllocationRequest;
use gridarb_types::{
    Allocation, AllocationResult, DeviceParams, DeviceType, InferenceSpec, MinerSpec, PriceSnapshot, SiteRecord,
    SolveStatus,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use tracing::warn;

use crate::price_scenarios::MarketScenario;

/// Trait for loading a price horizon from various sources
pub trait PriceLoader {
    fn load(&self) -> Result<Vec<PriceSnapshot>>;
}

/// Loader for synthetic prices using built-in scenarios
#[derive(Debug)]
pub struct SyntheticLoader {
    pub scenario: MarketScenario,
    pub start: DateTime<Utc>,
    pub horizon: usize,
}

impl PriceLoader for SyntheticLoader {
    fn load(&self) -> Result<Vec<PriceSnapshot>> {
        Ok(self.scenario.generate(self.start, self.horizon))
    }
}

/// Loader for CSV price files.
///
/// Columns: `hash_price`, `token_price`, `energy_price` and an optional RFC 3339
/// `timestamp`; one row per interval.
#[derive(Debug)]
pub struct CsvPriceLoader {
    path: String,
}

impl CsvPriceLoader {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

impl PriceLoader for CsvPriceLoader {
    fn load(&self) -> Result<Vec<PriceSnapshot>> {
        let mut reader = csv::Reader::from_path(&self.path)
            .with_context(|| format!("Failed to open CSV file: {}", self.path))?;

        reader
            .deserialize::<PriceSnapshot>()
            .enumerate()
            .map(|(row, record)| {
                record.with_context(|| format!("Invalid price row {} in {}", row + 1, self.path))
            })
            .collect()
    }
}

/// Loader for JSON arrays of price snapshots
#[derive(Debug)]
pub struct JsonPriceLoader {
    path: String,
}

impl JsonPriceLoader {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

impl PriceLoader for JsonPriceLoader {
    fn load(&self) -> Result<Vec<PriceSnapshot>> {
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read JSON file: {}", self.path))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse JSON file: {}", self.path))
    }
}

/// Pick a loader from a file extension
pub fn price_loader_for_path(path: &str) -> Box<dyn PriceLoader> {
    if path.to_lowercase().ends_with(".json") {
        Box::new(JsonPriceLoader::new(path))
    } else {
        Box::new(CsvPriceLoader::new(path))
    }
}

#[derive(Debug, Deserialize)]
struct EnergyRow {
    energy_price: f64,
}

/// Load a single-site energy series (CSV with an `energy_price` column)
pub fn load_energy_series(path: &str) -> Result<Vec<f64>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open CSV file: {}", path))?;
    reader
        .deserialize::<EnergyRow>()
        .enumerate()
        .map(|(row, record)| {
            record
                .map(|r| r.energy_price)
                .with_context(|| format!("Invalid energy row {} in {}", row + 1, path))
        })
        .collect()
}

/// Load dynamic-mode device types from a JSON array
pub fn load_devices(path: &str) -> Result<Vec<DeviceType>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read devices file: {}", path))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse devices file: {}", path))
}

// ============= Site Catalog =============

/// Catalog entry as written by the site registry.
///
/// Accepts numeric or string ids (`site_id` preferred over `id`) and keeps
/// everything else it does not model untouched in the raw JSON.
#[derive(Debug, Deserialize)]
struct CatalogEntry {
    #[serde(default)]
    site_id: Option<Value>,
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    name: Option<String>,
    #[serde(alias = "power_cap_w")]
    power: f64,
    #[serde(default)]
    miners: BTreeMap<String, MinerSpec>,
    #[serde(default)]
    inference: BTreeMap<String, InferenceSpec>,
    #[serde(default)]
    energy_prices: Option<Vec<f64>>,
    #[serde(default)]
    updated_at: Option<String>,
}

fn key_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Null | Value::Bool(_) | Value::Array(_) | Value::Object(_) => None,
    }
}

fn entry_key(site_id: Option<&Value>, id: Option<&Value>) -> Option<String> {
    site_id.and_then(key_of).or_else(|| id.and_then(key_of))
}

/// A loaded catalog: typed records plus the raw JSON they came from
#[derive(Debug, Clone)]
pub struct SiteCatalog {
    pub records: Vec<SiteRecord>,
    raw: Vec<Value>,
}

// `updated_at` is informational; a bad stamp is logged and dropped
fn parse_updated_at(site_id: &str, raw: &str) -> Option<NaiveDateTime> {
    match raw.parse::<NaiveDateTime>() {
        Ok(stamp) => Some(stamp),
        Err(e) => {
            warn!(site = site_id, value = raw, "Ignoring malformed updated_at: {}", e);
            None
        }
    }
}

impl SiteCatalog {
    /// Load a JSON array of site entries
    pub fn from_file(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read site catalog: {}", path))?;
        Self::from_json(&content).with_context(|| format!("Failed to parse site catalog: {}", path))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let raw: Vec<Value> = serde_json::from_str(content)?;
        let records = raw
            .iter()
            .enumerate()
            .map(|(i, value)| {
                let entry: CatalogEntry = serde_json::from_value(value.clone())
                    .with_context(|| format!("Invalid site entry #{}", i + 1))?;
                let site_id = entry_key(entry.site_id.as_ref(), entry.id.as_ref())
                    .with_context(|| format!("Site entry #{} has no site_id or id", i + 1))?;
                Ok(SiteRecord {
                    name: entry.name,
                    power_cap_w: entry.power,
                    miners: entry.miners,
                    inference: entry.inference,
                    energy_prices: entry.energy_prices,
                    updated_at: entry
                        .updated_at
                        .as_deref()
                        .and_then(|raw| parse_updated_at(&site_id, raw)),
                    site_id,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { records, raw })
    }

    /// Find one site by id
    pub fn site(&self, site_id: &str) -> Option<&SiteRecord> {
        self.records.iter().find(|r| r.site_id == site_id)
    }

    /// Write the catalog back with `optimal_machines` taken from `records`,
    /// preserving every field the optimiser does not model
    pub fn write_annotated(&self, records: &[SiteRecord], path: &str) -> Result<()> {
        let mut raw = self.raw.clone();
        for entry in &mut raw {
            let key = entry_key(entry.get("site_id"), entry.get("id"));
            let Some(record) = key.and_then(|k| records.iter().find(|r| r.site_id == k)) else {
                continue;
            };

            for (kind, miner) in &record.miners {
                if let (Some(count), Some(slot)) =
                    (miner.optimal_machines, entry.pointer_mut(&format!("/miners/{kind}")))
                {
                    slot["optimal_machines"] = Value::from(count);
                }
            }
            for (kind, accel) in &record.inference {
                if let (Some(count), Some(slot)) =
                    (accel.optimal_machines, entry.pointer_mut(&format!("/inference/{kind}")))
                {
                    slot["optimal_machines"] = Value::from(count);
                }
            }
        }

        let content = serde_json::to_string_pretty(&raw)?;
        fs::write(path, content).with_context(|| format!("Failed to write catalog: {}", path))
    }
}

// ============= Optimisation Data Payload =============

type Nested = BTreeMap<String, BTreeMap<String, f64>>;

/// The `optimization-data` wire payload exchanged with the site dashboard
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationData {
    pub sites: Vec<String>,
    pub devices: Vec<String>,
    #[serde(rename = "T")]
    pub horizon: usize,
    pub r_hash: Nested,
    pub r_tok: Nested,
    pub power: Nested,
    #[serde(rename = "N")]
    pub fleet_caps: Nested,
    pub h: Vec<f64>,
    pub g: Vec<f64>,
    pub e: BTreeMap<String, Vec<f64>>,
    #[serde(rename = "P_MAX")]
    pub power_caps: BTreeMap<String, f64>,
    #[serde(rename = "E_BUDGET", default)]
    pub energy_budget: Option<f64>,
}

fn nested_get(map: &Nested, site: &str, device: &str) -> Option<f64> {
    map.get(site).and_then(|row| row.get(device)).copied()
}

impl OptimizationData {
    pub fn from_file(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read payload: {}", path))?;
        serde_json::from_str(&content).with_context(|| format!("Failed to parse payload: {}", path))
    }

    /// Convert to a static allocation request.
    ///
    /// A `(site, device)` cell is only filled when all of `r_hash`, `r_tok`, `power`
    /// and `N` carry it; the optimiser then reports any gap as a missing key.
    pub fn into_request(self) -> Result<StaticAllocationRequest> {
        let mut device_params: BTreeMap<String, BTreeMap<String, DeviceParams>> = BTreeMap::new();
        for site in &self.sites {
            let row = device_params.entry(site.clone()).or_default();
            for device in &self.devices {
                let (Some(hash_yield), Some(token_yield), Some(power_w), Some(cap)) = (
                    nested_get(&self.r_hash, site, device),
                    nested_get(&self.r_tok, site, device),
                    nested_get(&self.power, site, device),
                    nested_get(&self.fleet_caps, site, device),
                ) else {
                    continue;
                };
                if cap < 0.0 || cap.fract() != 0.0 || cap > f64::from(u32::MAX) {
                    anyhow::bail!("N[{}][{}] must be a non-negative integer, got {}", site, device, cap);
                }
                row.insert(
                    device.clone(),
                    DeviceParams {
                        power_w,
                        fleet_cap: cap as u32,
                        hash_yield,
                        token_yield,
                    },
                );
            }
        }

        Ok(StaticAllocationRequest {
            sites: self.sites,
            devices: self.devices,
            horizon_length: self.horizon,
            device_params,
            energy_prices: self.e,
            hash_prices: self.h,
            token_prices: self.g,
            power_caps: self.power_caps,
            energy_budget: self.energy_budget,
        })
    }
}

/// Response body mirroring the optimiser service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationResponse {
    pub status: SolveStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optimal_allocation: Option<Allocation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_profit: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_devices: Option<u64>,
}

impl OptimizationResponse {
    pub fn from_result(result: &AllocationResult) -> Self {
        Self {
            status: result.status,
            optimal_allocation: result.allocation.clone(),
            total_profit: result.objective_value,
            total_devices: result.allocation.as_ref().map(Allocation::total_units),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const CATALOG: &str = r#"[
      {
        "id": 1,
        "name": "Texas Solar Farm Alpha",
        "lat": 31.9686,
        "inference": { "gpu": { "max_machines": 10, "power": 5000, "tokens": 1000 } },
        "miners": { "air": { "max_machines": 10, "hashrate": 1000, "power": 3500 } },
        "power": 1000000,
        "site_id": 1,
        "updated_at": "2025-06-21T13:17:50.126193"
      },
      {
        "site_id": "ND",
        "power_cap_w": 50000,
        "miners": { "hydro": { "max_machines": 4, "hashrate": 5000, "power": 5000 } }
      }
    ]"#;

    fn temp_file(content: &str, suffix: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_catalog_accepts_registry_shape() {
        let catalog = SiteCatalog::from_json(CATALOG).unwrap();
        assert_eq!(catalog.records.len(), 2);

        let tx = catalog.site("1").unwrap();
        assert_eq!(tx.name.as_deref(), Some("Texas Solar Farm Alpha"));
        assert_eq!(tx.power_cap_w, 1_000_000.0);
        assert_eq!(tx.inference["gpu"].tokens, 1000.0);
        assert!(tx.updated_at.is_some());

        let nd = catalog.site("ND").unwrap();
        assert_eq!(nd.power_cap_w, 50000.0);
        assert!(nd.inference.is_empty());
    }

    #[test]
    fn test_malformed_updated_at_is_dropped() {
        let catalog = SiteCatalog::from_json(
            r#"[
              { "site_id": "A", "power": 10, "updated_at": "last tuesday" },
              { "site_id": "B", "power": 10, "updated_at": "2025-06-21T13:17:50" }
            ]"#,
        )
        .unwrap();
        assert!(catalog.site("A").unwrap().updated_at.is_none());
        assert!(catalog.site("B").unwrap().updated_at.is_some());
        assert_eq!(parse_updated_at("A", "2025-13-01T00:00:00"), None);
    }

    #[test]
    fn test_catalog_without_id_is_rejected() {
        let err = SiteCatalog::from_json(r#"[{ "power": 1 }]"#).unwrap_err();
        assert!(format!("{err:#}").contains("no site_id or id"));
    }

    #[test]
    fn test_annotated_catalog_keeps_unknown_fields() {
        let catalog = SiteCatalog::from_json(CATALOG).unwrap();
        let mut records = catalog.records.clone();
        records[0].miners.get_mut("air").unwrap().optimal_machines = Some(7);
        records[0].inference.get_mut("gpu").unwrap().optimal_machines = Some(2);

        let out = NamedTempFile::new().unwrap();
        let path = out.path().to_str().unwrap();
        catalog.write_annotated(&records, path).unwrap();

        let written: Vec<Value> = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(written[0]["lat"], 31.9686);
        assert_eq!(written[0]["miners"]["air"]["optimal_machines"], 7);
        assert_eq!(written[0]["inference"]["gpu"]["optimal_machines"], 2);
        assert!(written[1]["miners"]["hydro"].get("optimal_machines").is_none());
    }

    #[test]
    fn test_csv_prices_load_in_order() {
        let file = temp_file(
            "hash_price,token_price,energy_price\n0.002,0.01,0.00005\n0.003,0.02,-0.00001\n",
            ".csv",
        );
        let snaps = price_loader_for_path(file.path().to_str().unwrap())
            .load()
            .unwrap();
        assert_eq!(snaps.len(), 2);
        assert_eq!(snaps[1].energy_price, -0.00001);
        assert!(snaps[0].timestamp.is_none());
    }

    #[test]
    fn test_bad_csv_row_names_the_row() {
        let file = temp_file("hash_price,token_price,energy_price\n1,2,x\n", ".csv");
        let err = CsvPriceLoader::new(file.path().to_str().unwrap())
            .load()
            .unwrap_err();
        assert!(err.to_string().contains("row 1"));
    }

    #[test]
    fn test_json_prices_and_energy_series() {
        let file = temp_file(
            r#"[{"energy_price": 0.1, "hash_price": 1.0, "token_price": 2.0,
                 "timestamp": "2026-01-15T00:00:00Z"}]"#,
            ".json",
        );
        let snaps = price_loader_for_path(file.path().to_str().unwrap())
            .load()
            .unwrap();
        assert_eq!(snaps.len(), 1);
        assert!(snaps[0].timestamp.is_some());

        let energy = temp_file("energy_price\n0.1\n0.2\n", ".csv");
        assert_eq!(
            load_energy_series(energy.path().to_str().unwrap()).unwrap(),
            vec![0.1, 0.2]
        );
    }

    #[test]
    fn test_payload_converts_to_request() {
        let payload = r#"{
            "sites": ["Texas"], "devices": ["air", "gpu"], "T": 2,
            "r_hash": {"Texas": {"air": 1000, "gpu": 0}},
            "r_tok":  {"Texas": {"air": 0, "gpu": 1000}},
            "power":  {"Texas": {"air": 3500, "gpu": 5000}},
            "N":      {"Texas": {"air": 10}},
            "h": [0.001, 0.001], "g": [0.01, 0.01],
            "e": {"Texas": [0.00004, 0.00004]},
            "P_MAX": {"Texas": 1000000},
            "E_BUDGET": 2.5
        }"#;
        let data: OptimizationData = serde_json::from_str(payload).unwrap();
        let request = data.into_request().unwrap();

        assert_eq!(request.horizon_length, 2);
        assert_eq!(request.energy_budget, Some(2.5));
        assert_eq!(request.device_params["Texas"]["air"].fleet_cap, 10);
        // gpu has no N entry, so the cell stays out and the optimiser reports it
        assert!(!request.device_params["Texas"].contains_key("gpu"));
    }

    #[test]
    fn test_payload_rejects_fractional_fleet_cap() {
        let payload = r#"{
            "sites": ["S"], "devices": ["air"], "T": 1,
            "r_hash": {"S": {"air": 1}}, "r_tok": {"S": {"air": 0}},
            "power": {"S": {"air": 1}}, "N": {"S": {"air": 2.5}},
            "h": [1], "g": [1], "e": {"S": [1]}, "P_MAX": {"S": 10}
        }"#;
        let data: OptimizationData = serde_json::from_str(payload).unwrap();
        assert!(data.into_request().is_err());
    }
}
