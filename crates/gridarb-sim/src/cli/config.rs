// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of GridArb.

//! TOML problem files for the `allocate` command.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use gridarb_core::{SolveOptions, StaticAllocationRequest, normalize};
use gridarb_types::HorizonPrices;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;

use super::data_loaders::{
    CsvPriceLoader, JsonPriceLoader, PriceLoader, SiteCatalog, SyntheticLoader,
    load_energy_series,
};
use crate::price_scenarios::MarketScenario;

/// Root of a problem file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProblemConfig {
    /// Catalog, horizon, budget and solver settings
    pub problem: ProblemParams,

    /// Where hash/token (and fallback energy) prices come from
    pub prices: PriceSource,

    /// Per-site energy series files, overriding catalog and global energy prices
    #[serde(default)]
    pub site_energy: BTreeMap<String, String>,

    /// Output configuration
    #[serde(default)]
    pub output: OutputConfig,
}

/// Problem parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProblemParams {
    /// Path to the JSON site catalog
    pub catalog: String,

    /// Horizon length in intervals (synthetic prices only; files define their own)
    #[serde(default = "default_horizon")]
    pub horizon: usize,

    /// Global energy-spend budget over the horizon
    #[serde(default)]
    pub energy_budget: Option<f64>,

    /// Solver time limit
    #[serde(default)]
    pub solver: SolveOptions,
}

/// Source of the price horizon
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PriceSource {
    /// Generate prices from a market scenario preset
    #[serde(rename = "synthetic")]
    Synthetic {
        /// Scenario id (steady, volatile, negative_energy, hash_rally, token_slump)
        #[serde(default = "default_scenario")]
        scenario: String,
    },

    /// CSV file with `hash_price,token_price,energy_price` columns
    #[serde(rename = "csv")]
    Csv { path: String },

    /// JSON file holding an array of price snapshots
    #[serde(rename = "json")]
    Json { path: String },
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Output format (table, csv, both)
    #[serde(default = "default_output_format")]
    pub format: String,

    /// Where to write the allocation CSV
    #[serde(default)]
    pub csv_path: Option<String>,

    /// Where to write the catalog annotated with `optimal_machines`
    #[serde(default)]
    pub annotated_catalog: Option<String>,
}

// Default value functions
fn default_horizon() -> usize {
    24
}

fn default_scenario() -> String {
    "steady".to_string()
}

fn default_output_format() -> String {
    "table".to_string()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: default_output_format(),
            csv_path: None,
            annotated_catalog: None,
        }
    }
}

impl ProblemConfig {
    /// Load a problem file
    pub fn from_file(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        let config: ProblemConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config: {}", path))?;

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the optimiser would only fail on later
    pub fn validate(&self) -> Result<()> {
        if self.problem.horizon == 0 {
            anyhow::bail!("problem.horizon must be at least 1");
        }
        if self.problem.energy_budget.is_some_and(|b| !b.is_finite()) {
            anyhow::bail!("problem.energy_budget must be a finite number");
        }
        if !matches!(self.output.format.as_str(), "table" | "csv" | "both") {
            anyhow::bail!(
                "output.format must be table, csv or both (got '{}')",
                self.output.format
            );
        }
        if self.output.format != "table" && self.output.csv_path.is_none() {
            anyhow::bail!("output.csv_path is required when output.format is csv or both");
        }
        Ok(())
    }

    /// Loader for the configured price source; synthetic horizons start at `start`
    pub fn price_loader(&self, start: DateTime<Utc>) -> Result<Box<dyn PriceLoader>> {
        Ok(match &self.prices {
            PriceSource::Synthetic { scenario } => {
                let scenario = MarketScenario::from_id(scenario)
                    .with_context(|| format!("Unknown market scenario '{}'", scenario))?;
                Box::new(SyntheticLoader {
                    scenario,
                    start,
                    horizon: self.problem.horizon,
                })
            }
            PriceSource::Csv { path } => Box::new(CsvPriceLoader::new(path.as_str())),
            PriceSource::Json { path } => Box::new(JsonPriceLoader::new(path.as_str())),
        })
    }

    /// Build the allocation request for `catalog`.
    ///
    /// Each site's energy series comes from its `site_energy` file, else from the
    /// catalog record, else from the energy column of the price source.
    pub fn build_request(
        &self,
        catalog: &SiteCatalog,
        start: DateTime<Utc>,
    ) -> Result<StaticAllocationRequest> {
        let snapshots = self.price_loader(start)?.load()?;
        let prices = HorizonPrices::from_snapshots(&snapshots);

        if let Some(site) = self
            .site_energy
            .keys()
            .find(|site| catalog.site(site).is_none())
        {
            anyhow::bail!("site_energy names unknown site '{}'", site);
        }

        let mut overrides = BTreeMap::new();
        for record in &catalog.records {
            if let Some(path) = self.site_energy.get(&record.site_id) {
                overrides.insert(record.site_id.clone(), load_energy_series(path)?);
            } else if record.energy_prices.is_none() {
                overrides.insert(record.site_id.clone(), prices.energy.clone());
            }
        }

        let request = normalize(&catalog.records)?.static_request(
            prices.hash,
            prices.token,
            &overrides,
            self.problem.energy_budget,
        )?;
        Ok(request)
    }

    /// Generate an example problem file as a TOML string
    pub fn example_toml() -> String {
        r#"# GridArb - Static Allocation Problem Example

[problem]
catalog = "sites.json"
horizon = 24
energy_budget = 1500.0     # omit for no global budget

[problem.solver]
time_limit_secs = 30

# Prices: synthetic scenario, CSV or JSON snapshots
[prices]
type = "synthetic"
scenario = "steady"        # steady, volatile, negative_energy, hash_rally, token_slump

# [prices]
# type = "csv"
# path = "prices.csv"      # columns: hash_price,token_price,energy_price

# Optional per-site energy series (one energy_price column)
[site_energy]
# "1" = "texas_energy.csv"

[output]
format = "table"           # table, csv, or both
# csv_path = "allocation.csv"
annotated_catalog = "sites.optimized.json"
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::io::Write;
    use std::time::Duration;

    fn write_temp(dir: &tempfile::TempDir, name: &str, content: &str) -> String {
        let path = dir.path().join(name);
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path.to_str().unwrap().to_string()
    }

    #[test]
    fn test_example_toml_parses() {
        let config: ProblemConfig = toml::from_str(&ProblemConfig::example_toml()).unwrap();
        config.validate().unwrap();

        assert_eq!(config.problem.catalog, "sites.json");
        assert_eq!(config.problem.horizon, 24);
        assert_eq!(config.problem.energy_budget, Some(1500.0));
        assert_eq!(config.problem.solver.time_limit, Duration::from_secs(30));
        assert!(matches!(
            config.prices,
            PriceSource::Synthetic { ref scenario } if scenario == "steady"
        ));
        assert!(config.site_energy.is_empty());
        assert_eq!(
            config.output.annotated_catalog.as_deref(),
            Some("sites.optimized.json")
        );
    }

    #[test]
    fn test_defaults_apply() {
        let config: ProblemConfig = toml::from_str(
            r#"
[problem]
catalog = "c.json"

[prices]
type = "csv"
path = "p.csv"
"#,
        )
        .unwrap();

        assert_eq!(config.problem.horizon, 24);
        assert_eq!(config.problem.energy_budget, None);
        assert_eq!(config.problem.solver.time_limit, Duration::from_secs(30));
        assert_eq!(config.output.format, "table");
        config.validate().unwrap();
    }

    #[test]
    fn test_validation_rejects_csv_without_path() {
        let mut config: ProblemConfig = toml::from_str(&ProblemConfig::example_toml()).unwrap();
        config.output.format = "csv".to_string();
        config.output.csv_path = None;
        assert!(config.validate().is_err());

        config.output.format = "xml".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_energy_series_resolution_order() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = SiteCatalog::from_json(
            r#"[
              {"site_id": "A", "power": 1000, "miners": {"air": {"max_machines": 2, "hashrate": 1, "power": 10}}},
              {"site_id": "B", "power": 1000, "energy_prices": [0.5, 0.5],
               "miners": {"air": {"max_machines": 2, "hashrate": 1, "power": 10}}},
              {"site_id": "C", "power": 1000, "energy_prices": [0.7, 0.7],
               "miners": {"air": {"max_machines": 2, "hashrate": 1, "power": 10}}}
            ]"#,
        )
        .unwrap();
        let prices = write_temp(
            &dir,
            "prices.csv",
            "hash_price,token_price,energy_price\n1,2,0.1\n1,2,0.2\n",
        );
        let energy_c = write_temp(&dir, "c.csv", "energy_price\n0.9\n0.9\n");

        let config: ProblemConfig = toml::from_str(&format!(
            r#"
[problem]
catalog = "unused.json"
energy_budget = 5.0

[prices]
type = "csv"
path = "{prices}"

[site_energy]
C = "{energy_c}"
"#
        ))
        .unwrap();

        let start = Utc.with_ymd_and_hms(2026, 1, 15, 0, 0, 0).unwrap();
        let request = config.build_request(&catalog, start).unwrap();

        assert_eq!(request.horizon_length, 2);
        assert_eq!(request.energy_budget, Some(5.0));
        assert_eq!(request.energy_prices["A"], vec![0.1, 0.2]);
        assert_eq!(request.energy_prices["B"], vec![0.5, 0.5]);
        assert_eq!(request.energy_prices["C"], vec![0.9, 0.9]);
    }

    #[test]
    fn test_unknown_site_energy_key_is_rejected() {
        let catalog = SiteCatalog::from_json(r#"[{"site_id": "A", "power": 10}]"#).unwrap();
        let config: ProblemConfig = toml::from_str(
            r#"
[problem]
catalog = "unused.json"
horizon = 3

[prices]
type = "synthetic"

[site_energy]
Z = "z.csv"
"#,
        )
        .unwrap();

        let start = Utc.with_ymd_and_hms(2026, 1, 15, 0, 0, 0).unwrap();
        let err = config.build_request(&catalog, start).unwrap_err();
        assert!(err.to_string().contains("unknown site 'Z'"));
    }
}
