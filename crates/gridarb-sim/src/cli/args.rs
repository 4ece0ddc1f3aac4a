// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of GridArb.

//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};
use gridarb_core::SwitchingPolicy;

#[derive(Parser)]
#[command(name = "gridarb")]
#[command(author, version, about = "GridArb miner and inference fleet optimiser")]
#[command(
    long_about = "Decide how many hash miners and inference accelerators to run per site\n\
    and interval so that hash and token revenue minus energy cost is maximised.\n\
    \nSupports synthetic market scenarios, CSV/JSON price files and site catalogs.\n\
    \nExamples:\n  \
    gridarb dispatch --devices devices.json --power-cap 500000\n  \
    gridarb allocate --config problem.toml\n  \
    gridarb allocate --payload optimization_data.json\n  \
    gridarb window --catalog sites.json --site 1 --prices snapshots.json"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Schedule one site over time with a switching blackout
    #[command(
        long_about = "Solve the dynamic single-site schedule: unit counts per device and\n\
        interval under a power cap, where any reconfiguration darkens the site.\n\
        \nPrice Sources (choose one):\n  \
        - Synthetic: --scenario <name> (steady, volatile, negative_energy, hash_rally, token_slump)\n  \
        - CSV: --prices <path.csv>\n  \
        - JSON snapshots: --prices <path.json>\n\
        \nExamples:\n  \
        gridarb dispatch --devices devices.json --power-cap 500000\n  \
        gridarb dispatch --devices devices.json --power-cap 500000 --scenario volatile --horizon 48\n  \
        gridarb dispatch --devices devices.json --power-cap 500000 --switching per_device"
    )]
    Dispatch(DispatchArgs),

    /// Allocate fleets across sites for a whole horizon
    #[command(
        long_about = "Solve the static multi-site allocation: one unit count per site and\n\
        device held for the whole horizon, under per-site power caps and an\n\
        optional global energy budget.\n\
        \nInputs (choose one):\n  \
        - Problem file: --config <problem.toml> (catalog + price source)\n  \
        - Dashboard payload: --payload <optimization_data.json>\n\
        \nExamples:\n  \
        gridarb allocate --config problem.toml\n  \
        gridarb allocate --config problem.toml --annotate sites.optimized.json\n  \
        gridarb allocate --payload optimization_data.json --json"
    )]
    Allocate(AllocateArgs),

    /// Best fixed configuration of one catalog site for a price window
    #[command(
        long_about = "Pick the best fixed configuration for one site over a short window of\n\
        price snapshots. Only the site power cap applies.\n\
        \nExamples:\n  \
        gridarb window --catalog sites.json --site 1 --prices snapshots.json\n  \
        gridarb window --catalog sites.json --site ND --scenario negative_energy --horizon 6"
    )]
    Window(WindowArgs),

    /// Print an example problem file
    ExampleConfig,
}

#[derive(Parser)]
pub struct DispatchArgs {
    /// Device types JSON file
    #[arg(
        long,
        value_name = "PATH",
        help = "JSON array of device types",
        long_help = "JSON array of device types, each with:\n  \
          id, hash_yield, token_yield, power_w, fleet_cap\n\
          \nExample: --devices devices.json"
    )]
    pub devices: String,

    /// Site power cap in watts
    #[arg(long, value_name = "WATTS", help = "Site power cap in watts (must be >= 0)")]
    pub power_cap: f64,

    #[command(flatten)]
    pub prices: PriceArgs,

    /// Switching policy
    #[arg(
        long,
        value_enum,
        default_value_t = SwitchingArg::Shared,
        help = "How reconfigurations are penalised"
    )]
    pub switching: SwitchingArg,

    /// Write the built model in LP format
    #[arg(long, value_name = "PATH", help = "Also write the model as a CPLEX LP file")]
    pub lp: Option<String>,

    #[command(flatten)]
    pub solver: SolverArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}

/// `--switching` values
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum SwitchingArg {
    /// Any change at t darkens every device at t
    Shared,
    /// A change darkens only the device that changed
    #[value(name = "per_device")]
    PerDevice,
}

impl From<SwitchingArg> for SwitchingPolicy {
    fn from(arg: SwitchingArg) -> Self {
        match arg {
            SwitchingArg::Shared => Self::SharedBlackout,
            SwitchingArg::PerDevice => Self::PerDevice,
        }
    }
}

#[derive(Parser)]
pub struct AllocateArgs {
    /// TOML problem file
    #[arg(
        long,
        value_name = "PATH",
        conflicts_with = "payload",
        required_unless_present = "payload",
        help = "Problem file (see `gridarb example-config`)"
    )]
    pub config: Option<String>,

    /// optimization-data JSON payload
    #[arg(
        long,
        value_name = "PATH",
        help = "Dashboard payload with sites, devices, T, r_hash, r_tok, power, N, h, g, e, P_MAX"
    )]
    pub payload: Option<String>,

    /// Write the annotated catalog here (overrides the problem file)
    #[arg(
        long,
        value_name = "PATH",
        requires = "config",
        help = "Where to write the catalog with optimal_machines filled in"
    )]
    pub annotate: Option<String>,

    /// Print the response as JSON instead of tables
    #[arg(long, default_value_t = false, help = "Emit the optimiser response as JSON")]
    pub json: bool,

    /// Solver time limit in seconds (overrides the problem file)
    #[arg(long, value_name = "SECS", help = "Solver time limit in seconds")]
    pub time_limit: Option<f64>,

    /// Write the built model in LP format
    #[arg(long, value_name = "PATH", help = "Also write the model as a CPLEX LP file")]
    pub lp: Option<String>,
}

#[derive(Parser)]
pub struct WindowArgs {
    /// Site catalog JSON file
    #[arg(long, value_name = "PATH", help = "Site catalog (JSON array)")]
    pub catalog: String,

    /// Site to optimise
    #[arg(long, value_name = "ID", help = "site_id (or id) of the site to optimise")]
    pub site: String,

    #[command(flatten)]
    pub prices: PriceArgs,

    #[command(flatten)]
    pub solver: SolverArgs,
}

/// Where prices come from
#[derive(Args)]
pub struct PriceArgs {
    /// Market scenario for synthetic prices
    #[arg(
        long,
        default_value = "steady",
        help = "Synthetic market scenario",
        long_help = "Available scenarios:\n  \
          - steady: flat revenue, day/night energy tariff\n  \
          - volatile: cheap nights, steep evening energy peaks\n  \
          - negative_energy: negative energy prices around midday\n  \
          - hash_rally: hash revenue doubles across the horizon\n  \
          - token_slump: token revenue decays, energy elevated\n\
          \nIgnored when using --prices"
    )]
    pub scenario: String,

    /// Number of synthetic intervals
    #[arg(long, default_value_t = 24, help = "Horizon length for synthetic prices")]
    pub horizon: usize,

    /// Price file (CSV or JSON snapshots)
    #[arg(
        long,
        value_name = "PATH",
        help = "CSV or JSON price file",
        long_help = "CSV with hash_price,token_price,energy_price columns, or a JSON\n\
          array of snapshots. The file decides the horizon length.\n\
          \nExample: --prices prices.csv"
    )]
    pub prices: Option<String>,
}

#[derive(Args)]
pub struct SolverArgs {
    /// Solver time limit in seconds
    #[arg(long, default_value_t = 30.0, value_name = "SECS", help = "Solver time limit in seconds")]
    pub time_limit: f64,
}

#[derive(Args)]
pub struct OutputArgs {
    /// Output format: table, csv, or both
    #[arg(long, default_value = "table",
          value_parser = ["table", "csv", "both"],
          help = "How to display results")]
    pub output: String,

    /// CSV file path (required when output is csv or both)
    #[arg(long, value_name = "PATH", help = "Where to save the CSV export")]
    pub csv_path: Option<String>,
}
