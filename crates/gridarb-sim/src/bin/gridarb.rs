// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of GridArb.

//! CLI entry point for the GridArb optimiser

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use gridarb_core::builder::{build_dynamic, build_static};
use gridarb_core::{
    DynamicDispatchRequest, SolveOptions, SolverBackend, annotate_site_records,
    optimize_dynamic_dispatch, optimize_site_window, optimize_static_allocation,
    summarize_allocation,
};
use gridarb_sim::cli::{
    AllocateArgs, Cli, Commands, CsvFormatter, DispatchArgs, LpFormatter, OptimizationData,
    OptimizationResponse, PriceLoader, ProblemConfig, SiteCatalog, SyntheticLoader,
    TableFormatter, WindowArgs, args::PriceArgs, data_loaders::load_devices,
    data_loaders::price_loader_for_path,
};
use gridarb_sim::price_scenarios::MarketScenario;
use gridarb_types::{HorizonPrices, PriceSnapshot};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("gridarb=info,gridarb_core=info,gridarb_sim=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Dispatch(args) => dispatch_command(args),
        Commands::Allocate(args) => allocate_command(args),
        Commands::Window(args) => window_command(args),
        Commands::ExampleConfig => {
            print!("{}", ProblemConfig::example_toml());
            Ok(())
        }
    }
}

#[cfg(feature = "highs")]
fn solver() -> Box<dyn SolverBackend> {
    Box::new(gridarb_core::HighsSolver)
}

#[cfg(not(feature = "highs"))]
fn solver() -> Box<dyn SolverBackend> {
    Box::new(gridarb_core::MicroLpSolver)
}

fn solve_options(time_limit_secs: f64) -> Result<SolveOptions> {
    let limit = Duration::try_from_secs_f64(time_limit_secs).with_context(|| {
        format!(
            "Invalid time limit: {}\n\nExpected a non-negative number of seconds.",
            time_limit_secs
        )
    })?;
    Ok(SolveOptions::with_time_limit(limit))
}

fn load_snapshots(args: &PriceArgs) -> Result<Vec<PriceSnapshot>> {
    // Create price loader based on input source
    let loader: Box<dyn PriceLoader> = if let Some(path) = &args.prices {
        price_loader_for_path(path)
    } else {
        let scenario = MarketScenario::from_id(&args.scenario).with_context(|| {
            format!(
                "Unknown scenario '{}'\n\n\
                Available: steady, volatile, negative_energy, hash_rally, token_slump",
                args.scenario
            )
        })?;
        Box::new(SyntheticLoader {
            scenario,
            start: Utc::now(),
            horizon: args.horizon,
        })
    };

    loader.load()
}

fn dispatch_command(args: DispatchArgs) -> Result<()> {
    let output_mode = args.output.output.to_lowercase();
    if (output_mode == "csv" || output_mode == "both") && args.output.csv_path.is_none() {
        anyhow::bail!("--csv-path is required when --output is 'csv' or 'both'");
    }

    let devices = load_devices(&args.devices)?;
    let prices = HorizonPrices::from_snapshots(&load_snapshots(&args.prices)?);

    let request = DynamicDispatchRequest {
        devices,
        power_cap_w: args.power_cap,
        prices,
        switching: args.switching.into(),
    };

    if let Some(lp_path) = &args.lp {
        LpFormatter::write_program(&build_dynamic(&request)?.program, lp_path)?;
        info!(path = %lp_path, "Wrote LP model");
    }

    info!(
        devices = request.devices.len(),
        intervals = request.prices.len(),
        "Running dispatch"
    );
    let solver = solver();
    let result =
        optimize_dynamic_dispatch(&request, solver.as_ref(), &solve_options(args.solver.time_limit)?)?;

    // Display table output
    if output_mode == "table" || output_mode == "both" {
        println!("\n{}", TableFormatter::format_schedule(&result, &request.prices));
    }

    // Export CSV
    if let Some(csv_path) = args.output.csv_path.as_ref().filter(|_| output_mode != "table") {
        let schedule = result
            .schedule
            .as_ref()
            .with_context(|| format!("No schedule to export (status: {})", result.status))?;
        CsvFormatter::write_schedule(schedule, &request.prices, csv_path)
            .with_context(|| format!("Failed to write CSV to {}", csv_path))?;
        println!("CSV exported to: {}", csv_path);
    }

    Ok(())
}

fn allocate_command(args: AllocateArgs) -> Result<()> {
    if let Some(payload_path) = &args.payload {
        return allocate_payload(payload_path, &args);
    }

    let config_path = args
        .config
        .as_deref()
        .context("--config or --payload is required")?;
    let mut config = ProblemConfig::from_file(config_path)
        .with_context(|| format!("Failed to load problem file from {}", config_path))?;
    if let Some(secs) = args.time_limit {
        config.problem.solver = solve_options(secs)?;
    }

    let catalog = SiteCatalog::from_file(&config.problem.catalog)?;
    let request = config.build_request(&catalog, Utc::now())?;
    if let Some(lp_path) = &args.lp {
        LpFormatter::write_program(&build_static(&request)?.program, lp_path)?;
        info!(path = %lp_path, "Wrote LP model");
    }

    info!(
        sites = request.sites.len(),
        devices = request.devices.len(),
        intervals = request.horizon_length,
        "Running allocation"
    );
    let solver = solver();
    let result = optimize_static_allocation(&request, solver.as_ref(), &config.problem.solver)?;

    let summary = result
        .allocation
        .as_ref()
        .map(|allocation| summarize_allocation(&request, allocation))
        .transpose()?;

    if args.json {
        let response = OptimizationResponse::from_result(&result);
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else if config.output.format != "csv" {
        println!("\n{}", TableFormatter::format_allocation(&result));
        if let Some(summary) = &summary {
            println!("{}", TableFormatter::format_summary(summary, &request.power_caps));
        }
    }

    if config.output.format != "table" {
        if let Some(csv_path) = &config.output.csv_path {
            CsvFormatter::write_allocation(&result, csv_path)
                .with_context(|| format!("Failed to write CSV to {}", csv_path))?;
            println!("CSV exported to: {}", csv_path);
        }
    }

    let annotate_path = args.annotate.as_ref().or(config.output.annotated_catalog.as_ref());
    if let (Some(path), Some(allocation)) = (annotate_path, &result.allocation) {
        let mut records = catalog.records.clone();
        annotate_site_records(&mut records, allocation);
        catalog.write_annotated(&records, path)?;
        println!("Annotated catalog written to: {}", path);
    }

    Ok(())
}

fn allocate_payload(path: &str, args: &AllocateArgs) -> Result<()> {
    let request = OptimizationData::from_file(path)?.into_request()?;
    if let Some(lp_path) = &args.lp {
        LpFormatter::write_program(&build_static(&request)?.program, lp_path)?;
        info!(path = %lp_path, "Wrote LP model");
    }
    let options = match args.time_limit {
        Some(secs) => solve_options(secs)?,
        None => SolveOptions::default(),
    };

    let solver = solver();
    let result = optimize_static_allocation(&request, solver.as_ref(), &options)?;

    if args.json {
        let response = OptimizationResponse::from_result(&result);
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        println!("\n{}", TableFormatter::format_allocation(&result));
    }

    Ok(())
}

fn window_command(args: WindowArgs) -> Result<()> {
    let catalog = SiteCatalog::from_file(&args.catalog)?;
    let site = catalog.site(&args.site).with_context(|| {
        let known: Vec<&str> = catalog.records.iter().map(|r| r.site_id.as_str()).collect();
        format!("Site '{}' not found in catalog (known: {})", args.site, known.join(", "))
    })?;

    let snapshots = load_snapshots(&args.prices)?;
    let solver = solver();
    let result = optimize_site_window(
        site,
        &snapshots,
        solver.as_ref(),
        &solve_options(args.solver.time_limit)?,
    )?;

    println!("\n{}", TableFormatter::format_allocation(&result));

    if let Some(allocation) = &result.allocation {
        let used: f64 = site
            .miners
            .iter()
            .map(|(kind, m)| f64::from(allocation.get(&site.site_id, kind)) * m.power)
            .chain(
                site.inference
                    .iter()
                    .map(|(kind, i)| f64::from(allocation.get(&site.site_id, kind)) * i.power),
            )
            .sum();
        println!(
            "Power: {:.0} / {:.0} W over {} snapshots",
            used,
            site.power_cap_w,
            snapshots.len()
        );
    }

    Ok(())
}
