// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of GridArb.

//! Output formatters for dispatch schedules and allocations.

use anyhow::{Context, Result};
use comfy_table::{Attribute, Cell, Color, Table, presets::UTF8_FULL};
use std::collections::BTreeMap;
use std::fs;

use gridarb_core::IntegerProgram;

use gridarb_types::{
    AllocationResult, AllocationSummary, DeviceSchedule, DispatchResult, HorizonPrices,
};

/// Formatter for pretty ASCII tables
pub struct TableFormatter;

/// Formatter for CSV export
pub struct CsvFormatter;

/// Writes the built model in CPLEX LP format for external solvers
pub struct LpFormatter;

fn bold(text: &str) -> Cell {
    Cell::new(text).add_attribute(Attribute::Bold)
}

fn status_line(status: impl std::fmt::Display, objective: Option<f64>) -> String {
    match objective {
        Some(value) => format!("Status: {} | Profit: {:.4}\n", status, value),
        None => format!("Status: {} | no solution\n", status),
    }
}

impl TableFormatter {
    /// Interval-by-interval schedule with prices and a blackout marker
    pub fn format_schedule(result: &DispatchResult, prices: &HorizonPrices) -> String {
        let mut output = String::new();

        let Some(schedule) = &result.schedule else {
            output.push_str(&status_line(result.status, None));
            return output;
        };

        let devices: Vec<&String> = schedule.counts.keys().collect();

        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        let mut header = vec![
            bold("t"),
            bold("Hash\nPrice"),
            bold("Token\nPrice"),
            bold("Energy\nPrice"),
        ];
        header.extend(devices.iter().map(|d| bold(d)));
        header.push(bold("State"));
        table.set_header(header);

        for t in 0..schedule.horizon_len() {
            let mut row = vec![
                Cell::new(t),
                Cell::new(format!("{:.6}", prices.hash.get(t).copied().unwrap_or_default())),
                Cell::new(format!("{:.6}", prices.token.get(t).copied().unwrap_or_default())),
                Cell::new(format!("{:.6}", prices.energy.get(t).copied().unwrap_or_default())),
            ];
            row.extend(devices.iter().map(|d| Cell::new(schedule.get(d, t))));
            row.push(state_cell(schedule, t));
            table.add_row(row);
        }

        output.push_str(&table.to_string());
        output.push('\n');
        output.push_str(&status_line(result.status, result.objective_value));
        output
    }

    /// Site-by-device allocation grid
    pub fn format_allocation(result: &AllocationResult) -> String {
        let mut output = String::new();

        let Some(allocation) = &result.allocation else {
            output.push_str(&status_line(result.status, None));
            return output;
        };

        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(vec![bold("Site"), bold("Device"), bold("Units")]);

        for (site, device, count) in allocation.iter() {
            let count_cell = if count > 0 {
                Cell::new(count).fg(Color::Green).add_attribute(Attribute::Bold)
            } else {
                Cell::new(count)
            };
            table.add_row(vec![Cell::new(site), Cell::new(device), count_cell]);
        }

        output.push_str(&table.to_string());
        output.push('\n');
        output.push_str(&status_line(result.status, result.objective_value));
        output
    }

    /// Totals per device and power per site
    pub fn format_summary(summary: &AllocationSummary, power_caps: &BTreeMap<String, f64>) -> String {
        let mut output = String::new();

        let mut devices = Table::new();
        devices.load_preset(UTF8_FULL);
        devices.set_header(vec![bold("Device"), bold("Total Units")]);
        for (device, count) in &summary.per_device_counts {
            devices.add_row(vec![Cell::new(device), Cell::new(count)]);
        }
        output.push_str(&devices.to_string());
        output.push('\n');

        let mut sites = Table::new();
        sites.load_preset(UTF8_FULL);
        sites.set_header(vec![bold("Site"), bold("Power\n(W)"), bold("Cap\n(W)"), bold("Use\n(%)")]);
        for (site, power) in &summary.per_site_power_w {
            let cap = power_caps.get(site).copied();
            let usage = match cap {
                Some(cap) if cap > 0.0 => format!("{:.1}", power / cap * 100.0),
                _ => "-".to_string(),
            };
            sites.add_row(vec![
                Cell::new(site),
                Cell::new(format!("{:.0}", power)),
                Cell::new(cap.map_or_else(|| "-".to_string(), |c| format!("{:.0}", c))),
                Cell::new(usage),
            ]);
        }
        output.push_str(&sites.to_string());
        output.push('\n');

        output.push_str(&format!(
            "Total profit: {:.4} | Energy cost: {:.4}\n",
            summary.total_profit, summary.total_energy_cost
        ));
        output
    }
}

fn state_cell(schedule: &DeviceSchedule, t: usize) -> Cell {
    if schedule.is_dark(t) {
        Cell::new("dark").fg(Color::DarkGrey)
    } else if t > 0 && schedule.counts.values().any(|c| c.get(t) != c.get(t - 1)) {
        Cell::new("reconfigured").fg(Color::Yellow)
    } else {
        Cell::new("running")
    }
}

impl CsvFormatter {
    /// One row per interval, one column per device
    pub fn write_schedule(schedule: &DeviceSchedule, prices: &HorizonPrices, path: &str) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)
            .with_context(|| format!("Failed to create CSV file: {}", path))?;

        let devices: Vec<&String> = schedule.counts.keys().collect();
        let mut header = vec![
            "interval".to_string(),
            "hash_price".to_string(),
            "token_price".to_string(),
            "energy_price".to_string(),
        ];
        header.extend(devices.iter().map(|d| d.to_string()));
        header.push("dark".to_string());
        writer.write_record(&header)?;

        for t in 0..schedule.horizon_len() {
            let mut row = vec![
                t.to_string(),
                prices.hash.get(t).copied().unwrap_or_default().to_string(),
                prices.token.get(t).copied().unwrap_or_default().to_string(),
                prices.energy.get(t).copied().unwrap_or_default().to_string(),
            ];
            row.extend(devices.iter().map(|d| schedule.get(d, t).to_string()));
            row.push(schedule.is_dark(t).to_string());
            writer.write_record(&row)?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Long-format `site,device,units` rows
    pub fn write_allocation(result: &AllocationResult, path: &str) -> Result<()> {
        let allocation = result
            .allocation
            .as_ref()
            .with_context(|| format!("No allocation to export (status: {})", result.status))?;

        let mut writer = csv::Writer::from_path(path)
            .with_context(|| format!("Failed to create CSV file: {}", path))?;
        writer.write_record(["site", "device", "units"])?;
        for (site, device, count) in allocation.iter() {
            let units = count.to_string();
            writer.write_record([site, device, units.as_str()])?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl LpFormatter {
    pub fn write_program(program: &IntegerProgram, path: &str) -> Result<()> {
        fs::write(path, program.to_lp_string())
            .with_context(|| format!("Failed to write LP file: {}", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridarb_types::{Allocation, SolveStatus};

    fn schedule() -> DeviceSchedule {
        DeviceSchedule {
            counts: BTreeMap::from([
                ("air".to_string(), vec![3, 0, 2]),
                ("gpu".to_string(), vec![1, 0, 1]),
            ]),
        }
    }

    #[test]
    fn test_schedule_table_marks_blackout() {
        let result = DispatchResult {
            status: SolveStatus::Optimal,
            schedule: Some(schedule()),
            objective_value: Some(12.5),
        };
        let prices = HorizonPrices::new(vec![1.0; 3], vec![2.0; 3], vec![0.1; 3]);
        let text = TableFormatter::format_schedule(&result, &prices);

        assert!(text.contains("dark"));
        assert!(text.contains("reconfigured"));
        assert!(text.contains("Profit: 12.5000"));
    }

    #[test]
    fn test_missing_solution_prints_status_only() {
        let text = TableFormatter::format_allocation(&AllocationResult::without_solution(
            SolveStatus::Infeasible,
        ));
        assert_eq!(text, "Status: infeasible | no solution\n");
    }

    #[test]
    fn test_summary_reports_power_use() {
        let summary = AllocationSummary {
            total_profit: 168.0,
            per_device_counts: BTreeMap::from([("gpu".to_string(), 9)]),
            per_site_power_w: BTreeMap::from([("TX".to_string(), 800.0)]),
            total_energy_cost: 16.0,
        };
        let caps = BTreeMap::from([("TX".to_string(), 1000.0)]);
        let text = TableFormatter::format_summary(&summary, &caps);

        assert!(text.contains("80.0"));
        assert!(text.contains("Total profit: 168.0000 | Energy cost: 16.0000"));
    }

    #[test]
    fn test_csv_exports() {
        let dir = tempfile::tempdir().unwrap();

        let schedule_path = dir.path().join("schedule.csv");
        let prices = HorizonPrices::new(vec![1.0; 3], vec![2.0; 3], vec![0.1; 3]);
        CsvFormatter::write_schedule(&schedule(), &prices, schedule_path.to_str().unwrap())
            .unwrap();
        let content = fs::read_to_string(&schedule_path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "interval,hash_price,token_price,energy_price,air,gpu,dark");
        assert_eq!(lines[2], "1,1,2,0.1,0,0,true");

        let mut allocation = Allocation::default();
        allocation.set("TX", "air", 4);
        let result = AllocationResult {
            status: SolveStatus::Optimal,
            allocation: Some(allocation),
            objective_value: Some(1.0),
        };
        let alloc_path = dir.path().join("alloc.csv");
        CsvFormatter::write_allocation(&result, alloc_path.to_str().unwrap()).unwrap();
        assert_eq!(
            fs::read_to_string(&alloc_path).unwrap(),
            "site,device,units\nTX,air,4\n"
        );

        let empty = AllocationResult::without_solution(SolveStatus::Infeasible);
        assert!(CsvFormatter::write_allocation(&empty, alloc_path.to_str().unwrap()).is_err());
    }

    #[test]
    fn test_lp_export() {
        let dir = tempfile::tempdir().unwrap();
        let mut program = IntegerProgram::new();
        let x = program.add_integer("x[TX,air]", 0.0, 3.0);
        program.add_objective_term(x, 2.0);
        program.add_leq("power[TX]", vec![(x, 100.0)], 250.0);

        let path = dir.path().join("model.lp");
        LpFormatter::write_program(&program, path.to_str().unwrap()).unwrap();
        let lp = fs::read_to_string(&path).unwrap();
        assert!(lp.contains(" power[TX]_0: + 100 x[TX_air]_0 <= 250"));
        assert!(lp.ends_with("End\n"));

        let missing = dir.path().join("no_such_dir").join("model.lp");
        assert!(LpFormatter::write_program(&program, missing.to_str().unwrap()).is_err());
    }
}
