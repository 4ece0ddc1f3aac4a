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
use std::fmt;

use serde::{Deserialize, Serialize};

// ============= Solve Outcome =============

/// Terminal status reported by a solver run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolveStatus {
    /// Proven optimum
    Optimal,
    /// Incumbent returned before optimality was proven (time limit)
    FeasibleSuboptimal,
    /// No assignment satisfies the constraints
    Infeasible,
    /// Objective can grow without limit
    Unbounded,
    /// Solver failed, timed out without an incumbent, or was cancelled
    SolverError,
}

impl SolveStatus {
    /// Whether this status carries an assignment
    pub fn has_solution(self) -> bool {
        matches!(self, Self::Optimal | Self::FeasibleSuboptimal)
    }
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Optimal => "optimal",
            Self::FeasibleSuboptimal => "feasible (suboptimal)",
            Self::Infeasible => "infeasible",
            Self::Unbounded => "unbounded",
            Self::SolverError => "solver error",
        };
        f.write_str(label)
    }
}

// ============= Dispatch (dynamic mode) =============

/// Active unit counts per device and interval for one site
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceSchedule {
    pub counts: BTreeMap<String, Vec<u32>>,
}

impl DeviceSchedule {
    /// Units of `device` active in interval `t`, zero when unknown
    pub fn get(&self, device: &str, t: usize) -> u32 {
        self.counts
            .get(device)
            .and_then(|series| series.get(t))
            .copied()
            .unwrap_or(0)
    }

    /// Number of intervals covered
    pub fn horizon_len(&self) -> usize {
        self.counts.values().map(Vec::len).max().unwrap_or(0)
    }

    /// True when every device is off in interval `t`
    pub fn is_dark(&self, t: usize) -> bool {
        self.counts.keys().all(|d| self.get(d, t) == 0)
    }
}

/// Result of a single-site dynamic dispatch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchResult {
    pub status: SolveStatus,

    /// Present for `Optimal` and `FeasibleSuboptimal`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<DeviceSchedule>,

    /// Profit recomputed from the returned counts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objective_value: Option<f64>,
}

impl DispatchResult {
    /// A result without a schedule
    pub fn without_solution(status: SolveStatus) -> Self {
        Self {
            status,
            schedule: None,
            objective_value: None,
        }
    }
}

// ============= Allocation (static mode) =============

/// Installed unit counts per site and device
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Allocation {
    pub counts: BTreeMap<String, BTreeMap<String, u32>>,
}

impl Allocation {
    /// Units of `device` at `site`, zero when unknown
    pub fn get(&self, site: &str, device: &str) -> u32 {
        self.counts
            .get(site)
            .and_then(|devices| devices.get(device))
            .copied()
            .unwrap_or(0)
    }

    pub fn set(&mut self, site: &str, device: &str, count: u32) {
        self.counts
            .entry(site.to_owned())
            .or_default()
            .insert(device.to_owned(), count);
    }

    /// Iterate `(site, device, count)` in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, u32)> {
        self.counts.iter().flat_map(|(site, devices)| {
            devices
                .iter()
                .map(move |(device, &count)| (site.as_str(), device.as_str(), count))
        })
    }

    /// Total units across every site and device
    pub fn total_units(&self) -> u64 {
        self.iter().map(|(_, _, c)| u64::from(c)).sum()
    }
}

/// Result of a static multi-site allocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationResult {
    pub status: SolveStatus,

    /// Present for `Optimal` and `FeasibleSuboptimal`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allocation: Option<Allocation>,

    /// Profit recomputed from the returned counts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objective_value: Option<f64>,
}

impl AllocationResult {
    /// A result without an allocation
    pub fn without_solution(status: SolveStatus) -> Self {
        Self {
            status,
            allocation: None,
            objective_value: None,
        }
    }
}

/// Human-facing digest of an allocation
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AllocationSummary {
    /// Profit over the horizon
    pub total_profit: f64,

    /// Units per device summed over all sites
    pub per_device_counts: BTreeMap<String, u64>,

    /// Power drawn per site (W) by the allocated units
    pub per_site_power_w: BTreeMap<String, f64>,

    /// Energy cost over the horizon
    pub total_energy_cost: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocation_accessors() {
        let mut alloc = Allocation::default();
        alloc.set("TX", "air", 3);
        alloc.set("TX", "gpu", 2);
        alloc.set("ND", "air", 1);

        assert_eq!(alloc.get("TX", "air"), 3);
        assert_eq!(alloc.get("ND", "gpu"), 0);
        assert_eq!(alloc.get("XX", "air"), 0);
        assert_eq!(alloc.total_units(), 6);

        let json = serde_json::to_value(&alloc).unwrap();
        assert_eq!(json["TX"]["gpu"], 2);
    }

    #[test]
    fn test_schedule_dark_interval() {
        let mut schedule = DeviceSchedule::default();
        schedule.counts.insert("air".to_owned(), vec![2, 0, 5]);
        schedule.counts.insert("gpu".to_owned(), vec![1, 0, 0]);

        assert_eq!(schedule.horizon_len(), 3);
        assert!(!schedule.is_dark(0));
        assert!(schedule.is_dark(1));
        assert!(!schedule.is_dark(2));
        assert_eq!(schedule.get("air", 2), 5);
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&SolveStatus::FeasibleSuboptimal).unwrap();
        assert_eq!(json, "\"feasible_suboptimal\"");
        assert!(SolveStatus::Optimal.has_solution());
        assert!(!SolveStatus::Infeasible.has_solution());
    }
}
