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

//! Downtime constraints between adjacent intervals.
//!
//! Reconfiguring a device's unit count costs a full interval of downtime. For every
//! `t >= 1` a binary switch indicator `y` is introduced and three rows tie it to the
//! unit counts of device `d`:
//!
//! ```text
//! x[d,t]   - x[d,t-1] <= cap_d * y
//! x[d,t-1] - x[d,t]   <= cap_d * y
//! x[d,t]              <= cap_d * (1 - y)
//! ```
//!
//! The first two force `y = 1` on any change, the third forces the device dark while
//! `y = 1`. Which devices share an indicator is the policy.

use serde::{Deserialize, Serialize};

use crate::model::{IntegerProgram, VarId};

/// How switch indicators are shared between co-located devices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwitchingPolicy {
    /// One indicator per interval: any change blacks out the whole site
    #[default]
    SharedBlackout,
    /// One indicator per device and interval: only the reconfigured device goes dark
    PerDevice,
}

/// Switch indicators created for a horizon
#[derive(Debug, Clone, PartialEq)]
pub enum SwitchVars {
    /// `shared[t-1]` is `y[t]`
    Shared(Vec<VarId>),
    /// `per_device[d][t-1]` is `y[d,t]`
    PerDevice(Vec<Vec<VarId>>),
}

impl SwitchVars {
    /// Indicator governing device `d` at interval `t >= 1`
    pub fn for_device(&self, d: usize, t: usize) -> Option<VarId> {
        let index = t.checked_sub(1)?;
        match self {
            Self::Shared(ys) => ys.get(index).copied(),
            Self::PerDevice(ys) => ys.get(d).and_then(|row| row.get(index)).copied(),
        }
    }

    /// All indicator variables
    pub fn all(&self) -> Vec<VarId> {
        match self {
            Self::Shared(ys) => ys.clone(),
            Self::PerDevice(ys) => ys.iter().flatten().copied().collect(),
        }
    }
}

/// Add switch indicators and downtime rows.
///
/// `grid[d][t]` is the unit-count variable of device `d` at interval `t`; `caps[d]` its
/// fleet cap; `labels[d]` its id for row names.
pub fn add_switching_constraints(
    program: &mut IntegerProgram,
    grid: &[Vec<VarId>],
    caps: &[u32],
    labels: &[String],
    policy: SwitchingPolicy,
) -> SwitchVars {
    let horizon = grid.first().map_or(0, Vec::len);
    if horizon < 2 {
        return match policy {
            SwitchingPolicy::SharedBlackout => SwitchVars::Shared(Vec::new()),
            SwitchingPolicy::PerDevice => SwitchVars::PerDevice(vec![Vec::new(); grid.len()]),
        };
    }

    let switches = match policy {
        SwitchingPolicy::SharedBlackout => SwitchVars::Shared(
            (1..horizon)
                .map(|t| program.add_binary(format!("y[{t}]")))
                .collect(),
        ),
        SwitchingPolicy::PerDevice => SwitchVars::PerDevice(
            labels
                .iter()
                .map(|device| {
                    (1..horizon)
                        .map(|t| program.add_binary(format!("y[{device},{t}]")))
                        .collect()
                })
                .collect(),
        ),
    };

    for (d, series) in grid.iter().enumerate() {
        let cap = f64::from(caps[d]);
        let device = &labels[d];
        for t in 1..horizon {
            let Some(y) = switches.for_device(d, t) else {
                continue;
            };
            let (now, prev) = (series[t], series[t - 1]);
            program.add_leq(
                format!("ramp_up[{device},{t}]"),
                vec![(now, 1.0), (prev, -1.0), (y, -cap)],
                0.0,
            );
            program.add_leq(
                format!("ramp_down[{device},{t}]"),
                vec![(prev, 1.0), (now, -1.0), (y, -cap)],
                0.0,
            );
            program.add_leq(format!("downtime[{device},{t}]"), vec![(now, 1.0), (y, cap)], cap);
        }
    }

    switches
}
