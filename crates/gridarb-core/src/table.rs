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

//! Dense `(site, device)` parameter table.
//!
//! The key schema is fixed at construction: an ordered list of site ids and an ordered
//! list of device ids. Every cell exists, so iteration order is stable and lookups either
//! succeed or fail with a `MissingKey` error naming the offending key.

use std::collections::{BTreeMap, HashMap};

use gridarb_types::DeviceParams;

use crate::error::{OptimizeError, OptimizeResult};

#[derive(Debug, Clone, PartialEq)]
pub struct ParamTable {
    sites: Vec<String>,
    devices: Vec<String>,
    site_index: HashMap<String, usize>,
    device_index: HashMap<String, usize>,
    cells: Vec<DeviceParams>,
}

impl ParamTable {
    /// Create a table with every cell set to `DeviceParams::ABSENT`
    pub fn new(sites: Vec<String>, devices: Vec<String>) -> OptimizeResult<Self> {
        let site_index = index_of("site", &sites)?;
        let device_index = index_of("device", &devices)?;
        let cells = vec![DeviceParams::ABSENT; sites.len() * devices.len()];

        Ok(Self {
            sites,
            devices,
            site_index,
            device_index,
            cells,
        })
    }

    /// Build from a sparse nested map, requiring every `(site, device)` entry
    pub fn from_nested(
        sites: &[String],
        devices: &[String],
        params: &BTreeMap<String, BTreeMap<String, DeviceParams>>,
    ) -> OptimizeResult<Self> {
        let mut table = Self::new(sites.to_vec(), devices.to_vec())?;

        for (s, site) in sites.iter().enumerate() {
            let row = params
                .get(site)
                .ok_or_else(|| OptimizeError::missing("device parameters for site", site))?;
            for (d, device) in devices.iter().enumerate() {
                let cell = row.get(device).ok_or_else(|| {
                    OptimizeError::missing("device parameters", format!("{site}/{device}"))
                })?;
                table.cells[s * devices.len() + d] = *cell;
            }
        }

        Ok(table)
    }

    pub fn sites(&self) -> &[String] {
        &self.sites
    }

    pub fn devices(&self) -> &[String] {
        &self.devices
    }

    pub fn site_index(&self, site: &str) -> OptimizeResult<usize> {
        self.site_index
            .get(site)
            .copied()
            .ok_or_else(|| OptimizeError::missing("site", site))
    }

    pub fn device_index(&self, device: &str) -> OptimizeResult<usize> {
        self.device_index
            .get(device)
            .copied()
            .ok_or_else(|| OptimizeError::missing("device", device))
    }

    /// Single-point lookup by key
    pub fn get(&self, site: &str, device: &str) -> OptimizeResult<&DeviceParams> {
        let s = self.site_index(site)?;
        let d = self.device_index(device)?;
        Ok(self.at(s, d))
    }

    pub fn set(&mut self, site: &str, device: &str, params: DeviceParams) -> OptimizeResult<()> {
        let s = self.site_index(site)?;
        let d = self.device_index(device)?;
        let width = self.devices.len();
        self.cells[s * width + d] = params;
        Ok(())
    }

    /// Positional lookup; indices come from `sites()`/`devices()` enumeration
    pub fn at(&self, s: usize, d: usize) -> &DeviceParams {
        &self.cells[s * self.devices.len() + d]
    }

    /// Iterate `(site, device, params)` in schema order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, &DeviceParams)> {
        self.sites.iter().enumerate().flat_map(move |(s, site)| {
            self.devices
                .iter()
                .enumerate()
                .map(move |(d, device)| (site.as_str(), device.as_str(), self.at(s, d)))
        })
    }

    /// Sparse nested view of the table
    pub fn to_nested(&self) -> BTreeMap<String, BTreeMap<String, DeviceParams>> {
        let mut nested: BTreeMap<String, BTreeMap<String, DeviceParams>> = BTreeMap::new();
        for (site, device, params) in self.iter() {
            nested
                .entry(site.to_owned())
                .or_default()
                .insert(device.to_owned(), *params);
        }
        nested
    }
}

fn index_of(kind: &'static str, keys: &[String]) -> OptimizeResult<HashMap<String, usize>> {
    let mut index = HashMap::with_capacity(keys.len());
    for (i, key) in keys.iter().enumerate() {
        if index.insert(key.clone(), i).is_some() {
            return Err(OptimizeError::DuplicateKey {
                kind,
                key: key.clone(),
            });
        }
    }
    Ok(index)
}
