//! Preset catalog: model, hardware, device and scenario presets.
//!
//! The built-in catalog is a JSON file compiled into the crate. User catalogs
//! use the same layout and are merged over a base catalog by key.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ensure_positive, EstimateError, Result};
use crate::model::{ModelConfig, ModelRecord, Scenario};
use crate::supply::DEFAULT_UTILIZATION_PERCENT;

const BUILTIN_CATALOG: &str = include_str!("../data/catalog.json");

pub const DEFAULT_SLO_MS: f64 = 50.0;

/// Selectable accelerator with its peak bandwidth.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HardwarePreset {
    pub id: String,
    pub name: String,
    pub bandwidth_gbs: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeviceCategory {
    DatacenterSystem,
    DatacenterCard,
    Personal,
    Soc,
    Autonomous,
}

/// Reference device: memory bandwidth, host offload bandwidth and board power.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeviceSpec {
    pub name: String,
    pub peak_bandwidth_gbs: f64,
    /// PCIe / interconnect bandwidth for expert offloading. Absent for unified memory.
    #[serde(default)]
    pub offload_bandwidth_gbs: Option<f64>,
    pub power_watts: f64,
    pub category: DeviceCategory,
}

/// On-disk catalog layout. Every section is optional so partial files merge.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CatalogFile {
    #[serde(default)]
    pub default_utilization_percent: Option<f64>,
    #[serde(default)]
    pub default_slo_ms: Option<f64>,
    #[serde(default)]
    pub models: BTreeMap<String, ModelRecord>,
    #[serde(default)]
    pub hardware: Vec<HardwarePreset>,
    #[serde(default)]
    pub devices: Vec<DeviceSpec>,
    #[serde(default)]
    pub scenarios: Vec<Scenario>,
}

#[derive(Clone, Debug)]
pub struct Catalog {
    pub default_utilization_percent: f64,
    pub default_slo_ms: f64,
    models: BTreeMap<String, ModelConfig>,
    hardware: Vec<HardwarePreset>,
    devices: Vec<DeviceSpec>,
    scenarios: Vec<Scenario>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            default_utilization_percent: DEFAULT_UTILIZATION_PERCENT,
            default_slo_ms: DEFAULT_SLO_MS,
            models: BTreeMap::new(),
            hardware: Vec::new(),
            devices: Vec::new(),
            scenarios: Vec::new(),
        }
    }
}

impl Catalog {
    /// Presets shipped with the crate.
    pub fn builtin() -> Result<Self> {
        Self::from_json_str(BUILTIN_CATALOG)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let file: CatalogFile = serde_json::from_str(json)?;
        let mut catalog = Self::default();
        catalog.merge(file)?;
        Ok(catalog)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading catalog from {:?}", path);
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Merge every `*.json` file in `dir` over `base`, in sorted path order.
    pub fn load_dir(base: Self, dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let pattern = format!("{}/*.json", dir.display());
        let mut paths: Vec<PathBuf> = glob::glob(&pattern)
            .map_err(|e| EstimateError::Catalog(format!("bad catalog directory {:?}: {}", dir, e)))?
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| EstimateError::Io(e.into_error()))?;
        paths.sort();

        let mut catalog = base;
        for path in paths {
            debug!("Merging catalog file {:?}", path);
            let json = fs::read_to_string(&path)?;
            let file: CatalogFile = serde_json::from_str(&json)?;
            catalog.merge(file).map_err(|e| {
                EstimateError::Catalog(format!("{}: {}", path.display(), e))
            })?;
        }
        Ok(catalog)
    }

    /// Overlay `file`: models, hardware, devices and scenarios replace entries
    /// with the same key and append new ones.
    pub fn merge(&mut self, file: CatalogFile) -> Result<()> {
        if let Some(percent) = file.default_utilization_percent {
            if !(percent.is_finite() && percent > 0.0 && percent <= 100.0) {
                return Err(EstimateError::invalid(
                    "default_utilization_percent",
                    format!("must be within (0, 100], got {percent}"),
                ));
            }
            self.default_utilization_percent = percent;
        }
        if let Some(slo) = file.default_slo_ms {
            self.default_slo_ms = ensure_positive("default_slo_ms", slo)?;
        }

        for (key, record) in file.models {
            let config = record.into_config(&key)?;
            self.models.insert(key, config);
        }
        for preset in file.hardware {
            ensure_positive("bandwidth_gbs", preset.bandwidth_gbs)?;
            upsert(&mut self.hardware, preset, |a, b| a.id == b.id);
        }
        for device in file.devices {
            ensure_positive("peak_bandwidth_gbs", device.peak_bandwidth_gbs)?;
            upsert(&mut self.devices, device, |a, b| a.name == b.name);
        }
        for scenario in file.scenarios {
            upsert(&mut self.scenarios, scenario, |a, b| a.id == b.id);
        }
        Ok(())
    }

    pub fn model(&self, key: &str) -> Result<&ModelConfig> {
        self.models.get(key).ok_or_else(|| EstimateError::UnknownPreset {
            kind: "model",
            name: key.to_string(),
        })
    }

    pub fn models(&self) -> impl Iterator<Item = (&str, &ModelConfig)> {
        self.models.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn hardware(&self, id: &str) -> Result<&HardwarePreset> {
        self.hardware
            .iter()
            .find(|h| h.id == id)
            .ok_or_else(|| EstimateError::UnknownPreset {
                kind: "hardware",
                name: id.to_string(),
            })
    }

    pub fn hardware_presets(&self) -> &[HardwarePreset] {
        &self.hardware
    }

    pub fn scenario(&self, id: &str) -> Result<&Scenario> {
        self.scenarios
            .iter()
            .find(|s| s.id == id)
            .ok_or_else(|| EstimateError::UnknownPreset {
                kind: "scenario",
                name: id.to_string(),
            })
    }

    pub fn scenarios(&self) -> &[Scenario] {
        &self.scenarios
    }

    pub fn devices(&self) -> &[DeviceSpec] {
        &self.devices
    }

    /// Devices whose derated single-device bandwidth covers `demand_gbs`,
    /// lowest power first.
    pub fn devices_meeting(&self, demand_gbs: f64, utilization_percent: f64) -> Vec<&DeviceSpec> {
        let mut found: Vec<&DeviceSpec> = self
            .devices
            .iter()
            .filter(|d| d.peak_bandwidth_gbs * (utilization_percent / 100.0) >= demand_gbs)
            .collect();
        found.sort_by(|a, b| a.power_watts.total_cmp(&b.power_watts));
        found
    }
}

fn upsert<T>(items: &mut Vec<T>, item: T, same: impl Fn(&T, &T) -> bool) {
    match items.iter_mut().find(|existing| same(existing, &item)) {
        Some(slot) => *slot = item,
        None => items.push(item),
    }
}
