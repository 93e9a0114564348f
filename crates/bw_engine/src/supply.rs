//! Hardware Supply Model
//!
//! Derated bandwidth a set of devices can sustain:
//! `peak × devices × utilization% / 100`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{ensure_positive, EstimateError, Result};

/// Utilization applied when neither the user nor a measured table supplies one.
pub const DEFAULT_UTILIZATION_PERCENT: f64 = 16.33;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HardwareProfile {
    /// Peak memory bandwidth of one device.
    pub peak_bandwidth_gbs: f64,
    pub device_count: u32,
    /// Sustainable memory bandwidth utilization (S-MBU), 0-100.
    pub utilization_percent: f64,
}

impl HardwareProfile {
    pub fn new(peak_bandwidth_gbs: f64, device_count: u32, utilization_percent: f64) -> Self {
        Self {
            peak_bandwidth_gbs,
            device_count,
            utilization_percent,
        }
    }

    pub fn validate(&self) -> Result<()> {
        ensure_positive("peak_bandwidth_gbs", self.peak_bandwidth_gbs)?;
        if self.device_count == 0 {
            return Err(EstimateError::invalid("device_count", "must be at least 1"));
        }
        validate_percent(self.utilization_percent)?;
        Ok(())
    }

    pub fn with_utilization(&self, utilization_percent: f64) -> Self {
        Self {
            utilization_percent,
            ..self.clone()
        }
    }

    /// Sustainable bandwidth of a single device.
    pub fn per_device_gbs(&self) -> Result<f64> {
        self.validate()?;
        Ok(self.peak_bandwidth_gbs * (self.utilization_percent / 100.0))
    }

    pub fn supply_bandwidth_gbs(&self) -> Result<f64> {
        self.validate()?;
        Ok(self.peak_bandwidth_gbs * f64::from(self.device_count) * (self.utilization_percent / 100.0))
    }

    /// Smallest device count whose derated supply meets `demand_gbs` (at least 1).
    pub fn devices_required(&self, demand_gbs: f64) -> Result<u64> {
        let demand = ensure_positive("demand_gbs", demand_gbs)?;
        let per_device = self.per_device_gbs()?;
        Ok(((demand / per_device).ceil() as u64).max(1))
    }
}

fn validate_percent(percent: f64) -> Result<f64> {
    if percent.is_finite() && percent > 0.0 && percent <= 100.0 {
        Ok(percent)
    } else {
        Err(EstimateError::invalid(
            "utilization_percent",
            format!("must be within (0, 100], got {percent}"),
        ))
    }
}

/// How a batch size is matched against a measured utilization table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UtilizationPolicy {
    /// Only an entry for exactly this batch size counts.
    #[default]
    Exact,
    /// Closest measured batch size; ties resolve to the smaller one.
    Nearest,
}

/// Measured sustainable utilization fraction (0, 1] keyed by batch size.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct UtilizationTable(BTreeMap<u64, f64>);

impl UtilizationTable {
    pub fn new(entries: BTreeMap<u64, f64>) -> Result<Self> {
        for (&batch, &fraction) in &entries {
            if batch == 0 {
                return Err(EstimateError::invalid(
                    "utilization_by_batch",
                    "batch size keys must be at least 1",
                ));
            }
            if !(fraction.is_finite() && fraction > 0.0 && fraction <= 1.0) {
                return Err(EstimateError::invalid(
                    "utilization_by_batch",
                    format!("fraction for batch {batch} must be within (0, 1], got {fraction}"),
                ));
            }
        }
        Ok(Self(entries))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = (u64, f64)> + '_ {
        self.0.iter().map(|(&b, &f)| (b, f))
    }

    /// Measured fraction for `batch_size`, if the policy finds one.
    pub fn lookup(&self, batch_size: u64, policy: UtilizationPolicy) -> Option<f64> {
        match policy {
            UtilizationPolicy::Exact => self.0.get(&batch_size).copied(),
            UtilizationPolicy::Nearest => {
                let below = self.0.range(..=batch_size).next_back();
                let above = self.0.range(batch_size..).next();
                match (below, above) {
                    (Some((&lo, &f_lo)), Some((&hi, &f_hi))) => {
                        if hi - batch_size < batch_size - lo {
                            Some(f_hi)
                        } else {
                            Some(f_lo)
                        }
                    }
                    (Some((_, &f)), None) | (None, Some((_, &f))) => Some(f),
                    (None, None) => None,
                }
            }
        }
    }
}

/// Resolves the utilization percent to apply at each batch size.
#[derive(Clone, Copy, Debug)]
pub enum UtilizationSource<'a> {
    Fixed(f64),
    Table {
        table: &'a UtilizationTable,
        policy: UtilizationPolicy,
        fallback_percent: f64,
    },
}

impl UtilizationSource<'_> {
    pub fn percent_for(&self, batch_size: u64) -> f64 {
        match *self {
            UtilizationSource::Fixed(percent) => percent,
            UtilizationSource::Table {
                table,
                policy,
                fallback_percent,
            } => table
                .lookup(batch_size, policy)
                .map(|fraction| fraction * 100.0)
                .unwrap_or(fallback_percent),
        }
    }

    pub fn is_measured(&self, batch_size: u64) -> bool {
        match *self {
            UtilizationSource::Fixed(_) => false,
            UtilizationSource::Table { table, policy, .. } => {
                table.lookup(batch_size, policy).is_some()
            }
        }
    }
}

/// Demand set against supply for one operating point.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct BandwidthComparison {
    pub demand_gbs: f64,
    pub supply_gbs: f64,
    /// `supply / demand`; at least 1.0 means the latency target is reachable.
    pub headroom_ratio: f64,
    pub meets_target: bool,
    pub devices_required: u64,
}

pub fn compare(demand_gbs: f64, hardware: &HardwareProfile) -> Result<BandwidthComparison> {
    let demand = ensure_positive("demand_gbs", demand_gbs)?;
    let supply = hardware.supply_bandwidth_gbs()?;
    let devices_required = hardware.devices_required(demand)?;
    Ok(BandwidthComparison {
        demand_gbs: demand,
        supply_gbs: supply,
        headroom_ratio: supply / demand,
        meets_target: supply >= demand,
        devices_required,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deepseek_v2_lite_table() -> UtilizationTable {
        UtilizationTable::new(BTreeMap::from([
            (1, 0.345163434301608),
            (4, 0.386),
            (8, 0.406),
            (16, 0.429),
            (32, 0.478644231191122),
            (64, 0.396806645718611),
            (128, 0.325042264414248),
        ]))
        .unwrap()
    }

    #[test]
    fn test_supply_formula() {
        let hw = HardwareProfile::new(768.0, 1, 16.33);
        let supply = hw.supply_bandwidth_gbs().unwrap();
        assert!((supply - 768.0 * 0.1633).abs() < 1e-9);
    }

    #[test]
    fn test_doubling_devices_doubles_supply() {
        let one = HardwareProfile::new(3350.0, 1, 42.0);
        let two = HardwareProfile {
            device_count: 2,
            ..one.clone()
        };
        assert_eq!(
            two.supply_bandwidth_gbs().unwrap(),
            2.0 * one.supply_bandwidth_gbs().unwrap()
        );
    }

    #[test]
    fn test_invalid_hardware() {
        assert!(HardwareProfile::new(0.0, 1, 50.0).supply_bandwidth_gbs().is_err());
        assert!(HardwareProfile::new(768.0, 0, 50.0).supply_bandwidth_gbs().is_err());
        assert!(HardwareProfile::new(768.0, 1, 0.0).supply_bandwidth_gbs().is_err());
        assert!(HardwareProfile::new(768.0, 1, 100.5).supply_bandwidth_gbs().is_err());
        assert!(HardwareProfile::new(768.0, 1, 100.0).supply_bandwidth_gbs().is_ok());
    }

    #[test]
    fn test_devices_required() {
        // 1000 GB/s at 50% -> 500 GB/s per device.
        let hw = HardwareProfile::new(1000.0, 1, 50.0);
        assert_eq!(hw.devices_required(100.0).unwrap(), 1);
        assert_eq!(hw.devices_required(500.0).unwrap(), 1);
        assert_eq!(hw.devices_required(501.0).unwrap(), 2);
        assert_eq!(hw.devices_required(2000.0).unwrap(), 4);
        assert!(hw.devices_required(0.0).is_err());
    }

    #[test]
    fn test_exact_lookup() {
        let table = deepseek_v2_lite_table();
        assert_eq!(table.lookup(8, UtilizationPolicy::Exact), Some(0.406));
        assert_eq!(table.lookup(9, UtilizationPolicy::Exact), None);
        assert_eq!(table.lookup(256, UtilizationPolicy::Exact), None);
    }

    #[test]
    fn test_nearest_lookup() {
        let table = deepseek_v2_lite_table();
        assert_eq!(table.lookup(8, UtilizationPolicy::Nearest), Some(0.406));
        assert_eq!(table.lookup(10, UtilizationPolicy::Nearest), Some(0.406));
        assert_eq!(table.lookup(13, UtilizationPolicy::Nearest), Some(0.429));
        // 6 is equidistant from 4 and 8: smaller batch wins.
        assert_eq!(table.lookup(6, UtilizationPolicy::Nearest), Some(0.386));
        assert_eq!(
            table.lookup(1000, UtilizationPolicy::Nearest),
            Some(0.325042264414248)
        );
        assert_eq!(
            UtilizationTable::default().lookup(1, UtilizationPolicy::Nearest),
            None
        );
    }

    #[test]
    fn test_source_fallback() {
        let table = deepseek_v2_lite_table();
        let source = UtilizationSource::Table {
            table: &table,
            policy: UtilizationPolicy::Exact,
            fallback_percent: DEFAULT_UTILIZATION_PERCENT,
        };
        assert_eq!(source.percent_for(16), 0.429 * 100.0);
        assert_eq!(source.percent_for(3), DEFAULT_UTILIZATION_PERCENT);
        assert!(source.is_measured(16));
        assert!(!source.is_measured(3));
    }

    #[test]
    fn test_table_rejects_bad_fractions() {
        assert!(UtilizationTable::new(BTreeMap::from([(1, 1.5)])).is_err());
        assert!(UtilizationTable::new(BTreeMap::from([(1, 0.0)])).is_err());
        assert!(UtilizationTable::new(BTreeMap::from([(0, 0.5)])).is_err());
    }

    #[test]
    fn test_compare() {
        let hw = HardwareProfile::new(1000.0, 2, 50.0);
        let cmp = compare(500.0, &hw).unwrap();
        assert_eq!(cmp.supply_gbs, 1000.0);
        assert_eq!(cmp.headroom_ratio, 2.0);
        assert!(cmp.meets_target);
        assert_eq!(cmp.devices_required, 1);

        let short = compare(4000.0, &hw).unwrap();
        assert!(!short.meets_target);
        assert_eq!(short.devices_required, 8);
    }
}
