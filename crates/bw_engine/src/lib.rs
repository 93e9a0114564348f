//! MoE Bandwidth Engine
//!
//! Analytic model of the memory bandwidth a Mixture-of-Experts model needs to
//! decode within a per-token latency budget, and of the bandwidth a set of
//! devices can sustain.
//!
//! - [`experts`]: expected distinct experts activated per decode step
//! - [`demand`]: per-step transfer volume and required bandwidth
//! - [`supply`]: derated hardware bandwidth and utilization lookup
//! - [`catalog`]: model / hardware / scenario presets loaded from JSON
//! - [`sweep`]: demand curves over context length and batch size

pub mod catalog;
pub mod demand;
pub mod error;
pub mod experts;
pub mod model;
pub mod supply;
pub mod sweep;

pub use catalog::{Catalog, CatalogFile, DeviceCategory, DeviceSpec, HardwarePreset};
pub use demand::{estimate_demand, estimate_demand_at_context, DemandBreakdown, DemandResult};
pub use error::{EstimateError, Result};
pub use experts::{expected_unique_experts, expected_unique_for_selections};
pub use model::{Dimensions, ModelConfig, ModelRecord, Scenario, WeightSource, WorkloadParams};
pub use supply::{
    compare, BandwidthComparison, HardwareProfile, UtilizationPolicy, UtilizationSource,
    UtilizationTable, DEFAULT_UTILIZATION_PERCENT,
};
pub use sweep::{batch_sweep, context_sweep, SweepPoint};
