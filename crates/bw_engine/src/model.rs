//! Model Module - MoE model and workload descriptions
//!
//! - ModelConfig: validated, immutable description of one supported LLM
//! - ModelRecord: flat on-disk form of a model preset (normalized into ModelConfig)
//! - WorkloadParams / Scenario: user-controlled decode workload

pub mod config;
pub mod workload;

pub use config::{Dimensions, ModelConfig, ModelRecord, WeightSource};
pub use workload::{Scenario, WorkloadParams};
