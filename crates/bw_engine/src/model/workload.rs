//! WorkloadParams - decode workload and named scenarios

use serde::{Deserialize, Serialize};

use crate::error::{ensure_nonzero, ensure_positive, Result};

/// User-controlled decode workload.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkloadParams {
    pub batch_size: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
    /// Per-output-token latency budget (TPOT SLO).
    pub target_latency_ms: f64,
}

impl Default for WorkloadParams {
    fn default() -> Self {
        Self {
            batch_size: 1,
            input_tokens: 4000,
            output_tokens: 256,
            target_latency_ms: 50.0,
        }
    }
}

impl WorkloadParams {
    pub fn validate(&self) -> Result<()> {
        ensure_nonzero("batch_size", self.batch_size)?;
        ensure_positive("target_latency_ms", self.target_latency_ms)?;
        Ok(())
    }

    /// Mean context over a generation that starts at `input_tokens` and grows
    /// by one token per decode step: `input + (output + 1) / 2`.
    pub fn average_context_length(&self) -> f64 {
        self.input_tokens as f64 + (self.output_tokens as f64 + 1.0) / 2.0
    }

    pub fn latency_seconds(&self) -> f64 {
        self.target_latency_ms / 1000.0
    }

    pub fn with_batch_size(mut self, batch_size: u64) -> Self {
        self.batch_size = batch_size;
        self
    }
}

/// Named context-size preset.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub description: String,
    pub batch_size: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl Scenario {
    /// Apply scenario values to a workload; the latency budget is left alone.
    pub fn apply(&self, workload: &mut WorkloadParams) {
        workload.batch_size = self.batch_size;
        workload.input_tokens = self.input_tokens;
        workload.output_tokens = self.output_tokens;
    }
}
