//! Bandwidth Demand Calculator
//!
//! Bytes that must cross the memory bus for one decode step, and the
//! bandwidth needed to move them inside the per-token latency budget.
//!
//! Two paths, selected by [`WeightSource`]:
//! - first principles: embedding + L × (attention + router + activated experts)
//!   + LM head, plus the KV cache read at the given context length
//! - calibrated: `rest_shared_gb + unique × expert_size_gb`; the KV term is
//!   folded into the measured sizes and reported as zero

use serde::Serialize;
use tracing::debug;

use crate::error::{ensure_positive, EstimateError, Result};
use crate::experts::expected_unique_experts;
use crate::model::{Dimensions, ModelConfig, WeightSource, WorkloadParams};

const BYTES_PER_GB: f64 = 1e9;

/// Intermediate first-principles terms, in bytes.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct DemandBreakdown {
    pub embedding_bytes: f64,
    /// Q/K/V/O projections of one layer.
    pub attention_bytes_per_layer: f64,
    pub router_bytes_per_layer: f64,
    /// One gated-FFN expert (two up-projections, one down-projection).
    pub expert_bytes: f64,
    /// Activated experts of one layer.
    pub moe_bytes_per_layer: f64,
    pub all_layers_bytes: f64,
    pub lm_head_bytes: f64,
    pub kv_cache_bytes: f64,
}

/// Demand for one operating point. Recomputed on every input change.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct DemandResult {
    pub required_bandwidth_gbs: f64,
    pub active_weight_gb: f64,
    pub kv_cache_gb: f64,
    pub expected_unique_experts: f64,
    /// Same step with every expert resident; upper bound on weight traffic.
    pub fully_activated_bandwidth_gbs: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<DemandBreakdown>,
}

/// Demand at the workload's average decode context length.
pub fn estimate_demand(model: &ModelConfig, workload: &WorkloadParams) -> Result<DemandResult> {
    estimate_demand_at_context(model, workload, workload.average_context_length())
}

/// Demand with the KV cache read at `context_len` tokens per sequence.
pub fn estimate_demand_at_context(
    model: &ModelConfig,
    workload: &WorkloadParams,
    context_len: f64,
) -> Result<DemandResult> {
    workload.validate()?;
    if !(context_len.is_finite() && context_len >= 0.0) {
        return Err(EstimateError::invalid(
            "context_len",
            format!("must be a non-negative finite length, got {context_len}"),
        ));
    }

    let unique =
        expected_unique_experts(model.num_experts, model.top_k, workload.batch_size)?;
    let all_experts = f64::from(model.num_experts);
    let seconds = ensure_positive("target_latency_ms", workload.latency_seconds())?;

    let result = match model.weights {
        WeightSource::FirstPrinciples(dims) => {
            let breakdown = first_principles_bytes(&dims, model.num_experts, unique, workload.batch_size, context_len);
            let weight_bytes = active_weight_bytes(&breakdown);
            let total_bytes = weight_bytes + breakdown.kv_cache_bytes;

            let full = first_principles_bytes(&dims, model.num_experts, all_experts, workload.batch_size, context_len);
            let full_total = active_weight_bytes(&full) + full.kv_cache_bytes;

            DemandResult {
                required_bandwidth_gbs: total_bytes / seconds / BYTES_PER_GB,
                active_weight_gb: weight_bytes / BYTES_PER_GB,
                kv_cache_gb: breakdown.kv_cache_bytes / BYTES_PER_GB,
                expected_unique_experts: unique,
                fully_activated_bandwidth_gbs: full_total / seconds / BYTES_PER_GB,
                breakdown: Some(breakdown),
            }
        }
        WeightSource::Calibrated {
            expert_size_gb,
            rest_shared_gb,
        } => {
            let active_weight_gb = rest_shared_gb + unique * expert_size_gb;
            let full_gb = rest_shared_gb + all_experts * expert_size_gb;
            DemandResult {
                required_bandwidth_gbs: active_weight_gb / seconds,
                active_weight_gb,
                kv_cache_gb: 0.0,
                expected_unique_experts: unique,
                fully_activated_bandwidth_gbs: full_gb / seconds,
                breakdown: None,
            }
        }
    };

    debug!(
        model = %model.name,
        batch = workload.batch_size,
        context_len,
        unique_experts = result.expected_unique_experts,
        weights_gb = result.active_weight_gb,
        kv_gb = result.kv_cache_gb,
        required_gbs = result.required_bandwidth_gbs,
        "demand estimated"
    );

    Ok(result)
}

fn first_principles_bytes(
    dims: &Dimensions,
    num_experts: u32,
    activated_experts: f64,
    batch_size: u64,
    context_len: f64,
) -> DemandBreakdown {
    let p = dims.bytes_per_param;
    let d_model = dims.d_model as f64;
    let d_head = dims.d_head as f64;
    let q_out = dims.n_heads as f64 * d_head;
    let kv_out = dims.n_kv_heads as f64 * d_head;
    let vocab = dims.vocab_size as f64;
    let layers = dims.num_layers as f64;

    let embedding_bytes = vocab * d_model * p;

    let w_q = d_model * q_out * p;
    let w_k = d_model * kv_out * p;
    let w_v = d_model * kv_out * p;
    let w_o = q_out * d_model * p;
    let attention_bytes_per_layer = w_q + w_k + w_v + w_o;

    let router_bytes_per_layer = d_model * f64::from(num_experts) * p;
    let expert_bytes = 3.0 * d_model * dims.d_ff as f64 * p;
    let moe_bytes_per_layer = activated_experts * expert_bytes;

    let layer_bytes = attention_bytes_per_layer + router_bytes_per_layer + moe_bytes_per_layer;
    let all_layers_bytes = layers * layer_bytes;
    let lm_head_bytes = d_model * vocab * p;

    // K and V are stored separately, hence the factor 2.
    let kv_cache_bytes = layers * batch_size as f64 * context_len * 2.0 * kv_out * p;

    DemandBreakdown {
        embedding_bytes,
        attention_bytes_per_layer,
        router_bytes_per_layer,
        expert_bytes,
        moe_bytes_per_layer,
        all_layers_bytes,
        lm_head_bytes,
        kv_cache_bytes,
    }
}

fn active_weight_bytes(b: &DemandBreakdown) -> f64 {
    b.embedding_bytes + b.all_layers_bytes + b.lm_head_bytes
}
