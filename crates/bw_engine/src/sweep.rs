//! Chart-series generation: demand curves over context length and batch size.
//!
//! Each point is an independent estimate, so points are evaluated in parallel
//! and collected back in ascending x order.

use rayon::prelude::*;
use serde::Serialize;

use crate::demand::{estimate_demand, estimate_demand_at_context};
use crate::error::Result;
use crate::model::{ModelConfig, WorkloadParams};
use crate::supply::{HardwareProfile, UtilizationSource};

pub const CONTEXT_SWEEP_START: u64 = 1024;
pub const CONTEXT_SWEEP_MIN_SPAN: u64 = 16000;
pub const BATCH_SWEEP_MAX: u64 = 256;

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct SweepPoint {
    /// Context length or batch size, depending on the sweep.
    pub x: u64,
    pub required_bandwidth_gbs: f64,
    pub supply_bandwidth_gbs: f64,
    pub expected_unique_experts: f64,
    pub utilization_percent: f64,
}

/// Context lengths from 1024 in tenths of `max(input + output, 16000)`,
/// running one step past the maximum.
pub fn context_points(input_tokens: u64, output_tokens: u64) -> Vec<u64> {
    let max_context = input_tokens
        .saturating_add(output_tokens)
        .max(CONTEXT_SWEEP_MIN_SPAN);
    let step = (max_context / 10).max(1);
    let end = max_context.saturating_add(step);

    let mut points = Vec::new();
    let mut ctx = CONTEXT_SWEEP_START;
    while ctx <= end {
        points.push(ctx);
        let Some(next) = ctx.checked_add(step) else {
            break;
        };
        ctx = next;
    }
    points
}

/// Batch sizes 1..=256: dense below 32, every 2nd below 64, every 4th after.
pub fn batch_points() -> Vec<u64> {
    let mut points = Vec::new();
    let mut b = 1;
    while b <= BATCH_SWEEP_MAX {
        points.push(b);
        b += match b {
            0..=31 => 1,
            32..=63 => 2,
            _ => 4,
        };
    }
    points
}

/// Demand against context length at the workload's batch size; supply is flat.
pub fn context_sweep(
    model: &ModelConfig,
    workload: &WorkloadParams,
    hardware: &HardwareProfile,
) -> Result<Vec<SweepPoint>> {
    workload.validate()?;
    let supply = hardware.supply_bandwidth_gbs()?;
    let points = context_points(workload.input_tokens, workload.output_tokens);
    tracing::debug!(points = points.len(), model = %model.name, "context sweep");

    points
        .into_par_iter()
        .map(|ctx| -> Result<SweepPoint> {
            let demand = estimate_demand_at_context(model, workload, ctx as f64)?;
            Ok(SweepPoint {
                x: ctx,
                required_bandwidth_gbs: demand.required_bandwidth_gbs,
                supply_bandwidth_gbs: supply,
                expected_unique_experts: demand.expected_unique_experts,
                utilization_percent: hardware.utilization_percent,
            })
        })
        .collect()
}

/// Demand against batch size at the workload's average context; supply follows
/// the per-batch utilization from `utilization`.
pub fn batch_sweep(
    model: &ModelConfig,
    workload: &WorkloadParams,
    hardware: &HardwareProfile,
    utilization: &UtilizationSource<'_>,
) -> Result<Vec<SweepPoint>> {
    workload.validate()?;
    hardware.validate()?;
    let points = batch_points();
    tracing::debug!(points = points.len(), model = %model.name, "batch sweep");

    points
        .into_par_iter()
        .map(|b| -> Result<SweepPoint> {
            let demand = estimate_demand(model, &workload.with_batch_size(b))?;
            let percent = utilization.percent_for(b);
            let supply = hardware.with_utilization(percent).supply_bandwidth_gbs()?;
            Ok(SweepPoint {
                x: b,
                required_bandwidth_gbs: demand.required_bandwidth_gbs,
                supply_bandwidth_gbs: supply,
                expected_unique_experts: demand.expected_unique_experts,
                utilization_percent: percent,
            })
        })
        .collect()
}
