use anyhow::{Context, Result};
use bw_engine::{
    compare, estimate_demand, BandwidthComparison, Catalog, DemandResult, HardwareProfile,
    WorkloadParams,
};
use clap::Args;
use serde::Serialize;
use tracing::{info, warn};

use crate::params::{HardwareArgs, WorkloadArgs};

#[derive(Args, Debug, Clone)]
pub struct EstimateArgs {
    #[command(flatten)]
    pub workload: WorkloadArgs,

    #[command(flatten)]
    pub hardware: HardwareArgs,

    /// Print the report as JSON
    #[arg(long, action)]
    pub json: bool,
}

#[derive(Serialize, Debug)]
pub struct EstimateReport {
    pub generated_at: String,
    pub model_key: String,
    pub model_name: String,
    pub calibrated: bool,
    pub workload: WorkloadParams,
    pub average_context_length: f64,
    pub hardware: HardwareProfile,
    /// Whether the utilization came from the model's measured table.
    pub measured_utilization: bool,
    pub demand: DemandResult,
    pub comparison: BandwidthComparison,
    /// Reference devices that meet the demand on their own at this utilization.
    pub capable_devices: Vec<String>,
}

pub fn build_report(args: &EstimateArgs, catalog: &Catalog) -> Result<EstimateReport> {
    let (model, workload) = args.workload.resolve(catalog)?;
    let (hardware, source) = args.hardware.resolve(catalog, model, workload.batch_size)?;

    let demand = estimate_demand(model, &workload)
        .with_context(|| format!("Failed to estimate demand for `{}`", args.workload.model))?;
    let comparison = compare(demand.required_bandwidth_gbs, &hardware)?;

    let capable_devices = catalog
        .devices_meeting(demand.required_bandwidth_gbs, hardware.utilization_percent)
        .into_iter()
        .map(|d| d.name.clone())
        .collect();

    Ok(EstimateReport {
        generated_at: chrono::Local::now().to_rfc3339(),
        model_key: args.workload.model.clone(),
        model_name: model.name.clone(),
        calibrated: model.is_calibrated(),
        average_context_length: workload.average_context_length(),
        workload,
        measured_utilization: source.is_measured(workload.batch_size),
        hardware,
        demand,
        comparison,
        capable_devices,
    })
}

pub fn run(args: EstimateArgs, catalog: &Catalog) -> Result<()> {
    let report = build_report(&args, catalog)?;
    info!(
        "Estimated {} @ B={} -> {:.1} GB/s required, {:.1} GB/s available",
        report.model_name,
        report.workload.batch_size,
        report.comparison.demand_gbs,
        report.comparison.supply_gbs
    );
    if !report.comparison.meets_target {
        warn!(
            "Supply covers {:.1}% of demand; {} device(s) needed",
            report.comparison.headroom_ratio * 100.0,
            report.comparison.devices_required
        );
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_report(r: &EstimateReport) {
    let w = &r.workload;
    let d = &r.demand;
    let c = &r.comparison;

    println!("=== {} ({}) ===", r.model_name, if r.calibrated { "calibrated" } else { "first principles" });
    println!(
        "Workload      : B={} in={} out={} (avg ctx {:.1}), SLO {} ms/token",
        w.batch_size, w.input_tokens, w.output_tokens, r.average_context_length, w.target_latency_ms
    );
    println!(
        "Hardware      : {} x {:.1} GB/s @ S-MBU {:.2}%{}",
        r.hardware.device_count,
        r.hardware.peak_bandwidth_gbs,
        r.hardware.utilization_percent,
        if r.measured_utilization { " (measured)" } else { "" }
    );
    println!("--------------------------------------------------");
    println!("Unique experts: {:.1} expected", d.expected_unique_experts);
    println!("Weights/Step  : {:.2} GB", d.active_weight_gb);
    println!("KV Cache      : {:.2} GB", d.kv_cache_gb);
    println!(
        "Theoretical BW: {:.2} TB/s (fully activated {:.2} TB/s)",
        d.required_bandwidth_gbs / 1024.0,
        d.fully_activated_bandwidth_gbs / 1024.0
    );
    println!("Actual BW     : {:.2} TB/s", c.supply_gbs / 1024.0);
    println!(
        "Headroom      : {:.2}x -> {}",
        c.headroom_ratio,
        if c.meets_target {
            "✅ SLO reachable".to_string()
        } else {
            format!("❌ needs {} device(s)", c.devices_required)
        }
    );

    if let Some(b) = &d.breakdown {
        println!("--------------------------------------------------");
        println!("Embedding     : {:.3} GB", b.embedding_bytes / 1e9);
        println!("Attention/L   : {:.3} GB", b.attention_bytes_per_layer / 1e9);
        println!("Router/L      : {:.4} GB", b.router_bytes_per_layer / 1e9);
        println!("Expert (one)  : {:.4} GB", b.expert_bytes / 1e9);
        println!("MoE/L         : {:.3} GB", b.moe_bytes_per_layer / 1e9);
        println!("All layers    : {:.3} GB", b.all_layers_bytes / 1e9);
        println!("LM head       : {:.3} GB", b.lm_head_bytes / 1e9);
    }

    if r.capable_devices.is_empty() {
        println!("No single reference device meets this demand.");
    } else {
        println!("Single devices meeting demand: {}", r.capable_devices.join(", "));
    }
}
