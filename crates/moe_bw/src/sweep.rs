use anyhow::Result;
use bw_engine::{batch_sweep, context_sweep, Catalog, SweepPoint};
use clap::{Args, ValueEnum};
use serde::Serialize;
use tracing::info;

use crate::params::{HardwareArgs, WorkloadArgs};

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    /// Vary context length at the selected batch size
    Context,
    /// Vary batch size (1-256) at the average context length
    Batch,
}

#[derive(Args, Debug, Clone)]
pub struct SweepArgs {
    #[arg(long, value_enum, default_value_t = Axis::Batch)]
    pub axis: Axis,

    #[command(flatten)]
    pub workload: WorkloadArgs,

    #[command(flatten)]
    pub hardware: HardwareArgs,

    /// Print the series as JSON
    #[arg(long, action)]
    pub json: bool,
}

#[derive(Serialize, Debug)]
pub struct SweepReport {
    pub model_name: String,
    pub axis: Axis,
    pub points: Vec<SweepPoint>,
}

pub fn build_series(args: &SweepArgs, catalog: &Catalog) -> Result<SweepReport> {
    let (model, workload) = args.workload.resolve(catalog)?;
    let (hardware, source) = args.hardware.resolve(catalog, model, workload.batch_size)?;

    let points = match args.axis {
        Axis::Context => context_sweep(model, &workload, &hardware)?,
        Axis::Batch => batch_sweep(model, &workload, &hardware, &source)?,
    };

    Ok(SweepReport {
        model_name: model.name.clone(),
        axis: args.axis,
        points,
    })
}

pub fn run(args: SweepArgs, catalog: &Catalog) -> Result<()> {
    let report = build_series(&args, catalog)?;
    info!(
        "Sweep over {:?} for {}: {} points",
        report.axis,
        report.model_name,
        report.points.len()
    );

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let x_label = match report.axis {
        Axis::Context => "context",
        Axis::Batch => "batch",
    };
    println!(
        "{:>8} {:>14} {:>14} {:>9} {:>8}",
        x_label, "required GB/s", "supply GB/s", "experts", "S-MBU%"
    );
    for p in &report.points {
        let marker = if p.supply_bandwidth_gbs >= p.required_bandwidth_gbs { "" } else { " *" };
        println!(
            "{:>8} {:>14.1} {:>14.1} {:>9.1} {:>8.2}{}",
            p.x,
            p.required_bandwidth_gbs,
            p.supply_bandwidth_gbs,
            p.expected_unique_experts,
            p.utilization_percent,
            marker
        );
    }
    println!("(* = demand exceeds supply)");
    Ok(())
}
