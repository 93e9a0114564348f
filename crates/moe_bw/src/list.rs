use anyhow::Result;
use bw_engine::{Catalog, WeightSource};
use clap::{Args, ValueEnum};
use std::collections::BTreeMap;

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Models,
    Hardware,
    Scenarios,
    Devices,
}

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    #[arg(value_enum, default_value_t = ListKind::Models)]
    pub what: ListKind,

    /// Print as JSON
    #[arg(long, action)]
    pub json: bool,
}

pub fn run(args: ListArgs, catalog: &Catalog) -> Result<()> {
    if args.json {
        let value = match args.what {
            ListKind::Models => serde_json::to_value(catalog.models().collect::<BTreeMap<_, _>>())?,
            ListKind::Hardware => serde_json::to_value(catalog.hardware_presets())?,
            ListKind::Scenarios => serde_json::to_value(catalog.scenarios())?,
            ListKind::Devices => serde_json::to_value(catalog.devices())?,
        };
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    match args.what {
        ListKind::Models => {
            for (key, m) in catalog.models() {
                let source = match &m.weights {
                    WeightSource::FirstPrinciples(d) => format!(
                        "first principles, L={} d_model={} d_ff={} P={}",
                        d.num_layers, d.d_model, d.d_ff, d.bytes_per_param
                    ),
                    WeightSource::Calibrated {
                        expert_size_gb,
                        rest_shared_gb,
                    } => format!(
                        "calibrated, expert={} GB rest={} GB",
                        expert_size_gb, rest_shared_gb
                    ),
                };
                let smbu = if m.utilization.is_some() { ", S-MBU table" } else { "" };
                println!(
                    "{:<18} {:<32} E={:<4} k={:<2} {}{}",
                    key, m.name, m.num_experts, m.top_k, source, smbu
                );
            }
        }
        ListKind::Hardware => {
            for h in catalog.hardware_presets() {
                println!("{:<12} {:<24} {:>8.1} GB/s", h.id, h.name, h.bandwidth_gbs);
            }
        }
        ListKind::Scenarios => {
            for s in catalog.scenarios() {
                println!(
                    "{:<10} {:<20} B={} in={} out={}  {}",
                    s.id, s.label, s.batch_size, s.input_tokens, s.output_tokens, s.description
                );
            }
        }
        ListKind::Devices => {
            for d in catalog.devices() {
                let offload = d
                    .offload_bandwidth_gbs
                    .map(|bw| format!("{:.1} GB/s", bw))
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{:<16} {:>9.1} GB/s  offload {:>11}  {:>7.0} W  {:?}",
                    d.name, d.peak_bandwidth_gbs, offload, d.power_watts, d.category
                );
            }
        }
    }
    Ok(())
}
