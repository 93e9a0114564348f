//! Prints demand vs. supply for every built-in model preset without the CLI.
//! Run with: cargo run --example check_bandwidth_math

use bw_engine::{
    compare, estimate_demand, Catalog, HardwareProfile, UtilizationPolicy, WorkloadParams,
};

fn main() -> anyhow::Result<()> {
    println!("=== MoE Bandwidth Estimation Verification ===\n");

    let catalog = Catalog::builtin()?;
    let a6000 = catalog.hardware("a6000")?.bandwidth_gbs;

    for scenario in catalog.scenarios() {
        let mut workload = WorkloadParams::default();
        scenario.apply(&mut workload);

        for (key, model) in catalog.models() {
            let utilization = model
                .utilization_source(
                    None,
                    UtilizationPolicy::Exact,
                    catalog.default_utilization_percent,
                )
                .percent_for(workload.batch_size);
            let hardware = HardwareProfile::new(a6000, 1, utilization);

            let demand = estimate_demand(model, &workload)?;
            let cmp = compare(demand.required_bandwidth_gbs, &hardware)?;

            println!("Scenario: [{}] Model: [{}]", scenario.label, key);
            println!("  - Unique Experts : {:.2}", demand.expected_unique_experts);
            println!("  - Weights/Step   : {:.2} GB", demand.active_weight_gb);
            println!("  - KV Cache       : {:.2} GB", demand.kv_cache_gb);
            println!("  - Required BW    : {:.1} GB/s", demand.required_bandwidth_gbs);
            println!("  - A6000 Supply   : {:.1} GB/s ({:.2}%)", cmp.supply_gbs, utilization);
            println!("  - Devices Needed : {}", cmp.devices_required);
            if let Some(b) = &demand.breakdown {
                println!("  - Embedding      : {:.3} GB", b.embedding_bytes / 1e9);
                println!("  - Attention/L    : {:.3} GB", b.attention_bytes_per_layer / 1e9);
                println!("  - MoE (one layer): {:.3} GB", b.moe_bytes_per_layer / 1e9);
                println!("  - LM Head        : {:.3} GB", b.lm_head_bytes / 1e9);
            }
            println!("--------------------------------------------------");
        }
    }
    Ok(())
}
