//! Workload and hardware selection shared by `estimate` and `sweep`.

use anyhow::{Context, Result};
use bw_engine::{
    Catalog, HardwareProfile, ModelConfig, UtilizationPolicy, UtilizationSource, WorkloadParams,
};
use clap::Args;
use tracing::debug;

#[derive(Args, Debug, Clone)]
pub struct WorkloadArgs {
    /// Model preset key (see `list models`)
    #[arg(short, long, default_value = "deepseek-v2-lite")]
    pub model: String,

    /// Context-size scenario (see `list scenarios`); explicit flags still win
    #[arg(long)]
    pub scenario: Option<String>,

    #[arg(short, long)]
    pub batch_size: Option<u64>,

    #[arg(long)]
    pub input_tokens: Option<u64>,

    #[arg(long)]
    pub output_tokens: Option<u64>,

    /// Target time per output token in milliseconds
    #[arg(long)]
    pub slo_ms: Option<f64>,
}

impl WorkloadArgs {
    pub fn resolve<'c>(&self, catalog: &'c Catalog) -> Result<(&'c ModelConfig, WorkloadParams)> {
        let model = catalog.model(&self.model)?;

        let mut workload = WorkloadParams {
            target_latency_ms: catalog.default_slo_ms,
            ..WorkloadParams::default()
        };
        if let Some(id) = &self.scenario {
            catalog.scenario(id)?.apply(&mut workload);
        }
        if let Some(b) = self.batch_size {
            workload.batch_size = b;
        }
        if let Some(n) = self.input_tokens {
            workload.input_tokens = n;
        }
        if let Some(n) = self.output_tokens {
            workload.output_tokens = n;
        }
        if let Some(ms) = self.slo_ms {
            workload.target_latency_ms = ms;
        }

        workload
            .validate()
            .with_context(|| format!("Invalid workload {:?}", workload))?;
        debug!(?workload, model = %model.name, "workload resolved");
        Ok((model, workload))
    }
}

#[derive(Args, Debug, Clone)]
pub struct HardwareArgs {
    /// Hardware preset id (see `list hardware`)
    #[arg(long, default_value = "a6000")]
    pub hardware: String,

    /// Per-device peak bandwidth in GB/s, replacing the preset's figure
    #[arg(long)]
    pub bandwidth: Option<f64>,

    /// Number of devices on the supply side
    #[arg(long, default_value_t = 1)]
    pub gpus: u32,

    /// Fixed S-MBU percent for every batch size
    #[arg(long)]
    pub smbu: Option<f64>,

    /// Use the nearest measured batch size when the exact one has no S-MBU entry
    #[arg(long, action)]
    pub nearest_utilization: bool,
}

impl HardwareArgs {
    pub fn policy(&self) -> UtilizationPolicy {
        if self.nearest_utilization {
            UtilizationPolicy::Nearest
        } else {
            UtilizationPolicy::Exact
        }
    }

    pub fn peak_bandwidth_gbs(&self, catalog: &Catalog) -> Result<f64> {
        match self.bandwidth {
            Some(bw) => Ok(bw),
            None => Ok(catalog.hardware(&self.hardware)?.bandwidth_gbs),
        }
    }

    /// Hardware profile at `batch_size`, plus the per-batch utilization source.
    pub fn resolve<'m>(
        &self,
        catalog: &Catalog,
        model: &'m ModelConfig,
        batch_size: u64,
    ) -> Result<(HardwareProfile, UtilizationSource<'m>)> {
        let source =
            model.utilization_source(self.smbu, self.policy(), catalog.default_utilization_percent);
        let profile = HardwareProfile::new(
            self.peak_bandwidth_gbs(catalog)?,
            self.gpus,
            source.percent_for(batch_size),
        );
        profile
            .validate()
            .with_context(|| format!("Invalid hardware {:?}", profile))?;
        Ok((profile, source))
    }
}
