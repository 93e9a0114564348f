use crate::catalog::CatalogArgs;
use crate::estimate::EstimateArgs;
use crate::experts::ExpertsArgs;
use crate::list::ListArgs;
use crate::sweep::SweepArgs;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "MoE Bandwidth Estimator", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub catalog: CatalogArgs,

    /// Also write daily-rolling log files into this directory
    #[arg(long, global = true)]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Required vs. available bandwidth for one operating point
    Estimate(EstimateArgs),

    /// Demand curve over context length or batch size
    Sweep(SweepArgs),

    /// Expected unique experts per decode step
    Experts(ExpertsArgs),

    /// Show catalog presets
    List(ListArgs),
}
