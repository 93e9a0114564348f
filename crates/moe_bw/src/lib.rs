//! MoE bandwidth toolchain: command-line front end over `bw_engine`.

pub mod catalog;
pub mod cli;
pub mod estimate;
pub mod experts;
pub mod list;
pub mod logging;
pub mod params;
pub mod sweep;
