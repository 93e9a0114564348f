use anyhow::Result;
use clap::Parser;
use moe_bw::cli::{Cli, Commands};
use moe_bw::{estimate, experts, list, logging, sweep};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let _guard = logging::init(cli.log_dir.as_deref());
    logging::install_panic_hook();

    match cli.command {
        Commands::Experts(args) => experts::run(args)?,
        Commands::Estimate(args) => estimate::run(args, &cli.catalog.load()?)?,
        Commands::Sweep(args) => sweep::run(args, &cli.catalog.load()?)?,
        Commands::List(args) => list::run(args, &cli.catalog.load()?)?,
    }

    Ok(())
}
