use anyhow::Result;
use bw_engine::expected_unique_experts;
use clap::Args;

#[derive(Args, Debug, Clone)]
pub struct ExpertsArgs {
    /// Total routable experts (E)
    #[arg(short, long)]
    pub experts: u32,

    /// Experts activated per token (k)
    #[arg(short = 'k', long)]
    pub top_k: u32,

    /// Batch sizes to evaluate
    #[arg(short, long, num_args = 1.., default_values_t = [1u64, 4, 8, 16, 32, 64, 128, 256])]
    pub batch_size: Vec<u64>,
}

/// `(batch, expected unique experts)` rows.
pub fn table(args: &ExpertsArgs) -> Result<Vec<(u64, f64)>> {
    if args.top_k == 0 || args.top_k > args.experts {
        anyhow::bail!(
            "top-k must satisfy 1 <= k <= E (E={}, k={})",
            args.experts,
            args.top_k
        );
    }
    args.batch_size
        .iter()
        .map(|&b| -> Result<(u64, f64)> {
            Ok((b, expected_unique_experts(args.experts, args.top_k, b)?))
        })
        .collect()
}

pub fn run(args: ExpertsArgs) -> Result<()> {
    let rows = table(&args)?;
    println!("E={} k={}", args.experts, args.top_k);
    println!("{:>8} {:>10} {:>9}", "batch", "unique", "of E");
    for (b, unique) in rows {
        println!(
            "{:>8} {:>10.2} {:>8.1}%",
            b,
            unique,
            unique / f64::from(args.experts) * 100.0
        );
    }
    Ok(())
}
