use bw_engine::Catalog;
use clap::Parser;
use moe_bw::cli::{Cli, Commands};
use moe_bw::sweep::Axis;
use moe_bw::{estimate, experts, sweep};
use std::fs;

fn builtin() -> Catalog {
    Catalog::builtin().unwrap()
}

#[test]
fn test_estimate_defaults() {
    let cli = Cli::try_parse_from(["moe_bw", "estimate"]).unwrap();
    let Commands::Estimate(args) = cli.command else {
        panic!("expected estimate");
    };
    assert_eq!(args.workload.model, "deepseek-v2-lite");
    assert_eq!(args.hardware.hardware, "a6000");
    assert_eq!(args.hardware.gpus, 1);
    assert!(!args.json);

    let report = estimate::build_report(&args, &builtin()).unwrap();
    assert!(report.calibrated);
    assert!(report.measured_utilization);
    assert_eq!(report.workload.batch_size, 1);
    assert_eq!(report.average_context_length, 4128.5);
    assert_eq!(report.demand.kv_cache_gb, 0.0);
    assert!((report.hardware.utilization_percent - 34.5163434301608).abs() < 1e-9);
    // (1.024 + 7.78 * 0.229) GB per step at 50 ms
    assert!((report.demand.required_bandwidth_gbs - 56.13).abs() < 0.1);
    assert!(report.comparison.meets_target);
}

#[test]
fn test_scenario_then_explicit_flags() {
    let cli = Cli::try_parse_from([
        "moe_bw", "estimate", "-m", "qwen3", "--scenario", "13k-1k", "--output-tokens", "500",
        "-b", "16", "--slo-ms", "25", "--hardware", "h100-sxm", "--gpus", "2",
    ])
    .unwrap();
    let Commands::Estimate(args) = cli.command else {
        panic!("expected estimate");
    };
    let report = estimate::build_report(&args, &builtin()).unwrap();

    assert_eq!(report.workload.input_tokens, 13000);
    assert_eq!(report.workload.output_tokens, 500);
    assert_eq!(report.workload.batch_size, 16);
    assert_eq!(report.workload.target_latency_ms, 25.0);
    assert!(!report.calibrated);
    assert!(!report.measured_utilization);
    assert!(report.demand.kv_cache_gb > 0.0);
    assert!(report.demand.breakdown.is_some());
    assert!((report.comparison.supply_gbs - 3350.0 * 2.0 * 0.1633).abs() < 1e-6);
}

#[test]
fn test_smbu_override_and_unmeasured_batch() {
    let catalog = builtin();

    let cli = Cli::try_parse_from(["moe_bw", "estimate", "-b", "3"]).unwrap();
    let Commands::Estimate(args) = cli.command else {
        panic!("expected estimate");
    };
    let report = estimate::build_report(&args, &catalog).unwrap();
    assert!(!report.measured_utilization);
    assert_eq!(report.hardware.utilization_percent, 16.33);

    let cli =
        Cli::try_parse_from(["moe_bw", "estimate", "-b", "3", "--nearest-utilization"]).unwrap();
    let Commands::Estimate(args) = cli.command else {
        panic!("expected estimate");
    };
    let report = estimate::build_report(&args, &catalog).unwrap();
    assert!((report.hardware.utilization_percent - 38.6).abs() < 1e-9);

    let cli = Cli::try_parse_from(["moe_bw", "estimate", "--smbu", "50", "--bandwidth", "1000"])
        .unwrap();
    let Commands::Estimate(args) = cli.command else {
        panic!("expected estimate");
    };
    let report = estimate::build_report(&args, &catalog).unwrap();
    assert_eq!(report.comparison.supply_gbs, 500.0);
}

#[test]
fn test_estimate_rejects_bad_inputs() {
    let catalog = builtin();
    for argv in [
        vec!["moe_bw", "estimate", "-m", "gpt-5"],
        vec!["moe_bw", "estimate", "--hardware", "tpu"],
        vec!["moe_bw", "estimate", "-b", "0"],
        vec!["moe_bw", "estimate", "--slo-ms", "0"],
        vec!["moe_bw", "estimate", "--gpus", "0"],
    ] {
        let cli = Cli::try_parse_from(argv.clone()).unwrap();
        let Commands::Estimate(args) = cli.command else {
            panic!("expected estimate");
        };
        assert!(estimate::build_report(&args, &catalog).is_err(), "{:?}", argv);
    }
}

#[test]
fn test_sweep_series() {
    let catalog = builtin();

    let cli = Cli::try_parse_from(["moe_bw", "sweep", "-m", "mixtral-8x22b"]).unwrap();
    let Commands::Sweep(args) = cli.command else {
        panic!("expected sweep");
    };
    assert_eq!(args.axis, Axis::Batch);
    let report = sweep::build_series(&args, &catalog).unwrap();
    assert_eq!(report.points.len(), 96);
    assert_eq!(report.points[0].x, 1);
    assert_eq!(report.points.last().unwrap().x, 256);

    let cli = Cli::try_parse_from(["moe_bw", "sweep", "--axis", "context", "-m", "qwen3"]).unwrap();
    let Commands::Sweep(args) = cli.command else {
        panic!("expected sweep");
    };
    let report = sweep::build_series(&args, &catalog).unwrap();
    assert_eq!(report.points.len(), 11);
    assert_eq!(report.points[0].x, 1024);
}

#[test]
fn test_experts_table() {
    let cli = Cli::try_parse_from(["moe_bw", "experts", "-e", "128", "-k", "8"]).unwrap();
    let Commands::Experts(args) = cli.command else {
        panic!("expected experts");
    };
    let rows = experts::table(&args).unwrap();
    let batches: Vec<u64> = rows.iter().map(|(b, _)| *b).collect();
    assert_eq!(batches, vec![1, 4, 8, 16, 32, 64, 128, 256]);
    assert!((rows[0].1 - 7.78).abs() < 0.05);
    assert!(rows.windows(2).all(|w| w[1].1 >= w[0].1));
    assert!(rows.iter().all(|(_, u)| *u <= 128.0));

    let cli = Cli::try_parse_from(["moe_bw", "experts", "-e", "8", "-k", "9"]).unwrap();
    let Commands::Experts(args) = cli.command else {
        panic!("expected experts");
    };
    assert!(experts::table(&args).is_err());
}

#[test]
fn test_catalog_flags_merge_user_files() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("extra.json"),
        r#"{
            "models": {
                "tiny": { "name": "Tiny", "num_experts": 4, "top_k": 1,
                          "expert_size_gb": 0.1, "rest_shared_gb": 0.2 }
            },
            "hardware": [{ "id": "lab", "name": "Lab box", "bandwidth_gbs": 100 }]
        }"#,
    )
    .unwrap();

    let dir_arg = dir.path().to_str().unwrap();
    let cli = Cli::try_parse_from([
        "moe_bw", "estimate", "-m", "tiny", "--hardware", "lab", "--catalog-dir", dir_arg,
    ])
    .unwrap();
    let catalog = cli.catalog.load().unwrap();
    assert!(catalog.model("qwen3").is_ok());

    let Commands::Estimate(args) = cli.command else {
        panic!("expected estimate");
    };
    let report = estimate::build_report(&args, &catalog).unwrap();
    assert_eq!(report.model_name, "Tiny");
    assert!((report.comparison.supply_gbs - 16.33).abs() < 1e-9);
}

#[test]
fn test_missing_catalog_file_is_error() {
    let cli =
        Cli::try_parse_from(["moe_bw", "list", "--catalog", "/nonexistent/catalog.json"]).unwrap();
    assert!(cli.catalog.load().is_err());
}
