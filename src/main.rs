// Rigminer - Free and Open Source Software Statement
//
// File: src/main.rs
// Version: 1.0.0
//
// Command line entry point: benchmark the CPU reference runtime or list the
// accelerators it exposes. Solo and pool mining need an upstream supplied by
// an embedding application.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use log::{error, info};
use rigminer::{
    AcceleratorRuntime, CpuRuntime, HealthTelemetry, Miner, MinerConfig, NoTelemetry,
    NvidiaSmiTelemetry, Result,
    core::{Sha256dHasher, types::Args},
    utils::{FormatUtils, init_logging},
};

const LOG_TARGET: &str = "rigminer::main";

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Validate arguments
    if let Err(err) = args.validate() {
        eprintln!("❌ Error: {}", err);
        std::process::exit(1);
    }

    init_logging(args.log_config.as_deref(), &args.log_level)?;

    let config = match &args.config {
        Some(path) => MinerConfig::load(path)?,
        None => MinerConfig::from_args(&args),
    };

    let runtime = CpuRuntime::new(config.cpu_devices, config.pow_limit()?, Arc::new(Sha256dHasher));

    if args.list_devices {
        return list_devices(&runtime, &config);
    }

    if !config.benchmark {
        eprintln!(
            "❌ Error: {} mining needs a node or pool client from an embedding application; use --benchmark",
            config.mode
        );
        std::process::exit(1);
    }

    let telemetry: Arc<dyn HealthTelemetry> = if args.nvidia_smi {
        Arc::new(NvidiaSmiTelemetry::new())
    } else {
        Arc::new(NoTelemetry)
    };

    let miner = Arc::new(Miner::new(config, &runtime, telemetry, None)?);

    let signal_miner = Arc::clone(&miner);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!(target: LOG_TARGET,"Ctrl-C received"),
            Err(e) => error!(target: LOG_TARGET,"Failed to listen for Ctrl-C: {}", e),
        }
        signal_miner.stop();
    });

    if args.duration > 0 {
        let timer_miner = Arc::clone(&miner);
        let duration = Duration::from_secs(args.duration);
        tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            info!(target: LOG_TARGET,"⏱️ Benchmark duration of {}s reached", duration.as_secs());
            timer_miner.stop();
        });
    }

    Arc::clone(&miner).run().await?;

    info!(target: LOG_TARGET,"📊 BENCHMARK RESULTS");
    let statuses = miner.device_statuses();
    let total: f64 = statuses.iter().filter_map(|s| s.hash_rate).sum();
    for status in &statuses {
        info!(target: LOG_TARGET,"├─ {}", status.summary_line());
        info!(target: LOG_TARGET,"│  {}", status.share_line());
    }
    info!(target: LOG_TARGET,"└─ Total: {}", FormatUtils::format_hashrate(total));
    Ok(())
}

fn list_devices(runtime: &dyn AcceleratorRuntime, config: &MinerConfig) -> Result<()> {
    let bindings = runtime
        .enumerate()
        .map_err(|e| format!("Failed to enumerate {} devices: {:#}", runtime.name(), e))?;
    println!("{} accelerator(s) on the {} runtime:", bindings.len(), runtime.name());
    for binding in &bindings {
        let info = binding.info();
        println!(
            "  #{:<3} {:<24} {:<7} {}",
            info.index,
            info.name,
            info.kind.to_string(),
            if config.is_device_permitted(info.index) {
                "enabled"
            } else {
                "disabled"
            }
        );
    }
    Ok(())
}
