//! NIC test harness
//!
//! Main entry point: builds a scenario configuration from CLI arguments and
//! runs it over an in-memory link with an echo peer standing in for the
//! device under test. Pointing the harness at real hardware means supplying
//! a different `RawLink` implementation.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use nicbench_harness::link::{spawn_echo_peer, MemLink};
use nicbench_harness::{output, run_harness, Config};
use nicbench_shared::utils::parse_duration;

#[derive(Parser, Debug)]
#[command(name = "nicbench")]
#[command(about = "Latency/throughput test harness for a priority-aware NIC", long_about = None)]
#[command(version)]
struct Args {
    /// Scenario to run (loopback, priority-mix, throughput, scatter-gather)
    #[arg(short, long, default_value = "loopback")]
    scenario: String,

    /// The harness's own context id; responses are addressed here
    #[arg(long, default_value_t = 0x1234)]
    context: u16,

    /// Destination context for stimulus traffic
    #[arg(long, default_value_t = 0)]
    dst_context: u16,

    /// Number of stimulus messages
    #[arg(short, long, default_value_t = 32)]
    count: usize,

    /// Application message length in bytes
    #[arg(short, long, default_value_t = 64)]
    msg_len: usize,

    /// Maximum payload bytes per frame (packet length minus header overhead)
    #[arg(long, default_value_t = 64)]
    seg_bytes: usize,

    /// Delay between transmitted frames (e.g. "1ms"; 0 = unpaced)
    #[arg(long, default_value = "0ms")]
    pace: String,

    /// Capture timeout (e.g. "5s")
    #[arg(short, long, default_value = "5s")]
    timeout: String,

    /// Fraction of high-priority traffic for priority-mix
    #[arg(long, default_value_t = 0.5)]
    high_fraction: f64,

    /// Fan-out width for scatter-gather
    #[arg(long, default_value_t = 3)]
    fanout: usize,

    /// Write captured records to a JSON file
    #[arg(long)]
    json: Option<String>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_tracing(args.verbose);

    info!("Starting NIC test harness");
    info!("Configuration: {:?}", args);

    let config = Config {
        scenario: args.scenario.parse()?,
        my_context: args.context,
        dst_context: args.dst_context,
        low_context: 1,
        high_context: 0,
        count: args.count,
        msg_len: args.msg_len,
        max_seg_bytes: args.seg_bytes,
        inter_frame_delay: parse_duration(&args.pace)?,
        timeout: parse_duration(&args.timeout)?,
        high_fraction: args.high_fraction,
        fanout: args.fanout,
        json_output: args.json.clone(),
    };

    // Demo topology: in-memory link with an echo peer on the far side
    let (near, far) = MemLink::pair();
    let cancel = CancellationToken::new();
    let peer = spawn_echo_peer(far, cancel.clone());

    let result = run_harness(config.clone(), Arc::new(near)).await;

    cancel.cancel();
    let _ = peer.await;

    let summary = result?;
    info!(
        "Scenario '{}': {} record(s), passed = {}",
        summary.name,
        summary.records.len(),
        summary.passed
    );
    if let Some(mean) = summary.mean_latency_cycles {
        info!("Mean latency = {:.0} cycles", mean);
    }
    for (context, mean) in &summary.mean_latency_by_context {
        info!("  context {:#x}: mean latency = {:.0} cycles", context, mean);
    }
    if let Some(tp) = summary.throughput_pkts_per_cycle {
        info!("Throughput = {:.6} pkts/cycle", tp);
    }

    if let Some(path) = &config.json_output {
        output::generate_json(&summary.records, path)?;
    }

    if !summary.passed {
        error!("Scenario '{}' failed its expectation", summary.name);
        anyhow::bail!("scenario failed");
    }

    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}
