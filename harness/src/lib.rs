//! NIC test harness library
//!
//! Drives correctness/performance scenarios against a priority-aware NIC
//! reached through raw frame I/O: packetizes stimulus messages, captures and
//! correlates the response traffic, and reduces the arrivals to latency and
//! throughput records.

pub mod capture;
pub mod config;
pub mod link;
pub mod output;
pub mod packetize;
pub mod reassemble;
pub mod scenario;

pub use config::Config;
pub use config::ScenarioKind;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::link::RawLink;
use crate::scenario::{ScenarioDriver, ScenarioSummary};

/// Run the configured scenario against the given link.
pub async fn run_harness(config: Config, link: Arc<dyn RawLink>) -> Result<ScenarioSummary> {
    config.validate().context("Invalid configuration")?;

    let scenario = config.scenario;
    let driver = ScenarioDriver::new(link, config);

    info!("Running scenario {:?}", scenario);
    match scenario {
        ScenarioKind::Loopback => scenario::loopback(&driver).await,
        ScenarioKind::PriorityMix => scenario::priority_mix(&driver).await,
        ScenarioKind::Throughput => scenario::throughput(&driver).await,
        ScenarioKind::ScatterGather => scenario::scatter_gather(&driver).await,
    }
}
