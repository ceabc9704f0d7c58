//! Scenario driver
//!
//! Composes the packetizer, the capture engine, and the reassembler into one
//! test invocation: transmit a stimulus, await the expected responses, reduce
//! the captured arrivals to latency/throughput records. The built-in
//! scenarios mirror the device's bench suite (loopback, priority mix,
//! throughput, scatter/gather); application payload formats plug in through
//! the decoder seam and stay outside the driver.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use rand::seq::SliceRandom;
use serde::Serialize;
use tracing::{debug, info, warn};

use nicbench_shared::protocol::wire;
use nicbench_shared::types::frame::{Context, WireFrame};
use nicbench_shared::types::record::{CapturedRecord, Message};

use crate::capture::{CaptureSession, CaptureStats, FrameFilter};
use crate::config::Config;
use crate::link::RawLink;
use crate::packetize::packetize;
use crate::reassemble::Reassembler;

/// Depth of the bounded queue between the capture task and the driver.
const CAPTURE_QUEUE_DEPTH: usize = 1024;

/// Maps a reassembled message to a record. Application-specific payload
/// formats implement this seam; `None` means the payload did not carry the
/// fields the decoder needs.
pub type MessageDecoder = fn(&Message) -> Option<CapturedRecord>;

/// The default decoder: latency from the trailing 8 payload bytes, timestamp
/// from the 4 bytes before, context from the responder.
pub fn latency_decoder(msg: &Message) -> Option<CapturedRecord> {
    CapturedRecord::from_message(msg)
}

/// Result of one capture/correlate invocation.
#[derive(Debug)]
pub struct ScenarioOutcome {
    /// Records in arrival order of their completing frames
    pub records: Vec<CapturedRecord>,
    /// Matching frames captured before the deadline
    pub captured: usize,
    /// Frames the caller asked for
    pub expected: usize,
    /// Protocol violations observed during reassembly
    pub reassembly_errors: u64,
    /// Messages the decoder could not interpret
    pub decode_failures: u64,
    /// Capture-task counters
    pub stats: CaptureStats,
}

impl ScenarioOutcome {
    /// Whether the expected frame count was reached before the deadline.
    pub fn is_complete(&self) -> bool {
        self.captured >= self.expected
    }
}

/// Per-scenario summary reduced from the captured records.
#[derive(Debug, Serialize)]
pub struct ScenarioSummary {
    pub name: String,
    pub passed: bool,
    pub records: Vec<CapturedRecord>,
    pub mean_latency_cycles: Option<f64>,
    /// Mean latency per responding context, sorted by context
    pub mean_latency_by_context: Vec<(u64, f64)>,
    pub throughput_pkts_per_cycle: Option<f64>,
}

impl ScenarioSummary {
    fn from_records(name: &str, passed: bool, records: Vec<CapturedRecord>) -> Self {
        let mean_latency_cycles = mean(records.iter().map(|r| r.latency_cycles));
        let mut by_context: BTreeMap<u64, Vec<u64>> = BTreeMap::new();
        for rec in &records {
            by_context.entry(rec.context).or_default().push(rec.latency_cycles);
        }
        let mean_latency_by_context = by_context
            .into_iter()
            .filter_map(|(ctx, lat)| mean(lat.into_iter()).map(|m| (ctx, m)))
            .collect();
        Self {
            name: name.to_string(),
            passed,
            records,
            mean_latency_cycles,
            mean_latency_by_context,
            throughput_pkts_per_cycle: None,
        }
    }
}

fn mean(values: impl Iterator<Item = u64>) -> Option<f64> {
    let mut sum = 0u128;
    let mut n = 0u64;
    for v in values {
        sum += u128::from(v);
        n += 1;
    }
    if n == 0 {
        None
    } else {
        Some(sum as f64 / n as f64)
    }
}

/// Drives one scenario at a time against a single link.
pub struct ScenarioDriver {
    link: Arc<dyn RawLink>,
    config: Config,
}

impl ScenarioDriver {
    pub fn new(link: Arc<dyn RawLink>, config: Config) -> Self {
        Self { link, config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run one capture/correlate invocation: arm, transmit, await, correlate.
    ///
    /// A short capture (timeout before `expected_count`) is not an error;
    /// the caller inspects [`ScenarioOutcome::is_complete`]. Reassembly and
    /// decode failures abort only the offending message and are surfaced as
    /// counters.
    pub async fn run_scenario(
        &self,
        stimulus: &[WireFrame],
        expected_count: usize,
        timeout: Duration,
        decoder: MessageDecoder,
    ) -> Result<ScenarioOutcome> {
        let my_context = self.config.my_context;
        let filter: FrameFilter =
            Arc::new(move |f: &WireFrame| f.is_data() && f.dst_context == my_context);

        // Armed before the first transmit so a fast response cannot be missed
        let mut session = CaptureSession::arm(self.link.as_ref(), filter, CAPTURE_QUEUE_DEPTH);

        for frame in stimulus {
            self.link
                .transmit(wire::encode(frame))
                .context("stimulus transmit failed")?;
            if !self.config.inter_frame_delay.is_zero() {
                tokio::time::sleep(self.config.inter_frame_delay).await;
            }
        }
        debug!("transmitted {} stimulus frame(s)", stimulus.len());

        let frames = session.await_frames(expected_count, timeout).await;
        let stats = session.stop().await;
        let captured = frames.len();

        let mut reassembler = Reassembler::new();
        let mut records = Vec::new();
        let mut reassembly_errors = 0u64;
        let mut decode_failures = 0u64;
        for frame in &frames {
            match reassembler.accept(frame) {
                Ok(Some(msg)) => match decoder(&msg) {
                    Some(rec) => records.push(rec),
                    None => {
                        decode_failures += 1;
                        warn!(
                            "message from {:#x} ({} bytes) had no decodable record",
                            msg.src_context,
                            msg.payload.len()
                        );
                    }
                },
                Ok(None) => {}
                Err(e) => {
                    reassembly_errors += 1;
                    warn!("reassembly violation: {}", e);
                }
            }
        }
        if reassembler.in_flight() > 0 {
            debug!(
                "{} message(s) still incomplete at capture end",
                reassembler.in_flight()
            );
        }

        info!(
            "captured {}/{} frame(s), {} record(s), {} reassembly error(s)",
            captured,
            expected_count,
            records.len(),
            reassembly_errors
        );

        Ok(ScenarioOutcome {
            records,
            captured,
            expected: expected_count,
            reassembly_errors,
            decode_failures,
            stats,
        })
    }
}

/// Echo one multi-frame zero-filled message off the device and verify the
/// payload length survives the round trip.
pub async fn loopback(driver: &ScenarioDriver) -> Result<ScenarioSummary> {
    let cfg = driver.config();
    let payload = vec![0u8; cfg.msg_len];
    let stimulus = packetize(cfg.my_context, cfg.dst_context, &payload, cfg.max_seg_bytes)?;
    info!(
        "loopback: {} byte message in {} frame(s)",
        cfg.msg_len,
        stimulus.len()
    );

    let expected = stimulus.len();
    let outcome = driver
        .run_scenario(&stimulus, expected, cfg.timeout, latency_decoder)
        .await?;

    let passed = outcome.is_complete()
        && outcome.reassembly_errors == 0
        && outcome.records.len() == 1;
    Ok(ScenarioSummary::from_records("loopback", passed, outcome.records))
}

/// Single-frame messages addressed to the low/high priority contexts in a
/// shuffled order; reports mean latency per priority class.
pub async fn priority_mix(driver: &ScenarioDriver) -> Result<ScenarioSummary> {
    let cfg = driver.config();
    let high_count = (cfg.high_fraction * cfg.count as f64) as usize;

    let mut destinations: Vec<Context> = Vec::with_capacity(cfg.count);
    destinations.resize(high_count.min(cfg.count), cfg.high_context);
    destinations.resize(cfg.count, cfg.low_context);
    destinations.shuffle(&mut rand::thread_rng());

    let payload = vec![0u8; cfg.msg_len];
    let mut stimulus = Vec::with_capacity(cfg.count);
    for dst in &destinations {
        stimulus.extend(packetize(cfg.my_context, *dst, &payload, cfg.max_seg_bytes)?);
    }
    info!(
        "priority-mix: {} message(s), {} high / {} low",
        cfg.count,
        high_count,
        cfg.count - high_count
    );

    let expected = stimulus.len();
    let outcome = driver
        .run_scenario(&stimulus, expected, cfg.timeout, latency_decoder)
        .await?;

    let known = [u64::from(cfg.low_context), u64::from(cfg.high_context)];
    let passed = outcome.is_complete()
        && outcome.reassembly_errors == 0
        && outcome.records.len() == cfg.count
        && outcome.records.iter().all(|r| known.contains(&r.context));
    Ok(ScenarioSummary::from_records(
        "priority-mix",
        passed,
        outcome.records,
    ))
}

/// Paced single-frame messages; throughput is the frame count over the last
/// response's cumulative cycle stamp.
pub async fn throughput(driver: &ScenarioDriver) -> Result<ScenarioSummary> {
    let cfg = driver.config();
    let payload = vec![0u8; cfg.msg_len];
    let mut stimulus = Vec::with_capacity(cfg.count);
    for _ in 0..cfg.count {
        stimulus.extend(packetize(cfg.my_context, cfg.dst_context, &payload, cfg.max_seg_bytes)?);
    }

    let expected = stimulus.len();
    let outcome = driver
        .run_scenario(&stimulus, expected, cfg.timeout, latency_decoder)
        .await?;

    let passed = outcome.is_complete()
        && outcome.reassembly_errors == 0
        && outcome.records.len() == cfg.count;
    let pkts_per_cycle = outcome
        .records
        .last()
        .filter(|last| last.latency_cycles > 0)
        .map(|last| outcome.captured as f64 / last.latency_cycles as f64);

    let mut summary = ScenarioSummary::from_records("throughput", passed, outcome.records);
    summary.throughput_pkts_per_cycle = pkts_per_cycle;
    if let Some(tp) = pkts_per_cycle {
        info!("throughput = {:.6} pkts/cycle", tp);
    }
    Ok(summary)
}

/// Two strictly sequenced phases: scatter `fanout` single-frame requests and
/// await one response each, then gather one segmented message whose frames
/// fan back in to a single record.
pub async fn scatter_gather(driver: &ScenarioDriver) -> Result<ScenarioSummary> {
    let cfg = driver.config();
    let payload = vec![0u8; cfg.msg_len];

    let mut scatter = Vec::with_capacity(cfg.fanout);
    for _ in 0..cfg.fanout {
        scatter.extend(packetize(cfg.my_context, cfg.dst_context, &payload, cfg.max_seg_bytes)?);
    }
    let scatter_expected = scatter.len();
    let scatter_outcome = driver
        .run_scenario(&scatter, scatter_expected, cfg.timeout, latency_decoder)
        .await?;

    // The scatter capture is fully torn down before the gather phase arms
    let gather_payload = vec![0u8; cfg.max_seg_bytes * cfg.fanout];
    let gather = packetize(
        cfg.my_context,
        cfg.dst_context,
        &gather_payload,
        cfg.max_seg_bytes,
    )?;
    let gather_outcome = driver
        .run_scenario(&gather, gather.len(), cfg.timeout, latency_decoder)
        .await?;

    let passed = scatter_outcome.is_complete()
        && gather_outcome.is_complete()
        && scatter_outcome.reassembly_errors == 0
        && gather_outcome.reassembly_errors == 0
        && scatter_outcome.records.len() == cfg.fanout
        && gather_outcome.records.len() == 1;

    let mut records = scatter_outcome.records;
    records.extend(gather_outcome.records);
    Ok(ScenarioSummary::from_records("scatter-gather", passed, records))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(context: u64, latency: u64) -> CapturedRecord {
        CapturedRecord {
            context,
            timestamp: 0,
            latency_cycles: latency,
        }
    }

    #[test]
    fn test_summary_means() {
        let summary = ScenarioSummary::from_records(
            "x",
            true,
            vec![rec(0, 100), rec(1, 300), rec(0, 200)],
        );
        assert_eq!(summary.mean_latency_cycles, Some(200.0));
        assert_eq!(
            summary.mean_latency_by_context,
            vec![(0, 150.0), (1, 300.0)]
        );
    }

    #[test]
    fn test_summary_empty_records() {
        let summary = ScenarioSummary::from_records("x", false, vec![]);
        assert_eq!(summary.mean_latency_cycles, None);
        assert!(summary.mean_latency_by_context.is_empty());
    }

    #[test]
    fn test_outcome_completeness() {
        let outcome = ScenarioOutcome {
            records: vec![],
            captured: 3,
            expected: 4,
            reassembly_errors: 0,
            decode_failures: 0,
            stats: CaptureStats::default(),
        };
        assert!(!outcome.is_complete());
    }
}
