//! Configuration types for the test harness
//!
//! Everything the original bench scripts kept as module-level constants
//! (contexts, segment size, pacing, timeouts) lives in one explicit struct
//! passed into the scenario driver; there is no process-wide state.

use std::time::Duration;

use nicbench_shared::types::frame::Context;

/// Which test scenario to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioKind {
    Loopback,
    PriorityMix,
    Throughput,
    ScatterGather,
}

impl std::str::FromStr for ScenarioKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "loopback" => Ok(ScenarioKind::Loopback),
            "priority-mix" => Ok(ScenarioKind::PriorityMix),
            "throughput" => Ok(ScenarioKind::Throughput),
            "scatter-gather" => Ok(ScenarioKind::ScatterGather),
            _ => anyhow::bail!("Invalid scenario: {}", s),
        }
    }
}

/// Harness configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Scenario to run
    pub scenario: ScenarioKind,

    /// The harness's own context; responses are addressed here
    pub my_context: Context,

    /// Destination context for plain stimulus traffic
    pub dst_context: Context,

    /// Low-priority endpoint context
    pub low_context: Context,

    /// High-priority endpoint context
    pub high_context: Context,

    /// Number of stimulus messages per scenario run
    pub count: usize,

    /// Application message length in bytes
    pub msg_len: usize,

    /// Maximum payload bytes per frame: total packet length minus header
    /// overhead. A configuration constant, not derived per call.
    pub max_seg_bytes: usize,

    /// Fixed delay between transmitted frames (0 = unpaced)
    pub inter_frame_delay: Duration,

    /// Capture deadline. Required: the harness must never block forever on a
    /// non-responding device.
    pub timeout: Duration,

    /// Fraction of high-priority traffic in the priority-mix scenario
    pub high_fraction: f64,

    /// Fan-out width for the scatter-gather scenario
    pub fanout: usize,

    /// Optional JSON output path for captured records
    pub json_output: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scenario: ScenarioKind::Loopback,
            my_context: 0x1234,
            dst_context: 0,
            low_context: 1,
            high_context: 0,
            count: 32,
            msg_len: 64,
            max_seg_bytes: 64,
            inter_frame_delay: Duration::ZERO,
            timeout: Duration::from_secs(5),
            high_fraction: 0.5,
            fanout: 3,
            json_output: None,
        }
    }
}

impl Config {
    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.max_seg_bytes == 0 {
            anyhow::bail!("Segment size must be greater than 0");
        }

        if self.count == 0 {
            anyhow::bail!("Message count must be greater than 0");
        }

        if self.msg_len < 8 {
            anyhow::bail!("Message length must be at least 8 bytes to carry a latency stamp");
        }

        if self.timeout.is_zero() {
            anyhow::bail!("Capture timeout must be greater than 0");
        }

        if !(0.0..=1.0).contains(&self.high_fraction) {
            anyhow::bail!("High-priority fraction must be within [0, 1]");
        }

        if self.fanout == 0 {
            anyhow::bail!("Fan-out must be greater than 0");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_zero_segment_size_rejected() {
        let config = Config {
            max_seg_bytes: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = Config {
            timeout: Duration::ZERO,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_fraction_out_of_range_rejected() {
        let config = Config {
            high_fraction: 1.5,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_short_message_rejected() {
        let config = Config {
            msg_len: 4,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_scenario_kind_from_str() {
        assert_eq!(
            "priority-mix".parse::<ScenarioKind>().unwrap(),
            ScenarioKind::PriorityMix
        );
        assert_eq!(
            "Loopback".parse::<ScenarioKind>().unwrap(),
            ScenarioKind::Loopback
        );
        assert!("othello".parse::<ScenarioKind>().is_err());
    }
}
