//! Capture/correlate engine
//!
//! One capture session per test invocation: arm before transmitting, await a
//! frame count or a deadline, then stop. The background task is the sole
//! consumer of the link's inbound stream; it decodes, filters, and pushes
//! matches into a bounded queue. Cancellation is explicit so one scenario's
//! capture can never observe the next scenario's traffic.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use nicbench_shared::protocol::wire;
use nicbench_shared::types::frame::WireFrame;
use nicbench_shared::utils::bytes_to_hex;

use crate::link::RawLink;

/// Inbound frame predicate applied by the capture task.
pub type FrameFilter = Arc<dyn Fn(&WireFrame) -> bool + Send + Sync>;

/// Counters reported when a session stops.
#[derive(Debug, Default, Clone, Copy)]
pub struct CaptureStats {
    /// Raw frames read off the link
    pub seen: u64,
    /// Frames that passed the filter
    pub matched: u64,
    /// Frames dropped because the header would not decode
    pub decode_errors: u64,
}

/// An armed capture session.
pub struct CaptureSession {
    rx: mpsc::Receiver<WireFrame>,
    cancel: CancellationToken,
    task: JoinHandle<CaptureStats>,
}

impl CaptureSession {
    /// Subscribe to the link and start recording matching frames.
    ///
    /// Must be called before the stimulus is transmitted; a response that
    /// arrives before the session exists is lost. Matches queue into a
    /// bounded channel of `capacity` frames.
    pub fn arm(link: &dyn RawLink, filter: FrameFilter, capacity: usize) -> Self {
        let mut raw_rx = link.subscribe();
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let cancel = CancellationToken::new();
        let child = cancel.clone();

        let task = tokio::spawn(async move {
            let mut stats = CaptureStats::default();
            loop {
                tokio::select! {
                    _ = child.cancelled() => break,
                    raw = raw_rx.recv() => {
                        let Some(raw) = raw else { break };
                        stats.seen += 1;
                        let frame = match wire::decode(&raw) {
                            Ok(frame) => frame,
                            Err(e) => {
                                // One bad frame never takes the capture task
                                // down; the link must stay attended.
                                stats.decode_errors += 1;
                                warn!(
                                    "dropping undecodable frame: {} ({})",
                                    e,
                                    bytes_to_hex(&raw[..raw.len().min(wire::HEADER_LEN)])
                                );
                                continue;
                            }
                        };
                        if !filter(&frame) {
                            continue;
                        }
                        stats.matched += 1;
                        tokio::select! {
                            _ = child.cancelled() => break,
                            res = tx.send(frame) => {
                                if res.is_err() {
                                    break; // receiver side torn down
                                }
                            }
                        }
                    }
                }
            }
            stats
        });

        Self { rx, cancel, task }
    }

    /// Block until `count` matching frames have been captured or `timeout`
    /// elapses, whichever comes first. Returns the frames captured so far in
    /// arrival order; a short list is the caller's signal that the
    /// expectation was not met.
    pub async fn await_frames(&mut self, count: usize, timeout: Duration) -> Vec<WireFrame> {
        let deadline = tokio::time::Instant::now() + timeout;
        let mut frames = Vec::with_capacity(count);
        while frames.len() < count {
            match tokio::time::timeout_at(deadline, self.rx.recv()).await {
                Ok(Some(frame)) => frames.push(frame),
                Ok(None) => break,
                Err(_) => {
                    debug!(
                        "capture deadline elapsed with {}/{} frames",
                        frames.len(),
                        count
                    );
                    break;
                }
            }
        }
        frames
    }

    /// Cancel the background task and collect its counters. Required between
    /// scenarios: an un-stopped session would keep observing the link.
    pub async fn stop(self) -> CaptureStats {
        self.cancel.cancel();
        drop(self.rx);
        self.task.await.unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::MemLink;
    use std::time::Instant;

    fn data_frame(src: u16, dst: u16) -> Vec<u8> {
        wire::encode(&WireFrame::data(src, dst, 8, 0, vec![0u8; 8]))
    }

    fn dst_filter(dst: u16) -> FrameFilter {
        Arc::new(move |f: &WireFrame| f.is_data() && f.dst_context == dst)
    }

    #[tokio::test]
    async fn test_returns_exactly_count_when_available() {
        let (near, far) = MemLink::pair();
        let mut session = CaptureSession::arm(&near, dst_filter(0x1234), 64);
        for _ in 0..5 {
            far.transmit(data_frame(0, 0x1234)).unwrap();
        }
        let frames = session.await_frames(3, Duration::from_secs(1)).await;
        assert_eq!(frames.len(), 3);
        let stats = session.stop().await;
        assert_eq!(stats.decode_errors, 0);
        assert!(stats.matched >= 3);
    }

    #[tokio::test]
    async fn test_timeout_returns_short_list() {
        let (near, far) = MemLink::pair();
        let mut session = CaptureSession::arm(&near, dst_filter(0x1234), 64);
        far.transmit(data_frame(0, 0x1234)).unwrap();

        let start = Instant::now();
        let frames = session.await_frames(4, Duration::from_millis(100)).await;
        let elapsed = start.elapsed();

        assert_eq!(frames.len(), 1);
        assert!(elapsed >= Duration::from_millis(100));
        assert!(elapsed < Duration::from_millis(600), "blocked past deadline");
        session.stop().await;
    }

    #[tokio::test]
    async fn test_filter_and_decode_errors() {
        let (near, far) = MemLink::pair();
        let mut session = CaptureSession::arm(&near, dst_filter(0x1234), 64);

        far.transmit(vec![0xFF; 4]).unwrap(); // truncated header
        far.transmit(data_frame(0, 0x9999)).unwrap(); // wrong destination
        far.transmit(vec![0u8; 13]).unwrap(); // non-DATA control frame
        far.transmit(data_frame(7, 0x1234)).unwrap();

        let frames = session.await_frames(1, Duration::from_secs(1)).await;
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].src_context, 7);

        let stats = session.stop().await;
        assert_eq!(stats.decode_errors, 1);
        assert_eq!(stats.matched, 1);
        assert_eq!(stats.seen, 4);
    }

    #[tokio::test]
    async fn test_arrival_order_preserved() {
        let (near, far) = MemLink::pair();
        let mut session = CaptureSession::arm(&near, dst_filter(1), 64);
        for src in 0..10u16 {
            far.transmit(data_frame(src, 1)).unwrap();
        }
        let frames = session.await_frames(10, Duration::from_secs(1)).await;
        let order: Vec<u16> = frames.iter().map(|f| f.src_context).collect();
        assert_eq!(order, (0..10u16).collect::<Vec<_>>());
        session.stop().await;
    }

    #[tokio::test]
    async fn test_stopped_session_frees_the_link() {
        let (near, far) = MemLink::pair();
        let mut session = CaptureSession::arm(&near, dst_filter(1), 64);
        far.transmit(data_frame(0, 1)).unwrap();
        session.await_frames(1, Duration::from_secs(1)).await;
        session.stop().await;

        // A fresh session must not see anything from before its arming
        let mut next = CaptureSession::arm(&near, dst_filter(1), 64);
        let frames = next.await_frames(1, Duration::from_millis(50)).await;
        assert!(frames.is_empty());
        next.stop().await;
    }
}
