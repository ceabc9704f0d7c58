//! Link abstraction
//!
//! The only I/O boundary of the harness. The core is agnostic to whether the
//! link is a tap device, a simulator socket, or an in-memory queue; it only
//! needs to transmit raw frames and to register a single inbound reader.

use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use nicbench_shared::protocol::wire;

/// Raw frame transport toward the system under test.
///
/// The inbound side is single-consumer: `subscribe` installs a fresh tap and
/// replaces any previous one, so a capture session torn down by one scenario
/// can never leak frames into the next. Frames arriving while no tap is
/// installed are dropped; the link is unattended, not buffered.
pub trait RawLink: Send + Sync {
    /// Transmit one raw frame.
    fn transmit(&self, raw: Vec<u8>) -> Result<()>;

    /// Install this side's inbound reader and return its frame stream.
    fn subscribe(&self) -> mpsc::UnboundedReceiver<Vec<u8>>;
}

type Tap = Arc<Mutex<Option<mpsc::UnboundedSender<Vec<u8>>>>>;

/// In-memory full-duplex link. One endpoint's `transmit` feeds the peer
/// endpoint's current tap.
pub struct MemLink {
    peer_tap: Tap,
    local_tap: Tap,
}

impl MemLink {
    /// Create a connected pair of endpoints.
    pub fn pair() -> (MemLink, MemLink) {
        let a: Tap = Arc::new(Mutex::new(None));
        let b: Tap = Arc::new(Mutex::new(None));
        (
            MemLink {
                peer_tap: b.clone(),
                local_tap: a.clone(),
            },
            MemLink {
                peer_tap: a,
                local_tap: b,
            },
        )
    }
}

impl RawLink for MemLink {
    fn transmit(&self, raw: Vec<u8>) -> Result<()> {
        let guard = self
            .peer_tap
            .lock()
            .map_err(|_| anyhow!("link tap lock poisoned"))?;
        match guard.as_ref() {
            // A send failure means the reader hung up mid-teardown; the frame
            // is dropped exactly as it would be with no tap installed.
            Some(tx) => {
                let _ = tx.send(raw);
            }
            None => debug!("dropping frame: link has no inbound reader"),
        }
        Ok(())
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<Vec<u8>> {
        let (tx, rx) = mpsc::unbounded_channel();
        if let Ok(mut guard) = self.local_tap.lock() {
            *guard = Some(tx);
        }
        rx
    }
}

/// Spawn a stand-in far endpoint for the demo binary and the end-to-end
/// tests. It echoes every DATA frame with src/dst contexts swapped and the
/// trailing 8 payload bytes overwritten with a big-endian elapsed-cycle
/// stamp, which is the response shape the built-in scenarios correlate on.
/// This is not a model of the device under test.
pub fn spawn_echo_peer(link: MemLink, cancel: CancellationToken) -> JoinHandle<()> {
    // Subscribe before spawning so no frame transmitted after this call can
    // arrive ahead of the tap.
    let mut rx = link.subscribe();
    tokio::spawn(async move {
        let epoch = std::time::Instant::now();
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                raw = rx.recv() => {
                    let Some(raw) = raw else { break };
                    let Ok(mut frame) = wire::decode(&raw) else { continue };
                    if !frame.is_data() {
                        continue;
                    }
                    std::mem::swap(&mut frame.src_context, &mut frame.dst_context);
                    let n = frame.payload.len();
                    if n >= 8 {
                        let cycles = epoch.elapsed().as_nanos() as u64;
                        frame.payload[n - 8..].copy_from_slice(&cycles.to_be_bytes());
                    }
                    let _ = link.transmit(wire::encode(&frame));
                }
            }
        }
    })
}
