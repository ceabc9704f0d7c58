//! Message reassembler
//!
//! Consumes the captured frame stream and reconstructs complete per-context
//! messages. Frames of one message are accumulated in arrival order and the
//! message completes exactly when the accumulated byte count reaches the
//! declared `msg_len`; a mismatch is a protocol violation, never silently
//! tolerated.

use std::collections::HashMap;

use thiserror::Error;

use nicbench_shared::types::frame::{Context, WireFrame};
use nicbench_shared::types::record::Message;

/// Sequencing/length invariant violation. The offending in-flight buffer is
/// discarded; the reassembler itself stays usable.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReassemblyError {
    #[error("frame for ({src:#x} -> {dst:#x}) at pkt_offset {pkt_offset} with no message in flight")]
    Orphan {
        src: Context,
        dst: Context,
        pkt_offset: u32,
    },

    #[error("message ({src:#x} -> {dst:#x}) declared {expected} bytes but a frame re-declares {declared}")]
    LengthChanged {
        src: Context,
        dst: Context,
        expected: u32,
        declared: u32,
    },

    #[error("message ({src:#x} -> {dst:#x}) overflows its declared length: {got} bytes accumulated, {expected} declared")]
    Overflow {
        src: Context,
        dst: Context,
        expected: u32,
        got: usize,
    },
}

struct InFlight {
    expected: u32,
    buf: Vec<u8>,
}

/// Per-key reassembly state. The key is `(src_context, dst_context)`: the
/// harness filters on `dst_context`, and `src_context` keeps concurrent
/// senders apart. At most one message per key is in flight; once a message
/// reaches `msg_len` the next offset-0 frame on that key starts a new one.
#[derive(Default)]
pub struct Reassembler {
    in_flight: HashMap<(Context, Context), InFlight>,
}

impl Reassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Absorb one frame. Returns the completed message when this frame
    /// brings its key to the declared length.
    pub fn accept(&mut self, frame: &WireFrame) -> Result<Option<Message>, ReassemblyError> {
        let key = (frame.src_context, frame.dst_context);

        if let Some(partial) = self.in_flight.get_mut(&key) {
            if frame.msg_len != partial.expected {
                let expected = partial.expected;
                self.in_flight.remove(&key);
                return Err(ReassemblyError::LengthChanged {
                    src: key.0,
                    dst: key.1,
                    expected,
                    declared: frame.msg_len,
                });
            }
            partial.buf.extend_from_slice(&frame.payload);
        } else {
            if frame.pkt_offset != 0 {
                return Err(ReassemblyError::Orphan {
                    src: key.0,
                    dst: key.1,
                    pkt_offset: frame.pkt_offset,
                });
            }
            let mut buf = Vec::with_capacity(frame.msg_len as usize);
            buf.extend_from_slice(&frame.payload);
            self.in_flight.insert(
                key,
                InFlight {
                    expected: frame.msg_len,
                    buf,
                },
            );
        }

        if let Some(partial) = self.in_flight.get(&key) {
            if partial.buf.len() > partial.expected as usize {
                let expected = partial.expected;
                let got = partial.buf.len();
                self.in_flight.remove(&key);
                return Err(ReassemblyError::Overflow {
                    src: key.0,
                    dst: key.1,
                    expected,
                    got,
                });
            }
            if partial.buf.len() == partial.expected as usize {
                if let Some(done) = self.in_flight.remove(&key) {
                    return Ok(Some(Message {
                        src_context: key.0,
                        dst_context: key.1,
                        payload: done.buf,
                    }));
                }
            }
        }
        Ok(None)
    }

    /// Number of messages currently in flight (incomplete).
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }
}
