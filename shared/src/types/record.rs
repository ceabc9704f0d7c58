//! Reassembled messages and the records extracted from them

use serde::{Deserialize, Serialize};

use crate::types::frame::Context;

/// A complete application-level message: the ordered concatenation of the
/// payload bytes of every frame sharing one `(src_context, dst_context,
/// msg_len)` identity. Messages are transient: they exist only until their
/// metrics are extracted into a [`CapturedRecord`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub src_context: Context,
    pub dst_context: Context,
    pub payload: Vec<u8>,
}

impl Message {
    /// Latency stamp: the trailing 8 payload bytes, big-endian.
    pub fn latency_cycles(&self) -> Option<u64> {
        let n = self.payload.len();
        if n < 8 {
            return None;
        }
        let mut buf = [0u8; 8];
        buf.copy_from_slice(&self.payload[n - 8..]);
        Some(u64::from_be_bytes(buf))
    }

    /// Timestamp stamp: the 4 bytes preceding the latency, big-endian.
    pub fn timestamp(&self) -> Option<u32> {
        let n = self.payload.len();
        if n < 12 {
            return None;
        }
        let mut buf = [0u8; 4];
        buf.copy_from_slice(&self.payload[n - 12..n - 8]);
        Some(u32::from_be_bytes(buf))
    }
}

/// One correlated arrival: which context responded, when, and how long the
/// round trip took in NIC cycles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedRecord {
    pub context: u64,
    pub timestamp: u64,
    pub latency_cycles: u64,
}

impl CapturedRecord {
    /// Default extraction used by the built-in scenarios: the responding
    /// context is the message's `src_context`, latency is the trailing
    /// 8 payload bytes and the timestamp (when the payload is long enough
    /// to carry one) the 4 bytes before them. Messages too short to carry a
    /// latency stamp yield `None`.
    pub fn from_message(msg: &Message) -> Option<Self> {
        let latency_cycles = msg.latency_cycles()?;
        Some(Self {
            context: u64::from(msg.src_context),
            timestamp: u64::from(msg.timestamp().unwrap_or(0)),
            latency_cycles,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg_with_payload(payload: Vec<u8>) -> Message {
        Message {
            src_context: 1,
            dst_context: 0x1234,
            payload,
        }
    }

    #[test]
    fn test_latency_and_timestamp_extraction() {
        let mut payload = vec![0u8; 4];
        payload.extend_from_slice(&0xAABBCCDDu32.to_be_bytes());
        payload.extend_from_slice(&777u64.to_be_bytes());
        let msg = msg_with_payload(payload);

        let rec = CapturedRecord::from_message(&msg).unwrap();
        assert_eq!(rec.context, 1);
        assert_eq!(rec.timestamp, 0xAABBCCDD);
        assert_eq!(rec.latency_cycles, 777);
    }

    #[test]
    fn test_latency_only_payload() {
        // 8-byte payload: latency present, no room for a timestamp
        let msg = msg_with_payload(42u64.to_be_bytes().to_vec());
        let rec = CapturedRecord::from_message(&msg).unwrap();
        assert_eq!(rec.latency_cycles, 42);
        assert_eq!(rec.timestamp, 0);
    }

    #[test]
    fn test_short_payload_yields_no_record() {
        let msg = msg_with_payload(vec![0u8; 7]);
        assert!(msg.latency_cycles().is_none());
        assert!(CapturedRecord::from_message(&msg).is_none());
    }

    #[test]
    fn test_record_serialization() {
        let rec = CapturedRecord {
            context: 1,
            timestamp: 5000,
            latency_cycles: 1234,
        };
        let json = serde_json::to_string(&rec).unwrap();
        let back: CapturedRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(rec, back);
    }
}
