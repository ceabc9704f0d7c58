//! Frame codec for the fixed-layout NIC header.
//!
//! Every frame on the link starts with a 13-byte network-order header:
//!
//! ```text
//! offset  size  field
//!      0     1  flags
//!      1     2  src_context
//!      3     2  dst_context
//!      5     4  msg_len      (total reassembled message length, bytes)
//!      9     4  pkt_offset   (zero-based frame index within the message)
//!     13     -  payload
//! ```
//!
//! `encode` and `decode` are exact inverses: `decode(&encode(f)) == f` for
//! every valid frame.

use thiserror::Error;

use crate::types::frame::WireFrame;

/// Size of the fixed frame header in bytes.
pub const HEADER_LEN: usize = 13;

/// Frame decoding failure. Malformed frames are dropped by the capture task;
/// they never abort a capture session.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("truncated frame: {len} bytes, header needs {need}")]
    Truncated { len: usize, need: usize },
}

/// Encode a frame into its on-link byte representation.
pub fn encode(frame: &WireFrame) -> Vec<u8> {
    let mut buf = Vec::with_capacity(HEADER_LEN + frame.payload.len());
    buf.push(frame.flags);
    buf.extend_from_slice(&frame.src_context.to_be_bytes());
    buf.extend_from_slice(&frame.dst_context.to_be_bytes());
    buf.extend_from_slice(&frame.msg_len.to_be_bytes());
    buf.extend_from_slice(&frame.pkt_offset.to_be_bytes());
    buf.extend_from_slice(&frame.payload);
    buf
}

/// Decode a raw link frame. Everything after the header is payload.
pub fn decode(raw: &[u8]) -> Result<WireFrame, DecodeError> {
    if raw.len() < HEADER_LEN {
        return Err(DecodeError::Truncated {
            len: raw.len(),
            need: HEADER_LEN,
        });
    }
    let flags = raw[0];
    let src_context = u16::from_be_bytes([raw[1], raw[2]]);
    let dst_context = u16::from_be_bytes([raw[3], raw[4]]);
    let msg_len = u32::from_be_bytes([raw[5], raw[6], raw[7], raw[8]]);
    let pkt_offset = u32::from_be_bytes([raw[9], raw[10], raw[11], raw[12]]);
    Ok(WireFrame {
        flags,
        src_context,
        dst_context,
        msg_len,
        pkt_offset,
        payload: raw[HEADER_LEN..].to_vec(),
    })
}
