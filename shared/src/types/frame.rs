//! Wire frame definitions
//!
//! A frame is the minimum transmission unit on the link: a fixed header
//! carrying sequencing metadata plus a payload slice of its parent message.

use serde::{Deserialize, Serialize};

/// Logical endpoint / priority class identifier.
///
/// Contexts are opaque: the harness treats any value as valid. By convention
/// in the test topologies, 0 is the default (high priority) endpoint and 1 is
/// the low priority endpoint.
pub type Context = u16;

/// Frame carries message payload bytes.
pub const FLAG_DATA: u8 = 0b0000_0001;

/// One fixed-header-plus-payload unit transferred over the link.
///
/// `pkt_offset` is the zero-based index of this frame within its parent
/// message. `msg_len` is the total byte count of the reassembled message and
/// is identical across all frames of one message; it is not the per-frame
/// payload length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireFrame {
    pub flags: u8,
    pub src_context: Context,
    pub dst_context: Context,
    pub msg_len: u32,
    pub pkt_offset: u32,
    pub payload: Vec<u8>,
}

impl WireFrame {
    /// Build a DATA frame.
    pub fn data(
        src_context: Context,
        dst_context: Context,
        msg_len: u32,
        pkt_offset: u32,
        payload: Vec<u8>,
    ) -> Self {
        Self {
            flags: FLAG_DATA,
            src_context,
            dst_context,
            msg_len,
            pkt_offset,
            payload,
        }
    }

    /// Whether this frame carries message payload (as opposed to control
    /// traffic the NIC may emit alongside it).
    pub fn is_data(&self) -> bool {
        self.flags & FLAG_DATA != 0
    }
}
