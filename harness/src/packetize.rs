//! Message packetizer
//!
//! Splits an application payload into the ordered frame sequence the NIC
//! expects: `ceil(L / S)` frames (minimum one, so a zero-length message still
//! makes progress), each declaring the total message length and its own
//! zero-based offset.

use anyhow::{ensure, Result};

use nicbench_shared::types::frame::{Context, WireFrame};

/// Split `payload` into DATA frames of at most `max_seg_bytes` payload each.
///
/// Every frame but the last carries exactly `max_seg_bytes`; the last carries
/// the remainder. A zero-length payload produces exactly one empty frame.
pub fn packetize(
    src_context: Context,
    dst_context: Context,
    payload: &[u8],
    max_seg_bytes: usize,
) -> Result<Vec<WireFrame>> {
    ensure!(max_seg_bytes > 0, "segment size must be greater than 0");
    let msg_len = u32::try_from(payload.len())?;

    let count = ((payload.len() + max_seg_bytes - 1) / max_seg_bytes).max(1);
    let mut frames = Vec::with_capacity(count);
    for i in 0..count {
        let start = i * max_seg_bytes;
        let end = usize::min(start + max_seg_bytes, payload.len());
        frames.push(WireFrame::data(
            src_context,
            dst_context,
            msg_len,
            i as u32,
            payload[start..end].to_vec(),
        ));
    }
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eighty_bytes_at_seg_sixty_four() {
        let payload = vec![0u8; 80];
        let frames = packetize(0x1234, 0, &payload, 64).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].payload.len(), 64);
        assert_eq!(frames[1].payload.len(), 16);
        for (i, frame) in frames.iter().enumerate() {
            assert_eq!(frame.msg_len, 80);
            assert_eq!(frame.pkt_offset, i as u32);
            assert!(frame.is_data());
        }
    }

    #[test]
    fn test_empty_payload_still_emits_one_frame() {
        let frames = packetize(1, 2, &[], 64).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].msg_len, 0);
        assert_eq!(frames[0].pkt_offset, 0);
        assert!(frames[0].payload.is_empty());
    }

    #[test]
    fn test_exact_multiple_fills_last_frame() {
        let payload = vec![7u8; 128];
        let frames = packetize(1, 2, &payload, 64).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].payload.len(), 64);
    }

    #[test]
    fn test_zero_segment_size_rejected() {
        assert!(packetize(1, 2, &[0u8; 10], 0).is_err());
    }

    #[test]
    fn test_frame_count_law() {
        for len in [0usize, 1, 63, 64, 65, 128, 1000] {
            for seg in [1usize, 7, 64, 512] {
                let payload = vec![0u8; len];
                let frames = packetize(0, 0, &payload, seg).unwrap();
                let expected = usize::max(1, (len + seg - 1) / seg);
                assert_eq!(frames.len(), expected, "len={} seg={}", len, seg);
                let total: usize = frames.iter().map(|f| f.payload.len()).sum();
                assert_eq!(total, len);
                for f in &frames[..frames.len() - 1] {
                    assert_eq!(f.payload.len(), seg);
                }
            }
        }
    }
}
