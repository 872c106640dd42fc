//! Ring-buffered position history.
//!
//! Every per-slot channel (position, tangent, normal) holds
//! `history_length * instance_count` elements. Slot `k` of a tick lives at
//! element offset `instance_count * ((frame + k) % history_length)`; only the
//! offsets wrap, the frame counter itself never does.

use swarm_core::constants::HISTORY_ELEMENT_BYTES;
use swarm_core::math::{effective_instance_count, history_length};

use crate::uniforms::HistoryUniforms;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryRing {
    instance_count: u32,
    history_length: u32,
    frame: u64,
}

impl HistoryRing {
    /// `instance_count` is floored to a whole number of workgroups and
    /// `segments` is clamped before deriving the ring length.
    pub fn new(instance_count: u32, segments: u32) -> Self {
        Self {
            instance_count: effective_instance_count(instance_count),
            history_length: history_length(segments),
            frame: 0,
        }
    }

    pub fn instance_count(&self) -> u32 {
        self.instance_count
    }

    pub fn history_length(&self) -> u32 {
        self.history_length
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Element offset of slot `frame + k`.
    pub fn offset(&self, k: u32) -> u32 {
        let slot = (self.frame + k as u64) % self.history_length as u64;
        self.instance_count * slot as u32
    }

    /// Offsets 0, 1 and 2: two frames back, previous head, newest slot.
    pub fn offsets(&self) -> [u32; 3] {
        [self.offset(0), self.offset(1), self.offset(2)]
    }

    /// First slot the draw walks, oldest to newest.
    ///
    /// Taken after [`advance`](Self::advance): the tick that ran at frame `f`
    /// wrote slot `f + 2`, so the oldest surviving slot is `f + 3`, which is
    /// `frame + 2` once the counter has moved on.
    pub fn index_offset(&self) -> u32 {
        ((self.frame + 2) % self.history_length as u64) as u32
    }

    pub fn advance(&mut self) {
        self.frame += 1;
    }

    /// Elements per historied channel.
    pub fn element_count(&self) -> u64 {
        self.instance_count as u64 * self.history_length as u64
    }

    /// Bytes per historied channel.
    pub fn channel_bytes(&self) -> u64 {
        self.element_count() * HISTORY_ELEMENT_BYTES
    }

    /// Dispatch-time ring geometry. `index_offset` is the slot the draw will
    /// start from once this tick has advanced the ring, so kernels that
    /// rebuild the whole history lay it out in draw order.
    pub fn uniforms(&self) -> HistoryUniforms {
        let [offset0, offset1, offset2] = self.offsets();
        HistoryUniforms {
            instance_count: self.instance_count,
            history_length: self.history_length,
            offset0,
            offset1,
            offset2,
            index_offset: ((self.frame + 3) % self.history_length as u64) as u32,
            _pad: [0; 2],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring_at(instance_count: u32, segments: u32, frame: u64) -> HistoryRing {
        let mut ring = HistoryRing::new(instance_count, segments);
        for _ in 0..frame {
            ring.advance();
        }
        ring
    }

    #[test]
    fn test_offset_law() {
        // H = 5, IC = 64, frame = 7: 64 * ((7 + k) % 5)
        let ring = ring_at(64, 4, 7);
        assert_eq!(ring.history_length(), 5);
        let expected: Vec<u32> = (0..3u64).map(|k| 64 * ((7 + k) % 5) as u32).collect();
        assert_eq!(ring.offsets().to_vec(), expected);
        assert_eq!(ring.offsets(), [128, 192, 256]);
    }

    #[test]
    fn test_instance_count_floored() {
        let ring = HistoryRing::new(1001, 16);
        assert_eq!(ring.instance_count(), 960);
        assert_eq!(ring.element_count(), 960 * 17);
        assert_eq!(ring.channel_bytes(), 960 * 17 * 16);
    }

    #[test]
    fn test_offsets_stay_in_bounds() {
        let mut ring = HistoryRing::new(128, 4);
        for _ in 0..50 {
            for offset in ring.offsets() {
                assert!(offset as u64 + 128 <= ring.element_count());
                assert_eq!(offset % 128, 0);
            }
            ring.advance();
        }
    }

    #[test]
    fn test_frame_counter_does_not_wrap() {
        let mut ring = HistoryRing::new(64, 4);
        ring.frame = u32::MAX as u64;
        ring.advance();
        assert_eq!(ring.frame(), u32::MAX as u64 + 1);
        // (2^32 + k) % 5 with 2^32 % 5 == 1
        assert_eq!(ring.offsets(), [64, 128, 192]);
    }

    #[test]
    fn test_index_offset_follows_newest_write() {
        let mut ring = HistoryRing::new(64, 4);
        for _ in 0..12 {
            let newest = ring.offset(2) / 64;
            ring.advance();
            let h = ring.history_length();
            // The draw ends on the slot just written
            assert_eq!((ring.index_offset() + h - 1) % h, newest);
        }
    }

    #[test]
    fn test_uniforms_mirror_ring() {
        let ring = ring_at(64, 4, 7);
        let u = ring.uniforms();
        assert_eq!(u.instance_count, 64);
        assert_eq!(u.history_length, 5);
        assert_eq!([u.offset0, u.offset1, u.offset2], ring.offsets());
        assert_eq!([u.offset0, u.offset1, u.offset2], [128, 192, 256]);
        assert_eq!(u.index_offset, 0);
    }

    #[test]
    fn test_dispatch_and_draw_agree_on_first_slot() {
        let mut ring = ring_at(64, 8, 3);
        let dispatched = ring.uniforms().index_offset;
        ring.advance();
        assert_eq!(ring.index_offset(), dispatched);
    }
}
