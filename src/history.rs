//! Finalized note segments and the bounded, newest-first history they live in.

use crate::types::{Millis, Pitch};
use serde::{Deserialize, Serialize};

/// One detected note (or rest), as reported by the segmenter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub pitch: Pitch,
    /// How long the note sounded (ms).
    pub duration: Millis,
    /// Gap between the end of the previous segment and the start of this one (ms).
    pub onset: Millis,
}

/// A segment as delivered by the segmenter, with the absolute time it ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentEvent {
    pub segment: Segment,
    /// End of `segment` in session-clock ms; becomes the roll's `last_offset`.
    pub offset: Millis,
}

/// Read-only, newest-first view of recent segments.
///
/// Index 0 is the most recently finalized segment. Returns `None` once the
/// history is exhausted; every higher index is then `None` as well.
pub trait SegmentHistory {
    fn segment(&self, index: usize) -> Option<Segment>;

    /// Lazy newest-first walk that stops at the first missing segment.
    fn iter(&self) -> HistoryIter<'_, Self>
    where
        Self: Sized,
    {
        HistoryIter {
            history: self,
            index: 0,
        }
    }
}

pub struct HistoryIter<'a, H: SegmentHistory> {
    history: &'a H,
    index: usize,
}

impl<H: SegmentHistory> Iterator for HistoryIter<'_, H> {
    type Item = Segment;

    fn next(&mut self) -> Option<Segment> {
        let seg = self.history.segment(self.index)?;
        self.index += 1;
        Some(seg)
    }
}

impl SegmentHistory for [Segment] {
    fn segment(&self, index: usize) -> Option<Segment> {
        self.get(index).copied()
    }
}

/// Fixed-capacity ring buffer of segments. Pushing onto a full buffer drops
/// the oldest entry.
pub struct SegmentBuf<const N: usize> {
    slots: [Segment; N],
    /// Slot the next push writes to.
    head: usize,
    len: usize,
}

const EMPTY: Segment = Segment {
    pitch: 0,
    duration: 0,
    onset: 0,
};

impl<const N: usize> SegmentBuf<N> {
    pub fn new() -> Self {
        Self {
            slots: [EMPTY; N],
            head: 0,
            len: 0,
        }
    }

    pub fn push(&mut self, seg: Segment) {
        if N == 0 {
            return;
        }
        self.slots[self.head] = seg;
        self.head = (self.head + 1) % N;
        self.len = (self.len + 1).min(N);
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        N
    }

    pub fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
    }
}

impl<const N: usize> Default for SegmentBuf<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> SegmentHistory for SegmentBuf<N> {
    fn segment(&self, index: usize) -> Option<Segment> {
        if index >= self.len {
            return None;
        }
        Some(self.slots[(self.head + N - 1 - index) % N])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(pitch: Pitch) -> Segment {
        Segment {
            pitch,
            duration: 100,
            onset: 0,
        }
    }

    #[test]
    fn test_empty_history() {
        let buf: SegmentBuf<4> = SegmentBuf::new();
        assert!(buf.is_empty());
        assert_eq!(buf.segment(0), None);
        assert_eq!(buf.iter().count(), 0);
    }

    #[test]
    fn test_newest_first() {
        let mut buf: SegmentBuf<4> = SegmentBuf::new();
        buf.push(seg(40));
        buf.push(seg(41));
        buf.push(seg(42));
        let pitches: Vec<Pitch> = buf.iter().map(|s| s.pitch).collect();
        assert_eq!(pitches, vec![42, 41, 40]);
        assert_eq!(buf.segment(3), None);
    }

    #[test]
    fn test_overwrites_oldest_when_full() {
        let mut buf: SegmentBuf<3> = SegmentBuf::new();
        for p in 40..46 {
            buf.push(seg(p));
        }
        assert_eq!(buf.len(), 3);
        let pitches: Vec<Pitch> = buf.iter().map(|s| s.pitch).collect();
        assert_eq!(pitches, vec![45, 44, 43]);
    }

    #[test]
    fn test_iter_is_restartable() {
        let mut buf: SegmentBuf<8> = SegmentBuf::new();
        buf.push(seg(50));
        buf.push(seg(51));
        assert_eq!(buf.iter().count(), 2);
        assert_eq!(buf.iter().next().map(|s| s.pitch), Some(51));
    }

    #[test]
    fn test_clear() {
        let mut buf: SegmentBuf<2> = SegmentBuf::new();
        buf.push(seg(60));
        buf.clear();
        assert_eq!(buf.segment(0), None);
        buf.push(seg(61));
        assert_eq!(buf.segment(0).map(|s| s.pitch), Some(61));
    }

    #[test]
    fn test_slice_history() {
        let segs = [seg(70), seg(69)];
        let history: &[Segment] = &segs;
        assert_eq!(history.segment(0).map(|s| s.pitch), Some(70));
        assert_eq!(history.segment(1).map(|s| s.pitch), Some(69));
        assert_eq!(history.segment(2), None);
    }
}
