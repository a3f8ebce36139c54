//! The fetch window: per-segment state for the segment numbers between the
//! lowest undelivered segment and the highest admitted one.
//!
//! 抓取窗口：最低未交付分段与最高已准入分段之间各分段的状态。
//!
//! Storage is a ring of `capacity` slots indexed by `seg_num & (capacity - 1)`,
//! allocated once and reused across resets. A slot is meaningful only while
//! its segment number lies in `[lo_seg_num, hi_seg_num)`.

use crate::{
    config::{MAX_WINDOW_CAPACITY, MIN_WINDOW_CAPACITY, align_capacity},
    error::{Error, Result},
};
use tokio::time::Instant;
use tracing::trace;

/// The state of one segment.
///
/// 单个分段的状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SegmentState {
    /// Admitted, never sent.
    /// 已准入，从未发送。
    #[default]
    Unrequested,
    /// An Interest is outstanding.
    /// 有一个未完成的兴趣包。
    InFlight {
        sent_at: Instant,
        rto_deadline: Instant,
    },
    /// Payload received.
    /// 已收到载荷。
    Delivered,
    /// Timed out or rejected, waiting to be re-sent.
    /// 已超时或被拒绝，等待重发。
    Lost,
}

/// A slot of the fetch window.
///
/// 抓取窗口中的一个槽。
#[derive(Debug, Clone, Copy, Default)]
pub struct SegmentEntry {
    pub seg_num: u64,
    pub state: SegmentState,
    /// How many Interests have been sent for this segment.
    /// 为此分段发送的兴趣包数量。
    pub n_tx: u32,
}

impl SegmentEntry {
    /// Whether an RTT measured on this segment would be ambiguous.
    pub fn is_retransmitted(&self) -> bool {
        self.n_tx > 1
    }
}

/// A bounded ordered collection of segment states.
///
/// 一个有界有序的分段状态集合。
#[derive(Debug)]
pub struct FetchWindow {
    slots: Box<[SegmentEntry]>,
    mask: u64,
    lo_seg_num: u64,
    hi_seg_num: u64,
}

impl FetchWindow {
    /// Allocates a window. The capacity is rounded up to a power of two and
    /// clamped to `[16, 65536]`.
    ///
    /// 分配一个窗口。容量向上取整为2的幂，并限制在 `[16, 65536]`。
    pub fn new(capacity: usize) -> Self {
        let capacity = align_capacity(capacity, MIN_WINDOW_CAPACITY, MAX_WINDOW_CAPACITY);
        Self {
            slots: vec![SegmentEntry::default(); capacity].into_boxed_slice(),
            mask: capacity as u64 - 1,
            lo_seg_num: 0,
            hi_seg_num: 0,
        }
    }

    /// Clears all state and restarts at `begin`, without reallocating.
    ///
    /// 清除所有状态并从 `begin` 重新开始，不重新分配内存。
    pub fn reset(&mut self, begin: u64) {
        self.slots.fill(SegmentEntry::default());
        self.lo_seg_num = begin;
        self.hi_seg_num = begin;
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Lowest segment number not yet delivered.
    ///
    /// 尚未交付的最低分段号。
    pub fn lo_seg_num(&self) -> u64 {
        self.lo_seg_num
    }

    /// One past the highest admitted segment number.
    ///
    /// Only grows, except when [`truncate`](Self::truncate) discards segment
    /// numbers beyond a newly learned final segment.
    ///
    /// 最高已准入分段号加一。
    ///
    /// 只增不减，除非 [`truncate`](Self::truncate) 丢弃了新获知的最终分段之后的分段号。
    pub fn hi_seg_num(&self) -> u64 {
        self.hi_seg_num
    }

    /// Number of segment numbers currently spanned by the window.
    pub fn len(&self) -> usize {
        (self.hi_seg_num - self.lo_seg_num) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.hi_seg_num == self.lo_seg_num
    }

    /// Whether no further segment number can be admitted until `lo` advances.
    ///
    /// 在 `lo` 前进之前是否无法再准入新的分段号。
    pub fn is_full(&self) -> bool {
        self.len() >= self.capacity()
    }

    pub fn contains(&self, seg_num: u64) -> bool {
        (self.lo_seg_num..self.hi_seg_num).contains(&seg_num)
    }

    fn slot(&self, seg_num: u64) -> &SegmentEntry {
        &self.slots[(seg_num & self.mask) as usize]
    }

    fn slot_mut(&mut self, seg_num: u64) -> &mut SegmentEntry {
        &mut self.slots[(seg_num & self.mask) as usize]
    }

    /// Looks up a segment admitted into the window.
    pub fn get(&self, seg_num: u64) -> Option<&SegmentEntry> {
        self.contains(seg_num).then(|| self.slot(seg_num))
    }

    /// Admits the next segment number as `Unrequested`. Returns `None` when the
    /// window is full.
    ///
    /// 将下一个分段号以 `Unrequested` 状态准入。窗口已满时返回 `None`。
    pub fn admit(&mut self) -> Option<u64> {
        if self.is_full() {
            return None;
        }
        let seg_num = self.hi_seg_num;
        *self.slot_mut(seg_num) = SegmentEntry {
            seg_num,
            state: SegmentState::Unrequested,
            n_tx: 0,
        };
        self.hi_seg_num += 1;
        Some(seg_num)
    }

    /// Transitions an `Unrequested` or `Lost` segment to `InFlight`.
    ///
    /// 将 `Unrequested` 或 `Lost` 状态的分段转换为 `InFlight`。
    pub fn mark_sent(&mut self, seg_num: u64, sent_at: Instant, rto_deadline: Instant) -> Result<()> {
        if !self.contains(seg_num) {
            return Err(Error::OutOfWindow(seg_num));
        }
        let entry = self.slot_mut(seg_num);
        match entry.state {
            SegmentState::Unrequested | SegmentState::Lost => {
                entry.state = SegmentState::InFlight {
                    sent_at,
                    rto_deadline,
                };
                entry.n_tx += 1;
                Ok(())
            }
            SegmentState::InFlight { .. } | SegmentState::Delivered => {
                Err(Error::NotSendable(seg_num))
            }
        }
    }

    /// Marks a segment `Delivered` and advances `lo_seg_num` past the delivered
    /// prefix. Returns the entry as it was before delivery, or `None` if the
    /// segment is not tracked or already delivered.
    ///
    /// 将分段标记为 `Delivered` 并使 `lo_seg_num` 越过已交付的前缀。
    /// 返回交付前的条目；若该分段未被跟踪或已交付则返回 `None`。
    pub fn mark_delivered(&mut self, seg_num: u64) -> Option<SegmentEntry> {
        if !self.contains(seg_num) {
            return None;
        }
        let entry = self.slot_mut(seg_num);
        if entry.state == SegmentState::Delivered {
            return None;
        }
        let before = *entry;
        entry.state = SegmentState::Delivered;

        while self.lo_seg_num < self.hi_seg_num
            && self.slot(self.lo_seg_num).state == SegmentState::Delivered
        {
            self.lo_seg_num += 1;
        }
        trace!(seg_num, lo = self.lo_seg_num, hi = self.hi_seg_num, "Segment delivered");
        Some(before)
    }

    /// Transitions an `InFlight` segment to `Lost`. Returns whether it did.
    ///
    /// 将 `InFlight` 分段转换为 `Lost`。返回是否发生了转换。
    pub fn mark_lost(&mut self, seg_num: u64) -> bool {
        if !self.contains(seg_num) {
            return false;
        }
        let entry = self.slot_mut(seg_num);
        if let SegmentState::InFlight { .. } = entry.state {
            entry.state = SegmentState::Lost;
            true
        } else {
            false
        }
    }

    /// Forgets every admitted segment number at or above `end`, returning the
    /// discarded entries. `lo_seg_num` is never moved backwards.
    ///
    /// 丢弃所有不小于 `end` 的已准入分段号，并返回被丢弃的条目。
    /// `lo_seg_num` 永远不会后退。
    pub fn truncate(&mut self, end: u64) -> Vec<SegmentEntry> {
        let end = end.max(self.lo_seg_num);
        if end >= self.hi_seg_num {
            return Vec::new();
        }
        let discarded = (end..self.hi_seg_num).map(|s| *self.slot(s)).collect();
        self.hi_seg_num = end;
        discarded
    }
}
