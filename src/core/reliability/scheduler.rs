//! Retransmission timeout scheduling.
//! 重传超时调度。
//!
//! Deadlines live in a min-heap keyed by `(deadline, seg_num)`. Cancelling or
//! rescheduling does not touch the heap; instead the authoritative deadline of
//! every live segment is kept in a side table and stale heap entries are
//! skipped when they surface.

use std::{
    cmp::Reverse,
    collections::{BinaryHeap, HashMap},
};
use tokio::time::Instant;

/// Stale heap entries tolerated on top of live ones before the heap is rebuilt.
const COMPACT_SLACK: usize = 64;

/// A priority queue of per-segment retransmission deadlines.
///
/// 一个按分段重传截止时间排序的优先队列。
#[derive(Debug, Default)]
pub struct RetxScheduler {
    heap: BinaryHeap<Reverse<(Instant, u64)>>,
    deadlines: HashMap<u64, Instant>,
}

impl RetxScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of segments with a pending deadline.
    pub fn len(&self) -> usize {
        self.deadlines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deadlines.is_empty()
    }

    /// Sets or replaces the deadline of a segment.
    ///
    /// 设置或替换一个分段的截止时间。
    pub fn schedule(&mut self, seg_num: u64, deadline: Instant) {
        self.deadlines.insert(seg_num, deadline);
        self.heap.push(Reverse((deadline, seg_num)));
        self.maybe_compact();
    }

    /// Removes the deadline of a segment. Returns whether one was pending.
    ///
    /// 移除一个分段的截止时间。返回是否存在待处理的截止时间。
    pub fn cancel(&mut self, seg_num: u64) -> bool {
        let removed = self.deadlines.remove(&seg_num).is_some();
        if removed {
            self.maybe_compact();
        }
        removed
    }

    /// Whether a heap entry still reflects the live deadline of its segment.
    fn is_live(&self, deadline: Instant, seg_num: u64) -> bool {
        self.deadlines.get(&seg_num) == Some(&deadline)
    }

    /// Moves every segment whose deadline is at or before `now` into `out`,
    /// ordered by deadline and then by segment number.
    ///
    /// 将所有截止时间不晚于 `now` 的分段移入 `out`，按截止时间和分段号排序。
    pub fn pop_expired(&mut self, now: Instant, out: &mut Vec<u64>) {
        while let Some(&Reverse((deadline, seg_num))) = self.heap.peek() {
            if !self.is_live(deadline, seg_num) {
                self.heap.pop();
                continue;
            }
            if deadline > now {
                break;
            }
            self.heap.pop();
            self.deadlines.remove(&seg_num);
            out.push(seg_num);
        }
    }

    /// The earliest pending deadline. Discards stale entries on the way.
    ///
    /// 最早的待处理截止时间。顺便丢弃过期的条目。
    pub fn next_deadline(&mut self) -> Option<Instant> {
        while let Some(&Reverse((deadline, seg_num))) = self.heap.peek() {
            if self.is_live(deadline, seg_num) {
                return Some(deadline);
            }
            self.heap.pop();
        }
        None
    }

    pub fn clear(&mut self) {
        self.heap.clear();
        self.deadlines.clear();
    }

    fn maybe_compact(&mut self) {
        if self.heap.len() > 2 * self.deadlines.len() + COMPACT_SLACK {
            let deadlines = &self.deadlines;
            self.heap
                .retain(|Reverse((deadline, seg_num))| deadlines.get(seg_num) == Some(deadline));
        }
    }
}
