//! The fetch state machine, tying the window, RTT estimator, congestion
//! controller and retransmission scheduler together.
//!
//! 抓取状态机，将窗口、RTT估算器、拥塞控制器和重传调度器组合在一起。
//!
//! `FetchLogic` performs no I/O and reads no clock: every operation takes the
//! current time as an argument, and the caller turns the segment numbers it
//! returns into Interests.

use crate::{
    config::{Config, SegmentRange},
    congestion::{CongestionControl, Cubic},
    core::{
        counters::{Counters, RttStats, RunningStat},
        reliability::{FetchWindow, RetxScheduler, RttEstimator, SegmentState},
    },
    error::Result,
};
use std::{collections::VecDeque, time::Duration};
use tokio::time::Instant;
use tracing::{debug, error, info, trace, warn};

/// What became of a Data reply.
///
/// Data 回复的处理结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxOutcome {
    /// The segment was newly delivered; its payload should be consumed.
    /// 分段被新交付；应使用其载荷。
    Delivered,
    /// The segment had already been delivered.
    /// 分段此前已被交付。
    Duplicate,
    /// The segment is not tracked by the window.
    /// 分段未被窗口跟踪。
    Unexpected,
}

/// Congestion-controlled retrieval of one segmented object.
///
/// 对一个分段对象进行拥塞控制的获取。
#[derive(Debug)]
pub struct FetchLogic {
    window: FetchWindow,
    rtt: RttEstimator,
    cc: Box<dyn CongestionControl>,
    scheduler: RetxScheduler,
    /// Lost segments waiting to be re-sent, ahead of new admissions.
    retx_queue: VecDeque<u64>,
    final_seg_num: Option<u64>,
    n_in_flight: u64,
    rto_backoff: bool,

    started_at: Option<Instant>,
    finished_at: Option<Instant>,
    n_tx_interests: u64,
    n_tx_retx: u64,
    n_rx_data: u64,
    n_rx_nacks: u64,
    n_rx_unexpected: u64,
    n_timeouts: u64,
    rtt_stat: RunningStat,

    expired_buf: Vec<u64>,
}

impl FetchLogic {
    /// Creates a fetch logic with a CUBIC controller bounded by the window capacity.
    ///
    /// 创建一个使用 CUBIC 控制器的抓取逻辑，其窗口不超过窗口容量。
    pub fn new(config: &Config) -> Result<Self> {
        let capacity = config.task_slot.aligned_window_capacity()?;
        let cc = Cubic::new(config.congestion_control.clone(), capacity as f64);
        Self::with_congestion_control(config, Box::new(cc))
    }

    /// Creates a fetch logic with a custom congestion controller.
    ///
    /// 使用自定义拥塞控制器创建抓取逻辑。
    pub fn with_congestion_control(
        config: &Config,
        cc: Box<dyn CongestionControl>,
    ) -> Result<Self> {
        config.validate()?;
        let capacity = config.task_slot.aligned_window_capacity()?;
        Ok(Self {
            window: FetchWindow::new(capacity),
            rtt: RttEstimator::new(&config.reliability),
            cc,
            scheduler: RetxScheduler::new(),
            retx_queue: VecDeque::new(),
            final_seg_num: None,
            n_in_flight: 0,
            rto_backoff: config.reliability.rto_backoff,
            started_at: None,
            finished_at: None,
            n_tx_interests: 0,
            n_tx_retx: 0,
            n_rx_data: 0,
            n_rx_nacks: 0,
            n_rx_unexpected: 0,
            n_timeouts: 0,
            rtt_stat: RunningStat::default(),
            expired_buf: Vec::new(),
        })
    }

    /// Re-arms for a new fetch of `range`. Buffers are kept.
    ///
    /// 为新的 `range` 抓取重新准备。缓冲区被保留。
    pub fn reset(&mut self, range: &SegmentRange, now: Instant) {
        self.window.reset(range.begin);
        self.rtt.reset();
        self.cc.reset();
        self.scheduler.clear();
        self.retx_queue.clear();
        self.final_seg_num = range.last();
        self.n_in_flight = 0;
        self.started_at = Some(now);
        self.finished_at = None;
        self.n_tx_interests = 0;
        self.n_tx_retx = 0;
        self.n_rx_data = 0;
        self.n_rx_nacks = 0;
        self.n_rx_unexpected = 0;
        self.n_timeouts = 0;
        self.rtt_stat.clear();
        debug!(begin = range.begin, end = ?range.end, "Fetch logic reset");
    }

    /// Gets the fetch window.
    /// 获取抓取窗口。
    pub fn window(&self) -> &FetchWindow {
        &self.window
    }

    /// Gets the RTT estimator.
    /// 获取 RTT 估算器。
    pub fn rtt(&self) -> &RttEstimator {
        &self.rtt
    }

    /// Gets the congestion controller.
    /// 获取拥塞控制器。
    pub fn congestion_control(&self) -> &dyn CongestionControl {
        self.cc.as_ref()
    }

    /// Number of Interests sent and not yet answered, timed out or rejected.
    /// 已发送但尚未得到应答、超时或被拒绝的兴趣包数量。
    pub fn n_in_flight(&self) -> u64 {
        self.n_in_flight
    }

    /// The last segment number of the object, once known.
    /// 对象的最后一个分段号（一旦已知）。
    pub fn final_seg_num(&self) -> Option<u64> {
        self.final_seg_num
    }

    /// True once the final segment number is known and every segment up to it
    /// has been delivered.
    ///
    /// 当最终分段号已知且其之前的所有分段都已交付时为真。
    pub fn finished(&self) -> bool {
        self.final_seg_num
            .is_some_and(|last| self.window.lo_seg_num() > last)
    }

    /// Records a reply that could not be attributed to any segment.
    pub fn note_unexpected(&mut self) {
        self.n_rx_unexpected += 1;
    }

    /// Chooses up to `limit` segments to send now and marks them in flight.
    /// Lost segments are chosen before new segment numbers are admitted.
    /// Returns the number of segment numbers appended to `out`.
    ///
    /// 选择最多 `limit` 个现在要发送的分段并将其标记为在途。
    /// 丢失的分段优先于新分段号被选择。返回追加到 `out` 的分段号数量。
    pub fn tx_burst(&mut self, now: Instant, limit: usize, out: &mut Vec<u64>) -> usize {
        let rto = self.rtt.rto();
        let deadline = now + rto;
        let mut n = 0;
        while n < limit && self.cc.congestion_window() - self.n_in_flight as f64 >= 1.0 {
            let seg_num = if let Some(seg_num) = self.retx_queue.pop_front() {
                // Skip segments delivered late or discarded by a final segment number.
                match self.window.get(seg_num) {
                    Some(entry) if entry.state == SegmentState::Lost => seg_num,
                    _ => continue,
                }
            } else {
                if self
                    .final_seg_num
                    .is_some_and(|last| self.window.hi_seg_num() > last)
                {
                    break;
                }
                match self.window.admit() {
                    Some(seg_num) => seg_num,
                    None => break,
                }
            };

            if let Err(e) = self.window.mark_sent(seg_num, now, deadline) {
                error!(seg_num, error = %e, "Cannot send segment");
                break;
            }
            let retx = self
                .window
                .get(seg_num)
                .is_some_and(|entry| entry.is_retransmitted());
            if retx {
                self.n_tx_retx += 1;
            }
            self.scheduler.schedule(seg_num, deadline);
            self.n_in_flight += 1;
            self.n_tx_interests += 1;
            out.push(seg_num);
            n += 1;
            trace!(seg_num, retx, ?rto, "Sending Interest");
        }
        n
    }

    /// Processes a Data reply for `seg_num`. `final_block` is the final segment
    /// number it declares, if any.
    ///
    /// 处理 `seg_num` 的 Data 回复。`final_block` 是其声明的最终分段号（如有）。
    pub fn on_data(&mut self, now: Instant, seg_num: u64, final_block: Option<u64>) -> RxOutcome {
        self.n_rx_data += 1;

        if seg_num < self.window.lo_seg_num() {
            trace!(seg_num, "Duplicate Data below window");
            return RxOutcome::Duplicate;
        }
        let Some(entry) = self.window.get(seg_num).copied() else {
            self.n_rx_unexpected += 1;
            warn!(seg_num, hi = self.window.hi_seg_num(), "Data for untracked segment");
            return RxOutcome::Unexpected;
        };

        match entry.state {
            SegmentState::InFlight { sent_at, .. } => {
                self.scheduler.cancel(seg_num);
                self.n_in_flight -= 1;
                if !entry.is_retransmitted() {
                    let sample = now.saturating_duration_since(sent_at);
                    self.rtt.add_sample(sample);
                    self.rtt_stat.push(sample.as_secs_f64());
                }
            }
            SegmentState::Lost => {
                trace!(seg_num, "Late Data for lost segment");
            }
            SegmentState::Delivered => {
                trace!(seg_num, "Duplicate Data");
                return RxOutcome::Duplicate;
            }
            SegmentState::Unrequested => {
                self.n_rx_unexpected += 1;
                warn!(seg_num, "Data for unrequested segment");
                return RxOutcome::Unexpected;
            }
        }

        self.window.mark_delivered(seg_num);
        let srtt = self.rtt.srtt().unwrap_or(Duration::ZERO);
        self.cc.on_ack(now, srtt);

        if let Some(declared) = final_block {
            self.accept_final_block(seg_num, declared);
        }
        if self.finished_at.is_none() && self.finished() {
            self.finished_at = Some(now);
            info!(
                lo = self.window.lo_seg_num(),
                n_tx = self.n_tx_interests,
                n_retx = self.n_tx_retx,
                "Fetch finished"
            );
        }
        RxOutcome::Delivered
    }

    /// Applies a FinalBlockId carried by segment `carrier`, if it is plausible.
    fn accept_final_block(&mut self, carrier: u64, declared: u64) -> bool {
        let plausible = declared >= carrier
            && declared.saturating_add(1) >= self.window.lo_seg_num()
            && self.final_seg_num.is_none_or(|known| declared <= known);
        if !plausible {
            self.n_rx_unexpected += 1;
            warn!(carrier, declared, known = ?self.final_seg_num, "Ignoring bad FinalBlockId");
            return false;
        }
        if self.final_seg_num == Some(declared) {
            return true;
        }

        self.final_seg_num = Some(declared);
        let mut n_discarded = 0;
        if let Some(end) = declared.checked_add(1) {
            for entry in self.window.truncate(end) {
                if let SegmentState::InFlight { .. } = entry.state {
                    self.scheduler.cancel(entry.seg_num);
                    self.n_in_flight -= 1;
                }
                n_discarded += 1;
            }
            self.retx_queue.retain(|&seg_num| seg_num < end);
        }
        debug!(final_seg_num = declared, n_discarded, "Final segment number learned");
        true
    }

    /// Processes a Nack for `seg_num`. Returns whether it was treated as a loss.
    ///
    /// 处理 `seg_num` 的 Nack。返回它是否被视为丢包。
    pub fn on_nack(&mut self, now: Instant, seg_num: u64) -> bool {
        self.n_rx_nacks += 1;
        if !self.window.mark_lost(seg_num) {
            self.n_rx_unexpected += 1;
            trace!(seg_num, "Nack for segment not in flight");
            return false;
        }
        self.scheduler.cancel(seg_num);
        self.n_in_flight -= 1;
        self.retx_queue.push_back(seg_num);
        let reduced = self.cc.on_loss(now);
        debug!(seg_num, reduced, cwnd = self.cc.congestion_window(), "Nack received");
        true
    }

    /// Declares every segment whose RTO expired at `now` lost. Returns the
    /// number of timeouts. A batch of timeouts is one loss signal.
    ///
    /// 将所有在 `now` 时 RTO 已过期的分段声明为丢失。返回超时数量。
    /// 一批超时视为一个丢包信号。
    pub fn on_timer(&mut self, now: Instant) -> usize {
        let mut expired = std::mem::take(&mut self.expired_buf);
        expired.clear();
        self.scheduler.pop_expired(now, &mut expired);

        let mut n = 0;
        for &seg_num in &expired {
            if self.window.mark_lost(seg_num) {
                self.n_in_flight -= 1;
                self.retx_queue.push_back(seg_num);
                n += 1;
            }
        }
        self.expired_buf = expired;

        if n > 0 {
            self.n_timeouts += n as u64;
            let reduced = self.cc.on_loss(now);
            if self.rto_backoff {
                self.rtt.backoff();
            }
            debug!(
                n_timeouts = n,
                reduced,
                cwnd = self.cc.congestion_window(),
                rto = ?self.rtt.rto(),
                "Retransmission timeout"
            );
        }
        n
    }

    /// The earliest pending retransmission deadline.
    ///
    /// 最早的待处理重传截止时间。
    pub fn next_deadline(&mut self) -> Option<Instant> {
        self.scheduler.next_deadline()
    }

    /// Takes a snapshot of the statistics.
    ///
    /// 获取统计信息的快照。
    pub fn counters(&self, now: Instant) -> Counters {
        let started_at = self.started_at.unwrap_or(now);
        Counters {
            elapsed: now.saturating_duration_since(started_at),
            finished: self
                .finished_at
                .map(|at| at.saturating_duration_since(started_at)),
            last_rtt: self.rtt.last_rtt(),
            srtt: self.rtt.srtt(),
            rttvar: self.rtt.rttvar(),
            rto: self.rtt.rto(),
            cwnd: self.cc.congestion_window(),
            ssthresh: self.cc.slow_start_threshold(),
            congestion_state: self.cc.state(),
            n_in_flight: self.n_in_flight,
            n_tx_interests: self.n_tx_interests,
            n_tx_retx: self.n_tx_retx,
            n_rx_data: self.n_rx_data,
            n_rx_nacks: self.n_rx_nacks,
            n_rx_unexpected: self.n_rx_unexpected,
            n_timeouts: self.n_timeouts,
            n_write_errors: 0,
            rtt: RttStats::from(&self.rtt_stat),
            lo_seg_num: self.window.lo_seg_num(),
            hi_seg_num: self.window.hi_seg_num(),
        }
    }
}
