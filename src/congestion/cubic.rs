//! A TCP-CUBIC congestion controller counting in segments (RFC 8312).
//!
//! 一个以分段计数的 TCP-CUBIC 拥塞控制器（RFC 8312）。
//!
//! Window growth in congestion avoidance follows
//! `W_cubic(t) = C * (t - K)^3 + W_max`, where `t` is the time since the last
//! loss epoch began and `K = cbrt(W_max * (1 - beta) / C)`. The curve is concave
//! below `W_max` and convex above it.

use crate::{
    config::{CongestionControlConfig, LossPolicy},
    congestion::{CongestionControl, CongestionState},
};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, trace};

/// The window never drops below one segment.
const MIN_CWND: f64 = 1.0;

/// Growth per ACK when the window is above the cubic target.
const PROBE_INCREMENT: f64 = 0.01;

/// A CUBIC congestion controller.
///
/// 一个 CUBIC 拥塞控制器。
#[derive(Debug)]
pub struct Cubic {
    pub(super) cwnd: f64,
    pub(super) ssthresh: f64,
    pub(super) state: CongestionState,
    /// Window size at the last loss.
    pub(super) w_max: f64,
    /// Time for the cubic curve to climb back to `w_max`, in seconds.
    k: f64,
    epoch_start: Option<Instant>,
    /// ACKs still needed before fast recovery ends.
    pub(super) recovery_remaining: u32,
    max_cwnd: f64,
    config: CongestionControlConfig,
}

impl Cubic {
    /// Creates a controller whose window never exceeds `max_cwnd` segments.
    ///
    /// 创建一个窗口永不超过 `max_cwnd` 个分段的控制器。
    pub fn new(config: CongestionControlConfig, max_cwnd: f64) -> Self {
        let max_cwnd = max_cwnd.max(MIN_CWND);
        let mut cubic = Self {
            cwnd: 0.0,
            ssthresh: 0.0,
            state: CongestionState::SlowStart,
            w_max: 0.0,
            k: 0.0,
            epoch_start: None,
            recovery_remaining: 0,
            max_cwnd,
            config,
        };
        cubic.reset();
        cubic
    }

    fn clamp(&mut self) {
        self.cwnd = self.cwnd.clamp(MIN_CWND, self.max_cwnd);
    }

    fn cubic_window(&self, t: f64) -> f64 {
        let dt = t - self.k;
        self.config.cubic_c * dt * dt * dt + self.w_max
    }

    fn congestion_avoidance(&mut self, now: Instant, srtt: Duration) {
        let epoch_start = match self.epoch_start {
            Some(start) => start,
            None => {
                // Entering congestion avoidance without a prior loss.
                if self.cwnd < self.w_max {
                    self.k = ((self.w_max - self.cwnd) / self.config.cubic_c).cbrt();
                } else {
                    self.w_max = self.cwnd;
                    self.k = 0.0;
                }
                self.epoch_start = Some(now);
                now
            }
        };

        let t = now.saturating_duration_since(epoch_start).as_secs_f64();
        let rtt = srtt.as_secs_f64();
        let target = self.cubic_window(t + rtt);

        if self.config.tcp_friendly && rtt > 0.0 {
            let beta = self.config.cubic_beta;
            let w_est = self.w_max * beta + 3.0 * (1.0 - beta) / (1.0 + beta) * (t / rtt);
            if w_est > target && w_est > self.cwnd {
                self.cwnd = w_est;
                trace!(cwnd = self.cwnd, "CUBIC: TCP-friendly region");
                return;
            }
        }

        if target > self.cwnd {
            self.cwnd += (target - self.cwnd) / self.cwnd;
        } else {
            self.cwnd += PROBE_INCREMENT / self.cwnd;
        }
        trace!(cwnd = self.cwnd, target, t, "CUBIC: congestion avoidance");
    }
}

impl CongestionControl for Cubic {
    fn on_ack(&mut self, now: Instant, srtt: Duration) {
        match self.state {
            CongestionState::FastRecovery => {
                self.recovery_remaining = self.recovery_remaining.saturating_sub(1);
                if self.recovery_remaining == 0 {
                    self.state = if self.cwnd < self.ssthresh {
                        CongestionState::SlowStart
                    } else {
                        CongestionState::CongestionAvoidance
                    };
                    debug!(cwnd = self.cwnd, state = ?self.state, "Leaving fast recovery");
                }
                return;
            }
            CongestionState::SlowStart | CongestionState::CongestionAvoidance => {}
        }

        if self.cwnd < self.ssthresh {
            self.cwnd += 1.0;
            trace!(cwnd = self.cwnd, "Slow Start: cwnd increased");
            if self.cwnd >= self.ssthresh {
                self.state = CongestionState::CongestionAvoidance;
                trace!("State changed to CongestionAvoidance");
            }
        } else {
            self.state = CongestionState::CongestionAvoidance;
            self.congestion_avoidance(now, srtt);
        }
        self.clamp();
    }

    fn on_loss(&mut self, now: Instant) -> bool {
        if self.state == CongestionState::FastRecovery
            && self.config.loss_policy == LossPolicy::OncePerEpoch
        {
            trace!(cwnd = self.cwnd, "Loss absorbed by open recovery episode");
            return false;
        }

        let old_cwnd = self.cwnd;
        self.w_max = self.cwnd;
        self.ssthresh = (self.cwnd * self.config.cubic_beta).max(MIN_CWND);
        self.cwnd = self.ssthresh;
        self.clamp();
        self.k = (self.w_max * (1.0 - self.config.cubic_beta) / self.config.cubic_c).cbrt();
        self.epoch_start = Some(now);
        self.recovery_remaining = (self.cwnd.ceil() as u32).max(1);
        self.state = CongestionState::FastRecovery;

        debug!(
            old_cwnd,
            new_cwnd = self.cwnd,
            ssthresh = self.ssthresh,
            k = self.k,
            "Loss detected, entering fast recovery"
        );
        true
    }

    fn congestion_window(&self) -> f64 {
        self.cwnd
    }

    fn slow_start_threshold(&self) -> f64 {
        self.ssthresh
    }

    fn state(&self) -> CongestionState {
        self.state
    }

    fn reset(&mut self) {
        self.cwnd = self.config.initial_cwnd;
        self.clamp();
        self.ssthresh = self.config.initial_ssthresh.unwrap_or(f64::INFINITY);
        self.state = if self.cwnd < self.ssthresh {
            CongestionState::SlowStart
        } else {
            CongestionState::CongestionAvoidance
        };
        self.w_max = 0.0;
        self.k = 0.0;
        self.epoch_start = None;
        self.recovery_remaining = 0;
    }
}
