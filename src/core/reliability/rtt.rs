//! An estimator for the round-trip time (RTT).
//! RTT 估算器。

use crate::config::ReliabilityConfig;
use std::time::Duration;

const ALPHA: f64 = 1.0 / 8.0;
const BETA: f64 = 1.0 / 4.0;

/// An estimator for the round-trip time (RTT), based on RFC 6298.
///
/// Only unambiguous samples may be fed in: callers must not sample a segment
/// that was sent more than once.
///
/// 一个基于 RFC 6298 的 RTT 估算器。
///
/// 只能输入无歧义的样本：调用者不得对发送过多次的分段进行采样。
#[derive(Debug, Clone)]
pub struct RttEstimator {
    /// The smoothed round-trip time, in seconds. `None` before the first sample.
    /// 平滑的往返时间（秒）。第一个样本之前为 `None`。
    srtt: Option<f64>,
    /// The round-trip time variation, in seconds.
    /// 往返时间变化量（秒）。
    rttvar: f64,
    /// The retransmission timeout.
    /// 重传超时时间。
    rto: Duration,
    last_rtt: Option<Duration>,
    n_samples: u64,
    config: ReliabilityConfig,
}

impl RttEstimator {
    /// Creates a new RTT estimator that starts at the configured initial RTO.
    ///
    /// 创建一个从配置的初始 RTO 开始的新 RTT 估算器。
    pub fn new(config: &ReliabilityConfig) -> Self {
        Self {
            srtt: None,
            rttvar: 0.0,
            rto: config.initial_rto.max(config.min_rto).min(config.max_rto),
            last_rtt: None,
            n_samples: 0,
            config: config.clone(),
        }
    }

    /// Forgets all samples.
    ///
    /// 丢弃所有样本。
    pub fn reset(&mut self) {
        *self = Self::new(&self.config);
    }

    /// Returns the current RTO value.
    ///
    /// 返回当前的 RTO 值。
    pub fn rto(&self) -> Duration {
        self.rto
    }

    /// Returns the smoothed RTT, if any sample has been taken.
    pub fn srtt(&self) -> Option<Duration> {
        self.srtt.map(Duration::from_secs_f64)
    }

    /// Returns the RTT variation, if any sample has been taken.
    pub fn rttvar(&self) -> Option<Duration> {
        self.srtt.map(|_| Duration::from_secs_f64(self.rttvar))
    }

    /// Returns the most recent sample.
    pub fn last_rtt(&self) -> Option<Duration> {
        self.last_rtt
    }

    pub fn n_samples(&self) -> u64 {
        self.n_samples
    }

    /// Updates the RTT estimator with a new sample.
    ///
    /// 使用一个新的样本更新 RTT 估算器。
    pub fn add_sample(&mut self, rtt_sample: Duration) {
        let rtt_sample_f64 = rtt_sample.as_secs_f64();

        let srtt = match self.srtt {
            None => {
                // First sample
                self.rttvar = rtt_sample_f64 / 2.0;
                rtt_sample_f64
            }
            Some(srtt) => {
                // Subsequent samples using RFC 6298 formulas
                let delta = (srtt - rtt_sample_f64).abs();
                self.rttvar = (1.0 - BETA) * self.rttvar + BETA * delta;
                (1.0 - ALPHA) * srtt + ALPHA * rtt_sample_f64
            }
        };
        self.srtt = Some(srtt);
        self.last_rtt = Some(rtt_sample);
        self.n_samples += 1;

        let granularity = self.config.clock_granularity.as_secs_f64();
        let rto_f64 = srtt + (4.0 * self.rttvar).max(granularity);
        self.rto = Duration::from_secs_f64(rto_f64)
            .max(self.config.min_rto)
            .min(self.config.max_rto);
    }

    /// Doubles the RTO after a retransmission timeout, capped at the maximum.
    /// The next sample recomputes it from scratch.
    ///
    /// 重传超时后将 RTO 加倍，不超过最大值。下一个样本会重新计算它。
    pub fn backoff(&mut self) {
        self.rto = self.rto.saturating_mul(2).min(self.config.max_rto);
    }
}
