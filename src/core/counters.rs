//! Read-only statistics of a fetch.
//! 抓取过程的只读统计信息。

use crate::congestion::CongestionState;
use serde::Serialize;
use std::{fmt, time::Duration};

/// Running minimum, maximum, mean and variance over a stream of samples,
/// using Welford's online algorithm.
///
/// 使用 Welford 在线算法计算样本流的最小值、最大值、均值和方差。
#[derive(Debug, Clone, Copy, Default)]
pub struct RunningStat {
    n: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStat {
    pub fn push(&mut self, x: f64) {
        self.n += 1;
        if self.n == 1 {
            self.min = x;
            self.max = x;
        } else {
            self.min = self.min.min(x);
            self.max = self.max.max(x);
        }
        let delta = x - self.mean;
        self.mean += delta / self.n as f64;
        self.m2 += delta * (x - self.mean);
    }

    pub fn len(&self) -> u64 {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Sample variance. Zero with fewer than two samples.
    pub fn variance(&self) -> f64 {
        if self.n < 2 {
            0.0
        } else {
            self.m2 / (self.n - 1) as f64
        }
    }

    pub fn stdev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Summary of all RTT samples taken during a fetch.
///
/// 抓取过程中所有 RTT 样本的摘要。
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RttStats {
    pub samples: u64,
    #[serde(with = "humantime_serde")]
    pub min: Duration,
    #[serde(with = "humantime_serde")]
    pub max: Duration,
    #[serde(with = "humantime_serde")]
    pub mean: Duration,
    #[serde(with = "humantime_serde")]
    pub stdev: Duration,
}

impl From<&RunningStat> for RttStats {
    fn from(stat: &RunningStat) -> Self {
        if stat.is_empty() {
            return Self::default();
        }
        Self {
            samples: stat.len(),
            min: Duration::from_secs_f64(stat.min()),
            max: Duration::from_secs_f64(stat.max()),
            mean: Duration::from_secs_f64(stat.mean()),
            stdev: Duration::from_secs_f64(stat.stdev()),
        }
    }
}

/// A snapshot of the statistics of one fetch task.
///
/// 一个抓取任务统计信息的快照。
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Counters {
    /// Time since the task started.
    /// 任务启动以来的时间。
    #[serde(with = "humantime_serde")]
    pub elapsed: Duration,
    /// Time from start to completion, once finished.
    /// 完成后，从启动到完成所用的时间。
    #[serde(with = "humantime_serde")]
    pub finished: Option<Duration>,
    #[serde(with = "humantime_serde")]
    pub last_rtt: Option<Duration>,
    #[serde(with = "humantime_serde")]
    pub srtt: Option<Duration>,
    #[serde(with = "humantime_serde")]
    pub rttvar: Option<Duration>,
    #[serde(with = "humantime_serde")]
    pub rto: Duration,
    pub cwnd: f64,
    pub ssthresh: f64,
    pub congestion_state: CongestionState,
    /// Interests sent and not yet answered, timed out or rejected.
    /// 已发送但尚未得到应答、超时或被拒绝的兴趣包。
    pub n_in_flight: u64,
    /// Interests sent, including retransmissions.
    /// 已发送的兴趣包，包括重传。
    pub n_tx_interests: u64,
    pub n_tx_retx: u64,
    pub n_rx_data: u64,
    pub n_rx_nacks: u64,
    /// Replies that matched no tracked segment or declared a bad final segment.
    /// 未匹配任何被跟踪分段或声明了错误最终分段的回复。
    pub n_rx_unexpected: u64,
    pub n_timeouts: u64,
    pub n_write_errors: u64,
    pub rtt: RttStats,
    pub lo_seg_num: u64,
    pub hi_seg_num: u64,
}

impl fmt::Display for Counters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pct = |n: u64| {
            if self.n_tx_interests == 0 {
                0.0
            } else {
                100.0 * n as f64 / self.n_tx_interests as f64
            }
        };
        write!(
            f,
            "{}I {}D({:.2}%) {}N({:.2}%) {}T retx={} inflight={} cwnd={:.2} rto={:?} seg=[{},{})",
            self.n_tx_interests,
            self.n_rx_data,
            pct(self.n_rx_data),
            self.n_rx_nacks,
            pct(self.n_rx_nacks),
            self.n_timeouts,
            self.n_tx_retx,
            self.n_in_flight,
            self.cwnd,
            self.rto,
            self.lo_seg_num,
            self.hi_seg_num,
        )?;
        if self.rtt.samples > 0 {
            write!(
                f,
                " rtt={:?}/{:?}/{:?}/{:?}",
                self.rtt.min, self.rtt.mean, self.rtt.max, self.rtt.stdev
            )?;
        }
        if let Some(finished) = self.finished {
            write!(f, " finished={finished:?}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_stat() {
        let mut stat = RunningStat::default();
        assert!(stat.is_empty());
        assert_eq!(stat.variance(), 0.0);

        for x in [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
            stat.push(x);
        }
        assert_eq!(stat.len(), 8);
        assert_eq!(stat.min(), 2.0);
        assert_eq!(stat.max(), 9.0);
        assert!((stat.mean() - 5.0).abs() < 1e-12);
        // Sample variance of this set is 32 / 7.
        assert!((stat.variance() - 32.0 / 7.0).abs() < 1e-12);

        stat.clear();
        assert!(stat.is_empty());
    }

    #[test]
    fn test_rtt_stats_from_running_stat() {
        let mut stat = RunningStat::default();
        assert_eq!(RttStats::from(&stat), RttStats::default());

        stat.push(0.010);
        stat.push(0.030);
        let rtt = RttStats::from(&stat);
        assert_eq!(rtt.samples, 2);
        assert!(rtt.min.abs_diff(Duration::from_millis(10)) < Duration::from_micros(1));
        assert!(rtt.max.abs_diff(Duration::from_millis(30)) < Duration::from_micros(1));
        assert!(rtt.mean.abs_diff(Duration::from_millis(20)) < Duration::from_micros(1));
    }

    #[test]
    fn test_counters_display() {
        let counters = Counters {
            elapsed: Duration::from_secs(1),
            finished: None,
            last_rtt: None,
            srtt: None,
            rttvar: None,
            rto: Duration::from_secs(1),
            cwnd: 2.0,
            ssthresh: f64::INFINITY,
            congestion_state: CongestionState::SlowStart,
            n_in_flight: 2,
            n_tx_interests: 12,
            n_tx_retx: 2,
            n_rx_data: 10,
            n_rx_nacks: 1,
            n_rx_unexpected: 0,
            n_timeouts: 1,
            n_write_errors: 0,
            rtt: RttStats::default(),
            lo_seg_num: 10,
            hi_seg_num: 12,
        };
        let s = counters.to_string();
        assert!(s.starts_with("12I 10D(83.33%) 1N(8.33%)"), "{s}");
        assert!(s.contains("seg=[10,12)"), "{s}");
        assert!(!s.contains("rtt="), "{s}");
    }
}
