//! 定义了抓取器和抓取任务的可配置参数。
//! Defines configurable parameters for the fetcher and its tasks.

use crate::{
    error::{Error, Result},
    packet::{InterestTemplate, MAX_NAME_LEN, NameComponent},
};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

/// Smallest permitted window capacity.
/// 允许的最小窗口容量。
pub const MIN_WINDOW_CAPACITY: usize = 16;

/// Largest permitted window capacity.
/// 允许的最大窗口容量。
pub const MAX_WINDOW_CAPACITY: usize = 65536;

/// Rounds `value` up to a power of two and clamps it into `[min, max]`.
///
/// 将 `value` 向上取整到2的幂，并限制在 `[min, max]` 范围内。
pub fn align_capacity(value: usize, min: usize, max: usize) -> usize {
    value
        .checked_next_power_of_two()
        .unwrap_or(max)
        .clamp(min, max)
}

/// A structure containing all configurable parameters of a fetcher.
///
/// 包含抓取器所有可配置参数的结构体。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// RTT estimation and retransmission timeout parameters.
    /// RTT估算与重传超时参数。
    pub reliability: ReliabilityConfig,

    /// Congestion control-related parameters.
    /// 拥塞控制相关参数。
    pub congestion_control: CongestionControlConfig,

    /// Task slot parameters.
    /// 任务槽参数。
    pub task_slot: TaskSlotConfig,

    /// Worker run loop parameters.
    /// 工作线程运行循环参数。
    pub worker: WorkerConfig,
}

impl Config {
    /// Checks that every parameter is within its range.
    ///
    /// 检查每个参数都在其取值范围内。
    pub fn validate(&self) -> Result<()> {
        let reliability = &self.reliability;
        if reliability.min_rto > reliability.max_rto {
            return Err(Error::InvalidConfig("minRto is greater than maxRto"));
        }

        let cc = &self.congestion_control;
        if cc.cubic_beta.is_nan() || cc.cubic_beta <= 0.0 || cc.cubic_beta >= 1.0 {
            return Err(Error::InvalidConfig("cubicBeta must be in (0, 1)"));
        }
        if !cc.cubic_c.is_finite() || cc.cubic_c <= 0.0 {
            return Err(Error::InvalidConfig("cubicC must be positive"));
        }
        if cc.initial_cwnd.is_nan() || cc.initial_cwnd < 1.0 {
            return Err(Error::InvalidConfig("initialCwnd must be at least 1"));
        }
        if cc.initial_ssthresh.is_some_and(|ssthresh| ssthresh.is_nan() || ssthresh < 1.0) {
            return Err(Error::InvalidConfig("initialSsthresh must be at least 1"));
        }

        if self.worker.tick_interval.is_zero() {
            return Err(Error::InvalidConfig("tickInterval must be non-zero"));
        }
        self.task_slot.aligned_window_capacity()?;
        Ok(())
    }
}

/// RTT estimation and retransmission timeout parameters.
///
/// RTT估算与重传超时参数。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReliabilityConfig {
    /// The RTO used before the first RTT sample.
    /// 在第一个RTT样本之前使用的RTO。
    #[serde(with = "humantime_serde")]
    pub initial_rto: Duration,
    /// The minimum RTO value. The RTO will not be allowed to fall below this.
    /// 最小RTO值。RTO不允许低于此值。
    #[serde(with = "humantime_serde")]
    pub min_rto: Duration,
    /// The maximum RTO value, also the cap for exponential backoff.
    /// 最大RTO值，同时也是指数退避的上限。
    #[serde(with = "humantime_serde")]
    pub max_rto: Duration,
    /// Clock granularity `G` in `RTO = SRTT + max(G, 4 * RTTVAR)`.
    /// `RTO = SRTT + max(G, 4 * RTTVAR)` 中的时钟粒度 `G`。
    #[serde(with = "humantime_serde")]
    pub clock_granularity: Duration,
    /// Double the RTO after a batch of retransmission timeouts.
    /// 在一批重传超时后将RTO加倍。
    pub rto_backoff: bool,
}

/// Policy for loss signals that arrive while the controller is already recovering.
///
/// 控制器已处于恢复阶段时到达的丢包信号的处理策略。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LossPolicy {
    /// Reduce the window once per loss epoch; losses during fast recovery are absorbed.
    /// 每个丢包周期仅减小一次窗口；快速恢复期间的丢包被吸收。
    OncePerEpoch,
    /// Reduce the window on every loss signal.
    /// 每个丢包信号都减小窗口。
    EveryLoss,
}

/// Congestion control-related parameters.
///
/// 拥塞控制相关参数。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CongestionControlConfig {
    /// The initial congestion window in segments.
    /// 初始拥塞窗口（以分段为单位）。
    pub initial_cwnd: f64,
    /// The initial slow start threshold in segments. `None` means unbounded.
    /// 初始慢启动阈值（以分段为单位）。`None` 表示无上限。
    pub initial_ssthresh: Option<f64>,
    /// CUBIC scaling constant `C`.
    /// CUBIC 缩放常数 `C`。
    pub cubic_c: f64,
    /// CUBIC multiplicative decrease factor `beta`.
    /// CUBIC 乘性减小因子 `beta`。
    pub cubic_beta: f64,
    /// Never grow slower than an AIMD flow with the same `beta` would.
    /// 增长速度不低于具有相同 `beta` 的AIMD流。
    pub tcp_friendly: bool,
    /// How losses inside an open recovery episode are treated.
    /// 如何处理处于恢复阶段内的丢包。
    pub loss_policy: LossPolicy,
}

/// Task slot parameters.
///
/// 任务槽参数。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TaskSlotConfig {
    /// Maximum distance between the lower and upper bounds of segment numbers
    /// in an ongoing fetch. Rounded up to a power of two within `[16, 65536]`.
    ///
    /// 进行中的抓取里分段号上下界之间的最大距离。在 `[16, 65536]` 内向上取整为2的幂。
    pub window_capacity: usize,
    /// Number of preallocated task slots on every worker.
    /// 每个工作线程上预分配的任务槽数量。
    pub slots_per_worker: usize,
}

impl TaskSlotConfig {
    /// Returns the aligned window capacity, rejecting zero.
    ///
    /// 返回对齐后的窗口容量，拒绝零值。
    pub fn aligned_window_capacity(&self) -> Result<usize> {
        if self.window_capacity == 0 {
            return Err(Error::InvalidWindowCapacity(self.window_capacity));
        }
        Ok(align_capacity(
            self.window_capacity,
            MIN_WINDOW_CAPACITY,
            MAX_WINDOW_CAPACITY,
        ))
    }
}

/// Worker run loop parameters.
///
/// 工作线程运行循环参数。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WorkerConfig {
    /// How often the worker wakes up to scan for expired deadlines.
    /// 工作线程唤醒以扫描过期截止时间的频率。
    #[serde(with = "humantime_serde")]
    pub tick_interval: Duration,
    /// Maximum number of Interests one task sends per iteration.
    /// 每个任务每次迭代发送的最大兴趣包数量。
    pub tx_burst: usize,
    /// Maximum number of replies processed per iteration.
    /// 每次迭代处理的最大回复数量。
    pub rx_burst: usize,
    /// Capacity of the worker control queue.
    /// 工作线程控制队列的容量。
    pub command_queue: usize,
}

impl Default for ReliabilityConfig {
    fn default() -> Self {
        Self {
            initial_rto: Duration::from_millis(1000),
            min_rto: Duration::from_millis(200),
            max_rto: Duration::from_secs(60),
            clock_granularity: Duration::from_millis(1),
            rto_backoff: true,
        }
    }
}

impl Default for CongestionControlConfig {
    fn default() -> Self {
        Self {
            initial_cwnd: 2.0,
            initial_ssthresh: None,
            cubic_c: 0.4,
            cubic_beta: 0.7,
            tcp_friendly: true,
            loss_policy: LossPolicy::OncePerEpoch,
        }
    }
}

impl Default for TaskSlotConfig {
    fn default() -> Self {
        Self {
            window_capacity: 16384,
            slots_per_worker: 16,
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(1),
            tx_burst: 64,
            rx_burst: 64,
            command_queue: 32,
        }
    }
}

/// A range of segment numbers, `[begin, end)`.
///
/// 分段号范围 `[begin, end)`。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentRange {
    /// First segment number.
    /// 第一个分段号。
    #[serde(default, rename = "segmentBegin")]
    pub begin: u64,
    /// Exclusive end. `None` retrieves until the FinalBlockId is discovered.
    /// 不包含的终点。`None` 表示一直抓取直到发现 FinalBlockId。
    #[serde(default, rename = "segmentEnd", skip_serializing_if = "Option::is_none")]
    pub end: Option<u64>,
}

impl SegmentRange {
    /// Creates a bounded range.
    pub fn new(begin: u64, end: u64) -> Self {
        Self {
            begin,
            end: Some(end),
        }
    }

    /// Creates a range whose end is learned from the network.
    pub fn open(begin: u64) -> Self {
        Self { begin, end: None }
    }

    /// The inclusive last segment number, if the end is known.
    pub fn last(&self) -> Option<u64> {
        self.end.map(|end| end.saturating_sub(1))
    }
}

/// Defines a fetch task that retrieves one segmented object.
///
/// The fetcher neither retrieves metadata nor performs version discovery; a
/// versioned object must carry its version component in the name prefix.
///
/// 定义一个抓取分段对象的任务。
///
/// 抓取器不获取元数据，也不执行版本发现；带版本的对象须在名称前缀中包含版本组件。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDef {
    /// Name prefix, lifetime and flags of every Interest.
    /// 每个兴趣包的名称前缀、生存期和标志。
    #[serde(flatten)]
    pub template: InterestTemplate,

    /// Range of segment numbers.
    /// 分段号范围。
    #[serde(flatten)]
    pub range: SegmentRange,

    /// Output file. If omitted, payload is discarded.
    /// 输出文件。若省略，则丢弃载荷。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<PathBuf>,

    /// Payload length of every segment; required when writing to a file.
    /// 每个分段的载荷长度；写入文件时必需。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segment_len: Option<usize>,
}

impl TaskDef {
    /// Checks the definition before any resource is acquired.
    ///
    /// 在获取任何资源之前检查定义。
    pub fn validate(&self) -> Result<()> {
        if let Some(end) = self.range.end {
            if end <= self.range.begin {
                return Err(Error::InvalidSegmentRange {
                    begin: self.range.begin,
                    end: self.range.end,
                });
            }
        }

        let max_segment_component = NameComponent::segment(u64::MAX).encoded_len();
        if self.template.prefix.encoded_len() + max_segment_component > MAX_NAME_LEN {
            return Err(Error::NameTooLong);
        }

        if self.filename.is_some() {
            let segment_len = self.segment_len.ok_or(Error::MissingSegmentLen)?;
            if segment_len == 0 || segment_len > u32::MAX as usize {
                return Err(Error::InvalidSegmentLen(segment_len));
            }
            let end = self.range.end.ok_or(Error::UnboundedFileOutput)?;
            if end > u32::MAX as u64 {
                return Err(Error::InvalidSegmentRange {
                    begin: self.range.begin,
                    end: self.range.end,
                });
            }
        }
        Ok(())
    }

    /// Byte range of the output file, `(offset, length)`.
    ///
    /// 输出文件的字节范围 `(offset, length)`。
    pub fn file_extent(&self) -> Option<(u64, u64)> {
        let segment_len = self.segment_len? as u64;
        let end = self.range.end?;
        let offset = self.range.begin * segment_len;
        Some((offset, end * segment_len - offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::Name;

    #[test]
    fn test_align_capacity() {
        assert_eq!(align_capacity(1, 16, 65536), 16);
        assert_eq!(align_capacity(16, 16, 65536), 16);
        assert_eq!(align_capacity(17, 16, 65536), 32);
        assert_eq!(align_capacity(1000, 16, 65536), 1024);
        assert_eq!(align_capacity(100_000, 16, 65536), 65536);
        assert_eq!(align_capacity(usize::MAX, 16, 65536), 65536);
    }

    #[test]
    fn test_zero_window_capacity_rejected() {
        let cfg = TaskSlotConfig {
            window_capacity: 0,
            ..Default::default()
        };
        assert!(matches!(
            cfg.aligned_window_capacity(),
            Err(Error::InvalidWindowCapacity(0))
        ));
    }

    #[test]
    fn test_default_config_is_valid() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn test_inverted_rto_bounds_rejected() {
        let mut config = Config::default();
        config.reliability.min_rto = Duration::from_secs(5);
        config.reliability.max_rto = Duration::from_secs(1);
        let err = config.validate().unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
        assert_eq!(err.kind(), crate::error::ErrorKind::Config);
    }

    #[test]
    fn test_cubic_beta_out_of_range_rejected() {
        for beta in [0.0, 1.0, -0.5, 1.5, f64::NAN] {
            let mut config = Config::default();
            config.congestion_control.cubic_beta = beta;
            assert!(
                matches!(config.validate(), Err(Error::InvalidConfig(_))),
                "beta {beta}"
            );
        }
    }

    #[test]
    fn test_non_positive_cubic_c_rejected() {
        for c in [0.0, -0.4, f64::NAN, f64::INFINITY] {
            let mut config = Config::default();
            config.congestion_control.cubic_c = c;
            assert!(
                matches!(config.validate(), Err(Error::InvalidConfig(_))),
                "c {c}"
            );
        }
    }

    #[test]
    fn test_initial_cwnd_below_one_rejected() {
        let mut config = Config::default();
        config.congestion_control.initial_cwnd = 0.5;
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        config.congestion_control.initial_cwnd = 1.0;
        config.validate().unwrap();

        config.congestion_control.initial_ssthresh = Some(0.0);
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_zero_tick_interval_rejected() {
        let mut config = Config::default();
        config.worker.tick_interval = Duration::ZERO;
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_invalid_config_from_json() {
        let config: Config =
            serde_json::from_str(r#"{"reliability": {"minRto": "5s", "maxRto": "1s"}}"#).unwrap();
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    fn def_with_file() -> TaskDef {
        TaskDef {
            template: InterestTemplate::new("/A/B".parse::<Name>().unwrap()),
            range: SegmentRange::new(0, 3),
            filename: Some(PathBuf::from("out.bin")),
            segment_len: Some(1000),
        }
    }

    #[test]
    fn test_validate_file_output() {
        let def = def_with_file();
        def.validate().unwrap();
        assert_eq!(def.file_extent(), Some((0, 3000)));

        let mut no_len = def_with_file();
        no_len.segment_len = None;
        assert!(matches!(no_len.validate(), Err(Error::MissingSegmentLen)));

        let mut zero_len = def_with_file();
        zero_len.segment_len = Some(0);
        assert!(matches!(zero_len.validate(), Err(Error::InvalidSegmentLen(0))));

        let mut open = def_with_file();
        open.range = SegmentRange::open(0);
        assert!(matches!(open.validate(), Err(Error::UnboundedFileOutput)));
        assert_eq!(open.validate().unwrap_err().kind(), crate::error::ErrorKind::Config);
    }

    #[test]
    fn test_validate_empty_range() {
        let mut def = def_with_file();
        def.range = SegmentRange::new(5, 5);
        assert!(matches!(
            def.validate(),
            Err(Error::InvalidSegmentRange { begin: 5, end: Some(5) })
        ));
    }

    #[test]
    fn test_file_extent_nonzero_begin() {
        let mut def = def_with_file();
        def.range = SegmentRange::new(2, 5);
        assert_eq!(def.file_extent(), Some((2000, 3000)));
    }
}
