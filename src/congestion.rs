//! Defines the pluggable congestion control interface.
//! 定义了可插拔的拥塞控制接口。

use std::{fmt::Debug, time::Duration};
use tokio::time::Instant;

pub mod cubic;

pub use cubic::Cubic;

/// The phase a congestion controller is in.
///
/// 拥塞控制器所处的阶段。
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CongestionState {
    /// 慢启动阶段
    /// Slow start phase
    SlowStart,
    /// 拥塞避免阶段
    /// Congestion avoidance phase
    CongestionAvoidance,
    /// 快速恢复阶段
    /// Fast recovery phase
    FastRecovery,
}

/// A trait for congestion control algorithms.
///
/// The controller knows nothing about segment identity: it only sees
/// delivery and loss events.
///
/// 拥塞控制算法的 trait。
///
/// 控制器不了解分段身份：它只看到交付和丢包事件。
pub trait CongestionControl: Debug + Send + Sync + 'static {
    /// Called when a segment is delivered.
    ///
    /// `srtt` is the current smoothed RTT, used by window growth functions
    /// that depend on the round-trip time.
    ///
    /// 当一个分段被交付时调用。
    fn on_ack(&mut self, now: Instant, srtt: Duration);

    /// Called when a loss is detected. Returns whether the window was reduced.
    ///
    /// 当检测到丢包时调用。返回窗口是否被减小。
    fn on_loss(&mut self, now: Instant) -> bool;

    /// Gets the current congestion window, in segments.
    ///
    /// 获取当前的拥塞窗口大小（以分段为单位）。
    fn congestion_window(&self) -> f64;

    /// Gets the slow start threshold, in segments.
    ///
    /// 获取慢启动阈值（以分段为单位）。
    fn slow_start_threshold(&self) -> f64;

    /// Gets the current phase.
    fn state(&self) -> CongestionState;

    /// Returns to the initial state.
    ///
    /// 恢复到初始状态。
    fn reset(&mut self);
}
