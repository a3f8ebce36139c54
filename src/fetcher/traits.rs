//! Collaborator interfaces consumed by the fetch workers.
//!
//! Network I/O, file output and time are all reached through these traits so
//! a worker can be driven by a simulated network and a paused clock in tests.
//!
//! 抓取工作线程使用的协作者接口。
//!
//! 网络I/O、文件输出和时间都通过这些 trait 访问，因此测试中可以使用模拟网络和暂停的时钟驱动工作线程。

use crate::{
    error::Result,
    packet::{Interest, Reply},
};
use async_trait::async_trait;
use std::{fmt::Debug, io};
use tokio::time::Instant;

/// Network face of one worker.
///
/// Every Interest carries a [`RequestToken`](crate::packet::RequestToken); the
/// transport must return that token unchanged with the Data or Nack answering
/// it, and must deliver replies to the worker that sent the Interest.
///
/// 一个工作线程的网络接口。
///
/// 每个兴趣包都携带一个 [`RequestToken`](crate::packet::RequestToken)；
/// 传输层必须在应答它的 Data 或 Nack 中原样返回该令牌，并将回复交付给发送兴趣包的工作线程。
#[async_trait]
pub trait Transport: Send + Sync + Debug + 'static {
    /// Sends a batch of Interests. Delivery is not confirmed; a lost Interest
    /// shows up as a retransmission timeout.
    ///
    /// 发送一批兴趣包。不确认送达；丢失的兴趣包表现为重传超时。
    async fn send_interests(&self, interests: Vec<Interest>) -> Result<()>;

    /// Waits until at least one reply is available and returns at most `limit`
    /// of them.
    ///
    /// This method is polled inside `tokio::select!` and must be cancel-safe:
    /// dropping the future must not lose replies.
    ///
    /// 等待至少一个回复可用，并返回最多 `limit` 个回复。
    ///
    /// 此方法在 `tokio::select!` 中被轮询，必须是取消安全的：丢弃 future 不得丢失回复。
    async fn recv_replies(&self, limit: usize) -> Result<Vec<Reply>>;
}

/// Destination of the payload of a fetch task.
///
/// Offsets are absolute positions in the output object: segment `n` is written
/// at `n * segment_len`.
///
/// 抓取任务载荷的目的地。
///
/// 偏移量是输出对象中的绝对位置：分段 `n` 写入 `n * segment_len` 处。
pub trait FileSink: Debug + Send + 'static {
    /// Reserves storage for `[offset, offset + len)`.
    ///
    /// 为 `[offset, offset + len)` 预留存储空间。
    fn preallocate(&mut self, offset: u64, len: u64) -> io::Result<()>;

    /// Writes `buf` at `offset`.
    ///
    /// 在 `offset` 处写入 `buf`。
    fn write_at(&mut self, offset: u64, buf: &[u8]) -> io::Result<()>;

    /// Flushes and releases the sink. Called once when the task stops.
    ///
    /// 刷新并释放输出。任务停止时调用一次。
    fn close(&mut self) -> io::Result<()>;
}

/// A monotonic clock.
///
/// 单调时钟。
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> Instant;
}

/// The tokio clock, which honours `tokio::time::pause`.
///
/// tokio 时钟，遵循 `tokio::time::pause`。
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}
