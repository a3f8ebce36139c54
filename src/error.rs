//! 定义了库中所有可能的错误类型。
//! Defines all possible error types in the library.

use crate::fetcher::registry::TaskId;
use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification of an [`Error`].
///
/// [`Error`] 的粗粒度分类。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The task definition or fetcher configuration is invalid. The task never starts.
    /// 任务定义或抓取器配置无效。任务不会启动。
    Config,
    /// A resource (file, task slot) could not be acquired. The task never starts.
    /// 无法获取资源（文件、任务槽）。任务不会启动。
    Resource,
    /// An internal contract was violated or a worker went away.
    /// 违反了内部约定或工作线程已退出。
    Internal,
}

/// The primary error type for the fetcher library.
/// 抓取器库的主要错误类型。
#[derive(Debug, Error)]
pub enum Error {
    /// An underlying I/O error occurred.
    /// 发生了底层的I/O错误。
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The window capacity cannot be used.
    /// 窗口容量不可用。
    #[error("invalid window capacity {0}")]
    InvalidWindowCapacity(usize),

    /// A fetcher configuration parameter is out of range.
    /// 抓取器配置参数超出范围。
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),

    /// The segment range is empty or inverted.
    /// 分段范围为空或颠倒。
    #[error("invalid segment range [{begin}, {end:?})")]
    InvalidSegmentRange { begin: u64, end: Option<u64> },

    /// File output was requested without a segment length.
    /// 请求了文件输出但未提供分段长度。
    #[error("segment length is required for file output")]
    MissingSegmentLen,

    /// The segment length is out of range.
    /// 分段长度超出范围。
    #[error("invalid segment length {0}")]
    InvalidSegmentLen(usize),

    /// File output needs a known end of the segment range.
    /// 文件输出需要已知的分段范围终点。
    #[error("file output requires a bounded segment range")]
    UnboundedFileOutput,

    /// A name could not be parsed.
    /// 名称无法解析。
    #[error("invalid name: {0}")]
    InvalidName(String),

    /// The name prefix leaves no room for a segment component.
    /// 名称前缀没有为分段组件留下空间。
    #[error("name prefix too long")]
    NameTooLong,

    /// The output file could not be opened or preallocated.
    /// 无法打开或预分配输出文件。
    #[error("file output {path:?}: {source}")]
    FileOutput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Every task slot on the chosen worker is occupied.
    /// 所选工作线程上的所有任务槽都已被占用。
    #[error("no free task slot")]
    NoFreeSlot,

    /// The referenced task does not exist (anymore).
    /// 所引用的任务不存在（或已不存在）。
    #[error("task {0} not found")]
    TaskNotFound(TaskId),

    /// A segment number outside of the fetch window was used.
    /// 使用了抓取窗口之外的分段号。
    #[error("segment {0} is outside of the fetch window")]
    OutOfWindow(u64),

    /// A segment was sent while it was neither unrequested nor lost.
    /// 分段在既非未请求也非丢失的状态下被发送。
    #[error("segment {0} cannot be sent in its current state")]
    NotSendable(u64),

    /// An internal channel for communication between tasks was closed unexpectedly.
    /// 用于任务间通信的内部通道意外关闭。
    #[error("Internal channel is broken")]
    ChannelClosed,
}

impl Error {
    /// Returns the taxonomy class of this error.
    ///
    /// 返回此错误的分类。
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidWindowCapacity(_)
            | Error::InvalidConfig(_)
            | Error::InvalidSegmentRange { .. }
            | Error::MissingSegmentLen
            | Error::InvalidSegmentLen(_)
            | Error::UnboundedFileOutput
            | Error::InvalidName(_)
            | Error::NameTooLong => ErrorKind::Config,
            Error::Io(_) | Error::FileOutput { .. } | Error::NoFreeSlot => ErrorKind::Resource,
            Error::TaskNotFound(_)
            | Error::OutOfWindow(_)
            | Error::NotSendable(_)
            | Error::ChannelClosed => ErrorKind::Internal,
        }
    }
}

/// A specialized `Result` type for this library.
/// 本库专用的 `Result` 类型。
pub type Result<T> = std::result::Result<T, Error>;

impl From<Error> for std::io::Error {
    fn from(err: Error) -> Self {
        use std::io::ErrorKind;
        match err {
            Error::Io(e) => e,
            Error::FileOutput { source, .. } => source,
            Error::ChannelClosed => ErrorKind::BrokenPipe.into(),
            Error::TaskNotFound(_) => ErrorKind::NotFound.into(),
            Error::NoFreeSlot => ErrorKind::WouldBlock.into(),
            e @ (Error::InvalidWindowCapacity(_)
            | Error::InvalidConfig(_)
            | Error::InvalidSegmentRange { .. }
            | Error::MissingSegmentLen
            | Error::InvalidSegmentLen(_)
            | Error::UnboundedFileOutput
            | Error::InvalidName(_)
            | Error::NameTooLong
            | Error::OutOfWindow(_)
            | Error::NotSendable(_)) => std::io::Error::new(ErrorKind::InvalidInput, e),
        }
    }
}
