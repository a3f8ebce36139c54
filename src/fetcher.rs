//! The fetcher: workers that drive fetch tasks over a network transport, and
//! the handles used to start and control them.
//!
//! 抓取器：通过网络传输驱动抓取任务的工作线程，以及用于启动和控制它们的句柄。
mod command;
pub mod file;
pub mod handle;
pub mod registry;
mod task;
pub mod traits;
mod worker;

pub use file::FileOutput;
pub use handle::{Fetcher, TaskContext, TaskInfo};
pub use registry::TaskId;
pub use traits::{Clock, FileSink, TokioClock, Transport};

#[cfg(test)]
mod test_utils;
