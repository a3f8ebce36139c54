//! Commands sent to a fetch worker.

use super::{registry::TaskId, traits::FileSink};
use crate::{config::TaskDef, core::Counters, error::Result};
use tokio::sync::{oneshot, watch};

/// Commands sent to a `Worker`.
///
/// The worker is the only owner of its task slots; every cross-task operation
/// is a command answered through `response_tx` once the worker has applied it.
///
/// 发送到 `Worker` 的命令。
///
/// 工作线程是其任务槽的唯一所有者；每个跨任务操作都是一个命令，
/// 在工作线程应用后通过 `response_tx` 应答。
#[derive(Debug)]
pub(crate) enum WorkerCommand {
    /// Start a task in a free slot.
    /// 在空闲槽位中启动一个任务。
    Start {
        def: TaskDef,
        sink: Option<Box<dyn FileSink>>,
        response_tx: oneshot::Sender<Result<(TaskId, watch::Receiver<bool>)>>,
    },
    /// Stop a task. Answers whether the task was still running.
    /// 停止一个任务。应答该任务是否仍在运行。
    Stop {
        id: TaskId,
        response_tx: oneshot::Sender<bool>,
    },
    /// Restart a task from the beginning of its range.
    /// 从范围起点重新开始一个任务。
    Reset {
        id: TaskId,
        response_tx: oneshot::Sender<Result<()>>,
    },
    Counters {
        id: TaskId,
        response_tx: oneshot::Sender<Result<Counters>>,
    },
    Finished {
        id: TaskId,
        response_tx: oneshot::Sender<Result<bool>>,
    },
    /// Stop every task and exit the run loop.
    /// 停止所有任务并退出运行循环。
    Shutdown { response_tx: oneshot::Sender<()> },
}
