//! The user-facing API: the `Fetcher` and handles to its tasks.

use super::{
    command::WorkerCommand,
    file::FileOutput,
    registry::{TaskArena, TaskId},
    task::TaskSlot,
    traits::{Clock, FileSink, TokioClock, Transport},
    worker::Worker,
};
use crate::{
    config::{Config, SegmentRange, TaskDef},
    core::Counters,
    error::{Error, Result},
    packet::Name,
};
use dashmap::DashMap;
use std::{
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};
use tokio::{
    sync::{mpsc, oneshot, watch},
    task::JoinHandle,
};
use tracing::{info, warn};

/// Description of a running task, as listed by [`Fetcher::tasks`].
///
/// 运行中任务的描述，由 [`Fetcher::tasks`] 列出。
#[derive(Debug, Clone)]
pub struct TaskInfo {
    pub id: TaskId,
    pub prefix: Name,
    pub range: SegmentRange,
    pub filename: Option<PathBuf>,
}

#[derive(Debug)]
struct WorkerHandle {
    command_tx: mpsc::Sender<WorkerCommand>,
    load: Arc<AtomicUsize>,
    join: JoinHandle<()>,
}

/// A handle to a group of fetch workers, one per transport.
///
/// 一组抓取工作线程的句柄，每个传输对应一个工作线程。
#[derive(Debug)]
pub struct Fetcher {
    workers: Vec<WorkerHandle>,
    tasks: Arc<DashMap<TaskId, TaskInfo>>,
}

impl Fetcher {
    /// Spawns one worker per transport, using the tokio clock.
    ///
    /// 为每个传输生成一个工作线程，使用 tokio 时钟。
    pub fn new<T: Transport>(config: Config, transports: Vec<Arc<T>>) -> Result<Self> {
        Self::spawn(config, transports, Arc::new(TokioClock))
    }

    /// Spawns one worker per transport. Must be called within a tokio runtime.
    ///
    /// Every worker preallocates `slots_per_worker` task slots, each with its
    /// own fetch window.
    ///
    /// 为每个传输生成一个工作线程。必须在 tokio 运行时中调用。
    ///
    /// 每个工作线程预分配 `slots_per_worker` 个任务槽，每个槽都有自己的抓取窗口。
    pub fn spawn<T: Transport, C: Clock>(
        config: Config,
        transports: Vec<Arc<T>>,
        clock: Arc<C>,
    ) -> Result<Self> {
        config.validate()?;

        let mut workers = Vec::with_capacity(transports.len());
        for (index, transport) in transports.into_iter().enumerate() {
            let slots = (0..config.task_slot.slots_per_worker)
                .map(|_| TaskSlot::new(&config))
                .collect::<Result<Vec<_>>>()?;
            let (command_tx, command_rx) = mpsc::channel(config.worker.command_queue.max(1));
            let load = Arc::new(AtomicUsize::new(0));

            let worker = Worker {
                index,
                transport,
                clock: clock.clone(),
                config: config.worker.clone(),
                arena: TaskArena::new(index, slots),
                command_rx,
                load: load.clone(),
            };
            let join = tokio::spawn(worker.run());
            workers.push(WorkerHandle {
                command_tx,
                load,
                join,
            });
        }

        info!(
            workers = workers.len(),
            slots_per_worker = config.task_slot.slots_per_worker,
            "Fetcher started"
        );
        Ok(Self {
            workers,
            tasks: Arc::new(DashMap::new()),
        })
    }

    /// Starts a fetch task.
    ///
    /// The definition is validated and the output file, if any, is opened and
    /// preallocated before the task is handed to the least-loaded worker. If
    /// the task cannot start, the output file is removed again.
    ///
    /// 启动一个抓取任务。
    ///
    /// 在任务交给负载最低的工作线程之前，会先校验定义，并打开和预分配输出文件（如有）。
    /// 若任务无法启动，输出文件会被再次删除。
    pub async fn fetch(&self, def: TaskDef) -> Result<TaskContext> {
        def.validate()?;

        let (Some(path), Some((offset, len))) = (def.filename.clone(), def.file_extent()) else {
            return self.start(def, None).await;
        };

        let open_path = path.clone();
        let output = tokio::task::spawn_blocking(move || FileOutput::create(open_path, offset, len))
            .await
            .map_err(|e| Error::Io(e.into()))??;

        let result = self.start(def, Some(Box::new(output))).await;
        if result.is_err() {
            if let Err(e) = tokio::fs::remove_file(&path).await {
                warn!(path = ?path, error = %e, "Cannot remove output file");
            }
        }
        result
    }

    /// Starts a fetch task writing into a caller-provided sink. The sink must
    /// already be prepared for the task's byte range.
    ///
    /// 启动一个写入调用者提供的输出的抓取任务。该输出必须已为任务的字节范围做好准备。
    pub async fn fetch_with_sink(&self, def: TaskDef, sink: Box<dyn FileSink>) -> Result<TaskContext> {
        def.validate()?;
        if def.segment_len.is_none() {
            return Err(Error::MissingSegmentLen);
        }
        self.start(def, Some(sink)).await
    }

    async fn start(&self, def: TaskDef, sink: Option<Box<dyn FileSink>>) -> Result<TaskContext> {
        let worker = self
            .workers
            .iter()
            .min_by_key(|w| w.load.load(Ordering::Relaxed))
            .ok_or(Error::NoFreeSlot)?;

        let prefix = def.template.prefix.clone();
        let range = def.range;
        let filename = def.filename.clone();

        let (response_tx, response_rx) = oneshot::channel();
        worker
            .command_tx
            .send(WorkerCommand::Start {
                def,
                sink,
                response_tx,
            })
            .await
            .map_err(|_| Error::ChannelClosed)?;
        let (id, finished_rx) = response_rx.await.map_err(|_| Error::ChannelClosed)??;

        self.tasks.insert(
            id,
            TaskInfo {
                id,
                prefix,
                range,
                filename,
            },
        );
        Ok(TaskContext {
            id,
            command_tx: worker.command_tx.clone(),
            finished_rx,
            tasks: self.tasks.clone(),
        })
    }

    /// Lists running tasks.
    ///
    /// 列出运行中的任务。
    pub fn tasks(&self) -> Vec<TaskInfo> {
        let mut tasks: Vec<_> = self.tasks.iter().map(|entry| entry.value().clone()).collect();
        tasks.sort_by_key(|info| info.id);
        tasks
    }

    /// Stops every task and every worker.
    ///
    /// 停止所有任务和所有工作线程。
    pub async fn shutdown(self) -> Result<()> {
        for worker in self.workers {
            let (response_tx, response_rx) = oneshot::channel();
            if worker
                .command_tx
                .send(WorkerCommand::Shutdown { response_tx })
                .await
                .is_ok()
            {
                let _ = response_rx.await;
            }
            if let Err(e) = worker.join.await {
                warn!(error = %e, "Fetch worker panicked");
            }
        }
        self.tasks.clear();
        info!("Fetcher shut down");
        Ok(())
    }
}

/// A handle to one fetch task.
///
/// Every operation is a command to the worker that owns the task. Dropping the
/// handle does not stop the task.
///
/// 一个抓取任务的句柄。
///
/// 每个操作都是发给拥有该任务的工作线程的命令。丢弃句柄不会停止任务。
#[derive(Debug, Clone)]
pub struct TaskContext {
    id: TaskId,
    command_tx: mpsc::Sender<WorkerCommand>,
    finished_rx: watch::Receiver<bool>,
    tasks: Arc<DashMap<TaskId, TaskInfo>>,
}

impl TaskContext {
    pub fn id(&self) -> TaskId {
        self.id
    }

    async fn request<R>(
        &self,
        make: impl FnOnce(oneshot::Sender<R>) -> WorkerCommand,
    ) -> Result<R> {
        let (response_tx, response_rx) = oneshot::channel();
        self.command_tx
            .send(make(response_tx))
            .await
            .map_err(|_| Error::ChannelClosed)?;
        response_rx.await.map_err(|_| Error::ChannelClosed)
    }

    /// Reads the task's counters.
    ///
    /// 读取任务的计数器。
    pub async fn counters(&self) -> Result<Counters> {
        let id = self.id;
        self.request(|response_tx| WorkerCommand::Counters { id, response_tx })
            .await?
    }

    /// Whether every segment up to a known final segment has been delivered.
    ///
    /// 是否已交付截至已知最终分段的所有分段。
    pub async fn finished(&self) -> Result<bool> {
        let id = self.id;
        self.request(|response_tx| WorkerCommand::Finished { id, response_tx })
            .await?
    }

    /// Waits until the task finishes. Fails if the task is stopped first.
    ///
    /// 等待任务完成。若任务先被停止则失败。
    pub async fn wait_finished(&mut self) -> Result<()> {
        self.finished_rx
            .wait_for(|finished| *finished)
            .await
            .map_err(|_| Error::TaskNotFound(self.id))?;
        Ok(())
    }

    /// Restarts the task from the beginning of its range.
    ///
    /// 从范围起点重新启动任务。
    pub async fn reset(&self) -> Result<()> {
        let id = self.id;
        self.request(|response_tx| WorkerCommand::Reset { id, response_tx })
            .await?
    }

    /// Stops the task and closes its output file. Stopping a task that is
    /// already stopped, or whose fetcher has shut down, succeeds.
    ///
    /// 停止任务并关闭其输出文件。停止已停止的任务或其抓取器已关闭的任务都会成功。
    pub async fn stop(&self) -> Result<()> {
        let id = self.id;
        self.tasks.remove(&id);
        match self
            .request(|response_tx| WorkerCommand::Stop { id, response_tx })
            .await
        {
            Ok(_) | Err(Error::ChannelClosed) => Ok(()),
            Err(e) => Err(e),
        }
    }
}
