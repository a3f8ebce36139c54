//! A task slot: one fetch logic bound to a task definition and an optional
//! file sink.
//!
//! 任务槽：绑定到任务定义和可选文件输出的一个抓取逻辑。

use super::{registry::TaskId, traits::FileSink};
use crate::{
    config::{Config, TaskDef},
    core::{Counters, FetchLogic, RxOutcome},
    error::Result,
    packet::{Data, Interest, Reply, RequestToken},
};
use tokio::{sync::watch, time::Instant};
use tracing::{debug, info, trace, warn};

/// Per-task state owned by a worker. The fetch logic and its window are
/// allocated once and re-armed for every task that occupies the slot.
///
/// 工作线程拥有的每任务状态。抓取逻辑及其窗口只分配一次，并为占用该槽的每个任务重新准备。
#[derive(Debug)]
pub(crate) struct TaskSlot {
    id: Option<TaskId>,
    logic: FetchLogic,
    def: TaskDef,
    sink: Option<Box<dyn FileSink>>,
    n_write_errors: u64,
    finished_tx: Option<watch::Sender<bool>>,
    seg_buf: Vec<u64>,
}

impl TaskSlot {
    pub(crate) fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            id: None,
            logic: FetchLogic::new(config)?,
            def: TaskDef::default(),
            sink: None,
            n_write_errors: 0,
            finished_tx: None,
            seg_buf: Vec::new(),
        })
    }

    /// Binds the slot to a new task. Returns the receiver of the finished flag.
    ///
    /// 将槽位绑定到一个新任务。返回完成标志的接收端。
    pub(crate) fn start(
        &mut self,
        id: TaskId,
        def: TaskDef,
        sink: Option<Box<dyn FileSink>>,
        now: Instant,
    ) -> watch::Receiver<bool> {
        let (finished_tx, finished_rx) = watch::channel(false);
        self.id = Some(id);
        self.def = def;
        self.sink = sink;
        self.finished_tx = Some(finished_tx);
        self.reset(now);
        info!(
            task = %id,
            prefix = %self.def.template.prefix,
            begin = self.def.range.begin,
            end = ?self.def.range.end,
            file = ?self.def.filename,
            "Task started"
        );
        finished_rx
    }

    /// Restarts the same definition from the beginning.
    ///
    /// 从头重新开始同一个定义。
    pub(crate) fn reset(&mut self, now: Instant) {
        self.logic.reset(&self.def.range, now);
        self.n_write_errors = 0;
        if let Some(finished_tx) = &self.finished_tx {
            finished_tx.send_replace(false);
        }
    }

    /// Unbinds the task and closes its sink. In-flight state is discarded.
    ///
    /// 解除任务绑定并关闭其输出。在途状态被丢弃。
    pub(crate) fn stop(&mut self, now: Instant) {
        let Some(id) = self.id.take() else {
            return;
        };
        if let Some(mut sink) = self.sink.take() {
            if let Err(e) = sink.close() {
                warn!(task = %id, error = %e, "Error closing output");
            }
        }
        self.finished_tx = None;
        info!(task = %id, counters = %self.counters(now), "Task stopped");
    }

    pub(crate) fn finished(&self) -> bool {
        self.logic.finished()
    }

    pub(crate) fn counters(&self, now: Instant) -> Counters {
        let mut counters = self.logic.counters(now);
        counters.n_write_errors = self.n_write_errors;
        counters
    }

    /// Feeds one reply into the fetch logic.
    ///
    /// 将一个回复送入抓取逻辑。
    pub(crate) fn on_reply(&mut self, now: Instant, reply: Reply) {
        match reply {
            Reply::Data(data) => self.on_data(now, data),
            Reply::Nack(nack) => {
                trace!(seg_num = nack.token.seg_num, reason = ?nack.reason, "Nack");
                self.logic.on_nack(now, nack.token.seg_num);
            }
        }
        self.notify_finished();
    }

    fn on_data(&mut self, now: Instant, data: Data) {
        let seg_num = data.token.seg_num;
        if data.segment() != Some(seg_num) {
            self.logic.note_unexpected();
            warn!(seg_num, name = %data.name, "Data name does not match its request");
            return;
        }

        if self.logic.on_data(now, seg_num, data.final_block) != RxOutcome::Delivered {
            return;
        }
        let Some(sink) = self.sink.as_mut() else {
            return;
        };
        let Some(segment_len) = self.def.segment_len else {
            return;
        };

        let mut payload = &data.content[..];
        if payload.len() > segment_len {
            self.logic.note_unexpected();
            warn!(seg_num, len = payload.len(), segment_len, "Payload longer than segment length, truncating");
            payload = &payload[..segment_len];
        }
        let Some(offset) = seg_num.checked_mul(segment_len as u64) else {
            self.n_write_errors += 1;
            warn!(seg_num, segment_len, "Segment offset overflows, not writing");
            return;
        };
        if let Err(e) = sink.write_at(offset, payload) {
            self.n_write_errors += 1;
            warn!(seg_num, offset, error = %e, "Cannot write segment");
        }
    }

    fn notify_finished(&mut self) {
        if let Some(finished_tx) = &self.finished_tx {
            if self.logic.finished() && !*finished_tx.borrow() {
                finished_tx.send_replace(true);
                debug!(task = ?self.id, "Task finished");
            }
        }
    }

    /// Runs timeout detection and admission, appending the Interests to send
    /// to `out`.
    ///
    /// 运行超时检测和准入，将要发送的兴趣包追加到 `out`。
    pub(crate) fn poll(&mut self, now: Instant, tx_burst: usize, out: &mut Vec<Interest>) -> usize {
        let Some(id) = self.id else {
            return 0;
        };
        self.logic.on_timer(now);

        self.seg_buf.clear();
        let n = self.logic.tx_burst(now, tx_burst, &mut self.seg_buf);
        out.extend(self.seg_buf.iter().map(|&seg_num| {
            self.def
                .template
                .make_interest(RequestToken { task: id, seg_num })
        }));
        n
    }
}
