//! The worker actor: owns a set of task slots and drives them from one run loop.
//!
//! 工作线程 actor：拥有一组任务槽，并在一个运行循环中驱动它们。

use super::{
    command::WorkerCommand,
    registry::{TaskArena, TaskId},
    task::TaskSlot,
    traits::{Clock, Transport},
};
use crate::{
    config::WorkerConfig,
    error::{Error, Result},
    packet::Reply,
};
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};
use tokio::{
    sync::mpsc,
    time::{self, MissedTickBehavior},
};
use tracing::{error, info, trace, warn};

/// A fetch worker.
///
/// All per-packet processing of its tasks happens on this actor, so the fetch
/// logic of a task is never touched from two places at once.
///
/// 一个抓取工作线程。
///
/// 其任务的所有逐包处理都在这个 actor 上进行，因此任务的抓取逻辑永远不会被同时从两处访问。
pub(crate) struct Worker<T: Transport, C: Clock> {
    pub(crate) index: usize,
    pub(crate) transport: Arc<T>,
    pub(crate) clock: Arc<C>,
    pub(crate) config: WorkerConfig,
    pub(crate) arena: TaskArena<TaskSlot>,
    pub(crate) command_rx: mpsc::Receiver<WorkerCommand>,
    /// Number of active tasks, read by the `Fetcher` for placement.
    pub(crate) load: Arc<AtomicUsize>,
}

impl<T: Transport, C: Clock> Worker<T, C> {
    /// Runs the worker's main event loop.
    ///
    /// 运行工作线程的主事件循环。
    pub(crate) async fn run(mut self) {
        let mut tick = time::interval(self.config.tick_interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let rx_burst = self.config.rx_burst.max(1);
        let transport = self.transport.clone();
        let mut transport_open = true;

        info!(worker = self.index, slots = self.arena.capacity(), "Fetch worker running");
        loop {
            tokio::select! {
                // 1. Control plane.
                // 1. 控制平面。
                command = self.command_rx.recv() => match command {
                    Some(WorkerCommand::Shutdown { response_tx }) => {
                        self.stop_all();
                        let _ = response_tx.send(());
                        break;
                    }
                    Some(command) => self.handle_command(command),
                    None => {
                        self.stop_all();
                        break;
                    }
                },
                // 2. Replies from the network.
                // 2. 来自网络的回复。
                result = transport.recv_replies(rx_burst), if transport_open => match result {
                    Ok(replies) => self.dispatch(replies),
                    Err(e) => {
                        error!(worker = self.index, error = %e, "Transport receive failed, no more replies");
                        transport_open = false;
                    }
                },
                // 3. Timer for retransmission timeouts.
                // 3. 重传超时定时器。
                _ = tick.tick() => {}
            }

            self.poll_tasks().await;
        }
        info!(worker = self.index, "Fetch worker stopped");
    }

    fn handle_command(&mut self, command: WorkerCommand) {
        let now = self.clock.now();
        match command {
            WorkerCommand::Start {
                def,
                sink,
                response_tx,
            } => {
                let result = match self.arena.acquire() {
                    Some((id, slot)) => {
                        let finished_rx = slot.start(id, def, sink, now);
                        self.load.fetch_add(1, Ordering::Relaxed);
                        Ok((id, finished_rx))
                    }
                    None => {
                        drop(sink);
                        warn!(worker = self.index, "No free task slot");
                        Err(Error::NoFreeSlot)
                    }
                };
                let _ = response_tx.send(result);
            }
            WorkerCommand::Stop { id, response_tx } => {
                let _ = response_tx.send(self.stop_task(id, now));
            }
            WorkerCommand::Reset { id, response_tx } => {
                let result = self
                    .slot_mut(id)
                    .map(|slot| slot.reset(now));
                let _ = response_tx.send(result);
            }
            WorkerCommand::Counters { id, response_tx } => {
                let result = self.slot_mut(id).map(|slot| slot.counters(now));
                let _ = response_tx.send(result);
            }
            WorkerCommand::Finished { id, response_tx } => {
                let result = self.slot_mut(id).map(|slot| slot.finished());
                let _ = response_tx.send(result);
            }
            WorkerCommand::Shutdown { response_tx } => {
                self.stop_all();
                let _ = response_tx.send(());
            }
        }
    }

    fn slot_mut(&mut self, id: TaskId) -> Result<&mut TaskSlot> {
        self.arena.get_mut(id).ok_or(Error::TaskNotFound(id))
    }

    fn stop_task(&mut self, id: TaskId, now: time::Instant) -> bool {
        match self.arena.release(id) {
            Some(slot) => {
                slot.stop(now);
                self.load.fetch_sub(1, Ordering::Relaxed);
                true
            }
            None => false,
        }
    }

    fn stop_all(&mut self) {
        let now = self.clock.now();
        for id in self.arena.active_ids() {
            self.stop_task(id, now);
        }
    }

    /// Hands every reply to the task that sent its Interest. Replies for tasks
    /// that no longer exist are dropped here.
    ///
    /// 将每个回复交给发送其兴趣包的任务。已不存在的任务的回复在此丢弃。
    fn dispatch(&mut self, replies: Vec<Reply>) {
        let now = self.clock.now();
        for reply in replies {
            let id = reply.token().task;
            match self.arena.get_mut(id) {
                Some(slot) => slot.on_reply(now, reply),
                None => trace!(worker = self.index, task = %id, "Dropping reply for stopped task"),
            }
        }
    }

    /// Runs timeouts and admission on every active task and sends one batch
    /// of Interests per task.
    ///
    /// 对每个活动任务运行超时和准入，并为每个任务发送一批兴趣包。
    async fn poll_tasks(&mut self) {
        let now = self.clock.now();
        let tx_burst = self.config.tx_burst;
        for (id, slot) in self.arena.iter_active_mut() {
            let mut interests = Vec::new();
            if slot.poll(now, tx_burst, &mut interests) == 0 {
                continue;
            }
            trace!(task = %id, count = interests.len(), "Sending Interests");
            if let Err(e) = self.transport.send_interests(interests).await {
                warn!(task = %id, error = %e, "Transport send failed");
            }
        }
    }
}
