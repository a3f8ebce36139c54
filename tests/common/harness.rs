//! tests/common/harness.rs
use async_trait::async_trait;
use bytes::Bytes;
use ndn_fetch::{
    Config, Error, Result,
    config::TaskSlotConfig,
    fetcher::{Fetcher, Transport},
    packet::{Data, Interest, Nack, NackReason, Reply},
};
use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, Mutex as StdMutex, Once},
    time::Duration,
};
use tokio::sync::{Mutex, mpsc};

/// Initializes tracing for tests, ensuring it's only done once.
pub fn init_tracing() {
    static TRACING_INIT: Once = Once::new();
    TRACING_INIT.call_once(|| {
        let filter =
            std::env::var("RUST_LOG").unwrap_or_else(|_| "ndn_fetch=debug".to_string());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .init();
    });
}

/// The segmented object served by a [`SimTransport`].
#[derive(Debug, Clone)]
pub struct SimObject {
    pub segment_len: usize,
    pub n_segments: u64,
    /// Attach FinalBlockId to every Data.
    pub advertise_final: bool,
}

impl SimObject {
    pub fn new(segment_len: usize, n_segments: u64) -> Self {
        Self {
            segment_len,
            n_segments,
            advertise_final: true,
        }
    }

    /// Deterministic payload of one segment.
    pub fn segment(&self, seg_num: u64) -> Bytes {
        (0..self.segment_len)
            .map(|i| ((seg_num as usize * 31 + i) % 251) as u8)
            .collect::<Vec<_>>()
            .into()
    }

    /// The whole object.
    pub fn bytes(&self) -> Vec<u8> {
        (0..self.n_segments)
            .flat_map(|seg_num| self.segment(seg_num).to_vec())
            .collect()
    }
}

/// What the simulated network does with one Interest.
#[derive(Debug, Clone, Copy)]
pub enum Action {
    /// Answer with Data after the given delay.
    Deliver(Duration),
    /// Lose the Interest.
    Drop,
    /// Answer with a Nack after the given delay.
    Nack(NackReason, Duration),
}

/// Chooses an action from the Interest and how many times its segment was
/// requested before.
pub type Policy = Box<dyn FnMut(&Interest, u32) -> Action + Send>;

/// A transport backed by a simulated producer.
pub struct SimTransport {
    object: SimObject,
    policy: StdMutex<Policy>,
    attempts: StdMutex<HashMap<u64, u32>>,
    sent: StdMutex<Vec<u64>>,
    reply_tx: mpsc::UnboundedSender<Reply>,
    reply_rx: Mutex<mpsc::UnboundedReceiver<Reply>>,
}

impl fmt::Debug for SimTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimTransport")
            .field("object", &self.object)
            .finish_non_exhaustive()
    }
}

pub const DEFAULT_DELAY: Duration = Duration::from_millis(10);

impl SimTransport {
    /// Every Interest is answered after [`DEFAULT_DELAY`].
    pub fn new(object: SimObject) -> Arc<Self> {
        Self::with_policy(object, |_, _| Action::Deliver(DEFAULT_DELAY))
    }

    pub fn with_policy(
        object: SimObject,
        policy: impl FnMut(&Interest, u32) -> Action + Send + 'static,
    ) -> Arc<Self> {
        let (reply_tx, reply_rx) = mpsc::unbounded_channel();
        Arc::new(Self {
            object,
            policy: StdMutex::new(Box::new(policy)),
            attempts: StdMutex::new(HashMap::new()),
            sent: StdMutex::new(Vec::new()),
            reply_tx,
            reply_rx: Mutex::new(reply_rx),
        })
    }

    /// Segment numbers of all Interests sent so far, in sending order.
    pub fn sent(&self) -> Vec<u64> {
        self.sent.lock().unwrap().clone()
    }

    pub fn attempts(&self, seg_num: u64) -> u32 {
        self.attempts
            .lock()
            .unwrap()
            .get(&seg_num)
            .copied()
            .unwrap_or(0)
    }

    fn respond(&self, interest: &Interest, action: Action) {
        let seg_num = interest.seg_num();
        let (reply, delay): (Reply, Duration) = match action {
            Action::Drop => return,
            Action::Nack(reason, delay) => (Nack::reject(interest, reason).into(), delay),
            Action::Deliver(delay) if seg_num >= self.object.n_segments => {
                (Nack::reject(interest, NackReason::NoRoute).into(), delay)
            }
            Action::Deliver(delay) => {
                let mut data = Data::answer(interest, self.object.segment(seg_num));
                if self.object.advertise_final {
                    data = data.with_final_block(self.object.n_segments - 1);
                }
                (data.into(), delay)
            }
        };
        let reply_tx = self.reply_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = reply_tx.send(reply);
        });
    }
}

#[async_trait]
impl Transport for SimTransport {
    async fn send_interests(&self, interests: Vec<Interest>) -> Result<()> {
        for interest in interests {
            let seg_num = interest.seg_num();
            self.sent.lock().unwrap().push(seg_num);
            let attempt = {
                let mut attempts = self.attempts.lock().unwrap();
                let n = attempts.entry(seg_num).or_insert(0);
                *n += 1;
                *n - 1
            };
            let action = {
                let mut policy = self.policy.lock().unwrap();
                (*policy)(&interest, attempt)
            };
            self.respond(&interest, action);
        }
        Ok(())
    }

    async fn recv_replies(&self, limit: usize) -> Result<Vec<Reply>> {
        let mut rx = self.reply_rx.lock().await;
        let first = rx.recv().await.ok_or(Error::ChannelClosed)?;
        let mut replies = vec![first];
        while replies.len() < limit {
            match rx.try_recv() {
                Ok(reply) => replies.push(reply),
                Err(_) => break,
            }
        }
        Ok(replies)
    }
}

/// A config with a small window, as used by most scenarios.
pub fn small_config(window_capacity: usize, initial_cwnd: f64) -> Config {
    let mut config = Config {
        task_slot: TaskSlotConfig {
            window_capacity,
            slots_per_worker: 4,
        },
        ..Default::default()
    };
    config.congestion_control.initial_cwnd = initial_cwnd;
    config
}

/// Spawns a fetcher with one worker per transport.
pub fn spawn_fetcher(config: Config, transports: &[Arc<SimTransport>]) -> Fetcher {
    init_tracing();
    Fetcher::new(config, transports.to_vec()).unwrap()
}
