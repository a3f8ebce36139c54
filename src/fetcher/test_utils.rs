//! Test doubles for the fetcher collaborators.
use super::traits::{FileSink, Transport};
use crate::{
    error::{Error, Result},
    packet::{Interest, Reply},
};
use async_trait::async_trait;
use std::{
    io,
    sync::{Arc, Mutex as StdMutex},
};
use tokio::sync::{Mutex, mpsc};

/// A transport whose other end is driven by the test.
#[derive(Debug)]
pub(crate) struct MockTransport {
    sent_tx: mpsc::UnboundedSender<Interest>,
    reply_rx: Mutex<mpsc::UnboundedReceiver<Reply>>,
}

/// The test's end of a [`MockTransport`].
pub(crate) struct MockNetwork {
    pub(crate) sent_rx: mpsc::UnboundedReceiver<Interest>,
    pub(crate) reply_tx: mpsc::UnboundedSender<Reply>,
}

impl MockTransport {
    pub(crate) fn new() -> (Arc<Self>, MockNetwork) {
        let (sent_tx, sent_rx) = mpsc::unbounded_channel();
        let (reply_tx, reply_rx) = mpsc::unbounded_channel();
        let transport = Arc::new(Self {
            sent_tx,
            reply_rx: Mutex::new(reply_rx),
        });
        (transport, MockNetwork { sent_rx, reply_tx })
    }
}

impl MockNetwork {
    /// Waits for the next Interest sent by the worker.
    pub(crate) async fn next_interest(&mut self) -> Interest {
        self.sent_rx.recv().await.unwrap()
    }

    pub(crate) fn reply(&self, reply: impl Into<Reply>) {
        self.reply_tx.send(reply.into()).unwrap();
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send_interests(&self, interests: Vec<Interest>) -> Result<()> {
        for interest in interests {
            self.sent_tx.send(interest).map_err(|_| Error::ChannelClosed)?;
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

#[derive(Debug, Default)]
struct MemorySinkState {
    contents: Vec<u8>,
    closed: bool,
    failing: bool,
}

/// An in-memory sink shared between the test and the task slot.
#[derive(Debug, Clone, Default)]
pub(crate) struct MemorySink {
    state: Arc<StdMutex<MemorySinkState>>,
}

impl MemorySink {
    /// A sink whose writes always fail.
    pub(crate) fn failing() -> Self {
        let sink = Self::default();
        sink.state.lock().unwrap().failing = true;
        sink
    }

    pub(crate) fn contents(&self) -> Vec<u8> {
        self.state.lock().unwrap().contents.clone()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }
}

impl FileSink for MemorySink {
    fn preallocate(&mut self, offset: u64, len: u64) -> io::Result<()> {
        let mut state = self.state.lock().unwrap();
        let end = (offset + len) as usize;
        if state.contents.len() < end {
            state.contents.resize(end, 0);
        }
        Ok(())
    }

    fn write_at(&mut self, offset: u64, buf: &[u8]) -> io::Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.failing || state.closed {
            return Err(io::Error::other("write refused"));
        }
        let start = offset as usize;
        let end = start + buf.len();
        if state.contents.len() < end {
            state.contents.resize(end, 0);
        }
        state.contents[start..end].copy_from_slice(buf);
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        self.state.lock().unwrap().closed = true;
        Ok(())
    }
}
