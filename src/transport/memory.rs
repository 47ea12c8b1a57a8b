//! In-process peers used by tests in place of a chat server.
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::TransportError;

use super::{Connection, ConnectionFactory, MessageSink, MessageSource};

#[derive(Debug, Clone)]
pub(crate) enum PeerBehavior {
    /// Reflects every message straight back.
    Echo,
    /// Accepts writes and never replies.
    Silent,
    /// Ignores writes and delivers the given payloads once.
    Scripted(Vec<String>),
}

pub(crate) struct MemoryConnector {
    behavior: PeerBehavior,
    /// Connection attempts with these indices fail.
    failing_attempts: Vec<usize>,
    attempts: AtomicUsize,
    connected: Arc<AtomicUsize>,
}

impl MemoryConnector {
    pub(crate) fn new(behavior: PeerBehavior) -> Self {
        Self {
            behavior,
            failing_attempts: Vec::new(),
            attempts: AtomicUsize::new(0),
            connected: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub(crate) fn failing_on(mut self, attempts: &[usize]) -> Self {
        self.failing_attempts = attempts.to_vec();
        self
    }

    pub(crate) fn connected(&self) -> usize {
        self.connected.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ConnectionFactory for MemoryConnector {
    async fn connect(&self) -> Result<Connection, TransportError> {
        let attempt = self.attempts.fetch_add(1, Ordering::Relaxed);
        if self.failing_attempts.contains(&attempt) {
            return Err(TransportError::TestFailure {
                message: "connection refused",
            });
        }
        self.connected.fetch_add(1, Ordering::Relaxed);

        let (tx, rx) = mpsc::unbounded_channel();
        let connection = match &self.behavior {
            PeerBehavior::Echo => Connection::new(
                Box::new(MemorySink { echo: Some(tx) }),
                Box::new(MemorySource { rx }),
            ),
            PeerBehavior::Silent => {
                // Keep the sender alive so the source never sees end-of-stream.
                Connection::new(
                    Box::new(MemorySink { echo: None }),
                    Box::new(HeldSource { _tx: tx, rx }),
                )
            }
            PeerBehavior::Scripted(payloads) => {
                for payload in payloads {
                    drop(tx.send(payload.clone()));
                }
                Connection::new(
                    Box::new(MemorySink { echo: None }),
                    Box::new(HeldSource { _tx: tx, rx }),
                )
            }
        };
        Ok(connection)
    }
}

struct MemorySink {
    echo: Option<mpsc::UnboundedSender<String>>,
}

#[async_trait]
impl MessageSink for MemorySink {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        if let Some(echo) = self.echo.as_ref() {
            echo.send(text).map_err(|_err| TransportError::Closed)?;
        }
        Ok(())
    }

    async fn close(&mut self) {
        self.echo = None;
    }
}

struct MemorySource {
    rx: mpsc::UnboundedReceiver<String>,
}

#[async_trait]
impl MessageSource for MemorySource {
    async fn next_text(&mut self) -> Result<String, TransportError> {
        self.rx.recv().await.ok_or(TransportError::Closed)
    }
}

struct HeldSource {
    _tx: mpsc::UnboundedSender<String>,
    rx: mpsc::UnboundedReceiver<String>,
}

#[async_trait]
impl MessageSource for HeldSource {
    async fn next_text(&mut self) -> Result<String, TransportError> {
        self.rx.recv().await.ok_or(TransportError::Closed)
    }
}
