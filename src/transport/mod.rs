//! Message-oriented connections used by the benchmark workers.
//!
//! A [`Connection`] is split into three parts so that each client's workers
//! own exactly what they touch: the sender gets the [`ConnectionWriter`], the
//! receiver gets the [`ConnectionReader`] and the lifecycle controller gets the
//! [`ConnectionCloser`]. Closing wakes a pending read and fails every later
//! read or write.
mod websocket;

#[cfg(test)]
pub(crate) mod memory;

use async_trait::async_trait;

use crate::error::TransportError;
use crate::shutdown::{ShutdownReceiver, ShutdownSender, is_signalled, shutdown_channel};

pub use websocket::{DEFAULT_URL, WebSocketConnector, resolve_websocket_url};

/// Write half of a transport.
#[async_trait]
pub trait MessageSink: Send {
    /// Writes one text message.
    ///
    /// # Errors
    ///
    /// Returns an error when the peer is gone or the write fails.
    async fn send_text(&mut self, text: String) -> Result<(), TransportError>;

    /// Best-effort close of the underlying transport.
    async fn close(&mut self);
}

/// Read half of a transport.
#[async_trait]
pub trait MessageSource: Send {
    /// Waits for the next whole text message.
    ///
    /// # Errors
    ///
    /// Returns an error once the peer closes the transport or a read fails.
    async fn next_text(&mut self) -> Result<String, TransportError>;
}

/// Establishes one connection to the benchmarked endpoint.
#[async_trait]
pub trait ConnectionFactory: Send + Sync {
    /// Opens a new connection. No retry is attempted.
    ///
    /// # Errors
    ///
    /// Returns an error when the endpoint cannot be reached or the handshake fails.
    async fn connect(&self) -> Result<Connection, TransportError>;
}

pub struct Connection {
    sink: Option<Box<dyn MessageSink>>,
    source: Option<Box<dyn MessageSource>>,
}

impl Connection {
    #[must_use]
    pub fn new(sink: Box<dyn MessageSink>, source: Box<dyn MessageSource>) -> Self {
        Self {
            sink: Some(sink),
            source: Some(source),
        }
    }

    /// Stand-in for a connection that could not be established. Every
    /// operation on it fails immediately.
    #[must_use]
    pub const fn unavailable() -> Self {
        Self {
            sink: None,
            source: None,
        }
    }

    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.sink.is_some() && self.source.is_some()
    }

    #[must_use]
    pub fn split(self) -> (ConnectionWriter, ConnectionReader, ConnectionCloser) {
        let (close_tx, writer_rx) = shutdown_channel();
        let reader_rx = close_tx.subscribe();
        (
            ConnectionWriter {
                sink: self.sink,
                close_rx: writer_rx,
                closed: false,
            },
            ConnectionReader {
                source: self.source,
                close_rx: reader_rx,
                closed: false,
            },
            ConnectionCloser { close_tx },
        )
    }
}

pub struct ConnectionWriter {
    sink: Option<Box<dyn MessageSink>>,
    close_rx: ShutdownReceiver,
    closed: bool,
}

impl ConnectionWriter {
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.sink.is_some()
    }

    /// Writes one text message unless the connection has been closed.
    ///
    /// # Errors
    ///
    /// Returns `NotConnected` for an unavailable connection, `Closed` once the
    /// closer fired, or the sink's own write error.
    pub async fn send(&mut self, text: String) -> Result<(), TransportError> {
        let Some(sink) = self.sink.as_mut() else {
            return Err(TransportError::NotConnected);
        };
        if !self.closed && is_signalled(&mut self.close_rx) {
            self.closed = true;
            sink.close().await;
        }
        if self.closed {
            return Err(TransportError::Closed);
        }

        let outcome = tokio::select! {
            biased;
            _ = self.close_rx.recv() => None,
            result = sink.send_text(text) => Some(result),
        };
        match outcome {
            Some(result) => result,
            None => {
                self.closed = true;
                sink.close().await;
                Err(TransportError::Closed)
            }
        }
    }
}

pub struct ConnectionReader {
    source: Option<Box<dyn MessageSource>>,
    close_rx: ShutdownReceiver,
    closed: bool,
}

impl ConnectionReader {
    /// Waits for the next message or for the connection to be closed.
    ///
    /// # Errors
    ///
    /// Returns `NotConnected` for an unavailable connection, `Closed` once the
    /// closer fired, or the source's own read error.
    pub async fn receive(&mut self) -> Result<String, TransportError> {
        let Some(source) = self.source.as_mut() else {
            return Err(TransportError::NotConnected);
        };
        if self.closed {
            return Err(TransportError::Closed);
        }

        tokio::select! {
            biased;
            _ = self.close_rx.recv() => {
                self.closed = true;
                Err(TransportError::Closed)
            }
            message = source.next_text() => message,
        }
    }
}

#[derive(Clone)]
pub struct ConnectionCloser {
    close_tx: ShutdownSender,
}

impl ConnectionCloser {
    pub fn close(&self) {
        drop(self.close_tx.send(()));
    }
}
