use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Failed to connect to '{url}': {source}")]
    Connect {
        url: String,
        #[source]
        source: Box<tokio_tungstenite::tungstenite::Error>,
    },
    #[error("Timed out connecting to '{url}' after {timeout_ms}ms.")]
    ConnectTimedOut { url: String, timeout_ms: u128 },
    #[error("Connection was never established.")]
    NotConnected,
    #[error("Connection closed.")]
    Closed,
    #[error("Write failed: {source}")]
    Write {
        #[source]
        source: Box<tokio_tungstenite::tungstenite::Error>,
    },
    #[error("Read failed: {source}")]
    Read {
        #[source]
        source: Box<tokio_tungstenite::tungstenite::Error>,
    },
    #[cfg(test)]
    #[error("Test transport failure: {message}")]
    TestFailure { message: &'static str },
}

#[derive(Debug, Error)]
pub enum TimestampError {
    #[error("Timestamp '{value}' is missing the zone abbreviation.")]
    MissingZone { value: String },
    #[error("Invalid timestamp '{value}': {source}")]
    Parse {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}
