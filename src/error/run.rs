use thiserror::Error;

/// Which of the three per-client completion channels a result travels on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultKind {
    Sent,
    Received,
    AvgDelay,
}

impl ResultKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ResultKind::Sent => "sent",
            ResultKind::Received => "received",
            ResultKind::AvgDelay => "avg-delay",
        }
    }
}

impl std::fmt::Display for ResultKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error(
        "The {kind} result channel closed after {collected} of {expected} results; a worker exited without reporting."
    )]
    ResultsIncomplete {
        kind: ResultKind,
        collected: usize,
        expected: usize,
    },
    #[error("Timed out after {timeout_ms}ms collecting results ({collected} of {expected}).")]
    CollectTimedOut {
        timeout_ms: u128,
        collected: usize,
        expected: usize,
    },
    #[error("Result for client {client_id} arrived on the {kind} channel but only {client_count} clients exist.")]
    UnknownClient {
        kind: ResultKind,
        client_id: usize,
        client_count: usize,
    },
    #[error("Client {client_id} reported its {kind} result twice.")]
    DuplicateResult { kind: ResultKind, client_id: usize },
    #[error("Failed to write report to '{path}': {source}")]
    WriteReport {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
