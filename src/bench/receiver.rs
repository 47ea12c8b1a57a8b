use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::TimestampError;
use crate::timestamp::{delay_nanos, parse_timestamp, split_entries};
use crate::transport::ConnectionReader;

use super::results::{PartialResult, ResultSenders};

/// Running delay total of one receiver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct DelayTally {
    count: u64,
    total_nanos: i128,
}

impl DelayTally {
    /// Records every entry of `payload` up to the first one that fails to
    /// parse. Entries before the bad one stay counted.
    pub(crate) fn record_payload(
        &mut self,
        payload: &str,
        now: DateTime<Utc>,
    ) -> Result<(), TimestampError> {
        for entry in split_entries(payload) {
            let sent_at = parse_timestamp(entry)?;
            self.count = self.count.saturating_add(1);
            self.total_nanos = self
                .total_nanos
                .saturating_add(i128::from(delay_nanos(sent_at, now)));
        }
        Ok(())
    }

    pub(crate) const fn count(&self) -> u64 {
        self.count
    }

    /// Mean delay in nanoseconds; `0` when nothing was recorded.
    pub(crate) fn average_nanos(&self) -> i64 {
        self.total_nanos
            .checked_div(i128::from(self.count))
            .and_then(|avg| i64::try_from(avg).ok())
            .unwrap_or(0)
    }
}

/// Reads until the connection closes or fails, then reports the received
/// count and the mean delay.
pub(crate) async fn run_receiver(
    client_id: usize,
    mut reader: ConnectionReader,
    results: ResultSenders,
) {
    let mut tally = DelayTally::default();
    loop {
        let payload = match reader.receive().await {
            Ok(payload) => payload,
            Err(err) => {
                debug!("Client {} stopped receiving: {}", client_id, err);
                break;
            }
        };
        if let Err(err) = tally.record_payload(&payload, Utc::now()) {
            warn!("Client {} skipped rest of message: {}", client_id, err);
        }
    }

    emit(
        &results.received,
        PartialResult::Received {
            client_id,
            count: tally.count(),
        },
    )
    .await;
    emit(
        &results.avg_delay,
        PartialResult::AvgDelay {
            client_id,
            nanos: tally.average_nanos(),
        },
    )
    .await;
}

async fn emit(channel: &mpsc::Sender<PartialResult>, result: PartialResult) {
    if channel.send(result).await.is_err() {
        debug!(
            "Client {} {} result dropped: coordinator gone",
            result.client_id(),
            result.kind()
        );
    }
}
