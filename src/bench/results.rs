//! Per-client completion signals and the statistics they are merged into.
use std::collections::BTreeMap;

use tokio::sync::mpsc;

use crate::error::{ResultKind, RunError};

/// Scale used for two-decimal fixed-point percentages.
const PERCENT_X100_SCALE: u128 = 10_000;

/// One of the three completion signals a client produces exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartialResult {
    Sent { client_id: usize, count: u64 },
    Received { client_id: usize, count: u64 },
    AvgDelay { client_id: usize, nanos: i64 },
}

impl PartialResult {
    #[must_use]
    pub const fn client_id(&self) -> usize {
        match self {
            PartialResult::Sent { client_id, .. }
            | PartialResult::Received { client_id, .. }
            | PartialResult::AvgDelay { client_id, .. } => *client_id,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> ResultKind {
        match self {
            PartialResult::Sent { .. } => ResultKind::Sent,
            PartialResult::Received { .. } => ResultKind::Received,
            PartialResult::AvgDelay { .. } => ResultKind::AvgDelay,
        }
    }
}

/// Producer ends of the three completion channels; cloned into every client.
#[derive(Clone, Debug)]
pub struct ResultSenders {
    pub sent: mpsc::Sender<PartialResult>,
    pub received: mpsc::Sender<PartialResult>,
    pub avg_delay: mpsc::Sender<PartialResult>,
}

/// Consumer ends, owned by the coordinator.
#[derive(Debug)]
pub struct ResultReceivers {
    pub sent: mpsc::Receiver<PartialResult>,
    pub received: mpsc::Receiver<PartialResult>,
    pub avg_delay: mpsc::Receiver<PartialResult>,
}

/// Creates the three completion channels. With `capacity >= client_count`
/// no worker ever waits on the coordinator to emit its result.
#[must_use]
pub fn result_channels(capacity: usize) -> (ResultSenders, ResultReceivers) {
    let capacity = capacity.max(1);
    let (sent_tx, sent_rx) = mpsc::channel(capacity);
    let (received_tx, received_rx) = mpsc::channel(capacity);
    let (avg_tx, avg_rx) = mpsc::channel(capacity);
    (
        ResultSenders {
            sent: sent_tx,
            received: received_tx,
            avg_delay: avg_tx,
        },
        ResultReceivers {
            sent: sent_rx,
            received: received_rx,
            avg_delay: avg_rx,
        },
    )
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClientStatistic {
    pub sent: u64,
    pub received: u64,
    pub avg_delay_nanos: i64,
}

#[derive(Debug, Clone, Copy, Default)]
struct PendingStatistic {
    sent: Option<u64>,
    received: Option<u64>,
    avg_delay_nanos: Option<i64>,
}

impl PendingStatistic {
    fn filled(&self) -> usize {
        usize::from(self.sent.is_some())
            .saturating_add(usize::from(self.received.is_some()))
            .saturating_add(usize::from(self.avg_delay_nanos.is_some()))
    }
}

/// Aggregation table owned by the coordinator for the length of one run.
#[derive(Debug)]
pub struct StatisticsTable {
    client_count: usize,
    entries: BTreeMap<usize, PendingStatistic>,
}

impl StatisticsTable {
    #[must_use]
    pub const fn new(client_count: usize) -> Self {
        Self {
            client_count,
            entries: BTreeMap::new(),
        }
    }

    /// Merges one partial result into its client's record.
    ///
    /// # Errors
    ///
    /// Returns an error for an out-of-range client id or a field that was
    /// already set.
    pub fn apply(&mut self, result: PartialResult) -> Result<(), RunError> {
        let client_id = result.client_id();
        let kind = result.kind();
        if client_id >= self.client_count {
            return Err(RunError::UnknownClient {
                kind,
                client_id,
                client_count: self.client_count,
            });
        }

        let entry = self.entries.entry(client_id).or_default();
        let duplicate = match result {
            PartialResult::Sent { count, .. } => entry.sent.replace(count).is_some(),
            PartialResult::Received { count, .. } => entry.received.replace(count).is_some(),
            PartialResult::AvgDelay { nanos, .. } => {
                entry.avg_delay_nanos.replace(nanos).is_some()
            }
        };
        if duplicate {
            return Err(RunError::DuplicateResult { kind, client_id });
        }
        Ok(())
    }

    /// Number of fields set so far across all clients.
    #[must_use]
    pub fn collected(&self) -> usize {
        self.entries
            .values()
            .map(PendingStatistic::filled)
            .fold(0_usize, usize::saturating_add)
    }

    #[must_use]
    pub const fn client_count(&self) -> usize {
        self.client_count
    }

    #[must_use]
    pub const fn expected(&self) -> usize {
        self.client_count.saturating_mul(3)
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.collected() == self.expected()
    }

    /// Final per-client records. Every client id in range gets an entry; a
    /// field that never arrived reads as zero.
    #[must_use]
    pub fn finish(self) -> BTreeMap<usize, ClientStatistic> {
        let mut entries = self.entries;
        (0..self.client_count)
            .map(|client_id| {
                let pending = entries.remove(&client_id).unwrap_or_default();
                (
                    client_id,
                    ClientStatistic {
                        sent: pending.sent.unwrap_or(0),
                        received: pending.received.unwrap_or(0),
                        avg_delay_nanos: pending.avg_delay_nanos.unwrap_or(0),
                    },
                )
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregateStatistic {
    pub total_sent: u64,
    pub total_received: u64,
    /// Mean of the per-client average delays, over every client.
    pub avg_delay_nanos: i64,
    /// `received / client_count / sent` as a percentage scaled by 100.
    /// Zero when nothing was sent.
    pub loss_ratio_x100: u64,
}

impl AggregateStatistic {
    #[must_use]
    pub fn from_clients(clients: &BTreeMap<usize, ClientStatistic>) -> Self {
        let client_count = clients.len();
        let total_sent = clients
            .values()
            .fold(0_u64, |acc, stat| acc.saturating_add(stat.sent));
        let total_received = clients
            .values()
            .fold(0_u64, |acc, stat| acc.saturating_add(stat.received));
        let delay_sum = clients.values().fold(0_i128, |acc, stat| {
            acc.saturating_add(i128::from(stat.avg_delay_nanos))
        });

        let avg_delay_nanos = i128::try_from(client_count)
            .ok()
            .and_then(|count| delay_sum.checked_div(count))
            .and_then(|avg| i64::try_from(avg).ok())
            .unwrap_or(0);

        let divisor = u128::try_from(client_count)
            .unwrap_or(u128::MAX)
            .saturating_mul(u128::from(total_sent));
        let loss_ratio_x100 = u128::from(total_received)
            .saturating_mul(PERCENT_X100_SCALE)
            .checked_div(divisor)
            .map_or(0, |ratio| u64::try_from(ratio).unwrap_or(u64::MAX));

        Self {
            total_sent,
            total_received,
            avg_delay_nanos,
            loss_ratio_x100,
        }
    }
}
