//! Concurrent measurement pipeline.
//!
//! Each client gets three tasks sharing one split connection: a sender that
//! waits on the [`StartGate`] and writes a timestamp per interval, a receiver
//! that reads and measures until the connection closes, and a lifecycle task
//! that closes the connection once the run window is over. Their three
//! completion signals travel on separate channels and are merged by the
//! coordinator into a [`StatisticsTable`] it owns alone.
mod config;
mod gate;
mod lifecycle;
mod receiver;
mod results;
mod sender;


use std::collections::BTreeMap;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::error::{AppResult, ResultKind, RunError};
use crate::transport::{Connection, ConnectionFactory};

pub use config::{MAX_CLIENTS, RunConfig};
pub use gate::StartGate;
pub use results::{AggregateStatistic, ClientStatistic, PartialResult, StatisticsTable};

use lifecycle::run_lifecycle;
use receiver::run_receiver;
use results::{ResultReceivers, result_channels};
use sender::run_sender;

/// Parameters of the run echoed into the report.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RunSummary {
    pub client_count: usize,
    pub duration_secs: u64,
    pub interval_ms: u64,
}

impl From<&RunConfig> for RunSummary {
    fn from(config: &RunConfig) -> Self {
        Self {
            client_count: config.client_count(),
            duration_secs: config.duration_secs(),
            interval_ms: config.interval_millis(),
        }
    }
}

/// Final, read-only outcome of one run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run: RunSummary,
    pub clients: BTreeMap<usize, ClientStatistic>,
    pub aggregate: AggregateStatistic,
}

/// Runs every client to completion and merges their results.
///
/// Connection failures are logged and leave that client inert; they never
/// fail the run.
///
/// # Errors
///
/// Returns an error when a worker exits without reporting, a result is
/// malformed, or the optional collect timeout expires.
pub async fn run_benchmark<F>(config: &RunConfig, factory: &F) -> AppResult<RunReport>
where
    F: ConnectionFactory + ?Sized,
{
    let client_count = config.client_count();
    let gate = StartGate::new();
    let (senders, receivers) = result_channels(client_count);
    let mut workers: Vec<JoinHandle<()>> = Vec::with_capacity(client_count.saturating_mul(3));

    info!(
        "Starting {} clients for {}s at one message every {}ms (about {} messages each)",
        client_count,
        config.duration_secs(),
        config.interval_millis(),
        config.expected_messages_per_client()
    );

    for client_id in 0..client_count {
        let connection = match factory.connect().await {
            Ok(connection) => connection,
            Err(err) => {
                warn!("Client {} failed to connect: {}", client_id, err);
                Connection::unavailable()
            }
        };
        let (writer, reader, closer) = connection.split();
        workers.push(tokio::spawn(run_sender(
            client_id,
            writer,
            config.interval(),
            gate.clone(),
            senders.sent.clone(),
        )));
        workers.push(tokio::spawn(run_receiver(
            client_id,
            reader,
            senders.clone(),
        )));
        workers.push(tokio::spawn(run_lifecycle(
            client_id,
            closer,
            config.duration(),
        )));
        debug!("Client {} launched", client_id);
    }
    // Workers hold the only producers from here on.
    drop(senders);
    gate.release(client_count);

    let mut table = StatisticsTable::new(client_count);
    let outcome = match config.collect_timeout() {
        Some(limit) => {
            let bounded = timeout(limit, collect_results(receivers, &mut table)).await;
            bounded.unwrap_or_else(|_elapsed| {
                Err(RunError::CollectTimedOut {
                    timeout_ms: limit.as_millis(),
                    collected: table.collected(),
                    expected: table.expected(),
                })
            })
        }
        None => collect_results(receivers, &mut table).await,
    };

    if let Err(err) = outcome {
        for worker in &workers {
            worker.abort();
        }
        return Err(err.into());
    }
    for worker in workers {
        worker.await?;
    }

    let clients = table.finish();
    let aggregate = AggregateStatistic::from_clients(&clients);
    info!(
        "Run finished: {} sent, {} received",
        aggregate.total_sent, aggregate.total_received
    );
    Ok(RunReport {
        run: RunSummary::from(config),
        clients,
        aggregate,
    })
}

/// Drains exactly `client_count` results from each channel into `table`.
async fn collect_results(
    mut receivers: ResultReceivers,
    table: &mut StatisticsTable,
) -> Result<(), RunError> {
    drain_channel(&mut receivers.sent, ResultKind::Sent, table).await?;
    drain_channel(&mut receivers.received, ResultKind::Received, table).await?;
    drain_channel(&mut receivers.avg_delay, ResultKind::AvgDelay, table).await
}

async fn drain_channel(
    channel: &mut mpsc::Receiver<PartialResult>,
    kind: ResultKind,
    table: &mut StatisticsTable,
) -> Result<(), RunError> {
    let expected = table.client_count();
    for collected in 0..expected {
        let Some(result) = channel.recv().await else {
            return Err(RunError::ResultsIncomplete {
                kind,
                collected,
                expected,
            });
        };
        table.apply(result)?;
    }
    Ok(())
}
