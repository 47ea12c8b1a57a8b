use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::debug;

use crate::timestamp::format_timestamp;
use crate::transport::ConnectionWriter;

use super::gate::StartGate;
use super::results::PartialResult;

/// Streams one timestamp per interval until the connection refuses a write,
/// then reports how many writes were attempted.
pub(crate) async fn run_sender(
    client_id: usize,
    mut writer: ConnectionWriter,
    interval: Duration,
    gate: StartGate,
    results: mpsc::Sender<PartialResult>,
) {
    let attempts = if !gate.wait().await {
        debug!("Client {} start gate abandoned", client_id);
        0
    } else if !writer.is_connected() {
        debug!("Client {} has no connection, sending nothing", client_id);
        0
    } else {
        send_until_closed(client_id, &mut writer, interval).await
    };

    if results
        .send(PartialResult::Sent {
            client_id,
            count: attempts,
        })
        .await
        .is_err()
    {
        debug!("Client {} sent count dropped: coordinator gone", client_id);
    }
}

async fn send_until_closed(
    client_id: usize,
    writer: &mut ConnectionWriter,
    interval: Duration,
) -> u64 {
    let mut attempts: u64 = 0;
    loop {
        attempts = attempts.saturating_add(1);
        tokio::time::sleep(interval).await;
        let payload = format_timestamp(Utc::now());
        if let Err(err) = writer.send(payload).await {
            debug!(
                "Client {} stopped sending after {} attempts: {}",
                client_id, attempts, err
            );
            return attempts;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::memory::{MemoryConnector, PeerBehavior};
    use crate::transport::{Connection, ConnectionFactory};
    use tokio::time::timeout;

    const TEST_TIMEOUT: Duration = Duration::from_secs(2);

    fn run_async_test<F>(future: F) -> Result<(), String>
    where
        F: std::future::Future<Output = Result<(), String>>,
    {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|err| format!("Failed to build runtime: {}", err))?;
        runtime.block_on(future)
    }

    #[test]
    fn inert_connection_reports_zero_after_gate() -> Result<(), String> {
        run_async_test(async {
            let (writer, _reader, _closer) = Connection::unavailable().split();
            let (tx, mut rx) = mpsc::channel(1);
            let gate = StartGate::new();
            let task = tokio::spawn(run_sender(
                7,
                writer,
                Duration::from_millis(5),
                gate.clone(),
                tx,
            ));
            gate.release(1);
            timeout(TEST_TIMEOUT, task)
                .await
                .map_err(|_err| "Sender did not finish".to_owned())?
                .map_err(|err| format!("Sender panicked: {}", err))?;
            match rx.recv().await {
                Some(PartialResult::Sent {
                    client_id: 7,
                    count: 0,
                }) => Ok(()),
                other => Err(format!("Unexpected result: {:?}", other)),
            }
        })
    }

    #[test]
    fn abandoned_gate_reports_zero() -> Result<(), String> {
        run_async_test(async {
            let connection = MemoryConnector::new(PeerBehavior::Silent)
                .connect()
                .await
                .map_err(|err| err.to_string())?;
            let (writer, _reader, _closer) = connection.split();
            let (tx, mut rx) = mpsc::channel(1);
            let gate = StartGate::new();
            gate.abandon();
            run_sender(0, writer, Duration::from_millis(5), gate, tx).await;
            match rx.recv().await {
                Some(PartialResult::Sent { count: 0, .. }) => Ok(()),
                other => Err(format!("Unexpected result: {:?}", other)),
            }
        })
    }

    #[test]
    fn failed_final_write_is_counted() -> Result<(), String> {
        run_async_test(async {
            let connection = MemoryConnector::new(PeerBehavior::Silent)
                .connect()
                .await
                .map_err(|err| err.to_string())?;
            let (writer, _reader, closer) = connection.split();
            let (tx, mut rx) = mpsc::channel(1);
            let gate = StartGate::new();
            gate.release(1);
            // Closed before the first tick: one attempt, and it fails.
            closer.close();
            run_sender(0, writer, Duration::from_millis(5), gate, tx).await;
            match rx.recv().await {
                Some(PartialResult::Sent { count: 1, .. }) => Ok(()),
                other => Err(format!("Unexpected result: {:?}", other)),
            }
        })
    }
}
