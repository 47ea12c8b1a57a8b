use std::time::Duration;

use tracing::debug;

use crate::transport::ConnectionCloser;

/// Closes the client's connection once the run duration has elapsed.
pub(crate) async fn run_lifecycle(client_id: usize, closer: ConnectionCloser, duration: Duration) {
    tokio::time::sleep(duration).await;
    debug!("Client {} run window over, closing connection", client_id);
    closer.close();
}
