use tokio::sync::broadcast;

/// Broadcast channel size for close notifications (single signal fan-out).
const SHUTDOWN_CHANNEL_CAPACITY: usize = 1;

pub type ShutdownSender = broadcast::Sender<()>;
pub type ShutdownReceiver = broadcast::Receiver<()>;

#[must_use]
pub fn shutdown_channel() -> (ShutdownSender, ShutdownReceiver) {
    broadcast::channel::<()>(SHUTDOWN_CHANNEL_CAPACITY)
}

/// Non-blocking check; a dropped sender counts as a shutdown.
pub fn is_signalled(shutdown_rx: &mut ShutdownReceiver) -> bool {
    match shutdown_rx.try_recv() {
        Ok(()) => true,
        Err(broadcast::error::TryRecvError::Closed) => true,
        Err(broadcast::error::TryRecvError::Lagged(_)) => true,
        Err(broadcast::error::TryRecvError::Empty) => false,
    }
}
