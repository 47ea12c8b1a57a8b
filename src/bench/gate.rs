use std::sync::Arc;

use tokio::sync::Semaphore;

/// Released-once start gate shared by every sender of a run.
///
/// Senders park on [`StartGate::wait`] until the coordinator calls
/// [`StartGate::release`] with the number of clients, which lets every
/// waiter through in one step.
#[derive(Clone, Debug)]
pub struct StartGate {
    permits: Arc<Semaphore>,
}

impl Default for StartGate {
    fn default() -> Self {
        Self::new()
    }
}

impl StartGate {
    #[must_use]
    pub fn new() -> Self {
        Self {
            permits: Arc::new(Semaphore::new(0)),
        }
    }

    pub fn release(&self, waiters: usize) {
        self.permits.add_permits(waiters);
    }

    /// Tears the gate down without opening it; waiters return `false`.
    pub fn abandon(&self) {
        self.permits.close();
    }

    /// Returns `true` once released, `false` if the gate was abandoned.
    pub async fn wait(&self) -> bool {
        match self.permits.acquire().await {
            Ok(permit) => {
                permit.forget();
                true
            }
            Err(_closed) => false,
        }
    }
}
