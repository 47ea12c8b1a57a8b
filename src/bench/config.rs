use std::time::Duration;

use crate::error::ValidationError;

/// Upper bound on concurrent clients a single run may open.
pub const MAX_CLIENTS: usize = 250;

/// Validated parameters of one benchmark run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    client_count: usize,
    duration: Duration,
    interval: Duration,
    collect_timeout: Option<Duration>,
}

impl RunConfig {
    /// Validates the three run parameters.
    ///
    /// # Errors
    ///
    /// Returns an error when any value is zero or the client count exceeds
    /// [`MAX_CLIENTS`].
    pub fn new(
        client_count: usize,
        duration_secs: u64,
        interval_millis: u64,
    ) -> Result<Self, ValidationError> {
        if client_count == 0 || duration_secs == 0 || interval_millis == 0 {
            return Err(ValidationError::ValueTooSmall { min: 1 });
        }
        if client_count > MAX_CLIENTS {
            return Err(ValidationError::TooManyClients {
                value: client_count,
                max: MAX_CLIENTS,
            });
        }
        Ok(Self {
            client_count,
            duration: Duration::from_secs(duration_secs),
            interval: Duration::from_millis(interval_millis),
            collect_timeout: None,
        })
    }

    /// Bounds how long the coordinator waits for worker results.
    #[must_use]
    pub const fn with_collect_timeout(mut self, collect_timeout: Option<Duration>) -> Self {
        self.collect_timeout = collect_timeout;
        self
    }

    #[cfg(test)]
    pub(crate) const fn with_timing(mut self, duration: Duration, interval: Duration) -> Self {
        self.duration = duration;
        self.interval = interval;
        self
    }

    #[must_use]
    pub const fn client_count(&self) -> usize {
        self.client_count
    }

    #[must_use]
    pub const fn duration(&self) -> Duration {
        self.duration
    }

    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    #[must_use]
    pub const fn collect_timeout(&self) -> Option<Duration> {
        self.collect_timeout
    }

    /// Messages a single client is expected to attempt over the run.
    #[must_use]
    pub fn expected_messages_per_client(&self) -> u64 {
        let interval_ms = u64::try_from(self.interval.as_millis()).unwrap_or(u64::MAX);
        let duration_ms = u64::try_from(self.duration.as_millis()).unwrap_or(u64::MAX);
        duration_ms.checked_div(interval_ms).unwrap_or(0)
    }

    #[must_use]
    pub fn duration_secs(&self) -> u64 {
        self.duration.as_secs()
    }

    #[must_use]
    pub fn interval_millis(&self) -> u64 {
        u64::try_from(self.interval.as_millis()).unwrap_or(u64::MAX)
    }
}
