use std::time::Duration;

/// Reconciler configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    /// Debounce window for remote settings writes, in milliseconds
    /// (default: `400`). Bursts of updates within the window coalesce
    /// into a single remote write.
    pub debounce_ms: u64,
    /// Buffer capacity of the user-notification channel (default: `64`).
    pub notification_capacity: usize,
}

impl ReconcilerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                    | Default |
    /// |----------------------------|---------|
    /// | `REFSYNC_DEBOUNCE_MS`      | `400`   |
    /// | `REFSYNC_NOTIFY_CAPACITY`  | `64`    |
    pub fn from_env() -> Self {
        let debounce_ms: u64 = std::env::var("REFSYNC_DEBOUNCE_MS")
            .unwrap_or_else(|_| "400".into())
            .parse()
            .expect("REFSYNC_DEBOUNCE_MS must be a valid u64");

        let notification_capacity: usize = std::env::var("REFSYNC_NOTIFY_CAPACITY")
            .unwrap_or_else(|_| "64".into())
            .parse()
            .expect("REFSYNC_NOTIFY_CAPACITY must be a valid usize");

        Self { debounce_ms, notification_capacity }
    }

    /// The debounce window as a [`Duration`].
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self { debounce_ms: 400, notification_capacity: 64 }
    }
}
