use std::time::Duration;

/// Tunables for a [`crate::ComponentContext`].
///
/// Mirrors the crate's own preference for a small, non-`serde` `Config`
/// struct with a `Default` impl rather than a configuration file format —
/// the container has nothing to persist and nothing to deserialize.
#[derive(Debug, Clone)]
pub struct ComponentContextConfig {
    /// How often the progress reporter logs the set of components still
    /// under construction.
    pub progress_interval: Duration,
    /// Upper bound on how long the driver waits for an individual
    /// lifecycle-phase task to be joined before logging a diagnostic.
    /// This is a diagnostics-only escape hatch: it never cancels the
    /// task, it only surfaces a warning that something is taking long.
    pub phase_join_timeout: Duration,
}

impl Default for ComponentContextConfig {
    fn default() -> Self {
        Self {
            progress_interval: Duration::from_secs(10),
            phase_join_timeout: Duration::from_secs(30),
        }
    }
}
