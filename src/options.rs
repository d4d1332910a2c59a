//! Setup options with fluent construction

use std::time::Duration;

use crate::worker::WorkerKind;

/// Timeout applied when the caller does not bound the setup duration.
pub const DEFAULT_SETUP_TIMEOUT: Duration = Duration::from_secs(120);

/// Options controlling worker selection and setup.
#[derive(Debug, Clone)]
pub struct SetupOptions {
    /// Resource locator of the worker script.
    pub url: String,
    /// Registration scope for installable workers, worker name otherwise.
    pub scope_or_name: Option<String>,
    /// Acceptable execution models, in preference order.
    pub accepted: Vec<WorkerKind>,
    /// Bound on the time the whole setup may take.
    pub setup_timeout: Duration,
}

impl SetupOptions {
    /// Options accepting every worker kind with the default timeout.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            scope_or_name: None,
            accepted: WorkerKind::PREFERENCE.to_vec(),
            setup_timeout: DEFAULT_SETUP_TIMEOUT,
        }
    }

    /// Set the registration scope (installable) or worker name (others).
    pub fn scope_or_name(mut self, value: impl Into<String>) -> Self {
        self.scope_or_name = Some(value.into());
        self
    }

    /// Restrict the acceptable worker kinds, in preference order.
    ///
    /// An empty list keeps the default preference order.
    pub fn accepted(mut self, kinds: impl IntoIterator<Item = WorkerKind>) -> Self {
        let kinds: Vec<WorkerKind> = kinds.into_iter().collect();
        if !kinds.is_empty() {
            self.accepted = kinds;
        }
        self
    }

    /// Bound the setup duration. A zero duration falls back to the default.
    pub fn setup_timeout(mut self, timeout: Duration) -> Self {
        self.setup_timeout = if timeout.is_zero() {
            DEFAULT_SETUP_TIMEOUT
        } else {
            timeout
        };
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_accept_every_kind() {
        let options = SetupOptions::new("worker.js");
        assert_eq!(options.accepted, WorkerKind::PREFERENCE.to_vec());
        assert_eq!(options.setup_timeout, DEFAULT_SETUP_TIMEOUT);
        assert!(options.scope_or_name.is_none());
    }

    #[test]
    fn zero_timeout_falls_back_to_default() {
        let options = SetupOptions::new("worker.js").setup_timeout(Duration::ZERO);
        assert_eq!(options.setup_timeout, DEFAULT_SETUP_TIMEOUT);
    }

    #[test]
    fn empty_accepted_list_keeps_defaults() {
        let options = SetupOptions::new("worker.js").accepted([]);
        assert_eq!(options.accepted, WorkerKind::PREFERENCE.to_vec());

        let options = SetupOptions::new("worker.js").accepted([WorkerKind::Dedicated]);
        assert_eq!(options.accepted, vec![WorkerKind::Dedicated]);
    }
}
