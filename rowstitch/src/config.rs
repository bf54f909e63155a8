//! Stream configuration.
use std::{env::var, time::Duration};

use crate::retry::RetryPolicy;

/// Stream configuration builder.
#[derive(Clone, Debug)]
pub struct Options {
    pub(crate) max_queued: usize,
    pub(crate) max_resume_retries: u32,
    pub(crate) initial_backoff: Duration,
    pub(crate) max_backoff: Duration,
    pub(crate) emit_responses: bool,
    pub(crate) retry: RetryPolicy,
}

impl Options {
    /// Retrieve configuration from environment variable.
    ///
    /// It reads:
    /// - `ROWSTITCH_MAX_QUEUED`
    /// - `ROWSTITCH_MAX_RESUME_RETRIES`
    ///
    /// Missing or unparsable variables fallback to default value.
    pub fn from_env() -> Options {
        macro_rules! env {
            ($name:literal,$def:expr) => {
                var($name).ok().and_then(|e| e.parse().ok()).unwrap_or($def)
            };
        }

        let defaults = Self::default();
        Self {
            max_queued: env!("ROWSTITCH_MAX_QUEUED", defaults.max_queued),
            max_resume_retries: env!("ROWSTITCH_MAX_RESUME_RETRIES", defaults.max_resume_retries),
            ..defaults
        }
    }

    /// Set the number of fragments buffered without a checkpoint.
    ///
    /// A retryable error seen past this distance from the last checkpoint fails the stream.
    pub fn max_queued(mut self, value: usize) -> Self {
        self.max_queued = value;
        self
    }

    /// Set how many times a full consumer is probed before giving up.
    pub fn max_resume_retries(mut self, value: u32) -> Self {
        self.max_resume_retries = value;
        self
    }

    /// Set the first and the largest delay between consumer probes.
    pub fn backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_backoff = initial;
        self.max_backoff = max;
        self
    }

    /// Yield an [`Event::Response`][crate::stream::Event::Response] for every fragment.
    pub fn emit_responses(mut self, value: bool) -> Self {
        self.emit_responses = value;
        self
    }

    /// Set the retry classification.
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    /// Get retry classification.
    pub fn policy(&self) -> &RetryPolicy {
        &self.retry
    }
}

impl Default for Options {
    fn default() -> Self {
        Self {
            max_queued: 10,
            max_resume_retries: 20,
            initial_backoff: Duration::from_millis(2),
            max_backoff: Duration::from_millis(1024),
            emit_responses: false,
            retry: RetryPolicy::default(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::Options;

    #[test]
    fn from_env_fallback() {
        // SAFETY: no other test in this crate reads or writes these variables
        unsafe {
            std::env::set_var("ROWSTITCH_MAX_QUEUED", "ten");
            std::env::set_var("ROWSTITCH_MAX_RESUME_RETRIES", "3");
        }

        let options = Options::from_env();
        assert_eq!(options.max_queued, 10);
        assert_eq!(options.max_resume_retries, 3);

        unsafe {
            std::env::remove_var("ROWSTITCH_MAX_QUEUED");
            std::env::remove_var("ROWSTITCH_MAX_RESUME_RETRIES");
        }
    }
}
