use crate::error::{Error, Result};
use std::time::Duration;

const MIN_STACK_SIZE: usize = 64 * 1024;

/// Floating-point width the worker computes in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Precision {
    Single,
    #[default]
    Double,
}

/// What `stop()` does with tasks that are still queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopPolicy {
    /// Finish the task in hand, mark the rest abandoned. Fetches for
    /// abandoned ids never complete.
    #[default]
    Abandon,
    /// Run every queued task before the worker exits.
    Drain,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub thread_name: String,
    pub stack_size: Option<usize>,
    pub precision: Precision,
    pub stop_policy: StopPolicy,
    pub fetch_timeout: Option<Duration>,
    pub max_pending: Option<usize>,
    pub enable_telemetry: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            thread_name: "sutra-worker".to_string(),
            stack_size: Some(2 * 1024 * 1024),
            precision: Precision::default(),
            stop_policy: StopPolicy::default(),
            fetch_timeout: None,
            max_pending: None,
            enable_telemetry: true,
        }
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    pub fn validate(&self) -> Result<()> {
        if self.thread_name.trim().is_empty() {
            return Err(Error::config("thread_name must not be empty"));
        }

        if let Some(size) = self.stack_size {
            if size < MIN_STACK_SIZE {
                return Err(Error::config(format!(
                    "stack_size must be >= {} bytes",
                    MIN_STACK_SIZE
                )));
            }
        }

        if self.fetch_timeout == Some(Duration::ZERO) {
            return Err(Error::config("fetch_timeout must be > 0"));
        }

        if self.max_pending == Some(0) {
            return Err(Error::config("max_pending must be > 0"));
        }

        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn thread_name<S: Into<String>>(mut self, name: S) -> Self {
        self.config.thread_name = name.into();
        self
    }

    pub fn stack_size(mut self, size: usize) -> Self {
        self.config.stack_size = Some(size);
        self
    }

    pub fn precision(mut self, precision: Precision) -> Self {
        self.config.precision = precision;
        self
    }

    pub fn stop_policy(mut self, policy: StopPolicy) -> Self {
        self.config.stop_policy = policy;
        self
    }

    pub fn fetch_timeout(mut self, timeout: Duration) -> Self {
        self.config.fetch_timeout = Some(timeout);
        self
    }

    pub fn max_pending(mut self, capacity: usize) -> Self {
        self.config.max_pending = Some(capacity);
        self
    }

    pub fn enable_telemetry(mut self, enable: bool) -> Self {
        self.config.enable_telemetry = enable;
        self
    }

    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.precision, Precision::Double);
        assert_eq!(config.stop_policy, StopPolicy::Abandon);
        assert!(config.fetch_timeout.is_none());
    }

    #[test]
    fn test_builder_overrides() {
        let config = Config::builder()
            .thread_name("calc")
            .precision(Precision::Single)
            .stop_policy(StopPolicy::Drain)
            .fetch_timeout(Duration::from_millis(250))
            .max_pending(8)
            .enable_telemetry(false)
            .build()
            .unwrap();

        assert_eq!(config.thread_name, "calc");
        assert_eq!(config.precision, Precision::Single);
        assert_eq!(config.stop_policy, StopPolicy::Drain);
        assert_eq!(config.fetch_timeout, Some(Duration::from_millis(250)));
        assert_eq!(config.max_pending, Some(8));
        assert!(!config.enable_telemetry);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(Config::builder().thread_name("  ").build().is_err());
        assert!(Config::builder().stack_size(1024).build().is_err());
        assert!(Config::builder().fetch_timeout(Duration::ZERO).build().is_err());
        assert!(Config::builder().max_pending(0).build().is_err());
    }
}
