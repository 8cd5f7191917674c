//! Engine configuration types.

use super::EngineError;

/// Default capacity of the engine's local ring (same-thread traffic).
pub const DEFAULT_LOCAL_CAPACITY: usize = 4096;

/// Default bound on events queued for the engine by other threads.
pub const DEFAULT_REMOTE_CAPACITY: usize = 65_536;

/// Default capacity of each own-thread receiver's inbox.
pub const DEFAULT_INBOX_CAPACITY: usize = 4096;

/// Default number of empty polls before the hybrid strategy blocks.
pub const DEFAULT_HYBRID_SPIN_COUNT: u32 = 1000;

/// Default prefix for worker thread names.
pub const DEFAULT_THREAD_NAME_PREFIX: &str = "switchyard";

/// How [`Engine::run`](crate::Engine::run) drives the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PollMode {
    /// Busy-poll without giving up the CPU.
    Spin,
    /// Yield the time slice whenever the queue is empty.
    Yield,
    /// Block until an event arrives.
    Wait,
    /// Spin for a while, then block once.
    #[default]
    Hybrid,
}

/// Configuration for an [`Engine`](crate::Engine).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Local ring capacity (rounded up to a power of 2).
    pub local_capacity: usize,

    /// Maximum number of events other threads may queue for the engine.
    pub remote_capacity: usize,

    /// Inbox capacity for own-thread receivers without their own setting.
    pub inbox_capacity: usize,

    /// Empty polls before the hybrid strategy falls back to a blocking pop.
    pub hybrid_spin_count: u32,

    /// Strategy used by [`Engine::run`](crate::Engine::run).
    pub poll_mode: PollMode,

    /// Worker threads are named `{prefix}-{receiver}`.
    pub thread_name_prefix: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            local_capacity: DEFAULT_LOCAL_CAPACITY,
            remote_capacity: DEFAULT_REMOTE_CAPACITY,
            inbox_capacity: DEFAULT_INBOX_CAPACITY,
            hybrid_spin_count: DEFAULT_HYBRID_SPIN_COUNT,
            poll_mode: PollMode::default(),
            thread_name_prefix: DEFAULT_THREAD_NAME_PREFIX.to_string(),
        }
    }
}

impl EngineConfig {
    /// Creates a builder for custom configuration.
    #[must_use]
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Checks that every capacity is usable.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConfig`] if a capacity is zero.
    pub fn validate(&self) -> Result<(), EngineError> {
        let capacities = [
            ("local_capacity", self.local_capacity),
            ("remote_capacity", self.remote_capacity),
            ("inbox_capacity", self.inbox_capacity),
        ];
        for (name, value) in capacities {
            if value == 0 {
                return Err(EngineError::InvalidConfig(format!("{name} must be > 0")));
            }
        }
        Ok(())
    }
}

/// Builder for [`EngineConfig`].
#[derive(Debug, Default)]
pub struct EngineConfigBuilder {
    local_capacity: Option<usize>,
    remote_capacity: Option<usize>,
    inbox_capacity: Option<usize>,
    hybrid_spin_count: Option<u32>,
    poll_mode: Option<PollMode>,
    thread_name_prefix: Option<String>,
}

impl EngineConfigBuilder {
    /// Sets the local ring capacity.
    #[must_use]
    pub fn local_capacity(mut self, capacity: usize) -> Self {
        self.local_capacity = Some(capacity);
        self
    }

    /// Sets the bound on events queued by other threads.
    #[must_use]
    pub fn remote_capacity(mut self, capacity: usize) -> Self {
        self.remote_capacity = Some(capacity);
        self
    }

    /// Sets the default inbox capacity.
    #[must_use]
    pub fn inbox_capacity(mut self, capacity: usize) -> Self {
        self.inbox_capacity = Some(capacity);
        self
    }

    /// Sets the hybrid strategy's spin count.
    #[must_use]
    pub fn hybrid_spin_count(mut self, count: u32) -> Self {
        self.hybrid_spin_count = Some(count);
        self
    }

    /// Sets the strategy used by [`Engine::run`](crate::Engine::run).
    #[must_use]
    pub fn poll_mode(mut self, mode: PollMode) -> Self {
        self.poll_mode = Some(mode);
        self
    }

    /// Sets the worker thread name prefix.
    #[must_use]
    pub fn thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = Some(prefix.into());
        self
    }

    /// Builds and validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConfig`] if a capacity is zero.
    pub fn build(self) -> Result<EngineConfig, EngineError> {
        let config = EngineConfig {
            local_capacity: self.local_capacity.unwrap_or(DEFAULT_LOCAL_CAPACITY),
            remote_capacity: self.remote_capacity.unwrap_or(DEFAULT_REMOTE_CAPACITY),
            inbox_capacity: self.inbox_capacity.unwrap_or(DEFAULT_INBOX_CAPACITY),
            hybrid_spin_count: self.hybrid_spin_count.unwrap_or(DEFAULT_HYBRID_SPIN_COUNT),
            poll_mode: self.poll_mode.unwrap_or_default(),
            thread_name_prefix: self
                .thread_name_prefix
                .unwrap_or_else(|| DEFAULT_THREAD_NAME_PREFIX.to_string()),
        };
        config.validate()?;
        Ok(config)
    }
}

/// Per-receiver settings for own-thread receivers.
///
/// Ignored for same-thread receivers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReceiverOptions {
    /// Inbox capacity; falls back to [`EngineConfig::inbox_capacity`].
    pub inbox_capacity: Option<usize>,

    /// CPU to pin the worker to (Linux only; ignored elsewhere).
    pub cpu_affinity: Option<usize>,
}

impl ReceiverOptions {
    /// Sets the inbox capacity.
    #[must_use]
    pub fn inbox_capacity(mut self, capacity: usize) -> Self {
        self.inbox_capacity = Some(capacity);
        self
    }

    /// Pins the worker thread to `cpu_id`.
    #[must_use]
    pub fn cpu_affinity(mut self, cpu_id: usize) -> Self {
        self.cpu_affinity = Some(cpu_id);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.local_capacity, DEFAULT_LOCAL_CAPACITY);
        assert_eq!(config.remote_capacity, DEFAULT_REMOTE_CAPACITY);
        assert_eq!(config.inbox_capacity, DEFAULT_INBOX_CAPACITY);
        assert_eq!(config.hybrid_spin_count, 1000);
        assert_eq!(config.poll_mode, PollMode::Hybrid);
        assert_eq!(config.thread_name_prefix, "switchyard");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = EngineConfig::builder()
            .local_capacity(64)
            .inbox_capacity(32)
            .poll_mode(PollMode::Spin)
            .thread_name_prefix("test")
            .build()
            .unwrap();

        assert_eq!(config.local_capacity, 64);
        assert_eq!(config.inbox_capacity, 32);
        assert_eq!(config.remote_capacity, DEFAULT_REMOTE_CAPACITY);
        assert_eq!(config.poll_mode, PollMode::Spin);
        assert_eq!(config.thread_name_prefix, "test");
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let err = EngineConfig::builder().remote_capacity(0).build().unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfig(_)));
        assert!(err.to_string().contains("remote_capacity"));
    }

    #[test]
    fn test_receiver_options() {
        let options = ReceiverOptions::default().inbox_capacity(128).cpu_affinity(2);
        assert_eq!(options.inbox_capacity, Some(128));
        assert_eq!(options.cpu_affinity, Some(2));
    }
}
