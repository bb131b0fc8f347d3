//! Registry configuration

use std::time::Duration;

/// Client registry configuration options
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Per-connection write buffer size
    pub write_buffer_size: usize,

    /// Upper bound on one connection's write+flush (None = wait indefinitely)
    ///
    /// Without a bound a client that stops reading stalls every broadcast
    /// once its socket buffer fills.
    pub write_timeout: Option<Duration>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            write_buffer_size: 64 * 1024, // 64KB
            write_timeout: None,
        }
    }
}

impl RegistryConfig {
    /// Set the per-connection write buffer size
    pub fn write_buffer_size(mut self, size: usize) -> Self {
        self.write_buffer_size = size.max(1);
        self
    }

    /// Bound each connection's write+flush
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = Some(timeout);
        self
    }

    /// Remove the write bound
    pub fn no_write_timeout(mut self) -> Self {
        self.write_timeout = None;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RegistryConfig::default();

        assert_eq!(config.write_buffer_size, 64 * 1024);
        assert!(config.write_timeout.is_none());
    }

    #[test]
    fn test_builder_chaining() {
        let config = RegistryConfig::default()
            .write_buffer_size(0)
            .write_timeout(Duration::from_millis(200));

        assert_eq!(config.write_buffer_size, 1);
        assert_eq!(config.write_timeout, Some(Duration::from_millis(200)));

        let config = config.no_write_timeout();
        assert!(config.write_timeout.is_none());
    }
}
