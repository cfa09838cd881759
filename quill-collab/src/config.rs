//! Sync configuration.

/// Settings shared by the handshake, framing, feed and offline queue.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Origin tag attached to transactions that apply peer updates
    pub remote_origin: String,
    /// Payloads at least this large are LZ4-compressed on the wire
    pub compression_threshold: usize,
    /// Frames larger than this are refused in both directions
    pub max_message_size: usize,
    /// Updates kept while disconnected before the queue compacts itself
    pub offline_queue_capacity: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            remote_origin: "remote".into(),
            compression_threshold: 1024,
            max_message_size: 16 * 1024 * 1024,
            offline_queue_capacity: 10_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SyncConfig::default();
        assert_eq!(config.remote_origin, "remote");
        assert_eq!(config.compression_threshold, 1024);
        assert!(config.max_message_size > config.compression_threshold);
        assert_eq!(config.offline_queue_capacity, 10_000);
    }
}
