//! Statistics and metrics for the relay

use std::time::Duration;

/// Client registry counters
#[derive(Debug, Clone, Default)]
pub struct RegistryStats {
    /// Currently registered connections
    pub active: usize,
    /// Connections ever admitted
    pub total_accepted: u64,
    /// Connections evicted after a failed write
    pub total_evicted: u64,
    /// Connections refused because the registry was closed
    pub total_rejected: u64,
    /// Broadcast calls made while open
    pub frames_broadcast: u64,
    /// Payload bytes fully delivered, summed over connections
    pub bytes_sent: u64,
}

/// Broadcast loop counters
#[derive(Debug, Clone, Default)]
pub struct LoopStats {
    /// Frames read from the source
    pub frames_read: u64,
    /// Bytes read from the source
    pub bytes_read: u64,
    /// Time spent running
    pub duration: Duration,
}

impl LoopStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture throughput in bytes per second
    pub fn byte_rate(&self) -> u64 {
        let millis = self.duration.as_millis() as u64;
        if millis > 0 {
            self.bytes_read * 1000 / millis
        } else {
            0
        }
    }
}
