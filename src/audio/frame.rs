//! Audio frame shared across one broadcast step

use bytes::Bytes;

/// One buffer of interleaved PCM
///
/// Cheap to clone: every connection in a broadcast shares the same
/// reference-counted allocation.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Position in the capture stream, starting at 0
    pub sequence: u64,
    /// Raw sample bytes
    pub data: Bytes,
}

impl AudioFrame {
    pub fn new(sequence: u64, data: Bytes) -> Self {
        Self { sequence, data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
