//! Broadcast loop
//!
//! The only reader of the frame source. Each captured frame is handed to the
//! registry before the next read, so the source's blocking read paces the
//! whole relay.

use std::sync::Arc;
use std::time::Instant;

use bytes::BytesMut;

use crate::audio::{AudioFrame, FrameLayout, FrameSource};
use crate::error::SourceError;
use crate::registry::ClientRegistry;
use crate::stats::LoopStats;

use super::shutdown::StopToken;

/// Pumps frames from a source into the client registry
pub struct BroadcastLoop<S: FrameSource> {
    source: S,
    registry: Arc<ClientRegistry>,
    layout: FrameLayout,
    stop: StopToken,
}

impl<S: FrameSource> BroadcastLoop<S> {
    pub fn new(
        source: S,
        registry: Arc<ClientRegistry>,
        layout: FrameLayout,
        stop: StopToken,
    ) -> Self {
        Self {
            source,
            registry,
            layout,
            stop,
        }
    }

    /// Run until stopped or the source ends
    ///
    /// The source is flushed and released before returning.
    pub async fn run(mut self) -> LoopStats {
        let frame_bytes = self.layout.frame_bytes();
        let started = Instant::now();
        let mut stats = LoopStats::new();

        tracing::info!(
            frame_bytes = frame_bytes,
            frames_per_buffer = self.layout.frames_per_buffer,
            "Broadcast loop started"
        );

        loop {
            let mut buf = BytesMut::zeroed(frame_bytes);

            let result = tokio::select! {
                biased;
                _ = self.stop.stopped() => {
                    tracing::debug!("Broadcast loop stop requested");
                    break;
                }
                result = self.source.read_frame(&mut buf) => result,
            };

            match result {
                Ok(()) => {
                    let frame = AudioFrame::new(stats.frames_read, buf.freeze());
                    stats.frames_read += 1;
                    stats.bytes_read += frame_bytes as u64;

                    self.registry.broadcast(&frame).await;
                }
                Err(SourceError::EndOfStream) => {
                    tracing::info!(frames = stats.frames_read, "Capture stream ended");
                    break;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Capture read failed");
                    break;
                }
            }
        }

        if let Err(e) = self.source.flush().await {
            tracing::warn!(error = %e, "Failed to flush capture stream");
        }
        self.source.release().await;

        stats.duration = started.elapsed();
        stats
    }
}
