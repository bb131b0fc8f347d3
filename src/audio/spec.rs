//! Sample spec and frame sizing
//!
//! The sample spec is fixed for the lifetime of the process and decides how
//! many bytes make up one broadcast frame.

use crate::error::{Error, Result};

/// Highest channel count the capture server accepts
pub const MAX_CHANNELS: u8 = 32;

/// Highest sample rate the capture server accepts
pub const MAX_RATE: u32 = 384_000;

/// Longest buffer accepted at startup
pub const MAX_BUFFER_MS: u32 = 10_000;

/// PCM sample encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleFormat {
    /// Signed 16-bit little-endian
    S16Le,
}

impl SampleFormat {
    /// Size of one sample in bytes
    pub fn bytes_per_sample(&self) -> usize {
        match self {
            SampleFormat::S16Le => 2,
        }
    }

    /// Name as understood by the capture tools
    pub fn as_str(&self) -> &'static str {
        match self {
            SampleFormat::S16Le => "s16le",
        }
    }
}

impl std::fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sample format, rate and channel count of the captured stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleSpec {
    pub format: SampleFormat,
    pub rate: u32,
    pub channels: u8,
}

impl SampleSpec {
    /// Create a signed 16-bit little-endian spec
    pub fn s16le(rate: u32, channels: u8) -> Self {
        Self {
            format: SampleFormat::S16Le,
            rate,
            channels,
        }
    }

    /// Check the sample spec against the capture server's limits
    pub fn validate(&self) -> Result<()> {
        if self.channels == 0 || self.channels > MAX_CHANNELS {
            return Err(Error::InvalidSampleSpec(format!(
                "channel count {} outside 1..={}",
                self.channels, MAX_CHANNELS
            )));
        }
        if self.rate == 0 || self.rate > MAX_RATE {
            return Err(Error::InvalidSampleSpec(format!(
                "sample rate {} outside 1..={}",
                self.rate, MAX_RATE
            )));
        }
        Ok(())
    }

    /// Size of one sample frame (one sample for every channel)
    pub fn frame_size(&self) -> usize {
        self.format.bytes_per_sample() * self.channels as usize
    }
}

impl Default for SampleSpec {
    fn default() -> Self {
        Self::s16le(44_100, 2)
    }
}

impl std::fmt::Display for SampleSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}ch {}Hz", self.format, self.channels, self.rate)
    }
}

/// Byte layout of one broadcast buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLayout {
    /// Sample frames per buffer, never less than 1
    pub frames_per_buffer: usize,
    /// Bytes per sample frame
    pub frame_size: usize,
}

impl FrameLayout {
    /// Compute the buffer layout for `buffer_ms` of audio
    pub fn new(spec: &SampleSpec, buffer_ms: u32) -> Self {
        let frames = u64::from(buffer_ms) * u64::from(spec.rate) / 1000;

        Self {
            frames_per_buffer: frames.max(1) as usize,
            frame_size: spec.frame_size(),
        }
    }

    /// Compute the layout, rejecting buffers too long to allocate
    pub fn try_new(spec: &SampleSpec, buffer_ms: u32) -> Result<Self> {
        if buffer_ms > MAX_BUFFER_MS {
            return Err(Error::InvalidBufferLength(format!(
                "{}ms exceeds {}ms",
                buffer_ms, MAX_BUFFER_MS
            )));
        }

        let layout = Self::new(spec, buffer_ms);
        layout
            .frames_per_buffer
            .checked_mul(layout.frame_size)
            .ok_or_else(|| {
                Error::InvalidBufferLength(format!("{}ms frame size overflows", buffer_ms))
            })?;

        Ok(layout)
    }

    /// Total bytes in one buffer
    pub fn frame_bytes(&self) -> usize {
        self.frames_per_buffer * self.frame_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout() {
        let spec = SampleSpec::default();
        let layout = FrameLayout::new(&spec, 50);

        assert_eq!(layout.frames_per_buffer, 2205);
        assert_eq!(layout.frame_size, 4);
        assert_eq!(layout.frame_bytes(), 8820);
    }

    #[test]
    fn test_frames_per_buffer_floor() {
        // 1ms at 500Hz rounds down to zero frames
        let spec = SampleSpec::s16le(500, 1);
        let layout = FrameLayout::new(&spec, 1);

        assert_eq!(layout.frames_per_buffer, 1);
        assert_eq!(layout.frame_bytes(), 2);

        let layout = FrameLayout::new(&spec, 0);
        assert_eq!(layout.frames_per_buffer, 1);
    }

    #[test]
    fn test_frame_bytes_formula() {
        for channels in 1..=4u8 {
            for &rate in &[8_000u32, 22_050, 44_100, 48_000, 96_000] {
                let spec = SampleSpec::s16le(rate, channels);
                let layout = FrameLayout::new(&spec, 20);
                assert_eq!(
                    layout.frame_bytes(),
                    layout.frames_per_buffer * channels as usize * 2
                );
            }
        }
    }

    #[test]
    fn test_try_new_rejects_long_buffer() {
        let spec = SampleSpec::s16le(MAX_RATE, 2);

        let result = FrameLayout::try_new(&spec, u32::MAX);
        assert!(matches!(result, Err(Error::InvalidBufferLength(_))));

        let result = FrameLayout::try_new(&spec, MAX_BUFFER_MS + 1);
        assert!(matches!(result, Err(Error::InvalidBufferLength(_))));
    }

    #[test]
    fn test_try_new_accepts_longest_buffer() {
        let spec = SampleSpec::s16le(MAX_RATE, MAX_CHANNELS);
        let layout = FrameLayout::try_new(&spec, MAX_BUFFER_MS).unwrap();

        assert_eq!(layout.frames_per_buffer, 3_840_000);
        assert_eq!(layout.frame_bytes(), 3_840_000 * 64);
    }

    #[test]
    fn test_validate_ok() {
        assert!(SampleSpec::default().validate().is_ok());
        assert!(SampleSpec::s16le(8_000, 1).validate().is_ok());
        assert!(SampleSpec::s16le(MAX_RATE, MAX_CHANNELS).validate().is_ok());
    }

    #[test]
    fn test_validate_zero_channels() {
        let result = SampleSpec::s16le(44_100, 0).validate();
        assert!(matches!(result, Err(Error::InvalidSampleSpec(_))));
    }

    #[test]
    fn test_validate_too_many_channels() {
        let result = SampleSpec::s16le(44_100, MAX_CHANNELS + 1).validate();
        assert!(matches!(result, Err(Error::InvalidSampleSpec(_))));
    }

    #[test]
    fn test_validate_rate_bounds() {
        assert!(SampleSpec::s16le(0, 2).validate().is_err());
        assert!(SampleSpec::s16le(MAX_RATE + 1, 2).validate().is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(SampleSpec::default().to_string(), "s16le 2ch 44100Hz");
    }
}
