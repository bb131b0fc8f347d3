//! Frame source abstraction
//!
//! A [`FrameSource`] produces fixed-size PCM buffers. Exactly one task (the
//! broadcast loop) reads from it; implementations need not support
//! concurrent readers.

use std::future::Future;

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::SourceError;

/// Producer of raw PCM frames
pub trait FrameSource: Send + 'static {
    /// Fill `buf` completely with the next frame
    ///
    /// Returns [`SourceError::EndOfStream`] when the stream ends cleanly
    /// between frames. A partially filled buffer is never a success.
    fn read_frame(&mut self, buf: &mut [u8]) -> impl Future<Output = Result<(), SourceError>> + Send;

    /// Discard any audio buffered on the capture side
    fn flush(&mut self) -> impl Future<Output = Result<(), SourceError>> + Send {
        async { Ok(()) }
    }

    /// Release the capture stream
    fn release(&mut self) -> impl Future<Output = ()> + Send {
        async {}
    }
}

/// Frame source over any async byte stream (stdin, a pipe, a file)
pub struct ReaderSource<R> {
    reader: R,
}

impl<R> ReaderSource<R>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R> FrameSource for ReaderSource<R>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    async fn read_frame(&mut self, buf: &mut [u8]) -> Result<(), SourceError> {
        read_full(&mut self.reader, buf).await
    }
}

/// Read until `buf` is full, classifying EOF by where it lands
pub(crate) async fn read_full<R>(reader: &mut R, buf: &mut [u8]) -> Result<(), SourceError>
where
    R: AsyncRead + Unpin,
{
    let mut filled = 0;

    while filled < buf.len() {
        let n = reader
            .read(&mut buf[filled..])
            .await
            .map_err(SourceError::Read)?;

        if n == 0 {
            return if filled == 0 {
                Err(SourceError::EndOfStream)
            } else {
                Err(SourceError::ShortFrame {
                    expected: buf.len(),
                    got: filled,
                })
            };
        }

        filled += n;
    }

    Ok(())
}
