//! Reads fixed size raw frames from a byte stream.
//!
//! The stream is a plain concatenation of frames, each `width × height × channels` bytes
//! with interleaved channels, as written by the simulator or a capture tool.
use crate::frame::Frame;
use heart_rate_common::PixelLayout;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{trace, warn};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Cannot read frame: {0}")]
    Io(#[from] std::io::Error),
    #[error("Frame geometry {width}x{height} {layout:?} has no pixels or is too large")]
    Geometry {
        width: usize,
        height: usize,
        layout: PixelLayout,
    },
}

pub struct FrameReader<R> {
    reader: R,
    width: usize,
    height: usize,
    layout: PixelLayout,
    frame_len: usize,
    frames_read: usize,
}

impl<R> FrameReader<R>
where
    R: AsyncRead + Unpin,
{
    pub fn new(
        reader: R,
        width: usize,
        height: usize,
        layout: PixelLayout,
    ) -> Result<Self, SourceError> {
        let frame_len = width
            .checked_mul(height)
            .and_then(|pixels| pixels.checked_mul(layout.channels()))
            .filter(|&len| len > 0)
            .ok_or(SourceError::Geometry {
                width,
                height,
                layout,
            })?;
        Ok(Self {
            reader,
            width,
            height,
            layout,
            frame_len,
            frames_read: 0,
        })
    }

    pub fn frames_read(&self) -> usize {
        self.frames_read
    }

    /// Reads the next whole frame.
    ///
    /// Returns `Ok(None)` at the end of the stream. A partial frame at the end of the
    /// stream is discarded with a warning.
    pub async fn next_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        let mut data = vec![0; self.frame_len];
        let mut filled = 0;
        while let Some(remaining) = data.get_mut(filled..).filter(|rest| !rest.is_empty()) {
            let read = self.reader.read(remaining).await?;
            if read == 0 {
                if filled > 0 {
                    warn!(
                        "Discarding truncated final frame of {filled} bytes, expected {}",
                        self.frame_len
                    );
                }
                return Ok(None);
            }
            filled += read;
        }
        self.frames_read += 1;
        trace!("Read frame {}", self.frames_read);
        Ok(Some(Frame::new(data, self.width, self.height, self.layout)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_whole_frames() {
        let bytes = (0..48).collect::<Vec<u8>>();
        let mut reader =
            FrameReader::new(bytes.as_slice(), 2, 2, PixelLayout::Rgb).expect("geometry is valid");

        let first = reader.next_frame().await.expect("read succeeds");
        assert_eq!(
            first.as_ref().map(|f| f.data().to_vec()),
            Some((0..12).collect())
        );
        assert_eq!(first.map(|f| (f.width(), f.height())), Some((2, 2)));

        for _ in 1..4 {
            assert!(reader.next_frame().await.expect("read succeeds").is_some());
        }
        assert!(reader.next_frame().await.expect("read succeeds").is_none());
        assert_eq!(reader.frames_read(), 4);
    }

    #[tokio::test]
    async fn truncated_tail_is_discarded() {
        let bytes = vec![7u8; 16 + 10];
        let mut reader =
            FrameReader::new(bytes.as_slice(), 2, 2, PixelLayout::Rgba).expect("geometry is valid");
        assert!(reader.next_frame().await.expect("read succeeds").is_some());
        assert!(reader.next_frame().await.expect("read succeeds").is_none());
        assert_eq!(reader.frames_read(), 1);
    }

    #[tokio::test]
    async fn empty_stream() {
        let mut reader =
            FrameReader::new(&b""[..], 30, 30, PixelLayout::Rgba).expect("geometry is valid");
        assert!(reader.next_frame().await.expect("read succeeds").is_none());
    }

    #[test]
    fn invalid_geometry() {
        assert!(matches!(
            FrameReader::new(&b""[..], 0, 30, PixelLayout::Rgba),
            Err(SourceError::Geometry { .. })
        ));
        assert!(matches!(
            FrameReader::new(&b""[..], usize::MAX, 2, PixelLayout::Rgb),
            Err(SourceError::Geometry { .. })
        ));
    }
}
