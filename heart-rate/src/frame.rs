//! Reduces a raw pixel buffer to the mean colour of the whole frame.
use heart_rate_common::{PixelLayout, Real};
use serde::Serialize;
use std::fmt::{Display, Formatter};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("Frame buffer holds {actual} bytes, but a {width}x{height} {layout:?} frame requires {expected}")]
    SizeMismatch {
        width: usize,
        height: usize,
        layout: PixelLayout,
        expected: usize,
        actual: usize,
    },
    #[error("Frame has no pixels")]
    Empty,
}

/// A rectangular buffer of interleaved 8-bit pixels, as delivered by a frame source.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Frame {
    width: usize,
    height: usize,
    layout: PixelLayout,
    data: Vec<u8>,
}

impl Frame {
    /// Wraps a buffer without checking it against the geometry; [reduce_frame] does that.
    pub fn new(data: Vec<u8>, width: usize, height: usize, layout: PixelLayout) -> Self {
        Self {
            width,
            height,
            layout,
            data,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn layout(&self) -> PixelLayout {
        self.layout
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Number of bytes the declared geometry calls for, or [None] if it overflows.
    pub fn expected_len(&self) -> Option<usize> {
        self.width
            .checked_mul(self.height)?
            .checked_mul(self.layout.channels())
    }
}

/// Mean value of each colour channel over a frame.
#[derive(Default, Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ColorSample {
    pub r: Real,
    pub g: Real,
    pub b: Real,
}

impl ColorSample {
    /// The same colour with each channel mapped from `0..=255` onto `0..=1`.
    pub fn scaled(&self) -> Self {
        Self {
            r: self.r / 255.0,
            g: self.g / 255.0,
            b: self.b / 255.0,
        }
    }
}

/// Formats as a CSS colour, e.g. `rgb(128,64,0)`.
impl Display for ColorSample {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let channel = |v: Real| v.round().clamp(0.0, 255.0) as u8;
        write!(
            f,
            "rgb({},{},{})",
            channel(self.r),
            channel(self.g),
            channel(self.b)
        )
    }
}

/// Averages the R, G and B channels over every pixel of the frame.
///
/// No region of interest is applied. Any alpha channel is ignored.
pub fn reduce_frame(frame: &Frame) -> Result<ColorSample, FrameError> {
    let expected = frame.expected_len().unwrap_or(usize::MAX);
    if frame.data.len() != expected {
        return Err(FrameError::SizeMismatch {
            width: frame.width,
            height: frame.height,
            layout: frame.layout,
            expected,
            actual: frame.data.len(),
        });
    }
    if expected == 0 {
        return Err(FrameError::Empty);
    }

    let (mut r, mut g, mut b) = (0u64, 0u64, 0u64);
    for pixel in frame.data.chunks_exact(frame.layout.channels()) {
        if let [pr, pg, pb, ..] = *pixel {
            r += pr as u64;
            g += pg as u64;
            b += pb as u64;
        }
    }

    let total = (frame.width * frame.height) as Real;
    Ok(ColorSample {
        r: r as Real / total,
        g: g as Real / total,
        b: b as Real / total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn uniform(width: usize, height: usize, pixel: &[u8], layout: PixelLayout) -> Frame {
        Frame::new(pixel.repeat(width * height), width, height, layout)
    }

    #[test]
    fn uniform_frame() {
        let frame = uniform(30, 30, &[200, 100, 50, 255], PixelLayout::Rgba);
        let sample = reduce_frame(&frame).expect("frame is valid");
        assert_eq!(
            sample,
            ColorSample {
                r: 200.0,
                g: 100.0,
                b: 50.0
            }
        );
    }

    #[test]
    fn mixed_pixels_are_averaged() {
        // 2x2 frame, rgb layout
        let data = vec![
            0, 0, 0, //
            255, 0, 0, //
            0, 255, 0, //
            1, 2, 3,
        ];
        let frame = Frame::new(data, 2, 2, PixelLayout::Rgb);
        let sample = reduce_frame(&frame).expect("frame is valid");
        assert_approx_eq!(sample.r, 64.0);
        assert_approx_eq!(sample.g, 64.25);
        assert_approx_eq!(sample.b, 0.75);
    }

    #[test]
    fn alpha_is_ignored() {
        let opaque = uniform(4, 3, &[10, 20, 30, 255], PixelLayout::Rgba);
        let clear = uniform(4, 3, &[10, 20, 30, 0], PixelLayout::Rgba);
        assert_eq!(reduce_frame(&opaque), reduce_frame(&clear));
    }

    #[test]
    fn size_mismatch() {
        let frame = Frame::new(vec![0; 30 * 30 * 3], 30, 30, PixelLayout::Rgba);
        assert_eq!(
            reduce_frame(&frame),
            Err(FrameError::SizeMismatch {
                width: 30,
                height: 30,
                layout: PixelLayout::Rgba,
                expected: 3600,
                actual: 2700,
            })
        );
    }

    #[test]
    fn overflowing_geometry() {
        let frame = Frame::new(vec![0; 4], usize::MAX, 2, PixelLayout::Rgba);
        assert!(matches!(
            reduce_frame(&frame),
            Err(FrameError::SizeMismatch { .. })
        ));
    }

    #[test]
    fn empty_frame() {
        let frame = Frame::new(Vec::new(), 0, 10, PixelLayout::Rgb);
        assert_eq!(reduce_frame(&frame), Err(FrameError::Empty));
    }

    #[test]
    fn css_string() {
        let sample = ColorSample {
            r: 127.6,
            g: 300.0,
            b: 0.2,
        };
        assert_eq!(sample.to_string(), "rgb(128,255,0)");
        assert_eq!(
            ColorSample {
                r: 0.5,
                g: 0.25,
                b: 1.0
            }
            .to_string(),
            "rgb(1,0,1)"
        );
    }

    #[test]
    fn scaled() {
        let sample = ColorSample {
            r: 255.0,
            g: 51.0,
            b: 0.0,
        }
        .scaled();
        assert_approx_eq!(sample.r, 1.0);
        assert_approx_eq!(sample.g, 0.2);
        assert_approx_eq!(sample.b, 0.0);
    }
}
