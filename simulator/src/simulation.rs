use crate::elements::{Colour, JsonValueError, Noise, NoiseSource, NumConstant, Pulse, PulseTemplate};
use heart_rate_common::PixelLayout;
use serde::Deserialize;
use std::io::Write;
use thiserror::Error;
use tracing::{info, instrument};

///
/// This struct is created from the configuration JSON file.
///
#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) struct Simulation {
    //  Frames per second
    pub(crate) frame_rate: NumConstant<f64>,
    //  Length of the stream, in seconds
    pub(crate) duration: NumConstant<f64>,
    pub(crate) width: NumConstant<usize>,
    pub(crate) height: NumConstant<usize>,
    #[serde(default)]
    pub(crate) layout: PixelLayout,
    //  Colour of every pixel before the pulse is applied
    pub(crate) baseline: Colour,
    pub(crate) pulse: PulseTemplate,
    #[serde(default)]
    pub(crate) noise: Option<NoiseSource>,
    #[serde(default)]
    pub(crate) seed: Option<u64>,
}

#[derive(Debug, Error)]
pub(crate) enum SimulationError {
    #[error("Frame rate {0} must be finite and positive")]
    InvalidFrameRate(f64),
    #[error("Frame geometry {0}x{1} has no pixels or is too large")]
    InvalidGeometry(usize, usize),
    #[error("Json Value error: {0}")]
    JsonValue(#[from] JsonValueError),
    #[error("Cannot write frame: {0}")]
    Io(#[from] std::io::Error),
}

impl Simulation {
    /// Resolves every value in the configuration, ready to produce frames.
    #[instrument(skip_all, err(level = "error"))]
    pub(crate) fn generator(&self) -> Result<FrameGenerator, SimulationError> {
        let frame_rate = self.frame_rate.value()?;
        if !(frame_rate.is_finite() && frame_rate > 0.0) {
            return Err(SimulationError::InvalidFrameRate(frame_rate));
        }
        let (width, height) = (self.width.value()?, self.height.value()?);
        let pixels = width
            .checked_mul(height)
            .filter(|&pixels| pixels > 0 && pixels.checked_mul(self.layout.channels()).is_some())
            .ok_or(SimulationError::InvalidGeometry(width, height))?;

        let num_frames = (frame_rate * self.duration.value()?).round() as usize;
        info!("Simulating {num_frames} frames of {width}x{height} at {frame_rate} Hz");

        Ok(FrameGenerator {
            frame_rate,
            num_frames,
            pixels,
            layout: self.layout,
            baseline: self.baseline.value()?,
            pulse: Pulse::new(&self.pulse)?,
            noise: self
                .noise
                .as_ref()
                .map(|source| Noise::new(source, self.seed))
                .transpose()?,
        })
    }
}

pub(crate) struct FrameGenerator {
    frame_rate: f64,
    num_frames: usize,
    pixels: usize,
    layout: PixelLayout,
    baseline: [f64; 3],
    pulse: Pulse,
    noise: Option<Noise>,
}

impl FrameGenerator {
    pub(crate) fn num_frames(&self) -> usize {
        self.num_frames
    }

    /// Colour shared by every pixel of frame `index`.
    fn colour(&mut self, index: usize) -> [u8; 3] {
        let [r, g, b] = self.baseline;
        let noise = self.noise.as_mut().map(Noise::sample).unwrap_or_default();
        let r = r + self.pulse.value_at(index as f64 / self.frame_rate) + noise;
        [r, g, b].map(|channel| channel.round().clamp(0.0, 255.0) as u8)
    }

    /// Produces frame `index` as interleaved bytes, opaque if the layout has an alpha channel.
    pub(crate) fn frame(&mut self, index: usize) -> Vec<u8> {
        let [r, g, b] = self.colour(index);
        let pixel: &[u8] = match self.layout {
            PixelLayout::Rgb => &[r, g, b],
            PixelLayout::Rgba => &[r, g, b, u8::MAX],
        };
        pixel.repeat(self.pixels)
    }

    /// Writes every frame in order, returning the number written.
    #[instrument(skip_all, err(level = "error"))]
    pub(crate) fn write_all<W: Write>(&mut self, writer: &mut W) -> Result<usize, SimulationError> {
        for index in 0..self.num_frames {
            writer.write_all(&self.frame(index))?;
        }
        writer.flush()?;
        Ok(self.num_frames)
    }
}
