//! Runs the stages of the heart rate pipeline once per frame, and packages their outputs.
//!
//! Per tick: frame → [reduce_frame] → red channel → [BandpassFilter] → [HistoryWindow]
//! → { [SpectralEstimator], [ThresholdCrossingDetector] } → [TickOutput].
use crate::{
    detectors::{BeatDetector, BeatEvent, ThresholdCrossingDetector},
    filter::{BandpassFilter, Filter},
    frame::{ColorSample, Frame, FrameError, reduce_frame},
    history::HistoryWindow,
    parameters::{ConfigError, PipelineSettings, SessionLayout},
    spectrum::SpectralEstimator,
};
use heart_rate_common::{
    Real, Timestamp,
    metrics::{
        failures::{self, FailureKind},
        names::{BEATS_DETECTED, FAILURES, FRAMES_RECEIVED, LAST_HEART_RATE},
    },
};
use metrics::{counter, gauge};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid frame: {0}")]
    InvalidFrame(#[from] FrameError),
    #[error("Pipeline has not been started")]
    NotStarted,
    #[error("Pipeline is already running")]
    AlreadyRunning,
    #[error("Pipeline is not running")]
    NotRunning,
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// The continuous output of the pipeline, one per tick.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Measurement {
    pub time: Timestamp,
    /// The filtered sample pushed on this tick.
    pub value: Real,
    /// Estimated heart rate, in beats per minute.
    pub hr: Real,
    /// Mean colour of the frame.
    pub rgb: ColorSample,
    /// The raw frame, present only when requested in the settings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame: Option<Frame>,
}

/// Everything a successful tick emits.
#[derive(Clone, Debug, PartialEq)]
pub struct TickOutput {
    pub measurement: Measurement,
    pub beat: Option<BeatEvent>,
}

/// State owned by one running session. Dropped on stop, rebuilt on start.
struct Session {
    filter: BandpassFilter,
    history: HistoryWindow,
    estimator: SpectralEstimator,
    detector: ThresholdCrossingDetector,
    last_time: Option<Timestamp>,
}

impl Session {
    fn new(layout: &SessionLayout) -> Result<Self, ConfigError> {
        Ok(Self {
            filter: BandpassFilter::new(&layout.filter)?,
            history: HistoryWindow::new(layout.history_len),
            estimator: SpectralEstimator::new(
                layout.fft_size,
                layout.history_len,
                layout.sample_rate,
            ),
            detector: ThresholdCrossingDetector::new(
                layout.beat_window_len,
                layout.beat_threshold,
            ),
            last_time: None,
        })
    }

    /// Runs every stage. The frame is validated before any state is touched, so a failure
    /// leaves the filter and window exactly as they were.
    fn tick(
        &mut self,
        time: Timestamp,
        frame: Frame,
        include_frame: bool,
    ) -> Result<TickOutput, PipelineError> {
        let rgb = reduce_frame(&frame)?;

        if let Some(last_time) = self.last_time.filter(|&last| time < last) {
            warn!("Tick at {time} ms precedes the previous tick at {last_time} ms");
        }
        self.last_time = Some(time);

        let value = self.filter.step(rgb.r);
        self.history.push(value);
        let heart_rate = self.estimator.estimate(&self.history);
        let beat = self.detector.signal(time, &self.history, &heart_rate);

        Ok(TickOutput {
            measurement: Measurement {
                time,
                value,
                hr: heart_rate.bpm,
                rgb,
                frame: include_frame.then_some(frame),
            },
            beat,
        })
    }
}

/// A heart rate pipeline. Each instance owns its own filter and history, so independent
/// pipelines may run side by side; a single instance processes one tick at a time.
pub struct Pipeline {
    layout: SessionLayout,
    session: Option<Session>,
}

impl Pipeline {
    /// Validates the settings. The pipeline starts out stopped.
    pub fn new(settings: &PipelineSettings) -> Result<Self, ConfigError> {
        Ok(Self {
            layout: settings.layout()?,
            session: None,
        })
    }

    pub fn layout(&self) -> &SessionLayout {
        &self.layout
    }

    pub fn is_running(&self) -> bool {
        self.session.is_some()
    }

    /// The history window of the running session.
    pub fn history(&self) -> Option<&HistoryWindow> {
        self.session.as_ref().map(|session| &session.history)
    }

    /// Builds a fresh session: zeroed filter state and an all-zero history window.
    pub fn start(&mut self) -> Result<(), PipelineError> {
        if self.session.is_some() {
            return Err(PipelineError::AlreadyRunning);
        }
        self.session = Some(Session::new(&self.layout)?);
        info!(
            "Pipeline started: {} sample history, {} sample beat window, {} point FFT",
            self.layout.history_len, self.layout.beat_window_len, self.layout.fft_size
        );
        Ok(())
    }

    /// Discards the session's state.
    pub fn stop(&mut self) -> Result<(), PipelineError> {
        self.session.take().ok_or(PipelineError::NotRunning)?;
        info!("Pipeline stopped");
        Ok(())
    }

    /// Processes one frame.
    ///
    /// Returns `Ok(None)` if the frame is invalid: the tick is skipped, nothing is emitted,
    /// and the session state is unchanged. Fails only if the pipeline is not running.
    #[instrument(skip_all, level = "trace", fields(time = time))]
    pub fn process(
        &mut self,
        time: Timestamp,
        frame: Frame,
    ) -> Result<Option<TickOutput>, PipelineError> {
        let session = self.session.as_mut().ok_or(PipelineError::NotStarted)?;
        counter!(FRAMES_RECEIVED).increment(1);

        match session.tick(time, frame, self.layout.include_frame) {
            Ok(output) => {
                gauge!(LAST_HEART_RATE).set(output.measurement.hr);
                if output.beat.is_some() {
                    debug!("Beat detected at {time} ms");
                    counter!(BEATS_DETECTED).increment(1);
                }
                Ok(Some(output))
            }
            Err(e @ PipelineError::InvalidFrame(_)) => {
                warn!("Skipping tick at {time} ms: {e}");
                counter!(
                    FAILURES,
                    &[failures::get_label(FailureKind::InvalidFrame)]
                )
                .increment(1);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use heart_rate_common::PixelLayout;
    use std::f64::consts::PI;

    fn uniform_frame(r: u8, g: u8, b: u8) -> Frame {
        Frame::new([r, g, b, 255].repeat(30 * 30), 30, 30, PixelLayout::Rgba)
    }

    fn tick_time(i: usize) -> Timestamp {
        (i as Real * 1000.0 / 30.0) as Timestamp
    }

    fn started() -> Pipeline {
        let mut pipeline = Pipeline::new(&PipelineSettings::default()).expect("defaults are valid");
        pipeline.start().expect("pipeline starts");
        pipeline
    }

    #[test]
    fn process_before_start() {
        let mut pipeline = Pipeline::new(&PipelineSettings::default()).expect("defaults are valid");
        assert!(matches!(
            pipeline.process(0, uniform_frame(0, 0, 0)),
            Err(PipelineError::NotStarted)
        ));
        assert!(pipeline.history().is_none());
    }

    #[test]
    fn lifecycle_misuse() {
        let mut pipeline = Pipeline::new(&PipelineSettings::default()).expect("defaults are valid");
        assert!(matches!(pipeline.stop(), Err(PipelineError::NotRunning)));
        pipeline.start().expect("pipeline starts");
        assert!(matches!(pipeline.start(), Err(PipelineError::AlreadyRunning)));
        assert!(pipeline.is_running());
        pipeline.stop().expect("pipeline stops");
        assert!(!pipeline.is_running());
        assert!(matches!(
            pipeline.process(0, uniform_frame(0, 0, 0)),
            Err(PipelineError::NotStarted)
        ));
    }

    #[test]
    fn invalid_settings() {
        let settings = PipelineSettings {
            fft_size: 256,
            ..Default::default()
        };
        assert!(matches!(
            Pipeline::new(&settings),
            Err(ConfigError::FftTooSmall { .. })
        ));
    }

    #[test]
    fn invalid_frame_is_skipped_without_touching_state() {
        let mut pipeline = started();
        for i in 0..10 {
            pipeline
                .process(tick_time(i), uniform_frame(100 + i as u8, 0, 0))
                .expect("pipeline is running");
        }
        let before = pipeline
            .history()
            .map(|h| h.iter().collect::<Vec<_>>())
            .unwrap_or_default();

        let truncated = Frame::new(vec![0; 100], 30, 30, PixelLayout::Rgba);
        let output = pipeline
            .process(tick_time(10), truncated)
            .expect("invalid frames are not fatal");
        assert_eq!(output, None);

        let after = pipeline
            .history()
            .map(|h| h.iter().collect::<Vec<_>>())
            .unwrap_or_default();
        assert_eq!(before, after);
    }

    #[test]
    fn black_frames() {
        let mut pipeline = started();
        for i in 0..300 {
            let output = pipeline
                .process(tick_time(i), uniform_frame(0, 0, 0))
                .expect("pipeline is running")
                .expect("frame is valid");
            assert_eq!(output.measurement.value, 0.0);
            assert_eq!(output.measurement.hr, 0.0);
            assert_eq!(output.beat, None);
        }
    }

    #[test]
    fn pulsing_red_channel() {
        let mut pipeline = started();
        let mut beats = Vec::new();
        let mut last = None;
        for i in 0..600 {
            let red = 128.0 + 40.0 * (2.0 * PI * (80.0 / 60.0) * i as Real / 30.0).sin();
            let output = pipeline
                .process(tick_time(i), uniform_frame(red.round() as u8, 90, 60))
                .expect("pipeline is running")
                .expect("frame is valid");
            if i >= 300 && output.beat.is_some() {
                beats.push(i);
            }
            last = Some(output);
        }

        let measurement = last.expect("ticks were processed").measurement;
        assert!((measurement.hr - 80.0).abs() < 30.0 * 60.0 / 4096.0, "{}", measurement.hr);
        assert_eq!(measurement.rgb.g, 90.0);

        // 80 bpm at 30 Hz is one beat every 22.5 samples.
        assert!((12..=14).contains(&beats.len()), "{beats:?}");
        assert!(beats.windows(2).all(|pair| match pair {
            [a, b] => (21..=24).contains(&(b - a)),
            _ => false,
        }));
    }

    #[test]
    fn restart_discards_state() {
        let mut pipeline = started();
        for i in 0..50 {
            pipeline
                .process(tick_time(i), uniform_frame((i * 5) as u8, 0, 0))
                .expect("pipeline is running");
        }
        pipeline.stop().expect("pipeline stops");
        pipeline.start().expect("pipeline restarts");
        assert!(
            pipeline
                .history()
                .is_some_and(|h| h.len() == 300 && h.iter().all(|v| v == 0.0))
        );
    }

    #[test]
    fn frame_is_attached_on_request() {
        let settings = PipelineSettings {
            include_frame: true,
            ..Default::default()
        };
        let mut pipeline = Pipeline::new(&settings).expect("settings are valid");
        pipeline.start().expect("pipeline starts");
        let frame = uniform_frame(1, 2, 3);
        let output = pipeline
            .process(0, frame.clone())
            .expect("pipeline is running")
            .expect("frame is valid");
        assert_eq!(output.measurement.frame, Some(frame));

        let mut pipeline = started();
        let output = pipeline
            .process(0, uniform_frame(1, 2, 3))
            .expect("pipeline is running")
            .expect("frame is valid");
        assert_eq!(output.measurement.frame, None);
    }

    #[test]
    fn measurement_json() {
        let measurement = Measurement {
            time: 1500,
            value: 0.25,
            hr: 79.98046875,
            rgb: ColorSample {
                r: 1.0,
                g: 2.0,
                b: 3.0,
            },
            frame: None,
        };
        let json = serde_json::to_value(&measurement).expect("measurement serialises");
        assert_eq!(
            json,
            serde_json::json!({
                "time": 1500,
                "value": 0.25,
                "hr": 79.98046875,
                "rgb": { "r": 1.0, "g": 2.0, "b": 3.0 }
            })
        );
    }
}
