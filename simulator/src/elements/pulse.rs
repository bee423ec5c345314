use super::{NumConstant, utils::JsonValueError};
use serde::Deserialize;
use std::f64::consts::TAU;

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub(crate) enum Waveform {
    #[default]
    Sine,
    /// Rises linearly from `-amplitude` to `amplitude` over each beat, then drops back.
    Sawtooth,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) struct PulseTemplate {
    heart_rate_bpm: NumConstant<f64>,
    amplitude: NumConstant<f64>,
    #[serde(default)]
    waveform: Waveform,
}

/// A pulse template with its values resolved.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Pulse {
    /// Beats per second.
    frequency: f64,
    amplitude: f64,
    waveform: Waveform,
}

impl Pulse {
    pub(crate) fn new(template: &PulseTemplate) -> Result<Self, JsonValueError> {
        Ok(Self {
            frequency: template.heart_rate_bpm.value()? / 60.0,
            amplitude: template.amplitude.value()?,
            waveform: template.waveform,
        })
    }

    /// Offset from the baseline at `time` seconds.
    pub(crate) fn value_at(&self, time: f64) -> f64 {
        let cycles = self.frequency * time;
        match self.waveform {
            Waveform::Sine => self.amplitude * (TAU * cycles).sin(),
            Waveform::Sawtooth => self.amplitude * (2.0 * cycles.fract() - 1.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn pulse(waveform: Waveform) -> Pulse {
        Pulse::new(&PulseTemplate {
            heart_rate_bpm: NumConstant::Const(60.0),
            amplitude: NumConstant::Const(10.0),
            waveform,
        })
        .expect("values are constant")
    }

    #[test]
    fn sine() {
        let pulse = pulse(Waveform::Sine);
        assert_approx_eq!(pulse.value_at(0.0), 0.0);
        assert_approx_eq!(pulse.value_at(0.25), 10.0);
        assert_approx_eq!(pulse.value_at(0.75), -10.0);
        assert_approx_eq!(pulse.value_at(1.25), 10.0);
    }

    #[test]
    fn sawtooth() {
        let pulse = pulse(Waveform::Sawtooth);
        assert_approx_eq!(pulse.value_at(0.0), -10.0);
        assert_approx_eq!(pulse.value_at(0.5), 0.0);
        assert_approx_eq!(pulse.value_at(1.25), -5.0);
    }

    #[test]
    fn default_waveform() {
        let template: PulseTemplate = serde_json::from_str(
            r#"{ "heart-rate-bpm": { "const": 72 }, "amplitude": { "const": 5 } }"#,
        )
        .expect("json is valid");
        assert_eq!(template.waveform, Waveform::Sine);
    }
}
