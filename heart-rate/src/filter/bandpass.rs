use super::{Filter, biquad::Biquad};
use clap::ValueEnum;
use heart_rate_common::Real;
use std::f64::consts::{LN_2, PI};
use thiserror::Error;
use tracing::debug;

/// The largest number of cascaded sections the designer supports.
pub const MAX_ORDER: usize = 12;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum FilterDesignError {
    #[error("Filter order {0} is outside 1..={MAX_ORDER}")]
    Order(usize),
    #[error("Centre frequency {centre} Hz must lie strictly between 0 and the Nyquist frequency of {nyquist} Hz")]
    Centre { centre: Real, nyquist: Real },
    #[error("Bandwidth {0} must be finite and non-negative")]
    Bandwidth(Real),
}

/// Family of the prototype filter the cascade is built from.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Characteristic {
    /// Maximally flat passband.
    #[default]
    Butterworth,
}

impl Characteristic {
    /// Quality factors of the second order sections, in ascending order.
    fn section_q(self, order: usize) -> Vec<Real> {
        match self {
            Characteristic::Butterworth => (1..=order)
                .rev()
                .map(|k| 1.0 / (2.0 * ((2 * k - 1) as Real * PI / (4 * order) as Real).sin()))
                .collect(),
        }
    }
}

/// Parameters from which a [BandpassFilter] is designed.
#[derive(Clone, Debug, PartialEq)]
pub struct FilterDesign {
    /// Number of cascaded second order sections.
    pub order: usize,
    pub characteristic: Characteristic,
    /// Sampling frequency, in Hz.
    pub sample_rate: Real,
    /// Centre of the passband, in Hz.
    pub centre: Real,
    /// Width of the passband, in Hz. Zero selects the prototype's quality factors instead.
    pub bandwidth: Real,
}

impl Default for FilterDesign {
    fn default() -> Self {
        Self {
            order: 4,
            characteristic: Characteristic::Butterworth,
            sample_rate: 30.0,
            centre: 80.0 / 60.0,
            bandwidth: 160.0 / 60.0,
        }
    }
}

impl FilterDesign {
    pub fn validate(&self) -> Result<(), FilterDesignError> {
        if !(1..=MAX_ORDER).contains(&self.order) {
            return Err(FilterDesignError::Order(self.order));
        }
        let nyquist = self.sample_rate / 2.0;
        if !(self.centre > 0.0 && self.centre < nyquist) {
            return Err(FilterDesignError::Centre {
                centre: self.centre,
                nyquist,
            });
        }
        if !(self.bandwidth.is_finite() && self.bandwidth >= 0.0) {
            return Err(FilterDesignError::Bandwidth(self.bandwidth));
        }
        Ok(())
    }
}

/// A bandpass filter built from a cascade of identical-centre biquad sections.
///
/// Coefficients are fixed at construction; the delay lines persist for the life of the
/// filter and are never reset. A new session requires a new filter.
#[derive(Clone, Debug)]
pub struct BandpassFilter {
    sections: Vec<Biquad>,
}

impl BandpassFilter {
    pub fn new(design: &FilterDesign) -> Result<Self, FilterDesignError> {
        design.validate()?;

        let omega = 2.0 * PI * design.centre / design.sample_rate;
        let sections = design
            .characteristic
            .section_q(design.order)
            .into_iter()
            .map(|q| {
                let alpha = if design.bandwidth > 0.0 {
                    omega.sin() * (LN_2 / 2.0 * design.bandwidth * omega / omega.sin()).sinh()
                } else {
                    omega.sin() / (2.0 * q)
                };
                Biquad::bandpass(omega, alpha)
            })
            .collect::<Vec<_>>();

        debug!(
            "Designed {} section {:?} bandpass at {} Hz",
            sections.len(),
            design.characteristic,
            design.centre
        );
        Ok(Self { sections })
    }

    pub fn order(&self) -> usize {
        self.sections.len()
    }
}

impl Filter for BandpassFilter {
    fn step(&mut self, input: Real) -> Real {
        self.sections
            .iter_mut()
            .fold(input, |value, section| section.step(value))
    }
}
