use super::{NumConstant, utils::JsonValueError};
use rand::{SeedableRng, rngs::StdRng};
use rand_distr::{Distribution, Normal};
use serde::Deserialize;

/// Gaussian noise added to the modulated channel of every frame.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) struct NoiseSource {
    mean: NumConstant<f64>,
    sd: NumConstant<f64>,
}

pub(crate) struct Noise {
    distribution: Normal<f64>,
    rng: StdRng,
}

impl Noise {
    /// If `seed` is absent the generator is seeded from the operating system.
    pub(crate) fn new(source: &NoiseSource, seed: Option<u64>) -> Result<Self, JsonValueError> {
        let sd = source.sd.value()?;
        if sd < 0.0 {
            return Err(JsonValueError::NegativeDeviation(sd));
        }
        Ok(Self {
            distribution: Normal::new(source.mean.value()?, sd)?,
            rng: seed.map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64),
        })
    }

    pub(crate) fn sample(&mut self) -> f64 {
        self.distribution.sample(&mut self.rng)
    }
}
