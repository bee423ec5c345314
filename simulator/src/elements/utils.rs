use serde::Deserialize;
use std::{
    env::{self, VarError},
    num::{ParseFloatError, ParseIntError},
    str::FromStr,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum JsonValueError {
    #[error("Cannot Extract Environment Variable")]
    EnvVar(#[from] VarError),
    #[error("Invalid String to Float: {0}")]
    FloatFromStr(#[from] ParseFloatError),
    #[error("Invalid String to Int: {0}")]
    IntFromStr(#[from] ParseIntError),
    #[error("Standard deviation {0} must not be negative")]
    NegativeDeviation(f64),
    #[error("Invalid Normal Distribution: {0}")]
    NormalDistribution(#[from] rand_distr::NormalError),
}

/// A number given either literally or by naming the environment variable holding it.
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "kebab-case")]
pub(crate) enum NumConstant<T> {
    Const(T),
    FromEnvVar(String),
}

impl<T> NumConstant<T>
where
    T: FromStr + Copy,
    JsonValueError: From<<T as FromStr>::Err>,
{
    pub(crate) fn value(&self) -> Result<T, JsonValueError> {
        match self {
            Self::Const(v) => Ok(*v),
            Self::FromEnvVar(environment_variable) => Ok(env::var(environment_variable)?.parse()?),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub(crate) struct Colour {
    pub(crate) r: NumConstant<f64>,
    pub(crate) g: NumConstant<f64>,
    pub(crate) b: NumConstant<f64>,
}

impl Colour {
    pub(crate) fn value(&self) -> Result<[f64; 3], JsonValueError> {
        Ok([self.r.value()?, self.g.value()?, self.b.value()?])
    }
}
