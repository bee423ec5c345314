mod noise;
mod pulse;
mod utils;

pub(crate) use noise::{Noise, NoiseSource};
pub(crate) use pulse::{Pulse, PulseTemplate};
pub(crate) use utils::{Colour, JsonValueError, NumConstant};
