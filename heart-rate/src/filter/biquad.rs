use super::Filter;
use heart_rate_common::Real;

/// A second order section, evaluated in direct form II.
#[derive(Default, Clone, Debug, PartialEq)]
pub(super) struct Biquad {
    b0: Real,
    b1: Real,
    b2: Real,
    a1: Real,
    a2: Real,
    /// Delay line, most recent first.
    z: [Real; 2],
}

impl Biquad {
    /// Bandpass section with constant 0 dB peak gain, from the bilinear transform.
    ///
    /// # Parameters
    /// - omega: centre frequency in radians per sample.
    /// - alpha: `sin(omega)` scaled by the section's bandwidth or quality factor.
    pub(super) fn bandpass(omega: Real, alpha: Real) -> Self {
        let a0 = 1.0 + alpha;
        Self {
            b0: alpha / a0,
            b1: 0.0,
            b2: -alpha / a0,
            a1: -2.0 * omega.cos() / a0,
            a2: (1.0 - alpha) / a0,
            z: Default::default(),
        }
    }
}

impl Filter for Biquad {
    fn step(&mut self, input: Real) -> Real {
        let [z0, z1] = self.z;
        let w = input - self.a1 * z0 - self.a2 * z1;
        let output = self.b0 * w + self.b1 * z0 + self.b2 * z1;
        self.z = [w, z0];
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use std::f64::consts::PI;

    #[test]
    fn impulse_response_starts_with_numerator() {
        let mut biquad = Biquad::bandpass(PI / 2.0, 0.5);
        // a0 = 1.5, cos(pi/2) = 0
        assert_approx_eq!(biquad.step(1.0), 1.0 / 3.0);
        assert_approx_eq!(biquad.step(0.0), 0.0);
        // w = -a2 * 1 = -1/3, output = b2 * 1 = -1/3
        assert_approx_eq!(biquad.step(0.0), -1.0 / 3.0 - 1.0 / 3.0 * 1.0 / 3.0);
    }

    #[test]
    fn no_gain_at_dc() {
        let biquad = Biquad::bandpass(0.3, 0.25);
        assert_approx_eq!(biquad.b0 + biquad.b1 + biquad.b2, 0.0);
    }
}
