//! Gain effect - dB volume control

use crate::effect::ParamInfo;
use crate::types::AudioBuffer;

/// A stateless gain stage
///
/// Parameters:
/// - Gain: -60 to +12 dB (0 dB = unity, skipped entirely)
pub struct Gain {
    gain_db: f32,
}

impl Gain {
    pub const PARAMS: &'static [ParamInfo] =
        &[ParamInfo::new("Gain", -60.0, 12.0, 0.0, "dB")];

    pub fn new() -> Self {
        Self {
            gain_db: Self::PARAMS[0].default,
        }
    }

    pub(crate) fn set_param(&mut self, index: usize, value: f32) {
        if index == 0 {
            self.gain_db = value;
        }
    }

    pub(crate) fn param(&self, index: usize) -> f32 {
        match index {
            0 => self.gain_db,
            _ => 0.0,
        }
    }

    pub(crate) fn process(&mut self, buffer: &mut AudioBuffer) {
        // apply_gain short-circuits near-unity factors
        buffer.apply_gain(10.0_f32.powf(self.gain_db / 20.0));
    }

    pub(crate) fn reset(&mut self) {
        // No state to reset
    }
}

impl Default for Gain {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_db_is_identity() {
        let mut fx = Gain::new();
        let mut buf = AudioBuffer::from_interleaved(vec![0.5, -0.25, 1.0, 0.0], 2);
        let original = buf.clone();

        fx.process(&mut buf);
        assert_eq!(buf, original);
    }

    #[test]
    fn test_minus_six_db_halves() {
        let mut fx = Gain::new();
        fx.set_param(0, -6.02);

        let mut buf = AudioBuffer::from_interleaved(vec![0.25; 1000], 2);
        fx.process(&mut buf);

        for &s in buf.as_slice() {
            assert!(
                (0.1249..=0.1253).contains(&s),
                "expected ~0.1251, got {s}"
            );
        }
    }

    #[test]
    fn test_positive_gain() {
        let mut fx = Gain::new();
        fx.set_param(0, 6.02);

        let mut buf = AudioBuffer::from_interleaved(vec![0.25], 1);
        fx.process(&mut buf);
        assert!((buf.as_slice()[0] - 0.5).abs() < 1e-3);
    }
}
