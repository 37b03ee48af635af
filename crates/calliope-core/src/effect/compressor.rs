//! Compressor - peak-detecting downward compressor with makeup gain

use crate::effect::ParamInfo;
use crate::types::AudioBuffer;

/// Single-band compressor
///
/// A one-pole peak detector tracks the per-frame channel maximum with
/// separate attack and release coefficients; gain reduction is computed in
/// dB above threshold and applied linearly with makeup. The envelope
/// persists across blocks.
pub struct Compressor {
    threshold_db: f32,
    ratio: f32,
    attack_ms: f32,
    release_ms: f32,
    makeup_db: f32,
    env: f32,
}

impl Compressor {
    pub const PARAMS: &'static [ParamInfo] = &[
        ParamInfo::new("Threshold", -60.0, 0.0, -18.0, "dB"),
        ParamInfo::new("Ratio", 1.0, 20.0, 4.0, ":1"),
        ParamInfo::new("Attack", 0.1, 200.0, 10.0, "ms").logarithmic(),
        ParamInfo::new("Release", 5.0, 1000.0, 100.0, "ms").logarithmic(),
        ParamInfo::new("Makeup", 0.0, 24.0, 0.0, "dB"),
    ];

    pub fn new() -> Self {
        Self {
            threshold_db: Self::PARAMS[0].default,
            ratio: Self::PARAMS[1].default,
            attack_ms: Self::PARAMS[2].default,
            release_ms: Self::PARAMS[3].default,
            makeup_db: Self::PARAMS[4].default,
            env: 0.0,
        }
    }

    pub(crate) fn set_param(&mut self, index: usize, value: f32) {
        match index {
            0 => self.threshold_db = value,
            1 => self.ratio = value,
            2 => self.attack_ms = value,
            3 => self.release_ms = value,
            4 => self.makeup_db = value,
            _ => {}
        }
    }

    pub(crate) fn param(&self, index: usize) -> f32 {
        match index {
            0 => self.threshold_db,
            1 => self.ratio,
            2 => self.attack_ms,
            3 => self.release_ms,
            4 => self.makeup_db,
            _ => 0.0,
        }
    }

    pub(crate) fn process(&mut self, buffer: &mut AudioBuffer, sample_rate: u32) {
        let sr = sample_rate as f32;
        let attack = (-1.0 / (self.attack_ms * 0.001 * sr)).exp();
        let release = (-1.0 / (self.release_ms * 0.001 * sr)).exp();
        let threshold = 10.0_f32.powf(self.threshold_db / 20.0);
        let makeup = 10.0_f32.powf(self.makeup_db / 20.0);
        let slope = 1.0 - 1.0 / self.ratio;

        let channels = buffer.channels();
        for frame in buffer.as_mut_slice().chunks_exact_mut(channels) {
            let x = frame.iter().fold(0.0f32, |m, s| m.max(s.abs()));
            let coeff = if x > self.env { attack } else { release };
            self.env = coeff * self.env + (1.0 - coeff) * x;

            let reduction = if self.env > threshold {
                let db_above = 20.0 * (self.env / threshold).log10();
                10.0_f32.powf(-db_above * slope / 20.0)
            } else {
                1.0
            };

            let gain = reduction * makeup;
            for s in frame {
                *s *= gain;
            }
        }
    }

    pub(crate) fn reset(&mut self) {
        self.env = 0.0;
    }
}

impl Default for Compressor {
    fn default() -> Self {
        Self::new()
    }
}
