//! Noise gate - envelope follower with hold and smoothed gain

use crate::effect::ParamInfo;
use crate::types::AudioBuffer;

/// Smoothing coefficient while the gain is rising toward its target
const RISE_COEFF: f32 = 0.999;
/// Smoothing coefficient while the gain is falling
const FALL_COEFF: f32 = 0.995;

/// Downward expander / gate
///
/// The detector envelope opens the gate at the threshold and re-arms a
/// hold counter on every frame above it; once the hold runs out the gain
/// target drops to the range floor. The applied gain chases the target
/// through a one-pole smoother so transitions never click.
pub struct NoiseGate {
    threshold_db: f32,
    attack_ms: f32,
    release_ms: f32,
    hold_ms: f32,
    range_db: f32,
    env: f32,
    gain: f32,
    hold_remaining: u64,
}

impl NoiseGate {
    pub const PARAMS: &'static [ParamInfo] = &[
        ParamInfo::new("Threshold", -80.0, 0.0, -50.0, "dB"),
        ParamInfo::new("Attack", 0.1, 100.0, 5.0, "ms").logarithmic(),
        ParamInfo::new("Release", 5.0, 1000.0, 100.0, "ms").logarithmic(),
        ParamInfo::new("Hold", 0.0, 1000.0, 100.0, "ms"),
        ParamInfo::new("Range", -80.0, 0.0, -60.0, "dB"),
    ];

    pub fn new() -> Self {
        Self {
            threshold_db: Self::PARAMS[0].default,
            attack_ms: Self::PARAMS[1].default,
            release_ms: Self::PARAMS[2].default,
            hold_ms: Self::PARAMS[3].default,
            range_db: Self::PARAMS[4].default,
            env: 0.0,
            gain: 1.0,
            hold_remaining: 0,
        }
    }

    pub(crate) fn set_param(&mut self, index: usize, value: f32) {
        match index {
            0 => self.threshold_db = value,
            1 => self.attack_ms = value,
            2 => self.release_ms = value,
            3 => self.hold_ms = value,
            4 => self.range_db = value,
            _ => {}
        }
    }

    pub(crate) fn param(&self, index: usize) -> f32 {
        match index {
            0 => self.threshold_db,
            1 => self.attack_ms,
            2 => self.release_ms,
            3 => self.hold_ms,
            4 => self.range_db,
            _ => 0.0,
        }
    }

    pub(crate) fn process(&mut self, buffer: &mut AudioBuffer, sample_rate: u32) {
        let sr = sample_rate as f32;
        let attack = (-1.0 / (self.attack_ms * 0.001 * sr)).exp();
        let release = (-1.0 / (self.release_ms * 0.001 * sr)).exp();
        let threshold = 10.0_f32.powf(self.threshold_db / 20.0);
        let range = 10.0_f32.powf(self.range_db / 20.0);
        let hold_frames = (self.hold_ms * 0.001 * sr) as u64;

        let channels = buffer.channels();
        for frame in buffer.as_mut_slice().chunks_exact_mut(channels) {
            let x = frame.iter().fold(0.0f32, |m, s| m.max(s.abs()));
            let coeff = if x > self.env { attack } else { release };
            self.env = coeff * self.env + (1.0 - coeff) * x;

            let target = if self.env >= threshold {
                self.hold_remaining = hold_frames;
                1.0
            } else if self.hold_remaining > 0 {
                self.hold_remaining -= 1;
                1.0
            } else {
                range
            };

            let smooth = if target > self.gain {
                RISE_COEFF
            } else {
                FALL_COEFF
            };
            self.gain = smooth * self.gain + (1.0 - smooth) * target;

            for s in frame {
                *s *= self.gain;
            }
        }
    }

    pub(crate) fn reset(&mut self) {
        self.env = 0.0;
        self.gain = 1.0;
        self.hold_remaining = 0;
    }
}

impl Default for NoiseGate {
    fn default() -> Self {
        Self::new()
    }
}
