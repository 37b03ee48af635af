//! 3-band peaking EQ - RBJ cookbook biquads in series

use crate::effect::ParamInfo;
use crate::types::AudioBuffer;

/// Bands whose gain is within this of flat are skipped
const FLAT_DB: f32 = 0.1;

/// Q for the low and high bands
const SHOULDER_Q: f32 = 0.707;
/// Q for the mid band
const MID_Q: f32 = 1.0;

/// Biquad filter coefficients, normalised by a0
#[derive(Debug, Clone, Copy)]
struct BiquadCoeffs {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
}

impl BiquadCoeffs {
    /// RBJ peaking EQ coefficients
    fn peaking(freq: f32, gain_db: f32, q: f32, sample_rate: f32) -> Self {
        let a = 10.0_f32.powf(gain_db / 40.0);
        let w0 = 2.0 * std::f32::consts::PI * freq / sample_rate;
        let cos_w0 = w0.cos();
        let sin_w0 = w0.sin();
        let alpha = sin_w0 / (2.0 * q);

        let a0 = 1.0 + alpha / a;
        Self {
            b0: (1.0 + alpha * a) / a0,
            b1: (-2.0 * cos_w0) / a0,
            b2: (1.0 - alpha * a) / a0,
            a1: (-2.0 * cos_w0) / a0,
            a2: (1.0 - alpha / a) / a0,
        }
    }

    fn passthrough() -> Self {
        Self {
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
        }
    }
}

/// Per-channel filter history `(x1, x2, y1, y2)`
#[derive(Debug, Clone, Copy, Default)]
struct BiquadState {
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

impl BiquadState {
    #[inline]
    fn process(&mut self, input: f32, c: &BiquadCoeffs) -> f32 {
        let out = c.b0 * input + c.b1 * self.x1 + c.b2 * self.x2
            - c.a1 * self.y1
            - c.a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = out;
        out
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Three peaking bands in series
///
/// Parameters: frequency and gain per band (low / mid / high). Q is fixed
/// at 0.707 for the shoulder bands and 1.0 for the mid. Bands within
/// 0.1 dB of flat are skipped. Filter histories persist across blocks.
pub struct ThreeBandEq {
    freqs: [f32; 3],
    gains_db: [f32; 3],
    coeffs: [BiquadCoeffs; 3],
    active: [bool; 3],
    coeffs_rate: u32,
    dirty: bool,
    // state[band][channel]
    state: [[BiquadState; 2]; 3],
}

impl ThreeBandEq {
    pub const PARAMS: &'static [ParamInfo] = &[
        ParamInfo::new("Low Freq", 20.0, 500.0, 100.0, "Hz").logarithmic(),
        ParamInfo::new("Low Gain", -24.0, 24.0, 0.0, "dB"),
        ParamInfo::new("Mid Freq", 200.0, 5000.0, 1000.0, "Hz").logarithmic(),
        ParamInfo::new("Mid Gain", -24.0, 24.0, 0.0, "dB"),
        ParamInfo::new("High Freq", 2000.0, 16000.0, 8000.0, "Hz").logarithmic(),
        ParamInfo::new("High Gain", -24.0, 24.0, 0.0, "dB"),
    ];

    pub fn new() -> Self {
        Self {
            freqs: [
                Self::PARAMS[0].default,
                Self::PARAMS[2].default,
                Self::PARAMS[4].default,
            ],
            gains_db: [0.0; 3],
            coeffs: [BiquadCoeffs::passthrough(); 3],
            active: [false; 3],
            coeffs_rate: 0,
            dirty: true,
            state: [[BiquadState::default(); 2]; 3],
        }
    }

    pub(crate) fn set_param(&mut self, index: usize, value: f32) {
        match index {
            0 => self.freqs[0] = value,
            1 => self.gains_db[0] = value,
            2 => self.freqs[1] = value,
            3 => self.gains_db[1] = value,
            4 => self.freqs[2] = value,
            5 => self.gains_db[2] = value,
            _ => return,
        }
        self.dirty = true;
    }

    pub(crate) fn param(&self, index: usize) -> f32 {
        match index {
            0 => self.freqs[0],
            1 => self.gains_db[0],
            2 => self.freqs[1],
            3 => self.gains_db[1],
            4 => self.freqs[2],
            5 => self.gains_db[2],
            _ => 0.0,
        }
    }

    fn update_coeffs(&mut self, sample_rate: u32) {
        if !self.dirty && self.coeffs_rate == sample_rate {
            return;
        }
        let sr = sample_rate as f32;
        let qs = [SHOULDER_Q, MID_Q, SHOULDER_Q];
        for band in 0..3 {
            if self.gains_db[band].abs() < FLAT_DB {
                self.active[band] = false;
                self.coeffs[band] = BiquadCoeffs::passthrough();
            } else {
                self.active[band] = true;
                self.coeffs[band] =
                    BiquadCoeffs::peaking(self.freqs[band], self.gains_db[band], qs[band], sr);
            }
        }
        self.coeffs_rate = sample_rate;
        self.dirty = false;
    }

    pub(crate) fn process(&mut self, buffer: &mut AudioBuffer, sample_rate: u32) {
        self.update_coeffs(sample_rate);
        if !self.active.iter().any(|&a| a) {
            return;
        }

        let channels = buffer.channels();
        for frame in buffer.as_mut_slice().chunks_exact_mut(channels) {
            for (ch, s) in frame.iter_mut().enumerate() {
                let mut value = *s;
                for band in 0..3 {
                    if self.active[band] {
                        value = self.state[band][ch].process(value, &self.coeffs[band]);
                    }
                }
                *s = value;
            }
        }
    }

    pub(crate) fn reset(&mut self) {
        for band in &mut self.state {
            for ch in band {
                ch.reset();
            }
        }
    }
}

impl Default for ThreeBandEq {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_signal(frames: usize) -> Vec<f32> {
        (0..frames)
            .map(|i| {
                let t = i as f32 / 44100.0;
                0.4 * (2.0 * std::f32::consts::PI * 220.0 * t).sin()
                    + 0.2 * (2.0 * std::f32::consts::PI * 3000.0 * t).sin()
            })
            .collect()
    }

    #[test]
    fn test_flat_bands_are_identity() {
        let mut fx = ThreeBandEq::new();
        let mut buf = AudioBuffer::from_interleaved(test_signal(512), 1);
        let original = buf.clone();

        fx.process(&mut buf, 44100);
        assert_eq!(buf, original);
    }

    #[test]
    fn test_zero_gain_coeffs_are_identity() {
        // The peaking formula itself degenerates to unity at 0 dB
        let coeffs = BiquadCoeffs::peaking(1000.0, 0.0, 1.0, 44100.0);
        let mut state = BiquadState::default();

        for &x in test_signal(256).iter() {
            let y = state.process(x, &coeffs);
            assert!((y - x).abs() < 1e-6, "expected identity, {x} -> {y}");
        }
    }

    #[test]
    fn test_boost_raises_band_energy() {
        let mut fx = ThreeBandEq::new();
        fx.set_param(3, 12.0); // +12 dB at 1 kHz

        let samples: Vec<f32> = (0..4096)
            .map(|i| {
                let t = i as f32 / 44100.0;
                0.2 * (2.0 * std::f32::consts::PI * 1000.0 * t).sin()
            })
            .collect();
        let mut buf = AudioBuffer::from_interleaved(samples.clone(), 1);
        fx.process(&mut buf, 44100);

        let before: f32 = samples.iter().map(|s| s * s).sum();
        let after: f32 = buf.as_slice().iter().map(|s| s * s).sum();
        assert!(after > before * 2.0, "boost should raise energy");
    }

    #[test]
    fn test_cut_lowers_band_energy() {
        let mut fx = ThreeBandEq::new();
        fx.set_param(1, -18.0); // cut lows

        let samples: Vec<f32> = (0..4096)
            .map(|i| {
                let t = i as f32 / 44100.0;
                0.4 * (2.0 * std::f32::consts::PI * 100.0 * t).sin()
            })
            .collect();
        let mut buf = AudioBuffer::from_interleaved(samples.clone(), 1);
        // Run two blocks so the filter settles
        fx.process(&mut buf, 44100);
        let mut buf2 = AudioBuffer::from_interleaved(samples.clone(), 1);
        fx.process(&mut buf2, 44100);

        let before: f32 = samples[2048..].iter().map(|s| s * s).sum();
        let after: f32 = buf2.as_slice()[2048..].iter().map(|s| s * s).sum();
        assert!(after < before * 0.5, "cut should lower energy");
    }

    #[test]
    fn test_state_is_per_channel() {
        let mut fx = ThreeBandEq::new();
        fx.set_param(3, 12.0);

        // Left carries signal, right stays silent; they must not bleed
        let mut samples = Vec::with_capacity(1024);
        for i in 0..512 {
            let t = i as f32 / 44100.0;
            samples.push(0.4 * (2.0 * std::f32::consts::PI * 1000.0 * t).sin());
            samples.push(0.0);
        }
        let mut buf = AudioBuffer::from_interleaved(samples, 2);
        fx.process(&mut buf, 44100);

        for frame in buf.as_slice().chunks_exact(2) {
            assert_eq!(frame[1], 0.0);
        }
    }

    #[test]
    fn test_reset_clears_history() {
        let mut fx = ThreeBandEq::new();
        fx.set_param(1, 12.0);

        let mut buf = AudioBuffer::from_interleaved(vec![1.0; 256], 1);
        fx.process(&mut buf, 44100);
        fx.reset();

        let mut silent = AudioBuffer::silence(256, 1);
        fx.process(&mut silent, 44100);
        assert!(silent.as_slice().iter().all(|s| s.abs() < 1e-9));
    }
}
