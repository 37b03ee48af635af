//! Fade effect - per-buffer envelope ramps

use crate::effect::ParamInfo;
use crate::types::AudioBuffer;

/// Linear fade-in/fade-out over the processed buffer
///
/// The ramps are anchored to the buffer passed to `process`: frame 0 is
/// the fade-in start, the last frame is the fade-out end. Zero-length
/// ramps pass through.
pub struct Fade {
    fade_in_ms: f32,
    fade_out_ms: f32,
}

impl Fade {
    pub const PARAMS: &'static [ParamInfo] = &[
        ParamInfo::new("Fade In", 0.0, 10_000.0, 0.0, "ms"),
        ParamInfo::new("Fade Out", 0.0, 10_000.0, 0.0, "ms"),
    ];

    pub fn new() -> Self {
        Self {
            fade_in_ms: Self::PARAMS[0].default,
            fade_out_ms: Self::PARAMS[1].default,
        }
    }

    pub(crate) fn set_param(&mut self, index: usize, value: f32) {
        match index {
            0 => self.fade_in_ms = value,
            1 => self.fade_out_ms = value,
            _ => {}
        }
    }

    pub(crate) fn param(&self, index: usize) -> f32 {
        match index {
            0 => self.fade_in_ms,
            1 => self.fade_out_ms,
            _ => 0.0,
        }
    }

    pub(crate) fn process(&mut self, buffer: &mut AudioBuffer, sample_rate: u32) {
        let total = buffer.frames() as f32;
        let channels = buffer.channels();
        let in_frames = self.fade_in_ms * sample_rate as f32 / 1000.0;
        let out_frames = self.fade_out_ms * sample_rate as f32 / 1000.0;
        if in_frames <= 0.0 && out_frames <= 0.0 {
            return;
        }

        for (f, frame) in buffer.as_mut_slice().chunks_exact_mut(channels).enumerate() {
            let f = f as f32;
            let mut gain = 1.0;
            if in_frames > 0.0 {
                gain *= (f / in_frames).min(1.0);
            }
            if out_frames > 0.0 {
                gain *= ((total - f) / out_frames).min(1.0);
            }
            for s in frame {
                *s *= gain;
            }
        }
    }

    pub(crate) fn reset(&mut self) {
        // No state to reset
    }
}

impl Default for Fade {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_fade_is_identity() {
        let mut fx = Fade::new();
        let mut buf = AudioBuffer::from_interleaved(vec![0.5; 64], 2);
        let original = buf.clone();

        fx.process(&mut buf, 44100);
        assert_eq!(buf, original);
    }

    #[test]
    fn test_fade_in_ramps_up() {
        let mut fx = Fade::new();
        // 100 frames of fade at 1 kHz "rate" keeps the numbers readable:
        // use 44100 Hz and 10 ms = 441 frames
        fx.set_param(0, 10.0);

        let mut buf = AudioBuffer::from_interleaved(vec![1.0; 1000], 1);
        fx.process(&mut buf, 44100);

        assert_eq!(buf.as_slice()[0], 0.0);
        assert!(buf.as_slice()[100] < buf.as_slice()[200]);
        assert!((buf.as_slice()[500] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_fade_out_reaches_silence() {
        let mut fx = Fade::new();
        fx.set_param(1, 10.0);

        let frames = 1000;
        let mut buf = AudioBuffer::from_interleaved(vec![1.0; frames], 1);
        fx.process(&mut buf, 44100);

        assert!((buf.as_slice()[0] - 1.0).abs() < 1e-6);
        let last = buf.as_slice()[frames - 1];
        assert!(last < 0.01, "tail should be near silent, got {last}");
    }
}
