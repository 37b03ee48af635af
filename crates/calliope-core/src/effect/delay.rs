//! Delay effect - feedback delay line on the shared ring buffer

use crate::effect::ParamInfo;
use crate::ring::RingBuffer;
use crate::types::AudioBuffer;

/// Seconds of delay line to allocate per channel
const LINE_SECONDS: f32 = 2.1;

/// Feedback delay
///
/// Parameters:
/// - Time: delay in ms (1-2000)
/// - Feedback: amount fed back into the line (0-95%)
/// - Mix: dry/wet balance
///
/// The line is one interleaved ring sized `ceil(2.1 * sample_rate) *
/// channels`, allocated on the first process call at a stable rate.
pub struct Delay {
    time_ms: f32,
    feedback: f32,
    mix: f32,
    line: Option<RingBuffer>,
    line_rate: u32,
    line_channels: usize,
}

impl Delay {
    pub const PARAMS: &'static [ParamInfo] = &[
        ParamInfo::new("Time", 1.0, 2000.0, 350.0, "ms").logarithmic(),
        ParamInfo::new("Feedback", 0.0, 0.95, 0.35, ""),
        ParamInfo::new("Mix", 0.0, 1.0, 0.3, ""),
    ];

    pub fn new() -> Self {
        Self {
            time_ms: Self::PARAMS[0].default,
            feedback: Self::PARAMS[1].default,
            mix: Self::PARAMS[2].default,
            line: None,
            line_rate: 0,
            line_channels: 0,
        }
    }

    pub(crate) fn set_param(&mut self, index: usize, value: f32) {
        match index {
            0 => self.time_ms = value,
            1 => self.feedback = value,
            2 => self.mix = value,
            _ => {}
        }
    }

    pub(crate) fn param(&self, index: usize) -> f32 {
        match index {
            0 => self.time_ms,
            1 => self.feedback,
            2 => self.mix,
            _ => 0.0,
        }
    }

    fn ensure_line(&mut self, sample_rate: u32, channels: usize) {
        let stale = self.line.is_none()
            || self.line_rate != sample_rate
            || self.line_channels != channels;
        if stale {
            let size = (LINE_SECONDS * sample_rate as f32).ceil() as usize * channels;
            self.line = Some(RingBuffer::new(size));
            self.line_rate = sample_rate;
            self.line_channels = channels;
        }
    }

    pub(crate) fn process(&mut self, buffer: &mut AudioBuffer, sample_rate: u32) {
        let channels = buffer.channels();
        self.ensure_line(sample_rate, channels);
        let Some(line) = self.line.as_mut() else {
            return;
        };

        let delay_samples = ((self.time_ms * sample_rate as f32 / 1000.0).round() as usize
            * channels)
            .clamp(1, line.len() - 1);
        let feedback = self.feedback;
        let mix = self.mix;
        let dry = 1.0 - mix;

        for s in buffer.as_mut_slice() {
            let input = *s;
            let delayed = line.read_at(delay_samples - 1);
            line.write(input + delayed * feedback);
            *s = input * dry + delayed * mix;
        }
    }

    pub(crate) fn reset(&mut self) {
        if let Some(line) = &mut self.line {
            line.reset();
        }
    }
}

impl Default for Delay {
    fn default() -> Self {
        Self::new()
    }
}
