//! Polyphonic synthesiser voice bank
//!
//! A fixed array of voices, each a pair of detuned oscillators shaped by
//! a linear ADSR envelope. Voices are pre-allocated at bank creation;
//! note-on rewrites an array slot in place, so rendering never allocates.

pub mod bank;
pub mod sampler;

pub use bank::VoiceBank;
pub use sampler::{LoopMode, SamplerVoiceBank, SamplerZone};

use std::f32::consts::{PI, TAU};

use serde::{Deserialize, Serialize};

use crate::types::AudioBuffer;

/// Oscillator waveform shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Waveform {
    #[default]
    Sine,
    Saw,
    Square,
    Triangle,
}

impl Waveform {
    /// Evaluate the waveform at phase `[0, 2pi)`
    #[inline]
    fn sample(self, phase: f32) -> f32 {
        match self {
            Waveform::Sine => phase.sin(),
            Waveform::Saw => 1.0 - 2.0 * (phase / TAU),
            Waveform::Square => {
                if phase < PI {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Triangle => 2.0 * (2.0 * (phase / TAU) - 1.0).abs() - 1.0,
        }
    }
}

/// Bank-level synthesiser settings
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SynthParams {
    pub waveform: Waveform,
    /// Attack time in seconds
    pub attack: f32,
    /// Decay time in seconds
    pub decay: f32,
    /// Sustain level [0, 1]
    pub sustain: f32,
    /// Release time in seconds
    pub release: f32,
    /// Second-oscillator detune in cents
    pub detune_cents: f32,
    /// Output level applied to every voice
    pub master_volume: f32,
}

impl Default for SynthParams {
    fn default() -> Self {
        Self {
            waveform: Waveform::Sine,
            attack: 0.01,
            decay: 0.1,
            sustain: 0.7,
            release: 0.2,
            detune_cents: 0.0,
            master_volume: 0.5,
        }
    }
}

/// Envelope stage of one voice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnvStage {
    #[default]
    Off,
    Attack,
    Decay,
    Sustain,
    Release,
}

/// One note's DSP state inside the bank
#[derive(Debug, Clone, Copy, Default)]
struct SynthVoice {
    active: bool,
    note: u8,
    velocity: u8,
    phase: f32,
    phase_detune: f32,
    freq: f32,
    freq_detune: f32,
    stage: EnvStage,
    env_level: f32,
    release_start_level: f32,
    release_samples_remaining: u64,
}

impl SynthVoice {
    fn start(&mut self, note: u8, velocity: u8, detune_cents: f32) {
        self.active = true;
        self.note = note;
        self.velocity = velocity;
        self.phase = 0.0;
        self.phase_detune = 0.0;
        self.freq = 440.0 * 2.0_f32.powf((note as f32 - 69.0) / 12.0);
        self.freq_detune = self.freq * 2.0_f32.powf(detune_cents / 1200.0);
        self.stage = EnvStage::Attack;
        self.env_level = 0.0;
        self.release_start_level = 0.0;
        self.release_samples_remaining = 0;
    }

    fn release(&mut self, release_secs: f32, sample_rate: u32) {
        self.stage = EnvStage::Release;
        self.release_start_level = self.env_level;
        self.release_samples_remaining = (release_secs * sample_rate as f32) as u64;
    }

    /// Advance the envelope by one frame
    #[inline]
    fn advance_envelope(&mut self, params: &SynthParams, sample_rate: u32) {
        let sr = sample_rate as f32;
        match self.stage {
            EnvStage::Off => {}
            EnvStage::Attack => {
                let step = if params.attack > 0.0 {
                    1.0 / (params.attack * sr)
                } else {
                    1.0
                };
                self.env_level += step;
                if self.env_level >= 1.0 {
                    self.env_level = 1.0;
                    self.stage = EnvStage::Decay;
                }
            }
            EnvStage::Decay => {
                let step = if params.decay > 0.0 {
                    (1.0 - params.sustain) / (params.decay * sr)
                } else {
                    1.0
                };
                self.env_level -= step;
                if self.env_level <= params.sustain {
                    self.env_level = params.sustain;
                    self.stage = EnvStage::Sustain;
                }
            }
            EnvStage::Sustain => {
                self.env_level = params.sustain;
            }
            EnvStage::Release => {
                if self.release_samples_remaining > 0 {
                    self.release_samples_remaining -= 1;
                }
                let total = params.release * sr;
                self.env_level = if total > 0.0 {
                    self.release_start_level * self.release_samples_remaining as f32 / total
                } else {
                    0.0
                };
                if self.release_samples_remaining == 0 {
                    self.env_level = 0.0;
                    self.stage = EnvStage::Off;
                }
            }
        }
    }
}

/// Fixed-polyphony synthesiser
pub struct SynthVoiceBank {
    voices: Vec<SynthVoice>,
    params: SynthParams,
}

impl SynthVoiceBank {
    /// Create a bank with `max_voices` pre-allocated voices
    pub fn new(max_voices: usize, params: SynthParams) -> Self {
        Self {
            voices: vec![SynthVoice::default(); max_voices.max(1)],
            params,
        }
    }

    /// Bank settings
    pub fn params(&self) -> &SynthParams {
        &self.params
    }

    /// Mutable bank settings (control side, before the engine starts)
    pub fn params_mut(&mut self) -> &mut SynthParams {
        &mut self.params
    }

    /// Number of voices currently sounding
    pub fn active_count(&self) -> usize {
        self.voices.iter().filter(|v| v.active).count()
    }

    /// Allocate a voice and start a note
    ///
    /// Picks the first inactive voice; failing that, steals the releasing
    /// voice with the lowest envelope; failing that, overwrites slot 0.
    pub fn note_on(&mut self, note: u8, velocity: u8) {
        let detune = self.params.detune_cents;

        if let Some(v) = self.voices.iter_mut().find(|v| !v.active) {
            v.start(note, velocity, detune);
            return;
        }

        let steal = self
            .voices
            .iter_mut()
            .filter(|v| v.stage == EnvStage::Release)
            .min_by(|a, b| a.env_level.total_cmp(&b.env_level));
        if let Some(v) = steal {
            v.start(note, velocity, detune);
            return;
        }

        self.voices[0].start(note, velocity, detune);
    }

    /// Release every voice playing `note` that is not already releasing
    pub fn note_off(&mut self, note: u8, sample_rate: u32) {
        let release = self.params.release;
        for v in &mut self.voices {
            if v.active && v.note == note && v.stage != EnvStage::Release {
                v.release(release, sample_rate);
            }
        }
    }

    /// Hard-stop every voice and zero all voice state
    pub fn reset(&mut self) {
        for v in &mut self.voices {
            *v = SynthVoice::default();
        }
    }

    /// Additively render all active voices into `out`
    pub fn render(&mut self, out: &mut AudioBuffer, sample_rate: u32) {
        let sr = sample_rate as f32;
        let channels = out.channels();
        let params = self.params;
        let master = params.master_volume;

        for voice in &mut self.voices {
            if !voice.active {
                continue;
            }
            let vel_gain = voice.velocity as f32 / 127.0;
            let phase_inc = TAU * voice.freq / sr;
            let phase_inc_detune = TAU * voice.freq_detune / sr;

            for frame in out.as_mut_slice().chunks_exact_mut(channels) {
                if voice.stage == EnvStage::Off {
                    break;
                }
                let osc = (params.waveform.sample(voice.phase)
                    + params.waveform.sample(voice.phase_detune))
                    / 2.0;

                voice.advance_envelope(&params, sample_rate);

                let sample = osc * voice.env_level * vel_gain * master;
                for s in frame.iter_mut() {
                    *s += sample;
                }

                voice.phase += phase_inc;
                if voice.phase >= TAU {
                    voice.phase -= TAU;
                }
                voice.phase_detune += phase_inc_detune;
                if voice.phase_detune >= TAU {
                    voice.phase_detune -= TAU;
                }
            }

            if voice.stage == EnvStage::Off {
                voice.active = false;
            }
        }
    }
}
