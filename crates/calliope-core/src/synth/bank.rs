//! Voice bank variant - a MIDI track's instrument
//!
//! Same tagged-variant dispatch as the effect system: one discriminant
//! branch per operation.

use crate::synth::sampler::SamplerVoiceBank;
use crate::synth::SynthVoiceBank;
use crate::types::AudioBuffer;

/// The instrument behind a MIDI track
pub enum VoiceBank {
    Synth(SynthVoiceBank),
    Sampler(SamplerVoiceBank),
}

impl VoiceBank {
    /// Start a note
    pub fn note_on(&mut self, note: u8, velocity: u8, sample_rate: u32) {
        match self {
            VoiceBank::Synth(bank) => bank.note_on(note, velocity),
            VoiceBank::Sampler(bank) => bank.note_on(note, velocity, sample_rate),
        }
    }

    /// Release a note
    pub fn note_off(&mut self, note: u8, sample_rate: u32) {
        match self {
            VoiceBank::Synth(bank) => bank.note_off(note, sample_rate),
            VoiceBank::Sampler(bank) => bank.note_off(note),
        }
    }

    /// Hard-stop every voice and zero voice state
    pub fn reset(&mut self) {
        match self {
            VoiceBank::Synth(bank) => bank.reset(),
            VoiceBank::Sampler(bank) => bank.reset(),
        }
    }

    /// Additively render active voices into `out`
    pub fn render(&mut self, out: &mut AudioBuffer, sample_rate: u32) {
        match self {
            VoiceBank::Synth(bank) => bank.render(out, sample_rate),
            VoiceBank::Sampler(bank) => bank.render(out, sample_rate),
        }
    }

    /// Number of sounding voices
    pub fn active_count(&self) -> usize {
        match self {
            VoiceBank::Synth(bank) => bank.active_count(),
            VoiceBank::Sampler(bank) => bank.active_count(),
        }
    }
}

impl From<SynthVoiceBank> for VoiceBank {
    fn from(bank: SynthVoiceBank) -> Self {
        VoiceBank::Synth(bank)
    }
}

impl From<SamplerVoiceBank> for VoiceBank {
    fn from(bank: SamplerVoiceBank) -> Self {
        VoiceBank::Sampler(bank)
    }
}
