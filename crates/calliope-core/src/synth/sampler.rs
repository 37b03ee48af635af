//! Sampler voice bank - pitch-shifted playback of a sample zone
//!
//! Voices read mono sample data through linear interpolation at a rate
//! derived from the played note, the zone's root key and tuning, and the
//! sample-rate ratio between zone and engine. The same allocation policy
//! as the synthesiser bank applies.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::types::AudioBuffer;

/// Attack time of the fixed AHR envelope
const ATTACK_SECS: f32 = 0.010;
/// Release time of the fixed AHR envelope
const RELEASE_SECS: f32 = 0.300;

/// Loop behaviour when playback reaches the zone's loop end
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LoopMode {
    #[default]
    None,
    Forward,
    PingPong,
}

/// A playable region of sample data
#[derive(Debug, Clone)]
pub struct SamplerZone {
    /// Mono sample data
    pub data: Arc<Vec<f32>>,
    /// Native sample rate of the data
    pub sample_rate: u32,
    /// First playable sample
    pub sample_start: usize,
    /// One past the last playable sample
    pub sample_end: usize,
    /// Loop window start
    pub loop_start: usize,
    /// Loop window end
    pub loop_end: usize,
    /// MIDI key at which the data plays at native rate
    pub root_key: u8,
    /// Fine tuning in cents
    pub tune_cents: f32,
    pub loop_mode: LoopMode,
}

impl SamplerZone {
    /// Zone covering the whole of `data`, rooted at A4, no loop
    pub fn from_data(data: Arc<Vec<f32>>, sample_rate: u32) -> Self {
        let len = data.len();
        Self {
            data,
            sample_rate,
            sample_start: 0,
            sample_end: len,
            loop_start: 0,
            loop_end: len,
            root_key: 69,
            tune_cents: 0.0,
            loop_mode: LoopMode::None,
        }
    }

    /// Playback rate for a note at the given engine rate
    fn playback_rate(&self, note: u8, out_rate: u32) -> f64 {
        let semitones = note as f64 - self.root_key as f64 + self.tune_cents as f64 / 100.0;
        2.0_f64.powf(semitones / 12.0) * self.sample_rate as f64 / out_rate as f64
    }

    /// Read with linear interpolation, zero outside the playable window
    #[inline]
    fn read(&self, pos: f64) -> f32 {
        let idx = pos as usize;
        if pos < self.sample_start as f64 || idx >= self.sample_end {
            return 0.0;
        }
        let frac = (pos - idx as f64) as f32;
        let s0 = self.data[idx];
        let s1 = if idx + 1 < self.sample_end {
            self.data[idx + 1]
        } else {
            s0
        };
        s0 * (1.0 - frac) + s1 * frac
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum AhrStage {
    #[default]
    Off,
    Attack,
    Hold,
    Release,
}

/// One playing sample voice
#[derive(Debug, Clone, Copy, Default)]
struct SamplerVoice {
    active: bool,
    note: u8,
    velocity: u8,
    pos: f64,
    rate: f64,
    direction: f64,
    stage: AhrStage,
    env_level: f32,
    release_start_level: f32,
}

impl SamplerVoice {
    fn start(&mut self, zone: &SamplerZone, note: u8, velocity: u8, out_rate: u32) {
        self.active = true;
        self.note = note;
        self.velocity = velocity;
        self.pos = zone.sample_start as f64;
        self.rate = zone.playback_rate(note, out_rate);
        self.direction = 1.0;
        self.stage = AhrStage::Attack;
        self.env_level = 0.0;
        self.release_start_level = 0.0;
    }

    fn release(&mut self) {
        if self.stage != AhrStage::Release && self.stage != AhrStage::Off {
            self.release_start_level = self.env_level;
            self.stage = AhrStage::Release;
        }
    }
}

/// Fixed-polyphony sampler over one zone
pub struct SamplerVoiceBank {
    voices: Vec<SamplerVoice>,
    zone: SamplerZone,
}

impl SamplerVoiceBank {
    pub fn new(max_voices: usize, zone: SamplerZone) -> Self {
        Self {
            voices: vec![SamplerVoice::default(); max_voices.max(1)],
            zone,
        }
    }

    pub fn zone(&self) -> &SamplerZone {
        &self.zone
    }

    pub fn active_count(&self) -> usize {
        self.voices.iter().filter(|v| v.active).count()
    }

    /// Allocate a voice and start a note
    ///
    /// First inactive voice, else the quietest releasing voice, else
    /// slot 0 - the same policy as the synthesiser bank.
    pub fn note_on(&mut self, note: u8, velocity: u8, sample_rate: u32) {
        if let Some(i) = self.voices.iter().position(|v| !v.active) {
            self.voices[i].start(&self.zone, note, velocity, sample_rate);
            return;
        }
        let steal = self
            .voices
            .iter()
            .enumerate()
            .filter(|(_, v)| v.stage == AhrStage::Release)
            .min_by(|(_, a), (_, b)| a.env_level.total_cmp(&b.env_level))
            .map(|(i, _)| i);
        let slot = steal.unwrap_or(0);
        self.voices[slot].start(&self.zone, note, velocity, sample_rate);
    }

    /// Release every voice playing `note`
    pub fn note_off(&mut self, note: u8) {
        for v in &mut self.voices {
            if v.active && v.note == note {
                v.release();
            }
        }
    }

    /// Hard-stop every voice
    pub fn reset(&mut self) {
        for v in &mut self.voices {
            *v = SamplerVoice::default();
        }
    }

    /// Additively render all active voices into `out`
    pub fn render(&mut self, out: &mut AudioBuffer, sample_rate: u32) {
        let sr = sample_rate as f32;
        let attack_step = 1.0 / (ATTACK_SECS * sr);
        let channels = out.channels();
        let zone = &self.zone;

        for voice in &mut self.voices {
            if !voice.active {
                continue;
            }
            let vel_gain = voice.velocity as f32 / 127.0;
            // Linear slope from the level at release down to zero in 300 ms
            let release_step = voice.release_start_level / (RELEASE_SECS * sr);

            for frame in out.as_mut_slice().chunks_exact_mut(channels) {
                let sample = zone.read(voice.pos);

                match voice.stage {
                    AhrStage::Off => break,
                    AhrStage::Attack => {
                        voice.env_level += attack_step;
                        if voice.env_level >= 1.0 {
                            voice.env_level = 1.0;
                            voice.stage = AhrStage::Hold;
                        }
                    }
                    AhrStage::Hold => {}
                    AhrStage::Release => {
                        voice.env_level -= release_step;
                        if voice.env_level <= 0.0 {
                            voice.env_level = 0.0;
                            voice.stage = AhrStage::Off;
                        }
                    }
                }

                let value = sample * voice.env_level * vel_gain;
                for s in frame.iter_mut() {
                    *s += value;
                }

                voice.pos += voice.rate * voice.direction;

                match zone.loop_mode {
                    LoopMode::None => {
                        if voice.pos >= zone.sample_end as f64 {
                            voice.stage = AhrStage::Off;
                        }
                    }
                    LoopMode::Forward => {
                        if voice.pos >= zone.loop_end as f64 && zone.loop_end > zone.loop_start {
                            voice.pos = zone.loop_start as f64 + (voice.pos - zone.loop_end as f64);
                        }
                    }
                    LoopMode::PingPong => {
                        if voice.direction > 0.0 && voice.pos >= zone.loop_end as f64 {
                            voice.direction = -1.0;
                            voice.pos = zone.loop_end as f64 - (voice.pos - zone.loop_end as f64);
                        } else if voice.direction < 0.0 && voice.pos <= zone.loop_start as f64 {
                            voice.direction = 1.0;
                            voice.pos =
                                zone.loop_start as f64 + (zone.loop_start as f64 - voice.pos);
                        }
                    }
                }
            }

            if voice.stage == AhrStage::Off {
                voice.active = false;
            }
        }
    }
}
