//! Master mixer - sums tracks into the master bus
//!
//! Per block: clear the master scratch, resolve the solo picture, render
//! every track, sum, run the master chain, apply master gain, clamp (NaN
//! flushes count as anomalies), measure. The master scratch is allocated
//! once at engine construction.

use crate::config::EngineConfig;
use crate::effect::EffectChain;
use crate::engine::track::{AudioTrack, MidiTrack};
use crate::time::ticks_to_frames;
use crate::types::{AudioBuffer, Meters, Sample};

/// Tempo limits for `set_bpm`
pub const MIN_BPM: f64 = 20.0;
pub const MAX_BPM: f64 = 300.0;
const DEFAULT_BPM: f64 = 120.0;

/// The master bus and everything routed into it
pub struct MasterMixer {
    audio_tracks: Vec<AudioTrack>,
    midi_tracks: Vec<MidiTrack>,
    master: AudioBuffer,
    master_effects: EffectChain,
    master_gain: Sample,
    bpm: f64,
    sample_rate: u32,
    channels: usize,
    buffer_frames: usize,
    last_meters: Meters,
    anomaly_count: u64,
}

impl MasterMixer {
    /// Create a mixer with no tracks
    pub fn new(sample_rate: u32, channels: usize, buffer_frames: usize) -> Self {
        Self {
            audio_tracks: Vec::new(),
            midi_tracks: Vec::new(),
            master: AudioBuffer::silence(buffer_frames, channels),
            master_effects: EffectChain::new(),
            master_gain: 1.0,
            bpm: DEFAULT_BPM,
            sample_rate,
            channels,
            buffer_frames,
            last_meters: Meters::default(),
            anomaly_count: 0,
        }
    }

    /// Create a mixer sized for an engine configuration
    pub fn for_config(config: &EngineConfig) -> Self {
        Self::new(config.sample_rate, config.channels, config.buffer_frames)
    }

    /// Add an audio track, sizing its scratch for this engine
    pub fn add_audio_track(&mut self, mut track: AudioTrack) {
        track.prepare(self.buffer_frames, self.channels);
        self.audio_tracks.push(track);
    }

    /// Add a MIDI track, sizing its scratch for this engine
    pub fn add_midi_track(&mut self, mut track: MidiTrack) {
        track.prepare(self.buffer_frames, self.channels);
        self.midi_tracks.push(track);
    }

    pub fn audio_tracks(&self) -> &[AudioTrack] {
        &self.audio_tracks
    }

    pub fn midi_tracks(&self) -> &[MidiTrack] {
        &self.midi_tracks
    }

    pub fn audio_track_mut(&mut self, index: usize) -> Option<&mut AudioTrack> {
        self.audio_tracks.get_mut(index)
    }

    pub fn midi_track_mut(&mut self, index: usize) -> Option<&mut MidiTrack> {
        self.midi_tracks.get_mut(index)
    }

    /// The master bus effect chain
    pub fn master_effects_mut(&mut self) -> &mut EffectChain {
        &mut self.master_effects
    }

    pub fn set_master_gain(&mut self, gain: Sample) {
        self.master_gain = gain.max(0.0);
    }

    pub fn master_gain(&self) -> Sample {
        self.master_gain
    }

    /// Set the project tempo, clamped to [20, 300] BPM
    pub fn set_bpm(&mut self, bpm: f64) {
        self.bpm = bpm.clamp(MIN_BPM, MAX_BPM);
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Meters of the most recent block
    pub fn meters(&self) -> Meters {
        self.last_meters
    }

    /// Non-finite samples flushed by the final clamp so far
    pub fn anomaly_count(&self) -> u64 {
        self.anomaly_count
    }

    /// Whether any track is soloed (single pass over both lists)
    fn any_solo(&self) -> bool {
        self.audio_tracks.iter().any(|t| t.soloed)
            || self.midi_tracks.iter().any(|t| t.soloed)
    }

    /// Render one block starting at `start_frame` into the master bus
    pub fn render(&mut self, start_frame: u64, frames: usize) -> &AudioBuffer {
        self.master.set_len_from_capacity(frames);
        self.master.clear();

        let any_solo = self.any_solo();

        for track in &mut self.audio_tracks {
            track.render(start_frame, frames, self.sample_rate, any_solo);
            self.master.mix_from(track.scratch(), 1.0);
        }
        for track in &mut self.midi_tracks {
            track.render(start_frame, frames, self.sample_rate, self.bpm, any_solo);
            self.master.mix_from(track.scratch(), 1.0);
        }

        self.master_effects.process(&mut self.master, self.sample_rate);
        self.master.apply_gain(self.master_gain);
        self.anomaly_count += self.master.clamp() as u64;
        self.last_meters = self.master.meters();

        &self.master
    }

    /// The most recently rendered master block
    pub fn output(&self) -> &AudioBuffer {
        &self.master
    }

    /// Project length in frames: the furthest clip end over all tracks
    pub fn total_duration_frames(&self) -> u64 {
        let audio = self
            .audio_tracks
            .iter()
            .map(AudioTrack::end_frame)
            .max()
            .unwrap_or(0);
        let midi = self
            .midi_tracks
            .iter()
            .map(|t| ticks_to_frames(t.end_tick(), self.bpm, self.sample_rate))
            .max()
            .unwrap_or(0);
        audio.max(midi)
    }

    /// Zero every stateful DSP unit, leaving parameter values alone
    pub fn reset_all(&mut self) {
        for track in &mut self.audio_tracks {
            track.reset();
        }
        for track in &mut self.midi_tracks {
            track.reset();
        }
        self.master_effects.reset();
    }
}
