//! The render-side engine
//!
//! Owned exclusively by the render worker thread. Drains the command
//! queue at the head of each block, renders through the master mixer,
//! and advances the transport. Everything here is deterministic and
//! allocation-free once the first block has been rendered.

use std::sync::Arc;

use crate::config::EngineConfig;
use crate::engine::command::{EffectTarget, EngineCommand, TrackRef};
use crate::engine::mixer::MasterMixer;
use crate::engine::telemetry::EngineAtomics;
use crate::engine::transport::{Transport, TransportState};
use crate::types::{AudioBuffer, Meters};

/// Real-time audio engine state
///
/// This struct runs exclusively on the render thread; the control side
/// reaches it only through the command queue and reads it only through
/// telemetry.
pub struct AudioEngine {
    config: EngineConfig,
    mixer: MasterMixer,
    transport: Transport,
    atomics: Arc<EngineAtomics>,
}

impl AudioEngine {
    pub fn new(config: EngineConfig, mixer: MasterMixer, atomics: Arc<EngineAtomics>) -> Self {
        debug_assert_eq!(mixer.sample_rate(), config.sample_rate);
        debug_assert_eq!(mixer.channels(), config.channels);
        Self {
            config,
            mixer,
            transport: Transport::new(),
            atomics,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[inline]
    pub fn transport_state(&self) -> TransportState {
        self.transport.state()
    }

    #[inline]
    pub fn cursor(&self) -> u64 {
        self.transport.cursor()
    }

    pub fn meters(&self) -> Meters {
        self.mixer.meters()
    }

    /// The most recently rendered master block
    pub fn output(&self) -> &AudioBuffer {
        self.mixer.output()
    }

    pub fn mixer(&self) -> &MasterMixer {
        &self.mixer
    }

    pub fn mixer_mut(&mut self) -> &mut MasterMixer {
        &mut self.mixer
    }

    /// Drain and apply every pending command
    ///
    /// Called at the start of each loop iteration, before rendering, so
    /// all commands enqueued before block *n* are observed by block *n*.
    /// `rtrb`'s pop is wait-free; an empty queue returns immediately.
    pub fn process_commands(&mut self, rx: &mut rtrb::Consumer<EngineCommand>) {
        while let Ok(cmd) = rx.pop() {
            self.apply_command(cmd);
        }
        self.atomics.store_transport(self.transport.state());
        self.atomics.store_cursor(self.transport.cursor());
    }

    fn apply_command(&mut self, cmd: EngineCommand) {
        match cmd {
            // Transport
            EngineCommand::Play => self.transport.play(),
            EngineCommand::Pause => self.transport.pause(),
            EngineCommand::Stop => {
                if self.transport.stop() {
                    self.mixer.reset_all();
                }
            }
            EngineCommand::Seek { frame } => {
                if self.transport.seek(frame) {
                    self.mixer.reset_all();
                }
            }

            // Parameters
            EngineCommand::SetParam {
                target,
                effect,
                param,
                value,
            } => {
                let chain = match target {
                    EffectTarget::Master => Some(self.mixer.master_effects_mut()),
                    EffectTarget::Track(TrackRef::Audio(i)) => {
                        self.mixer.audio_track_mut(i).map(|t| &mut t.effects)
                    }
                    EffectTarget::Track(TrackRef::Midi(i)) => {
                        self.mixer.midi_track_mut(i).map(|t| &mut t.effects)
                    }
                };
                if let Some(fx) = chain.and_then(|c| c.effect_mut(effect)) {
                    fx.set_param(param, value);
                }
            }

            // MIDI injection
            EngineCommand::NoteOn {
                track,
                note,
                velocity,
            } => {
                let sample_rate = self.config.sample_rate;
                if let Some(t) = self.mixer.midi_track_mut(track) {
                    t.inject_note_on(note, velocity, sample_rate);
                }
            }
            EngineCommand::NoteOff { track, note } => {
                let sample_rate = self.config.sample_rate;
                if let Some(t) = self.mixer.midi_track_mut(track) {
                    t.inject_note_off(note, sample_rate);
                }
            }

            // Track strip
            EngineCommand::SetTrackVolume { track, volume } => {
                let volume = volume.max(0.0);
                match track {
                    TrackRef::Audio(i) => {
                        if let Some(t) = self.mixer.audio_track_mut(i) {
                            t.volume = volume;
                        }
                    }
                    TrackRef::Midi(i) => {
                        if let Some(t) = self.mixer.midi_track_mut(i) {
                            t.volume = volume;
                        }
                    }
                }
            }
            EngineCommand::SetTrackPan { track, pan } => {
                let pan = pan.clamp(-1.0, 1.0);
                match track {
                    TrackRef::Audio(i) => {
                        if let Some(t) = self.mixer.audio_track_mut(i) {
                            t.pan = pan;
                        }
                    }
                    TrackRef::Midi(i) => {
                        if let Some(t) = self.mixer.midi_track_mut(i) {
                            t.pan = pan;
                        }
                    }
                }
            }
            EngineCommand::SetTrackMute { track, muted } => match track {
                TrackRef::Audio(i) => {
                    if let Some(t) = self.mixer.audio_track_mut(i) {
                        t.muted = muted;
                    }
                }
                TrackRef::Midi(i) => {
                    if let Some(t) = self.mixer.midi_track_mut(i) {
                        t.muted = muted;
                    }
                }
            },
            EngineCommand::SetTrackSolo { track, soloed } => match track {
                TrackRef::Audio(i) => {
                    if let Some(t) = self.mixer.audio_track_mut(i) {
                        t.soloed = soloed;
                    }
                }
                TrackRef::Midi(i) => {
                    if let Some(t) = self.mixer.midi_track_mut(i) {
                        t.soloed = soloed;
                    }
                }
            },

            // Global
            EngineCommand::SetMasterGain { gain } => self.mixer.set_master_gain(gain),
            EngineCommand::SetBpm { bpm } => self.mixer.set_bpm(bpm),

            EngineCommand::SwapClipSource {
                track,
                clip,
                source,
            } => {
                // Control side already refuses this while rolling; a stale
                // command racing a Play is dropped rather than applied
                if self.transport.state() != TransportState::Stopped {
                    return;
                }
                log::debug!("swapping source of clip {clip} on track {track}");
                if let Some(t) = self.mixer.audio_track_mut(track) {
                    t.swap_clip_source(clip, source);
                }
            }
        }
    }

    /// Render one block at the current cursor
    pub fn render_block(&mut self) {
        let cursor = self.transport.cursor();
        self.mixer.render(cursor, self.config.buffer_frames);
        self.atomics.store_anomalies(self.mixer.anomaly_count());
    }

    /// Advance the cursor after a rendered block, stopping at project end
    pub fn advance_after_block(&mut self) {
        if self.transport.state() != TransportState::Playing {
            return;
        }
        self.transport.advance(self.config.buffer_frames as u64);

        let total = self.mixer.total_duration_frames();
        if total > 0 && self.transport.cursor() >= total {
            if self.transport.end_of_project() {
                self.mixer.reset_all();
            }
        }
        self.atomics.store_transport(self.transport.state());
        self.atomics.store_cursor(self.transport.cursor());
    }
}
