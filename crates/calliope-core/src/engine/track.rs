//! Tracks - clip playback through effects into a per-track scratch buffer
//!
//! An audio track sums its clips' source windows; a MIDI track schedules
//! note events into its voice bank and renders the bank. Both then run
//! their effect chain and apply volume and constant-power pan into the
//! scratch buffer the mixer reads.

use std::f32::consts::FRAC_PI_4;
use std::sync::Arc;

use crate::clip::{AudioClip, MidiClip};
use crate::effect::EffectChain;
use crate::synth::VoiceBank;
use crate::time::block_tick_window;
use crate::types::{AudioBuffer, Sample};

/// Reserve this many simultaneous active-note slots per track
const ACTIVE_NOTE_CAPACITY: usize = 128;

/// Whether a track sounds under the current mute/solo picture
///
/// Mute always wins; otherwise a solo anywhere silences everything not
/// soloed.
#[inline]
fn audible(muted: bool, soloed: bool, any_solo: bool) -> bool {
    !muted && (!any_solo || soloed)
}

/// Apply track volume and constant-power pan to an interleaved buffer
///
/// Stereo: left gain `cos((pan+1)*pi/4)`, right gain `sin((pan+1)*pi/4)`.
/// Mono buffers take the volume only.
fn apply_volume_pan(buffer: &mut AudioBuffer, volume: Sample, pan: Sample) {
    if buffer.channels() == 2 {
        let theta = (pan + 1.0) * FRAC_PI_4;
        let left = volume * theta.cos();
        let right = volume * theta.sin();
        for frame in buffer.as_mut_slice().chunks_exact_mut(2) {
            frame[0] *= left;
            frame[1] *= right;
        }
    } else {
        buffer.apply_gain(volume);
    }
}

/// A track of audio clips
pub struct AudioTrack {
    pub id: u64,
    pub name: String,
    pub volume: Sample,
    /// Pan position [-1, 1]
    pub pan: Sample,
    pub muted: bool,
    pub soloed: bool,
    pub clips: Vec<AudioClip>,
    pub effects: EffectChain,
    scratch: AudioBuffer,
}

impl AudioTrack {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            volume: 1.0,
            pan: 0.0,
            muted: false,
            soloed: false,
            clips: Vec::new(),
            effects: EffectChain::new(),
            scratch: AudioBuffer::silence(0, 1),
        }
    }

    /// Allocate the scratch buffer for the engine's block size
    pub(crate) fn prepare(&mut self, buffer_frames: usize, channels: usize) {
        self.scratch = AudioBuffer::silence(buffer_frames, channels);
    }

    /// The last rendered block
    pub(crate) fn scratch(&self) -> &AudioBuffer {
        &self.scratch
    }

    /// Largest end frame over all clips
    pub fn end_frame(&self) -> u64 {
        self.clips.iter().map(AudioClip::end_frame).max().unwrap_or(0)
    }

    /// Replace a clip's source buffer (render worker, Stopped only)
    pub(crate) fn swap_clip_source(&mut self, clip_index: usize, source: Arc<AudioBuffer>) {
        if let Some(clip) = self.clips.get_mut(clip_index) {
            clip.source = source;
        }
    }

    /// Render one block into the track scratch
    pub(crate) fn render(
        &mut self,
        start_frame: u64,
        frames: usize,
        sample_rate: u32,
        any_solo: bool,
    ) {
        self.scratch.set_len_from_capacity(frames);
        self.scratch.clear();
        if !audible(self.muted, self.soloed, any_solo) {
            return;
        }

        let channels = self.scratch.channels();
        for clip in &self.clips {
            let clip_start = clip.start_frame;
            let clip_end = clip.end_frame();
            let block_end = start_frame + frames as u64;
            if clip_end <= start_frame || clip_start >= block_end {
                continue;
            }

            let from = clip_start.max(start_frame);
            let to = clip_end.min(block_end);
            let source = clip.source.as_ref();
            let src_channels = source.channels();
            let src_frames = source.frames() as u64;

            for p in from..to {
                let src_frame = clip.trim_start_frame + (p - clip_start);
                if src_frame >= src_frames {
                    continue;
                }
                let f = (p - start_frame) as usize;
                let base = f * channels;
                for ch in 0..channels {
                    // Mono sources broadcast to every output channel
                    let src_ch = if src_channels == 1 { 0 } else { ch };
                    self.scratch.as_mut_slice()[base + ch] +=
                        source.sample(src_frame as usize, src_ch) * clip.volume;
                }
            }
        }

        self.effects.process(&mut self.scratch, sample_rate);
        apply_volume_pan(&mut self.scratch, self.volume, self.pan);
    }

    /// Clear effect state
    pub(crate) fn reset(&mut self) {
        self.effects.reset();
    }
}

/// A track of MIDI clips driving a voice bank
pub struct MidiTrack {
    pub id: u64,
    pub name: String,
    pub volume: Sample,
    /// Pan position [-1, 1]
    pub pan: Sample,
    pub muted: bool,
    pub soloed: bool,
    pub clips: Vec<MidiClip>,
    pub effects: EffectChain,
    voices: VoiceBank,
    /// `(note id, note number)` of every note currently held
    active_notes: Vec<(u64, u8)>,
    scratch: AudioBuffer,
}

impl MidiTrack {
    pub fn new(id: u64, name: impl Into<String>, voices: impl Into<VoiceBank>) -> Self {
        Self {
            id,
            name: name.into(),
            volume: 1.0,
            pan: 0.0,
            muted: false,
            soloed: false,
            clips: Vec::new(),
            effects: EffectChain::new(),
            voices: voices.into(),
            active_notes: Vec::with_capacity(ACTIVE_NOTE_CAPACITY),
            scratch: AudioBuffer::silence(0, 1),
        }
    }

    pub(crate) fn prepare(&mut self, buffer_frames: usize, channels: usize) {
        self.scratch = AudioBuffer::silence(buffer_frames, channels);
    }

    pub(crate) fn scratch(&self) -> &AudioBuffer {
        &self.scratch
    }

    /// The track's instrument
    pub fn voices(&self) -> &VoiceBank {
        &self.voices
    }

    pub fn voices_mut(&mut self) -> &mut VoiceBank {
        &mut self.voices
    }

    /// Largest end tick over all clips
    pub fn end_tick(&self) -> u64 {
        self.clips.iter().map(MidiClip::end_tick).max().unwrap_or(0)
    }

    /// Real-time note injection (bypasses the clip model)
    pub(crate) fn inject_note_on(&mut self, note: u8, velocity: u8, sample_rate: u32) {
        self.voices.note_on(note, velocity, sample_rate);
    }

    pub(crate) fn inject_note_off(&mut self, note: u8, sample_rate: u32) {
        self.voices.note_off(note, sample_rate);
    }

    /// Render one block into the track scratch
    ///
    /// Note scheduling is block-granular: events whose tick falls inside
    /// the block's tick window fire at the block head.
    pub(crate) fn render(
        &mut self,
        start_frame: u64,
        frames: usize,
        sample_rate: u32,
        bpm: f64,
        any_solo: bool,
    ) {
        self.scratch.set_len_from_capacity(frames);
        self.scratch.clear();
        if !audible(self.muted, self.soloed, any_solo) {
            return;
        }

        let (from_tick, to_tick) = block_tick_window(start_frame, frames as u64, bpm, sample_rate);

        for clip in &self.clips {
            let local_from = from_tick.saturating_sub(clip.start_tick);
            let local_to = to_tick.saturating_sub(clip.start_tick);
            if local_to == 0 {
                continue;
            }

            for note in clip.note_on_events(local_from, local_to) {
                self.voices.note_on(note.note, note.velocity, sample_rate);
                if self.active_notes.len() < self.active_notes.capacity() {
                    self.active_notes.push((note.id, note.note));
                }
            }
            for note in clip.note_off_events(local_from, local_to) {
                self.voices.note_off(note.note, sample_rate);
                self.active_notes.retain(|&(id, _)| id != note.id);
            }
        }

        self.voices.render(&mut self.scratch, sample_rate);
        self.effects.process(&mut self.scratch, sample_rate);
        apply_volume_pan(&mut self.scratch, self.volume, self.pan);
    }

    /// Silence all voices, clear held notes, reset effect state
    pub(crate) fn reset(&mut self) {
        self.voices.reset();
        self.active_notes.clear();
        self.effects.reset();
    }
}
