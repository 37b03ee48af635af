//! Clip data model
//!
//! MIDI clips hold immutable note records ordered by start tick; audio
//! clips are windowed views into shared source buffers. Clips carry no DSP
//! state of their own.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::time::WHOLE_NOTE_TICKS;
use crate::types::{AudioBuffer, Sample};

/// One note in a MIDI clip
///
/// Notes are immutable values: edits produce a replacement record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MidiNote {
    pub id: u64,
    /// MIDI note number (0-127)
    pub note: u8,
    /// Velocity (1-127)
    pub velocity: u8,
    /// Start position in clip-local ticks
    pub start_tick: u64,
    /// Length in ticks (>= 1)
    pub duration_ticks: u64,
    /// MIDI channel (0-15)
    pub channel: u8,
}

impl MidiNote {
    /// First tick after the note ends
    #[inline]
    pub fn end_tick(&self) -> u64 {
        self.start_tick + self.duration_ticks
    }

    /// Whether this note's tick span fully covers another's
    fn covers(&self, other: &MidiNote) -> bool {
        self.start_tick <= other.start_tick && other.end_tick() <= self.end_tick()
    }
}

/// A clip of MIDI notes placed on the project timeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MidiClip {
    pub id: u64,
    pub name: String,
    /// Position of the clip on the project timeline, in ticks
    pub start_tick: u64,
    /// Explicit length; when absent the content defines it
    pub length_ticks: Option<u64>,
    notes: Vec<MidiNote>,
}

impl MidiClip {
    /// Create an empty clip at the given timeline position
    pub fn new(id: u64, name: impl Into<String>, start_tick: u64) -> Self {
        Self {
            id,
            name: name.into(),
            start_tick,
            length_ticks: None,
            notes: Vec::new(),
        }
    }

    /// Set an explicit clip length
    pub fn with_length(mut self, length_ticks: u64) -> Self {
        self.length_ticks = Some(length_ticks);
        self
    }

    /// Notes ordered by `(start_tick, note)`
    pub fn notes(&self) -> &[MidiNote] {
        &self.notes
    }

    /// Insert a note, trimming same-pitch collisions
    ///
    /// Existing same-pitch notes that the new note fully covers are
    /// removed, as is any note sharing the exact `(note, start_tick)`.
    /// Partial same-pitch overlaps are accepted unchanged.
    pub fn insert_note(&mut self, note: MidiNote) {
        self.notes.retain(|existing| {
            existing.note != note.note
                || (!note.covers(existing) && existing.start_tick != note.start_tick)
        });
        let pos = self
            .notes
            .partition_point(|n| (n.start_tick, n.note) <= (note.start_tick, note.note));
        self.notes.insert(pos, note);
    }

    /// Remove a note by id; returns whether it existed
    pub fn remove_note(&mut self, id: u64) -> bool {
        let before = self.notes.len();
        self.notes.retain(|n| n.id != id);
        self.notes.len() != before
    }

    /// Effective clip length in ticks
    ///
    /// The explicit length when set, otherwise the largest note end, or
    /// one whole note for an empty clip.
    pub fn effective_length_ticks(&self) -> u64 {
        if let Some(len) = self.length_ticks {
            return len;
        }
        self.notes
            .iter()
            .map(MidiNote::end_tick)
            .max()
            .unwrap_or(WHOLE_NOTE_TICKS)
    }

    /// First timeline tick after the clip ends
    pub fn end_tick(&self) -> u64 {
        self.start_tick + self.effective_length_ticks()
    }

    /// Notes starting inside the half-open clip-local window `[from, to)`
    ///
    /// Ordered ascending by `(start_tick, note)`.
    pub fn note_on_events(&self, from: u64, to: u64) -> impl Iterator<Item = &MidiNote> {
        self.notes
            .iter()
            .filter(move |n| n.start_tick >= from && n.start_tick < to)
    }

    /// Notes ending inside the half-open clip-local window `[from, to)`
    pub fn note_off_events(&self, from: u64, to: u64) -> impl Iterator<Item = &MidiNote> {
        self.notes
            .iter()
            .filter(move |n| n.end_tick() >= from && n.end_tick() < to)
    }
}

/// A windowed view into a shared audio source buffer
///
/// Multiple clips may reference the same source; the source is read-only
/// on the render worker after publication.
#[derive(Debug, Clone)]
pub struct AudioClip {
    pub id: u64,
    /// Project frame at which the clip starts
    pub start_frame: u64,
    /// Offset into the source buffer where playback begins
    pub trim_start_frame: u64,
    /// Explicit length in frames; 0 plays the rest of the source
    pub duration_frames: u64,
    /// Per-clip gain
    pub volume: Sample,
    /// Shared source sample data, interleaved at the engine's rate
    pub source: Arc<AudioBuffer>,
}

impl AudioClip {
    /// Create a clip playing the whole source from `start_frame`
    pub fn new(id: u64, start_frame: u64, source: Arc<AudioBuffer>) -> Self {
        Self {
            id,
            start_frame,
            trim_start_frame: 0,
            duration_frames: 0,
            volume: 1.0,
            source,
        }
    }

    /// Frames this clip actually plays
    pub fn effective_duration(&self) -> u64 {
        if self.duration_frames > 0 {
            self.duration_frames
        } else {
            (self.source.frames() as u64).saturating_sub(self.trim_start_frame)
        }
    }

    /// First project frame after the clip ends
    pub fn end_frame(&self) -> u64 {
        self.start_frame + self.effective_duration()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(id: u64, pitch: u8, start: u64, dur: u64) -> MidiNote {
        MidiNote {
            id,
            note: pitch,
            velocity: 100,
            start_tick: start,
            duration_ticks: dur,
            channel: 0,
        }
    }

    #[test]
    fn test_insert_keeps_notes_ordered() {
        let mut clip = MidiClip::new(1, "lead", 0);
        clip.insert_note(note(1, 64, 480, 240));
        clip.insert_note(note(2, 60, 0, 240));
        clip.insert_note(note(3, 67, 480, 240));

        let order: Vec<(u64, u8)> = clip.notes().iter().map(|n| (n.start_tick, n.note)).collect();
        assert_eq!(order, vec![(0, 60), (480, 64), (480, 67)]);
    }

    #[test]
    fn test_insert_removes_fully_covered_same_pitch() {
        let mut clip = MidiClip::new(1, "lead", 0);
        clip.insert_note(note(1, 60, 100, 50));
        clip.insert_note(note(2, 60, 0, 480));

        assert_eq!(clip.notes().len(), 1);
        assert_eq!(clip.notes()[0].id, 2);
    }

    #[test]
    fn test_insert_replaces_same_pitch_same_start() {
        let mut clip = MidiClip::new(1, "lead", 0);
        clip.insert_note(note(1, 60, 0, 960));
        // Shorter note at the same (pitch, start) does not cover the first,
        // but two notes may not share a (pitch, start)
        clip.insert_note(note(2, 60, 0, 240));

        assert_eq!(clip.notes().len(), 1);
        assert_eq!(clip.notes()[0].id, 2);
    }

    #[test]
    fn test_insert_accepts_partial_overlap() {
        let mut clip = MidiClip::new(1, "lead", 0);
        clip.insert_note(note(1, 60, 0, 480));
        clip.insert_note(note(2, 60, 240, 480));

        assert_eq!(clip.notes().len(), 2);
    }

    #[test]
    fn test_effective_length() {
        let mut clip = MidiClip::new(1, "lead", 0);
        assert_eq!(clip.effective_length_ticks(), WHOLE_NOTE_TICKS);

        clip.insert_note(note(1, 60, 480, 480));
        assert_eq!(clip.effective_length_ticks(), 960);

        let clip = clip.with_length(2000);
        assert_eq!(clip.effective_length_ticks(), 2000);
    }

    #[test]
    fn test_window_queries() {
        let mut clip = MidiClip::new(1, "lead", 0);
        clip.insert_note(note(1, 60, 0, 480));
        clip.insert_note(note(2, 64, 480, 480));
        clip.insert_note(note(3, 67, 960, 480));

        let ons: Vec<u64> = clip.note_on_events(0, 480).map(|n| n.id).collect();
        assert_eq!(ons, vec![1]);

        let ons: Vec<u64> = clip.note_on_events(480, 1000).map(|n| n.id).collect();
        assert_eq!(ons, vec![2, 3]);

        let offs: Vec<u64> = clip.note_off_events(480, 960).map(|n| n.id).collect();
        assert_eq!(offs, vec![1]);
    }

    #[test]
    fn test_audio_clip_duration() {
        let source = Arc::new(AudioBuffer::silence(1000, 2));

        let clip = AudioClip::new(1, 100, Arc::clone(&source));
        assert_eq!(clip.effective_duration(), 1000);
        assert_eq!(clip.end_frame(), 1100);

        let clip = AudioClip {
            trim_start_frame: 400,
            ..clip
        };
        assert_eq!(clip.effective_duration(), 600);

        let clip = AudioClip {
            duration_frames: 250,
            ..clip
        };
        assert_eq!(clip.effective_duration(), 250);
        assert_eq!(clip.end_frame(), 350);
    }
}
