//! Lock-free command queue for real-time engine control
//!
//! The control thread sends commands through a bounded SPSC ring buffer;
//! the render worker pops them at the head of each block. Neither side
//! ever blocks: a full queue fails the push back to the caller, an empty
//! queue returns immediately.
//!
//! Commands carrying large payloads ship them behind a pointer (the
//! `SwapClipSource` `Arc`) so the enum stays small enough for
//! cache-friendly queueing.

use std::sync::Arc;

use crate::types::{AudioBuffer, Sample};

/// Which track a command addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackRef {
    Audio(usize),
    Midi(usize),
}

/// Which effect chain a parameter write addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectTarget {
    Track(TrackRef),
    Master,
}

/// Commands sent from the control thread to the render worker
///
/// Each variant is one atomic operation on the engine, applied at the
/// start of a block so no state changes mid-render.
pub enum EngineCommand {
    // Transport
    /// Start or resume playback
    Play,
    /// Freeze the cursor
    Pause,
    /// Stop, rewind to 0, and reset all DSP state
    Stop,
    /// Move the cursor to an absolute frame
    Seek { frame: u64 },

    // Parameters
    /// Write an effect parameter, clamped to its descriptor range
    SetParam {
        target: EffectTarget,
        effect: usize,
        param: usize,
        value: f32,
    },

    // Real-time MIDI injection (takes effect at the next block head)
    NoteOn { track: usize, note: u8, velocity: u8 },
    NoteOff { track: usize, note: u8 },

    // Track strip
    SetTrackVolume { track: TrackRef, volume: Sample },
    SetTrackPan { track: TrackRef, pan: Sample },
    SetTrackMute { track: TrackRef, muted: bool },
    SetTrackSolo { track: TrackRef, soloed: bool },

    // Global
    SetMasterGain { gain: Sample },
    SetBpm { bpm: f64 },

    /// Replace an audio clip's source buffer
    ///
    /// Only applied while transport is Stopped; the control side enforces
    /// this before enqueueing and the worker double-checks. The Arc keeps
    /// the command pointer-sized regardless of the buffer behind it.
    SwapClipSource {
        track: usize,
        clip: usize,
        source: Arc<AudioBuffer>,
    },
}

/// Create the control-to-render command channel
///
/// Returns `(producer, consumer)`: the producer belongs to the control
/// side, the consumer to the render worker.
pub fn command_channel(
    capacity: usize,
) -> (rtrb::Producer<EngineCommand>, rtrb::Consumer<EngineCommand>) {
    rtrb::RingBuffer::new(capacity)
}
