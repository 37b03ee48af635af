//! Engine error types
//!
//! Control-side errors are explicit result values; the render worker never
//! panics and never propagates errors upward.

use thiserror::Error;

/// Errors raised while validating construction parameters
///
/// Surfaced synchronously from [`start_engine`]; the engine is not created.
///
/// [`start_engine`]: crate::handle::start_engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Sample rate outside the supported set
    #[error("unsupported sample rate: {0} (expected 44100, 48000, 96000 or 192000)")]
    UnsupportedSampleRate(u32),

    /// Channel count outside 1..=2
    #[error("unsupported channel count: {0} (expected 1 or 2)")]
    UnsupportedChannels(usize),

    /// Block size not a power of two in [64, 8192]
    #[error("invalid buffer size: {0} frames (expected a power of two in 64..=8192)")]
    InvalidBufferFrames(usize),

    /// Fewer voices than the polyphony floor
    #[error("too few voices per synth: {0} (minimum 8)")]
    TooFewVoices(usize),

    /// Telemetry queue below the minimum depth
    #[error("telemetry capacity too small: {0} (minimum 4)")]
    TelemetryCapacityTooSmall(usize),

    /// Command queue below the minimum depth
    #[error("command capacity too small: {0} (minimum 256)")]
    CommandCapacityTooSmall(usize),
}

/// The command queue was full; the command was not enqueued
///
/// Returned to the control-side caller. The render worker is unaffected and
/// transport continues as it was.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("command queue is full")]
pub struct CapacityError;

/// An invalid data-model mutation was attempted
///
/// Surfaced synchronously to the mutator; engine state is unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    /// Clip source buffers may only be replaced while transport is Stopped
    #[error("transport must be stopped for this operation")]
    TransportNotStopped,

    /// The referenced track does not exist
    #[error("no such track: {0}")]
    NoSuchTrack(usize),

    /// The referenced clip does not exist on the track
    #[error("no such clip: {0}")]
    NoSuchClip(usize),

    /// The command queue rejected the mutation
    #[error(transparent)]
    Capacity(#[from] CapacityError),
}
