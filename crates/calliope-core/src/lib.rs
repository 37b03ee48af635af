//! Calliope Core - Real-time audio rendering engine for the Calliope DAW
//!
//! The engine is split into control-thread and render-thread components:
//!
//! - [`EngineController`]: control-side handle for sending commands and
//!   reading telemetry
//! - [`AudioEngine`]: render-side state, owned exclusively by the render
//!   worker thread
//! - [`start_engine`]: validates the configuration, spawns the worker, and
//!   returns the controller
//!
//! The two sides communicate over lock-free SPSC queues; the render worker
//! never blocks on the control side and never allocates while playing.

pub mod clip;
pub mod config;
pub mod effect;
pub mod engine;
pub mod error;
pub mod handle;
pub mod ring;
pub mod synth;
pub mod time;
pub mod types;

pub use clip::{AudioClip, MidiClip, MidiNote};
pub use config::EngineConfig;
pub use effect::{Effect, EffectChain, EffectKind, ParamInfo};
pub use engine::{
    AudioEngine, AudioTrack, BlockTelemetry, EffectTarget, EngineCommand, MasterMixer, MidiTrack,
    TelemetryReader, TrackRef, TransportState,
};
pub use error::{CapacityError, ConfigError, StateError};
pub use handle::{start_engine, AudioSink, EngineController};
pub use synth::{
    LoopMode, SamplerVoiceBank, SamplerZone, SynthParams, SynthVoiceBank, VoiceBank, Waveform,
};
pub use types::{AudioBuffer, Meters, Sample};
