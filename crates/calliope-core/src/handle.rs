//! Control-side engine handle
//!
//! [`start_engine`] validates the configuration, spawns the render
//! worker, and returns an [`EngineController`]: typed command senders
//! over the lock-free queue, telemetry reads, and deterministic
//! teardown. The controller never touches engine state directly.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam::sync::{Parker, Unparker};

use crate::config::EngineConfig;
use crate::engine::worker::{self, RenderWorker};
use crate::engine::{
    command_channel, telemetry_channel, AudioEngine, BlockTelemetry, EffectTarget, EngineAtomics,
    EngineCommand, MasterMixer, TelemetryReader, TrackRef, TransportState,
};
use crate::error::{CapacityError, ConfigError, StateError};
use crate::types::{AudioBuffer, Meters, Sample};

pub use crate::engine::worker::AudioSink;

/// How long teardown waits for the worker before leaking it
const JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Validate the configuration and spawn the engine
///
/// The mixer carries the project (tracks, clips, chains) and must have
/// been built for the same sample rate, channel count, and block size.
/// Pass a sink to receive rendered blocks; without one the engine
/// self-paces and the newest block is available through
/// [`EngineController::current_output_block`].
pub fn start_engine(
    config: EngineConfig,
    mixer: MasterMixer,
    sink: Option<Box<dyn AudioSink>>,
) -> Result<EngineController, ConfigError> {
    config.validate()?;

    let atomics = Arc::new(EngineAtomics::new());
    let (command_tx, command_rx) = command_channel(config.command_capacity);
    let (telemetry_tx, telemetry_rx) = telemetry_channel(config.telemetry_capacity);
    let parker = Parker::new();
    let unparker = parker.unparker().clone();
    let shutdown = Arc::new(AtomicBool::new(false));
    let output_slot = Arc::new(Mutex::new(Vec::with_capacity(
        config.buffer_frames * config.channels,
    )));

    let engine = AudioEngine::new(config, mixer, Arc::clone(&atomics));

    log::info!(
        "starting engine: {} Hz, {} ch, {} frames/block",
        config.sample_rate,
        config.channels,
        config.buffer_frames
    );

    let join = worker::spawn(RenderWorker {
        engine,
        commands: command_rx,
        telemetry: telemetry_tx,
        atomics: Arc::clone(&atomics),
        sink,
        shutdown: Arc::clone(&shutdown),
        parker,
        output_slot: Arc::clone(&output_slot),
    });

    Ok(EngineController {
        commands: command_tx,
        telemetry: TelemetryReader::new(telemetry_rx),
        atomics,
        unparker,
        shutdown,
        output_slot,
        join: Some(join),
    })
}

/// Control surface for a running engine
///
/// Command senders return [`CapacityError`] when the queue is full; the
/// engine is unaffected and the caller may retry. Telemetry getters read
/// lock-free state and never disturb the worker.
pub struct EngineController {
    commands: rtrb::Producer<EngineCommand>,
    telemetry: TelemetryReader,
    atomics: Arc<EngineAtomics>,
    unparker: Unparker,
    shutdown: Arc<AtomicBool>,
    output_slot: Arc<Mutex<Vec<f32>>>,
    join: Option<JoinHandle<()>>,
}

impl EngineController {
    /// Enqueue a command (non-blocking)
    ///
    /// Wakes the worker if it is parked idle so the command applies at
    /// the next block boundary.
    pub fn send(&mut self, cmd: EngineCommand) -> Result<(), CapacityError> {
        self.commands.push(cmd).map_err(|_| CapacityError)?;
        self.unparker.unpark();
        Ok(())
    }

    pub fn play(&mut self) -> Result<(), CapacityError> {
        self.send(EngineCommand::Play)
    }

    pub fn pause(&mut self) -> Result<(), CapacityError> {
        self.send(EngineCommand::Pause)
    }

    pub fn stop(&mut self) -> Result<(), CapacityError> {
        self.send(EngineCommand::Stop)
    }

    pub fn seek(&mut self, frame: u64) -> Result<(), CapacityError> {
        self.send(EngineCommand::Seek { frame })
    }

    /// Write an effect parameter (clamped at the descriptor boundary)
    pub fn set_param(
        &mut self,
        target: EffectTarget,
        effect: usize,
        param: usize,
        value: f32,
    ) -> Result<(), CapacityError> {
        self.send(EngineCommand::SetParam {
            target,
            effect,
            param,
            value,
        })
    }

    /// Inject a live note-on; it sounds from the next block
    pub fn note_on(&mut self, track: usize, note: u8, velocity: u8) -> Result<(), CapacityError> {
        self.send(EngineCommand::NoteOn {
            track,
            note,
            velocity,
        })
    }

    pub fn note_off(&mut self, track: usize, note: u8) -> Result<(), CapacityError> {
        self.send(EngineCommand::NoteOff { track, note })
    }

    pub fn set_track_volume(&mut self, track: TrackRef, volume: Sample) -> Result<(), CapacityError> {
        self.send(EngineCommand::SetTrackVolume { track, volume })
    }

    pub fn set_track_pan(&mut self, track: TrackRef, pan: Sample) -> Result<(), CapacityError> {
        self.send(EngineCommand::SetTrackPan { track, pan })
    }

    pub fn set_track_mute(&mut self, track: TrackRef, muted: bool) -> Result<(), CapacityError> {
        self.send(EngineCommand::SetTrackMute { track, muted })
    }

    pub fn set_track_solo(&mut self, track: TrackRef, soloed: bool) -> Result<(), CapacityError> {
        self.send(EngineCommand::SetTrackSolo { track, soloed })
    }

    pub fn set_master_gain(&mut self, gain: Sample) -> Result<(), CapacityError> {
        self.send(EngineCommand::SetMasterGain { gain })
    }

    pub fn set_bpm(&mut self, bpm: f64) -> Result<(), CapacityError> {
        self.send(EngineCommand::SetBpm { bpm })
    }

    /// Replace an audio clip's source buffer
    ///
    /// Only legal while the transport is Stopped; otherwise the data
    /// model is untouched and [`StateError::TransportNotStopped`] comes
    /// back. The swap itself happens on the worker at a block boundary.
    pub fn swap_clip_source(
        &mut self,
        track: usize,
        clip: usize,
        source: Arc<AudioBuffer>,
    ) -> Result<(), StateError> {
        if self.atomics.transport() != TransportState::Stopped {
            return Err(StateError::TransportNotStopped);
        }
        self.send(EngineCommand::SwapClipSource {
            track,
            clip,
            source,
        })?;
        Ok(())
    }

    /// Drain the telemetry queue, keeping the newest record
    pub fn latest_telemetry(&mut self) -> Option<BlockTelemetry> {
        self.telemetry.latest()
    }

    /// Meters of the most recent block (always current, lock-free)
    pub fn meters(&self) -> Meters {
        self.atomics.meters()
    }

    pub fn transport_state(&self) -> TransportState {
        self.atomics.transport()
    }

    pub fn frame_cursor(&self) -> u64 {
        self.atomics.cursor()
    }

    /// Non-finite samples flushed on the master bus so far
    pub fn anomaly_count(&self) -> u64 {
        self.atomics.anomalies()
    }

    /// Copy of the most recently rendered block (interleaved)
    pub fn current_output_block(&self) -> Vec<f32> {
        self.output_slot
            .lock()
            .map(|slot| slot.clone())
            .unwrap_or_default()
    }

    /// Stop the worker and join it, leaking the thread after 2 seconds
    pub fn shutdown(mut self) {
        self.shutdown_inner();
    }

    fn shutdown_inner(&mut self) {
        let Some(join) = self.join.take() else {
            return;
        };
        self.shutdown.store(true, Ordering::Release);
        self.unparker.unpark();

        let deadline = Instant::now() + JOIN_TIMEOUT;
        while !join.is_finished() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        if join.is_finished() {
            let _ = join.join();
            log::debug!("render worker joined");
        } else {
            // Proceed with a leaked thread rather than blocking forever
            log::warn!("render worker did not exit within 2s; leaking it");
        }
    }
}

impl Drop for EngineController {
    fn drop(&mut self) {
        self.shutdown_inner();
    }
}
