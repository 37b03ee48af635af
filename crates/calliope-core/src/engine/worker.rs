//! The render worker thread
//!
//! Runs the deadline-bound loop: drain commands, render one block, post
//! telemetry, hand the block to the sink, advance, pace. The worker owns
//! the [`AudioEngine`] exclusively; the control side reaches it only
//! through the lock-free queues.
//!
//! While Playing the loop takes no locks, performs no I/O, and allocates
//! nothing; the only suspension points are the idle park (not Playing)
//! and the sink's own back-pressure.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam::sync::Parker;

use crate::engine::command::EngineCommand;
use crate::engine::engine::AudioEngine;
use crate::engine::telemetry::{BlockTelemetry, EngineAtomics};
use crate::engine::transport::TransportState;

/// How long the worker parks while the transport is not rolling
const IDLE_PARK: Duration = Duration::from_millis(100);

/// Fraction of the block duration to pace at when no sink is attached,
/// leaving headroom before the real-time deadline
const SELF_PACE: f64 = 0.8;

/// Destination for rendered blocks
///
/// `write_block` receives one block of interleaved samples per call and
/// may block; that back-pressure is what paces the render loop when a
/// sink is attached.
pub trait AudioSink: Send {
    fn write_block(&mut self, interleaved: &[f32]);
}

/// Everything the worker thread owns
pub(crate) struct RenderWorker {
    pub engine: AudioEngine,
    pub commands: rtrb::Consumer<EngineCommand>,
    pub telemetry: rtrb::Producer<BlockTelemetry>,
    pub atomics: Arc<EngineAtomics>,
    pub sink: Option<Box<dyn AudioSink>>,
    pub shutdown: Arc<AtomicBool>,
    pub parker: Parker,
    /// Most recent rendered block, for control-side polling
    pub output_slot: Arc<Mutex<Vec<f32>>>,
}

/// Spawn the worker thread
pub(crate) fn spawn(worker: RenderWorker) -> thread::JoinHandle<()> {
    thread::Builder::new()
        .name("calliope-render".into())
        .spawn(move || run(worker))
        .expect("failed to spawn render worker")
}

fn run(mut w: RenderWorker) {
    let config = *w.engine.config();
    log::debug!(
        "render worker up: {} Hz, {} ch, {} frames/block",
        config.sample_rate,
        config.channels,
        config.buffer_frames
    );

    let pacing = Duration::from_secs_f64(config.block_seconds() * SELF_PACE);

    while !w.shutdown.load(Ordering::Acquire) {
        w.engine.process_commands(&mut w.commands);

        if w.engine.transport_state() != TransportState::Playing {
            w.parker.park_timeout(IDLE_PARK);
            continue;
        }

        let deadline = Instant::now() + pacing;
        w.engine.render_block();

        // One telemetry record per block; a full queue drops the record
        // rather than blocking, and the atomics always carry the newest
        let record = BlockTelemetry::new(w.engine.meters(), w.engine.cursor());
        let _ = w.telemetry.push(record);
        w.atomics.store_block(&record);

        {
            let out = w.engine.output();
            // try_lock: a contended poll slot is skipped, never waited on
            if let Ok(mut slot) = w.output_slot.try_lock() {
                slot.clear();
                slot.extend_from_slice(out.as_slice());
            }
            if let Some(sink) = w.sink.as_mut() {
                sink.write_block(out.as_slice());
            }
        }

        w.engine.advance_after_block();

        if w.sink.is_none() {
            let now = Instant::now();
            if now < deadline {
                thread::sleep(deadline - now);
            }
        }
    }

    log::debug!("render worker exiting");
}
