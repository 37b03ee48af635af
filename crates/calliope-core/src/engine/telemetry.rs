//! Telemetry - per-block meter records and the lock-free state mirror
//!
//! The render worker publishes one record per block into a bounded SPSC
//! queue (dropped on overflow, never blocking) and mirrors the newest
//! values into a set of relaxed atomics. Readers that only want "the most
//! recent record" use the atomics; readers that drain the queue keep the
//! last record they pop.

use std::sync::atomic::{AtomicU32, AtomicU64, AtomicU8, Ordering};

use crate::engine::transport::TransportState;
use crate::types::Meters;

/// Summary of one rendered block
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BlockTelemetry {
    pub left_peak: f32,
    pub right_peak: f32,
    pub left_rms: f32,
    pub right_rms: f32,
    /// Frame cursor at the start of the block
    pub frame_cursor: u64,
}

impl BlockTelemetry {
    pub fn new(meters: Meters, frame_cursor: u64) -> Self {
        Self {
            left_peak: meters.left_peak,
            right_peak: meters.right_peak,
            left_rms: meters.left_rms,
            right_rms: meters.right_rms,
            frame_cursor,
        }
    }
}

/// Create the render-to-observer telemetry channel
pub fn telemetry_channel(
    capacity: usize,
) -> (rtrb::Producer<BlockTelemetry>, rtrb::Consumer<BlockTelemetry>) {
    rtrb::RingBuffer::new(capacity)
}

/// Control-side telemetry consumer
///
/// Drains everything queued and keeps only the newest record.
pub struct TelemetryReader {
    consumer: rtrb::Consumer<BlockTelemetry>,
}

impl TelemetryReader {
    pub fn new(consumer: rtrb::Consumer<BlockTelemetry>) -> Self {
        Self { consumer }
    }

    /// The most recent record since the last call, if any arrived
    pub fn latest(&mut self) -> Option<BlockTelemetry> {
        let mut latest = None;
        while let Ok(record) = self.consumer.pop() {
            latest = Some(record);
        }
        latest
    }
}

/// Lock-free engine state shared with control threads
///
/// The render worker stores with relaxed ordering every block; readers
/// load the same way. Meter floats travel as raw bits.
#[derive(Debug, Default)]
pub struct EngineAtomics {
    transport: AtomicU8,
    cursor: AtomicU64,
    left_peak: AtomicU32,
    right_peak: AtomicU32,
    left_rms: AtomicU32,
    right_rms: AtomicU32,
    anomalies: AtomicU64,
}

impl EngineAtomics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a block's meters and cursor
    pub fn store_block(&self, record: &BlockTelemetry) {
        self.left_peak
            .store(record.left_peak.to_bits(), Ordering::Relaxed);
        self.right_peak
            .store(record.right_peak.to_bits(), Ordering::Relaxed);
        self.left_rms
            .store(record.left_rms.to_bits(), Ordering::Relaxed);
        self.right_rms
            .store(record.right_rms.to_bits(), Ordering::Relaxed);
        self.cursor.store(record.frame_cursor, Ordering::Relaxed);
    }

    pub fn store_transport(&self, state: TransportState) {
        self.transport.store(state as u8, Ordering::Relaxed);
    }

    pub fn store_cursor(&self, cursor: u64) {
        self.cursor.store(cursor, Ordering::Relaxed);
    }

    pub fn store_anomalies(&self, count: u64) {
        self.anomalies.store(count, Ordering::Relaxed);
    }

    pub fn transport(&self) -> TransportState {
        match self.transport.load(Ordering::Relaxed) {
            1 => TransportState::Playing,
            2 => TransportState::Paused,
            _ => TransportState::Stopped,
        }
    }

    pub fn cursor(&self) -> u64 {
        self.cursor.load(Ordering::Relaxed)
    }

    pub fn meters(&self) -> Meters {
        Meters {
            left_peak: f32::from_bits(self.left_peak.load(Ordering::Relaxed)),
            right_peak: f32::from_bits(self.right_peak.load(Ordering::Relaxed)),
            left_rms: f32::from_bits(self.left_rms.load(Ordering::Relaxed)),
            right_rms: f32::from_bits(self.right_rms.load(Ordering::Relaxed)),
        }
    }

    pub fn anomalies(&self) -> u64 {
        self.anomalies.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reader_keeps_latest() {
        let (mut tx, rx) = telemetry_channel(8);
        let mut reader = TelemetryReader::new(rx);

        for cursor in 0..5u64 {
            tx.push(BlockTelemetry {
                frame_cursor: cursor * 512,
                ..Default::default()
            })
            .unwrap();
        }

        let latest = reader.latest().unwrap();
        assert_eq!(latest.frame_cursor, 4 * 512);
        assert!(reader.latest().is_none());
    }

    #[test]
    fn test_producer_drops_on_full_without_blocking() {
        let (mut tx, _rx) = telemetry_channel(4);
        let mut dropped = 0;
        for cursor in 0..10u64 {
            if tx
                .push(BlockTelemetry {
                    frame_cursor: cursor,
                    ..Default::default()
                })
                .is_err()
            {
                dropped += 1;
            }
        }
        assert_eq!(dropped, 6);
    }

    #[test]
    fn test_atomics_round_trip() {
        let atomics = EngineAtomics::new();
        let record = BlockTelemetry {
            left_peak: 0.5,
            right_peak: 0.25,
            left_rms: 0.35,
            right_rms: 0.17,
            frame_cursor: 123456,
        };
        atomics.store_block(&record);
        atomics.store_transport(TransportState::Playing);
        atomics.store_anomalies(3);

        assert_eq!(atomics.meters().left_peak, 0.5);
        assert_eq!(atomics.meters().right_rms, 0.17);
        assert_eq!(atomics.cursor(), 123456);
        assert_eq!(atomics.transport(), TransportState::Playing);
        assert_eq!(atomics.anomalies(), 3);
    }
}
