//! Transport state machine
//!
//! Tracks the playback state and the frame cursor. Transitions that
//! discontinue playback (stop, seek while rolling) report that DSP state
//! must be reset; the caller owns the mixer and performs it.

use serde::{Deserialize, Serialize};

/// Playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TransportState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

/// Transport position and state
///
/// While Playing the cursor advances by exactly one block per rendered
/// block; Paused freezes it; entering Stopped via stop or end-of-project
/// rewinds it to 0 (a seek while Stopped then moves it).
#[derive(Debug, Clone, Copy, Default)]
pub struct Transport {
    state: TransportState,
    cursor: u64,
}

impl Transport {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn state(&self) -> TransportState {
        self.state
    }

    #[inline]
    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    /// Start or resume playback
    pub fn play(&mut self) {
        self.state = TransportState::Playing;
    }

    /// Freeze the cursor
    pub fn pause(&mut self) {
        if self.state == TransportState::Playing {
            self.state = TransportState::Paused;
        }
    }

    /// Stop and rewind; returns whether DSP state must be reset
    pub fn stop(&mut self) -> bool {
        let was_rolling = self.state != TransportState::Stopped;
        self.state = TransportState::Stopped;
        self.cursor = 0;
        was_rolling
    }

    /// Move the cursor; returns whether DSP state must be reset
    ///
    /// Seeking keeps the current state. A seek while Stopped needs no
    /// reset (nothing has sounded); while Paused or Playing the in-flight
    /// DSP state belongs to the old position and must be cleared.
    pub fn seek(&mut self, frame: u64) -> bool {
        self.cursor = frame;
        self.state != TransportState::Stopped
    }

    /// The project ran out: stop and rewind
    pub fn end_of_project(&mut self) -> bool {
        self.stop()
    }

    /// Advance the cursor after a successfully rendered block
    pub fn advance(&mut self, frames: u64) {
        debug_assert_eq!(self.state, TransportState::Playing);
        self.cursor += frames;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let t = Transport::new();
        assert_eq!(t.state(), TransportState::Stopped);
        assert_eq!(t.cursor(), 0);
    }

    #[test]
    fn test_play_pause_play() {
        let mut t = Transport::new();
        t.play();
        assert_eq!(t.state(), TransportState::Playing);
        t.pause();
        assert_eq!(t.state(), TransportState::Paused);
        t.play();
        assert_eq!(t.state(), TransportState::Playing);
    }

    #[test]
    fn test_pause_only_affects_playing() {
        let mut t = Transport::new();
        t.pause();
        assert_eq!(t.state(), TransportState::Stopped);
    }

    #[test]
    fn test_stop_rewinds_and_requests_reset() {
        let mut t = Transport::new();
        t.play();
        t.advance(1024);
        assert!(t.stop());
        assert_eq!(t.state(), TransportState::Stopped);
        assert_eq!(t.cursor(), 0);

        // Stopping again is a no-op
        assert!(!t.stop());
    }

    #[test]
    fn test_seek_keeps_state() {
        let mut t = Transport::new();

        // Stopped: cursor moves, no reset
        assert!(!t.seek(500));
        assert_eq!(t.state(), TransportState::Stopped);
        assert_eq!(t.cursor(), 500);

        // Playing: cursor moves, reset required
        t.play();
        assert!(t.seek(2000));
        assert_eq!(t.state(), TransportState::Playing);
        assert_eq!(t.cursor(), 2000);

        // Paused: same
        t.pause();
        assert!(t.seek(100));
        assert_eq!(t.state(), TransportState::Paused);
    }

    #[test]
    fn test_end_of_project_stops() {
        let mut t = Transport::new();
        t.play();
        t.advance(4096);
        assert!(t.end_of_project());
        assert_eq!(t.state(), TransportState::Stopped);
        assert_eq!(t.cursor(), 0);
    }

    #[test]
    fn test_advance_is_blockwise() {
        let mut t = Transport::new();
        t.play();
        for n in 1..=10 {
            t.advance(512);
            assert_eq!(t.cursor(), n * 512);
        }
    }
}
