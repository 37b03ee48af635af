//! Musical time conversions
//!
//! Project time is measured in ticks at a fixed resolution of 480 pulses
//! per quarter note. Conversions to wall time depend on the tempo;
//! conversions to frames additionally depend on the sample rate. All
//! integer results round to nearest.

/// Pulses (ticks) per quarter note
pub const PPQ: u64 = 480;

/// Ticks of one whole note (the effective length of an empty clip)
pub const WHOLE_NOTE_TICKS: u64 = 4 * PPQ;

/// Convert ticks to seconds at the given tempo
#[inline]
pub fn ticks_to_seconds(ticks: u64, bpm: f64) -> f64 {
    ticks as f64 / PPQ as f64 * 60.0 / bpm
}

/// Convert seconds to ticks at the given tempo, rounded to nearest
#[inline]
pub fn seconds_to_ticks(seconds: f64, bpm: f64) -> u64 {
    (seconds * bpm / 60.0 * PPQ as f64).round() as u64
}

/// Convert ticks to frames at the given tempo and sample rate
#[inline]
pub fn ticks_to_frames(ticks: u64, bpm: f64, sample_rate: u32) -> u64 {
    (ticks_to_seconds(ticks, bpm) * sample_rate as f64).round() as u64
}

/// Convert a frame position to ticks at the given tempo and sample rate
#[inline]
pub fn frames_to_ticks(frame: u64, bpm: f64, sample_rate: u32) -> u64 {
    seconds_to_ticks(frame as f64 / sample_rate as f64, bpm)
}

/// The half-open tick window covered by a block of frames
///
/// Consecutive blocks tile: the end tick of one window is the start tick
/// of the next, because both come from the same rounding of the same
/// frame position.
#[inline]
pub fn block_tick_window(start_frame: u64, frames: u64, bpm: f64, sample_rate: u32) -> (u64, u64) {
    (
        frames_to_ticks(start_frame, bpm, sample_rate),
        frames_to_ticks(start_frame + frames, bpm, sample_rate),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_beat_at_120_bpm() {
        // One quarter note at 120 BPM is half a second
        assert!((ticks_to_seconds(PPQ, 120.0) - 0.5).abs() < 1e-12);
        assert_eq!(seconds_to_ticks(0.5, 120.0), PPQ);
    }

    #[test]
    fn test_round_trip_is_stable() {
        for ticks in [0, 1, 479, 480, 12345] {
            let secs = ticks_to_seconds(ticks, 93.7);
            assert_eq!(seconds_to_ticks(secs, 93.7), ticks);
        }
    }

    #[test]
    fn test_ticks_to_frames_at_44100() {
        // One beat at 120 BPM = 0.5 s = 22050 frames
        assert_eq!(ticks_to_frames(PPQ, 120.0, 44100), 22050);
    }

    #[test]
    fn test_block_windows_tile() {
        let bpm = 128.0;
        let sr = 48000;
        let block = 512u64;

        let mut expected_start = frames_to_ticks(0, bpm, sr);
        for n in 0..200u64 {
            let (from, to) = block_tick_window(n * block, block, bpm, sr);
            assert_eq!(from, expected_start, "window {n} does not tile");
            assert!(to >= from);
            expected_start = to;
        }
    }

    #[test]
    fn test_block_tick_advance_bounded() {
        // The per-block tick advance stays within one tick of the exact value
        let bpm = 174.0;
        let sr = 44100;
        let block = 512u64;
        let exact = block as f64 * bpm * PPQ as f64 / (60.0 * sr as f64);

        for n in 0..500u64 {
            let (from, to) = block_tick_window(n * block, block, bpm, sr);
            let advance = (to - from) as f64;
            assert!(
                (advance - exact).abs() <= 1.0,
                "block {n}: advance {advance} vs exact {exact}"
            );
        }
    }
}
