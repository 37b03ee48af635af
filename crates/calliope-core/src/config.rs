//! Engine configuration
//!
//! All sizes are fixed at construction and immutable for the engine's
//! lifetime. Validation happens before any thread is spawned.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Sample rates the engine accepts
pub const SUPPORTED_SAMPLE_RATES: [u32; 4] = [44100, 48000, 96000, 192000];

/// Construction parameters for the audio engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Output sample rate in Hz
    pub sample_rate: u32,
    /// Interleaved channel count (1 = mono, 2 = stereo)
    pub channels: usize,
    /// Frames per rendered block; power of two in 64..=8192
    pub buffer_frames: usize,
    /// Polyphony per voice bank
    pub max_voices: usize,
    /// Telemetry queue depth
    pub telemetry_capacity: usize,
    /// Command queue depth
    pub command_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            channels: 2,
            buffer_frames: 1024,
            max_voices: 32,
            telemetry_capacity: 8,
            command_capacity: 1024,
        }
    }
}

impl EngineConfig {
    /// Check every parameter against its allowed range
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !SUPPORTED_SAMPLE_RATES.contains(&self.sample_rate) {
            return Err(ConfigError::UnsupportedSampleRate(self.sample_rate));
        }
        if !(1..=2).contains(&self.channels) {
            return Err(ConfigError::UnsupportedChannels(self.channels));
        }
        if !self.buffer_frames.is_power_of_two() || !(64..=8192).contains(&self.buffer_frames) {
            return Err(ConfigError::InvalidBufferFrames(self.buffer_frames));
        }
        if self.max_voices < 8 {
            return Err(ConfigError::TooFewVoices(self.max_voices));
        }
        if self.telemetry_capacity < 4 {
            return Err(ConfigError::TelemetryCapacityTooSmall(
                self.telemetry_capacity,
            ));
        }
        if self.command_capacity < 256 {
            return Err(ConfigError::CommandCapacityTooSmall(self.command_capacity));
        }
        Ok(())
    }

    /// Wall-clock duration of one block in seconds
    pub fn block_seconds(&self) -> f64 {
        self.buffer_frames as f64 / self.sample_rate as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_odd_sample_rate() {
        let config = EngineConfig {
            sample_rate: 22050,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::UnsupportedSampleRate(22050))
        );
    }

    #[test]
    fn test_rejects_non_power_of_two_block() {
        let config = EngineConfig {
            buffer_frames: 1000,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidBufferFrames(1000))
        );
    }

    #[test]
    fn test_rejects_block_out_of_range() {
        let config = EngineConfig {
            buffer_frames: 16384,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = EngineConfig {
            buffer_frames: 32,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_small_queues() {
        let config = EngineConfig {
            command_capacity: 64,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = EngineConfig {
            telemetry_capacity: 2,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_block_seconds() {
        let config = EngineConfig::default();
        assert!((config.block_seconds() - 1024.0 / 44100.0).abs() < 1e-12);
    }
}
