use serde::{Deserialize, Serialize};

use crate::{error::GraphError, MAX_BLOCK_SIZE};

/// Settings shared by every node in a graph.
///
/// - sample_rate: audio sample rate in Hz (e.g., 44100.0)
/// - block_size: samples per control period; audio-rate buffers hold this many
/// - channels: output channel count, picks the mono or multi-channel output
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    pub sample_rate: f32,
    pub block_size: usize,
    pub channels: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100.0,
            block_size: 64,
            channels: 2,
        }
    }
}

impl EngineConfig {
    pub fn new(sample_rate: f32, block_size: usize, channels: usize) -> Self {
        Self {
            sample_rate,
            block_size,
            channels,
        }
    }

    /// Ticks per second seen by control-rate nodes.
    pub fn control_rate(&self) -> f64 {
        self.sample_rate as f64 / self.block_size.max(1) as f64
    }

    pub fn validate(&self) -> Result<(), GraphError> {
        if !self.sample_rate.is_finite() || self.sample_rate <= 0.0 {
            return Err(GraphError::InvalidConfig(format!(
                "sample rate must be positive, got {}",
                self.sample_rate
            )));
        }
        if self.block_size == 0 || self.block_size > MAX_BLOCK_SIZE {
            return Err(GraphError::InvalidConfig(format!(
                "block size must be within 1..={MAX_BLOCK_SIZE}, got {}",
                self.block_size
            )));
        }
        if self.channels == 0 {
            return Err(GraphError::InvalidConfig(
                "at least one output channel is required".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_oversized_blocks() {
        let config = EngineConfig::new(48_000.0, MAX_BLOCK_SIZE + 1, 2);
        assert!(matches!(
            config.validate(),
            Err(GraphError::InvalidConfig(_))
        ));
    }

    #[test]
    fn rejects_zero_channels_and_bad_rates() {
        assert!(EngineConfig::new(48_000.0, 64, 0).validate().is_err());
        assert!(EngineConfig::new(0.0, 64, 1).validate().is_err());
        assert!(EngineConfig::new(f32::NAN, 64, 1).validate().is_err());
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{"channels": 1}"#).unwrap();
        assert_eq!(config.channels, 1);
        assert_eq!(config.block_size, 64);
        assert_eq!(config.sample_rate, 44_100.0);
    }
}
