use std::{fmt, str::FromStr};

use crate::{config::EngineConfig, error::GraphError};

/*
Execution Rates
===============

Every node in a graph runs at one of three rates. The rate decides how big the
node's output buffer is and how a consumer walks through it.

  Rate       Buffer length      Values per block    Read stride
  --------   ----------------   -----------------   -----------
  Audio      block_size         one per sample      1
  Control    1                  one per block       0
  Constant   1                  one per lifetime    0

The stride is what lets a node read any input the same way:

    value_for_sample_i = input.buffer[i * stride]

An audio-rate input (stride 1) yields a fresh value every sample. A control or
constant input (stride 0) keeps re-reading index 0, so the single value is held
for the whole block. A node that only wants one value per block (for example a
frequency it samples once) reads index 0 no matter what rate the input runs at.

Control-rate nodes tick once per control period, so their own clock runs at
sample_rate / block_size. An oscillator running at control rate advances its
phase by a full block's worth of time on every tick.
*/

/// How often a node computes a new value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rate {
    Audio,
    Control,
    Constant,
}

impl Rate {
    /// Number of samples the node's output buffer holds.
    pub fn buffer_len(self, config: &EngineConfig) -> usize {
        match self {
            Rate::Audio => config.block_size,
            Rate::Control | Rate::Constant => 1,
        }
    }

    /// Index step used when a consumer reads this rate sample by sample.
    #[inline]
    pub fn stride(self) -> usize {
        match self {
            Rate::Audio => 1,
            Rate::Control | Rate::Constant => 0,
        }
    }

    /// The clock a node running at this rate sees.
    pub fn sample_rate(self, config: &EngineConfig) -> f64 {
        match self {
            Rate::Audio => config.sample_rate as f64,
            Rate::Control | Rate::Constant => config.control_rate(),
        }
    }

    /// How many values a node computes when the graph asks for `requested`.
    #[inline]
    pub fn samples_per_block(self, requested: usize) -> usize {
        match self {
            Rate::Audio => requested,
            Rate::Control | Rate::Constant => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Rate::Audio => "audio",
            Rate::Control => "control",
            Rate::Constant => "constant",
        }
    }
}

impl FromStr for Rate {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "audio" | "ar" => Ok(Rate::Audio),
            "control" | "kr" => Ok(Rate::Control),
            "constant" | "scalar" | "ir" => Ok(Rate::Constant),
            other => Err(GraphError::UnknownRate(other.to_string())),
        }
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audio_rate_allocates_a_full_control_period() {
        let config = EngineConfig::new(48_000.0, 64, 2);
        assert_eq!(Rate::Audio.buffer_len(&config), 64);
        assert_eq!(Rate::Control.buffer_len(&config), 1);
        assert_eq!(Rate::Constant.buffer_len(&config), 1);
    }

    #[test]
    fn only_audio_rate_advances_through_the_buffer() {
        assert_eq!(Rate::Audio.stride(), 1);
        assert_eq!(Rate::Control.stride(), 0);
        assert_eq!(Rate::Constant.stride(), 0);
    }

    #[test]
    fn control_clock_is_one_tick_per_block() {
        let config = EngineConfig::new(44_100.0, 64, 1);
        assert_eq!(Rate::Audio.sample_rate(&config), 44_100.0);
        assert!((Rate::Control.sample_rate(&config) - 44_100.0 / 64.0).abs() < 1e-9);
        assert_eq!(Rate::Control.samples_per_block(64), 1);
        assert_eq!(Rate::Audio.samples_per_block(32), 32);
    }

    #[test]
    fn parses_short_and_long_names() {
        assert_eq!("ar".parse::<Rate>(), Ok(Rate::Audio));
        assert_eq!("control".parse::<Rate>(), Ok(Rate::Control));
        assert_eq!("scalar".parse::<Rate>(), Ok(Rate::Constant));
        assert_eq!(
            "demand".parse::<Rate>(),
            Err(GraphError::UnknownRate("demand".into()))
        );
    }
}
