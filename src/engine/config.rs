//! Engine configuration.
//!
//! Settings the node manager starts with and the capacities of its
//! pre-allocated queues. Loaded from JSON; every field has a default.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::EngineError;

/// Default sample rate in Hz.
pub const DEFAULT_SAMPLE_RATE: f32 = 44100.0;

/// Default internal sub-block size in samples.
pub const DEFAULT_INTERNAL_BUFFER_SIZE: usize = 64;

/// Default capacity of the task queue.
pub const DEFAULT_TASK_CAPACITY: usize = 1024;

/// Default number of node slots reserved up front.
pub const DEFAULT_NODE_CAPACITY: usize = 256;

/// Default number of output pins that may feed one driver channel.
pub const DEFAULT_OUTPUTS_PER_CHANNEL: usize = 32;

/// Default capacity of the queue returning removed nodes to the control side.
pub const DEFAULT_RETIRED_CAPACITY: usize = 256;

/// Configuration for a `NodeManager`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Sample rate in Hz.
    pub sample_rate: f32,
    /// Internal sub-block size. Tasks are drained between sub-blocks.
    pub internal_buffer_size: usize,
    /// Number of driver input channels exposed to nodes.
    pub input_channel_count: usize,
    /// Number of driver output channels routed to.
    pub output_channel_count: usize,
    /// Slots in the task queue.
    pub task_capacity: usize,
    /// Node slots reserved when the manager is built.
    pub node_capacity: usize,
    /// Output pins that may be routed to a single channel per sub-block.
    pub outputs_per_channel: usize,
    /// Slots in the queue returning removed nodes for dropping.
    pub retired_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            internal_buffer_size: DEFAULT_INTERNAL_BUFFER_SIZE,
            input_channel_count: 0,
            output_channel_count: 2,
            task_capacity: DEFAULT_TASK_CAPACITY,
            node_capacity: DEFAULT_NODE_CAPACITY,
            outputs_per_channel: DEFAULT_OUTPUTS_PER_CHANNEL,
            retired_capacity: DEFAULT_RETIRED_CAPACITY,
        }
    }
}

impl EngineConfig {
    /// Parses and validates a configuration from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, EngineError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses, and validates a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| EngineError::ReadConfig {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json_str(&json)?;
        tracing::info!(path = %path.display(), ?config, "loaded engine config");
        Ok(config)
    }

    /// Checks that the values can drive a manager.
    pub fn validate(&self) -> Result<(), EngineError> {
        if !self.sample_rate.is_finite() || self.sample_rate <= 0.0 {
            return Err(EngineError::InvalidConfig(format!(
                "sample_rate must be a positive number, got {}",
                self.sample_rate
            )));
        }
        if self.internal_buffer_size == 0 {
            return Err(EngineError::InvalidConfig(
                "internal_buffer_size must be at least 1".into(),
            ));
        }
        if self.task_capacity == 0 {
            return Err(EngineError::InvalidConfig(
                "task_capacity must be at least 1".into(),
            ));
        }
        if self.retired_capacity == 0 {
            return Err(EngineError::InvalidConfig(
                "retired_capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
