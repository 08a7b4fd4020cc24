//! Audio Engine
//!
//! Manages the cpal audio stream and interfaces with system audio hardware.
//! The audio callback runs in a separate thread and must be real-time safe.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Host, SampleRate, Stream, StreamConfig};
use thiserror::Error;

use super::node_manager::NodeManager;

/// Frames of planar scratch allocated per channel before the stream starts.
/// Larger driver blocks are processed in chunks of this size.
pub const MAX_CALLBACK_FRAMES: usize = 4096;

/// Errors that can occur during audio engine operation.
#[derive(Debug, Clone, Error)]
pub enum AudioError {
    /// No audio output device was found.
    #[error("No audio output device found")]
    NoOutputDevice,
    /// Failed to get device configuration.
    #[error("Failed to get device configuration: {0}")]
    ConfigurationFailed(String),
    /// Failed to create the audio stream.
    #[error("Failed to create audio stream: {0}")]
    StreamCreationFailed(String),
    /// Failed to start/stop playback.
    #[error("Failed to control audio playback: {0}")]
    StreamPlaybackFailed(String),
}

/// Information about an audio output device.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    /// Human-readable device name.
    pub name: String,
    /// Whether this is the default output device.
    pub is_default: bool,
    /// Index in the device list (for selection).
    pub index: usize,
}

/// Hosts a `NodeManager` inside a cpal output stream.
pub struct AudioEngine {
    host: Host,
    device: Device,
    config: StreamConfig,
    stream: Option<Stream>,
}

impl AudioEngine {
    /// Create a new AudioEngine using the default output device.
    pub fn new() -> Result<Self, AudioError> {
        let host = cpal::default_host();

        let device = host
            .default_output_device()
            .ok_or(AudioError::NoOutputDevice)?;
        let config = Self::default_config(&device)?;

        tracing::info!(
            device = %device.name().unwrap_or_else(|_| "Unknown".to_string()),
            sample_rate = config.sample_rate.0,
            channels = config.channels,
            "opened output device"
        );

        Ok(Self {
            host,
            device,
            config,
            stream: None,
        })
    }

    fn default_config(device: &Device) -> Result<StreamConfig, AudioError> {
        let supported_config = device
            .default_output_config()
            .map_err(|e| AudioError::ConfigurationFailed(e.to_string()))?;

        Ok(StreamConfig {
            channels: supported_config.channels(),
            sample_rate: SampleRate(supported_config.sample_rate().0),
            buffer_size: cpal::BufferSize::Default,
        })
    }

    /// Get information about all available output devices.
    pub fn enumerate_devices(&self) -> Vec<DeviceInfo> {
        let default_name = self
            .host
            .default_output_device()
            .and_then(|d| d.name().ok());

        self.host
            .output_devices()
            .map(|devices| {
                devices
                    .enumerate()
                    .filter_map(|(index, device)| {
                        device.name().ok().map(|name| DeviceInfo {
                            is_default: Some(&name) == default_name.as_ref(),
                            name,
                            index,
                        })
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Get the name of the currently selected device.
    pub fn current_device_name(&self) -> String {
        self.device.name().unwrap_or_else(|_| "Unknown".to_string())
    }

    /// Select a different output device by index.
    ///
    /// Stops the current stream; the manager that was running in it is
    /// dropped with it. Start again with a new manager.
    pub fn select_device(&mut self, index: usize) -> Result<(), AudioError> {
        self.stop()?;

        let device = self
            .host
            .output_devices()
            .map_err(|e| AudioError::ConfigurationFailed(e.to_string()))?
            .nth(index)
            .ok_or(AudioError::NoOutputDevice)?;
        let config = Self::default_config(&device)?;

        tracing::info!(
            index,
            device = %device.name().unwrap_or_else(|_| "Unknown".to_string()),
            "selected output device"
        );

        self.device = device;
        self.config = config;
        Ok(())
    }

    /// Get the current stream configuration.
    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Get the sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    /// Get the number of output channels.
    pub fn channels(&self) -> u16 {
        self.config.channels
    }

    /// Start the audio stream, moving `manager` into the callback.
    ///
    /// The manager is first matched to the device's sample rate and channel
    /// count. Keep a [`NodeManagerHandle`](super::NodeManagerHandle) from it
    /// beforehand to control the graph while it plays.
    pub fn start_with_manager(&mut self, mut manager: NodeManager) -> Result<(), AudioError> {
        if self.stream.is_some() {
            return Ok(());
        }

        let channels = self.config.channels as usize;
        if channels == 0 {
            return Err(AudioError::ConfigurationFailed(
                "device reports zero output channels".to_string(),
            ));
        }
        manager.set_sample_rate(self.config.sample_rate.0 as f32);
        manager.set_output_channel_count(channels);

        // Planar scratch, allocated before the callback exists
        let mut planar: Vec<Vec<f32>> = vec![vec![0.0; MAX_CALLBACK_FRAMES]; channels];
        let no_input: [&[f32]; 0] = [];

        let stream = self
            .device
            .build_output_stream(
                &self.config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    // REAL-TIME SAFE: No allocations, no locks, no blocking
                    for chunk in data.chunks_mut(MAX_CALLBACK_FRAMES * channels) {
                        let frames = chunk.len() / channels;
                        manager.process(&no_input[..], planar.as_mut_slice(), frames);

                        for (frame_index, frame) in chunk.chunks_mut(channels).enumerate() {
                            for (channel, sample) in frame.iter_mut().enumerate() {
                                *sample = planar[channel][frame_index];
                            }
                        }
                    }
                },
                move |err| {
                    tracing::error!(%err, "audio stream error");
                },
                None,
            )
            .map_err(|e| AudioError::StreamCreationFailed(e.to_string()))?;

        stream
            .play()
            .map_err(|e| AudioError::StreamPlaybackFailed(e.to_string()))?;

        tracing::info!(channels, "audio stream started");
        self.stream = Some(stream);
        Ok(())
    }

    /// Stop the audio stream.
    pub fn stop(&mut self) -> Result<(), AudioError> {
        if let Some(stream) = self.stream.take() {
            stream
                .pause()
                .map_err(|e| AudioError::StreamPlaybackFailed(e.to_string()))?;
            tracing::info!("audio stream stopped");
        }
        Ok(())
    }

    /// Check if the audio stream is currently running.
    pub fn is_running(&self) -> bool {
        self.stream.is_some()
    }
}
