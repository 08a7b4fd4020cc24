//! Sample buffers and the channel views the node manager processes.
//!
//! `SampleBuffer` is the per-pin storage a node owns. The `AudioBuffers` traits
//! abstract over the driver's channel layout so `NodeManager::process` can read
//! borrowed slices, owned vectors, or anything else that exposes planar channels.

/// A buffer containing one pin's worth of samples.
///
/// Sized to the manager's internal buffer size. Allocated when a node is
/// configured, never on the audio thread.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SampleBuffer {
    /// The sample data. Length matches the configured buffer size.
    pub samples: Vec<f32>,
}

impl SampleBuffer {
    /// Creates a new zeroed buffer with the specified size.
    pub fn new(size: usize) -> Self {
        Self {
            samples: vec![0.0; size],
        }
    }

    /// Clears the buffer, setting all samples to zero.
    pub fn clear(&mut self) {
        self.samples.fill(0.0);
    }

    /// Fills the buffer with a constant value.
    pub fn fill(&mut self, value: f32) {
        self.samples.fill(value);
    }

    /// Returns the number of samples in the buffer.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns true if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Resizes the buffer to the specified size.
    ///
    /// New samples are initialized to zero.
    pub fn resize(&mut self, new_size: usize) {
        self.samples.resize(new_size, 0.0);
    }

    /// Returns the samples as a slice.
    pub fn as_slice(&self) -> &[f32] {
        &self.samples
    }

    /// Returns the first `frames` samples, clipped to the buffer length.
    pub fn frames(&self, frames: usize) -> &[f32] {
        &self.samples[..frames.min(self.samples.len())]
    }
}

/// Read access to planar driver channels.
pub trait AudioBuffers {
    /// Number of channels available.
    fn channel_count(&self) -> usize;

    /// Samples of channel `index`.
    fn channel(&self, index: usize) -> &[f32];
}

/// Write access to planar driver channels.
pub trait AudioBuffersMut {
    /// Number of channels available.
    fn channel_count(&self) -> usize;

    /// Mutable samples of channel `index`.
    fn channel_mut(&mut self, index: usize) -> &mut [f32];
}

impl AudioBuffers for [&[f32]] {
    fn channel_count(&self) -> usize {
        self.len()
    }

    fn channel(&self, index: usize) -> &[f32] {
        self[index]
    }
}

impl AudioBuffers for [Vec<f32>] {
    fn channel_count(&self) -> usize {
        self.len()
    }

    fn channel(&self, index: usize) -> &[f32] {
        &self[index]
    }
}

impl AudioBuffersMut for [&mut [f32]] {
    fn channel_count(&self) -> usize {
        self.len()
    }

    fn channel_mut(&mut self, index: usize) -> &mut [f32] {
        self[index]
    }
}

impl AudioBuffersMut for [Vec<f32>] {
    fn channel_count(&self) -> usize {
        self.len()
    }

    fn channel_mut(&mut self, index: usize) -> &mut [f32] {
        &mut self[index]
    }
}
