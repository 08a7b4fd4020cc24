//! Processing context for nodes.
//!
//! Carries the runtime information a node needs during one sub-block, plus
//! access to the driver's input channels and the manager's output routing.

use super::buffer::SampleBuffer;
use super::node::NodeId;
use super::port::PinRef;

/// Routing table of the current sub-block: one list of output pins per driver channel.
struct OutputRouting<'a> {
    mapping: &'a mut [Vec<PinRef>],
    current: Option<NodeId>,
}

/// Context provided to nodes during processing.
pub struct ProcessContext<'a> {
    /// The audio sample rate in Hz (e.g., 44100, 48000).
    pub sample_rate: f32,
    /// The manager's internal buffer size.
    pub buffer_size: usize,
    /// Frames to produce in this sub-block. Never larger than `buffer_size`.
    pub frames: usize,
    /// Samples processed by the manager before this sub-block.
    pub sample_time: u64,
    inputs: &'a [SampleBuffer],
    routing: Option<OutputRouting<'a>>,
}

impl<'a> ProcessContext<'a> {
    /// Creates a standalone context with no driver channels attached.
    pub fn new(sample_rate: f32, buffer_size: usize) -> Self {
        Self {
            sample_rate,
            buffer_size,
            frames: buffer_size,
            sample_time: 0,
            inputs: &[],
            routing: None,
        }
    }

    pub(crate) fn for_sub_block(
        sample_rate: f32,
        buffer_size: usize,
        frames: usize,
        sample_time: u64,
        inputs: &'a [SampleBuffer],
        mapping: &'a mut [Vec<PinRef>],
    ) -> Self {
        Self {
            sample_rate,
            buffer_size,
            frames,
            sample_time,
            inputs,
            routing: Some(OutputRouting {
                mapping,
                current: None,
            }),
        }
    }

    /// Attaches driver input channels to a standalone context.
    pub fn with_inputs(mut self, inputs: &'a [SampleBuffer]) -> Self {
        self.inputs = inputs;
        self
    }

    /// Sets the number of frames to produce.
    pub fn with_frames(mut self, frames: usize) -> Self {
        self.frames = frames.min(self.buffer_size);
        self
    }

    pub(crate) fn set_current_node(&mut self, id: NodeId) {
        if let Some(routing) = self.routing.as_mut() {
            routing.current = Some(id);
        }
    }

    /// Samples of driver input `channel` for this sub-block.
    pub fn input_channel(&self, channel: usize) -> Option<&[f32]> {
        self.inputs.get(channel).map(|b| b.frames(self.frames))
    }

    /// Number of driver input channels available.
    pub fn input_channel_count(&self) -> usize {
        self.inputs.len()
    }

    /// Routes output `output_index` of the node being processed to driver `channel`.
    ///
    /// Must be called during every sub-block the output should be heard in; the
    /// routing table is cleared before each one. Ignored outside a manager, for
    /// channels beyond the configured count, or when the channel's routing slots
    /// are exhausted.
    pub fn provide_output_buffer_for_channel(&mut self, output_index: usize, channel: usize) {
        let Some(routing) = self.routing.as_mut() else {
            return;
        };
        let Some(node) = routing.current else {
            return;
        };
        if let Some(pins) = routing.mapping.get_mut(channel) {
            // No reallocation on the audio thread
            if pins.len() < pins.capacity() {
                pins.push(PinRef::new(node, output_index));
            }
        }
    }

    /// Converts milliseconds to a whole number of samples.
    pub fn ms_to_samples(&self, ms: f32) -> usize {
        (ms * self.samples_per_millisecond()).round().max(0.0) as usize
    }

    /// Samples per millisecond at the current rate.
    pub fn samples_per_millisecond(&self) -> f32 {
        self.sample_rate / 1000.0
    }

    /// Converts a frequency in Hz to radians per sample.
    pub fn frequency_to_radians(&self, frequency: f32) -> f32 {
        2.0 * std::f32::consts::PI * frequency / self.sample_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_context_creation() {
        let ctx = ProcessContext::new(44100.0, 256);
        assert_eq!(ctx.sample_rate, 44100.0);
        assert_eq!(ctx.buffer_size, 256);
        assert_eq!(ctx.frames, 256);
        assert_eq!(ctx.input_channel_count(), 0);
    }

    #[test]
    fn test_with_frames_clamped() {
        let ctx = ProcessContext::new(44100.0, 64).with_frames(100);
        assert_eq!(ctx.frames, 64);
    }

    #[test]
    fn test_time_conversions() {
        let ctx = ProcessContext::new(48000.0, 256);
        assert_eq!(ctx.ms_to_samples(1000.0), 48000);
        assert_eq!(ctx.ms_to_samples(-5.0), 0);
        assert!((ctx.samples_per_millisecond() - 48.0).abs() < 1e-6);
    }

    #[test]
    fn test_input_channel_clipped() {
        let inputs = [SampleBuffer::new(64)];
        let ctx = ProcessContext::new(44100.0, 64)
            .with_inputs(&inputs)
            .with_frames(10);
        assert_eq!(ctx.input_channel(0).map(|s| s.len()), Some(10));
        assert!(ctx.input_channel(1).is_none());
    }

    #[test]
    fn test_routing_records_current_node() {
        let mut mapping = vec![Vec::with_capacity(4), Vec::with_capacity(4)];
        {
            let mut ctx = ProcessContext::for_sub_block(44100.0, 8, 8, 0, &[], &mut mapping);
            // Nothing is recorded before a node is current
            ctx.provide_output_buffer_for_channel(0, 0);
            ctx.set_current_node(NodeId::from_raw(3));
            ctx.provide_output_buffer_for_channel(1, 0);
            ctx.provide_output_buffer_for_channel(0, 5);
        }
        assert_eq!(mapping[0], vec![PinRef::new(NodeId::from_raw(3), 1)]);
        assert!(mapping[1].is_empty());
    }

    #[test]
    fn test_routing_never_grows() {
        let mut mapping = vec![Vec::with_capacity(2)];
        let capacity = mapping[0].capacity();
        {
            let mut ctx = ProcessContext::for_sub_block(44100.0, 8, 8, 0, &[], &mut mapping);
            ctx.set_current_node(NodeId::from_raw(1));
            for _ in 0..capacity + 3 {
                ctx.provide_output_buffer_for_channel(0, 0);
            }
        }
        assert_eq!(mapping[0].len(), capacity);
        assert_eq!(mapping[0].capacity(), capacity);
    }

    #[test]
    fn test_standalone_routing_ignored() {
        let mut ctx = ProcessContext::new(44100.0, 8);
        ctx.provide_output_buffer_for_channel(0, 0);
    }
}
