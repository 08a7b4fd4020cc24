//! Driver output node.
//!
//! The sink of a signal chain. Register it as a root: each sub-block it copies
//! its input to its own output pin and routes that pin to a driver channel.

use std::any::Any;

use crate::dsp::{
    context::ProcessContext,
    node::{Node, NodeCategory, NodeInfo, NodeInputs},
    port::PortDefinition,
    SampleBuffer,
};

/// Routes its input to driver output channel `channel`.
///
/// # Ports
///
/// - **In** (Input): Signal to play.
/// - **Out** (Output): Copy of the input, summed into the channel by the manager.
pub struct OutputNode {
    /// Port definitions.
    ports: Vec<PortDefinition>,
    /// Destination driver channel.
    channel: usize,
    /// Copy of the input for the current sub-block.
    out: SampleBuffer,
}

impl OutputNode {
    /// Creates an output node feeding `channel`.
    pub fn new(channel: usize) -> Self {
        Self {
            ports: vec![
                PortDefinition::input("in", "In"),
                PortDefinition::output("out", "Out"),
            ],
            channel,
            out: SampleBuffer::default(),
        }
    }

    /// Port index constants.
    pub const PORT_IN: usize = 0;
    pub const PORT_OUT: usize = 0;

    /// Switches to another driver channel from the next sub-block on.
    pub fn set_channel(&mut self, channel: usize) {
        self.channel = channel;
    }

    /// The destination channel.
    pub fn channel(&self) -> usize {
        self.channel
    }
}

impl Node for OutputNode {
    fn info(&self) -> &NodeInfo {
        static INFO: NodeInfo = NodeInfo {
            id: "io.output",
            name: "Output",
            category: NodeCategory::Io,
            description: "Routes a signal to one driver output channel",
        };
        &INFO
    }

    fn ports(&self) -> &[PortDefinition] {
        &self.ports
    }

    fn set_sample_rate(&mut self, _sample_rate: f32) {}

    fn set_buffer_size(&mut self, buffer_size: usize) {
        self.out.resize(buffer_size);
    }

    fn process(&mut self, inputs: &NodeInputs<'_>, context: &mut ProcessContext<'_>) {
        let frames = context.frames.min(self.out.len());
        let dest = &mut self.out.samples[..frames];
        match inputs.get(Self::PORT_IN) {
            Some(source) => {
                let copied = source.len().min(frames);
                dest[..copied].copy_from_slice(&source[..copied]);
                dest[copied..].fill(0.0);
            }
            None => dest.fill(0.0),
        }
        context.provide_output_buffer_for_channel(Self::PORT_OUT, self.channel);
    }

    fn output(&self, index: usize) -> Option<&[f32]> {
        (index == Self::PORT_OUT).then(|| self.out.as_slice())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copies_input() {
        let mut node = OutputNode::new(0);
        node.set_buffer_size(4);
        let data = [0.5f32; 4];
        let slices = [Some(&data[..])];
        let mut ctx = ProcessContext::new(44100.0, 4);
        node.process(&NodeInputs::from_slices(&slices, 4), &mut ctx);
        assert_eq!(node.output(0).unwrap(), &data);
    }

    #[test]
    fn test_channel_switch() {
        let mut node = OutputNode::new(0);
        node.set_channel(1);
        assert_eq!(node.channel(), 1);
        assert_eq!(node.input_count(), 1);
    }
}
