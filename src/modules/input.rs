//! Driver input node.
//!
//! Exposes one channel of the driver's input as an output pin.

use std::any::Any;

use crate::dsp::{
    context::ProcessContext,
    node::{Node, NodeCategory, NodeInfo, NodeInputs},
    port::PortDefinition,
    SampleBuffer,
};

/// Reads driver input channel `channel`.
///
/// Outputs silence when the channel is not available.
pub struct InputNode {
    ports: Vec<PortDefinition>,
    channel: usize,
    out: SampleBuffer,
}

impl InputNode {
    /// Creates an input node reading `channel`.
    pub fn new(channel: usize) -> Self {
        Self {
            ports: vec![PortDefinition::output("out", "Out")],
            channel,
            out: SampleBuffer::default(),
        }
    }

    const PORT_OUT: usize = 0;

    /// Switches to another driver channel.
    pub fn set_channel(&mut self, channel: usize) {
        self.channel = channel;
    }

    /// The channel being read.
    pub fn channel(&self) -> usize {
        self.channel
    }
}

impl Node for InputNode {
    fn info(&self) -> &NodeInfo {
        static INFO: NodeInfo = NodeInfo {
            id: "io.input",
            name: "Input",
            category: NodeCategory::Io,
            description: "Reads one driver input channel",
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

    fn process(&mut self, _inputs: &NodeInputs<'_>, context: &mut ProcessContext<'_>) {
        let frames = context.frames.min(self.out.len());
        let dest = &mut self.out.samples[..frames];
        match context.input_channel(self.channel) {
            Some(source) => {
                let copied = source.len().min(frames);
                dest[..copied].copy_from_slice(&source[..copied]);
                dest[copied..].fill(0.0);
            }
            None => dest.fill(0.0),
        }
    }

    fn output(&self, index: usize) -> Option<&[f32]> {
        (index == Self::PORT_OUT).then(|| self.out.as_slice())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
