//! Control node.
//!
//! A single control value that can jump or ramp to a new value, emitted as
//! a per-sample signal. Useful as a modulation source or a parameter feed.

use std::any::Any;

use crate::dsp::{
    context::ProcessContext,
    node::{Node, NodeCategory, NodeInfo, NodeInputs},
    port::PortDefinition,
    ramp::{Ramp, RampMode},
    SampleBuffer,
};

/// Emits a ramped control value.
///
/// # Ports
///
/// - **Out** (Output): The current value, one sample per frame.
pub struct ControlNode {
    /// Sample rate from the last `set_sample_rate` call.
    sample_rate: f32,
    /// Port definitions.
    ports: Vec<PortDefinition>,
    /// Value generator.
    ramp: Ramp,
    /// Output buffer.
    out: SampleBuffer,
}

impl ControlNode {
    /// Creates a control node resting at `initial`.
    pub fn new(initial: f32) -> Self {
        Self {
            sample_rate: 44100.0,
            ports: vec![PortDefinition::output("out", "Out")],
            ramp: Ramp::new(initial),
            out: SampleBuffer::default(),
        }
    }

    /// Port index constants.
    const PORT_OUT: usize = 0;

    /// Jumps to `value`, cancelling any ramp.
    pub fn set_value(&mut self, value: f32) {
        self.ramp.set_value(value);
    }

    /// Ramps to `destination` over `time_ms` milliseconds.
    pub fn ramp(&mut self, destination: f32, time_ms: f32, mode: RampMode) {
        let steps = (time_ms * self.sample_rate / 1000.0).round().max(0.0) as usize;
        self.ramp.start(destination, steps, mode);
    }

    /// Current value.
    pub fn value(&self) -> f32 {
        self.ramp.value()
    }

    /// Returns true while a ramp is in progress.
    pub fn is_ramping(&self) -> bool {
        self.ramp.is_ramping()
    }
}

impl Default for ControlNode {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl Node for ControlNode {
    fn info(&self) -> &NodeInfo {
        static INFO: NodeInfo = NodeInfo {
            id: "source.control",
            name: "Control",
            category: NodeCategory::Source,
            description: "Ramped control value",
        };
        &INFO
    }

    fn ports(&self) -> &[PortDefinition] {
        &self.ports
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
    }

    fn set_buffer_size(&mut self, buffer_size: usize) {
        self.out.resize(buffer_size);
    }

    fn process(&mut self, _inputs: &NodeInputs<'_>, context: &mut ProcessContext<'_>) {
        let frames = context.frames.min(self.out.len());
        if !self.ramp.is_ramping() {
            self.out.samples[..frames].fill(self.ramp.value());
            return;
        }
        for sample in &mut self.out.samples[..frames] {
            self.ramp.step();
            *sample = self.ramp.value();
        }
    }

    fn output(&self, index: usize) -> Option<&[f32]> {
        (index == Self::PORT_OUT).then(|| self.out.as_slice())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
