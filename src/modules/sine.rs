//! Sine oscillator node.
//!
//! A plain sine source, used as a test tone.

use std::any::Any;
use std::f32::consts::TAU;

use crate::dsp::{
    context::ProcessContext,
    node::{Node, NodeCategory, NodeInfo, NodeInputs},
    port::PortDefinition,
    SampleBuffer,
};

/// Sine oscillator with a frequency modulation input.
///
/// # Ports
///
/// - **FM** (Input): Added to the base frequency, in Hz.
/// - **Out** (Output): Sine wave in -amplitude..amplitude.
pub struct SineNode {
    /// Sample rate from the last `set_sample_rate` call.
    sample_rate: f32,
    /// Port definitions.
    ports: Vec<PortDefinition>,
    /// Base frequency in Hz.
    frequency: f32,
    /// Peak amplitude.
    amplitude: f32,
    /// Current phase accumulator (0.0 to 1.0).
    phase: f32,
    /// Output buffer.
    out: SampleBuffer,
}

impl SineNode {
    /// Creates an oscillator at `frequency` Hz with unit amplitude.
    pub fn new(frequency: f32) -> Self {
        Self {
            sample_rate: 44100.0,
            ports: vec![
                PortDefinition::input_with_default("fm", "FM", 0.0),
                PortDefinition::output("out", "Out"),
            ],
            frequency,
            amplitude: 1.0,
            phase: 0.0,
            out: SampleBuffer::default(),
        }
    }

    /// Port index constants.
    pub const PORT_FM: usize = 0;
    pub const PORT_OUT: usize = 0;

    /// Sets the base frequency in Hz.
    pub fn set_frequency(&mut self, frequency: f32) {
        self.frequency = frequency;
    }

    /// Sets the peak amplitude.
    pub fn set_amplitude(&mut self, amplitude: f32) {
        self.amplitude = amplitude;
    }
}

impl Node for SineNode {
    fn info(&self) -> &NodeInfo {
        static INFO: NodeInfo = NodeInfo {
            id: "source.sine",
            name: "Sine",
            category: NodeCategory::Source,
            description: "Sine wave oscillator",
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

    fn process(&mut self, inputs: &NodeInputs<'_>, context: &mut ProcessContext<'_>) {
        let frames = context.frames.min(self.out.len());
        for i in 0..frames {
            self.out.samples[i] = (self.phase * TAU).sin() * self.amplitude;

            let frequency = self.frequency + inputs.sample_or(Self::PORT_FM, i, 0.0);
            self.phase += frequency / self.sample_rate;
            // Wrap phase to [0, 1)
            self.phase = self.phase.rem_euclid(1.0);
        }
    }

    fn output(&self, index: usize) -> Option<&[f32]> {
        (index == Self::PORT_OUT).then(|| self.out.as_slice())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
