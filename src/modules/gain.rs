//! Gain node.
//!
//! Multiplies an input signal by a gain factor and an optional modulation
//! signal, for fixed attenuation or envelope-controlled amplitude.

use std::any::Any;

use crate::dsp::{
    context::ProcessContext,
    node::{Node, NodeCategory, NodeInfo, NodeInputs},
    port::PortDefinition,
    SampleBuffer,
};

/// Scales its input.
///
/// # Ports
///
/// - **In** (Input): Signal to scale. Unconnected reads as 0.
/// - **Modulation** (Input): Per-sample multiplier. Unconnected reads as 1.
/// - **Out** (Output): `In × Modulation × gain`.
pub struct GainNode {
    /// Port definitions.
    ports: Vec<PortDefinition>,
    /// Static gain factor.
    gain: f32,
    /// Output buffer.
    out: SampleBuffer,
}

impl GainNode {
    /// Creates a gain node with the given factor.
    pub fn new(gain: f32) -> Self {
        Self {
            ports: vec![
                PortDefinition::input_with_default("in", "In", 0.0),
                PortDefinition::input_with_default("modulation", "Modulation", 1.0),
                PortDefinition::output("out", "Out"),
            ],
            gain,
            out: SampleBuffer::default(),
        }
    }

    /// Port index constants.
    pub const PORT_IN: usize = 0;
    pub const PORT_MODULATION: usize = 1;
    pub const PORT_OUT: usize = 0;

    /// Sets the gain factor.
    pub fn set_gain(&mut self, gain: f32) {
        self.gain = gain;
    }

    /// Current gain factor.
    pub fn gain(&self) -> f32 {
        self.gain
    }
}

impl Default for GainNode {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl Node for GainNode {
    fn info(&self) -> &NodeInfo {
        static INFO: NodeInfo = NodeInfo {
            id: "util.gain",
            name: "Gain",
            category: NodeCategory::Utility,
            description: "Multiplies a signal by a gain and a modulation input",
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
        let input_default = self.ports[Self::PORT_IN].default_value;
        let modulation_default = self.ports[Self::PORT_MODULATION].default_value;

        for (i, out) in self.out.samples[..frames].iter_mut().enumerate() {
            let input = inputs.sample_or(Self::PORT_IN, i, input_default);
            let modulation = inputs.sample_or(Self::PORT_MODULATION, i, modulation_default);
            *out = input * modulation * self.gain;
        }
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

    fn run(gain: &mut GainNode, input: Option<&[f32]>, modulation: Option<&[f32]>) -> Vec<f32> {
        gain.set_buffer_size(4);
        let slices = [input, modulation];
        let inputs = NodeInputs::from_slices(&slices, 4);
        let mut ctx = ProcessContext::new(44100.0, 4);
        gain.process(&inputs, &mut ctx);
        gain.output(GainNode::PORT_OUT).unwrap().to_vec()
    }

    #[test]
    fn test_scales_input() {
        let mut gain = GainNode::new(0.5);
        let out = run(&mut gain, Some(&[1.0, -1.0, 0.5, 0.0]), None);
        assert_eq!(out, vec![0.5, -0.5, 0.25, 0.0]);
    }

    #[test]
    fn test_modulation_multiplies() {
        let mut gain = GainNode::new(2.0);
        let out = run(&mut gain, Some(&[1.0; 4]), Some(&[0.0, 0.25, 0.5, 1.0]));
        assert_eq!(out, vec![0.0, 0.5, 1.0, 2.0]);
    }

    #[test]
    fn test_unconnected_input_is_silent() {
        let mut gain = GainNode::new(1.0);
        let out = run(&mut gain, None, Some(&[1.0; 4]));
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_set_gain() {
        let mut gain = GainNode::default();
        gain.set_gain(0.1);
        assert_eq!(gain.gain(), 0.1);
        assert_eq!(gain.input_count(), 2);
        assert_eq!(gain.output_count(), 1);
    }
}
