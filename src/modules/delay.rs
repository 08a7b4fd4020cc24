//! Delay effect node.
//!
//! A mono delay line with feedback and wet/dry mix, built on `DelayBuffer`.
//! Delay time is read with linear interpolation so it can be set in
//! fractional milliseconds.

use std::any::Any;

use crate::dsp::{
    context::ProcessContext,
    delay_buffer::DelayBuffer,
    node::{Node, NodeCategory, NodeInfo, NodeInputs},
    port::PortDefinition,
    SampleBuffer,
};

/// Maximum delay time in milliseconds.
const MAX_DELAY_MS: f32 = 2000.0;

/// Feedback delay.
///
/// # Ports
///
/// - **In** (Input): Signal to delay.
/// - **Out** (Output): `dry × (1 - mix) + delayed × mix`.
///
/// # Settings
///
/// - **Time** (0-2000 ms): Delay time. Values below one sample are raised to one.
/// - **Feedback** (0-0.99): Portion of the delayed signal fed back into the line.
/// - **Mix** (0-1): Wet/dry balance.
pub struct DelayNode {
    /// Sample rate from the last `set_sample_rate` call.
    sample_rate: f32,
    /// Port definitions.
    ports: Vec<PortDefinition>,
    /// Delay line, sized for `MAX_DELAY_MS` at the current rate.
    line: DelayBuffer,
    /// Delay time in milliseconds.
    time_ms: f32,
    /// Feedback amount.
    feedback: f32,
    /// Wet/dry mix.
    mix: f32,
    /// Output buffer.
    out: SampleBuffer,
}

impl DelayNode {
    /// Creates a delay with the given time, feedback, and mix.
    pub fn new(time_ms: f32, feedback: f32, mix: f32) -> Self {
        let sample_rate = 44100.0;
        Self {
            sample_rate,
            ports: vec![
                PortDefinition::input("in", "In"),
                PortDefinition::output("out", "Out"),
            ],
            line: DelayBuffer::new(Self::capacity_for(sample_rate)),
            time_ms: time_ms.clamp(0.0, MAX_DELAY_MS),
            feedback: feedback.clamp(0.0, 0.99),
            mix: mix.clamp(0.0, 1.0),
            out: SampleBuffer::default(),
        }
    }

    /// Port index constants.
    pub const PORT_IN: usize = 0;
    pub const PORT_OUT: usize = 0;

    fn capacity_for(sample_rate: f32) -> usize {
        (MAX_DELAY_MS * sample_rate / 1000.0).ceil().max(1.0) as usize + 1
    }

    /// Sets the delay time in milliseconds.
    pub fn set_time(&mut self, time_ms: f32) {
        self.time_ms = time_ms.clamp(0.0, MAX_DELAY_MS);
    }

    /// Sets the feedback amount.
    pub fn set_feedback(&mut self, feedback: f32) {
        self.feedback = feedback.clamp(0.0, 0.99);
    }

    /// Sets the wet/dry mix.
    pub fn set_mix(&mut self, mix: f32) {
        self.mix = mix.clamp(0.0, 1.0);
    }

    /// Clears the delay line.
    pub fn clear(&mut self) {
        self.line.clear();
    }
}

impl Default for DelayNode {
    fn default() -> Self {
        Self::new(250.0, 0.3, 0.5)
    }
}

impl Node for DelayNode {
    fn info(&self) -> &NodeInfo {
        static INFO: NodeInfo = NodeInfo {
            id: "fx.delay",
            name: "Delay",
            category: NodeCategory::Effect,
            description: "Feedback delay line",
        };
        &INFO
    }

    fn ports(&self) -> &[PortDefinition] {
        &self.ports
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.line = DelayBuffer::new(Self::capacity_for(sample_rate));
    }

    fn set_buffer_size(&mut self, buffer_size: usize) {
        self.out.resize(buffer_size);
    }

    fn process(&mut self, inputs: &NodeInputs<'_>, context: &mut ProcessContext<'_>) {
        let frames = context.frames.min(self.out.len());
        let delay_samples = (self.time_ms * self.sample_rate / 1000.0)
            .clamp(1.0, self.line.max_delay() as f32);
        let dry_gain = 1.0 - self.mix;

        for i in 0..frames {
            let dry = inputs.sample_or(Self::PORT_IN, i, 0.0);
            // Read before writing, so offset one less than the delay
            let delayed = self.line.read_interpolating(delay_samples - 1.0);
            self.line.write(dry + delayed * self.feedback);
            self.out.samples[i] = dry * dry_gain + delayed * self.mix;
        }
    }

    fn output(&self, index: usize) -> Option<&[f32]> {
        (index == Self::PORT_OUT).then(|| self.out.as_slice())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
