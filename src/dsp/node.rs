//! The core `Node` trait and supporting types.
//!
//! This module defines the interface every processing unit implements so the
//! node manager can evaluate it without knowing its concrete type.

use super::context::ProcessContext;
use super::port::{PinRef, PortDefinition};
use std::any::Any;
use std::fmt;

/// Unique identifier for a registered node.
///
/// Allocated from a monotonic counter and never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    /// Wraps a raw id value.
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw id value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// Category of a node, used for organization and logging.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeCategory {
    /// Signal sources (oscillators, constant controls).
    Source,
    /// Modulation sources (envelopes).
    Modulation,
    /// Effects (delay).
    Effect,
    /// Utility nodes (gain).
    Utility,
    /// Nodes that exchange audio with the driver.
    Io,
}

impl NodeCategory {
    /// Returns a human-readable name for the category.
    pub fn name(&self) -> &'static str {
        match self {
            NodeCategory::Source => "Source",
            NodeCategory::Modulation => "Modulation",
            NodeCategory::Effect => "Effect",
            NodeCategory::Utility => "Utility",
            NodeCategory::Io => "I/O",
        }
    }
}

/// Static information about a node type.
#[derive(Clone, Debug)]
pub struct NodeInfo {
    /// Unique identifier for the node type (e.g., "util.gain").
    pub id: &'static str,
    /// Human-readable name.
    pub name: &'static str,
    /// The category this node belongs to.
    pub category: NodeCategory,
    /// A brief description of what the node does.
    pub description: &'static str,
}

/// Resolves an output pin of another registered node to its current samples.
pub(crate) trait OutputLookup {
    fn output(&self, pin: PinRef) -> Option<&[f32]>;
}

enum InputSource<'a> {
    Graph {
        connections: &'a [Option<PinRef>],
        lookup: &'a dyn OutputLookup,
    },
    Direct(&'a [Option<&'a [f32]>]),
}

/// The input pins of a node for one sub-block.
///
/// Each input resolves to the connected output's samples, clipped to the
/// number of frames in the sub-block, or `None` when unconnected.
pub struct NodeInputs<'a> {
    source: InputSource<'a>,
    frames: usize,
}

impl<'a> NodeInputs<'a> {
    pub(crate) fn graph(
        connections: &'a [Option<PinRef>],
        lookup: &'a dyn OutputLookup,
        frames: usize,
    ) -> Self {
        Self {
            source: InputSource::Graph {
                connections,
                lookup,
            },
            frames,
        }
    }

    /// Builds inputs from plain slices, for driving a node outside a manager.
    pub fn from_slices(slices: &'a [Option<&'a [f32]>], frames: usize) -> Self {
        Self {
            source: InputSource::Direct(slices),
            frames,
        }
    }

    /// Inputs with nothing connected.
    pub fn none(frames: usize) -> Self {
        Self::from_slices(&[], frames)
    }

    /// Returns the samples feeding input `index`, if connected.
    pub fn get(&self, index: usize) -> Option<&'a [f32]> {
        let samples = match self.source {
            InputSource::Graph {
                connections,
                lookup,
            } => {
                let pin = connections.get(index).copied().flatten()?;
                lookup.output(pin)?
            }
            InputSource::Direct(slices) => slices.get(index).copied().flatten()?,
        };
        Some(&samples[..self.frames.min(samples.len())])
    }

    /// Returns sample `frame` of input `index`, or `default` when unconnected.
    pub fn sample_or(&self, index: usize, frame: usize, default: f32) -> f32 {
        self.get(index)
            .and_then(|samples| samples.get(frame).copied())
            .unwrap_or(default)
    }

    /// Returns true if input `index` is fed by another node.
    pub fn is_connected(&self, index: usize) -> bool {
        self.get(index).is_some()
    }

    /// Number of frames in the current sub-block.
    pub fn frames(&self) -> usize {
        self.frames
    }
}

/// The trait every processing unit implements.
///
/// # Lifecycle
///
/// A node is constructed on any thread and configured with the manager's
/// current settings before it is handed over. After registration it is only
/// touched on the audio thread: `set_sample_rate` and `set_buffer_size` are
/// called by the manager when its settings change, never concurrently with
/// `process`.
///
/// # Real-time Constraints
///
/// `process` runs on the audio thread and must not allocate, lock, or block.
pub trait Node: Send + 'static {
    /// Returns static information about this node.
    fn info(&self) -> &NodeInfo;

    /// Returns the pin definitions for this node.
    ///
    /// Inputs and outputs are indexed separately, in declaration order.
    fn ports(&self) -> &[PortDefinition];

    /// Called when the sample rate changes.
    fn set_sample_rate(&mut self, sample_rate: f32);

    /// Called when the internal buffer size changes. Resize output buffers here.
    fn set_buffer_size(&mut self, buffer_size: usize);

    /// Produces `context.frames` samples into every output pin.
    fn process(&mut self, inputs: &NodeInputs<'_>, context: &mut ProcessContext<'_>);

    /// Read-only view of output `index` as of the last `process` call.
    fn output(&self, index: usize) -> Option<&[f32]>;

    /// Allows control-side code to reach the concrete type through a task.
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Number of input pins.
    fn input_count(&self) -> usize {
        self.ports().iter().filter(|p| p.is_input()).count()
    }

    /// Number of output pins.
    fn output_count(&self) -> usize {
        self.ports().iter().filter(|p| p.is_output()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::SampleBuffer;

    /// A minimal node that copies its input to its output.
    struct Passthrough {
        ports: Vec<PortDefinition>,
        out: SampleBuffer,
    }

    impl Passthrough {
        fn new() -> Self {
            Self {
                ports: vec![
                    PortDefinition::input("in", "In"),
                    PortDefinition::output("out", "Out"),
                ],
                out: SampleBuffer::new(8),
            }
        }
    }

    impl Node for Passthrough {
        fn info(&self) -> &NodeInfo {
            static INFO: NodeInfo = NodeInfo {
                id: "test.passthrough",
                name: "Passthrough",
                category: NodeCategory::Utility,
                description: "Copies input to output",
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
            for i in 0..context.frames {
                self.out.samples[i] = inputs.sample_or(0, i, 0.0);
            }
        }

        fn output(&self, index: usize) -> Option<&[f32]> {
            (index == 0).then(|| self.out.as_slice())
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    #[test]
    fn test_node_id_display() {
        assert_eq!(NodeId::from_raw(7).to_string(), "node#7");
        assert_eq!(NodeId::from_raw(7).raw(), 7);
    }

    #[test]
    fn test_pin_counts() {
        let node = Passthrough::new();
        assert_eq!(node.input_count(), 1);
        assert_eq!(node.output_count(), 1);
        assert_eq!(node.info().category.name(), "Utility");
    }

    #[test]
    fn test_direct_inputs_clip_to_frames() {
        let data = [1.0f32; 8];
        let slices = [Some(&data[..])];
        let inputs = NodeInputs::from_slices(&slices, 4);
        assert_eq!(inputs.get(0).map(|s| s.len()), Some(4));
        assert!(inputs.is_connected(0));
        assert!(!inputs.is_connected(1));
        assert_eq!(inputs.sample_or(1, 0, 0.75), 0.75);
    }

    #[test]
    fn test_process_standalone() {
        let mut node = Passthrough::new();
        let data = [0.5f32; 8];
        let slices = [Some(&data[..])];
        let inputs = NodeInputs::from_slices(&slices, 8);
        let mut ctx = ProcessContext::new(44100.0, 8);
        node.process(&inputs, &mut ctx);
        assert_eq!(node.output(0), Some(&data[..]));
        assert!(node.output(1).is_none());
    }

    #[test]
    fn test_downcast() {
        let mut node: Box<dyn Node> = Box::new(Passthrough::new());
        assert!(node.as_any_mut().downcast_mut::<Passthrough>().is_some());
    }
}
