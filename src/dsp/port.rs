//! Pin definitions for nodes.
//!
//! Pins are the connection points on nodes where signals flow in and out.
//! Inputs and outputs are numbered separately, in declaration order.

use super::node::NodeId;

/// Direction of a pin on a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PortDirection {
    /// An input pin that receives signals.
    Input,
    /// An output pin that sends signals.
    Output,
}

impl PortDirection {
    /// Returns a human-readable name for the pin direction.
    pub fn name(&self) -> &'static str {
        match self {
            PortDirection::Input => "Input",
            PortDirection::Output => "Output",
        }
    }
}

/// Definition of a pin on a node.
#[derive(Clone, Debug)]
pub struct PortDefinition {
    /// Unique identifier for this pin within the node.
    pub id: &'static str,
    /// Human-readable name.
    pub name: &'static str,
    /// Whether this is an input or output pin.
    pub direction: PortDirection,
    /// Value an unconnected input reads as. Ignored for outputs.
    pub default_value: f32,
}

impl PortDefinition {
    /// Creates a new input pin definition.
    pub fn input(id: &'static str, name: &'static str) -> Self {
        Self::input_with_default(id, name, 0.0)
    }

    /// Creates a new input pin definition with a custom default value.
    pub fn input_with_default(id: &'static str, name: &'static str, default_value: f32) -> Self {
        Self {
            id,
            name,
            direction: PortDirection::Input,
            default_value,
        }
    }

    /// Creates a new output pin definition.
    pub fn output(id: &'static str, name: &'static str) -> Self {
        Self {
            id,
            name,
            direction: PortDirection::Output,
            default_value: 0.0,
        }
    }

    /// Returns true if this is an input pin.
    pub fn is_input(&self) -> bool {
        self.direction == PortDirection::Input
    }

    /// Returns true if this is an output pin.
    pub fn is_output(&self) -> bool {
        self.direction == PortDirection::Output
    }
}

/// A non-owning reference to an output pin of a registered node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PinRef {
    /// The node owning the output.
    pub node: NodeId,
    /// Output index on that node.
    pub output: usize,
}

impl PinRef {
    /// Creates a reference to `node`'s output `output`.
    pub fn new(node: NodeId, output: usize) -> Self {
        Self { node, output }
    }
}
