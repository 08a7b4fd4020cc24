//! Built-in nodes.
//!
//! Sources, control signals, effects, and the input/output nodes that
//! connect a graph to the driver's channels.

pub mod control;
pub mod delay;
pub mod envelope;
pub mod gain;
pub mod input;
pub mod output;
pub mod sine;

// Re-export commonly used types
pub use control::ControlNode;
pub use delay::DelayNode;
pub use envelope::{
    compute_relative_scale, EnvelopeEvent, EnvelopeGenerator, EnvelopeHandle, EnvelopeState,
    Segment,
};
pub use gain::GainNode;
pub use input::InputNode;
pub use output::OutputNode;
pub use sine::SineNode;
