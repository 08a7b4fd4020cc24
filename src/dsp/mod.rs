//! DSP module
//!
//! Core node types.
//! Defines the Node trait, pins, sample buffers, ramps, and the delay line.

pub mod buffer;
pub mod context;
pub mod delay_buffer;
pub mod node;
pub mod port;
pub mod ramp;

pub use buffer::{AudioBuffers, AudioBuffersMut, SampleBuffer};
pub use context::ProcessContext;
pub use delay_buffer::DelayBuffer;
pub use node::{Node, NodeCategory, NodeId, NodeInfo, NodeInputs};
pub use port::{PinRef, PortDefinition, PortDirection};
pub use ramp::{Ramp, RampMode};
