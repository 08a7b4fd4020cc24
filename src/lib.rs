//! Modular Engine Library
//!
//! Real-time audio node graph. Nodes are registered and wired from control
//! threads through a [`NodeManagerHandle`](engine::NodeManagerHandle); the
//! [`NodeManager`](engine::NodeManager) pulls the graph in fixed-size
//! sub-blocks on the audio thread and mixes root outputs into the driver's
//! channels.

pub mod dsp;
pub mod engine;
pub mod modules;
