//! Engine module
//!
//! Node manager, deferred task channel, control handle, and cpal host.

pub mod audio_engine;
pub mod config;
pub mod error;
pub mod handle;
pub mod node_manager;
pub mod tasks;

pub use audio_engine::{AudioEngine, AudioError, DeviceInfo};
pub use config::EngineConfig;
pub use error::EngineError;
pub use handle::NodeManagerHandle;
pub use node_manager::NodeManager;
pub use tasks::{task_channel, Task, TaskReceiver, TaskSender};
