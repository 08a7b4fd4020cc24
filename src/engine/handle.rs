//! Control-thread handle to a node manager.
//!
//! Every graph mutation made through the handle is wrapped in a task and
//! applied by the manager between sub-blocks. The handle also mirrors the
//! manager's settings in atomics so nodes can be configured before they are
//! handed over, and drops nodes the manager has removed.

use std::sync::atomic::{AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use rtrb::Consumer;

use crate::dsp::{Node, NodeId, PinRef};

use super::error::EngineError;
use super::node_manager::{NodeManager, NodeSlot};
use super::tasks::TaskSender;

/// Settings shared between the manager and its handles.
pub(crate) struct SharedSettings {
    /// Sample rate as `f32` bits.
    sample_rate: AtomicU32,
    buffer_size: AtomicUsize,
    input_channel_count: AtomicUsize,
    output_channel_count: AtomicUsize,
    next_node_id: AtomicU64,
    /// Nodes removed on the audio thread, waiting to be dropped.
    /// Only control threads lock this.
    retired: Mutex<Consumer<NodeSlot>>,
}

impl SharedSettings {
    pub(crate) fn new(
        sample_rate: f32,
        buffer_size: usize,
        input_channel_count: usize,
        output_channel_count: usize,
        retired: Consumer<NodeSlot>,
    ) -> Self {
        Self {
            sample_rate: AtomicU32::new(sample_rate.to_bits()),
            buffer_size: AtomicUsize::new(buffer_size),
            input_channel_count: AtomicUsize::new(input_channel_count),
            output_channel_count: AtomicUsize::new(output_channel_count),
            next_node_id: AtomicU64::new(1),
            retired: Mutex::new(retired),
        }
    }

    pub(crate) fn sample_rate(&self) -> f32 {
        f32::from_bits(self.sample_rate.load(Ordering::Acquire))
    }

    pub(crate) fn buffer_size(&self) -> usize {
        self.buffer_size.load(Ordering::Acquire)
    }

    pub(crate) fn store_sample_rate(&self, sample_rate: f32) {
        self.sample_rate
            .store(sample_rate.to_bits(), Ordering::Release);
    }

    pub(crate) fn store_buffer_size(&self, buffer_size: usize) {
        self.buffer_size.store(buffer_size, Ordering::Release);
    }

    pub(crate) fn store_input_channel_count(&self, count: usize) {
        self.input_channel_count.store(count, Ordering::Release);
    }

    pub(crate) fn store_output_channel_count(&self, count: usize) {
        self.output_channel_count.store(count, Ordering::Release);
    }

    fn allocate_id(&self) -> NodeId {
        NodeId::from_raw(self.next_node_id.fetch_add(1, Ordering::Relaxed))
    }
}

/// Cloneable handle for mutating a node manager from control threads.
///
/// Non-blocking: every call is an atomic update and/or one push into the
/// pre-allocated task queue. A full queue is reported as
/// [`EngineError::TaskQueueFull`] and nothing is applied.
#[derive(Clone)]
pub struct NodeManagerHandle {
    tasks: TaskSender,
    shared: Arc<SharedSettings>,
}

impl NodeManagerHandle {
    pub(crate) fn new(tasks: TaskSender, shared: Arc<SharedSettings>) -> Self {
        Self { tasks, shared }
    }

    // ========================================================================
    // Graph Modification
    // ========================================================================

    /// Configures `node` with the manager's current settings and queues its insertion.
    pub fn register_node<N: Node>(&self, node: N) -> Result<NodeId, EngineError> {
        self.register_boxed_node(Box::new(node))
    }

    /// Boxed variant of [`register_node`](Self::register_node).
    pub fn register_boxed_node(&self, mut node: Box<dyn Node>) -> Result<NodeId, EngineError> {
        let sample_rate = self.shared.sample_rate();
        let buffer_size = self.shared.buffer_size();
        node.set_sample_rate(sample_rate);
        node.set_buffer_size(buffer_size);

        let id = self.shared.allocate_id();
        let name = node.info().name;
        let slot = NodeSlot::new(node);

        self.push(move |manager: &mut NodeManager| {
            manager.insert_slot(id, slot, sample_rate, buffer_size);
        })
        .inspect_err(|err| tracing::warn!(%id, name, %err, "failed to register node"))?;

        tracing::debug!(%id, name, sample_rate, buffer_size, "node registration queued");
        Ok(id)
    }

    /// Queues removal of `id`. See [`NodeManager::unregister_node`].
    pub fn unregister_node(&self, id: NodeId) -> Result<(), EngineError> {
        self.push(move |manager: &mut NodeManager| {
            manager.unregister_node(id);
        })
    }

    /// Queues adding `id` to the root set.
    ///
    /// Ignored if `id` is not registered when the task runs.
    pub fn register_root_node(&self, id: NodeId) -> Result<(), EngineError> {
        self.push(move |manager: &mut NodeManager| {
            manager.add_root(id);
        })
    }

    /// Queues removing `id` from the root set.
    pub fn unregister_root_node(&self, id: NodeId) -> Result<(), EngineError> {
        self.push(move |manager: &mut NodeManager| {
            manager.unregister_root_node(id);
        })
    }

    /// Queues connecting `source` to input `input` of `target`.
    pub fn connect(&self, source: PinRef, target: NodeId, input: usize) -> Result<(), EngineError> {
        self.push(move |manager: &mut NodeManager| {
            manager.connect(source, target, input);
        })
    }

    /// Queues clearing input `input` of `target`.
    pub fn disconnect(&self, target: NodeId, input: usize) -> Result<(), EngineError> {
        self.push(move |manager: &mut NodeManager| {
            manager.disconnect(target, input);
        })
    }

    /// Queues `f` to run against node `id` if it is registered as a `T`.
    pub fn with_node<T, F>(&self, id: NodeId, f: F) -> Result<(), EngineError>
    where
        T: Node,
        F: FnOnce(&mut T) + Send + 'static,
    {
        self.push(move |manager: &mut NodeManager| {
            if let Some(node) = manager.node_mut::<T>(id) {
                f(node);
            }
        })
    }

    /// Queues arbitrary work on the audio thread.
    pub fn enqueue_task<F>(&self, task: F) -> Result<(), EngineError>
    where
        F: FnOnce(&mut NodeManager) + Send + 'static,
    {
        self.push(task)
    }

    fn push<F>(&self, task: F) -> Result<(), EngineError>
    where
        F: FnOnce(&mut NodeManager) + Send + 'static,
    {
        self.tasks.push(Box::new(task))
    }

    // ========================================================================
    // Settings
    // ========================================================================

    /// Updates the sample rate. Nodes registered from now on are configured
    /// with it; live nodes are reconfigured at the next drain.
    pub fn set_sample_rate(&self, sample_rate: f32) -> Result<(), EngineError> {
        self.shared.store_sample_rate(sample_rate);
        tracing::debug!(sample_rate, "sample rate change queued");
        self.push(move |manager: &mut NodeManager| manager.set_sample_rate(sample_rate))
    }

    /// Updates the internal sub-block size. Zero is treated as one.
    pub fn set_internal_buffer_size(&self, buffer_size: usize) -> Result<(), EngineError> {
        let buffer_size = buffer_size.max(1);
        self.shared.store_buffer_size(buffer_size);
        tracing::debug!(buffer_size, "buffer size change queued");
        self.push(move |manager: &mut NodeManager| manager.set_internal_buffer_size(buffer_size))
    }

    /// Updates the number of driver input channels exposed to nodes.
    pub fn set_input_channel_count(&self, count: usize) -> Result<(), EngineError> {
        self.shared.store_input_channel_count(count);
        self.push(move |manager: &mut NodeManager| manager.set_input_channel_count(count))
    }

    /// Updates the number of driver output channels routed to.
    pub fn set_output_channel_count(&self, count: usize) -> Result<(), EngineError> {
        self.shared.store_output_channel_count(count);
        self.push(move |manager: &mut NodeManager| manager.set_output_channel_count(count))
    }

    /// Most recently requested sample rate.
    pub fn sample_rate(&self) -> f32 {
        self.shared.sample_rate()
    }

    /// Most recently requested internal buffer size.
    pub fn internal_buffer_size(&self) -> usize {
        self.shared.buffer_size()
    }

    /// Most recently requested input channel count.
    pub fn input_channel_count(&self) -> usize {
        self.shared.input_channel_count.load(Ordering::Acquire)
    }

    /// Most recently requested output channel count.
    pub fn output_channel_count(&self) -> usize {
        self.shared.output_channel_count.load(Ordering::Acquire)
    }

    // ========================================================================
    // Housekeeping
    // ========================================================================

    /// Drops nodes the manager has removed. Returns how many were dropped.
    ///
    /// Call periodically from a control thread.
    pub fn collect_garbage(&self) -> usize {
        let mut retired = self
            .shared
            .retired
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let mut dropped = 0;
        while let Ok(slot) = retired.pop() {
            drop(slot);
            dropped += 1;
        }
        if dropped > 0 {
            tracing::debug!(dropped, "collected removed nodes");
        }
        dropped
    }

    /// Check how many tasks can still be queued.
    pub fn task_slots_available(&self) -> usize {
        self.tasks.slots_available()
    }
}
