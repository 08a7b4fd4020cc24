//! Node manager: owns registered nodes and evaluates them block by block.
//!
//! The manager is the only audio-thread entry point. It splits each driver
//! block into sub-blocks of the internal buffer size, pulls every root node
//! once per sub-block, sums routed outputs into the driver's channels, and
//! drains the task queue in between. Nodes are owned by an arena keyed by
//! `NodeId`; connections are plain `PinRef` handles into that arena.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use rtrb::{Producer, PushError, RingBuffer};

use crate::dsp::node::OutputLookup;
use crate::dsp::{
    AudioBuffers, AudioBuffersMut, Node, NodeId, NodeInputs, PinRef, ProcessContext, SampleBuffer,
};

use super::config::EngineConfig;
use super::error::EngineError;
use super::handle::{NodeManagerHandle, SharedSettings};
use super::tasks::{task_channel, TaskReceiver, TaskSender};

/// A registered node plus its input wiring.
pub(crate) struct NodeSlot {
    /// `None` only while the node is being processed.
    node: Option<Box<dyn Node>>,
    /// Source of each input pin, indexed by input.
    connections: Vec<Option<PinRef>>,
    /// Sample time of the sub-block the node was last pulled in.
    last_processed: Option<u64>,
}

impl NodeSlot {
    /// Wraps a node with all inputs unconnected. Allocates; build off the audio thread.
    pub(crate) fn new(node: Box<dyn Node>) -> Self {
        let connections = vec![None; node.input_count()];
        Self {
            node: Some(node),
            connections,
            last_processed: None,
        }
    }
}

/// Arena of registered nodes.
struct NodeTable {
    slots: HashMap<NodeId, NodeSlot>,
}

impl NodeTable {
    /// Evaluates `id` for the current sub-block, pulling its sources first.
    ///
    /// A node is processed at most once per sub-block. The stamp is set before
    /// sources are pulled, so a cycle reads the previous sub-block's output.
    fn pull(&mut self, id: NodeId, ctx: &mut ProcessContext<'_>) {
        let input_count = match self.slots.get_mut(&id) {
            Some(slot) if slot.node.is_some() && slot.last_processed != Some(ctx.sample_time) => {
                slot.last_processed = Some(ctx.sample_time);
                slot.connections.len()
            }
            _ => return,
        };

        for input in 0..input_count {
            let source = self
                .slots
                .get(&id)
                .and_then(|slot| slot.connections.get(input).copied().flatten());
            if let Some(pin) = source {
                self.pull(pin.node, ctx);
            }
        }

        let Some(mut node) = self.slots.get_mut(&id).and_then(|slot| slot.node.take()) else {
            return;
        };
        if let Some(slot) = self.slots.get(&id) {
            let inputs = NodeInputs::graph(&slot.connections, &*self, ctx.frames);
            ctx.set_current_node(id);
            node.process(&inputs, ctx);
        }
        if let Some(slot) = self.slots.get_mut(&id) {
            slot.node = Some(node);
        }
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Box<dyn Node>> {
        self.slots.get_mut(&id).and_then(|slot| slot.node.as_mut())
    }
}

impl OutputLookup for NodeTable {
    fn output(&self, pin: PinRef) -> Option<&[f32]> {
        self.slots.get(&pin.node)?.node.as_ref()?.output(pin.output)
    }
}

/// Owns the live node graph and drives it from the audio callback.
///
/// Build it on any thread, wire it up through a [`NodeManagerHandle`], then
/// move it into the audio callback and call [`process`](Self::process) once
/// per driver block. Methods taking `&mut self` apply immediately and are for
/// the owner only; everything a control thread needs goes through the handle.
pub struct NodeManager {
    /// Registered nodes.
    table: NodeTable,
    /// Nodes pulled directly every sub-block.
    roots: Vec<NodeId>,
    /// Output pins routed to each driver channel during the current sub-block.
    output_mapping: Vec<Vec<PinRef>>,
    /// Driver input for the current sub-block, one buffer per channel.
    input_scratch: Vec<SampleBuffer>,
    /// Current sample rate in Hz.
    sample_rate: f32,
    /// Internal sub-block size.
    buffer_size: usize,
    /// Routing slots reserved per output channel.
    outputs_per_channel: usize,
    /// Samples processed since construction.
    sample_time: u64,
    /// Pending deferred work.
    tasks: TaskReceiver,
    /// Kept so handles can be created after the manager moves to the audio thread.
    task_sender: TaskSender,
    /// Settings mirrored for control threads.
    shared: Arc<SharedSettings>,
    /// Removed nodes on their way back to a control thread.
    retired: Producer<NodeSlot>,
}

impl NodeManager {
    /// Creates a manager from `config`. Sizes are clamped to at least one.
    pub fn new(config: &EngineConfig) -> Self {
        let buffer_size = config.internal_buffer_size.max(1);
        let outputs_per_channel = config.outputs_per_channel.max(1);
        let (task_sender, tasks) = task_channel(config.task_capacity);
        let (retired, retired_rx) = RingBuffer::new(config.retired_capacity.max(1));

        let shared = Arc::new(SharedSettings::new(
            config.sample_rate,
            buffer_size,
            config.input_channel_count,
            config.output_channel_count,
            retired_rx,
        ));

        tracing::info!(
            sample_rate = config.sample_rate,
            buffer_size,
            inputs = config.input_channel_count,
            outputs = config.output_channel_count,
            "node manager created"
        );

        Self {
            table: NodeTable {
                slots: HashMap::with_capacity(config.node_capacity),
            },
            roots: Vec::with_capacity(config.node_capacity),
            output_mapping: (0..config.output_channel_count)
                .map(|_| Vec::with_capacity(outputs_per_channel))
                .collect(),
            input_scratch: (0..config.input_channel_count)
                .map(|_| SampleBuffer::new(buffer_size))
                .collect(),
            sample_rate: config.sample_rate,
            buffer_size,
            outputs_per_channel,
            sample_time: 0,
            tasks,
            task_sender,
            shared,
            retired,
        }
    }

    /// Returns a control-thread handle to this manager.
    pub fn handle(&self) -> NodeManagerHandle {
        NodeManagerHandle::new(self.task_sender.clone(), Arc::clone(&self.shared))
    }

    // ========================================================================
    // Audio Processing
    // ========================================================================

    /// Processes `frame_count` frames.
    ///
    /// Writes exactly `frame_count` samples into each output channel (fewer if
    /// a channel is shorter) and reads at most `frame_count` samples from each
    /// input channel. Tasks are drained after every sub-block.
    ///
    /// REAL-TIME SAFE: no locks; allocation only inside tasks that resize.
    pub fn process<I, O>(&mut self, inputs: &I, outputs: &mut O, frame_count: usize)
    where
        I: AudioBuffers + ?Sized,
        O: AudioBuffersMut + ?Sized,
    {
        for channel in 0..outputs.channel_count() {
            let samples = outputs.channel_mut(channel);
            let end = frame_count.min(samples.len());
            samples[..end].fill(0.0);
        }

        let mut cursor = 0;
        while cursor < frame_count {
            let frames = self.buffer_size.min(frame_count - cursor);

            self.load_inputs(inputs, cursor, frames);
            for pins in &mut self.output_mapping {
                pins.clear();
            }

            {
                let Self {
                    table,
                    roots,
                    output_mapping,
                    input_scratch,
                    sample_rate,
                    buffer_size,
                    sample_time,
                    ..
                } = self;
                let mut ctx = ProcessContext::for_sub_block(
                    *sample_rate,
                    *buffer_size,
                    frames,
                    *sample_time,
                    input_scratch,
                    output_mapping,
                );
                for &root in roots.iter() {
                    table.pull(root, &mut ctx);
                }
            }

            self.mix_outputs(outputs, cursor, frames);

            cursor += frames;
            self.sample_time += frames as u64;
            self.run_pending_tasks();
        }
    }

    /// Copies this sub-block's driver input into the scratch buffers, zero-padded.
    fn load_inputs<I: AudioBuffers + ?Sized>(&mut self, inputs: &I, cursor: usize, frames: usize) {
        let available = inputs.channel_count();
        for (channel, scratch) in self.input_scratch.iter_mut().enumerate() {
            let end = frames.min(scratch.len());
            let dest = &mut scratch.samples[..end];
            if channel >= available {
                dest.fill(0.0);
                continue;
            }
            let source = inputs.channel(channel);
            let start = cursor.min(source.len());
            let stop = (cursor + end).min(source.len());
            let copied = stop - start;
            dest[..copied].copy_from_slice(&source[start..stop]);
            dest[copied..].fill(0.0);
        }
    }

    /// Sums every routed output pin into the driver channels at `cursor`.
    fn mix_outputs<O: AudioBuffersMut + ?Sized>(
        &self,
        outputs: &mut O,
        cursor: usize,
        frames: usize,
    ) {
        let channels = outputs.channel_count().min(self.output_mapping.len());
        for channel in 0..channels {
            let samples = outputs.channel_mut(channel);
            let end = (cursor + frames).min(samples.len());
            if cursor >= end {
                continue;
            }
            let dest = &mut samples[cursor..end];
            for &pin in &self.output_mapping[channel] {
                if let Some(source) = self.table.output(pin) {
                    for (out, &sample) in dest.iter_mut().zip(source) {
                        *out += sample;
                    }
                }
            }
        }
    }

    /// Runs every task queued before the call. Returns how many ran.
    ///
    /// Tasks queued by the tasks themselves wait for the next drain.
    pub fn run_pending_tasks(&mut self) -> usize {
        let pending = self.tasks.pending();
        let mut ran = 0;
        for _ in 0..pending {
            let Some(task) = self.tasks.try_recv() else {
                break;
            };
            task(self);
            ran += 1;
        }
        ran
    }

    // ========================================================================
    // Graph Modification
    // ========================================================================

    /// Configures `node` with the current settings and queues its insertion.
    ///
    /// The node joins the graph at the next task drain.
    pub fn register_node<N: Node>(&self, node: N) -> Result<NodeId, EngineError> {
        self.handle().register_node(node)
    }

    /// Queues adding `id` to the root set.
    pub fn register_root_node(&self, id: NodeId) -> Result<(), EngineError> {
        self.handle().register_root_node(id)
    }

    /// Removes a node immediately, dropping it from the root set and
    /// disconnecting every input it fed. Returns false if it was not registered.
    ///
    /// The node is handed to the retire queue and dropped by
    /// [`NodeManagerHandle::collect_garbage`]; if that queue is full it is
    /// dropped here.
    pub fn unregister_node(&mut self, id: NodeId) -> bool {
        let Some(slot) = self.table.slots.remove(&id) else {
            return false;
        };

        self.roots.retain(|&root| root != id);
        for other in self.table.slots.values_mut() {
            for connection in other.connections.iter_mut() {
                if connection.is_some_and(|pin| pin.node == id) {
                    *connection = None;
                }
            }
        }

        if let Err(PushError::Full(slot)) = self.retired.push(slot) {
            drop(slot);
        }
        true
    }

    /// Removes `id` from the root set immediately. The node stays registered.
    pub fn unregister_root_node(&mut self, id: NodeId) -> bool {
        let before = self.roots.len();
        self.roots.retain(|&root| root != id);
        self.roots.len() < before
    }

    /// Connects `source` to input `input` of `target`, replacing any previous source.
    ///
    /// Returns false if either end does not exist.
    pub fn connect(&mut self, source: PinRef, target: NodeId, input: usize) -> bool {
        let source_ok = self
            .table
            .slots
            .get(&source.node)
            .and_then(|slot| slot.node.as_ref())
            .is_some_and(|node| source.output < node.output_count());
        if !source_ok {
            return false;
        }

        match self
            .table
            .slots
            .get_mut(&target)
            .and_then(|slot| slot.connections.get_mut(input))
        {
            Some(connection) => {
                *connection = Some(source);
                true
            }
            None => false,
        }
    }

    /// Clears input `input` of `target`. Returns false if nothing was connected.
    pub fn disconnect(&mut self, target: NodeId, input: usize) -> bool {
        self.table
            .slots
            .get_mut(&target)
            .and_then(|slot| slot.connections.get_mut(input))
            .and_then(|connection| connection.take())
            .is_some()
    }

    pub(crate) fn insert_slot(
        &mut self,
        id: NodeId,
        mut slot: NodeSlot,
        snapshot_sample_rate: f32,
        snapshot_buffer_size: usize,
    ) {
        if let Some(node) = slot.node.as_mut() {
            // Settings may have changed since the node was configured
            if snapshot_sample_rate != self.sample_rate {
                node.set_sample_rate(self.sample_rate);
            }
            if snapshot_buffer_size != self.buffer_size {
                node.set_buffer_size(self.buffer_size);
            }
        }
        self.table.slots.insert(id, slot);
    }

    pub(crate) fn add_root(&mut self, id: NodeId) -> bool {
        if !self.table.slots.contains_key(&id) || self.roots.contains(&id) {
            return false;
        }
        self.roots.push(id);
        true
    }

    /// Queues `task` to run on the audio thread with access to the manager.
    pub fn enqueue_task<F>(&self, task: F) -> Result<(), EngineError>
    where
        F: FnOnce(&mut NodeManager) + Send + 'static,
    {
        self.task_sender.push(Box::new(task))
    }

    // ========================================================================
    // Settings
    // ========================================================================

    /// Sets the sample rate and reconfigures every node.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.shared.store_sample_rate(sample_rate);
        for slot in self.table.slots.values_mut() {
            if let Some(node) = slot.node.as_mut() {
                node.set_sample_rate(sample_rate);
            }
        }
    }

    /// Sets the internal sub-block size and resizes every node. Zero is treated as one.
    pub fn set_internal_buffer_size(&mut self, buffer_size: usize) {
        let buffer_size = buffer_size.max(1);
        self.buffer_size = buffer_size;
        self.shared.store_buffer_size(buffer_size);
        for scratch in &mut self.input_scratch {
            scratch.resize(buffer_size);
        }
        for slot in self.table.slots.values_mut() {
            if let Some(node) = slot.node.as_mut() {
                node.set_buffer_size(buffer_size);
            }
        }
    }

    /// Sets how many driver input channels nodes can read.
    pub fn set_input_channel_count(&mut self, count: usize) {
        let buffer_size = self.buffer_size;
        self.input_scratch
            .resize_with(count, || SampleBuffer::new(buffer_size));
        self.shared.store_input_channel_count(count);
    }

    /// Sets how many driver output channels are routed to.
    pub fn set_output_channel_count(&mut self, count: usize) {
        let capacity = self.outputs_per_channel;
        self.output_mapping
            .resize_with(count, || Vec::with_capacity(capacity));
        self.shared.store_output_channel_count(count);
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Current sample rate in Hz.
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Current internal sub-block size.
    pub fn internal_buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Driver input channels exposed to nodes.
    pub fn input_channel_count(&self) -> usize {
        self.input_scratch.len()
    }

    /// Driver output channels routed to.
    pub fn output_channel_count(&self) -> usize {
        self.output_mapping.len()
    }

    /// Samples processed so far.
    pub fn sample_time(&self) -> u64 {
        self.sample_time
    }

    /// Number of registered nodes.
    pub fn node_count(&self) -> usize {
        self.table.slots.len()
    }

    /// Number of root nodes.
    pub fn root_count(&self) -> usize {
        self.roots.len()
    }

    /// Returns true if `id` is registered.
    pub fn contains_node(&self, id: NodeId) -> bool {
        self.table.slots.contains_key(&id)
    }

    /// Returns true if `id` is in the root set.
    pub fn is_root(&self, id: NodeId) -> bool {
        self.roots.contains(&id)
    }

    /// Source connected to input `input` of `target`.
    pub fn connection(&self, target: NodeId, input: usize) -> Option<PinRef> {
        self.table.slots.get(&target)?.connections.get(input).copied().flatten()
    }

    /// Samples of an output pin as of the last sub-block.
    pub fn node_output(&self, pin: PinRef) -> Option<&[f32]> {
        self.table.output(pin)
    }

    /// Mutable access to a registered node of concrete type `T`.
    pub fn node_mut<T: Node>(&mut self, id: NodeId) -> Option<&mut T> {
        let node = self.table.node_mut(id)?;
        let any: &mut dyn Any = node.as_any_mut();
        any.downcast_mut::<T>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::{NodeCategory, NodeInfo, PortDefinition};
    use std::sync::atomic::{AtomicUsize, Ordering};

    // ========================================================================
    // Test Node Implementations
    // ========================================================================

    /// Outputs a constant and counts how often it is processed.
    struct Constant {
        ports: Vec<PortDefinition>,
        value: f32,
        out: SampleBuffer,
        calls: Arc<AtomicUsize>,
        sample_rate: f32,
    }

    impl Constant {
        fn new(value: f32) -> Self {
            Self {
                ports: vec![PortDefinition::output("out", "Out")],
                value,
                out: SampleBuffer::default(),
                calls: Arc::new(AtomicUsize::new(0)),
                sample_rate: 0.0,
            }
        }
    }

    impl Node for Constant {
        fn info(&self) -> &NodeInfo {
            static INFO: NodeInfo = NodeInfo {
                id: "test.constant",
                name: "Constant",
                category: NodeCategory::Source,
                description: "Outputs a constant value",
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

        fn process(&mut self, _inputs: &NodeInputs<'_>, context: &mut ProcessContext<'_>) {
            self.calls.fetch_add(1, Ordering::Relaxed);
            self.out.samples[..context.frames].fill(self.value);
        }

        fn output(&self, index: usize) -> Option<&[f32]> {
            (index == 0).then(|| self.out.as_slice())
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    /// Sums two inputs and routes the result to a channel.
    struct Sum {
        ports: Vec<PortDefinition>,
        out: SampleBuffer,
        channel: Option<usize>,
    }

    impl Sum {
        fn new(channel: Option<usize>) -> Self {
            Self {
                ports: vec![
                    PortDefinition::input("a", "A"),
                    PortDefinition::input("b", "B"),
                    PortDefinition::output("out", "Out"),
                ],
                out: SampleBuffer::default(),
                channel,
            }
        }
    }

    impl Node for Sum {
        fn info(&self) -> &NodeInfo {
            static INFO: NodeInfo = NodeInfo {
                id: "test.sum",
                name: "Sum",
                category: NodeCategory::Utility,
                description: "Adds two inputs",
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
                self.out.samples[i] = inputs.sample_or(0, i, 0.0) + inputs.sample_or(1, i, 0.0);
            }
            if let Some(channel) = self.channel {
                context.provide_output_buffer_for_channel(0, channel);
            }
        }

        fn output(&self, index: usize) -> Option<&[f32]> {
            (index == 0).then(|| self.out.as_slice())
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    fn manager(buffer_size: usize, outputs: usize) -> NodeManager {
        NodeManager::new(&EngineConfig {
            internal_buffer_size: buffer_size,
            output_channel_count: outputs,
            ..EngineConfig::default()
        })
    }

    fn silence(channels: usize, frames: usize) -> Vec<Vec<f32>> {
        vec![vec![0.0; frames]; channels]
    }

    // ========================================================================
    // Tests
    // ========================================================================

    #[test]
    fn test_registration_is_deferred() {
        let mut manager = manager(16, 1);
        let id = manager.register_node(Constant::new(1.0)).unwrap();

        assert!(!manager.contains_node(id));
        assert_eq!(manager.run_pending_tasks(), 1);
        assert!(manager.contains_node(id));
        assert_eq!(manager.node_count(), 1);
    }

    #[test]
    fn test_node_ids_are_unique() {
        let manager = manager(16, 1);
        let a = manager.register_node(Constant::new(1.0)).unwrap();
        let b = manager.register_node(Constant::new(1.0)).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_root_requires_registered_node() {
        let mut manager = manager(16, 1);
        manager.register_root_node(NodeId::from_raw(999)).unwrap();
        manager.run_pending_tasks();
        assert_eq!(manager.root_count(), 0);
    }

    #[test]
    fn test_shared_input_processed_once_per_sub_block() {
        let mut manager = manager(8, 1);
        let constant = Constant::new(0.25);
        let calls = Arc::clone(&constant.calls);

        let source = manager.register_node(constant).unwrap();
        let sum = manager.register_node(Sum::new(Some(0))).unwrap();
        manager.register_root_node(sum).unwrap();
        manager.run_pending_tasks();

        assert!(manager.connect(PinRef::new(source, 0), sum, 0));
        assert!(manager.connect(PinRef::new(source, 0), sum, 1));

        let inputs: Vec<Vec<f32>> = Vec::new();
        let mut outputs = silence(1, 32);
        manager.process(inputs.as_slice(), outputs.as_mut_slice(), 32);

        // Four sub-blocks, one evaluation each
        assert_eq!(calls.load(Ordering::Relaxed), 4);
        assert!(outputs[0].iter().all(|&s| (s - 0.5).abs() < 1e-6));
    }

    #[test]
    fn test_cycle_does_not_recurse_forever() {
        let mut manager = manager(8, 1);
        let a = manager.register_node(Sum::new(Some(0))).unwrap();
        let b = manager.register_node(Sum::new(None)).unwrap();
        manager.register_root_node(a).unwrap();
        manager.run_pending_tasks();

        assert!(manager.connect(PinRef::new(b, 0), a, 0));
        assert!(manager.connect(PinRef::new(a, 0), b, 0));

        let inputs: Vec<Vec<f32>> = Vec::new();
        let mut outputs = silence(1, 16);
        manager.process(inputs.as_slice(), outputs.as_mut_slice(), 16);
        assert!(outputs[0].iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_partial_sub_block_and_untouched_tail() {
        let mut manager = manager(16, 1);
        let sum = manager.register_node(Sum::new(Some(0))).unwrap();
        manager.register_root_node(sum).unwrap();
        manager.run_pending_tasks();

        let inputs: Vec<Vec<f32>> = Vec::new();
        let mut outputs = vec![vec![9.0; 64]];
        manager.process(inputs.as_slice(), outputs.as_mut_slice(), 40);

        assert!(outputs[0][..40].iter().all(|&s| s == 0.0));
        assert!(outputs[0][40..].iter().all(|&s| s == 9.0));
        assert_eq!(manager.sample_time(), 40);
    }

    #[test]
    fn test_unregister_disconnects_and_retires() {
        let mut manager = manager(8, 1);
        let source = manager.register_node(Constant::new(1.0)).unwrap();
        let sum = manager.register_node(Sum::new(Some(0))).unwrap();
        manager.register_root_node(source).unwrap();
        manager.run_pending_tasks();
        assert!(manager.connect(PinRef::new(source, 0), sum, 0));

        assert!(manager.unregister_node(source));
        assert!(!manager.unregister_node(source));
        assert!(!manager.is_root(source));
        assert_eq!(manager.connection(sum, 0), None);
        assert_eq!(manager.handle().collect_garbage(), 1);
    }

    #[test]
    fn test_unregister_root_keeps_node() {
        let mut manager = manager(8, 1);
        let sum = manager.register_node(Sum::new(Some(0))).unwrap();
        manager.register_root_node(sum).unwrap();
        manager.run_pending_tasks();

        assert!(manager.unregister_root_node(sum));
        assert!(!manager.unregister_root_node(sum));
        assert!(manager.contains_node(sum));
    }

    #[test]
    fn test_connect_validates_pins() {
        let mut manager = manager(8, 1);
        let source = manager.register_node(Constant::new(1.0)).unwrap();
        let sum = manager.register_node(Sum::new(None)).unwrap();
        manager.run_pending_tasks();

        assert!(!manager.connect(PinRef::new(source, 1), sum, 0));
        assert!(!manager.connect(PinRef::new(source, 0), sum, 2));
        assert!(!manager.connect(PinRef::new(NodeId::from_raw(999), 0), sum, 0));
        assert!(manager.connect(PinRef::new(source, 0), sum, 1));
        assert!(manager.disconnect(sum, 1));
        assert!(!manager.disconnect(sum, 1));
    }

    #[test]
    fn test_settings_reach_nodes() {
        let mut manager = manager(8, 1);
        let id = manager.register_node(Constant::new(1.0)).unwrap();
        manager.run_pending_tasks();

        manager.set_sample_rate(48000.0);
        manager.set_internal_buffer_size(32);
        let node = manager.node_mut::<Constant>(id).unwrap();
        assert_eq!(node.sample_rate, 48000.0);
        assert_eq!(node.out.len(), 32);
        assert!(manager.node_mut::<Sum>(id).is_none());
    }

    #[test]
    fn test_registration_reapplies_changed_settings() {
        let mut manager = manager(8, 1);
        // Configured with 8, inserted after the size became 16
        let id = manager.register_node(Constant::new(1.0)).unwrap();
        manager.set_internal_buffer_size(16);
        manager.run_pending_tasks();

        assert_eq!(manager.node_mut::<Constant>(id).unwrap().out.len(), 16);
    }

    #[test]
    fn test_channel_counts() {
        let mut manager = manager(8, 2);
        manager.set_output_channel_count(4);
        manager.set_input_channel_count(3);
        assert_eq!(manager.output_channel_count(), 4);
        assert_eq!(manager.input_channel_count(), 3);
        assert_eq!(manager.handle().output_channel_count(), 4);
        assert_eq!(manager.handle().input_channel_count(), 3);
    }
}
