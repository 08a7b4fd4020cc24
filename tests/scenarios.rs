//! End-to-end graph scenarios driven the way an audio callback would.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use proptest::prelude::*;

use modular_engine::dsp::PinRef;
use modular_engine::engine::{EngineConfig, NodeManager, NodeManagerHandle};
use modular_engine::modules::{
    ControlNode, EnvelopeEvent, EnvelopeGenerator, GainNode, InputNode, OutputNode, Segment,
};

fn manager(buffer_size: usize, inputs: usize, outputs: usize) -> NodeManager {
    NodeManager::new(&EngineConfig {
        sample_rate: 1000.0,
        internal_buffer_size: buffer_size,
        input_channel_count: inputs,
        output_channel_count: outputs,
        ..EngineConfig::default()
    })
}

/// control(1.0) -> gain(0.5) -> outputs on channels 0 and 1
fn constant_stereo(handle: &NodeManagerHandle) -> (PinRef, PinRef) {
    let control = handle.register_node(ControlNode::new(1.0)).unwrap();
    let gain = handle.register_node(GainNode::new(0.5)).unwrap();
    handle
        .connect(PinRef::new(control, 0), gain, GainNode::PORT_IN)
        .unwrap();
    for channel in 0..2 {
        let output = handle.register_node(OutputNode::new(channel)).unwrap();
        handle
            .connect(PinRef::new(gain, GainNode::PORT_OUT), output, OutputNode::PORT_IN)
            .unwrap();
        handle.register_root_node(output).unwrap();
    }
    (PinRef::new(control, 0), PinRef::new(gain, GainNode::PORT_OUT))
}

#[test]
fn test_constant_through_gain_reaches_both_channels() {
    let mut manager = manager(16, 0, 2);
    let handle = manager.handle();
    constant_stereo(&handle);

    let mut outputs = vec![vec![0.0f32; 64]; 2];
    manager.process(&[] as &[&[f32]], outputs.as_mut_slice(), 64);

    for channel in &outputs {
        // Registration lands after the first sub-block
        assert!(channel[..16].iter().all(|&s| s == 0.0));
        assert!(channel[16..].iter().all(|&s| s == 0.5));
    }

    manager.process(&[] as &[&[f32]], outputs.as_mut_slice(), 64);
    for channel in &outputs {
        assert!(channel.iter().all(|&s| s == 0.5));
    }
}

#[test]
fn test_pending_tasks_applied_before_first_block() {
    let mut manager = manager(16, 0, 2);
    let handle = manager.handle();
    constant_stereo(&handle);
    assert!(manager.run_pending_tasks() > 0);

    let mut outputs = vec![vec![0.0f32; 20]; 2];
    manager.process(&[] as &[&[f32]], outputs.as_mut_slice(), 20);
    assert!(outputs[0].iter().all(|&s| s == 0.5));
    assert!(outputs[1].iter().all(|&s| s == 0.5));
}

#[test]
fn test_input_passes_to_output() {
    let mut manager = manager(4, 1, 1);
    let handle = manager.handle();
    let input = handle.register_node(InputNode::new(0)).unwrap();
    let output = handle.register_node(OutputNode::new(0)).unwrap();
    handle
        .connect(PinRef::new(input, 0), output, OutputNode::PORT_IN)
        .unwrap();
    handle.register_root_node(output).unwrap();
    manager.run_pending_tasks();

    let signal: Vec<f32> = (0..10).map(|i| i as f32).collect();
    let inputs = [signal.as_slice()];
    let mut outputs = vec![vec![-1.0f32; 10]];
    manager.process(&inputs[..], outputs.as_mut_slice(), 10);
    assert_eq!(outputs[0], signal);

    // Short input is padded with silence
    let short = [&signal[..3]];
    manager.process(&short[..], outputs.as_mut_slice(), 6);
    assert_eq!(&outputs[0][..6], &[0.0f32, 1.0, 2.0, 0.0, 0.0, 0.0]);
}

#[test]
fn test_removed_node_goes_silent_and_is_collected() {
    let mut manager = manager(8, 0, 2);
    let handle = manager.handle();
    let (_, gain) = constant_stereo(&handle);
    manager.run_pending_tasks();

    let mut outputs = vec![vec![0.0f32; 8]; 2];
    manager.process(&[] as &[&[f32]], outputs.as_mut_slice(), 8);
    assert_eq!(outputs[0][7], 0.5);

    handle.unregister_node(gain.node).unwrap();
    manager.run_pending_tasks();
    assert!(!manager.contains_node(gain.node));

    manager.process(&[] as &[&[f32]], outputs.as_mut_slice(), 8);
    assert!(outputs[0].iter().all(|&s| s == 0.0));
    assert_eq!(handle.collect_garbage(), 1);
}

#[test]
fn test_envelope_modulates_gain() {
    let mut manager = manager(8, 0, 1);
    let handle = manager.handle();

    let control = handle.register_node(ControlNode::new(1.0)).unwrap();
    let (envelope, mut envelope_handle) = EnvelopeGenerator::new();
    let envelope = handle.register_node(envelope).unwrap();
    let gain = handle.register_node(GainNode::new(1.0)).unwrap();
    let output = handle.register_node(OutputNode::new(0)).unwrap();
    handle
        .connect(PinRef::new(control, 0), gain, GainNode::PORT_IN)
        .unwrap();
    handle
        .connect(
            PinRef::new(envelope, EnvelopeGenerator::PORT_OUT),
            gain,
            GainNode::PORT_MODULATION,
        )
        .unwrap();
    handle
        .connect(PinRef::new(gain, 0), output, OutputNode::PORT_IN)
        .unwrap();
    handle.register_root_node(output).unwrap();
    manager.run_pending_tasks();

    // 4 ms up, 4 ms down at 1000 Hz
    envelope_handle.trigger(
        vec![Segment::absolute(1.0, 4.0), Segment::absolute(0.0, 4.0)],
        0.0,
    );

    let mut outputs = vec![vec![0.0f32; 8]];
    manager.process(&[] as &[&[f32]], outputs.as_mut_slice(), 8);
    assert_eq!(outputs[0][3], 1.0);
    assert_eq!(outputs[0][7], 0.0);
    assert!((outputs[0][1] - 0.5).abs() < 1e-6);

    let events: Vec<_> = envelope_handle.drain_events().collect();
    assert_eq!(events, vec![EnvelopeEvent::Finished]);
}

#[test]
fn test_concurrent_triggers_never_tear() {
    let mut manager = manager(16, 0, 1);
    let handle = manager.handle();
    let (envelope, mut envelope_handle) = EnvelopeGenerator::new();
    let envelope = handle.register_node(envelope).unwrap();
    let output = handle.register_node(OutputNode::new(0)).unwrap();
    handle
        .connect(PinRef::new(envelope, 0), output, OutputNode::PORT_IN)
        .unwrap();
    handle.register_root_node(output).unwrap();
    manager.run_pending_tasks();

    const TRIGGERS: u32 = 500;
    let done = Arc::new(AtomicBool::new(false));
    let control = {
        let done = Arc::clone(&done);
        thread::spawn(move || {
            for k in 1..=TRIGGERS {
                // Every view holds the same value throughout
                let value = k as f32;
                let segments = vec![Segment::absolute(value, 0.0); (k % 4 + 1) as usize];
                let end = segments.len() - 1;
                envelope_handle.trigger_range(segments, 0, end, value, 0.0);
                if k % 50 == 0 {
                    thread::yield_now();
                }
            }
            done.store(true, Ordering::Release);
            envelope_handle
        })
    };

    let mut outputs = vec![vec![0.0f32; 32]];
    let mut last = 0.0f32;
    loop {
        let finished = done.load(Ordering::Acquire);
        manager.process(&[] as &[&[f32]], outputs.as_mut_slice(), 32);
        for &sample in &outputs[0] {
            assert_eq!(sample.fract(), 0.0, "blended value {sample}");
            assert!((0.0..=TRIGGERS as f32).contains(&sample));
            // Views are adopted in publication order
            assert!(sample >= last, "went back from {last} to {sample}");
            last = sample;
        }
        if finished {
            break;
        }
    }

    let envelope_handle = control.join().unwrap();
    assert_eq!(envelope_handle.value(), TRIGGERS as f32);
}

proptest! {
    #[test]
    fn prop_process_writes_exactly_frame_count(
        buffer_size in 1usize..40,
        frame_count in 0usize..200,
    ) {
        let mut manager = manager(buffer_size, 0, 2);
        let handle = manager.handle();
        constant_stereo(&handle);
        manager.run_pending_tasks();

        let mut outputs = vec![vec![9.0f32; 256]; 2];
        manager.process(&[] as &[&[f32]], outputs.as_mut_slice(), frame_count);

        for channel in &outputs {
            prop_assert!(channel[..frame_count].iter().all(|&s| s == 0.5));
            prop_assert!(channel[frame_count..].iter().all(|&s| s == 9.0));
        }
        prop_assert_eq!(manager.sample_time(), frame_count as u64);
    }
}
