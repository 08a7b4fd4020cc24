//! Segment envelope generator.
//!
//! Plays a list of ramp segments as a control signal. Envelopes are triggered
//! from a control thread through an [`EnvelopeHandle`] while the generator
//! keeps running on the audio thread:
//!
//! - `trigger` builds a complete playback view (segments, range, relative
//!   scale, start value), publishes it as the pending view, and raises a
//!   dirty flag.
//! - The generator adopts the pending view at its next safe point (a ramp
//!   landing, or the start of the next sub-block) and clears the flag.
//!
//! The live view is only ever replaced as a whole, so the audio thread never
//! sees a half-written envelope. Views it no longer needs travel back to the
//! handle to be dropped there.

use std::any::Any;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use rtrb::{Consumer, Producer, PushError, RingBuffer};
use serde::{Deserialize, Serialize};

use crate::dsp::{
    context::ProcessContext,
    node::{Node, NodeCategory, NodeInfo, NodeInputs},
    port::PortDefinition,
    ramp::{Ramp, RampMode},
    SampleBuffer,
};

/// Capacity of the finished-event queue.
const EVENT_CAPACITY: usize = 64;

/// Capacity of the queue returning replaced views to the handle.
const RETIRED_VIEW_CAPACITY: usize = 64;

/// One ramp of an envelope.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Value reached at the end of the segment.
    pub destination: f32,
    /// Duration in milliseconds, or a proportion of the remaining time when relative.
    pub duration: f32,
    /// Whether `duration` is relative.
    #[serde(default)]
    pub duration_relative: bool,
    /// Interpolation curve.
    #[serde(default)]
    pub mode: RampMode,
}

impl Segment {
    /// A linear segment lasting `duration_ms` milliseconds.
    pub fn absolute(destination: f32, duration_ms: f32) -> Self {
        Self {
            destination,
            duration: duration_ms,
            duration_relative: false,
            mode: RampMode::Linear,
        }
    }

    /// A linear segment taking `proportion` of the time left after absolute segments.
    pub fn relative(destination: f32, proportion: f32) -> Self {
        Self {
            destination,
            duration: proportion,
            duration_relative: true,
            mode: RampMode::Linear,
        }
    }

    /// Returns the segment with a different curve.
    pub fn with_mode(mut self, mode: RampMode) -> Self {
        self.mode = mode;
        self
    }
}

/// Scale applied to relative durations in `segments[start..=end]`.
///
/// `(total - absolute) / relative`, clamped at zero, and zero when the range
/// has no relative duration.
pub fn compute_relative_scale(
    segments: &[Segment],
    start: usize,
    end: usize,
    total_duration: f32,
) -> f32 {
    let (absolute, relative) = segments
        .iter()
        .take(end.saturating_add(1))
        .skip(start)
        .fold((0.0f32, 0.0f32), |(abs, rel), segment| {
            if segment.duration_relative {
                (abs, rel + segment.duration)
            } else {
                (abs + segment.duration, rel)
            }
        });

    if relative <= 0.0 {
        return 0.0;
    }
    ((total_duration - absolute) / relative).max(0.0)
}

/// Everything the audio thread needs to play one trigger.
#[derive(Debug)]
struct EnvelopeView {
    segments: Arc<[Segment]>,
    start_segment: usize,
    end_segment: usize,
    relative_scale: f32,
    start_value: f32,
}

/// State shared between the generator and its handle.
struct EnvelopeShared {
    /// Most recently triggered view.
    pending: ArcSwapOption<EnvelopeView>,
    /// Set when `pending` holds a view not yet adopted.
    dirty: AtomicBool,
    /// Set by `stop`, cleared by the generator.
    stop_requested: AtomicBool,
    /// Stop ramp time in milliseconds, as `f32` bits.
    stop_ramp_ms: AtomicU32,
    /// Last output value, as `f32` bits.
    value: AtomicU32,
}

/// Notifications sent from the generator to its handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnvelopeEvent {
    /// Playback ran out of segments (or was stopped) with the output at zero.
    Finished,
}

/// Playback state of the generator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnvelopeState {
    /// Nothing playing; output holds its last value.
    Idle,
    /// Ramping through segment `n`.
    Playing(usize),
    /// Ramping to zero after `stop`.
    Stopping,
    /// Reached zero after the last segment; the finished event was sent.
    Finished,
}

/// Envelope generator node.
///
/// # Ports
///
/// - **Out** (Output): The envelope value.
pub struct EnvelopeGenerator {
    /// Sample rate from the last `set_sample_rate` call.
    sample_rate: f32,
    /// Port definitions.
    ports: Vec<PortDefinition>,
    /// State shared with the handle.
    shared: Arc<EnvelopeShared>,
    /// View being played.
    live: Option<Arc<EnvelopeView>>,
    /// Next segment to play.
    next_segment: usize,
    /// Last segment to play.
    end_segment: usize,
    /// Scale for relative durations of the live view.
    relative_scale: f32,
    /// Playback state.
    state: EnvelopeState,
    /// Value generator.
    ramp: Ramp,
    /// Finished notifications.
    events: Producer<EnvelopeEvent>,
    /// Replaced views on their way to the handle.
    retired: Producer<Arc<EnvelopeView>>,
    /// Output buffer.
    out: SampleBuffer,
}

impl EnvelopeGenerator {
    /// Creates a generator and the handle that triggers it.
    pub fn new() -> (Self, EnvelopeHandle) {
        let shared = Arc::new(EnvelopeShared {
            pending: ArcSwapOption::empty(),
            dirty: AtomicBool::new(false),
            stop_requested: AtomicBool::new(false),
            stop_ramp_ms: AtomicU32::new(0.0f32.to_bits()),
            value: AtomicU32::new(0.0f32.to_bits()),
        });
        let (events_tx, events_rx) = RingBuffer::new(EVENT_CAPACITY);
        let (retired_tx, retired_rx) = RingBuffer::new(RETIRED_VIEW_CAPACITY);

        let generator = Self {
            sample_rate: 44100.0,
            ports: vec![PortDefinition::output("out", "Out")],
            shared: Arc::clone(&shared),
            live: None,
            next_segment: 0,
            end_segment: 0,
            relative_scale: 0.0,
            state: EnvelopeState::Idle,
            ramp: Ramp::new(0.0),
            events: events_tx,
            retired: retired_tx,
            out: SampleBuffer::default(),
        };
        let handle = EnvelopeHandle {
            shared,
            events: events_rx,
            retired: retired_rx,
        };
        (generator, handle)
    }

    /// Port index constants.
    pub const PORT_OUT: usize = 0;

    /// Playback state.
    pub fn state(&self) -> EnvelopeState {
        self.state
    }

    /// Current output value.
    pub fn value(&self) -> f32 {
        self.ramp.value()
    }

    fn steps_for(&self, duration_ms: f32) -> usize {
        (duration_ms * self.sample_rate / 1000.0).round().max(0.0) as usize
    }

    /// Swaps in the pending view if one was published. Returns true if it did.
    fn adopt_pending(&mut self) -> bool {
        if !self.shared.dirty.swap(false, Ordering::AcqRel) {
            return false;
        }
        let Some(view) = self.shared.pending.load_full() else {
            return false;
        };

        self.next_segment = view.start_segment;
        self.end_segment = view.end_segment;
        self.relative_scale = view.relative_scale;
        self.ramp.set_value(view.start_value);

        if let Some(old) = self.live.replace(view) {
            if let Err(PushError::Full(old)) = self.retired.push(old) {
                drop(old);
            }
        }
        true
    }

    /// Starts ramping toward segment `index`. Returns true if it landed immediately.
    fn play_segment(&mut self, index: usize) -> bool {
        let Some(view) = self.live.as_ref() else {
            return true;
        };
        debug_assert!(index < view.segments.len(), "segment {index} out of range");
        let Some(&segment) = view.segments.get(index) else {
            return true;
        };

        let duration = if segment.duration_relative {
            segment.duration * self.relative_scale
        } else {
            segment.duration
        };
        let steps = self.steps_for(duration);
        self.ramp.start(segment.destination, steps, segment.mode)
    }

    /// Advances playback after a ramp lands or a new view is pending.
    fn on_ramp_finished(&mut self) {
        loop {
            self.adopt_pending();

            if self.live.is_some() && self.next_segment <= self.end_segment {
                let index = self.next_segment;
                self.next_segment += 1;
                self.state = EnvelopeState::Playing(index);
                if self.play_segment(index) {
                    // Zero-length segment
                    continue;
                }
                return;
            }

            match self.state {
                EnvelopeState::Playing(_) | EnvelopeState::Stopping => {
                    if self.ramp.value() == 0.0 {
                        self.state = EnvelopeState::Finished;
                        let _ = self.events.push(EnvelopeEvent::Finished);
                    } else {
                        self.state = EnvelopeState::Idle;
                    }
                }
                EnvelopeState::Idle | EnvelopeState::Finished => {}
            }
            return;
        }
    }

    /// Skips the remaining segments and ramps to zero.
    fn begin_stop(&mut self, ramp_ms: f32) {
        let silent_idle = self.state == EnvelopeState::Idle && self.ramp.value() == 0.0;
        if self.state == EnvelopeState::Finished || silent_idle {
            return;
        }

        self.next_segment = self.end_segment.saturating_add(1);
        self.state = EnvelopeState::Stopping;
        let steps = self.steps_for(ramp_ms);
        if self.ramp.start(0.0, steps, RampMode::Linear) {
            self.on_ramp_finished();
        }
    }
}

impl Node for EnvelopeGenerator {
    fn info(&self) -> &NodeInfo {
        static INFO: NodeInfo = NodeInfo {
            id: "mod.envelope",
            name: "Envelope",
            category: NodeCategory::Modulation,
            description: "Segment envelope triggered from a control thread",
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
        if self.shared.stop_requested.swap(false, Ordering::AcqRel) {
            let ramp_ms = f32::from_bits(self.shared.stop_ramp_ms.load(Ordering::Acquire));
            self.begin_stop(ramp_ms);
        }
        if self.shared.dirty.load(Ordering::Acquire) {
            self.on_ramp_finished();
        }

        let frames = context.frames.min(self.out.len());
        for i in 0..frames {
            if self.ramp.is_ramping() && self.ramp.step() {
                self.on_ramp_finished();
            }
            self.out.samples[i] = self.ramp.value();
        }

        self.shared
            .value
            .store(self.ramp.value().to_bits(), Ordering::Relaxed);
    }

    fn output(&self, index: usize) -> Option<&[f32]> {
        (index == Self::PORT_OUT).then(|| self.out.as_slice())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Control-thread side of an [`EnvelopeGenerator`].
///
/// Triggering takes `&mut self`: one thread triggers a given envelope at a time.
pub struct EnvelopeHandle {
    shared: Arc<EnvelopeShared>,
    events: Consumer<EnvelopeEvent>,
    retired: Consumer<Arc<EnvelopeView>>,
}

impl EnvelopeHandle {
    /// Plays every segment from a start value of zero.
    ///
    /// Relative durations share whatever part of `total_duration_ms` the
    /// absolute segments leave.
    pub fn trigger(&mut self, segments: impl Into<Arc<[Segment]>>, total_duration_ms: f32) {
        let segments = segments.into();
        let end = segments.len().saturating_sub(1);
        self.trigger_range(segments, 0, end, 0.0, total_duration_ms);
    }

    /// Plays `segments[start..=end]`, jumping to `start_value` first.
    ///
    /// An empty segment list is ignored. Out-of-range indices are clamped.
    pub fn trigger_range(
        &mut self,
        segments: impl Into<Arc<[Segment]>>,
        start: usize,
        end: usize,
        start_value: f32,
        total_duration_ms: f32,
    ) {
        self.collect_garbage();

        let segments = segments.into();
        if segments.is_empty() {
            tracing::warn!("envelope triggered without segments; ignored");
            return;
        }
        let last = segments.len() - 1;
        if start > end || end > last {
            tracing::warn!(start, end, last, "envelope segment range clamped");
        }
        let end_segment = end.min(last);
        let start_segment = start.min(end_segment);

        let relative_scale =
            compute_relative_scale(&segments, start_segment, end_segment, total_duration_ms);
        tracing::trace!(start_segment, end_segment, relative_scale, "envelope triggered");

        self.shared.pending.store(Some(Arc::new(EnvelopeView {
            segments,
            start_segment,
            end_segment,
            relative_scale,
            start_value,
        })));
        self.shared.stop_requested.store(false, Ordering::Release);
        self.shared.dirty.store(true, Ordering::Release);
    }

    /// Skips the remaining segments and ramps to zero over `ramp_ms`.
    ///
    /// Supersedes a trigger the generator has not adopted yet.
    pub fn stop(&self, ramp_ms: f32) {
        self.shared.dirty.store(false, Ordering::Release);
        self.shared
            .stop_ramp_ms
            .store(ramp_ms.max(0.0).to_bits(), Ordering::Release);
        self.shared.stop_requested.store(true, Ordering::Release);
    }

    /// Output value at the end of the last processed sub-block.
    pub fn value(&self) -> f32 {
        f32::from_bits(self.shared.value.load(Ordering::Relaxed))
    }

    /// Receives one pending event.
    pub fn poll_event(&mut self) -> Option<EnvelopeEvent> {
        self.events.pop().ok()
    }

    /// Drains all pending events.
    pub fn drain_events(&mut self) -> impl Iterator<Item = EnvelopeEvent> + '_ {
        std::iter::from_fn(|| self.poll_event())
    }

    /// Drops views the generator has replaced. Returns how many were dropped.
    pub fn collect_garbage(&mut self) -> usize {
        let mut dropped = 0;
        while let Ok(view) = self.retired.pop() {
            drop(view);
            dropped += 1;
        }
        dropped
    }
}
