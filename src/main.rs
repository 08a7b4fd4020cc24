//! Modular Engine - demo player
//!
//! Plays an enveloped sine through a feedback delay on the default output
//! device, retriggering the envelope once per second.

use std::error::Error;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use modular_engine::dsp::{PinRef, RampMode};
use modular_engine::engine::{AudioEngine, EngineConfig, NodeManager};
use modular_engine::modules::{
    DelayNode, EnvelopeEvent, EnvelopeGenerator, GainNode, OutputNode, Segment, SineNode,
};

#[derive(Parser, Debug)]
#[command(name = "modular-engine", about = "Plays a small node graph on the default output")]
struct Args {
    /// Engine configuration file (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seconds to play
    #[arg(short, long, default_value_t = 5.0)]
    duration: f32,

    /// Oscillator frequency in Hz
    #[arg(short, long, default_value_t = 220.0)]
    frequency: f32,
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    config.validate()?;

    let manager = NodeManager::new(&config);
    let handle = manager.handle();

    // sine -> gain (envelope on modulation) -> delay -> left/right outputs
    let sine = handle.register_node(SineNode::new(args.frequency))?;
    let (envelope, mut envelope_handle) = EnvelopeGenerator::new();
    let envelope = handle.register_node(envelope)?;
    let gain = handle.register_node(GainNode::new(0.3))?;
    let delay = handle.register_node(DelayNode::new(300.0, 0.4, 0.35))?;
    let left = handle.register_node(OutputNode::new(0))?;
    let right = handle.register_node(OutputNode::new(1))?;

    handle.connect(PinRef::new(sine, SineNode::PORT_OUT), gain, GainNode::PORT_IN)?;
    handle.connect(
        PinRef::new(envelope, EnvelopeGenerator::PORT_OUT),
        gain,
        GainNode::PORT_MODULATION,
    )?;
    handle.connect(PinRef::new(gain, GainNode::PORT_OUT), delay, DelayNode::PORT_IN)?;
    for output in [left, right] {
        handle.connect(PinRef::new(delay, DelayNode::PORT_OUT), output, OutputNode::PORT_IN)?;
        handle.register_root_node(output)?;
    }

    let mut audio = AudioEngine::new()?;
    audio.start_with_manager(manager)?;

    let pluck: Vec<Segment> = vec![
        Segment::absolute(1.0, 5.0),
        Segment::relative(0.4, 1.0),
        Segment::relative(0.0, 3.0).with_mode(RampMode::Exponential),
    ];

    let started = Instant::now();
    let mut next_trigger = Duration::ZERO;
    let total = Duration::from_secs_f32(args.duration.max(0.0));

    while started.elapsed() < total {
        if started.elapsed() >= next_trigger {
            envelope_handle.trigger(pluck.clone(), 600.0);
            next_trigger += Duration::from_secs(1);
        }

        for event in envelope_handle.drain_events() {
            match event {
                EnvelopeEvent::Finished => tracing::debug!("envelope finished"),
            }
        }
        handle.collect_garbage();

        thread::sleep(Duration::from_millis(20));
    }

    audio.stop()?;
    Ok(())
}
