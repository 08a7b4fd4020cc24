//! Stepwise ramps toward a destination value.
//!
//! A `Ramp` moves a value to a destination over an exact number of samples,
//! either linearly or along an exponential curve, and reports when it lands.
//! Envelopes and control nodes are built on it.

use serde::{Deserialize, Serialize};

/// Interpolation curve used by a ramp.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RampMode {
    /// Constant increment per sample.
    #[default]
    Linear,
    /// Constant ratio per sample. Falls back to linear across zero or negative values.
    Exponential,
}

/// A value that steps toward a destination over a fixed number of samples.
///
/// # Example
///
/// ```ignore
/// let mut ramp = Ramp::new(0.0);
/// ramp.start(1.0, 100, RampMode::Linear);
///
/// for _ in 0..100 {
///     if ramp.step() {
///         // Landed exactly on 1.0
///     }
/// }
/// ```
#[derive(Clone, Debug)]
pub struct Ramp {
    /// Current value.
    value: f32,
    /// Value the ramp ends on.
    destination: f32,
    /// Per-sample increment (linear) or factor (exponential).
    step: f32,
    /// Samples left before the ramp lands.
    remaining: usize,
    /// Curve of the active ramp.
    mode: RampMode,
}

impl Ramp {
    /// Offset applied so exponential ramps can start from or end on zero.
    const EXPONENTIAL_FLOOR: f32 = 1e-4;

    /// Creates a ramp resting at `initial`.
    pub fn new(initial: f32) -> Self {
        Self {
            value: initial,
            destination: initial,
            step: 0.0,
            remaining: 0,
            mode: RampMode::Linear,
        }
    }

    /// Starts ramping to `destination` over `steps` samples.
    ///
    /// Returns true if the ramp completed immediately (`steps == 0`).
    pub fn start(&mut self, destination: f32, steps: usize, mode: RampMode) -> bool {
        self.destination = destination;
        self.mode = mode;

        if steps == 0 {
            self.value = destination;
            self.remaining = 0;
            return true;
        }

        self.remaining = steps;
        self.step = match mode {
            RampMode::Linear => (destination - self.value) / steps as f32,
            RampMode::Exponential => {
                let from = self.value + Self::EXPONENTIAL_FLOOR;
                let to = destination + Self::EXPONENTIAL_FLOOR;
                if from > 0.0 && to > 0.0 {
                    (to / from).powf(1.0 / steps as f32)
                } else {
                    self.mode = RampMode::Linear;
                    (destination - self.value) / steps as f32
                }
            }
        };
        false
    }

    /// Advances one sample. Returns true on the sample the ramp lands.
    pub fn step(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }

        self.remaining -= 1;
        if self.remaining == 0 {
            self.value = self.destination;
            return true;
        }

        self.value = match self.mode {
            RampMode::Linear => self.value + self.step,
            RampMode::Exponential => {
                (self.value + Self::EXPONENTIAL_FLOOR) * self.step - Self::EXPONENTIAL_FLOOR
            }
        };
        false
    }

    /// Jumps to `value` and cancels any active ramp.
    pub fn set_value(&mut self, value: f32) {
        self.value = value;
        self.destination = value;
        self.remaining = 0;
    }

    /// Current value.
    pub fn value(&self) -> f32 {
        self.value
    }

    /// Destination of the current (or last) ramp.
    pub fn destination(&self) -> f32 {
        self.destination
    }

    /// Returns true while the ramp has samples left.
    pub fn is_ramping(&self) -> bool {
        self.remaining > 0
    }
}

impl Default for Ramp {
    fn default() -> Self {
        Self::new(0.0)
    }
}
