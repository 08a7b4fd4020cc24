//! Power-of-two circular buffer for time-shifted sample access.
//!
//! Capacity is rounded up to a power of two so wrap-around is a bitmask.
//! Reads further back than the capacity wrap and return stale data, never panic.

use std::ops::Index;

/// A circular delay line with power-of-two capacity.
#[derive(Clone, Debug)]
pub struct DelayBuffer {
    /// Sample storage. Length is a power of two.
    buffer: Vec<f32>,
    /// Capacity minus one.
    mask: usize,
    /// Index of the most recent write.
    write_index: usize,
}

impl DelayBuffer {
    /// Creates a zeroed delay buffer holding at least `max_delay` samples.
    ///
    /// Zero is treated as one.
    pub fn new(max_delay: usize) -> Self {
        let capacity = max_delay.max(1).next_power_of_two();
        Self {
            buffer: vec![0.0; capacity],
            mask: capacity - 1,
            write_index: 0,
        }
    }

    /// Stores `sample` as the newest entry.
    #[inline]
    pub fn write(&mut self, sample: f32) {
        self.write_index = (self.write_index + 1) & self.mask;
        self.buffer[self.write_index] = sample;
    }

    /// Returns the sample written `time` writes ago; `read(0)` is the newest.
    #[inline]
    pub fn read(&self, time: usize) -> f32 {
        self.buffer[self.write_index.wrapping_sub(time) & self.mask]
    }

    /// Reads a fractional delay with linear interpolation.
    ///
    /// Negative times are clamped to zero.
    #[inline]
    pub fn read_interpolating(&self, time: f32) -> f32 {
        let time = time.max(0.0);
        let whole = time.floor();
        let frac = time - whole;
        let index = whole as usize;

        let a = self.read(index);
        let b = self.read(index.wrapping_add(1));
        a + (b - a) * frac
    }

    /// Zeroes the contents without reallocating.
    pub fn clear(&mut self) {
        self.buffer.fill(0.0);
    }

    /// Number of samples held. Always a power of two.
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Longest delay that returns meaningful data.
    pub fn max_delay(&self) -> usize {
        self.mask
    }
}

impl Index<usize> for DelayBuffer {
    type Output = f32;

    fn index(&self, time: usize) -> &f32 {
        &self.buffer[self.write_index.wrapping_sub(time) & self.mask]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_capacity_rounded_to_power_of_two() {
        assert_eq!(DelayBuffer::new(0).capacity(), 1);
        assert_eq!(DelayBuffer::new(1).capacity(), 1);
        assert_eq!(DelayBuffer::new(5).capacity(), 8);
        assert_eq!(DelayBuffer::new(1024).capacity(), 1024);
        assert_eq!(DelayBuffer::new(1025).capacity(), 2048);
        assert_eq!(DelayBuffer::new(1000).max_delay(), 1023);
    }

    #[test]
    fn test_read_returns_history() {
        let mut delay = DelayBuffer::new(8);
        for i in 1..=5 {
            delay.write(i as f32);
        }
        assert_eq!(delay.read(0), 5.0);
        assert_eq!(delay.read(1), 4.0);
        assert_eq!(delay.read(4), 1.0);
        assert_eq!(delay[2], 3.0);
        // Not yet written
        assert_eq!(delay.read(5), 0.0);
    }

    #[test]
    fn test_read_beyond_capacity_wraps() {
        let mut delay = DelayBuffer::new(4);
        for i in 0..4 {
            delay.write(i as f32);
        }
        assert_eq!(delay.read(4), delay.read(0));
        assert_eq!(delay.read(usize::MAX), delay.read(3));
    }

    #[test]
    fn test_interpolating_read() {
        let mut delay = DelayBuffer::new(8);
        delay.write(0.0);
        delay.write(1.0);
        // read(0) = 1.0, read(1) = 0.0
        assert!((delay.read_interpolating(0.5) - 0.5).abs() < 1e-6);
        assert!((delay.read_interpolating(0.25) - 0.75).abs() < 1e-6);
        assert_eq!(delay.read_interpolating(-3.0), 1.0);
    }

    #[test]
    fn test_clear_keeps_capacity() {
        let mut delay = DelayBuffer::new(16);
        delay.write(1.0);
        delay.clear();
        assert_eq!(delay.capacity(), 16);
        assert!((0..16).all(|t| delay.read(t) == 0.0));
    }

    proptest! {
        #[test]
        fn prop_read_returns_value_written_k_steps_ago(
            capacity_log in 0u32..10,
            samples in proptest::collection::vec(-1.0f32..1.0, 1..2048),
            k_seed in any::<usize>(),
        ) {
            let mut delay = DelayBuffer::new(1usize << capacity_log);
            for &s in &samples {
                delay.write(s);
            }
            let k = k_seed % delay.capacity().min(samples.len());
            prop_assert_eq!(delay.read(k), samples[samples.len() - 1 - k]);
        }
    }
}
