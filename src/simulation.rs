//! Simulated hardware, so the instrument can run without a sensor board.
//!
//! Readings wander around a base value with uniform noise and fail with a
//! configurable probability, which exercises the sentinel paths of every
//! output mode.

use crate::bank::{DigitalOutput, Sensor};
use crate::protocol::RelayState;
use log::*;

/// Uniform noise in `[-amplitude, amplitude)`.
fn noise(amplitude: f64) -> f64 {
    (rand::random::<f64>() * 2.0 - 1.0) * amplitude
}

/// A noisy input that occasionally fails to produce a reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulatedInput {
    /// Center value, in the unit of the channel.
    pub base: f64,
    /// Maximum deviation from `base`.
    pub noise: f64,
    /// Probability in `[0, 1]` that a read fails.
    pub dropout: f64,
}

impl SimulatedInput {
    pub fn new(base: f64, noise: f64, dropout: f64) -> Self {
        Self {
            base,
            noise: noise.abs(),
            dropout: dropout.clamp(0.0, 1.0),
        }
    }
}

impl Sensor for SimulatedInput {
    fn read(&mut self) -> Option<f64> {
        if self.dropout > 0.0 && rand::random::<f64>() < self.dropout {
            return None;
        }
        Some(self.base + noise(self.noise))
    }
}

/// A relay line that only logs its transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulatedRelay {
    number: usize,
}

impl SimulatedRelay {
    pub fn new(number: usize) -> Self {
        Self { number }
    }
}

impl DigitalOutput for SimulatedRelay {
    fn write(&mut self, state: RelayState) {
        debug!("Simulated relay R{} -> {state}", self.number);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readings_stay_within_noise_band() {
        let mut input = SimulatedInput::new(22.0, 0.5, 0.0);
        for _ in 0..1000 {
            let value = input.read().unwrap();
            assert!((21.5..=22.5).contains(&value), "{value}");
        }
    }

    #[test]
    fn full_dropout_never_reads() {
        let mut input = SimulatedInput::new(1.0, 0.0, 1.0);
        for _ in 0..100 {
            assert_eq!(input.read(), None);
        }
    }

    #[test]
    fn parameters_are_sanitized() {
        let input = SimulatedInput::new(0.0, -2.0, 7.0);
        assert_eq!(input.noise, 2.0);
        assert_eq!(input.dropout, 1.0);
    }

    #[test]
    fn noiseless_input_is_exact() {
        let mut input = SimulatedInput::new(3.3, 0.0, 0.0);
        assert_eq!(input.read(), Some(3.3));
    }
}
