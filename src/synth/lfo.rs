//! Low Frequency Oscillator for modulation
//!
//! Drives the electric piano tremolo and the violin vibrato.

use std::f64::consts::PI;

/// Sine Low Frequency Oscillator
#[derive(Debug, Clone)]
pub struct Lfo {
    frequency: f64,
    phase: f64,
    sample_rate: f64,
}

impl Lfo {
    /// Create a new LFO
    pub fn new(frequency: f64, sample_rate: f64) -> Self {
        let mut lfo = Self {
            frequency: 0.5,
            phase: 0.0,
            sample_rate,
        };
        lfo.set_frequency(frequency);
        lfo
    }

    /// Set LFO frequency in Hz
    pub fn set_frequency(&mut self, hz: f64) {
        self.frequency = hz.clamp(0.01, 100.0);
    }

    /// Get LFO frequency
    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    /// Generate next sample (-1.0 to 1.0)
    pub fn process(&mut self) -> f64 {
        let raw = (self.phase * 2.0 * PI).sin();

        self.phase += self.frequency / self.sample_rate;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }

        raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lfo_creation() {
        let lfo = Lfo::new(5.0, 44100.0);
        assert_eq!(lfo.frequency(), 5.0);
    }

    #[test]
    fn test_lfo_range() {
        let mut lfo = Lfo::new(1.0, 44100.0);

        for _ in 0..44100 {
            let sample = lfo.process();
            assert!((-1.0..=1.0).contains(&sample));
        }
    }

    #[test]
    fn test_lfo_reaches_full_swing() {
        let mut lfo = Lfo::new(6.0, 44100.0);

        let peak = (0..44100).map(|_| lfo.process().abs()).fold(0.0f64, f64::max);
        assert!(peak > 0.999);
    }

    #[test]
    fn test_lfo_frequency_clamping() {
        let mut lfo = Lfo::new(5.0, 44100.0);

        lfo.set_frequency(0.001);
        assert_eq!(lfo.frequency(), 0.01);

        lfo.set_frequency(200.0);
        assert_eq!(lfo.frequency(), 100.0);
    }
}
