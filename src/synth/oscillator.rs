//! Phase-accumulating oscillator

use std::f64::consts::PI;

/// Waveform types
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Waveform {
    Sine,
    Triangle,
    Saw,
}

/// A basic oscillator that generates waveforms
///
/// The frequency may be changed every sample (vibrato); the phase
/// accumulator keeps the waveform continuous across changes.
#[derive(Debug, Clone)]
pub struct Oscillator {
    waveform: Waveform,
    phase: f64,
    frequency: f64,
    sample_rate: f64,
}

impl Oscillator {
    /// Create a new oscillator
    pub fn new(waveform: Waveform, frequency: f64, sample_rate: f64) -> Self {
        Self {
            waveform,
            phase: 0.0,
            frequency,
            sample_rate,
        }
    }

    /// Set the frequency
    pub fn set_frequency(&mut self, frequency: f64) {
        self.frequency = frequency;
    }

    /// Get the current frequency
    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    /// Generate the next sample
    pub fn generate(&mut self) -> f64 {
        let sample = match self.waveform {
            Waveform::Sine => (self.phase * 2.0 * PI).sin(),
            Waveform::Triangle => self.triangle(),
            Waveform::Saw => 2.0 * self.phase - 1.0,
        };

        self.phase += self.frequency / self.sample_rate;
        self.phase -= self.phase.floor();

        sample
    }

    fn triangle(&self) -> f64 {
        let p = self.phase;
        if p < 0.25 {
            4.0 * p
        } else if p < 0.75 {
            2.0 - 4.0 * p
        } else {
            4.0 * p - 4.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sine_completes_one_cycle() {
        let mut osc = Oscillator::new(Waveform::Sine, 441.0, 44100.0);
        let cycle: Vec<f64> = (0..100).map(|_| osc.generate()).collect();

        assert!(cycle[0].abs() < 1e-12);
        assert!((cycle[25] - 1.0).abs() < 1e-9);
        assert!((cycle[75] + 1.0).abs() < 1e-9);
        assert!(osc.generate().abs() < 1e-9);
    }

    #[test]
    fn test_triangle_oscillator() {
        let mut osc = Oscillator::new(Waveform::Triangle, 1.0, 4.0);

        assert_eq!(osc.generate(), 0.0); // phase 0.0
        assert_eq!(osc.generate(), 1.0); // phase 0.25
        assert_eq!(osc.generate(), 0.0); // phase 0.5
        assert_eq!(osc.generate(), -1.0); // phase 0.75
    }

    #[test]
    fn test_saw_oscillator() {
        let mut osc = Oscillator::new(Waveform::Saw, 1.0, 4.0);

        // Saw goes from -1 to 1 linearly
        assert_eq!(osc.generate(), -1.0); // phase 0.0
        assert_eq!(osc.generate(), -0.5); // phase 0.25
        assert_eq!(osc.generate(), 0.0); // phase 0.5
        assert_eq!(osc.generate(), 0.5); // phase 0.75
    }

    #[test]
    fn test_detuned_pair_drifts_apart() {
        // Honky-tonk pair: unison plus 15 cents
        let mut a = Oscillator::new(Waveform::Saw, 220.0, 44100.0);
        let mut b = Oscillator::new(Waveform::Saw, 220.0 * 2f64.powf(15.0 / 1200.0), 44100.0);

        let early = (a.generate() - b.generate()).abs();
        let late = (0..22050)
            .map(|_| (a.generate() - b.generate()).abs())
            .fold(0.0, f64::max);
        assert!(early < 1e-12);
        assert!(late > 0.5);
    }

    #[test]
    fn test_output_range_under_modulation() {
        let mut osc = Oscillator::new(Waveform::Saw, 220.0, 44100.0);
        for i in 0..10_000 {
            osc.set_frequency(220.0 + (i % 50) as f64);
            let sample = osc.generate();
            assert!((-1.0..=1.0).contains(&sample), "Sample out of range: {}", sample);
        }
    }
}
