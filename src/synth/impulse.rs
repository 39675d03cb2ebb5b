//! Synthetic reverb impulse response
//!
//! A decaying stereo noise burst. Each channel draws its own noise so
//! the reverb tail is decorrelated between left and right.

use rand::Rng;

/// Stereo impulse response buffer
#[derive(Debug, Clone)]
pub struct ImpulseResponse {
    channels: [Vec<f32>; 2],
    sample_rate: f64,
}

impl ImpulseResponse {
    /// Generate an impulse response using the thread-local random source
    pub fn generate(duration_secs: f64, decay: f64, sample_rate: f64) -> Self {
        Self::generate_with_rng(duration_secs, decay, sample_rate, &mut rand::thread_rng())
    }

    /// Generate an impulse response from a caller-supplied random source
    ///
    /// Sample `i` of `len` is `noise * (1 - i / len)^decay`.
    pub fn generate_with_rng<R: Rng + ?Sized>(
        duration_secs: f64,
        decay: f64,
        sample_rate: f64,
        rng: &mut R,
    ) -> Self {
        let len = (duration_secs * sample_rate).round().max(1.0) as usize;

        let mut channel = || -> Vec<f32> {
            (0..len)
                .map(|i| {
                    let envelope = (1.0 - i as f64 / len as f64).powf(decay);
                    (rng.gen_range(-1.0..1.0) * envelope) as f32
                })
                .collect()
        };
        let left = channel();
        let right = channel();

        Self {
            channels: [left, right],
            sample_rate,
        }
    }

    /// Wrap existing channel data
    ///
    /// The shorter channel is zero-padded to the length of the longer one.
    pub fn from_channels(mut left: Vec<f32>, mut right: Vec<f32>, sample_rate: f64) -> Self {
        let len = left.len().max(right.len());
        left.resize(len, 0.0);
        right.resize(len, 0.0);
        Self {
            channels: [left, right],
            sample_rate,
        }
    }

    /// Length in samples per channel
    pub fn len(&self) -> usize {
        self.channels[0].len()
    }

    /// Whether the buffer holds no samples
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Duration in seconds
    pub fn duration_secs(&self) -> f64 {
        self.len() as f64 / self.sample_rate
    }

    /// Gain that brings a convolution with this impulse to a calibrated
    /// loudness, independent of its length and level
    ///
    /// The scale is the inverse of the per-sample RMS, times a -58 dB
    /// calibration gain referenced to 44.1 kHz.
    pub fn normalization_scale(&self) -> f32 {
        const GAIN_CALIBRATION: f64 = 0.00125;
        const CALIBRATION_SAMPLE_RATE: f64 = 44100.0;
        const MIN_POWER: f64 = 0.000125;

        let count = (self.len() * 2).max(1) as f64;
        let power: f64 = self
            .channels
            .iter()
            .flatten()
            .map(|&s| (s as f64).powi(2))
            .sum();
        let mut rms = (power / count).sqrt();
        if !rms.is_finite() || rms < MIN_POWER {
            rms = MIN_POWER;
        }

        (GAIN_CALIBRATION / rms * CALIBRATION_SAMPLE_RATE / self.sample_rate) as f32
    }

    /// Samples of one channel (0 = left, 1 = right)
    pub fn channel(&self, index: usize) -> &[f32] {
        &self.channels[index]
    }
}
