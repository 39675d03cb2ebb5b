//! Convolution reverb
//!
//! Uniformly partitioned overlap-add convolution. The impulse response
//! is cut into blocks of `block` samples, each transformed once up
//! front; every input block is transformed once and multiplied against
//! all partitions through a frequency-domain delay line.
//!
//! ```text
//! x ─▶ [block FFT] ─▶ delay line ─┬─ × H0 ─┐
//!                                 ├─ × H1 ─┼─▶ Σ ─▶ [IFFT] ─▶ overlap-add ─▶ y
//!                                 └─ × Hn ─┘
//! ```
//!
//! Output lags input by one block.

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

use super::ImpulseResponse;

/// Default partition size in samples
pub const DEFAULT_BLOCK: usize = 512;

/// Mono-in, stereo-out convolver
pub struct Convolver {
    block: usize,
    fft: Arc<dyn Fft<f32>>,
    ifft: Arc<dyn Fft<f32>>,
    /// Impulse partition spectra per output channel
    partitions: [Vec<Vec<Complex<f32>>>; 2],
    /// Spectra of recent input blocks (ring, `head` is newest)
    history: Vec<Vec<Complex<f32>>>,
    head: usize,
    input: Vec<f32>,
    output: [Vec<f32>; 2],
    overlap: [Vec<f32>; 2],
    pos: usize,
    acc: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl Convolver {
    /// Create a convolver for the given impulse response, used as-is
    pub fn new(impulse: &ImpulseResponse, block: usize) -> Self {
        Self::with_gain(impulse, block, 1.0)
    }

    /// Create a convolver whose impulse is scaled to a calibrated loudness
    pub fn normalized(impulse: &ImpulseResponse, block: usize) -> Self {
        Self::with_gain(impulse, block, impulse.normalization_scale())
    }

    /// Create a convolver with the impulse response scaled by `gain`
    pub fn with_gain(impulse: &ImpulseResponse, block: usize, gain: f32) -> Self {
        let block = block.max(1);
        let size = block * 2;

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(size);
        let ifft = planner.plan_fft_inverse(size);
        let mut scratch = vec![
            Complex::default();
            fft.get_inplace_scratch_len().max(ifft.get_inplace_scratch_len())
        ];

        let count = impulse.len().div_ceil(block).max(1);
        let partitions = [0, 1].map(|ch| {
            let samples = impulse.channel(ch);
            (0..count)
                .map(|k| {
                    let mut spectrum = vec![Complex::default(); size];
                    let start = (k * block).min(samples.len());
                    let end = ((k + 1) * block).min(samples.len());
                    for (slot, &s) in spectrum.iter_mut().zip(&samples[start..end]) {
                        slot.re = s * gain;
                    }
                    fft.process_with_scratch(&mut spectrum, &mut scratch);
                    spectrum
                })
                .collect::<Vec<_>>()
        });

        Self {
            block,
            fft,
            ifft,
            partitions,
            history: vec![vec![Complex::default(); size]; count],
            head: 0,
            input: vec![0.0; block],
            output: [vec![0.0; block], vec![0.0; block]],
            overlap: [vec![0.0; block], vec![0.0; block]],
            pos: 0,
            acc: vec![Complex::default(); size],
            scratch,
        }
    }

    /// Feed one input sample and take one stereo output sample
    pub fn process(&mut self, input: f32) -> [f32; 2] {
        let out = [self.output[0][self.pos], self.output[1][self.pos]];
        self.input[self.pos] = input;
        self.pos += 1;
        if self.pos == self.block {
            self.process_block();
            self.pos = 0;
        }
        out
    }

    fn process_block(&mut self) {
        let count = self.history.len();
        let scale = 1.0 / (self.block * 2) as f32;

        self.head = (self.head + 1) % count;
        let newest = &mut self.history[self.head];
        for (slot, &s) in newest.iter_mut().zip(self.input.iter()) {
            *slot = Complex::new(s, 0.0);
        }
        for slot in newest[self.block..].iter_mut() {
            *slot = Complex::default();
        }
        self.fft.process_with_scratch(newest, &mut self.scratch);

        for ch in 0..2 {
            self.acc.fill(Complex::default());
            for (k, partition) in self.partitions[ch].iter().enumerate() {
                let delayed = &self.history[(self.head + count - k) % count];
                for ((a, x), h) in self.acc.iter_mut().zip(delayed).zip(partition) {
                    *a += x * h;
                }
            }
            self.ifft.process_with_scratch(&mut self.acc, &mut self.scratch);

            for i in 0..self.block {
                self.output[ch][i] = self.acc[i].re * scale + self.overlap[ch][i];
                self.overlap[ch][i] = self.acc[self.block + i].re * scale;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delta(at: usize, len: usize, gain: f32) -> Vec<f32> {
        let mut v = vec![0.0; len];
        v[at] = gain;
        v
    }

    #[test]
    fn test_unit_impulse_delays_by_one_block() {
        let ir = ImpulseResponse::from_channels(delta(0, 64, 1.0), delta(0, 64, 1.0), 8000.0);
        let mut conv = Convolver::new(&ir, 16);

        let input: Vec<f32> = (0..100).map(|i| (i as f32 * 0.1).sin()).collect();
        let output: Vec<[f32; 2]> = input.iter().map(|&x| conv.process(x)).collect();

        for i in 0..16 {
            assert!(output[i][0].abs() < 1e-6);
        }
        for i in 16..100 {
            assert!((output[i][0] - input[i - 16]).abs() < 1e-4, "sample {}", i);
            assert!((output[i][1] - input[i - 16]).abs() < 1e-4, "sample {}", i);
        }
    }

    #[test]
    fn test_late_partition_tap() {
        // Tap lands in the third partition of the left channel
        let ir = ImpulseResponse::from_channels(delta(37, 64, 0.5), delta(3, 64, 1.0), 8000.0);
        let mut conv = Convolver::new(&ir, 16);
        assert_eq!(conv.history.len(), 4);

        let mut output = Vec::new();
        output.push(conv.process(1.0));
        for _ in 0..120 {
            output.push(conv.process(0.0));
        }

        for (i, frame) in output.iter().enumerate() {
            let left = if i == 16 + 37 { 0.5 } else { 0.0 };
            let right = if i == 16 + 3 { 1.0 } else { 0.0 };
            assert!((frame[0] - left).abs() < 1e-4, "left sample {}", i);
            assert!((frame[1] - right).abs() < 1e-4, "right sample {}", i);
        }
    }

    #[test]
    fn test_normalized_noise_impulse_is_tamed() {
        let ir = ImpulseResponse::generate(0.5, 2.0, 8000.0);
        let mut raw = Convolver::new(&ir, 64);
        let mut tamed = Convolver::normalized(&ir, 64);

        let mut raw_peak = 0.0f32;
        let mut tamed_peak = 0.0f32;
        for i in 0..4000 {
            let x = if i < 400 { (i as f32 * 0.2).sin() } else { 0.0 };
            raw_peak = raw_peak.max(raw.process(x)[0].abs());
            tamed_peak = tamed_peak.max(tamed.process(x)[0].abs());
        }

        assert!(tamed_peak > 0.0);
        assert!(tamed_peak < raw_peak);
        assert!(tamed_peak < 1.0, "normalized peak {}", tamed_peak);
    }
}
