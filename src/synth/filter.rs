//! Biquad filters
//!
//! Lowpass for tone shaping (piano and guitar brightness) and bandpass
//! for the violin body resonance. Coefficients follow the RBJ cookbook.

use std::f64::consts::{FRAC_1_SQRT_2, PI};

/// Filter response
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterType {
    LowPass,
    /// Constant 0 dB peak gain
    BandPass,
}

/// Normalized coefficients (a0 = 1)
#[derive(Debug, Clone, Copy)]
struct Biquad {
    b: [f64; 3],
    a: [f64; 2],
}

impl Biquad {
    fn design(shape: FilterType, cutoff: f64, q: f64, sample_rate: f64) -> Self {
        let w = 2.0 * PI * cutoff / sample_rate;
        let (sin_w, cos_w) = w.sin_cos();
        let alpha = sin_w / (2.0 * q);
        let a0 = 1.0 + alpha;

        let b = match shape {
            FilterType::LowPass => {
                let k = (1.0 - cos_w) / 2.0;
                [k, 2.0 * k, k]
            }
            FilterType::BandPass => [alpha, 0.0, -alpha],
        };

        Self {
            b: b.map(|x| x / a0),
            a: [-2.0 * cos_w / a0, (1.0 - alpha) / a0],
        }
    }
}

/// Second-order filter with a movable cutoff
#[derive(Debug, Clone)]
pub struct Filter {
    shape: FilterType,
    sample_rate: f64,
    cutoff: f64,
    q: f64,
    coeffs: Biquad,
    /// Transposed direct form II delay cells
    state: [f64; 2],
}

impl Filter {
    pub fn new(shape: FilterType, cutoff: f64, q: f64, sample_rate: f64) -> Self {
        let cutoff = clamp_cutoff(cutoff, sample_rate);
        let q = q.clamp(0.1, 20.0);
        Self {
            shape,
            sample_rate,
            cutoff,
            q,
            coeffs: Biquad::design(shape, cutoff, q, sample_rate),
            state: [0.0; 2],
        }
    }

    /// Butterworth lowpass
    pub fn lowpass(cutoff: f64, sample_rate: f64) -> Self {
        Self::new(FilterType::LowPass, cutoff, FRAC_1_SQRT_2, sample_rate)
    }

    pub fn bandpass(center: f64, q: f64, sample_rate: f64) -> Self {
        Self::new(FilterType::BandPass, center, q, sample_rate)
    }

    /// Move the cutoff; coefficients are redesigned only on change
    pub fn set_cutoff(&mut self, hz: f64) {
        let hz = clamp_cutoff(hz, self.sample_rate);
        if hz != self.cutoff {
            self.cutoff = hz;
            self.coeffs = Biquad::design(self.shape, hz, self.q, self.sample_rate);
        }
    }

    pub fn cutoff(&self) -> f64 {
        self.cutoff
    }

    pub fn process(&mut self, input: f64) -> f64 {
        let Biquad { b, a } = self.coeffs;
        let [s1, s2] = self.state;

        let y = b[0] * input + s1;
        self.state = [b[1] * input - a[0] * y + s2, b[2] * input - a[1] * y];
        y
    }
}

/// Keep the cutoff in the audible band and clear of Nyquist
fn clamp_cutoff(hz: f64, sample_rate: f64) -> f64 {
    hz.clamp(20.0, sample_rate * 0.45)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f64 = 44100.0;

    /// Steady-state RMS of a unit sine through `filter`
    fn tone_rms(filter: &mut Filter, hz: f64, samples: usize) -> f64 {
        let skip = samples / 4;
        let energy: f64 = (0..samples)
            .map(|n| filter.process((2.0 * PI * hz * n as f64 / SR).sin()))
            .skip(skip)
            .map(|y| y * y)
            .sum();
        (energy / (samples - skip) as f64).sqrt()
    }

    #[test]
    fn test_lowpass_defaults() {
        let filter = Filter::lowpass(1320.0, SR);
        assert_eq!(filter.cutoff(), 1320.0);
        assert!((filter.q - FRAC_1_SQRT_2).abs() < 1e-12);
        assert_eq!(filter.shape, FilterType::LowPass);
    }

    #[test]
    fn test_cutoff_stays_in_band() {
        // A grand piano cutoff of 6f on a high note would pass Nyquist
        let mut filter = Filter::lowpass(6.0 * 4186.0, SR);
        assert!(filter.cutoff() <= SR * 0.45);

        filter.set_cutoff(5.0);
        assert_eq!(filter.cutoff(), 20.0);
    }

    #[test]
    fn test_closed_guitar_filter_darkens_saw_harmonics() {
        let mut open = Filter::lowpass(3000.0, SR);
        let mut closed = Filter::lowpass(500.0, SR);

        // A high harmonic of a low string
        let bright_open = tone_rms(&mut open, 2000.0, 8000);
        let bright_closed = tone_rms(&mut closed, 2000.0, 8000);
        assert!(bright_closed < bright_open * 0.2, "open={} closed={}", bright_open, bright_closed);
    }

    #[test]
    fn test_lowpass_keeps_fundamental() {
        let mut filter = Filter::lowpass(3.0 * 220.0, SR);
        let rms = tone_rms(&mut filter, 220.0, 8820);
        assert!(rms > 0.65, "fundamental lost: {}", rms);
    }

    #[test]
    fn test_violin_body_favours_its_center() {
        let mut at_center = Filter::bandpass(1500.0, 1.0, SR);
        let mut low_open_string = Filter::bandpass(1500.0, 1.0, SR);

        let center = tone_rms(&mut at_center, 1500.0, 8000);
        let low = tone_rms(&mut low_open_string, 60.0, 8000);
        assert!(center > low * 5.0, "center={} low={}", center, low);
        // 0 dB peak gain
        assert!((center - FRAC_1_SQRT_2).abs() < 0.02);
    }

    #[test]
    fn test_moving_cutoff_keeps_state() {
        let mut filter = Filter::lowpass(3000.0, SR);
        for _ in 0..64 {
            filter.process(1.0);
        }
        filter.set_cutoff(2500.0);
        // DC passes a lowpass, so the output stays near one across the change
        let y = filter.process(1.0);
        assert!((y - 1.0).abs() < 0.1, "jumped to {}", y);
    }

    #[test]
    fn test_bandpass_blocks_dc() {
        let mut filter = Filter::bandpass(1500.0, 1.0, SR);
        let settled = (0..4000).map(|_| filter.process(1.0)).last().unwrap();
        assert!(settled.abs() < 1e-3, "dc leaked: {}", settled);
    }
}
