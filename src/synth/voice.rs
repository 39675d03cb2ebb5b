//! Instrument voices
//!
//! A voice is the signal graph for one sounding note: oscillators,
//! optional filters and modulators, and a per-voice gain stage driven by
//! a breakpoint envelope. All timing is absolute on the audio clock, so
//! a voice built now may start sounding later (strummed chords).

use super::automation::AutomationCurve;
use super::filter::Filter;
use super::instrument::Patch;
use super::lfo::Lfo;
use super::oscillator::{Oscillator, Waveform};
use super::pitch::cents_to_ratio;

/// Filter cutoffs are recomputed once per this many samples
const CONTROL_INTERVAL: usize = 32;

/// Level a released voice fades towards before it is stopped
pub const RELEASE_FLOOR: f64 = 0.001;

/// Lifecycle of a voice relative to a clock time
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VoiceState {
    /// Built, waiting for its start time
    Scheduled,
    /// Running its attack/decay/sustain schedule
    Sounding,
    /// Fading out, stops at `stop_at`
    Releasing { stop_at: f64 },
    /// Past its stop time, ready to be disposed
    Stopped,
}

/// Patch-specific node layout
#[derive(Debug, Clone)]
enum VoiceGraph {
    Grand {
        chorus: [Oscillator; 2],
        body: Oscillator,
        filter: Filter,
        cutoff: AutomationCurve,
    },
    Electric {
        sine: Oscillator,
        color: Oscillator,
        tremolo: Lfo,
    },
    HonkyTonk {
        saws: [Oscillator; 2],
        filter: Filter,
    },
    Guitar {
        saw: Oscillator,
        filter: Filter,
        cutoff: AutomationCurve,
    },
    Violin {
        saw: Oscillator,
        vibrato: Lfo,
        body: Filter,
    },
}

/// One sounding note
#[derive(Debug, Clone)]
pub struct Voice {
    patch: Patch,
    frequency: f64,
    start_time: f64,
    stop_time: Option<f64>,
    released_at: Option<f64>,
    gain: AutomationCurve,
    graph: VoiceGraph,
    control_counter: usize,
    stops_scheduled: usize,
}

impl Voice {
    /// Recipe this voice was built from
    pub fn patch(&self) -> Patch {
        self.patch
    }

    /// Fundamental frequency in Hz
    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    /// Clock time the voice starts sounding
    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    /// Clock time the oscillators stop, once scheduled
    pub fn stop_time(&self) -> Option<f64> {
        self.stop_time
    }

    /// The amplitude envelope
    pub fn envelope(&self) -> &AutomationCurve {
        &self.gain
    }

    /// Hard-stop all oscillators at `at`. An earlier stop wins.
    pub fn stop(&mut self, at: f64) {
        self.stop_time = Some(self.stop_time.map_or(at, |t| t.min(at)));
        self.stops_scheduled += 1;
    }

    /// Fade out from whatever level the envelope has at `at`, then stop
    ///
    /// A voice already at or below the release floor (not yet started,
    /// or faded out) stays at its held level.
    pub fn release(&mut self, at: f64, release_secs: f64, stop_after_secs: f64) {
        let held = self.gain.cancel_and_hold(at);
        if held > RELEASE_FLOOR {
            self.gain.exponential_ramp_to(RELEASE_FLOOR, at + release_secs);
        } else {
            self.gain.set_value_at(held, at + release_secs);
        }
        self.released_at = Some(at);
        self.stop(at + stop_after_secs);
    }

    /// Lifecycle state at clock time `now`
    pub fn state(&self, now: f64) -> VoiceState {
        match (self.stop_time, self.released_at) {
            (Some(stop_at), _) if now >= stop_at => VoiceState::Stopped,
            (Some(stop_at), Some(_)) => VoiceState::Releasing { stop_at },
            _ if now < self.start_time => VoiceState::Scheduled,
            _ => VoiceState::Sounding,
        }
    }

    /// Whether the voice can be dropped at `now`
    pub fn is_finished(&self, now: f64) -> bool {
        self.stop_time.is_some_and(|t| now >= t)
    }

    /// Number of automation events scheduled on this voice so far
    pub fn scheduled_events(&self) -> usize {
        let cutoff = match &self.graph {
            VoiceGraph::Grand { cutoff, .. } | VoiceGraph::Guitar { cutoff, .. } => {
                cutoff.scheduled_count()
            }
            _ => 0,
        };
        self.gain.scheduled_count() + cutoff + self.stops_scheduled
    }

    /// Generate the sample at clock time `time`
    pub fn process(&mut self, time: f64) -> f64 {
        if time < self.start_time || self.is_finished(time) {
            return 0.0;
        }

        let update_controls = self.control_counter % CONTROL_INTERVAL == 0;
        self.control_counter += 1;

        let signal = match &mut self.graph {
            VoiceGraph::Grand {
                chorus,
                body,
                filter,
                cutoff,
            } => {
                if update_controls {
                    filter.set_cutoff(cutoff.value_at(time));
                }
                let bright = chorus.iter_mut().map(|osc| osc.generate()).sum::<f64>() * 0.3;
                filter.process(bright) + body.generate() * 0.4
            }
            VoiceGraph::Electric {
                sine,
                color,
                tremolo,
            } => {
                let mix = sine.generate() * 0.7 + color.generate() * 0.3;
                mix * (0.8 + 0.2 * tremolo.process())
            }
            VoiceGraph::HonkyTonk { saws, filter } => {
                let mix = saws.iter_mut().map(|osc| osc.generate()).sum::<f64>() * 0.5;
                filter.process(mix)
            }
            VoiceGraph::Guitar {
                saw,
                filter,
                cutoff,
            } => {
                if update_controls {
                    filter.set_cutoff(cutoff.value_at(time));
                }
                filter.process(saw.generate())
            }
            VoiceGraph::Violin { saw, vibrato, body } => {
                saw.set_frequency(self.frequency + vibrato.process() * 5.0);
                let dry = saw.generate();
                dry * 0.6 + body.process(dry) * 0.8
            }
        };

        signal * self.gain.value_at(time)
    }
}

/// Builds voices for a fixed sample rate
#[derive(Debug, Clone, Copy)]
pub struct VoiceBuilder {
    sample_rate: f64,
}

impl VoiceBuilder {
    pub fn new(sample_rate: f64) -> Self {
        Self { sample_rate }
    }

    /// Build the voice for `patch` at `frequency`, its envelope anchored at `start_time`
    ///
    /// Frequencies outside `0..=sample_rate / 2` are clamped into it.
    pub fn build(&self, frequency: f64, patch: Patch, start_time: f64) -> Voice {
        let sr = self.sample_rate;
        let frequency = if frequency.is_nan() {
            0.0
        } else {
            frequency.clamp(0.0, sr * 0.5)
        };
        let start = start_time;
        let mut gain = AutomationCurve::new(0.0);
        gain.set_value_at(0.0, start);

        let graph = match patch {
            // Detuned triangles through a closing lowpass for the hammer
            // brightness, a clean sine underneath for the body
            Patch::GrandPiano => {
                let peak = 0.8;
                gain.linear_ramp_to(peak, start + 0.02)
                    .exponential_ramp_to(peak * 0.5, start + 0.3)
                    .exponential_ramp_to(RELEASE_FLOOR, start + 4.0);

                let mut cutoff = AutomationCurve::new(frequency * 6.0);
                cutoff
                    .set_value_at(frequency * 6.0, start)
                    .exponential_ramp_to(frequency * 1.5, start + 0.5);

                VoiceGraph::Grand {
                    chorus: [
                        Oscillator::new(Waveform::Triangle, frequency * cents_to_ratio(6.0), sr),
                        Oscillator::new(Waveform::Triangle, frequency * cents_to_ratio(-6.0), sr),
                    ],
                    body: Oscillator::new(Waveform::Sine, frequency, sr),
                    filter: Filter::lowpass(frequency * 6.0, sr),
                    cutoff,
                }
            }
            Patch::ElectricPiano => {
                let peak = 0.7;
                gain.linear_ramp_to(peak, start + 0.05)
                    .exponential_ramp_to(peak * 0.67, start + 1.0);

                VoiceGraph::Electric {
                    sine: Oscillator::new(Waveform::Sine, frequency, sr),
                    color: Oscillator::new(Waveform::Triangle, frequency, sr),
                    tremolo: Lfo::new(5.0, sr),
                }
            }
            Patch::HonkyTonkPiano => {
                let peak = 0.6;
                gain.linear_ramp_to(peak, start + 0.02)
                    .exponential_ramp_to(RELEASE_FLOOR, start + 0.8);

                VoiceGraph::HonkyTonk {
                    saws: [
                        Oscillator::new(Waveform::Saw, frequency, sr),
                        Oscillator::new(Waveform::Saw, frequency * cents_to_ratio(15.0), sr),
                    ],
                    filter: Filter::lowpass(frequency * 3.0, sr),
                }
            }
            // Pluck: the string's brightness dies faster than its level
            Patch::Guitar => {
                let peak = 0.7;
                gain.linear_ramp_to(peak, start + 0.04)
                    .exponential_ramp_to(RELEASE_FLOOR, start + 2.0);

                let mut cutoff = AutomationCurve::new(3000.0);
                cutoff
                    .set_value_at(3000.0, start)
                    .exponential_ramp_to(500.0, start + 0.5);

                VoiceGraph::Guitar {
                    saw: Oscillator::new(Waveform::Saw, frequency, sr),
                    filter: Filter::lowpass(3000.0, sr),
                    cutoff,
                }
            }
            // Bowed swell, held until released
            Patch::Violin => {
                gain.linear_ramp_to(0.5, start + 0.45);

                VoiceGraph::Violin {
                    saw: Oscillator::new(Waveform::Saw, frequency, sr),
                    vibrato: Lfo::new(6.0, sr),
                    body: Filter::bandpass(1500.0, 1.0, sr),
                }
            }
        };

        Voice {
            patch,
            frequency,
            start_time,
            stop_time: None,
            released_at: None,
            gain,
            graph,
            control_counter: 0,
            stops_scheduled: 0,
        }
    }
}
