//! Mix bus for combining chord voices
//!
//! Fixed routing, built once:
//!
//! ```text
//! voices ─▶ master ─┬──────────────────────────────▶ out (dry)
//!                   └─▶ send ─▶ convolution reverb ─▶ out (wet)
//! ```
//!
//! The bus also owns the audio clock: time advances by one sample per
//! rendered frame, whether frames are pulled by the device callback or
//! rendered offline. Voices whose stop time has passed are dropped after
//! every rendered block.

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::trace;

use crate::config::MixConfig;
use crate::synth::{Convolver, ImpulseResponse, Voice, VoiceState, DEFAULT_BLOCK};

/// Bus shared between the control side and the audio callback
pub type SharedBus = Arc<Mutex<MixBus>>;

/// Identifies a voice connected to the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VoiceId(u64);

/// The main mix bus
pub struct MixBus {
    sample_rate: f64,
    /// Frames rendered so far (the audio clock)
    frames: u64,
    master_gain: f64,
    reverb_send: f64,
    reverb: Convolver,
    /// Connected voices in connection order
    voices: Vec<(VoiceId, Voice)>,
    next_id: u64,
    events_scheduled: usize,
}

impl MixBus {
    /// Create a bus with the given levels and reverb impulse
    pub fn new(config: &MixConfig, sample_rate: f64, impulse: &ImpulseResponse) -> Self {
        Self {
            sample_rate,
            frames: 0,
            master_gain: config.master_gain,
            reverb_send: config.reverb_send,
            reverb: Convolver::normalized(impulse, DEFAULT_BLOCK),
            voices: Vec::new(),
            next_id: 0,
            events_scheduled: 0,
        }
    }

    /// Wrap the bus for sharing with the audio callback
    pub fn into_shared(self) -> SharedBus {
        Arc::new(Mutex::new(self))
    }

    /// Get the sample rate
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Current audio clock time in seconds
    pub fn current_time(&self) -> f64 {
        self.frames as f64 / self.sample_rate
    }

    /// Connect a voice to the master input
    pub fn connect(&mut self, voice: Voice) -> VoiceId {
        let id = VoiceId(self.next_id);
        self.next_id += 1;
        self.events_scheduled += voice.scheduled_events();
        self.voices.push((id, voice));
        id
    }

    /// Release a voice at `at`. Returns false if the voice is gone.
    pub fn release(&mut self, id: VoiceId, at: f64, release_secs: f64, stop_after_secs: f64) -> bool {
        self.schedule_on(id, |voice| voice.release(at, release_secs, stop_after_secs))
    }

    fn schedule_on(&mut self, id: VoiceId, f: impl FnOnce(&mut Voice)) -> bool {
        let Some((_, voice)) = self.voices.iter_mut().find(|(vid, _)| *vid == id) else {
            return false;
        };
        let before = voice.scheduled_events();
        f(voice);
        self.events_scheduled += voice.scheduled_events() - before;
        true
    }

    /// State of a connected voice, `None` once it has been disposed
    pub fn voice_state(&self, id: VoiceId) -> Option<VoiceState> {
        let now = self.current_time();
        self.voices
            .iter()
            .find(|(vid, _)| *vid == id)
            .map(|(_, voice)| voice.state(now))
    }

    /// Number of voices still connected (sounding, scheduled or releasing)
    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }

    /// Total automation events scheduled through this bus
    pub fn scheduled_events(&self) -> usize {
        self.events_scheduled
    }

    /// Render one stereo frame and advance the clock
    pub fn render_frame(&mut self) -> [f32; 2] {
        let now = self.current_time();

        let mut dry = 0.0;
        for (_, voice) in &mut self.voices {
            dry += voice.process(now);
        }

        let master = dry * self.master_gain;
        let [wet_l, wet_r] = self.reverb.process((master * self.reverb_send) as f32);

        self.frames += 1;

        let master = master as f32;
        [master + wet_l, master + wet_r]
    }

    /// Render interleaved frames into `out`, then dispose finished voices
    ///
    /// Mono outputs get the average of both sides; channels past the
    /// second get the same average.
    pub fn render(&mut self, out: &mut [f32], channels: usize) {
        let channels = channels.max(1);
        for frame in out.chunks_mut(channels) {
            let [l, r] = self.render_frame();
            match frame {
                [mono] => *mono = (l + r) * 0.5,
                [left, right, rest @ ..] => {
                    *left = l;
                    *right = r;
                    rest.fill((l + r) * 0.5);
                }
                [] => {}
            }
        }
        self.reap();
    }

    /// Drop voices whose stop time has passed. Returns how many were dropped.
    pub fn reap(&mut self) -> usize {
        let now = self.current_time();
        let before = self.voices.len();
        self.voices.retain(|(_, voice)| !voice.is_finished(now));
        let reaped = before - self.voices.len();
        if reaped > 0 {
            trace!(reaped, remaining = self.voices.len(), "disposed stopped voices");
        }
        reaped
    }
}
