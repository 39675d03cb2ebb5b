//! Audio engine for chordbox
//!
//! [`ChordEngine`] is the façade the rest of an application talks to. It
//! owns the mix bus, the output device and the registry of the voices
//! that make up the active chord.

mod error;
mod mixer;
mod player;
mod recorder;
mod registry;

pub use error::AudioError;
pub use mixer::{MixBus, SharedBus, VoiceId};
pub use player::{default_device_name, list_output_devices, Player, StreamInfo};
pub use recorder::{Recorder, RECORD_CHANNELS};
pub use registry::{ReleaseShape, VoiceHandle, VoiceRegistry};

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::{Handle, Runtime};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::{AudioConfig, ChordConfig, MixConfig, OutputMode, PlaybackConfig};
use crate::synth::{frequency, ImpulseResponse, Instrument, Patch, Timbre, VoiceBuilder, VoiceState};

/// Output side, present once the engine has initialized
struct Output {
    bus: SharedBus,
    player: Option<Player>,
}

struct EngineState {
    config: ChordConfig,
    output: Option<Output>,
    registry: VoiceRegistry,
    /// Bumped whenever the active chord changes
    generation: u64,
    pending_stop: Option<JoinHandle<()>>,
}

impl EngineState {
    fn ensure_ready(&mut self) -> Option<SharedBus> {
        if let Some(output) = &self.output {
            return Some(output.bus.clone());
        }

        match open_output(&self.config) {
            Ok(output) => {
                let bus = output.bus.clone();
                info!(
                    sample_rate = bus.lock().sample_rate(),
                    mode = ?self.config.audio.output,
                    "audio engine ready"
                );
                self.output = Some(output);
                Some(bus)
            }
            Err(e) => {
                error!("audio initialization failed: {}", e);
                None
            }
        }
    }

    fn bus(&self) -> Option<&SharedBus> {
        self.output.as_ref().map(|output| &output.bus)
    }

    fn cancel_pending_stop(&mut self) {
        if let Some(task) = self.pending_stop.take() {
            task.abort();
        }
    }

    fn stagger_secs(&self, instrument: Instrument) -> f64 {
        match instrument {
            Instrument::Piano => 0.0,
            Instrument::Guitar => self.config.playback.guitar_stagger_secs,
            Instrument::Violin => self.config.playback.violin_stagger_secs,
        }
    }

    fn start_chord(&mut self, notes: &[i32], instrument: Instrument, timbre: Timbre) {
        let Some(bus) = self.ensure_ready() else {
            return;
        };
        if let Some(player) = self.output.as_ref().and_then(|o| o.player.as_ref()) {
            if player.is_suspended() {
                debug!("resuming suspended output");
                player.resume();
            }
        }

        self.stop_chord();
        if notes.is_empty() {
            return;
        }

        let patch = Patch::resolve(instrument, timbre);
        let stagger = self.stagger_secs(instrument);
        let shape = ReleaseShape::from(&self.config.playback);

        let connected: Vec<(VoiceId, f64)> = {
            let mut bus = bus.lock();
            let now = bus.current_time();
            let builder = VoiceBuilder::new(bus.sample_rate());
            notes
                .iter()
                .enumerate()
                .map(|(i, &note)| {
                    let start = now + stagger * i as f64;
                    let voice = builder.build(frequency(note), patch, start);
                    (bus.connect(voice), start)
                })
                .collect()
        };

        for (id, start) in connected {
            self.registry.register(VoiceHandle::new(id, start, shape));
        }
        debug!(?notes, ?patch, voices = self.registry.len(), "chord started");
    }

    fn stop_chord(&mut self) {
        self.cancel_pending_stop();
        self.generation += 1;

        let Some(output) = &self.output else {
            return;
        };
        if self.registry.is_empty() {
            return;
        }
        let mut bus = output.bus.lock();
        let now = bus.current_time();
        let released = self.registry.release_all(&mut bus, now);
        debug!(released = released.len(), at = now, "chord released");
    }
}

/// Replace every section that fails validation with its defaults
///
/// The audio section keeps its output mode and device so an invalid
/// buffer size does not turn an offline engine into a device one.
fn sanitize(mut config: ChordConfig) -> ChordConfig {
    if let Err(e) = config.audio.validate() {
        warn!("invalid audio settings, using defaults: {}", e);
        config.audio = AudioConfig {
            device: config.audio.device.take(),
            output: config.audio.output,
            ..AudioConfig::default()
        };
    }
    if let Err(e) = config.mix.validate() {
        warn!("invalid mix settings, using defaults: {}", e);
        config.mix = MixConfig::default();
    }
    if let Err(e) = config.playback.validate() {
        warn!("invalid playback settings, using defaults: {}", e);
        config.playback = PlaybackConfig::default();
    }
    config
}

fn open_output(config: &ChordConfig) -> Result<Output, AudioError> {
    let mix = config.mix.clone();
    match config.audio.output {
        OutputMode::Offline => Ok(Output {
            bus: build_bus(&mix, config.audio.sample_rate as f64),
            player: None,
        }),
        OutputMode::Device => {
            let (player, bus) = Player::start(
                config.audio.device.clone(),
                config.audio.buffer_size,
                move |sample_rate| build_bus(&mix, sample_rate),
            )?;
            Ok(Output {
                bus,
                player: Some(player),
            })
        }
    }
}

fn build_bus(mix: &MixConfig, sample_rate: f64) -> SharedBus {
    let impulse = ImpulseResponse::generate(mix.impulse_secs, mix.impulse_decay, sample_rate);
    MixBus::new(mix, sample_rate, &impulse).into_shared()
}

/// Runtime for deferred stops when the caller has none
#[derive(Default)]
struct TimerRuntime {
    runtime: Mutex<Option<Runtime>>,
}

impl TimerRuntime {
    fn handle(&self) -> Option<Handle> {
        if let Ok(handle) = Handle::try_current() {
            return Some(handle);
        }

        let mut slot = self.runtime.lock();
        if slot.is_none() {
            let built = tokio::runtime::Builder::new_multi_thread()
                .worker_threads(1)
                .thread_name("chordbox-timer")
                .enable_time()
                .build();
            match built {
                Ok(runtime) => *slot = Some(runtime),
                Err(e) => {
                    error!("failed to start timer runtime: {}", e);
                    return None;
                }
            }
        }
        slot.as_ref().map(|runtime| runtime.handle().clone())
    }
}

impl Drop for TimerRuntime {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.get_mut().take() {
            runtime.shutdown_background();
        }
    }
}

/// Chord playback engine
///
/// Cheap to clone; all clones drive the same bus and registry. Every
/// operation is synchronous and never fails: until the output has been
/// initialized (lazily, on the first `start_chord` or `play_notes`)
/// operations do nothing.
#[derive(Clone)]
pub struct ChordEngine {
    state: Arc<Mutex<EngineState>>,
    timers: Arc<TimerRuntime>,
}

impl ChordEngine {
    /// Create an engine; no device is opened until first use
    ///
    /// Sections of `config` that fail validation fall back to defaults.
    pub fn new(config: ChordConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(EngineState {
                config: sanitize(config),
                output: None,
                registry: VoiceRegistry::new(),
                generation: 0,
                pending_stop: None,
            })),
            timers: Arc::new(TimerRuntime::default()),
        }
    }

    /// Stop the current chord and start a new one
    ///
    /// Voices are registered in note order. Piano notes start together;
    /// guitar and violin notes are strummed by a fixed per-note offset.
    pub fn start_chord(&self, notes: &[i32], instrument: Instrument, timbre: Timbre) {
        self.state.lock().start_chord(notes, instrument, timbre);
    }

    /// Release every voice of the current chord. Safe to call repeatedly.
    pub fn stop_chord(&self) {
        self.state.lock().stop_chord();
    }

    /// Start a chord and stop it automatically after the one-shot delay
    ///
    /// The automatic stop belongs to this chord only: any later
    /// `start_chord`, `stop_chord` or `play_notes` cancels it.
    pub fn play_notes(&self, notes: &[i32], instrument: Instrument, timbre: Timbre) {
        let mut state = self.state.lock();
        state.start_chord(notes, instrument, timbre);
        if state.registry.is_empty() {
            return;
        }

        let Some(handle) = self.timers.handle() else {
            warn!("no timer runtime, chord will sound until stopped");
            return;
        };

        let one_shot = state.config.playback.one_shot_secs;
        let Ok(delay) = Duration::try_from_secs_f64(one_shot) else {
            warn!(one_shot, "one-shot delay out of range, chord will sound until stopped");
            return;
        };
        let generation = state.generation;
        let shared = self.state.clone();
        state.pending_stop = Some(handle.spawn(async move {
            tokio::time::sleep(delay).await;
            let mut state = shared.lock();
            if state.generation == generation {
                state.pending_stop = None;
                state.stop_chord();
            }
        }));
    }

    /// Pause real-time output; the next `start_chord` resumes it
    pub fn suspend(&self) {
        let state = self.state.lock();
        if let Some(player) = state.output.as_ref().and_then(|o| o.player.as_ref()) {
            player.suspend();
        }
    }

    /// Render interleaved stereo frames, advancing the audio clock
    ///
    /// Only renders in offline mode once ready; otherwise `out` is
    /// silenced and `false` is returned.
    pub fn render(&self, out: &mut [f32]) -> bool {
        let state = self.state.lock();
        match &state.output {
            Some(Output { bus, player: None }) => {
                bus.lock().render(out, 2);
                true
            }
            _ => {
                out.fill(0.0);
                false
            }
        }
    }

    /// Whether the output has been initialized
    pub fn is_ready(&self) -> bool {
        self.state.lock().output.is_some()
    }

    /// Sample rate of the bus, once ready
    pub fn sample_rate(&self) -> Option<f64> {
        self.state.lock().bus().map(|bus| bus.lock().sample_rate())
    }

    /// Number of voices registered to the active chord
    pub fn active_voices(&self) -> usize {
        self.state.lock().registry.len()
    }

    /// Ids of the active chord's voices in registration order
    pub fn registered_voices(&self) -> Vec<VoiceId> {
        self.state.lock().registry.ids()
    }

    /// Start times of the active chord's voices in registration order
    pub fn registered_start_times(&self) -> Vec<f64> {
        self.state.lock().registry.start_times()
    }

    /// State of any voice still on the bus
    pub fn voice_state(&self, id: VoiceId) -> Option<VoiceState> {
        self.state.lock().bus()?.lock().voice_state(id)
    }

    /// Voices still connected to the bus, including releasing ones
    pub fn sounding_voices(&self) -> usize {
        self.state
            .lock()
            .bus()
            .map_or(0, |bus| bus.lock().voice_count())
    }

    /// Total automation events scheduled so far
    pub fn scheduled_events(&self) -> usize {
        self.state
            .lock()
            .bus()
            .map_or(0, |bus| bus.lock().scheduled_events())
    }

    /// Audio clock time in seconds
    pub fn current_time(&self) -> f64 {
        self.state
            .lock()
            .bus()
            .map_or(0.0, |bus| bus.lock().current_time())
    }

    /// Configuration the engine was created with
    pub fn config(&self) -> ChordConfig {
        self.state.lock().config.clone()
    }
}
