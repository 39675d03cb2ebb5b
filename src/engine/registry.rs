//! Registry of the voices belonging to the active chord

use super::mixer::{MixBus, VoiceId};
use crate::config::PlaybackConfig;

/// How a registered voice fades out when its chord is stopped
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReleaseShape {
    /// Time to fade to the release floor
    pub release_secs: f64,
    /// Time from the release request to the hard stop
    pub stop_after_secs: f64,
}

impl From<&PlaybackConfig> for ReleaseShape {
    fn from(config: &PlaybackConfig) -> Self {
        Self {
            release_secs: config.release_secs,
            stop_after_secs: config.stop_tail_secs,
        }
    }
}

/// Control-side record of a voice living on the mix bus
#[derive(Debug, Clone, Copy)]
pub struct VoiceHandle {
    id: VoiceId,
    start_time: f64,
    shape: ReleaseShape,
}

impl VoiceHandle {
    pub fn new(id: VoiceId, start_time: f64, shape: ReleaseShape) -> Self {
        Self {
            id,
            start_time,
            shape,
        }
    }

    pub fn id(&self) -> VoiceId {
        self.id
    }

    /// Scheduled start time on the audio clock
    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    /// Fade the voice out from `at` and stop it after the tail.
    /// No-op if the voice has already been disposed.
    fn release(&self, bus: &mut MixBus, at: f64) -> bool {
        bus.release(self.id, at, self.shape.release_secs, self.shape.stop_after_secs)
    }
}

/// Ordered collection of the active chord's voices
#[derive(Debug, Default)]
pub struct VoiceRegistry {
    handles: Vec<VoiceHandle>,
}

impl VoiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a handle; registration order is preserved
    pub fn register(&mut self, handle: VoiceHandle) {
        self.handles.push(handle);
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Ids in registration order
    pub fn ids(&self) -> Vec<VoiceId> {
        self.handles.iter().map(VoiceHandle::id).collect()
    }

    /// Start times in registration order
    pub fn start_times(&self) -> Vec<f64> {
        self.handles.iter().map(VoiceHandle::start_time).collect()
    }

    /// Release every voice at `at` in registration order, then clear.
    ///
    /// Takes the bus already locked so the whole chord is released in
    /// one critical section. Returns the ids that were still alive, in
    /// the order they were released.
    pub fn release_all(&mut self, bus: &mut MixBus, at: f64) -> Vec<VoiceId> {
        self.handles
            .drain(..)
            .filter(|handle| handle.release(bus, at))
            .map(|handle| handle.id)
            .collect()
    }
}
