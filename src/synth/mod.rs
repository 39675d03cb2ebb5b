//! Synthesis building blocks for chord playback
//!
//! Contains oscillators, filters, automation curves, the reverb
//! impulse/convolver pair and the per-instrument voice recipes.

mod automation;
mod filter;
mod impulse;
mod instrument;
mod lfo;
mod oscillator;
mod pitch;
mod reverb;
mod voice;

pub use automation::{AutomationCurve, Breakpoint, CurveKind, MIN_EXP_VALUE};
pub use filter::{Filter, FilterType};
pub use impulse::ImpulseResponse;
pub use instrument::{Instrument, ParseNameError, Patch, Timbre};
pub use lfo::Lfo;
pub use oscillator::{Oscillator, Waveform};
pub use pitch::{cents_to_ratio, frequency, A4_FREQUENCY, A4_NOTE};
pub use reverb::{Convolver, DEFAULT_BLOCK};
pub use voice::{Voice, VoiceBuilder, VoiceState, RELEASE_FLOOR};
