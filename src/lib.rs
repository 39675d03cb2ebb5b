//! chordbox - chord practice synthesizer
//!
//! Plays chords on a handful of synthesized instruments. Voices are
//! built per note, mixed through a shared convolution reverb and torn
//! down against the audio clock, so chords can be retriggered faster
//! than they ring out.

pub mod config;
pub mod engine;
pub mod synth;

pub use config::ChordConfig;
pub use engine::ChordEngine;
