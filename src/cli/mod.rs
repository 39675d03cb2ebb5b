//! CLI interface for chordbox

use chordbox::synth::{Instrument, Timbre};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Chord practice synthesizer
#[derive(Parser)]
#[command(name = "chordbox")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// What to play
#[derive(Args, Debug)]
pub struct ChordArgs {
    /// Comma-separated note numbers (60 = middle C)
    #[arg(short, long, value_delimiter = ',', required = true, allow_negative_numbers = true)]
    pub notes: Vec<i32>,

    /// Instrument: piano, guitar or violin
    #[arg(short, long, default_value = "piano")]
    pub instrument: Instrument,

    /// Piano timbre: grand, electric or honky-tonk
    #[arg(short, long, default_value = "grand")]
    pub timbre: Timbre,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Play a chord on the output device
    Play {
        /// Configuration file path
        #[arg(short, long, default_value = "chordbox.yaml")]
        config: PathBuf,

        #[command(flatten)]
        chord: ChordArgs,

        /// Hold the chord for this many seconds instead of until Ctrl-C
        #[arg(long, conflicts_with = "tap")]
        hold: Option<f64>,

        /// Play a short one-shot chord
        #[arg(long)]
        tap: bool,
    },

    /// Render a chord to a stereo WAV file
    Record {
        /// Configuration file path
        #[arg(short, long, default_value = "chordbox.yaml")]
        config: PathBuf,

        #[command(flatten)]
        chord: ChordArgs,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Total length in seconds
        #[arg(short, long, default_value = "3.0")]
        duration: f64,

        /// Release the chord after this many seconds (default: one-shot delay)
        #[arg(long)]
        release_after: Option<f64>,
    },

    /// List available audio output devices
    Devices,

    /// Validate a configuration file
    Check {
        /// Configuration file path
        #[arg(short, long, default_value = "chordbox.yaml")]
        config: PathBuf,
    },

    /// Generate an example configuration file
    Init,
}
