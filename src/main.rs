//! chordbox - chord practice synthesizer

use anyhow::{bail, Context, Result};
use chordbox::config::{self, AudioConfig, ChordConfig, OutputMode};
use chordbox::engine::{default_device_name, list_output_devices, ChordEngine, Recorder};
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

mod cli;

use cli::{ChordArgs, Cli, Commands};

/// Frames rendered per block when recording
const RECORD_BLOCK: usize = 1024;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Play {
            config: config_path,
            chord,
            hold,
            tap,
        } => {
            let cfg = config::load_or_default(&config_path)?;
            play(cfg, chord, hold, tap).await?;
        }

        Commands::Record {
            config: config_path,
            chord,
            output,
            duration,
            release_after,
        } => {
            let cfg = config::load_or_default(&config_path)?;
            record(cfg, chord, &output, duration, release_after)?;
        }

        Commands::Devices => {
            println!("Available audio devices:\n");

            if let Some(name) = default_device_name() {
                println!("Default output: {}\n", name);
            }

            println!("Output devices:");
            match list_output_devices() {
                Ok(devices) => {
                    for (name, info) in devices {
                        println!("  - {} ({} Hz, {} ch)", name, info.sample_rate, info.channels);
                    }
                }
                Err(e) => {
                    println!("  Error listing devices: {}", e);
                }
            }
        }

        Commands::Check { config: config_path } => {
            println!("Checking configuration at {:?}...", config_path);

            match config::load_config(&config_path) {
                Ok(cfg) => {
                    println!("Configuration is valid!");
                    println!("  Sample rate: {} Hz", cfg.audio.sample_rate);
                    println!("  Buffer size: {}", cfg.audio.buffer_size);
                    println!("  Output: {:?}", cfg.audio.output);
                    if let Some(device) = &cfg.audio.device {
                        println!("  Device: {}", device);
                    }
                    println!("  Master gain: {:.0}%", cfg.mix.master_gain * 100.0);
                    println!("  Reverb send: {:.0}%", cfg.mix.reverb_send * 100.0);
                    println!(
                        "  Impulse: {:.1}s, decay {:.1}",
                        cfg.mix.impulse_secs, cfg.mix.impulse_decay
                    );
                    println!("  One-shot: {:.2}s", cfg.playback.one_shot_secs);
                    println!(
                        "  Release: {:.2}s (stop after {:.2}s)",
                        cfg.playback.release_secs, cfg.playback.stop_tail_secs
                    );
                }
                Err(e) => {
                    println!("Configuration is invalid: {:#}", e);
                    std::process::exit(1);
                }
            }
        }

        Commands::Init => {
            let example_config = include_str!("../chordbox.example.yaml");

            let path = "chordbox.yaml";
            if Path::new(path).exists() {
                println!("chordbox.yaml already exists. Not overwriting.");
            } else {
                std::fs::write(path, example_config)
                    .with_context(|| format!("failed to write {}", path))?;
                println!("Created chordbox.yaml with example configuration.");
            }
        }
    }

    Ok(())
}

/// Convert a user-supplied number of seconds into a `Duration`
fn seconds(secs: f64, what: &str) -> Result<Duration> {
    Duration::try_from_secs_f64(secs).with_context(|| format!("invalid {}: {}", what, secs))
}

async fn play(cfg: ChordConfig, chord: ChordArgs, hold: Option<f64>, tap: bool) -> Result<()> {
    let tail = seconds(cfg.playback.stop_tail_secs, "stop tail")?;
    let one_shot = seconds(cfg.playback.one_shot_secs, "one-shot duration")?;
    let hold = hold.map(|secs| seconds(secs, "hold time")).transpose()?;
    let engine = ChordEngine::new(ChordConfig {
        audio: AudioConfig {
            output: OutputMode::Device,
            ..cfg.audio.clone()
        },
        ..cfg
    });

    println!(
        "Playing {:?} on {} ({})",
        chord.notes, chord.instrument, chord.timbre
    );

    if tap {
        engine.play_notes(&chord.notes, chord.instrument, chord.timbre);
        ensure_ready(&engine)?;
        tokio::time::sleep(one_shot + tail).await;
        return Ok(());
    }

    engine.start_chord(&chord.notes, chord.instrument, chord.timbre);
    ensure_ready(&engine)?;

    match hold {
        Some(hold) => tokio::time::sleep(hold).await,
        None => {
            println!("Press Ctrl-C to release");
            let interrupted = Arc::new(Notify::new());
            let notify = interrupted.clone();
            ctrlc::set_handler(move || notify.notify_one())
                .context("failed to install Ctrl-C handler")?;
            interrupted.notified().await;
        }
    }

    engine.stop_chord();
    debug!("waiting for release tail");
    tokio::time::sleep(tail).await;
    Ok(())
}

fn ensure_ready(engine: &ChordEngine) -> Result<()> {
    if !engine.is_ready() {
        bail!("no audio output available (see log for details)");
    }
    Ok(())
}

fn record(
    cfg: ChordConfig,
    chord: ChordArgs,
    output: &Path,
    duration: f64,
    release_after: Option<f64>,
) -> Result<()> {
    if !(duration.is_finite() && duration > 0.0) {
        bail!("Duration must be positive");
    }
    let release_at = release_after.unwrap_or(cfg.playback.one_shot_secs);
    let sample_rate = cfg.audio.sample_rate;
    let release_frame = (release_at.is_finite() && release_at >= 0.0)
        .then(|| (release_at * sample_rate as f64).round() as usize);

    let engine = ChordEngine::new(ChordConfig {
        audio: AudioConfig {
            output: OutputMode::Offline,
            ..cfg.audio.clone()
        },
        ..cfg
    });
    engine.start_chord(&chord.notes, chord.instrument, chord.timbre);
    ensure_ready(&engine)?;

    println!("Recording {:.1} seconds to {:?}...", duration, output);

    let mut recorder = Recorder::new(output, sample_rate)?;
    let total_frames = (duration * sample_rate as f64).round() as usize;
    let mut buffer = vec![0.0f32; RECORD_BLOCK * 2];
    let mut rendered = 0;

    while rendered < total_frames {
        if release_frame == Some(rendered) {
            engine.stop_chord();
        }

        let frames = block_len(rendered, total_frames, release_frame);
        let block = &mut buffer[..frames * 2];
        engine.render(block);
        recorder.write_interleaved(block)?;
        rendered += frames;
    }

    let written = recorder.frames_written();
    recorder.finalize()?;
    info!(frames = written, "recording finished");
    println!("Recorded to {:?}", output);
    Ok(())
}

/// Frames to render next so that a block ends exactly on the release frame
fn block_len(rendered: usize, total: usize, release_frame: Option<usize>) -> usize {
    let frames = RECORD_BLOCK.min(total - rendered);
    match release_frame {
        Some(at) if at > rendered => frames.min(at - rendered),
        _ => frames,
    }
}
