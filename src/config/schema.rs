//! Configuration schema definitions

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Main configuration for the chord engine
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChordConfig {
    /// Audio output settings
    #[serde(default)]
    pub audio: AudioConfig,

    /// Fixed mix levels and reverb
    #[serde(default)]
    pub mix: MixConfig,

    /// Playback timing
    #[serde(default)]
    pub playback: PlaybackConfig,
}

impl ChordConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.audio.validate()?;
        self.mix.validate()?;
        self.playback.validate()?;
        Ok(())
    }
}

/// Whether `value` is a real number in `min..=max`
fn within(value: f64, min: f64, max: f64) -> bool {
    value.is_finite() && (min..=max).contains(&value)
}

/// Whether `value` is a real number greater than zero
fn positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

/// Where rendered audio goes
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    /// Real-time output on a sound device
    #[default]
    Device,
    /// No device; the caller pulls samples with `render`
    Offline,
}

/// Audio output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Sample rate in Hz for offline rendering (default: 44100)
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Buffer size in samples (default: 512)
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,

    /// Output device name (None = default device)
    pub device: Option<String>,

    /// Output mode (default: device)
    #[serde(default)]
    pub output: OutputMode,
}

impl AudioConfig {
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate < 8000 || self.sample_rate > 192000 {
            bail!("Sample rate must be between 8000 and 192000");
        }
        if self.buffer_size < 64 || self.buffer_size > 8192 {
            bail!("Buffer size must be between 64 and 8192");
        }
        Ok(())
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            buffer_size: default_buffer_size(),
            device: None,
            output: OutputMode::default(),
        }
    }
}

fn default_sample_rate() -> u32 { 44100 }
fn default_buffer_size() -> usize { 512 }

/// Mix bus levels
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MixConfig {
    /// Gain applied to the summed voices (default: 0.3)
    #[serde(default = "default_master_gain")]
    pub master_gain: f64,

    /// Level sent from the master into the reverb (default: 0.35)
    #[serde(default = "default_reverb_send")]
    pub reverb_send: f64,

    /// Impulse response length in seconds (default: 2.0)
    #[serde(default = "default_impulse_secs")]
    pub impulse_secs: f64,

    /// Impulse response decay exponent (default: 2.0)
    #[serde(default = "default_impulse_decay")]
    pub impulse_decay: f64,
}

impl MixConfig {
    pub fn validate(&self) -> Result<()> {
        if !within(self.master_gain, 0.0, 1.0) {
            bail!("Master gain must be between 0.0 and 1.0");
        }
        if !within(self.reverb_send, 0.0, 1.0) {
            bail!("Reverb send must be between 0.0 and 1.0");
        }
        if !positive(self.impulse_secs) || self.impulse_secs > 10.0 {
            bail!("Impulse duration must be between 0 and 10 seconds");
        }
        if !positive(self.impulse_decay) {
            bail!("Impulse decay must be positive");
        }
        Ok(())
    }
}

impl Default for MixConfig {
    fn default() -> Self {
        Self {
            master_gain: default_master_gain(),
            reverb_send: default_reverb_send(),
            impulse_secs: default_impulse_secs(),
            impulse_decay: default_impulse_decay(),
        }
    }
}

fn default_master_gain() -> f64 { 0.3 }
fn default_reverb_send() -> f64 { 0.35 }
fn default_impulse_secs() -> f64 { 2.0 }
fn default_impulse_decay() -> f64 { 2.0 }

/// Chord timing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Delay before a one-shot chord is stopped (default: 1.2)
    #[serde(default = "default_one_shot_secs")]
    pub one_shot_secs: f64,

    /// Release fade length (default: 0.3)
    #[serde(default = "default_release_secs")]
    pub release_secs: f64,

    /// Time from release to oscillator stop (default: 0.35)
    #[serde(default = "default_stop_tail_secs")]
    pub stop_tail_secs: f64,

    /// Strum offset between guitar notes (default: 0.03)
    #[serde(default = "default_guitar_stagger")]
    pub guitar_stagger_secs: f64,

    /// Bow offset between violin notes (default: 0.04)
    #[serde(default = "default_violin_stagger")]
    pub violin_stagger_secs: f64,
}

impl PlaybackConfig {
    pub fn validate(&self) -> Result<()> {
        if !positive(self.one_shot_secs) {
            bail!("One-shot duration must be positive");
        }
        if !positive(self.release_secs) {
            bail!("Release time must be positive");
        }
        if !positive(self.stop_tail_secs) || self.stop_tail_secs < self.release_secs {
            bail!("Stop tail must not be shorter than the release time");
        }
        if !within(self.guitar_stagger_secs, 0.0, f64::MAX)
            || !within(self.violin_stagger_secs, 0.0, f64::MAX)
        {
            bail!("Stagger offsets must not be negative");
        }
        Ok(())
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            one_shot_secs: default_one_shot_secs(),
            release_secs: default_release_secs(),
            stop_tail_secs: default_stop_tail_secs(),
            guitar_stagger_secs: default_guitar_stagger(),
            violin_stagger_secs: default_violin_stagger(),
        }
    }
}

fn default_one_shot_secs() -> f64 { 1.2 }
fn default_release_secs() -> f64 { 0.3 }
fn default_stop_tail_secs() -> f64 { 0.35 }
fn default_guitar_stagger() -> f64 { 0.03 }
fn default_violin_stagger() -> f64 { 0.04 }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_audio_config() {
        let yaml = "sample_rate: 48000";
        let config: AudioConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.sample_rate, 48000);
        assert_eq!(config.buffer_size, 512); // default
        assert_eq!(config.output, OutputMode::Device);
    }

    #[test]
    fn test_mix_defaults() {
        let config: MixConfig = serde_yaml::from_str("reverb_send: 0.2").unwrap();
        assert_eq!(config.master_gain, 0.3);
        assert_eq!(config.reverb_send, 0.2);
        assert_eq!(config.impulse_secs, 2.0);
    }

    #[test]
    fn test_playback_config() {
        let yaml = r#"
one_shot_secs: 2.0
guitar_stagger_secs: 0.05
"#;
        let config: PlaybackConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.one_shot_secs, 2.0);
        assert_eq!(config.guitar_stagger_secs, 0.05);
        assert_eq!(config.violin_stagger_secs, 0.04);
        assert_eq!(config.release_secs, 0.3);
    }

    #[test]
    fn test_offline_output_mode() {
        let config: AudioConfig = serde_yaml::from_str("output: offline").unwrap();
        assert_eq!(config.output, OutputMode::Offline);
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(ChordConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_master_gain() {
        let mut config = ChordConfig::default();
        config.mix.master_gain = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_tail_shorter_than_release_rejected() {
        let mut config = ChordConfig::default();
        config.playback.stop_tail_secs = 0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_non_finite_timing_rejected() {
        let mut config = ChordConfig::default();
        config.playback.one_shot_secs = f64::INFINITY;
        assert!(config.validate().is_err());

        let mut config = ChordConfig::default();
        config.playback.release_secs = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = ChordConfig::default();
        config.playback.stop_tail_secs = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = ChordConfig::default();
        config.playback.violin_stagger_secs = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_non_finite_mix_rejected() {
        let mut config = ChordConfig::default();
        config.mix.impulse_secs = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = ChordConfig::default();
        config.mix.impulse_decay = f64::INFINITY;
        assert!(config.validate().is_err());

        let mut config = ChordConfig::default();
        config.mix.reverb_send = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_yaml_infinity_rejected() {
        let config: ChordConfig =
            serde_yaml::from_str("playback:\n  one_shot_secs: .inf\n").unwrap();
        assert_eq!(config.playback.one_shot_secs, f64::INFINITY);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_sample_rate() {
        let mut config = ChordConfig::default();
        config.audio.sample_rate = 4000;
        assert!(config.validate().is_err());
    }
}
