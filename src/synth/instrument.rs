//! Instrument and timbre selection

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Instrument family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Instrument {
    Piano,
    Guitar,
    Violin,
}

/// Piano timbre. Ignored by the other instruments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Timbre {
    #[default]
    Grand,
    Electric,
    HonkyTonk,
}

/// A concrete synthesis recipe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Patch {
    GrandPiano,
    ElectricPiano,
    HonkyTonkPiano,
    Guitar,
    Violin,
}

impl Patch {
    /// Resolve the recipe for an instrument/timbre pair
    pub fn resolve(instrument: Instrument, timbre: Timbre) -> Self {
        match (instrument, timbre) {
            (Instrument::Piano, Timbre::Grand) => Patch::GrandPiano,
            (Instrument::Piano, Timbre::Electric) => Patch::ElectricPiano,
            (Instrument::Piano, Timbre::HonkyTonk) => Patch::HonkyTonkPiano,
            (Instrument::Guitar, _) => Patch::Guitar,
            (Instrument::Violin, _) => Patch::Violin,
        }
    }

    /// Instrument family this recipe belongs to
    pub fn instrument(self) -> Instrument {
        match self {
            Patch::GrandPiano | Patch::ElectricPiano | Patch::HonkyTonkPiano => Instrument::Piano,
            Patch::Guitar => Instrument::Guitar,
            Patch::Violin => Instrument::Violin,
        }
    }
}

/// Unrecognised instrument or timbre name
#[derive(Debug, Error, PartialEq)]
#[error("unknown {kind} '{name}'")]
pub struct ParseNameError {
    kind: &'static str,
    name: String,
}

impl FromStr for Instrument {
    type Err = ParseNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "piano" => Ok(Instrument::Piano),
            "guitar" => Ok(Instrument::Guitar),
            "violin" => Ok(Instrument::Violin),
            _ => Err(ParseNameError {
                kind: "instrument",
                name: s.to_string(),
            }),
        }
    }
}

impl FromStr for Timbre {
    type Err = ParseNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "grand" => Ok(Timbre::Grand),
            "electric" => Ok(Timbre::Electric),
            "honky-tonk" | "honkytonk" => Ok(Timbre::HonkyTonk),
            _ => Err(ParseNameError {
                kind: "timbre",
                name: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Instrument::Piano => "piano",
            Instrument::Guitar => "guitar",
            Instrument::Violin => "violin",
        };
        f.write_str(name)
    }
}

impl fmt::Display for Timbre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Timbre::Grand => "grand",
            Timbre::Electric => "electric",
            Timbre::HonkyTonk => "honky-tonk",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_piano_timbres_select_distinct_patches() {
        assert_eq!(Patch::resolve(Instrument::Piano, Timbre::Grand), Patch::GrandPiano);
        assert_eq!(Patch::resolve(Instrument::Piano, Timbre::Electric), Patch::ElectricPiano);
        assert_eq!(
            Patch::resolve(Instrument::Piano, Timbre::HonkyTonk),
            Patch::HonkyTonkPiano
        );
    }

    #[test]
    fn test_timbre_ignored_for_strings() {
        for timbre in [Timbre::Grand, Timbre::Electric, Timbre::HonkyTonk] {
            assert_eq!(Patch::resolve(Instrument::Guitar, timbre), Patch::Guitar);
            assert_eq!(Patch::resolve(Instrument::Violin, timbre), Patch::Violin);
        }
    }

    #[test]
    fn test_patch_instrument_round_trip() {
        assert_eq!(Patch::HonkyTonkPiano.instrument(), Instrument::Piano);
        assert_eq!(Patch::Violin.instrument(), Instrument::Violin);
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("Guitar".parse::<Instrument>(), Ok(Instrument::Guitar));
        assert_eq!("honky_tonk".parse::<Timbre>(), Ok(Timbre::HonkyTonk));
        assert_eq!(Timbre::HonkyTonk.to_string(), "honky-tonk");
        assert!("banjo".parse::<Instrument>().is_err());
    }

    #[test]
    fn test_default_timbre_is_grand() {
        assert_eq!(Timbre::default(), Timbre::Grand);
    }
}
