//! Lookup tables injected into the pipeline: mood → chord progression and
//! object label → candidate pitch names.
//!
//! Tables are immutable values constructed once — from the built-in
//! defaults or from JSON — and validated up front so a gap surfaces at
//! startup instead of mid-compilation.  Pitch selection among a label's
//! candidates is a separate injected policy ([`PitchSelector`]) so
//! generated music is reproducible under test.

use std::collections::HashMap;
use std::path::Path;

use log::warn;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::pitch;

/// Mood and label lookup tables plus their fallbacks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MusicConfig {
    /// Mood tag → ordered chord progression
    pub mood_progressions: HashMap<String, Vec<String>>,
    /// Object label → candidate pitch names
    pub label_pitches: HashMap<String, Vec<String>>,
    /// Mood used when the classifier's tag has no table entry
    pub default_mood: String,
    /// Pitch name used when a label has no table entry
    pub default_pitch: String,
}

impl Default for MusicConfig {
    fn default() -> Self {
        let mood_progressions = [
            ("serene", vec!["Cmaj7", "Gadd9", "Fmaj7"]),
            ("house", vec!["C", "Am", "F", "G"]),
            ("urban", vec!["D", "A", "Bm", "G"]),
            ("wildlife", vec!["C", "E", "F", "G"]),
            ("playful", vec!["G", "D", "Em", "C"]),
        ]
        .into_iter()
        .map(|(mood, prog)| {
            (
                mood.to_string(),
                prog.into_iter().map(String::from).collect(),
            )
        })
        .collect();

        let label_pitches = [
            ("tree", "G"),
            ("river", "F"),
            ("bird", "E"),
            ("cage", "C"),
            ("chair", "D"),
            ("car", "A"),
            ("dog", "B"),
            ("lion", "G"),
            ("zebra", "F"),
            ("ball", "C"),
        ]
        .into_iter()
        .map(|(label, note)| (label.to_string(), vec![note.to_string()]))
        .collect();

        Self {
            mood_progressions,
            label_pitches,
            default_mood: "serene".to_string(),
            default_pitch: "C".to_string(),
        }
    }
}

impl MusicConfig {
    /// Parse a config from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        serde_json::from_str(json).map_err(|e| Error::Config(format!("JSON parse error: {e}")))
    }

    /// Load a config from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| Error::Io(format!("failed to read '{}': {e}", path.display())))?;
        Self::from_json(&json)
    }

    /// Resolve every table entry once.  A chord symbol or pitch name
    /// outside the fixed vocabularies, an empty progression or candidate
    /// list, or a dangling default fails here — never per event.
    pub fn validate(&self) -> Result<(), Error> {
        for (mood, progression) in &self.mood_progressions {
            if progression.is_empty() {
                return Err(Error::Config(format!("mood '{mood}' has an empty progression")));
            }
            for symbol in progression {
                pitch::resolve_chord(symbol)?;
            }
        }
        for (label, candidates) in &self.label_pitches {
            if candidates.is_empty() {
                return Err(Error::Config(format!("label '{label}' has no candidate pitches")));
            }
            for name in candidates {
                pitch::resolve_pitch(name)?;
            }
        }
        if !self.mood_progressions.contains_key(&self.default_mood) {
            return Err(Error::Config(format!(
                "default mood '{}' has no progression",
                self.default_mood
            )));
        }
        pitch::resolve_pitch(&self.default_pitch)?;
        Ok(())
    }

    /// Progression for a mood, falling back to the default mood's
    /// progression when the tag is unrecognized.
    pub fn progression_for(&self, mood: &str) -> &[String] {
        match self.mood_progressions.get(mood) {
            Some(progression) => progression,
            None => {
                warn!(
                    "unrecognized mood '{}', falling back to '{}'",
                    mood, self.default_mood
                );
                self.mood_progressions
                    .get(&self.default_mood)
                    .map(|p| p.as_slice())
                    .unwrap_or(&[])
            }
        }
    }
}

/// Chooses one pitch name for a detected label.
///
/// Selection is injected rather than hard-coded so the same scene always
/// compiles to the same bytes under a given policy.
pub trait PitchSelector {
    fn pick(&mut self, label: &str, config: &MusicConfig) -> String;
}

/// Always takes a label's first candidate.  The deterministic default.
pub struct FirstCandidate;

impl PitchSelector for FirstCandidate {
    fn pick(&mut self, label: &str, config: &MusicConfig) -> String {
        match config.label_pitches.get(label) {
            Some(candidates) if !candidates.is_empty() => candidates[0].clone(),
            _ => config.default_pitch.clone(),
        }
    }
}

/// Seeded random choice among a label's candidates.  Same seed, same
/// music.
pub struct RandomCandidate {
    rng: StdRng,
}

impl RandomCandidate {
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl PitchSelector for RandomCandidate {
    fn pick(&mut self, label: &str, config: &MusicConfig) -> String {
        match config.label_pitches.get(label) {
            Some(candidates) if !candidates.is_empty() => {
                candidates[self.rng.gen_range(0..candidates.len())].clone()
            }
            _ => config.default_pitch.clone(),
        }
    }
}
