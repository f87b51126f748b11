//! tunelib — scene-to-music composition and MIDI generation library for PicTune.
//!
//! Takes the labeled detections an object detector found in an image,
//! plus a mood tag, and turns them into two coupled artifacts: a
//! tick-quantized two-track Standard MIDI File (chords + melody) and a
//! real-time-paced stream of the same events for a live MIDI output port.
//!
//! Detection, mood classification, and the lookup tables they feed are
//! upstream concerns; this crate starts at timelines and ends at bytes
//! on disk or on a port.
//!
//! # Example
//! ```
//! use tunelib::{compose, ComposeOptions, Detection, MusicConfig};
//!
//! let config = MusicConfig::default();
//! let detections = vec![Detection {
//!     label: "tree".to_string(),
//!     bbox: (100.0, 50.0, 300.0, 400.0),
//!     confidence: 0.92,
//! }];
//!
//! let music = compose(&detections, 640.0, "serene", &config, &ComposeOptions::default()).unwrap();
//! let bytes = tunelib::composition_to_midi_bytes(&music, &ComposeOptions::default()).unwrap();
//! assert_eq!(&bytes[0..4], b"MThd");
//! ```

pub mod align;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod midi;
pub mod model;
pub mod pitch;

pub use align::align;
pub use config::{FirstCandidate, MusicConfig, PitchSelector, RandomCandidate};
pub use error::Error;
pub use midi::{
    build_smf, compile, write_midi_file, CompiledTrack, DEFAULT_TICKS_PER_BEAT,
};
pub use model::{
    build_chord_timeline, build_melody_timeline, Composition, Detection, EventContent,
    TimedEvent, Timeline,
};

/// Externally supplied parameters, validated before any processing.
#[derive(Debug, Clone)]
pub struct ComposeOptions {
    /// Tempo in beats per minute
    pub tempo_bpm: f64,
    /// Tick resolution of the persisted output
    pub ticks_per_beat: u16,
    /// How many beats each chord of the progression occupies
    pub chord_step_beats: f64,
}

impl Default for ComposeOptions {
    fn default() -> Self {
        Self {
            tempo_bpm: 120.0,
            ticks_per_beat: DEFAULT_TICKS_PER_BEAT,
            chord_step_beats: 2.0,
        }
    }
}

impl ComposeOptions {
    pub fn validate(&self) -> Result<(), Error> {
        if self.tempo_bpm <= 0.0 {
            return Err(Error::InvalidParameter(format!(
                "tempo must be positive, got {}",
                self.tempo_bpm
            )));
        }
        if self.ticks_per_beat == 0 {
            return Err(Error::InvalidParameter(
                "ticks per beat must be positive".to_string(),
            ));
        }
        if self.chord_step_beats <= 0.0 {
            return Err(Error::InvalidParameter(format!(
                "chord step must be positive, got {}",
                self.chord_step_beats
            )));
        }
        Ok(())
    }
}

/// Build chord and melody timelines for a scene, using the deterministic
/// first-candidate pitch policy.
pub fn compose(
    detections: &[Detection],
    image_width: f64,
    mood: &str,
    config: &MusicConfig,
    options: &ComposeOptions,
) -> Result<Composition, Error> {
    compose_with_selector(detections, image_width, mood, config, options, &mut FirstCandidate)
}

/// Build chord and melody timelines for a scene with an injected pitch
/// selection policy.
///
/// The chord timeline lays the mood's progression out back-to-back; the
/// melody timeline maps each detection's horizontal position and extent
/// over the progression's span.  When the melody runs past the chords,
/// the chord timeline is extended by cyclic repetition until it covers
/// the melody (it may overshoot by up to one progression cycle).  An
/// unrecognized mood falls back to the config's default progression; an
/// empty detection set simply yields an empty melody.
pub fn compose_with_selector(
    detections: &[Detection],
    image_width: f64,
    mood: &str,
    config: &MusicConfig,
    options: &ComposeOptions,
    selector: &mut dyn PitchSelector,
) -> Result<Composition, Error> {
    options.validate()?;
    config.validate()?;

    let progression = config.progression_for(mood);
    let chords = build_chord_timeline(progression, options.chord_step_beats)?;

    let melody = build_melody_timeline(detections, image_width, chords.span(), |label| {
        selector.pick(label, config)
    })?;

    let chords = if chords.span() < melody.span() {
        align(&chords, &melody)?
    } else {
        chords
    };

    Ok(Composition { chords, melody })
}

/// Compile a composition into Standard MIDI File bytes: a tempo-tagged
/// chord track on channel 0 and a melody track on channel 1.
///
/// Byte-exact for identical inputs and parameters.  Events whose chord
/// or pitch fails to resolve are skipped and recorded per track; use the
/// returned tracks from [`midi::compile`] directly when the skip record
/// matters.
pub fn composition_to_midi_bytes(
    music: &Composition,
    options: &ComposeOptions,
) -> Result<Vec<u8>, Error> {
    options.validate()?;
    let chord_track = midi::compile(
        &music.chords,
        midi::CHORD_CHANNEL,
        options.ticks_per_beat,
        options.tempo_bpm,
    )?;
    let melody_track = midi::compile(
        &music.melody,
        midi::MELODY_CHANNEL,
        options.ticks_per_beat,
        options.tempo_bpm,
    )?;
    Ok(build_smf(
        &[("Chords", &chord_track), ("Melody", &melody_track)],
        options.ticks_per_beat,
    ))
}

/// Compose a scene and write the result straight to a MIDI file.
/// Convenience function combining [`compose`], [`composition_to_midi_bytes`],
/// and [`write_midi_file`].
pub fn compose_to_midi_file<P: AsRef<std::path::Path>>(
    path: P,
    detections: &[Detection],
    image_width: f64,
    mood: &str,
    config: &MusicConfig,
    options: &ComposeOptions,
) -> Result<(), Error> {
    let music = compose(detections, image_width, mood, config, options)?;
    let bytes = composition_to_midi_bytes(&music, options)?;
    write_midi_file(path, &bytes)
}

/// Convert a composition to a JSON string.
/// Useful for passing timelines across process boundaries.
pub fn composition_to_json(music: &Composition) -> Result<String, Error> {
    serde_json::to_string_pretty(music)
        .map_err(|e| Error::Io(format!("JSON serialization error: {e}")))
}
