//! Pitch and chord name resolution.
//!
//! Maps symbolic note names ("C", "F#", "A3") and chord symbols ("Cmaj7",
//! "Am") to MIDI note numbers.  Both tables are fixed: the chromatic table
//! covers the twelve sharp-spelled names, and the chord vocabulary is
//! closed.  A name outside either table is a configuration problem, caught
//! once when tables are validated — not something to retry per event.

use crate::error::Error;
use crate::model::EventContent;

/// Octave assumed when a name carries no trailing octave digit.
pub const DEFAULT_OCTAVE: i32 = 4;

/// Semitone offsets within an octave for the twelve chromatic names.
/// Sharps only; flat spellings are not part of the vocabulary.
const NOTE_SEMITONES: [(&str, i32); 12] = [
    ("C", 0),
    ("C#", 1),
    ("D", 2),
    ("D#", 3),
    ("E", 4),
    ("F", 5),
    ("F#", 6),
    ("G", 7),
    ("G#", 8),
    ("A", 9),
    ("A#", 10),
    ("B", 11),
];

/// Chord vocabulary: symbol → ordered constituent pitch names.
/// Names without an octave digit sit in the default octave.
const CHORD_SHAPES: [(&str, &[&str]); 12] = [
    ("C", &["C", "E", "G"]),
    ("Cmaj7", &["C", "E", "G", "B"]),
    ("Gadd9", &["G", "B", "D5"]),
    ("Fmaj7", &["F", "A", "C5", "E5"]),
    ("Am", &["A3", "C", "E"]),
    ("D", &["D", "F#", "A"]),
    ("A", &["A", "C#5", "E5"]),
    ("Bm", &["B3", "D", "F#"]),
    ("Em", &["E", "G", "B"]),
    ("G", &["G", "B", "D5"]),
    ("E", &["E", "G#", "B"]),
    ("F", &["F", "A", "C5"]),
];

/// Resolve a symbolic note name to a MIDI note number.
///
/// A trailing digit is the octave ("A3"); otherwise octave 4 is assumed,
/// so "C" → 60 (middle C).  The result is clamped to the MIDI range.
pub fn resolve_pitch(name: &str) -> Result<u8, Error> {
    let (base, octave) = match name.chars().last() {
        Some(c) if c.is_ascii_digit() => {
            (&name[..name.len() - 1], (c as u8 - b'0') as i32)
        }
        _ => (name, DEFAULT_OCTAVE),
    };

    let semitone = NOTE_SEMITONES
        .iter()
        .find(|(n, _)| *n == base)
        .map(|(_, s)| *s)
        .ok_or_else(|| Error::UnknownPitchName(name.to_string()))?;

    let number = (octave + 1) * 12 + semitone;
    Ok(number.clamp(0, 127) as u8)
}

/// Resolve a chord symbol to its ordered constituent MIDI note numbers.
pub fn resolve_chord(symbol: &str) -> Result<Vec<u8>, Error> {
    let names = CHORD_SHAPES
        .iter()
        .find(|(s, _)| *s == symbol)
        .map(|(_, names)| *names)
        .ok_or_else(|| Error::UnknownChordSymbol(symbol.to_string()))?;

    names.iter().map(|n| resolve_pitch(n)).collect()
}

/// Resolve an event's content to its constituent MIDI note numbers —
/// one for a note, the full voicing for a chord.
pub fn resolve_content(content: &EventContent) -> Result<Vec<u8>, Error> {
    match content {
        EventContent::Note(name) => Ok(vec![resolve_pitch(name)?]),
        EventContent::Chord(symbol) => resolve_chord(symbol),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn middle_c_is_60() {
        assert_eq!(resolve_pitch("C").unwrap(), 60);
        assert_eq!(resolve_pitch("C4").unwrap(), 60);
    }

    #[test]
    fn octave_digit_shifts_by_twelve() {
        assert_eq!(resolve_pitch("C5").unwrap(), 72);
        assert_eq!(resolve_pitch("C3").unwrap(), 48);
        assert_eq!(resolve_pitch("A3").unwrap(), 57);
    }

    #[test]
    fn sharps_resolve() {
        assert_eq!(resolve_pitch("F#").unwrap(), 66);
        assert_eq!(resolve_pitch("G#4").unwrap(), 68);
    }

    #[test]
    fn unknown_name_is_an_error() {
        assert_eq!(
            resolve_pitch("H"),
            Err(Error::UnknownPitchName("H".to_string()))
        );
        // Flats are not in the vocabulary
        assert!(resolve_pitch("Bb").is_err());
        assert!(resolve_pitch("").is_err());
    }

    #[test]
    fn c_major_triad() {
        assert_eq!(resolve_chord("C").unwrap(), vec![60, 64, 67]);
    }

    #[test]
    fn voicings_match_reference_values() {
        assert_eq!(resolve_chord("Cmaj7").unwrap(), vec![60, 64, 67, 71]);
        assert_eq!(resolve_chord("Gadd9").unwrap(), vec![67, 71, 74]);
        assert_eq!(resolve_chord("Fmaj7").unwrap(), vec![65, 69, 72, 76]);
        assert_eq!(resolve_chord("Am").unwrap(), vec![57, 60, 64]);
        assert_eq!(resolve_chord("Bm").unwrap(), vec![59, 62, 66]);
    }

    #[test]
    fn unknown_chord_is_an_error() {
        assert_eq!(
            resolve_chord("Xdim"),
            Err(Error::UnknownChordSymbol("Xdim".to_string()))
        );
    }
}
