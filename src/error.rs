//! Error taxonomy for the composition pipeline.
//!
//! Table-lookup failures (`UnknownPitchName`, `UnknownChordSymbol`) are
//! recoverable per event — the compiler skips the offending event and keeps
//! going.  Everything else aborts the enclosing operation: alignment of an
//! empty timeline, dispatch without a usable port, or non-positive
//! parameters rejected before any processing begins.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// A symbolic note name whose base letter is not in the chromatic table.
    UnknownPitchName(String),
    /// A chord symbol absent from the chord vocabulary.
    UnknownChordSymbol(String),
    /// Alignment was asked to cyclically extend a timeline with no content.
    EmptySourceTimeline,
    /// No output port matched when opening a live connection.
    NoOutputPortAvailable,
    /// A non-positive tempo, resolution, duration, or image width.
    InvalidParameter(String),
    /// A malformed or incomplete configuration table.
    Config(String),
    /// The live output backend failed to enumerate, open, or send.
    Port(String),
    /// File output failed.
    Io(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UnknownPitchName(name) => write!(f, "unknown pitch name '{name}'"),
            Error::UnknownChordSymbol(sym) => write!(f, "unknown chord symbol '{sym}'"),
            Error::EmptySourceTimeline => {
                write!(f, "cannot extend an empty timeline by repetition")
            }
            Error::NoOutputPortAvailable => write!(f, "no matching MIDI output port available"),
            Error::InvalidParameter(what) => write!(f, "invalid parameter: {what}"),
            Error::Config(what) => write!(f, "configuration error: {what}"),
            Error::Port(what) => write!(f, "MIDI port error: {what}"),
            Error::Io(what) => write!(f, "I/O error: {what}"),
        }
    }
}

impl std::error::Error for Error {}
