//! Data model for timed musical events.
//!
//! These structures capture the music generated for one scene: a chord
//! timeline (background harmony) and a melody timeline (one note per
//! detected object), both measured in beats.  Timelines are value objects —
//! alignment and compilation produce new timelines rather than mutating
//! shared ones.

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Shortest melody note emitted for a degenerate (zero-width) detection,
/// in beats.  Keeps every event's duration strictly positive.
pub const MIN_NOTE_BEATS: f64 = 0.25;

/// A labeled region reported by the upstream object detector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Detection {
    /// Object class label (e.g. "tree", "car")
    pub label: String,
    /// Bounding box in pixel units: (x_min, y_min, x_max, y_max)
    pub bbox: (f64, f64, f64, f64),
    /// Detector confidence — carried through but never filtered on here
    pub confidence: f64,
}

impl Detection {
    /// Horizontal center of the bounding box in pixels.
    pub fn center_x(&self) -> f64 {
        (self.bbox.0 + self.bbox.2) / 2.0
    }

    /// Horizontal extent of the bounding box in pixels.
    pub fn width(&self) -> f64 {
        (self.bbox.2 - self.bbox.0).max(0.0)
    }
}

/// What an event plays: a chord symbol or a single note name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventContent {
    Chord(String),
    Note(String),
}

/// One timed event.  `start` and `duration` are in beats.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimedEvent {
    /// Offset from the start of the timeline (non-negative)
    pub start: f64,
    /// How long the event sounds (strictly positive)
    pub duration: f64,
    /// Chord symbol or note name
    pub content: EventContent,
}

/// An ordered sequence of events sharing one time unit and one semantic
/// role (chords or melody).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Timeline {
    pub events: Vec<TimedEvent>,
}

impl Timeline {
    /// Create a new empty timeline.
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// End of the last-sounding event: `max(start + duration)` over all
    /// events, 0 for an empty timeline.
    pub fn span(&self) -> f64 {
        self.events
            .iter()
            .map(|e| e.start + e.duration)
            .fold(0.0, f64::max)
    }

    /// Events in ascending `start` order.  The sort is stable, so events
    /// sharing a start keep their input order.
    pub fn sorted_events(&self) -> Vec<&TimedEvent> {
        let mut sorted: Vec<&TimedEvent> = self.events.iter().collect();
        sorted.sort_by(|a, b| {
            a.start
                .partial_cmp(&b.start)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        sorted
    }
}

/// Chord and melody timelines for one scene.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Composition {
    pub chords: Timeline,
    pub melody: Timeline,
}

/// Lay out a chord progression back-to-back from 0, each chord occupying
/// `step_beats`.
pub fn build_chord_timeline(progression: &[String], step_beats: f64) -> Result<Timeline, Error> {
    if step_beats <= 0.0 {
        return Err(Error::InvalidParameter(format!(
            "chord step must be positive, got {step_beats}"
        )));
    }

    let events = progression
        .iter()
        .enumerate()
        .map(|(i, symbol)| TimedEvent {
            start: i as f64 * step_beats,
            duration: step_beats,
            content: EventContent::Chord(symbol.clone()),
        })
        .collect();

    Ok(Timeline { events })
}

/// Map detections onto a melody timeline.
///
/// Each detection's horizontal center, normalized over the image width,
/// becomes a start offset scaled by `total_beats`; its horizontal extent,
/// normalized the same way, becomes the duration (floored at
/// [`MIN_NOTE_BEATS`] for degenerate boxes).  The pitch for each label is
/// chosen by the injected `pick_pitch` selector, so the mapping stays
/// reproducible under test.
///
/// An empty detection set yields an empty timeline — never an error.
pub fn build_melody_timeline(
    detections: &[Detection],
    image_width: f64,
    total_beats: f64,
    mut pick_pitch: impl FnMut(&str) -> String,
) -> Result<Timeline, Error> {
    if detections.is_empty() {
        return Ok(Timeline::new());
    }
    if image_width <= 0.0 {
        return Err(Error::InvalidParameter(format!(
            "image width must be positive, got {image_width}"
        )));
    }
    if total_beats <= 0.0 {
        return Err(Error::InvalidParameter(format!(
            "melody length must be positive, got {total_beats}"
        )));
    }

    let events = detections
        .iter()
        .map(|det| {
            let start = (det.center_x() / image_width).clamp(0.0, 1.0) * total_beats;
            let duration = ((det.width() / image_width) * total_beats).max(MIN_NOTE_BEATS);
            TimedEvent {
                start,
                duration,
                content: EventContent::Note(pick_pitch(&det.label)),
            }
        })
        .collect();

    Ok(Timeline { events })
}
