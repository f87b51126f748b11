//! Tick compilation and Standard MIDI File output.
//!
//! Converts beat-timed timelines into delta-time-encoded tracks and
//! assembles them into an SMF Type 1 file as raw bytes: track 0 carries
//! the chords, track 1 the melody.  Compilation is pure — the same
//! timeline and parameters always produce the same bytes.

use log::warn;

use crate::error::Error;
use crate::model::Timeline;
use crate::pitch;

// ═══════════════════════════════════════════════════════════════════════
// Public API
// ═══════════════════════════════════════════════════════════════════════

/// Ticks per quarter note (beat) in MIDI output.
pub const DEFAULT_TICKS_PER_BEAT: u16 = 480;

/// Velocity for note-on and note-off messages.
pub const VELOCITY: u8 = 64;

/// MIDI channel carrying the chord background.
pub const CHORD_CHANNEL: u8 = 0;
/// MIDI channel carrying the melody.
pub const MELODY_CHANNEL: u8 = 1;

/// One wire-level message with its delta time: ticks elapsed since the
/// previous message on the same track.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackMessage {
    pub delta: u32,
    pub kind: MessageKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MessageKind {
    /// Tempo meta event: microseconds per beat
    Tempo(u32),
    NoteOn { channel: u8, pitch: u8, velocity: u8 },
    NoteOff { channel: u8, pitch: u8, velocity: u8 },
}

/// An event the compiler dropped because its pitch or chord failed to
/// resolve.
#[derive(Debug, Clone)]
pub struct SkippedEvent {
    pub start: f64,
    pub reason: String,
}

/// A compiled track: delta-encoded messages plus the record of any
/// skipped events.
#[derive(Debug, Clone, Default)]
pub struct CompiledTrack {
    pub messages: Vec<TrackMessage>,
    pub skipped: Vec<SkippedEvent>,
}

/// Compile a timeline into a delta-time-encoded track.
///
/// The track opens with a tempo meta message; events follow in ascending
/// `start` order (stable on ties).  Each message's delta is relative to
/// the message before it on the same track — `max(0, tick − running
/// clock)` — so accumulated time never decreases.  A chord's note-ons all
/// share its start tick; its first note-off carries the full duration and
/// the rest follow at delta 0, advancing the clock by exactly the chord's
/// duration.
///
/// Events whose pitch or chord cannot be resolved are skipped and
/// recorded; compilation continues with the rest.
pub fn compile(
    timeline: &Timeline,
    channel: u8,
    ticks_per_beat: u16,
    tempo_bpm: f64,
) -> Result<CompiledTrack, Error> {
    if ticks_per_beat == 0 {
        return Err(Error::InvalidParameter(
            "ticks per beat must be positive".to_string(),
        ));
    }
    if tempo_bpm <= 0.0 {
        return Err(Error::InvalidParameter(format!(
            "tempo must be positive, got {tempo_bpm}"
        )));
    }

    let mut track = CompiledTrack::default();
    track.messages.push(TrackMessage {
        delta: 0,
        kind: MessageKind::Tempo((60_000_000.0 / tempo_bpm) as u32),
    });

    // Running clock: accumulated ticks of everything emitted so far.
    let mut clock: u32 = 0;

    for event in timeline.sorted_events() {
        let pitches = match pitch::resolve_content(&event.content) {
            Ok(p) => p,
            Err(e) => {
                warn!("skipping event at beat {}: {e}", event.start);
                track.skipped.push(SkippedEvent {
                    start: event.start,
                    reason: e.to_string(),
                });
                continue;
            }
        };

        let start_tick = beats_to_ticks(event.start, ticks_per_beat);
        let duration_ticks = beats_to_ticks(event.duration, ticks_per_beat);

        // Note-ons: the first bridges the gap from the running clock,
        // the rest sound simultaneously at delta 0.
        let mut delta = start_tick.saturating_sub(clock);
        clock += delta;
        for &p in &pitches {
            track.messages.push(TrackMessage {
                delta,
                kind: MessageKind::NoteOn {
                    channel,
                    pitch: p,
                    velocity: VELOCITY,
                },
            });
            delta = 0;
        }

        // Note-offs: the first carries the full duration, the rest
        // release at delta 0.
        let mut delta = duration_ticks;
        clock += delta;
        for &p in &pitches {
            track.messages.push(TrackMessage {
                delta,
                kind: MessageKind::NoteOff {
                    channel,
                    pitch: p,
                    velocity: VELOCITY,
                },
            });
            delta = 0;
        }
    }

    Ok(track)
}

/// Convert beats to integer ticks at the given resolution.
pub fn beats_to_ticks(beats: f64, ticks_per_beat: u16) -> u32 {
    (beats * ticks_per_beat as f64).round().max(0.0) as u32
}

// ═══════════════════════════════════════════════════════════════════════
// SMF byte encoding
// ═══════════════════════════════════════════════════════════════════════

/// Build the complete Standard MIDI File bytes (format 1) from named
/// tracks.
pub fn build_smf(tracks: &[(&str, &CompiledTrack)], ticks_per_beat: u16) -> Vec<u8> {
    let mut out = Vec::new();

    // MThd header
    out.extend_from_slice(b"MThd");
    out.extend_from_slice(&6u32.to_be_bytes()); // header length
    out.extend_from_slice(&1u16.to_be_bytes()); // format type 1
    out.extend_from_slice(&(tracks.len() as u16).to_be_bytes());
    out.extend_from_slice(&ticks_per_beat.to_be_bytes());

    // Track chunks
    for (name, track) in tracks {
        let track_data = encode_track(track, name);
        out.extend_from_slice(b"MTrk");
        out.extend_from_slice(&(track_data.len() as u32).to_be_bytes());
        out.extend_from_slice(&track_data);
    }

    out
}

/// Encode a compiled track's messages into raw MTrk bytes.
fn encode_track(track: &CompiledTrack, name: &str) -> Vec<u8> {
    let mut data = Vec::new();

    // Track name meta event
    let name_bytes = name.as_bytes();
    data.push(0x00); // delta time 0
    data.push(0xFF);
    data.push(0x03); // track name
    write_vlq(&mut data, name_bytes.len() as u32);
    data.extend_from_slice(name_bytes);

    for message in &track.messages {
        write_vlq(&mut data, message.delta);
        data.extend_from_slice(&message_bytes(&message.kind));
    }

    // End of track
    data.extend_from_slice(&[0x00, 0xFF, 0x2F, 0x00]);

    data
}

/// Raw status + data bytes for one message.
fn message_bytes(kind: &MessageKind) -> Vec<u8> {
    match kind {
        // Meta event: FF 51 03 tt tt tt
        MessageKind::Tempo(us_per_beat) => vec![
            0xFF,
            0x51,
            0x03,
            ((us_per_beat >> 16) & 0xFF) as u8,
            ((us_per_beat >> 8) & 0xFF) as u8,
            (us_per_beat & 0xFF) as u8,
        ],
        MessageKind::NoteOn {
            channel,
            pitch,
            velocity,
        } => vec![0x90 | (channel & 0x0F), *pitch, *velocity],
        MessageKind::NoteOff {
            channel,
            pitch,
            velocity,
        } => vec![0x80 | (channel & 0x0F), *pitch, *velocity],
    }
}

/// Write a variable-length quantity (VLQ) to a byte vector.
fn write_vlq(out: &mut Vec<u8>, mut value: u32) {
    if value == 0 {
        out.push(0);
        return;
    }
    let mut buf = [0u8; 5];
    let mut i = 0;
    while value > 0 {
        buf[i] = (value & 0x7F) as u8;
        value >>= 7;
        if i > 0 {
            buf[i] |= 0x80;
        }
        i += 1;
    }
    // Write in reverse order
    for j in (0..i).rev() {
        out.push(buf[j]);
    }
}

/// Write SMF bytes to a path, creating parent directories if needed.
pub fn write_midi_file<P: AsRef<std::path::Path>>(path: P, bytes: &[u8]) -> Result<(), Error> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::Io(format!("failed to create '{}': {e}", parent.display()))
            })?;
        }
    }
    std::fs::write(path, bytes)
        .map_err(|e| Error::Io(format!("failed to write '{}': {e}", path.display())))
}
