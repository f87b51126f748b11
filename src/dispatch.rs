//! Real-time playback of timelines over a live MIDI output port.
//!
//! Chords go out on channel 0 and melody on channel 1, paced by
//! wall-clock waits derived from the same beat values the tick compiler
//! uses.  Playback blocks the calling thread for the whole run, so it
//! must not run on a thread that has to stay responsive.
//!
//! The dispatcher talks to a narrow [`MidiSink`] capability rather than
//! to `midir` directly, and takes its waits from a [`Clock`], so tests
//! drive it with an in-memory recorder and a virtual clock instead of a
//! real port and real time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use log::{info, warn};
use midir::{MidiOutput, MidiOutputConnection};

use crate::error::Error;
use crate::midi::{CHORD_CHANNEL, MELODY_CHANNEL, VELOCITY};
use crate::model::Timeline;
use crate::pitch;

/// Client name registered with the system MIDI service.
const CLIENT_NAME: &str = "tunelib";

/// Default substrings matched against port names when picking a port.
pub const DEFAULT_PORT_HINTS: [&str; 3] = ["IAC", "LoopMIDI", "Ableton"];

// ═══════════════════════════════════════════════════════════════════════
// Capabilities
// ═══════════════════════════════════════════════════════════════════════

/// Something that accepts 3-byte MIDI messages.  The `midir` connection
/// is the production implementation; tests substitute a recorder.
pub trait MidiSink {
    fn send(&mut self, message: [u8; 3]) -> Result<(), Error>;
}

impl MidiSink for MidiOutputConnection {
    fn send(&mut self, message: [u8; 3]) -> Result<(), Error> {
        MidiOutputConnection::send(self, &message)
            .map_err(|e| Error::Port(format!("send failed: {e}")))
    }
}

/// Time source for pacing.
pub trait Clock {
    fn sleep(&mut self, duration: Duration);
}

/// Wall-clock pacing via `thread::sleep`.
pub struct WallClock;

impl Clock for WallClock {
    fn sleep(&mut self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Serializes sends from concurrent channel tasks through a mutex, so
/// the single port handle stays a single-writer resource.
struct SharedSink<'a, S: MidiSink>(&'a Mutex<S>);

impl<S: MidiSink> MidiSink for SharedSink<'_, S> {
    fn send(&mut self, message: [u8; 3]) -> Result<(), Error> {
        self.0
            .lock()
            .map_err(|_| Error::Port("output port lock poisoned".to_string()))?
            .send(message)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Port selection
// ═══════════════════════════════════════════════════════════════════════

/// Enumerate the names of the available MIDI output ports.
pub fn output_ports() -> Result<Vec<String>, Error> {
    let out = MidiOutput::new(CLIENT_NAME)
        .map_err(|e| Error::Port(format!("failed to create MIDI output: {e}")))?;
    Ok(out
        .ports()
        .iter()
        .map(|p| out.port_name(p).unwrap_or_else(|_| "<unknown>".to_string()))
        .collect())
}

/// Index of the first port name containing any of the hint substrings.
pub fn match_port(names: &[String], hints: &[&str]) -> Option<usize> {
    names
        .iter()
        .position(|name| hints.iter().any(|hint| name.contains(hint)))
}

/// Open the first output port whose name matches one of `hints`.
///
/// Fails with [`Error::NoOutputPortAvailable`] before anything is sent
/// when no port matches.
pub fn open_matching_port(hints: &[&str]) -> Result<MidiOutputConnection, Error> {
    let out = MidiOutput::new(CLIENT_NAME)
        .map_err(|e| Error::Port(format!("failed to create MIDI output: {e}")))?;
    let ports = out.ports();
    let names: Vec<String> = ports
        .iter()
        .map(|p| out.port_name(p).unwrap_or_else(|_| "<unknown>".to_string()))
        .collect();

    let index = match_port(&names, hints).ok_or(Error::NoOutputPortAvailable)?;
    info!("connecting to MIDI port '{}'", names[index]);
    out.connect(&ports[index], CLIENT_NAME)
        .map_err(|e| Error::Port(format!("failed to open port '{}': {e}", names[index])))
}

// ═══════════════════════════════════════════════════════════════════════
// Dispatch
// ═══════════════════════════════════════════════════════════════════════

/// Play both timelines sequentially on the calling thread: chords fully
/// (channel 0), then melody (channel 1).
///
/// This single-threaded mode is a deliberate degraded mode — the two
/// roles are not interleaved in real time.  Use [`dispatch_parallel`]
/// when they must sound together.  `stop` is checked between events;
/// note-offs for anything sounding are always flushed before returning,
/// including on stop and on send failure.
pub fn dispatch<S: MidiSink>(
    chords: &Timeline,
    melody: &Timeline,
    sink: &mut S,
    clock: &mut dyn Clock,
    tempo_bpm: f64,
    stop: &AtomicBool,
) -> Result<(), Error> {
    if tempo_bpm <= 0.0 {
        return Err(Error::InvalidParameter(format!(
            "tempo must be positive, got {tempo_bpm}"
        )));
    }
    play_timeline(chords, CHORD_CHANNEL, tempo_bpm, sink, clock, stop)?;
    play_timeline(melody, MELODY_CHANNEL, tempo_bpm, sink, clock, stop)
}

/// Play both timelines concurrently, one thread per channel, sharing the
/// single port handle behind a mutex so multi-byte sends never interleave.
pub fn dispatch_parallel<S: MidiSink + Send>(
    chords: &Timeline,
    melody: &Timeline,
    sink: S,
    tempo_bpm: f64,
    stop: &AtomicBool,
) -> Result<S, Error> {
    if tempo_bpm <= 0.0 {
        return Err(Error::InvalidParameter(format!(
            "tempo must be positive, got {tempo_bpm}"
        )));
    }

    let shared = Mutex::new(sink);
    let (chord_result, melody_result) = thread::scope(|s| {
        let chord_task = s.spawn(|| {
            let mut sink = SharedSink(&shared);
            play_timeline(chords, CHORD_CHANNEL, tempo_bpm, &mut sink, &mut WallClock, stop)
        });
        let melody_task = s.spawn(|| {
            let mut sink = SharedSink(&shared);
            play_timeline(melody, MELODY_CHANNEL, tempo_bpm, &mut sink, &mut WallClock, stop)
        });
        (
            chord_task
                .join()
                .unwrap_or_else(|_| Err(Error::Port("chord playback thread panicked".to_string()))),
            melody_task
                .join()
                .unwrap_or_else(|_| Err(Error::Port("melody playback thread panicked".to_string()))),
        )
    });
    chord_result?;
    melody_result?;

    shared
        .into_inner()
        .map_err(|_| Error::Port("output port lock poisoned".to_string()))
}

/// Open the first matching port and play both timelines sequentially.
///
/// Fails fast with [`Error::NoOutputPortAvailable`] — no partial send —
/// when nothing matches `hints`.
pub fn dispatch_to_matching_port(
    chords: &Timeline,
    melody: &Timeline,
    tempo_bpm: f64,
    hints: &[&str],
    stop: &AtomicBool,
) -> Result<(), Error> {
    let mut conn = open_matching_port(hints)?;
    let result = dispatch(chords, melody, &mut conn, &mut WallClock, tempo_bpm, stop);
    conn.close();
    result
}

/// Play one timeline's events in start order over `sink`.
///
/// For each event: rest until its start, send the note-on set, hold for
/// its duration, send the matching note-off set.  A stop request takes
/// effect between events, after the current event's note-offs have gone
/// out.  Events whose content fails to resolve are skipped, mirroring
/// the compiler's policy.
fn play_timeline<S: MidiSink>(
    timeline: &Timeline,
    channel: u8,
    tempo_bpm: f64,
    sink: &mut S,
    clock: &mut dyn Clock,
    stop: &AtomicBool,
) -> Result<(), Error> {
    // Beats already played on this channel.
    let mut cursor = 0.0_f64;

    for event in timeline.sorted_events() {
        if stop.load(Ordering::Relaxed) {
            info!("stop requested, ending playback on channel {channel}");
            break;
        }

        let pitches = match pitch::resolve_content(&event.content) {
            Ok(p) => p,
            Err(e) => {
                warn!("skipping event at beat {}: {e}", event.start);
                continue;
            }
        };

        if event.start > cursor {
            clock.sleep(beats_to_duration(event.start - cursor, tempo_bpm));
            cursor = event.start;
        }

        for (i, &p) in pitches.iter().enumerate() {
            if let Err(e) = sink.send([0x90 | (channel & 0x0F), p, VELOCITY]) {
                // Silence whatever already started before surfacing
                flush_note_offs(sink, &pitches[..i], channel);
                return Err(e);
            }
        }

        clock.sleep(beats_to_duration(event.duration, tempo_bpm));
        cursor += event.duration;

        for (i, &p) in pitches.iter().enumerate() {
            if let Err(e) = sink.send([0x80 | (channel & 0x0F), p, VELOCITY]) {
                flush_note_offs(sink, &pitches[i + 1..], channel);
                return Err(e);
            }
        }
    }

    Ok(())
}

/// Best-effort note-offs for a set of sounding pitches.
fn flush_note_offs<S: MidiSink>(sink: &mut S, pitches: &[u8], channel: u8) {
    for &p in pitches {
        let _ = sink.send([0x80 | (channel & 0x0F), p, VELOCITY]);
    }
}

/// Wall-clock duration of `beats` at the given tempo.
fn beats_to_duration(beats: f64, tempo_bpm: f64) -> Duration {
    Duration::from_secs_f64(beats * 60.0 / tempo_bpm)
}
