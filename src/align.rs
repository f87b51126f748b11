//! Equalize two timelines by cyclic repetition.
//!
//! The shorter timeline (conventionally the chord background) is expanded
//! into a flat, play-order event sequence covering at least the longer
//! timeline's span — the same unrolling idea a sequencer applies to repeat
//! signs, with the repeat count derived from the target span instead of
//! the notation.

use crate::error::Error;
use crate::model::{TimedEvent, Timeline};

/// Extend `shorter` by cyclically repeating its content, each repetition
/// shifted by the running end offset, until its span covers
/// `longer.span()`.
///
/// Repetition stops as soon as the span reaches the target; a final
/// partial cycle is never truncated, so the result may overshoot the
/// target by up to one cycle length.  Downstream players read "span" as
/// "at least this long", so the overshoot is deliberate.
///
/// Fails with [`Error::EmptySourceTimeline`] when `shorter` has no
/// content to repeat (repetition could never terminate).
pub fn align(shorter: &Timeline, longer: &Timeline) -> Result<Timeline, Error> {
    let cycle = shorter.span();
    if shorter.is_empty() || cycle <= 0.0 {
        return Err(Error::EmptySourceTimeline);
    }

    let target = longer.span();
    let mut extended = shorter.clone();
    let mut offset = cycle;

    while extended.span() < target {
        for ev in &shorter.events {
            extended.events.push(TimedEvent {
                start: ev.start + offset,
                duration: ev.duration,
                content: ev.content.clone(),
            });
        }
        offset += cycle;
    }

    Ok(extended)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{build_chord_timeline, EventContent};

    fn chords(symbols: &[&str], step: f64) -> Timeline {
        let progression: Vec<String> = symbols.iter().map(|s| s.to_string()).collect();
        build_chord_timeline(&progression, step).unwrap()
    }

    fn melody_of_span(span: f64) -> Timeline {
        Timeline {
            events: vec![TimedEvent {
                start: 0.0,
                duration: span,
                content: EventContent::Note("C".to_string()),
            }],
        }
    }

    #[test]
    fn repeats_until_target_covered() {
        // 2-chord cycle of span 4 against a 10-beat melody: 3 cycles (span 12)
        let shorter = chords(&["C", "G"], 2.0);
        let longer = melody_of_span(10.0);

        let extended = align(&shorter, &longer).unwrap();
        assert_eq!(extended.events.len(), 6);
        assert!(extended.span() >= longer.span());
        assert!(extended.span() < longer.span() + shorter.span());

        // Repetitions are shifted by the running end offset
        let starts: Vec<f64> = extended.events.iter().map(|e| e.start).collect();
        assert_eq!(starts, vec![0.0, 2.0, 4.0, 6.0, 8.0, 10.0]);
    }

    #[test]
    fn already_long_enough_is_returned_unchanged() {
        let shorter = chords(&["C", "Am", "F", "G"], 2.0); // span 8
        let longer = melody_of_span(6.0);

        let extended = align(&shorter, &longer).unwrap();
        assert_eq!(extended.events.len(), shorter.events.len());
        assert_eq!(extended.span(), 8.0);
    }

    #[test]
    fn empty_source_is_rejected() {
        let longer = melody_of_span(4.0);
        assert_eq!(
            align(&Timeline::new(), &longer).unwrap_err(),
            Error::EmptySourceTimeline
        );
    }

    #[test]
    fn empty_target_needs_no_extension() {
        let shorter = chords(&["C"], 2.0);
        let extended = align(&shorter, &Timeline::new()).unwrap();
        assert_eq!(extended.events.len(), 1);
    }

    #[test]
    fn overshoot_is_bounded_by_one_cycle() {
        let shorter = chords(&["C", "G", "Am"], 1.0); // cycle 3
        for target in [1.0_f64, 2.5, 3.0, 3.1, 7.0, 11.9] {
            let longer = melody_of_span(target);
            let extended = align(&shorter, &longer).unwrap();
            assert!(extended.span() >= target, "span {} < target {}", extended.span(), target);
            assert!(
                extended.span() < target + 3.0,
                "span {} overshoots target {} by a full cycle",
                extended.span(),
                target
            );
        }
    }
}
