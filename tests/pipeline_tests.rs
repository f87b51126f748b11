//! End-to-end tests: detections + mood in, timelines and SMF bytes out.

use tunelib::{
    compose, compose_to_midi_file, compose_with_selector, composition_to_json,
    composition_to_midi_bytes, ComposeOptions, Detection, Error, EventContent, MusicConfig,
    RandomCandidate,
};

const IMAGE_WIDTH: f64 = 640.0;

fn det(label: &str, x_min: f64, x_max: f64, confidence: f64) -> Detection {
    Detection {
        label: label.to_string(),
        bbox: (x_min, 40.0, x_max, 420.0),
        confidence,
    }
}

fn park_scene() -> Vec<Detection> {
    vec![
        det("tree", 20.0, 220.0, 0.94),
        det("bird", 250.0, 300.0, 0.88),
        det("river", 320.0, 520.0, 0.91),
    ]
}

#[test]
fn scene_composes_to_a_two_track_file() {
    let config = MusicConfig::default();
    let options = ComposeOptions::default();

    let music = compose(&park_scene(), IMAGE_WIDTH, "serene", &config, &options).unwrap();

    // Serene progression: three chords, 2 beats each
    assert_eq!(music.chords.events.len(), 3);
    assert_eq!(music.chords.span(), 6.0);
    assert_eq!(music.melody.events.len(), 3);

    // First-candidate policy: tree → G
    assert_eq!(
        music.melody.sorted_events()[0].content,
        EventContent::Note("G".to_string())
    );

    let bytes = composition_to_midi_bytes(&music, &options).unwrap();
    assert_eq!(&bytes[0..4], b"MThd");
    let track_count = u16::from_be_bytes([bytes[10], bytes[11]]);
    assert_eq!(track_count, 2);
    println!("✓ park scene → {} bytes, {} tracks", bytes.len(), track_count);
}

#[test]
fn identical_scenes_produce_identical_bytes() {
    let config = MusicConfig::default();
    let options = ComposeOptions::default();

    let first = {
        let music = compose(&park_scene(), IMAGE_WIDTH, "serene", &config, &options).unwrap();
        composition_to_midi_bytes(&music, &options).unwrap()
    };
    let second = {
        let music = compose(&park_scene(), IMAGE_WIDTH, "serene", &config, &options).unwrap();
        composition_to_midi_bytes(&music, &options).unwrap()
    };
    assert_eq!(first, second);
    println!("✓ reproducibility: {} identical bytes", first.len());
}

#[test]
fn seeded_selection_is_reproducible_end_to_end() {
    let mut config = MusicConfig::default();
    config.label_pitches.insert(
        "tree".to_string(),
        vec!["C".to_string(), "E".to_string(), "G".to_string()],
    );
    let options = ComposeOptions::default();

    let run = |seed: u64| {
        let mut selector = RandomCandidate::with_seed(seed);
        let music = compose_with_selector(
            &park_scene(),
            IMAGE_WIDTH,
            "serene",
            &config,
            &options,
            &mut selector,
        )
        .unwrap();
        composition_to_midi_bytes(&music, &options).unwrap()
    };

    assert_eq!(run(42), run(42));
    println!("✓ seeded selection stable across runs");
}

#[test]
fn unrecognized_mood_uses_the_default_progression() {
    let config = MusicConfig::default();
    let options = ComposeOptions::default();

    let fallback = compose(&park_scene(), IMAGE_WIDTH, "marine", &config, &options).unwrap();
    let serene = compose(&park_scene(), IMAGE_WIDTH, "serene", &config, &options).unwrap();

    assert_eq!(
        composition_to_midi_bytes(&fallback, &options).unwrap(),
        composition_to_midi_bytes(&serene, &options).unwrap()
    );
    println!("✓ unknown mood fell back to the default progression");
}

#[test]
fn empty_scene_still_produces_a_valid_file() {
    let config = MusicConfig::default();
    let options = ComposeOptions::default();

    let music = compose(&[], IMAGE_WIDTH, "house", &config, &options).unwrap();
    assert!(music.melody.is_empty());
    assert_eq!(music.chords.events.len(), 4); // house progression

    let bytes = composition_to_midi_bytes(&music, &options).unwrap();
    assert_eq!(&bytes[0..4], b"MThd");
    println!("✓ empty scene: chords only, {} bytes", bytes.len());
}

#[test]
fn melody_overrunning_the_progression_extends_the_chords() {
    // A wide detection near the right edge pushes the melody past the
    // 6-beat serene progression.
    let detections = vec![det("river", 400.0, 640.0, 0.9)];
    let config = MusicConfig::default();
    let options = ComposeOptions::default();

    let music = compose(&detections, IMAGE_WIDTH, "serene", &config, &options).unwrap();

    // start = (520/640)·6 = 4.875, duration = (240/640)·6 = 2.25 → span 7.125
    assert!(music.melody.span() > 6.0);
    assert!(music.chords.span() >= music.melody.span());
    assert!(music.chords.span() < music.melody.span() + 6.0);
    assert!(music.chords.events.len() > 3, "progression must repeat");
    println!(
        "✓ chords extended to {} beats to cover {} beats of melody",
        music.chords.span(),
        music.melody.span()
    );
}

#[test]
fn invalid_options_are_rejected_before_processing() {
    let config = MusicConfig::default();

    for options in [
        ComposeOptions {
            tempo_bpm: 0.0,
            ..ComposeOptions::default()
        },
        ComposeOptions {
            ticks_per_beat: 0,
            ..ComposeOptions::default()
        },
        ComposeOptions {
            chord_step_beats: -1.0,
            ..ComposeOptions::default()
        },
    ] {
        let err = compose(&park_scene(), IMAGE_WIDTH, "serene", &config, &options).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter(_)), "got {err}");
    }
    println!("✓ non-positive parameters rejected up front");
}

#[test]
fn compose_writes_a_playable_file() {
    let config = MusicConfig::default();
    let options = ComposeOptions::default();
    let path = "test_output/park-scene.mid";

    compose_to_midi_file(path, &park_scene(), IMAGE_WIDTH, "playful", &config, &options)
        .unwrap();

    let written = std::fs::read(path).unwrap();
    let music = compose(&park_scene(), IMAGE_WIDTH, "playful", &config, &options).unwrap();
    let expected = composition_to_midi_bytes(&music, &options).unwrap();
    assert_eq!(written, expected);
    println!("✓ wrote {} bytes → {}", written.len(), path);
}

#[test]
fn composition_serializes_to_json() {
    let config = MusicConfig::default();
    let options = ComposeOptions::default();
    let music = compose(&park_scene(), IMAGE_WIDTH, "urban", &config, &options).unwrap();

    let json = composition_to_json(&music).unwrap();
    assert!(json.contains("\"chords\""));
    assert!(json.contains("\"melody\""));
    println!("✓ composition JSON: {} chars", json.len());
}
