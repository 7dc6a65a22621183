use std::{
    f32::consts::PI,
    fs,
    path::{Path, PathBuf},
};

use beat_synth_core::{
    generate_beats, wav, AudioClip, BeatRunConfig, BeatSynthError, CancelToken, SampleFormat,
    StrokeProcessing,
};

const RATE: u32 = 8_000;

fn write_stroke(dir: &Path, name: &str, freq: f32, rate: u32, len: usize) {
    let samples = (0..len)
        .map(|i| {
            let t = i as f32 / rate as f32;
            (2.0 * PI * freq * t).sin() * (-6.0 * t).exp() * 0.4
        })
        .collect();
    let clip = AudioClip::new(samples, rate).unwrap();
    wav::save(&clip, &dir.join(name), SampleFormat::Pcm16).unwrap();
}

fn stroke_dir(count: usize) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    for i in 0..count {
        write_stroke(dir.path(), &format!("stroke_{i}.wav"), 110.0 * (i + 1) as f32, RATE, RATE as usize);
    }
    dir
}

fn config(source: &Path, output: PathBuf, num_beats: usize, seed: u64) -> BeatRunConfig {
    BeatRunConfig {
        source_dir: source.to_path_buf(),
        output_dir: output,
        bpm: 60,
        num_beats,
        seed: Some(seed),
        ..Default::default()
    }
}

fn listing(dir: &Path) -> Vec<String> {
    let mut names: Vec<_> = fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn writes_numbered_beats_of_expected_length() {
    let strokes = stroke_dir(5);
    let out = tempfile::tempdir().unwrap();
    let output = out.path().join("synthetic_beats");

    let summary = generate_beats(
        &config(strokes.path(), output.clone(), 2, 1),
        &StrokeProcessing::default(),
        &CancelToken::new(),
    )
    .unwrap();

    assert_eq!(summary.beats_written, 2);
    assert_eq!(listing(&output), ["synthetic_beat_1.wav", "synthetic_beat_2.wav"]);

    for name in listing(&output) {
        let beat = wav::load(&output.join(name)).unwrap();
        assert_eq!(beat.sample_rate(), RATE);
        assert!(beat.duration_ms() >= 4_000.0);
        assert!(beat.duration_ms() <= 4_010.0);
        assert!(beat.peak() > 0.9);
    }
}

#[test]
fn undersized_pool_fails_without_output() {
    let strokes = stroke_dir(3);
    let out = tempfile::tempdir().unwrap();
    let output = out.path().join("beats");

    let err = generate_beats(
        &config(strokes.path(), output.clone(), 2, 1),
        &StrokeProcessing::default(),
        &CancelToken::new(),
    )
    .unwrap_err();

    assert!(matches!(
        err,
        BeatSynthError::PoolTooSmall {
            available: 3,
            required: 4
        }
    ));
    assert!(!output.exists());
}

#[test]
fn seeded_runs_are_reproducible_across_job_counts() {
    let strokes = stroke_dir(8);
    let out = tempfile::tempdir().unwrap();
    let processing = StrokeProcessing::default();

    let first = config(strokes.path(), out.path().join("a"), 6, 42);
    let second = config(strokes.path(), out.path().join("b"), 6, 42);
    let parallel = BeatRunConfig {
        jobs: 3,
        ..config(strokes.path(), out.path().join("c"), 6, 42)
    };
    for run in [&first, &second, &parallel] {
        generate_beats(run, &processing, &CancelToken::new()).unwrap();
    }

    for name in listing(&first.output_dir) {
        let a = fs::read(first.output_dir.join(&name)).unwrap();
        assert_eq!(a, fs::read(second.output_dir.join(&name)).unwrap(), "{name}");
        assert_eq!(a, fs::read(parallel.output_dir.join(&name)).unwrap(), "{name}");
    }
}

#[test]
fn rerun_overwrites_existing_beats() {
    let strokes = stroke_dir(5);
    let out = tempfile::tempdir().unwrap();
    let output = out.path().join("beats");
    fs::create_dir_all(&output).unwrap();
    fs::write(output.join("synthetic_beat_1.wav"), b"stale").unwrap();

    let run = config(strokes.path(), output.clone(), 1, 7);
    generate_beats(&run, &StrokeProcessing::default(), &CancelToken::new()).unwrap();
    generate_beats(&run, &StrokeProcessing::default(), &CancelToken::new()).unwrap();

    assert_eq!(listing(&output), ["synthetic_beat_1.wav"]);
    assert!(wav::load(&output.join("synthetic_beat_1.wav")).is_ok());
}

#[test]
fn mixed_sample_rates_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    for (i, rate) in [RATE, RATE, RATE, 16_000].into_iter().enumerate() {
        write_stroke(dir.path(), &format!("s{i}.wav"), 220.0, rate, 400);
    }
    let out = tempfile::tempdir().unwrap();

    let err = generate_beats(
        &config(dir.path(), out.path().join("beats"), 1, 3),
        &StrokeProcessing::default(),
        &CancelToken::new(),
    )
    .unwrap_err();

    assert!(matches!(err, BeatSynthError::SampleRateMismatch { .. }));
}

#[test]
fn invalid_tempo_is_a_config_error() {
    let strokes = stroke_dir(4);
    let out = tempfile::tempdir().unwrap();
    let run = BeatRunConfig {
        bpm: 0,
        ..config(strokes.path(), out.path().join("beats"), 1, 3)
    };

    let err = generate_beats(&run, &StrokeProcessing::default(), &CancelToken::new()).unwrap_err();
    assert!(matches!(err, BeatSynthError::InvalidConfig(_)));
}

#[test]
fn cancelled_run_stops_before_first_beat() {
    let strokes = stroke_dir(4);
    let out = tempfile::tempdir().unwrap();
    let token = CancelToken::new();
    token.cancel();

    let err = generate_beats(
        &config(strokes.path(), out.path().join("beats"), 3, 3),
        &StrokeProcessing::default(),
        &token,
    )
    .unwrap_err();

    assert!(matches!(err, BeatSynthError::Cancelled { completed: 0 }));
    assert!(listing(&out.path().join("beats")).is_empty());
}
