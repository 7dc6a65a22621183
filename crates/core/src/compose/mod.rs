//! Synthetic beat composition.
//!
//! A beat is built from a handful of strokes drawn from a [`StrokePool`]
//! without replacement. Each stroke is faded, boosted and peak normalised,
//! then placed on a fixed tempo grid and mixed additively onto a silent
//! canvas that is long enough to hold every stroke in full.

use std::path::{Path, PathBuf};

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{
    audio::ms_to_samples,
    batch::{item_seeds, resolve_seed, run_indexed, CancelToken},
    wav, AudioClip, BeatRunConfig, BeatSynthError, CanvasSizing, OutputSink, Result,
    StrokePool, StrokeProcessing,
};

/// Fixed chain applied to every selected stroke before placement: fade-out,
/// saturating gain, then peak normalisation.
#[derive(Debug, Clone)]
pub struct StrokeProcessor {
    fade_ms: f64,
    gain_db: f32,
    headroom_db: f32,
}

impl StrokeProcessor {
    pub fn new(settings: &StrokeProcessing) -> Self {
        Self {
            fade_ms: settings.fade_ms,
            gain_db: settings.gain_db,
            headroom_db: settings.normalize_headroom_db,
        }
    }

    pub fn process(&self, clip: &AudioClip) -> AudioClip {
        clip.fade_out(self.fade_ms)
            .apply_gain(self.gain_db)
            .normalize(self.headroom_db)
    }
}

/// Evenly spaced placement grid derived from a tempo.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TempoGrid {
    interval_ms: f64,
}

impl TempoGrid {
    pub fn from_bpm(bpm: u32) -> Result<Self> {
        if bpm == 0 {
            return Err(BeatSynthError::invalid_config("bpm must be positive"));
        }
        Ok(Self {
            interval_ms: 60_000.0 / bpm as f64,
        })
    }

    /// Real-valued distance between consecutive strokes.
    pub fn interval_ms(&self) -> f64 {
        self.interval_ms
    }

    /// Start of slot `index`, truncated to whole milliseconds. Each slot is
    /// truncated independently, so the error never exceeds one millisecond.
    pub fn offset_ms(&self, index: usize) -> u64 {
        (index as f64 * self.interval_ms).floor() as u64
    }

    pub fn offsets_ms(&self, count: usize) -> Vec<u64> {
        (0..count).map(|index| self.offset_ms(index)).collect()
    }
}

/// One composed beat together with how it was put together.
#[derive(Debug, Clone)]
pub struct Beat {
    pub clip: AudioClip,
    pub strokes: Vec<PathBuf>,
    pub offsets_ms: Vec<u64>,
}

/// Builds beats from a shared, read-only stroke pool.
#[derive(Debug)]
pub struct BeatCompositor<'a> {
    pool: &'a StrokePool,
    processor: StrokeProcessor,
    grid: TempoGrid,
    strokes_per_beat: usize,
    canvas: CanvasSizing,
}

impl<'a> BeatCompositor<'a> {
    /// Validates the settings and checks up front that the pool can supply a
    /// full beat.
    pub fn new(pool: &'a StrokePool, bpm: u32, settings: &StrokeProcessing) -> Result<Self> {
        settings.validate()?;
        pool.ensure_at_least(settings.strokes_per_beat)?;
        Ok(Self {
            pool,
            processor: StrokeProcessor::new(settings),
            grid: TempoGrid::from_bpm(bpm)?,
            strokes_per_beat: settings.strokes_per_beat,
            canvas: settings.canvas,
        })
    }

    pub fn grid(&self) -> TempoGrid {
        self.grid
    }

    /// Draws the strokes for one beat, pairwise distinct.
    pub fn select<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Vec<&'a Path>> {
        self.pool.sample(rng, self.strokes_per_beat)
    }

    /// Selects, loads and processes strokes, then mixes them on the grid.
    pub fn compose<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Beat> {
        let selected = self.select(rng)?;
        let strokes = selected
            .iter()
            .map(|path| -> Result<AudioClip> { Ok(self.processor.process(&wav::load(path)?)) })
            .collect::<Result<Vec<_>>>()?;

        let clip = self.mix(&selected, &strokes)?;
        Ok(Beat {
            clip,
            strokes: selected.iter().map(|path| path.to_path_buf()).collect(),
            offsets_ms: self.grid.offsets_ms(strokes.len()),
        })
    }

    /// Places already processed strokes on the grid. `sources` names each
    /// stroke for error reporting.
    pub fn mix(&self, sources: &[&Path], strokes: &[AudioClip]) -> Result<AudioClip> {
        let Some(first) = strokes.first() else {
            return Err(BeatSynthError::msg("a beat needs at least one stroke"));
        };
        let sample_rate = first.sample_rate();
        if let Some((index, stroke)) = strokes
            .iter()
            .enumerate()
            .find(|(_, stroke)| stroke.sample_rate() != sample_rate)
        {
            return Err(BeatSynthError::SampleRateMismatch {
                expected: sample_rate,
                found: stroke.sample_rate(),
                path: sources
                    .get(index)
                    .map(|path| path.to_path_buf())
                    .unwrap_or_default(),
            });
        }

        let offsets: Vec<usize> = self
            .grid
            .offsets_ms(strokes.len())
            .into_iter()
            .map(|ms| ms_to_samples(ms, sample_rate))
            .collect();
        let len = canvas_len(self.canvas, &offsets, strokes);

        let mut canvas = AudioClip::silent_samples(len, sample_rate)?;
        for (stroke, offset) in strokes.iter().zip(offsets) {
            canvas = canvas.overlay_at(stroke, offset)?;
        }
        Ok(canvas.clamped())
    }
}

/// Canvas length in samples for strokes starting at `offsets`.
pub fn canvas_len(sizing: CanvasSizing, offsets: &[usize], strokes: &[AudioClip]) -> usize {
    match sizing {
        CanvasSizing::EnclosingAllStrokes => offsets
            .iter()
            .zip(strokes)
            .map(|(offset, stroke)| offset + stroke.len())
            .max()
            .unwrap_or(0),
        CanvasSizing::LastOffsetPlusLongest => {
            offsets.last().copied().unwrap_or(0)
                + strokes.iter().map(AudioClip::len).max().unwrap_or(0)
        }
    }
}

/// Outcome of a finished beat-generation run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub beats_written: usize,
    pub output_dir: PathBuf,
    /// Seed that reproduces the run.
    pub seed: u64,
}

/// Generates `config.num_beats` beats and writes them as numbered files.
///
/// The pool size is checked before the output directory is touched. Beats
/// are independent, so with `jobs > 1` they are composed in parallel; each
/// beat draws from its own generator seeded from the run seed, which keeps
/// seeded runs identical regardless of scheduling. The first failure aborts
/// the run.
pub fn generate_beats(
    config: &BeatRunConfig,
    processing: &StrokeProcessing,
    cancel: &CancelToken,
) -> Result<RunSummary> {
    config.validate()?;
    let pool = StrokePool::enumerate(&config.source_dir, &config.extension, config.sort_pool)?;
    let compositor = BeatCompositor::new(&pool, config.bpm, processing)?;

    let sink = OutputSink::new(&config.output_dir, config.format);
    sink.ensure_dir()?;

    let seed = resolve_seed(config.seed);
    let seeds = item_seeds(seed, config.num_beats);
    tracing::info!(
        pool = pool.len(),
        bpm = config.bpm,
        beats = config.num_beats,
        seed,
        "generating synthetic beats"
    );

    let beats_written = run_indexed(config.jobs, config.num_beats, cancel, |index| {
        let mut rng = StdRng::seed_from_u64(seeds[index]);
        let beat = compositor.compose(&mut rng)?;
        let path = sink.export(&beat.clip, &OutputSink::beat_file_name(index, &config.extension))?;
        tracing::debug!(
            beat = index + 1,
            path = %path.display(),
            duration_ms = beat.clip.duration_ms(),
            strokes = ?beat.strokes,
            "wrote beat"
        );
        Ok(())
    })?;

    tracing::info!(
        beats = beats_written,
        output = %config.output_dir.display(),
        "synthetic beats have been created"
    );

    Ok(RunSummary {
        beats_written,
        output_dir: config.output_dir.clone(),
        seed,
    })
}
