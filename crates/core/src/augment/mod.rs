//! Dataset augmentation: every source file is run through a fixed list of
//! transforms and each result is written next to the dataset.

use std::{
    io,
    path::{Path, PathBuf},
};

use rand::{rngs::StdRng, Rng, SeedableRng};
use walkdir::WalkDir;

use crate::{
    batch::{item_seeds, resolve_seed, run_indexed, CancelToken},
    dsp::{self, CompressorSettings},
    wav::{self, has_extension, WAV_EXTENSION},
    AudioClip, AugmentMode, AugmentSettings, BeatSynthError, OutputSink, PhaseVocoder, Result,
    SampleFormat, StrokePool,
};

/// Sample rate the extended preset loads every file at.
pub const EXTENDED_SAMPLE_RATE: u32 = 48_000;
const DATASET_DIR: &str = "dataset";

/// A single signal transform.
#[derive(Debug, Clone, PartialEq)]
pub enum Augmentation {
    TimeStretch { rate: f32 },
    PitchShift { semitones: f32 },
    AddNoise { level: f32 },
    ChangeVolume { gain: f32 },
    CompressDynamicRange(CompressorSettings),
    Reverb { coef: f32 },
    BandPass { low_hz: f32, high_hz: f32, order: usize },
}

impl Augmentation {
    /// Tag appended to output file names and folder names.
    pub fn suffix(&self) -> &'static str {
        match self {
            Augmentation::TimeStretch { .. } => "time_stretch",
            Augmentation::PitchShift { .. } => "pitch_shift",
            Augmentation::AddNoise { .. } => "add_noise",
            Augmentation::ChangeVolume { .. } => "change_volume",
            Augmentation::CompressDynamicRange(_) => "compress_dynamic_range",
            Augmentation::Reverb { .. } => "add_reverb",
            Augmentation::BandPass { .. } => "bandpass_filter",
        }
    }

    pub fn apply<R: Rng + ?Sized>(
        &self,
        clip: &AudioClip,
        vocoder: &mut PhaseVocoder,
        rng: &mut R,
    ) -> Result<AudioClip> {
        let rate = clip.sample_rate();
        let samples = match self {
            Augmentation::TimeStretch { rate: stretch } => {
                vocoder.time_stretch(clip.samples(), *stretch)?
            }
            Augmentation::PitchShift { semitones } => {
                vocoder.pitch_shift(clip.samples(), *semitones)?
            }
            Augmentation::AddNoise { level } => dsp::add_noise(clip.samples(), *level, rng),
            Augmentation::ChangeVolume { gain } => return Ok(clip.scale(*gain)),
            Augmentation::CompressDynamicRange(settings) => {
                dsp::compress(clip.samples(), rate, settings)?
            }
            Augmentation::Reverb { coef } => dsp::preemphasis(clip.samples(), *coef),
            Augmentation::BandPass {
                low_hz,
                high_hz,
                order,
            } => dsp::band_pass(clip.samples(), rate, *low_hz, *high_hz, *order)?,
        };
        AudioClip::new(samples, rate)
    }
}

/// Where augmented files land.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputLayout {
    /// `<root>/dataset_<suffix>/<stem>_<suffix>.<ext>`
    PerAugmentation { root: PathBuf },
    /// `<dir>/<stem>_<suffix>.<ext>`
    Flat { dir: PathBuf },
}

impl OutputLayout {
    pub fn dir_for(&self, augmentation: &Augmentation) -> PathBuf {
        match self {
            OutputLayout::PerAugmentation { root } => {
                root.join(format!("{DATASET_DIR}_{}", augmentation.suffix()))
            }
            OutputLayout::Flat { dir } => dir.clone(),
        }
    }
}

/// Transforms to run, where to write them, and the load sample rate.
#[derive(Debug, Clone)]
pub struct AugmentPlan {
    pub augmentations: Vec<Augmentation>,
    pub layout: OutputLayout,
    /// Resample every input to this rate before transforming.
    pub sample_rate: Option<u32>,
}

impl AugmentPlan {
    /// Stretch, pitch, noise and volume, one folder per transform.
    pub fn standard(root: impl Into<PathBuf>) -> Self {
        Self {
            augmentations: vec![
                Augmentation::TimeStretch { rate: 1.1 },
                Augmentation::PitchShift { semitones: 2.0 },
                Augmentation::AddNoise { level: 0.002 },
                Augmentation::ChangeVolume { gain: 1.2 },
            ],
            layout: OutputLayout::PerAugmentation { root: root.into() },
            sample_rate: None,
        }
    }

    /// Stretch, pitch, noise, compression, reverb and band-pass, all written
    /// into one folder at 48 kHz.
    pub fn extended(dir: impl Into<PathBuf>) -> Self {
        Self {
            augmentations: vec![
                Augmentation::TimeStretch { rate: 1.1 },
                Augmentation::PitchShift { semitones: 2.0 },
                Augmentation::AddNoise { level: 0.002 },
                Augmentation::CompressDynamicRange(CompressorSettings::default()),
                Augmentation::Reverb { coef: 0.97 },
                Augmentation::BandPass {
                    low_hz: 300.0,
                    high_hz: 3_400.0,
                    order: 5,
                },
            ],
            layout: OutputLayout::Flat { dir: dir.into() },
            sample_rate: Some(EXTENDED_SAMPLE_RATE),
        }
    }
}

/// Outcome of an augmentation run.
#[derive(Debug, Clone)]
pub struct AugmentSummary {
    pub files_processed: usize,
    pub outputs_written: usize,
    pub seed: u64,
}

/// Copies every file with `extension` found under `root` into `dataset_dir`,
/// flattening the tree. The dataset folder itself and the per-transform
/// folders next to it are not descended into, so reruns do not pick up
/// earlier outputs.
pub fn collect_dataset(root: &Path, dataset_dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dataset_dir)?;
    let dataset_abs = dataset_dir.canonicalize()?;
    let prefix = format!("{DATASET_DIR}_");

    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| {
            if entry.depth() == 0 || !entry.file_type().is_dir() {
                return true;
            }
            let is_output_dir = entry
                .file_name()
                .to_str()
                .map(|name| name.starts_with(&prefix))
                .unwrap_or(false);
            let is_dataset = entry
                .path()
                .canonicalize()
                .map(|path| path == dataset_abs)
                .unwrap_or(false);
            !(is_output_dir || is_dataset)
        });

    let mut copied = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|err| {
            BeatSynthError::from(err.into_io_error().unwrap_or_else(|| {
                io::Error::new(io::ErrorKind::Other, "directory walk failed")
            }))
        })?;
        if !entry.file_type().is_file() || !has_extension(entry.path(), extension) {
            continue;
        }

        let destination = dataset_dir.join(entry.file_name());
        tracing::trace!(from = %entry.path().display(), to = %destination.display(), "collecting");
        std::fs::copy(entry.path(), &destination)?;
        copied.push(destination);
    }

    tracing::info!(count = copied.len(), dataset = %dataset_dir.display(), "collected dataset");
    Ok(copied)
}

/// Runs every transform of `plan` over `path` and writes the results.
pub fn augment_file<R: Rng + ?Sized>(
    path: &Path,
    plan: &AugmentPlan,
    format: SampleFormat,
    vocoder: &mut PhaseVocoder,
    rng: &mut R,
) -> Result<Vec<PathBuf>> {
    let clip = wav::load_at(path, plan.sample_rate)?;
    let stem = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .ok_or_else(|| BeatSynthError::msg(format!("`{}` has no usable file name", path.display())))?;
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or(WAV_EXTENSION);

    let mut written = Vec::with_capacity(plan.augmentations.len());
    for augmentation in &plan.augmentations {
        let augmented = augmentation.apply(&clip, vocoder, rng)?;
        let sink = OutputSink::new(plan.layout.dir_for(augmentation), format);
        let name = format!("{stem}_{}.{extension}", augmentation.suffix());
        written.push(sink.export(&augmented, &name)?);
    }

    tracing::debug!(path = %path.display(), outputs = written.len(), "augmented file");
    Ok(written)
}

/// Augments `files` on `jobs` workers. Each file gets its own generator
/// derived from the run seed.
pub fn augment_files(
    files: &[PathBuf],
    plan: &AugmentPlan,
    format: SampleFormat,
    jobs: usize,
    seed: Option<u64>,
    cancel: &CancelToken,
) -> Result<AugmentSummary> {
    let seed = resolve_seed(seed);
    let seeds = item_seeds(seed, files.len());
    tracing::info!(files = files.len(), transforms = plan.augmentations.len(), seed, "augmenting");

    let files_processed = run_indexed(jobs, files.len(), cancel, |index| {
        let mut rng = StdRng::seed_from_u64(seeds[index]);
        let mut vocoder = PhaseVocoder::new();
        augment_file(&files[index], plan, format, &mut vocoder, &mut rng)?;
        Ok(())
    })?;

    Ok(AugmentSummary {
        files_processed,
        outputs_written: files_processed * plan.augmentations.len(),
        seed,
    })
}

/// Full augmentation run as configured by `settings`.
///
/// Standard mode gathers every file under the source folder into
/// `<source>/dataset` and writes one folder per transform beside it.
/// Extended mode reads the source folder directly and writes into
/// `<parent of source>/dataset`.
pub fn run_augmentation(settings: &AugmentSettings, cancel: &CancelToken) -> Result<AugmentSummary> {
    settings.validate()?;
    let source = settings.source_dir.canonicalize().map_err(|err| {
        if err.kind() == io::ErrorKind::NotFound {
            BeatSynthError::NotFound(settings.source_dir.clone())
        } else {
            err.into()
        }
    })?;

    let (files, plan) = match settings.mode {
        AugmentMode::Standard => {
            let dataset = source.join(DATASET_DIR);
            collect_dataset(&source, &dataset, WAV_EXTENSION)?;
            let files = StrokePool::enumerate(&dataset, WAV_EXTENSION, true)?;
            (files, AugmentPlan::standard(&source))
        }
        AugmentMode::Extended => {
            let parent = source.parent().unwrap_or(source.as_path());
            let files = StrokePool::enumerate(&source, WAV_EXTENSION, true)?;
            (files, AugmentPlan::extended(parent.join(DATASET_DIR)))
        }
    };

    augment_files(
        files.strokes(),
        &plan,
        settings.format,
        settings.jobs,
        settings.seed,
        cancel,
    )
}
