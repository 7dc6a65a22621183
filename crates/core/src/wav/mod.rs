use std::{io, path::Path};

use hound::{WavReader, WavSpec, WavWriter};
use serde::{Deserialize, Serialize};

use crate::{AudioClip, BeatSynthError, Result};

/// File extension shared by strokes, beats and augmented files.
pub const WAV_EXTENSION: &str = "wav";

/// Sample encoding used when writing WAV files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleFormat {
    #[default]
    Pcm16,
    Pcm24,
    Float32,
}

impl SampleFormat {
    fn spec(self, sample_rate: u32) -> WavSpec {
        let (bits_per_sample, sample_format) = match self {
            SampleFormat::Pcm16 => (16, hound::SampleFormat::Int),
            SampleFormat::Pcm24 => (24, hound::SampleFormat::Int),
            SampleFormat::Float32 => (32, hound::SampleFormat::Float),
        };
        WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample,
            sample_format,
        }
    }
}

/// Loads a WAV file as a mono clip at its native sample rate. Multi-channel
/// files are downmixed by averaging each frame.
pub fn load(path: &Path) -> Result<AudioClip> {
    let mut reader = WavReader::open(path).map_err(|err| match err {
        hound::Error::IoError(io) if io.kind() == io::ErrorKind::NotFound => {
            BeatSynthError::NotFound(path.to_path_buf())
        }
        other => BeatSynthError::Wav(other),
    })?;
    let spec = reader.spec();

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<_, _>>()?,
        hound::SampleFormat::Int => {
            let max_val = (1_i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|s| s as f32 / max_val))
                .collect::<std::result::Result<_, _>>()?
        }
    };

    let channels = spec.channels.max(1) as usize;
    let samples = if channels == 1 {
        interleaved
    } else {
        interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect()
    };

    tracing::trace!(path = %path.display(), sample_rate = spec.sample_rate, len = samples.len(), "loaded wav");
    AudioClip::new(samples, spec.sample_rate)
}

/// Loads a WAV file and resamples it when `sample_rate` is given.
pub fn load_at(path: &Path, sample_rate: Option<u32>) -> Result<AudioClip> {
    let clip = load(path)?;
    match sample_rate {
        Some(rate) => clip.resample(rate),
        None => Ok(clip),
    }
}

/// Writes `clip` as a mono WAV file, replacing any existing file. Samples are
/// clamped to full scale on the way out.
pub fn save(clip: &AudioClip, path: &Path, format: SampleFormat) -> Result<()> {
    let mut writer = WavWriter::create(path, format.spec(clip.sample_rate()))?;

    for &sample in clip.samples() {
        let sample = sample.clamp(-1.0, 1.0);
        match format {
            SampleFormat::Pcm16 => writer.write_sample((sample * i16::MAX as f32) as i16)?,
            SampleFormat::Pcm24 => writer.write_sample((sample * 8_388_607.0) as i32)?,
            SampleFormat::Float32 => writer.write_sample(sample)?,
        }
    }

    writer.finalize()?;
    Ok(())
}

/// Returns true when `path` carries the expected extension. The comparison is
/// case-sensitive.
pub fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext == extension.trim_start_matches('.'))
        .unwrap_or(false)
}
