use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{wav::WAV_EXTENSION, BeatSynthError, Result, SampleFormat};

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub beats: BeatRunConfig,
    pub processing: StrokeProcessing,
    pub augment: AugmentSettings,
}

impl AppConfig {
    /// Reads a JSON configuration file. Missing fields fall back to defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                BeatSynthError::NotFound(path.to_path_buf())
            } else {
                err.into()
            }
        })?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn validate(&self) -> Result<()> {
        self.beats.validate()?;
        self.processing.validate()?;
        self.augment.validate()
    }
}

/// How the silent canvas under a beat is sized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanvasSizing {
    /// `max(offset[k] + len(stroke[k]))`; never cuts a stroke short.
    #[default]
    EnclosingAllStrokes,
    /// `offset[last] + max(len(stroke[k]))`. An early stroke longer than the
    /// grid span is truncated.
    LastOffsetPlusLongest,
}

/// Tunables of the per-stroke processing chain and of beat layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StrokeProcessing {
    /// Trailing fade-out window in milliseconds.
    pub fade_ms: f64,
    /// Gain applied after the fade, in decibels.
    pub gain_db: f32,
    /// Distance below full scale that peak normalisation targets.
    pub normalize_headroom_db: f32,
    /// Strokes sampled, without replacement, for each beat.
    pub strokes_per_beat: usize,
    pub canvas: CanvasSizing,
}

impl Default for StrokeProcessing {
    fn default() -> Self {
        Self {
            fade_ms: 100.0,
            gain_db: 3.0,
            normalize_headroom_db: 0.0,
            strokes_per_beat: 4,
            canvas: CanvasSizing::default(),
        }
    }
}

impl StrokeProcessing {
    pub fn validate(&self) -> Result<()> {
        if !self.fade_ms.is_finite() || self.fade_ms < 0.0 {
            return Err(BeatSynthError::invalid_config(format!(
                "fade_ms must be a non-negative number, got {}",
                self.fade_ms
            )));
        }
        if !self.gain_db.is_finite() || !self.normalize_headroom_db.is_finite() {
            return Err(BeatSynthError::invalid_config(
                "gain_db and normalize_headroom_db must be finite",
            ));
        }
        if self.strokes_per_beat == 0 {
            return Err(BeatSynthError::invalid_config(
                "strokes_per_beat must be positive",
            ));
        }
        Ok(())
    }
}

/// Parameters of one beat-generation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BeatRunConfig {
    pub source_dir: PathBuf,
    pub output_dir: PathBuf,
    pub bpm: u32,
    pub num_beats: usize,
    /// Extension (without the dot) that marks a stroke file.
    pub extension: String,
    /// Sort the stroke pool by file name so seeded runs reproduce across
    /// platforms.
    pub sort_pool: bool,
    /// Fixed seed. `None` draws one from the OS at run start.
    pub seed: Option<u64>,
    /// Worker threads; 1 composes beats on the calling thread.
    pub jobs: usize,
    pub format: SampleFormat,
}

impl Default for BeatRunConfig {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("."),
            output_dir: PathBuf::from("synthetic_beats"),
            bpm: 60,
            num_beats: 50,
            extension: WAV_EXTENSION.to_string(),
            sort_pool: true,
            seed: None,
            jobs: 1,
            format: SampleFormat::default(),
        }
    }
}

impl BeatRunConfig {
    pub fn validate(&self) -> Result<()> {
        if self.bpm == 0 {
            return Err(BeatSynthError::invalid_config("bpm must be positive"));
        }
        if self.num_beats == 0 {
            return Err(BeatSynthError::invalid_config("num_beats must be positive"));
        }
        if self.jobs == 0 {
            return Err(BeatSynthError::invalid_config("jobs must be positive"));
        }
        if self.extension.trim_start_matches('.').is_empty() {
            return Err(BeatSynthError::invalid_config("extension must not be empty"));
        }
        Ok(())
    }
}

/// Which augmentation preset to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AugmentMode {
    /// Four transforms, one output folder per transform, native sample rate.
    #[default]
    Standard,
    /// Six transforms written into a single folder at 48 kHz.
    Extended,
}

/// Parameters of an augmentation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AugmentSettings {
    pub source_dir: PathBuf,
    pub mode: AugmentMode,
    pub seed: Option<u64>,
    pub jobs: usize,
    pub format: SampleFormat,
}

impl Default for AugmentSettings {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("."),
            mode: AugmentMode::default(),
            seed: None,
            jobs: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            format: SampleFormat::default(),
        }
    }
}

impl AugmentSettings {
    pub fn validate(&self) -> Result<()> {
        if self.jobs == 0 {
            return Err(BeatSynthError::invalid_config("jobs must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_run() {
        let config = AppConfig::default();
        assert_eq!(config.beats.bpm, 60);
        assert_eq!(config.beats.num_beats, 50);
        assert_eq!(config.beats.output_dir, PathBuf::from("synthetic_beats"));
        assert_eq!(config.processing.strokes_per_beat, 4);
        assert_eq!(config.processing.gain_db, 3.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{ "beats": { "bpm": 120 }, "processing": { "canvas": "last_offset_plus_longest" } }"#)
                .unwrap();

        assert_eq!(config.beats.bpm, 120);
        assert_eq!(config.beats.num_beats, 50);
        assert_eq!(config.processing.canvas, CanvasSizing::LastOffsetPlusLongest);
        assert_eq!(config.processing.fade_ms, 100.0);
    }

    #[test]
    fn rejects_non_positive_values() {
        let mut beats = BeatRunConfig::default();
        beats.bpm = 0;
        assert!(matches!(
            beats.validate(),
            Err(BeatSynthError::InvalidConfig(_))
        ));

        let mut beats = BeatRunConfig::default();
        beats.num_beats = 0;
        assert!(beats.validate().is_err());

        let processing = StrokeProcessing {
            fade_ms: -1.0,
            ..Default::default()
        };
        assert!(processing.validate().is_err());
    }

    #[test]
    fn loads_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "augment": { "mode": "extended", "jobs": 2 } }"#).unwrap();

        let config = AppConfig::from_json_file(&path).unwrap();
        assert_eq!(config.augment.mode, AugmentMode::Extended);
        assert_eq!(config.augment.jobs, 2);

        let missing = AppConfig::from_json_file(&dir.path().join("missing.json"));
        assert!(matches!(missing, Err(BeatSynthError::NotFound(_))));
    }
}
