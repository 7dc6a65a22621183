use std::path::{Path, PathBuf};

use crate::{wav, AudioClip, Result, SampleFormat};

/// Writes finished clips into an output directory. Files with the same name
/// are replaced without warning.
#[derive(Debug, Clone)]
pub struct OutputSink {
    dir: PathBuf,
    format: SampleFormat,
}

impl OutputSink {
    pub fn new(dir: impl Into<PathBuf>, format: SampleFormat) -> Self {
        Self {
            dir: dir.into(),
            format,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Creates the directory and its parents. Succeeds if it already exists.
    pub fn ensure_dir(&self) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        Ok(())
    }

    /// Writes `clip` as `<dir>/<file_name>` and returns the full path.
    pub fn export(&self, clip: &AudioClip, file_name: &str) -> Result<PathBuf> {
        self.ensure_dir()?;
        let path = self.dir.join(file_name);
        wav::save(clip, &path, self.format)?;
        Ok(path)
    }

    /// `synthetic_beat_<index + 1>.<extension>`
    pub fn beat_file_name(index: usize, extension: &str) -> String {
        format!(
            "synthetic_beat_{}.{}",
            index + 1,
            extension.trim_start_matches('.')
        )
    }
}
