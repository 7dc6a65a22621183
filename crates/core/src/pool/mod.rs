use std::{
    io,
    path::{Path, PathBuf},
};

use rand::Rng;

use crate::{wav::has_extension, BeatSynthError, Result};

/// Candidate single-stroke files discovered in a source directory. The pool
/// is read-only once built and shared by every beat of a run.
#[derive(Debug, Clone, Default)]
pub struct StrokePool {
    strokes: Vec<PathBuf>,
}

impl StrokePool {
    /// Lists regular files in `directory` whose extension matches
    /// `extension`. Without `sort` the order is whatever the filesystem yields.
    pub fn enumerate(directory: &Path, extension: &str, sort: bool) -> Result<Self> {
        let entries = std::fs::read_dir(directory).map_err(|err| {
            if err.kind() == io::ErrorKind::NotFound {
                BeatSynthError::NotFound(directory.to_path_buf())
            } else {
                err.into()
            }
        })?;

        let mut strokes = Vec::new();
        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            if has_extension(&path, extension) && path.is_file() {
                strokes.push(path);
            }
        }

        if sort {
            strokes.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        }

        tracing::debug!(dir = %directory.display(), count = strokes.len(), "enumerated stroke pool");
        Ok(Self { strokes })
    }

    pub fn from_paths(strokes: Vec<PathBuf>) -> Self {
        Self { strokes }
    }

    pub fn strokes(&self) -> &[PathBuf] {
        &self.strokes
    }

    pub fn len(&self) -> usize {
        self.strokes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty()
    }

    /// Fails with [`BeatSynthError::PoolTooSmall`] when fewer than `required`
    /// strokes are available.
    pub fn ensure_at_least(&self, required: usize) -> Result<()> {
        if self.strokes.len() < required {
            return Err(BeatSynthError::PoolTooSmall {
                available: self.strokes.len(),
                required,
            });
        }
        Ok(())
    }

    /// Uniformly samples `amount` distinct strokes.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R, amount: usize) -> Result<Vec<&Path>> {
        self.ensure_at_least(amount)?;
        Ok(rand::seq::index::sample(rng, self.strokes.len(), amount)
            .into_iter()
            .map(|index| self.strokes[index].as_path())
            .collect())
    }
}
