use std::path::PathBuf;

/// Result alias that carries the custom [`BeatSynthError`] type.
pub type Result<T> = std::result::Result<T, BeatSynthError>;

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum BeatSynthError {
    /// The stroke pool holds fewer files than a single beat needs.
    #[error("stroke pool has {available} file(s) but each beat needs {required}")]
    PoolTooSmall { available: usize, required: usize },
    /// Strokes selected for the same beat were recorded at different rates.
    #[error("sample rate mismatch: expected {expected} Hz, `{}` is {found} Hz", .path.display())]
    SampleRateMismatch {
        expected: u32,
        found: u32,
        path: PathBuf,
    },
    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// A source directory or file does not exist.
    #[error("`{}` does not exist", .0.display())]
    NotFound(PathBuf),
    /// The run was stopped through its [`CancelToken`](crate::CancelToken).
    #[error("run cancelled after {completed} item(s)")]
    Cancelled { completed: usize },
    /// Free-form error for conditions that do not warrant their own variant.
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Errors raised while decoding or encoding WAV data.
    #[error("wav: {0}")]
    Wav(#[from] hound::Error),
    /// Errors raised while parsing a JSON configuration file.
    #[error("config file: {0}")]
    Json(#[from] serde_json::Error),
    /// Errors reported by the FFT backend.
    #[error("fft: {0}")]
    Fft(#[from] realfft::FftError),
}

impl BeatSynthError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }

    pub fn invalid_config<T: Into<String>>(msg: T) -> Self {
        Self::InvalidConfig(msg.into())
    }
}

impl From<&str> for BeatSynthError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for BeatSynthError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
