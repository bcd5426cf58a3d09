use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No video stream found in {}", .0.display())]
    NoVideoStream(PathBuf),

    #[error("No audio stream found in {}", .0.display())]
    NoAudioStream(PathBuf),

    #[error("{codec} codec in {extension} container is not supported: {}", path.display())]
    UnsupportedCodecInContainer {
        path: PathBuf,
        codec: String,
        extension: String,
    },

    #[error("{description} failed: {output}")]
    EncodeFailed { description: String, output: String },

    #[error("Probing {} failed: {detail}", path.display())]
    ProbeFailed { path: PathBuf, detail: String },

    #[error("Another convert process is running: {owner} (lock file {})", lock_file.display())]
    AlreadyRunning { owner: String, lock_file: PathBuf },

    #[error("{what} not found: {}", path.display())]
    PathNotFound { what: String, path: PathBuf },

    #[error("Routing failed for {failures} file(s): {first}")]
    RoutingFailed { failures: usize, first: String },

    #[error("Interrupted")]
    Interrupted,
}

/// Coarse classification of a [`ConvertError`], used for logging and
/// assertions where the payload does not matter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Io,
    Parse,
    Config,
    NoVideoStream,
    NoAudioStream,
    UnsupportedCodecInContainer,
    EncodeFailed,
    ProbeFailed,
    AlreadyRunning,
    PathNotFound,
    RoutingFailed,
    Interrupted,
}

impl ConvertError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConvertError::Io(_) => ErrorKind::Io,
            ConvertError::Json(_) | ConvertError::Toml(_) => ErrorKind::Parse,
            ConvertError::Config(_) => ErrorKind::Config,
            ConvertError::NoVideoStream(_) => ErrorKind::NoVideoStream,
            ConvertError::NoAudioStream(_) => ErrorKind::NoAudioStream,
            ConvertError::UnsupportedCodecInContainer { .. } => {
                ErrorKind::UnsupportedCodecInContainer
            }
            ConvertError::EncodeFailed { .. } => ErrorKind::EncodeFailed,
            ConvertError::ProbeFailed { .. } => ErrorKind::ProbeFailed,
            ConvertError::AlreadyRunning { .. } => ErrorKind::AlreadyRunning,
            ConvertError::PathNotFound { .. } => ErrorKind::PathNotFound,
            ConvertError::RoutingFailed { .. } => ErrorKind::RoutingFailed,
            ConvertError::Interrupted => ErrorKind::Interrupted,
        }
    }

    pub(crate) fn path_not_found<S: Into<String>>(what: S, path: impl Into<PathBuf>) -> Self {
        ConvertError::PathNotFound {
            what: what.into(),
            path: path.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ConvertError>;
