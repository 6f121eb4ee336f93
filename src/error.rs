// THEORY:
// Every failure the engine can report lives here. The errors split along the
// same line the engine does:
// 1.  **Per-call errors** (`AnalysisError`) come out of the pure analysis stages.
//     They are deterministic, so the caller gets them straight back and nothing
//     retries.
// 2.  **Per-frame failures** (`FrameFailure`) are what halts a pipeline run. A
//     frame either could not be decoded by the external source or was handed to
//     the analyzer in a malformed state.
// 3.  **Job errors** (`JobError`) belong to the job control surface and cover
//     lookups and result persistence.
//
// A mask whose dimensions disagree with its frame is not listed: that can only
// happen through a bug, so the labeler asserts on it instead.

use thiserror::Error;

/// Errors raised synchronously by the color model, binarizer and frame analyzer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    #[error("invalid color {input:?}: expected six hex digits, optionally prefixed with '#'")]
    InvalidColor { input: String },

    #[error("invalid threshold {value}: must be finite and non-negative")]
    InvalidThreshold { value: f64 },

    #[error("malformed frame {width}x{height}: expected {expected_len} bytes, got {actual_len}")]
    MalformedFrame {
        width: u32,
        height: u32,
        expected_len: usize,
        actual_len: usize,
    },
}

/// An error surfaced by an external frame source. Opaque to the engine beyond
/// its message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("frame decode failed: {message}")]
pub struct FrameDecodeError {
    pub message: String,
}

impl FrameDecodeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<image::ImageError> for FrameDecodeError {
    fn from(err: image::ImageError) -> Self {
        Self::new(err.to_string())
    }
}

impl From<std::io::Error> for FrameDecodeError {
    fn from(err: std::io::Error) -> Self {
        Self::new(err.to_string())
    }
}

/// Why a single frame could not contribute to a pipeline result.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FrameFailure {
    #[error(transparent)]
    Decode(#[from] FrameDecodeError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}

impl FrameFailure {
    /// A stable name for the failure, suitable for status reports.
    pub fn kind(&self) -> &'static str {
        match self {
            FrameFailure::Decode(_) => "FrameDecodeError",
            FrameFailure::Analysis(AnalysisError::InvalidColor { .. }) => "InvalidColor",
            FrameFailure::Analysis(AnalysisError::InvalidThreshold { .. }) => "InvalidThreshold",
            FrameFailure::Analysis(AnalysisError::MalformedFrame { .. }) => "MalformedFrame",
        }
    }
}

/// Errors from the job control surface.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("no job with id {0}")]
    UnknownJob(String),

    #[error("no result at {0}")]
    UnknownLocator(String),

    #[error("job {0} has not finished yet")]
    StillRunning(String),

    #[error("failed to persist or read a result: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl From<AnalysisError> for ConfigError {
    fn from(err: AnalysisError) -> Self {
        ConfigError::Invalid(err.to_string())
    }
}
