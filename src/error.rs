use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the long-exposure library
#[derive(Error, Debug)]
pub enum ExposureError {
    #[error("Input error: {0}")]
    Input(#[from] InputError),

    #[error("Video error: {0}")]
    Video(#[from] VideoError),

    #[error("Accumulation error: {0}")]
    Accumulate(#[from] AccumulateError),

    #[error("Resize error: {0}")]
    Resize(#[from] ResizeError),

    #[error("Output error: {0}")]
    Output(#[from] OutputError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Generic error: {0}")]
    Generic(String),
}

/// Errors raised while validating the input designator
#[derive(Error, Debug)]
pub enum InputError {
    #[error("{} - is not a file", .path.display())]
    NotAFile { path: PathBuf },

    #[error("{} - is not a video", .path.display())]
    NotAVideo { path: PathBuf },

    #[error("Directory not found: {}", .path.display())]
    DirectoryNotFound { path: PathBuf },
}

/// Errors from the frame source collaborators
#[derive(Error, Debug)]
pub enum VideoError {
    #[error("Could not run {tool}: {reason}")]
    ToolNotFound { tool: String, reason: String },

    #[error("Failed to probe {}: {reason}", .path.display())]
    ProbeFailed { path: PathBuf, reason: String },

    #[error("No video stream found in {}", .path.display())]
    NoVideoStream { path: PathBuf },

    #[error("Video decoding failed for {}: {reason}", .path.display())]
    DecodingFailed { path: PathBuf, reason: String },
}

/// Errors from the extremum accumulator
#[derive(Error, Debug)]
pub enum AccumulateError {
    #[error("Frame stream yielded no frames")]
    EmptyStream,

    #[error(
        "Frame {frame_index} is {}x{}, expected {}x{}",
        .found.0, .found.1, .expected.0, .expected.1
    )]
    ShapeMismatch {
        expected: (u32, u32),
        found: (u32, u32),
        frame_index: u64,
    },
}

/// Errors from the resizer
#[derive(Error, Debug)]
pub enum ResizeError {
    #[error("Invalid target size: {size} (must be positive)")]
    InvalidSize { size: u32 },
}

/// Errors from encoding and writing composites
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Image encoding failed: {reason}")]
    Encode { reason: String },

    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration file {path}: {reason}")]
    ParseFailed { path: String, reason: String },

    #[error("Invalid configuration value: {key} = {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },
}

/// Convenience type alias for Results using ExposureError
pub type Result<T> = std::result::Result<T, ExposureError>;

impl ExposureError {
    /// Create a generic error with a custom message
    pub fn generic<S: Into<String>>(message: S) -> Self {
        Self::Generic(message.into())
    }

    /// Fatal errors abort a run before any job starts; everything else
    /// only abandons the job that raised it.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Input(_) | Self::Config(_))
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Input(InputError::NotAVideo { path }) => {
                format!("'{}' does not look like a video file.", path.display())
            }
            Self::Video(VideoError::ToolNotFound { tool, .. }) => {
                format!("'{}' could not be started. Please install FFmpeg and make sure it is on PATH.", tool)
            }
            Self::Config(ConfigError::FileNotFound { path }) => {
                format!("Configuration file '{}' not found.", path)
            }
            _ => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_errors_are_fatal() {
        let err: ExposureError = InputError::DirectoryNotFound { path: "nope".into() }.into();
        assert!(err.is_fatal());

        let err: ExposureError = AccumulateError::EmptyStream.into();
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_shape_mismatch_message() {
        let err = AccumulateError::ShapeMismatch {
            expected: (640, 480),
            found: (320, 240),
            frame_index: 7,
        };
        assert_eq!(err.to_string(), "Frame 7 is 320x240, expected 640x480");
    }
}
