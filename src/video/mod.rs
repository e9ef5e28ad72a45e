//! # Video Module
//!
//! Frame types, media type detection and the frame sources that pull
//! decoded frames out of video files.

use std::sync::Arc;

use tracing::debug;

use crate::config::{DecoderBackend, DecoderConfig};
use crate::error::Result;

pub mod detect;
pub mod ffmpeg_cli;
#[cfg(feature = "ffmpeg")]
pub mod ffmpeg_lib;
pub mod source;
pub mod types;

pub use detect::{guess_kind, guess_mime, is_video, MediaKind};
pub use ffmpeg_cli::FfmpegCliOpener;
#[cfg(feature = "ffmpeg")]
pub use ffmpeg_lib::FfmpegLibOpener;
pub use source::{FrameIter, FrameSource, FrameSourceOpener, MemoryFrameSource};
pub use types::Frame;

/// Build the frame source opener selected by the decoder configuration
pub fn opener_from_config(config: &DecoderConfig) -> Result<Arc<dyn FrameSourceOpener>> {
    match config.backend {
        DecoderBackend::Cli => {
            debug!("Using ffmpeg executables: {} / {}", config.ffmpeg, config.ffprobe);
            Ok(Arc::new(FfmpegCliOpener::from_config(config)))
        }
        #[cfg(feature = "ffmpeg")]
        DecoderBackend::Library => {
            debug!("Using linked FFmpeg libraries");
            Ok(Arc::new(FfmpegLibOpener::new()))
        }
        #[cfg(not(feature = "ffmpeg"))]
        DecoderBackend::Library => Err(crate::error::ConfigError::InvalidValue {
            key: "decoder.backend".to_string(),
            value: "library (built without the `ffmpeg` feature)".to_string(),
        }
        .into()),
    }
}
