//! # long-exposure
//!
//! Build long-exposure style still images from videos.
//!
//! Every frame of a video is folded into a composite that keeps, per pixel
//! and channel, either the brightest value seen (light mode) or the darkest
//! (dark mode). Light trails, star trails and moving crowds come out the
//! way a very long camera exposure would show them.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use long_exposure::{
//!     composition::{CompositionEngine, InputTarget},
//!     config::Config,
//! };
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let mut config = Config::default();
//! config.processing.resize = Some(1080);
//!
//! let engine = CompositionEngine::from_config(config)?;
//! let report = engine
//!     .run(&InputTarget::Folder("night_clips/".into()))
//!     .await?;
//!
//! for output in report.outputs() {
//!     println!("wrote {}", output.display());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`video`] - Frame type, media detection and FFmpeg frame sources
//! - [`exposure`] - Extremum accumulation and composite resizing
//! - [`output`] - JPEG/PNG encoding with embedded EXIF tags
//! - [`composition`] - Input discovery and the concurrent batch driver
//! - [`config`] - Configuration management
//!
//! ## Custom Frame Sources
//!
//! Anything that can yield RGB frames can feed the accumulator by
//! implementing [`FrameSource`](video::FrameSource):
//!
//! ```rust
//! use long_exposure::exposure::{accumulate, Mode};
//! use long_exposure::video::{Frame, FrameIter, MemoryFrameSource};
//!
//! let source = MemoryFrameSource::solid(2, 2, &[[10, 10, 10], [200, 50, 5]]);
//! let light = accumulate(FrameIter::new(Box::new(source)), Mode::Light).unwrap();
//! assert_eq!(light.get_pixel(0, 0), [200, 50, 10]);
//! # let _: Frame = light;
//! ```

pub mod composition;
pub mod config;
pub mod error;
pub mod exposure;
pub mod output;
pub mod video;

// Re-export commonly used types for convenience
pub use crate::{
    composition::{BatchReport, CompositionEngine, InputTarget},
    config::Config,
    error::{ExposureError, Result},
    exposure::Mode,
};
