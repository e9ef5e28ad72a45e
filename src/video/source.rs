use std::collections::VecDeque;
use std::path::Path;

use crate::error::Result;
use crate::video::types::Frame;

/// An open video whose frames can be pulled in presentation order
///
/// Dropping a source releases whatever it holds (child process, decoder
/// contexts, file handles). Implementations must make that release happen
/// exactly once, whether the stream was drained or abandoned on an error.
pub trait FrameSource {
    /// (width, height) of every frame this source yields
    fn dimensions(&self) -> (u32, u32);

    /// Next frame, or `Ok(None)` once the stream is exhausted
    fn next_frame(&mut self) -> Result<Option<Frame>>;
}

/// Opens frame sources for video paths
///
/// Shared by every job in a batch, so it must be usable from many threads.
pub trait FrameSourceOpener: Send + Sync {
    fn open(&self, path: &Path) -> Result<Box<dyn FrameSource>>;
}

impl<F> FrameSourceOpener for F
where
    F: Fn(&Path) -> Result<Box<dyn FrameSource>> + Send + Sync,
{
    fn open(&self, path: &Path) -> Result<Box<dyn FrameSource>> {
        self(path)
    }
}

/// Iterator adapter that owns a source and drops it as soon as the stream
/// ends or fails
pub struct FrameIter {
    source: Option<Box<dyn FrameSource>>,
}

impl FrameIter {
    pub fn new(source: Box<dyn FrameSource>) -> Self {
        Self { source: Some(source) }
    }
}

impl Iterator for FrameIter {
    type Item = Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        let source = self.source.as_mut()?;
        match source.next_frame() {
            Ok(Some(frame)) => Some(Ok(frame)),
            Ok(None) => {
                self.source = None;
                None
            }
            Err(e) => {
                self.source = None;
                Some(Err(e))
            }
        }
    }
}

/// Frame source backed by frames already in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryFrameSource {
    frames: VecDeque<Frame>,
    dimensions: (u32, u32),
}

impl MemoryFrameSource {
    pub fn new(frames: Vec<Frame>) -> Self {
        let dimensions = frames.first().map(Frame::dimensions).unwrap_or((0, 0));
        Self {
            frames: frames.into(),
            dimensions,
        }
    }

    /// A source of solid-color frames, one per entry in `colors`
    pub fn solid(width: u32, height: u32, colors: &[[u8; 3]]) -> Self {
        Self::new(
            colors
                .iter()
                .map(|&color| Frame::new_filled(width, height, color))
                .collect(),
        )
    }
}

impl FrameSource for MemoryFrameSource {
    fn dimensions(&self) -> (u32, u32) {
        self.dimensions
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        Ok(self.frames.pop_front())
    }
}
