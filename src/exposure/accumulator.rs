use rayon::prelude::*;
use tracing::debug;

use crate::error::{AccumulateError, Result};
use crate::exposure::mode::Mode;
use crate::video::types::Frame;

/// Bytes handed to one rayon task per update
const CHUNK_BYTES: usize = 64 * 1024;

/// Running per-pixel extremum over a stream of frames
///
/// The first frame becomes the composite; each later frame is folded in
/// with the mode's reducer. Only the composite and the frame being folded
/// are alive at any time.
pub struct ExtremumAccumulator {
    mode: Mode,
    reduce: fn(u8, u8) -> u8,
    composite: Option<Frame>,
    frames_seen: u64,
}

impl ExtremumAccumulator {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            reduce: mode.reducer(),
            composite: None,
            frames_seen: 0,
        }
    }

    pub fn frames_seen(&self) -> u64 {
        self.frames_seen
    }

    /// The composite so far, `None` before the first frame
    pub fn current(&self) -> Option<&Frame> {
        self.composite.as_ref()
    }

    /// Fold one frame into the composite
    pub fn push(&mut self, frame: Frame) -> Result<()> {
        let Some(composite) = self.composite.as_mut() else {
            self.composite = Some(frame);
            self.frames_seen = 1;
            return Ok(());
        };

        if frame.dimensions() != composite.dimensions() {
            return Err(AccumulateError::ShapeMismatch {
                expected: composite.dimensions(),
                found: frame.dimensions(),
                frame_index: self.frames_seen,
            }
            .into());
        }

        let reduce = self.reduce;
        let acc: &mut [u8] = composite.as_image_mut();
        acc.par_chunks_mut(CHUNK_BYTES)
            .zip(frame.as_raw().par_chunks(CHUNK_BYTES))
            .for_each(|(acc, px)| {
                for (a, &p) in acc.iter_mut().zip(px) {
                    *a = reduce(*a, p);
                }
            });

        self.frames_seen += 1;
        Ok(())
    }

    /// Finalize the composite
    pub fn finish(self) -> Result<Frame> {
        debug!("{} composite finished after {} frames", self.mode, self.frames_seen);
        self.composite.ok_or_else(|| AccumulateError::EmptyStream.into())
    }
}

/// Reduce a whole frame stream to its light or dark composite
///
/// The stream is consumed once. Errors yielded by the stream abort the
/// accumulation and are returned as-is.
pub fn accumulate<I>(frames: I, mode: Mode) -> Result<Frame>
where
    I: IntoIterator<Item = Result<Frame>>,
{
    let mut accumulator = ExtremumAccumulator::new(mode);
    for frame in frames {
        accumulator.push(frame?)?;
    }
    accumulator.finish()
}
