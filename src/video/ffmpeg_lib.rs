//! In-process decoding through the FFmpeg libraries (`--features ffmpeg`).

use std::path::{Path, PathBuf};

use ffmpeg_next::{
    codec::context::Context as CodecContext,
    decoder::Video as VideoDecoder,
    format::{context::Input, Pixel},
    frame::Video as VideoFrame,
    media::Type,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
    util::error::EAGAIN,
    Error as FfmpegError, Packet,
};
use tracing::debug;

use crate::error::{Result, VideoError};
use crate::video::source::{FrameSource, FrameSourceOpener};
use crate::video::types::Frame;

/// Opens videos with `ffmpeg-next`, converting every frame to RGB24
#[derive(Debug, Clone, Copy, Default)]
pub struct FfmpegLibOpener;

impl FfmpegLibOpener {
    pub fn new() -> Self {
        Self
    }
}

impl FrameSourceOpener for FfmpegLibOpener {
    fn open(&self, path: &Path) -> Result<Box<dyn FrameSource>> {
        let fail = |reason: String| VideoError::DecodingFailed {
            path: path.to_path_buf(),
            reason,
        };

        // Safe to call more than once.
        ffmpeg_next::init().map_err(|e| fail(format!("FFmpeg initialisation failed: {e}")))?;

        let input = ffmpeg_next::format::input(&path).map_err(|e| fail(e.to_string()))?;

        let stream = input
            .streams()
            .best(Type::Video)
            .ok_or_else(|| VideoError::NoVideoStream {
                path: path.to_path_buf(),
            })?;
        let stream_index = stream.index();

        let decoder = CodecContext::from_parameters(stream.parameters())
            .and_then(|context| context.decoder().video())
            .map_err(|e| fail(e.to_string()))?;

        let (width, height) = (decoder.width(), decoder.height());
        let scaler = ScalingContext::get(
            decoder.format(),
            width,
            height,
            Pixel::RGB24,
            width,
            height,
            ScalingFlags::BILINEAR,
        )
        .map_err(|e| fail(e.to_string()))?;

        debug!("Opened {} with libavformat: {}x{}", path.display(), width, height);

        Ok(Box::new(FfmpegLibSource {
            path: path.to_path_buf(),
            input,
            decoder,
            scaler,
            stream_index,
            width,
            height,
            decoded: VideoFrame::empty(),
            rgb: VideoFrame::empty(),
            eof_sent: false,
        }))
    }
}

/// Decoder state for one open video; FFmpeg contexts are freed on drop
pub struct FfmpegLibSource {
    path: PathBuf,
    input: Input,
    decoder: VideoDecoder,
    scaler: ScalingContext,
    stream_index: usize,
    width: u32,
    height: u32,
    decoded: VideoFrame,
    rgb: VideoFrame,
    eof_sent: bool,
}

impl FfmpegLibSource {
    fn fail(&self, reason: String) -> VideoError {
        VideoError::DecodingFailed {
            path: self.path.clone(),
            reason,
        }
    }

    fn convert_current(&mut self) -> Result<Frame> {
        self.scaler
            .run(&self.decoded, &mut self.rgb)
            .map_err(|e| self.fail(e.to_string()))?;

        let row_len = self.width as usize * 3;
        let stride = self.rgb.stride(0);
        let data = self.rgb.data(0);
        let mut buffer = Vec::with_capacity(row_len * self.height as usize);
        for row in 0..self.height as usize {
            let start = row * stride;
            buffer.extend_from_slice(&data[start..start + row_len]);
        }

        Frame::from_rgb_bytes(self.width, self.height, buffer)
            .ok_or_else(|| self.fail("frame buffer size mismatch".to_string()).into())
    }
}

impl FrameSource for FfmpegLibSource {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        loop {
            let received = self.decoder.receive_frame(&mut self.decoded);
            match classify_receive(received).map_err(|e| self.fail(e.to_string()))? {
                Received::Frame => return self.convert_current().map(Some),
                Received::Drained => return Ok(None),
                Received::NeedsInput if self.eof_sent => return Ok(None),
                Received::NeedsInput => {}
            }

            let mut packet = Packet::empty();
            match packet.read(&mut self.input) {
                Ok(()) => {
                    if packet.stream() == self.stream_index {
                        self.decoder
                            .send_packet(&packet)
                            .map_err(|e| self.fail(e.to_string()))?;
                    }
                }
                Err(FfmpegError::Eof) => {
                    self.decoder
                        .send_eof()
                        .map_err(|e| self.fail(e.to_string()))?;
                    self.eof_sent = true;
                }
                Err(e) => return Err(self.fail(e.to_string()).into()),
            }
        }
    }
}

/// What a `receive_frame` result asks the decode loop to do next
#[derive(Debug, PartialEq, Eq)]
enum Received {
    Frame,
    NeedsInput,
    Drained,
}

/// Anything other than "try again" or end of stream is a decode failure
fn classify_receive(
    result: std::result::Result<(), FfmpegError>,
) -> std::result::Result<Received, FfmpegError> {
    match result {
        Ok(()) => Ok(Received::Frame),
        Err(FfmpegError::Other { errno }) if errno == EAGAIN => Ok(Received::NeedsInput),
        Err(FfmpegError::Eof) => Ok(Received::Drained),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_receive_classification() {
        assert_eq!(classify_receive(Ok(())).unwrap(), Received::Frame);
        assert_eq!(
            classify_receive(Err(FfmpegError::Other { errno: EAGAIN })).unwrap(),
            Received::NeedsInput
        );
        assert_eq!(classify_receive(Err(FfmpegError::Eof)).unwrap(), Received::Drained);
    }

    #[test]
    fn test_decode_errors_are_not_swallowed() {
        assert!(classify_receive(Err(FfmpegError::InvalidData)).is_err());
        assert!(classify_receive(Err(FfmpegError::Bug)).is_err());
    }
}
