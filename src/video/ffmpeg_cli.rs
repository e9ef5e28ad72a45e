use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};
use std::thread::JoinHandle;

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::DecoderConfig;
use crate::error::{Result, VideoError};
use crate::video::source::{FrameSource, FrameSourceOpener};
use crate::video::types::Frame;

#[derive(Deserialize)]
struct ProbeOutput {
    streams: Option<Vec<ProbeStream>>,
}

#[derive(Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
    tags: Option<ProbeTags>,
    side_data_list: Option<Vec<ProbeSideData>>,
}

#[derive(Deserialize)]
struct ProbeTags {
    rotate: Option<String>,
}

#[derive(Deserialize)]
struct ProbeSideData {
    rotation: Option<f64>,
}

/// Opens videos by piping raw RGB frames out of the `ffmpeg` executable
///
/// Frame dimensions come from `ffprobe`. `ffmpeg` auto-rotates by default,
/// so a stream tagged with a 90/270 degree rotation yields frames with
/// width and height swapped; the probe accounts for that.
#[derive(Debug, Clone)]
pub struct FfmpegCliOpener {
    ffmpeg: String,
    ffprobe: String,
}

impl FfmpegCliOpener {
    pub fn new<S: Into<String>>(ffmpeg: S, ffprobe: S) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }

    pub fn from_config(config: &DecoderConfig) -> Self {
        Self::new(config.ffmpeg.clone(), config.ffprobe.clone())
    }

    /// Whether both executables can be launched
    pub fn check_available(&self) -> bool {
        [&self.ffmpeg, &self.ffprobe].iter().all(|tool| {
            Command::new(tool)
                .arg("-version")
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .map(|status| status.success())
                .unwrap_or(false)
        })
    }

    /// Output frame dimensions of the first video stream
    pub fn probe(&self, path: &Path) -> Result<(u32, u32)> {
        let output = Command::new(&self.ffprobe)
            .args([
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-show_streams",
                "-print_format",
                "json",
            ])
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| VideoError::ToolNotFound {
                tool: self.ffprobe.clone(),
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(VideoError::ProbeFailed {
                path: path.to_path_buf(),
                reason: stderr.trim().to_string(),
            }
            .into());
        }

        parse_probe(&String::from_utf8_lossy(&output.stdout), path)
    }
}

impl FrameSourceOpener for FfmpegCliOpener {
    fn open(&self, path: &Path) -> Result<Box<dyn FrameSource>> {
        let (width, height) = self.probe(path)?;
        debug!("Probed {}: {}x{}", path.display(), width, height);

        let mut child = Command::new(&self.ffmpeg)
            .args(["-v", "error", "-nostdin", "-i"])
            .arg(path)
            .args(["-map", "0:v:0", "-f", "rawvideo", "-pix_fmt", "rgb24", "-"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| VideoError::ToolNotFound {
                tool: self.ffmpeg.clone(),
                reason: e.to_string(),
            })?;

        let stdout = child.stdout.take();
        // Drained on its own thread so a chatty decoder cannot fill the pipe and stall.
        let stderr = child.stderr.take().map(|mut stderr| {
            std::thread::spawn(move || {
                let mut text = String::new();
                let _ = stderr.read_to_string(&mut text);
                text
            })
        });

        info!("Opened {} via {}", path.display(), self.ffmpeg);

        Ok(Box::new(FfmpegCliSource {
            path: path.to_path_buf(),
            width,
            height,
            frame_len: width as usize * height as usize * 3,
            child,
            stdout,
            stderr,
            finished: false,
            frames_read: 0,
        }))
    }
}

/// A running `ffmpeg` child streaming `rgb24` frames on stdout
pub struct FfmpegCliSource {
    path: PathBuf,
    width: u32,
    height: u32,
    frame_len: usize,
    child: Child,
    stdout: Option<ChildStdout>,
    stderr: Option<JoinHandle<String>>,
    finished: bool,
    frames_read: u64,
}

impl FfmpegCliSource {
    fn decode_error(&self, reason: String) -> VideoError {
        VideoError::DecodingFailed {
            path: self.path.clone(),
            reason,
        }
    }

    /// Close the pipe, reap the child and surface a non-zero exit status
    fn finish(&mut self) -> Result<()> {
        self.stdout = None;
        let status = self.child.wait()?;
        self.finished = true;

        let stderr = self
            .stderr
            .take()
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();

        if status.success() {
            debug!("{} finished after {} frames", self.path.display(), self.frames_read);
            Ok(())
        } else {
            Err(self
                .decode_error(format!("ffmpeg exited with {}: {}", status, stderr.trim()))
                .into())
        }
    }
}

impl FrameSource for FfmpegCliSource {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        let Some(stdout) = self.stdout.as_mut() else {
            return Ok(None);
        };

        let mut buf = vec![0u8; self.frame_len];
        let mut filled = 0;
        while filled < buf.len() {
            match stdout.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(self.decode_error(e.to_string()).into()),
            }
        }

        if filled == 0 {
            self.finish()?;
            return Ok(None);
        }

        if filled < buf.len() {
            if let Err(e) = self.finish() {
                warn!("{}", e);
            }
            return Err(self
                .decode_error(format!(
                    "stream ended mid-frame after {} frames ({} of {} bytes)",
                    self.frames_read,
                    filled,
                    buf.len()
                ))
                .into());
        }

        self.frames_read += 1;
        Frame::from_rgb_bytes(self.width, self.height, buf)
            .map(Some)
            .ok_or_else(|| self.decode_error("frame buffer size mismatch".to_string()).into())
    }
}

impl Drop for FfmpegCliSource {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        self.stdout = None;
        let _ = self.child.kill();
        let _ = self.child.wait();
        // The stderr reader ends on its own once the pipe closes.
        self.stderr = None;
    }
}

fn parse_probe(json: &str, path: &Path) -> Result<(u32, u32)> {
    let probe: ProbeOutput = serde_json::from_str(json).map_err(|e| VideoError::ProbeFailed {
        path: path.to_path_buf(),
        reason: format!("invalid ffprobe output: {}", e),
    })?;

    let stream = probe
        .streams
        .and_then(|streams| streams.into_iter().next())
        .ok_or_else(|| VideoError::NoVideoStream {
            path: path.to_path_buf(),
        })?;

    let (width, height) = match (stream.width, stream.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => {
            return Err(VideoError::ProbeFailed {
                path: path.to_path_buf(),
                reason: "video stream has no dimensions".to_string(),
            }
            .into())
        }
    };

    let rotation = stream
        .side_data_list
        .iter()
        .flatten()
        .find_map(|side| side.rotation)
        .or_else(|| {
            stream
                .tags
                .as_ref()
                .and_then(|tags| tags.rotate.as_deref())
                .and_then(|r| r.trim().parse::<f64>().ok())
        })
        .unwrap_or(0.0);

    if (rotation.round() as i64).rem_euclid(180) == 90 {
        Ok((height, width))
    } else {
        Ok((width, height))
    }
}
