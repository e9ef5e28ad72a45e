use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ExposureError;
use crate::exposure::Mode;
use crate::output::OutputFormat;

/// One (video, mode) unit of work producing one output file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSpec {
    pub video: PathBuf,
    pub mode: Mode,
    pub resize: Option<u32>,
    pub output: PathBuf,
}

impl JobSpec {
    pub fn new(video: PathBuf, mode: Mode, resize: Option<u32>, format: OutputFormat) -> Self {
        let output = output_path(&video, mode, format);
        Self { video, mode, resize, output }
    }
}

impl fmt::Display for JobSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.video.display(), self.mode)
    }
}

/// `<stem>_<mode>.<ext>` in the video's own directory
pub fn output_path(video: &Path, mode: Mode, format: OutputFormat) -> PathBuf {
    let stem = video
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    video.with_file_name(format!("{}_{}.{}", stem, mode.suffix(), format.extension()))
}

/// A job that wrote its composite
#[derive(Debug, Clone)]
pub struct JobOutcome {
    pub job: JobSpec,
    pub frames: u64,
    pub dimensions: (u32, u32),
    pub elapsed: Duration,
}

/// A job that was abandoned
#[derive(Debug)]
pub struct JobFailure {
    pub job: JobSpec,
    pub error: ExposureError,
}

impl fmt::Display for JobFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.job, self.error.user_message())
    }
}

/// Everything a batch run produced, in job order
#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<JobOutcome>,
    pub failures: Vec<JobFailure>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn total_jobs(&self) -> usize {
        self.outcomes.len() + self.failures.len()
    }

    /// Output files written by the successful jobs
    pub fn outputs(&self) -> impl Iterator<Item = &Path> + '_ {
        self.outcomes.iter().map(|o| o.job.output.as_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_path_naming() {
        let video = Path::new("/videos/night/clip.final.mp4");
        assert_eq!(
            output_path(video, Mode::Light, OutputFormat::Jpeg),
            PathBuf::from("/videos/night/clip.final_light.jpg")
        );
        assert_eq!(
            output_path(video, Mode::Dark, OutputFormat::Png),
            PathBuf::from("/videos/night/clip.final_dark.png")
        );
    }

    #[test]
    fn test_output_path_relative() {
        let job = JobSpec::new(PathBuf::from("sky.MOV"), Mode::Dark, Some(720), OutputFormat::Jpeg);
        assert_eq!(job.output, PathBuf::from("sky_dark.jpg"));
        assert_eq!(job.to_string(), "sky.MOV (dark)");
    }

    #[test]
    fn test_report_success() {
        let mut report = BatchReport::default();
        assert!(report.is_success());

        report.failures.push(JobFailure {
            job: JobSpec::new(PathBuf::from("a.mp4"), Mode::Light, None, OutputFormat::Jpeg),
            error: ExposureError::generic("boom"),
        });
        assert!(!report.is_success());
        assert_eq!(report.total_jobs(), 1);
        assert!(report.failures[0].to_string().starts_with("a.mp4 (light): "));
    }
}
