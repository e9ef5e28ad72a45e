use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::{
    composition::job::{BatchReport, JobFailure, JobOutcome, JobSpec},
    config::Config,
    error::{ExposureError, InputError, Result},
    exposure::{resize, ExtremumAccumulator},
    output::ImageWriter,
    video::{self, FrameIter, FrameSourceOpener},
};

/// What the user pointed the tool at
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputTarget {
    /// A single video file
    File(PathBuf),
    /// Every video directly inside a directory
    Folder(PathBuf),
}

/// Batch driver that turns videos into light and dark composites
///
/// The pipeline per run:
/// 1. Discovery - validate the input and collect video paths
/// 2. Planning - one job per video per configured mode
/// 3. Execution - each job opens its own frame source, folds every frame
///    into the composite, optionally resizes it and writes the output
/// 4. Reporting - every job is awaited and its result collected
pub struct CompositionEngine {
    config: Arc<Config>,
    opener: Arc<dyn FrameSourceOpener>,
    writer: Arc<ImageWriter>,
}

impl CompositionEngine {
    /// Create an engine that opens videos through `opener`
    pub fn new(config: Config, opener: Arc<dyn FrameSourceOpener>) -> Self {
        let writer = Arc::new(ImageWriter::from_config(&config));
        Self {
            config: Arc::new(config),
            opener,
            writer,
        }
    }

    /// Create an engine using the decoder backend named in the configuration
    pub fn from_config(config: Config) -> Result<Self> {
        let opener = video::opener_from_config(&config.decoder)?;
        Ok(Self::new(config, opener))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Validate the input and collect the videos to process
    pub fn discover(&self, target: &InputTarget) -> Result<Vec<PathBuf>> {
        discover_videos(target)
    }

    /// One job per video per configured mode, videos in discovery order
    pub fn plan(&self, videos: &[PathBuf]) -> Vec<JobSpec> {
        let processing = &self.config.processing;
        let format = self.writer.format();

        videos
            .iter()
            .flat_map(|video| {
                processing
                    .modes
                    .iter()
                    .map(move |&mode| JobSpec::new(video.clone(), mode, processing.resize, format))
            })
            .collect()
    }

    /// Discover, plan and run every job concurrently
    ///
    /// Input errors are returned before any job starts. Per-job errors end
    /// up in the report and never stop the other jobs.
    pub async fn run(&self, target: &InputTarget) -> Result<BatchReport> {
        info!("🔍 Step 1: Discovering videos...");
        let videos = self.discover(target)?;
        info!("   Found {} video(s)", videos.len());

        let jobs = self.plan(&videos);
        info!(
            "🌌 Step 2: Running {} job(s), up to {} at a time",
            jobs.len(),
            self.config.processing.max_parallel_jobs
        );

        let report = self.run_jobs(jobs).await?;
        log_summary(&report);
        Ok(report)
    }

    /// Run jobs as blocking tasks, bounded by `processing.max_parallel_jobs`
    pub async fn run_jobs(&self, jobs: Vec<JobSpec>) -> Result<BatchReport> {
        let semaphore = Arc::new(Semaphore::new(self.config.processing.max_parallel_jobs));
        let mut tasks = JoinSet::new();
        let mut planned = Vec::with_capacity(jobs.len());

        for (index, job) in jobs.into_iter().enumerate() {
            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .map_err(|e| ExposureError::generic(format!("job scheduler closed: {e}")))?;
            let opener = Arc::clone(&self.opener);
            let writer = Arc::clone(&self.writer);
            let task_job = job.clone();
            planned.push(job);

            tasks.spawn_blocking(move || {
                let _permit = permit;
                let result = panic::catch_unwind(AssertUnwindSafe(|| {
                    run_job(opener.as_ref(), &writer, &task_job)
                }))
                .unwrap_or_else(|_| Err(ExposureError::generic("job panicked")));
                (index, result)
            });
        }

        let mut finished = Vec::with_capacity(planned.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(result) => finished.push(result),
                Err(e) => warn!("Job task did not complete: {}", e),
            }
        }

        Ok(merge_results(planned, finished))
    }

    /// Run the same jobs one after another on the calling thread
    pub fn run_sequential(&self, target: &InputTarget) -> Result<BatchReport> {
        let videos = self.discover(target)?;
        let jobs = self.plan(&videos);

        let report = collect_report(jobs.into_iter().map(|job| {
            let result = run_job(self.opener.as_ref(), &self.writer, &job);
            (job, result)
        }));
        log_summary(&report);
        Ok(report)
    }
}

/// Validate an input designator and list the videos it names
///
/// Folder listings are not recursive and are sorted by path.
pub fn discover_videos(target: &InputTarget) -> Result<Vec<PathBuf>> {
    match target {
        InputTarget::File(path) => {
            if !path.is_file() {
                return Err(InputError::NotAFile { path: path.clone() }.into());
            }
            if !video::is_video(path) {
                return Err(InputError::NotAVideo { path: path.clone() }.into());
            }
            Ok(vec![path.clone()])
        }
        InputTarget::Folder(dir) => {
            if !dir.is_dir() {
                return Err(InputError::DirectoryNotFound { path: dir.clone() }.into());
            }

            let mut videos = Vec::new();
            for entry in std::fs::read_dir(dir)? {
                let path = entry?.path();
                if !path.is_file() {
                    debug!("Skipping {} - not a file", path.display());
                    continue;
                }
                if !video::is_video(&path) {
                    debug!("Skipping {} - not a video", path.display());
                    continue;
                }
                videos.push(path);
            }
            videos.sort();

            if videos.is_empty() {
                warn!("No videos found in {}", dir.display());
            }
            Ok(videos)
        }
    }
}

/// Open, accumulate, resize and write one composite
///
/// The frame source lives inside the iterator and is dropped when the
/// stream ends or the first error stops the loop.
fn run_job(opener: &dyn FrameSourceOpener, writer: &ImageWriter, job: &JobSpec) -> Result<JobOutcome> {
    let started = Instant::now();
    info!("Processing {}", job);

    let source = opener.open(&job.video)?;
    let (width, height) = source.dimensions();
    debug!("{}: {}x{} frames", job.video.display(), width, height);

    let mut accumulator = ExtremumAccumulator::new(job.mode);
    for frame in FrameIter::new(source) {
        accumulator.push(frame?)?;
    }
    let frames = accumulator.frames_seen();

    let mut composite = accumulator.finish()?;
    if let Some(shorter_side) = job.resize {
        composite = resize(composite, shorter_side)?;
    }

    writer.write(&job.output, &composite, job.mode)?;

    Ok(JobOutcome {
        job: job.clone(),
        frames,
        dimensions: composite.dimensions(),
        elapsed: started.elapsed(),
    })
}

/// Pair every planned job with its result; jobs whose task never reported
/// back become failures
fn merge_results(planned: Vec<JobSpec>, finished: Vec<(usize, Result<JobOutcome>)>) -> BatchReport {
    let mut slots: Vec<Option<Result<JobOutcome>>> = planned.iter().map(|_| None).collect();
    for (index, result) in finished {
        if let Some(slot) = slots.get_mut(index) {
            *slot = Some(result);
        }
    }

    collect_report(planned.into_iter().zip(slots).map(|(job, slot)| {
        let result = slot.unwrap_or_else(|| Err(ExposureError::generic("job task did not complete")));
        (job, result)
    }))
}

fn collect_report<I>(results: I) -> BatchReport
where
    I: IntoIterator<Item = (JobSpec, Result<JobOutcome>)>,
{
    let mut report = BatchReport::default();
    for (job, result) in results {
        match result {
            Ok(outcome) => report.outcomes.push(outcome),
            Err(error) => {
                warn!("Job failed: {}: {}", job, error);
                report.failures.push(JobFailure { job, error });
            }
        }
    }
    report
}

fn log_summary(report: &BatchReport) {
    for outcome in &report.outcomes {
        debug!(
            "   {} -> {} ({} frames, {}x{}, {:.2?})",
            outcome.job,
            outcome.job.output.display(),
            outcome.frames,
            outcome.dimensions.0,
            outcome.dimensions.1,
            outcome.elapsed
        );
    }
    info!(
        "   ✅ {} of {} job(s) succeeded",
        report.outcomes.len(),
        report.total_jobs()
    );
}
