use std::path::PathBuf;
use std::time::Instant;

use anyhow::{anyhow, bail, Result};
use clap::{Parser, ValueEnum};
use dialoguer::Input;
use tracing::{error, info, warn, Level};

use long_exposure::{
    composition::{CompositionEngine, InputTarget},
    config::Config,
    exposure::Mode,
    output::OutputFormat,
};

#[derive(Parser)]
#[command(
    name = "long-exposure",
    version,
    about = "Turn videos into long-exposure style light and dark images",
    long_about = "long-exposure keeps the brightest (light) or darkest (dark) value every pixel reaches over the whole video and saves the result next to the input."
)]
struct Cli {
    /// Video file to process
    #[arg(short, long, conflicts_with = "folder")]
    video: Option<PathBuf>,

    /// Folder whose videos are all processed (not recursive)
    #[arg(short, long)]
    folder: Option<PathBuf>,

    /// Shorter side of the saved images, in pixels
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..))]
    resize: Option<u32>,

    /// Composites to produce
    #[arg(short, long, value_enum)]
    mode: Option<ModeArg>,

    /// Output image format
    #[arg(short = 'e', long, value_enum)]
    format: Option<FormatArg>,

    /// Maximum number of jobs running at once
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Configuration file (optional)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long)]
    verbose: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ModeArg {
    Light,
    Dark,
    Both,
}

impl ModeArg {
    fn modes(self) -> Vec<Mode> {
        match self {
            ModeArg::Light => vec![Mode::Light],
            ModeArg::Dark => vec![Mode::Dark],
            ModeArg::Both => Mode::ALL.to_vec(),
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FormatArg {
    Jpg,
    Png,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Jpg => OutputFormat::Jpeg,
            FormatArg::Png => OutputFormat::Png,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let started = Instant::now();
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .init();

    info!("Starting long-exposure v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config = match &cli.config {
        Some(config_path) => {
            info!("Loading configuration from {:?}", config_path);
            Config::from_file(config_path)?
        }
        None => Config::default(),
    };

    // Command line flags win over the file
    if let Some(size) = cli.resize {
        config.processing.resize = Some(size);
    }
    if let Some(mode) = cli.mode {
        config.processing.modes = mode.modes();
    }
    if let Some(format) = cli.format {
        config.output.format = format.into();
    }
    if let Some(jobs) = cli.jobs {
        config.processing.max_parallel_jobs = jobs;
    }
    config.validate()?;

    let target = match (cli.video, cli.folder) {
        (Some(video), _) => InputTarget::File(video),
        (None, Some(folder)) => InputTarget::Folder(folder),
        (None, None) => prompt_for_video()?,
    };
    info!("Input: {:?}", target);

    let engine = CompositionEngine::from_config(config)?;
    if let Some(size) = engine.config().processing.resize {
        info!("Resizing composites to a shorter side of {} px", size);
    }
    let report = match engine.run(&target).await {
        Ok(report) => report,
        Err(e) => {
            error!("{}", e);
            return Err(anyhow!(e.user_message()));
        }
    };

    info!("Execution time: {:.2?}", started.elapsed());

    if !report.is_success() {
        for failure in &report.failures {
            warn!("Failed: {}", failure);
        }
        bail!("{} of {} job(s) failed", report.failures.len(), report.total_jobs());
    }

    Ok(())
}

fn prompt_for_video() -> Result<InputTarget> {
    let path: String = Input::new()
        .with_prompt("Enter video path")
        .interact_text()?;
    Ok(InputTarget::File(PathBuf::from(path.trim())))
}
