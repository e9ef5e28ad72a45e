use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{
    error::{ConfigError, Result},
    exposure::Mode,
    output::OutputFormat,
};

/// Main configuration for long-exposure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Encoded output settings
    pub output: OutputConfig,

    /// Tags embedded into formats that carry metadata
    pub metadata: MetadataConfig,

    /// Batch processing settings
    pub processing: ProcessingConfig,

    /// Frame source settings
    pub decoder: DecoderConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound { path: path.display().to_string() })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::InvalidValue {
                key: "config".to_string(),
                value: e.to_string()
            })?;

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.output.validate()?;
        self.processing.validate()?;
        self.decoder.validate()?;
        Ok(())
    }
}

/// Output image configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Image format, which also decides the file extension
    pub format: OutputFormat,

    /// JPEG quality (1-100)
    pub jpeg_quality: u8,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Jpeg,
            jpeg_quality: 95,
        }
    }
}

impl OutputConfig {
    fn validate(&self) -> Result<()> {
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(ConfigError::InvalidValue {
                key: "output.jpeg_quality".to_string(),
                value: self.jpeg_quality.to_string()
            }.into());
        }
        Ok(())
    }
}

/// Fixed tags written into JPEG outputs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    pub artist: String,
    pub copyright: String,
    pub software: String,
    pub comment: String,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            artist: "Tauno Erik".to_string(),
            copyright: "Tauno Erik".to_string(),
            software: concat!("long-exposure ", env!("CARGO_PKG_VERSION")).to_string(),
            comment: "github.com/taunoe/Valgusmaal".to_string(),
        }
    }
}

/// Batch processing configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Upper bound on jobs decoding at the same time
    pub max_parallel_jobs: usize,

    /// Shorter side of the saved composites, unresized when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resize: Option<u32>,

    /// Composites produced for every video
    pub modes: Vec<Mode>,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            max_parallel_jobs: num_cpus::get(),
            resize: None,
            modes: Mode::ALL.to_vec(),
        }
    }
}

impl ProcessingConfig {
    fn validate(&self) -> Result<()> {
        if self.max_parallel_jobs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "processing.max_parallel_jobs".to_string(),
                value: self.max_parallel_jobs.to_string()
            }.into());
        }

        if self.resize == Some(0) {
            return Err(ConfigError::InvalidValue {
                key: "processing.resize".to_string(),
                value: "0".to_string()
            }.into());
        }

        if self.modes.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "processing.modes".to_string(),
                value: "[]".to_string()
            }.into());
        }

        Ok(())
    }
}

/// Which frame source implementation opens videos
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecoderBackend {
    /// `ffprobe` + `ffmpeg` executables, frames piped as raw RGB
    Cli,
    /// FFmpeg libraries linked in through `ffmpeg-next`
    Library,
}

/// Frame source configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    pub backend: DecoderBackend,

    /// `ffmpeg` executable name or path
    pub ffmpeg: String,

    /// `ffprobe` executable name or path
    pub ffprobe: String,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            backend: DecoderBackend::Cli,
            ffmpeg: "ffmpeg".to_string(),
            ffprobe: "ffprobe".to_string(),
        }
    }
}

impl DecoderConfig {
    fn validate(&self) -> Result<()> {
        if self.backend == DecoderBackend::Library && !cfg!(feature = "ffmpeg") {
            return Err(ConfigError::InvalidValue {
                key: "decoder.backend".to_string(),
                value: "library (built without the `ffmpeg` feature)".to_string()
            }.into());
        }

        for (key, value) in [("decoder.ffmpeg", &self.ffmpeg), ("decoder.ffprobe", &self.ffprobe)] {
            if value.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: value.clone()
                }.into());
            }
        }

        Ok(())
    }
}
