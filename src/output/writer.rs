use std::fmt;
use std::path::Path;
use std::str::FromStr;

use image::codecs::jpeg::JpegEncoder;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{Config, MetadataConfig, OutputConfig};
use crate::error::{OutputError, Result};
use crate::exposure::Mode;
use crate::output::exif;
use crate::video::types::Frame;

/// Encoded format of a saved composite
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    #[serde(rename = "jpg", alias = "jpeg")]
    Jpeg,
    #[serde(rename = "png")]
    Png,
}

impl OutputFormat {
    /// File extension used for outputs, without the dot
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Png => "png",
        }
    }

    /// Whether outputs in this format carry the EXIF tags
    pub fn supports_metadata(self) -> bool {
        matches!(self, OutputFormat::Jpeg)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Ok(OutputFormat::Jpeg),
            "png" => Ok(OutputFormat::Png),
            other => Err(format!("unknown output format '{}' (expected jpg or png)", other)),
        }
    }
}

/// Encodes composites and writes them to disk
#[derive(Debug, Clone)]
pub struct ImageWriter {
    output: OutputConfig,
    metadata: MetadataConfig,
}

impl ImageWriter {
    pub fn new(output: OutputConfig, metadata: MetadataConfig) -> Self {
        Self { output, metadata }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.output.clone(), config.metadata.clone())
    }

    pub fn format(&self) -> OutputFormat {
        self.output.format
    }

    /// Encode a composite in the configured format
    ///
    /// Formats that support metadata get the tags as an EXIF APP1 segment;
    /// PNG is written lossless without metadata.
    pub fn encode(&self, image: &Frame) -> Result<Vec<u8>> {
        let format = self.output.format;
        let encoded = match format {
            OutputFormat::Jpeg => encode_jpeg(image, self.output.jpeg_quality)?,
            OutputFormat::Png => encode_png(image)?,
        };

        if !format.supports_metadata() {
            return Ok(encoded);
        }
        let app1 = exif::build_app1(&self.metadata)?;
        exif::insert_app1(&encoded, &app1)
    }

    /// Encode and save one composite, replacing any file already at `path`
    pub fn write(&self, path: &Path, image: &Frame, mode: Mode) -> Result<()> {
        let bytes = self.encode(image)?;
        debug!("Encoded {} composite: {} bytes", mode, bytes.len());

        std::fs::write(path, &bytes).map_err(|source| OutputError::Write {
            path: path.to_path_buf(),
            source,
        })?;

        info!("Saved {} image to {}", mode, path.display());
        Ok(())
    }
}

fn encode_jpeg(image: &Frame, quality: u8) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    {
        let mut encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
        encoder
            .encode_image(image.as_image())
            .map_err(|e| OutputError::Encode { reason: e.to_string() })?;
    }
    Ok(buffer)
}

fn encode_png(image: &Frame) -> Result<Vec<u8>> {
    let encode_err = |e: png::EncodingError| OutputError::Encode { reason: e.to_string() };

    let mut buffer = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut buffer, image.width(), image.height());
        encoder.set_color(png::ColorType::Rgb);
        encoder.set_depth(png::BitDepth::Eight);

        let mut writer = encoder.write_header().map_err(encode_err)?;
        writer.write_image_data(image.as_raw()).map_err(encode_err)?;
        writer.finish().map_err(encode_err)?;
    }
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExposureError;
    use image::{ImageBuffer, Rgb};
    use tempfile::tempdir;

    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle)
    }

    fn writer(format: OutputFormat) -> ImageWriter {
        let output = OutputConfig { format, ..OutputConfig::default() };
        ImageWriter::new(output, MetadataConfig::default())
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("JPEG".parse::<OutputFormat>().unwrap(), OutputFormat::Jpeg);
        assert_eq!("jpg".parse::<OutputFormat>().unwrap(), OutputFormat::Jpeg);
        assert_eq!("png".parse::<OutputFormat>().unwrap(), OutputFormat::Png);
        assert!("gif".parse::<OutputFormat>().is_err());
        assert_eq!(OutputFormat::Jpeg.extension(), "jpg");
    }

    #[test]
    fn test_metadata_follows_format() {
        let frame = Frame::new_filled(8, 8, [50, 60, 70]);
        for format in [OutputFormat::Jpeg, OutputFormat::Png] {
            let image_writer = writer(format);
            assert_eq!(image_writer.format(), format);
            let bytes = image_writer.encode(&frame).unwrap();
            assert_eq!(contains(&bytes, b"Exif\0\0"), format.supports_metadata(), "{format}");
        }
    }

    #[test]
    fn test_jpeg_carries_exif() {
        let frame = Frame::new_filled(32, 16, [200, 120, 40]);
        let bytes = writer(OutputFormat::Jpeg).encode(&frame).unwrap();

        assert_eq!(&bytes[0..2], &[0xFF, 0xD8]);
        assert!(contains(&bytes, b"Exif\0\0MM"));
        assert!(contains(&bytes, b"Tauno Erik\0"));
        assert!(contains(&bytes, b"github.com/taunoe/Valgusmaal"));

        let decoded = image::load_from_memory(&bytes).unwrap().to_rgb8();
        assert_eq!(decoded.dimensions(), (32, 16));
        let px = decoded.get_pixel(16, 8).0;
        for (got, want) in px.iter().zip([200u8, 120, 40]) {
            assert!((*got as i16 - want as i16).abs() <= 4, "{px:?}");
        }
    }

    #[test]
    fn test_png_is_lossless_without_metadata() {
        let frame = Frame::new(ImageBuffer::from_fn(7, 5, |x, y| {
            Rgb([(x * 30) as u8, (y * 40) as u8, 99])
        }));
        let bytes = writer(OutputFormat::Png).encode(&frame).unwrap();

        assert!(!contains(&bytes, b"Exif"));
        let decoded = image::load_from_memory(&bytes).unwrap().to_rgb8();
        assert_eq!(decoded.as_raw(), frame.as_raw());
    }

    #[test]
    fn test_write_replaces_existing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("clip_light.png");
        std::fs::write(&path, b"stale").unwrap();

        let frame = Frame::new_filled(4, 4, [1, 2, 3]);
        writer(OutputFormat::Png).write(&path, &frame, Mode::Light).unwrap();

        let decoded = image::open(&path).unwrap().to_rgb8();
        assert_eq!(decoded.get_pixel(0, 0).0, [1, 2, 3]);
    }

    #[test]
    fn test_write_error_names_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("clip_dark.jpg");

        let frame = Frame::new_filled(4, 4, [0, 0, 0]);
        let err = writer(OutputFormat::Jpeg).write(&path, &frame, Mode::Dark).unwrap_err();
        match err {
            ExposureError::Output(OutputError::Write { path: failed, .. }) => assert_eq!(failed, path),
            other => panic!("unexpected error: {other}"),
        }
    }
}
