pub mod exif;
pub mod writer;

pub use writer::{ImageWriter, OutputFormat};
