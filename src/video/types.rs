use image::{ImageBuffer, Rgb, RgbImage};

/// A single decoded video frame, or a composite built from many of them
///
/// Wraps an 8-bit RGB image buffer. Pixels are stored row-major in R, G, B
/// order; every frame source, the accumulator and the writers use that order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    buffer: RgbImage,
}

impl Frame {
    /// Create a new frame from an RGB image buffer
    pub fn new(buffer: RgbImage) -> Self {
        Self { buffer }
    }

    /// Create a new frame with the given dimensions filled with the specified color
    pub fn new_filled(width: u32, height: u32, color: [u8; 3]) -> Self {
        let buffer = ImageBuffer::from_pixel(width, height, Rgb(color));
        Self { buffer }
    }

    /// Create a frame from tightly packed RGB bytes
    ///
    /// Returns `None` when `data` is not exactly `width * height * 3` bytes.
    pub fn from_rgb_bytes(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        ImageBuffer::from_raw(width, height, data).map(|buffer| Self { buffer })
    }

    pub fn width(&self) -> u32 {
        self.buffer.width()
    }

    pub fn height(&self) -> u32 {
        self.buffer.height()
    }

    /// (width, height)
    pub fn dimensions(&self) -> (u32, u32) {
        self.buffer.dimensions()
    }

    /// Get a pixel at the given coordinates (returns RGB array)
    pub fn get_pixel(&self, x: u32, y: u32) -> [u8; 3] {
        self.buffer.get_pixel(x, y).0
    }

    /// Get the underlying image buffer
    pub fn as_image(&self) -> &RgbImage {
        &self.buffer
    }

    /// Get a mutable reference to the underlying image buffer
    pub fn as_image_mut(&mut self) -> &mut RgbImage {
        &mut self.buffer
    }

    /// Raw RGB bytes, row-major
    pub fn as_raw(&self) -> &[u8] {
        self.buffer.as_raw()
    }
}

impl From<RgbImage> for Frame {
    fn from(buffer: RgbImage) -> Self {
        Self::new(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rgb_bytes_checks_length() {
        assert!(Frame::from_rgb_bytes(2, 2, vec![0; 12]).is_some());
        assert!(Frame::from_rgb_bytes(2, 2, vec![0; 11]).is_none());
    }

    #[test]
    fn test_new_filled() {
        let frame = Frame::new_filled(4, 3, [1, 2, 3]);
        assert_eq!(frame.dimensions(), (4, 3));
        assert_eq!(frame.get_pixel(3, 2), [1, 2, 3]);
        assert_eq!(frame.as_raw().len(), 4 * 3 * 3);
    }
}
