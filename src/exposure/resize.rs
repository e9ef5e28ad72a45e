use image::imageops::{self, FilterType};
use rayon::prelude::*;
use tracing::info;

use crate::error::{ExposureError, ResizeError, Result};
use crate::video::types::Frame;

/// New (width, height) such that the shorter side becomes `shorter_side`
///
/// The longer side scales proportionally and is rounded down.
pub fn calculate_new_size(width: u32, height: u32, shorter_side: u32) -> (u32, u32) {
    let scale = |long: u32, short: u32| {
        let scaled = shorter_side as u64 * long as u64 / short.max(1) as u64;
        scaled.min(u32::MAX as u64) as u32
    };

    if width < height {
        // Portrait
        (shorter_side, scale(height, width))
    } else if height < width {
        // Landscape
        (scale(width, height), shorter_side)
    } else {
        (shorter_side, shorter_side)
    }
}

/// Resize a composite so its shorter side is `shorter_side` pixels
///
/// Shrinking uses area averaging. Enlarging is not what this is for; it
/// falls back to Lanczos3 so it at least produces an image.
pub fn resize(image: Frame, shorter_side: u32) -> Result<Frame> {
    if shorter_side == 0 {
        return Err(ResizeError::InvalidSize { size: shorter_side }.into());
    }

    let (width, height) = image.dimensions();
    let (new_width, new_height) = calculate_new_size(width, height, shorter_side);
    info!("Original dimensions: {}x{}", width, height);

    if (new_width, new_height) == (width, height) {
        return Ok(image);
    }

    let resized = if new_width <= width && new_height <= height {
        area_downsample(&image, new_width, new_height)?
    } else {
        Frame::from(imageops::resize(
            image.as_image(),
            new_width,
            new_height,
            FilterType::Lanczos3,
        ))
    };

    info!("Resized dimensions: {}x{}", resized.width(), resized.height());
    Ok(resized)
}

/// For each destination index, the source indices it covers and the share
/// of the destination pixel each one contributes (shares sum to 1)
fn area_taps(src: u32, dst: u32) -> Vec<Vec<(usize, f32)>> {
    let scale = src as f64 / dst as f64;
    (0..dst)
        .map(|d| {
            let start = d as f64 * scale;
            let end = start + scale;
            let mut taps = Vec::with_capacity(scale.ceil() as usize + 1);
            let mut s = start.floor() as u32;
            while (s as f64) < end && s < src {
                let covered = end.min(s as f64 + 1.0) - start.max(s as f64);
                if covered > 0.0 {
                    taps.push((s as usize, (covered / scale) as f32));
                }
                s += 1;
            }
            taps
        })
        .collect()
}

fn area_downsample(image: &Frame, new_width: u32, new_height: u32) -> Result<Frame> {
    let (width, height) = image.dimensions();
    let x_taps = area_taps(width, new_width);
    let y_taps = area_taps(height, new_height);

    let src_row = width as usize * 3;
    let dst_row = new_width as usize * 3;

    // Horizontal pass: full source height, destination width
    let mut horizontal = vec![0f32; height as usize * dst_row];
    horizontal
        .par_chunks_mut(dst_row)
        .zip(image.as_raw().par_chunks(src_row))
        .for_each(|(out_row, in_row)| {
            for (ox, taps) in x_taps.iter().enumerate() {
                let mut acc = [0f32; 3];
                for &(sx, weight) in taps {
                    for (c, value) in acc.iter_mut().enumerate() {
                        *value += in_row[sx * 3 + c] as f32 * weight;
                    }
                }
                out_row[ox * 3..ox * 3 + 3].copy_from_slice(&acc);
            }
        });

    let mut out = vec![0u8; new_height as usize * dst_row];
    out.par_chunks_mut(dst_row)
        .zip(y_taps.par_iter())
        .for_each(|(out_row, taps)| {
            for (i, px) in out_row.iter_mut().enumerate() {
                let value: f32 = taps
                    .iter()
                    .map(|&(sy, weight)| horizontal[sy * dst_row + i] * weight)
                    .sum();
                *px = value.round().clamp(0.0, 255.0) as u8;
            }
        });

    Frame::from_rgb_bytes(new_width, new_height, out)
        .ok_or_else(|| ExposureError::generic("resized buffer has the wrong length"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExposureError;
    use image::{ImageBuffer, Rgb};

    #[test]
    fn test_calculate_new_size() {
        assert_eq!(calculate_new_size(100, 200, 50), (50, 100));
        assert_eq!(calculate_new_size(200, 100, 50), (100, 50));
        assert_eq!(calculate_new_size(100, 100, 50), (50, 50));
    }

    #[test]
    fn test_calculate_new_size_rounds_down() {
        // 1024 * 1920 / 1080 = 1820.44
        assert_eq!(calculate_new_size(1920, 1080, 1024), (1820, 1024));
        assert_eq!(calculate_new_size(1080, 1920, 1024), (1024, 1820));
        assert_eq!(calculate_new_size(3, 7, 2), (2, 4));
    }

    #[test]
    fn test_zero_size_rejected() {
        let err = resize(Frame::new_filled(4, 4, [0, 0, 0]), 0).unwrap_err();
        assert!(matches!(err, ExposureError::Resize(ResizeError::InvalidSize { size: 0 })));
    }

    #[test]
    fn test_solid_color_survives_downsample() {
        let resized = resize(Frame::new_filled(200, 100, [12, 130, 250]), 50).unwrap();
        assert_eq!(resized.dimensions(), (100, 50));
        assert!(resized.as_raw().chunks(3).all(|px| px == [12, 130, 250]));
    }

    #[test]
    fn test_area_average_integer_factor() {
        // Left half black, right half 200 → one pixel each
        let image = Frame::new(ImageBuffer::from_fn(4, 2, |x, _| {
            if x < 2 { Rgb([0, 0, 0]) } else { Rgb([200, 200, 200]) }
        }));
        let resized = resize(image, 1).unwrap();
        assert_eq!(resized.dimensions(), (2, 1));
        assert_eq!(resized.get_pixel(0, 0), [0, 0, 0]);
        assert_eq!(resized.get_pixel(1, 0), [200, 200, 200]);
    }

    #[test]
    fn test_area_average_fractional_factor() {
        // Columns 0, 90, 180 shrunk by 1.5: [0 + 90/2] / 1.5 and [90/2 + 180] / 1.5
        let image = Frame::new(ImageBuffer::from_fn(3, 3, |x, _| {
            let v = (x * 90) as u8;
            Rgb([v, v, v])
        }));
        let resized = resize(image, 2).unwrap();
        assert_eq!(resized.dimensions(), (2, 2));
        assert_eq!(resized.get_pixel(0, 0), [30, 30, 30]);
        assert_eq!(resized.get_pixel(1, 1), [150, 150, 150]);
    }

    #[test]
    fn test_resize_to_current_size_is_identity() {
        let image = Frame::new(ImageBuffer::from_fn(50, 100, |x, y| {
            Rgb([x as u8, y as u8, (x + y) as u8])
        }));
        let resized = resize(image.clone(), 50).unwrap();
        assert_eq!(resized, image);

        let once = resize(Frame::new_filled(300, 120, [5, 6, 7]), 60).unwrap();
        let twice = resize(once.clone(), 60).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_upscale_falls_back() {
        let resized = resize(Frame::new_filled(10, 5, [80, 80, 80]), 20).unwrap();
        assert_eq!(resized.dimensions(), (40, 20));
    }

    #[test]
    fn test_area_taps_sum_to_one() {
        for (src, dst) in [(1920, 1024), (7, 3), (100, 100), (5, 1)] {
            for taps in area_taps(src, dst) {
                let total: f32 = taps.iter().map(|(_, w)| w).sum();
                assert!((total - 1.0).abs() < 1e-4, "{src}->{dst}: {total}");
            }
        }
    }
}
