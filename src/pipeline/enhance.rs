//! Optional sharpening of rasterised pages before OCR.
//!
//! The transform is the classic "sharpness enhancer": blend each pixel with
//! a 3×3 smoothed copy of the image,
//!
//! ```text
//! out = smooth + factor × (original − smooth)
//! ```
//!
//! so `factor == 1.0` is the identity, values above 1 sharpen and values below
//! 1 blur. The outermost one-pixel border is left untouched because the
//! smoothing kernel has no full neighbourhood there.

use image::{imageops, DynamicImage, Rgba, RgbaImage};
use std::path::Path;
use tracing::debug;

/// Default sharpening strength.
pub const DEFAULT_ENHANCE_FACTOR: f32 = 1.5;

/// Centre-weighted smoothing kernel, pre-normalised to sum to 1.
const SMOOTH_KERNEL: [f32; 9] = [
    1.0 / 13.0,
    1.0 / 13.0,
    1.0 / 13.0,
    1.0 / 13.0,
    5.0 / 13.0,
    1.0 / 13.0,
    1.0 / 13.0,
    1.0 / 13.0,
    1.0 / 13.0,
];

/// Sharpen an in-memory image.
pub fn sharpen(image: &DynamicImage, factor: f32) -> DynamicImage {
    let original = image.to_rgba8();
    let (width, height) = original.dimensions();
    if width < 3 || height < 3 {
        return DynamicImage::ImageRgba8(original);
    }

    let smooth: RgbaImage = imageops::filter3x3(&original, &SMOOTH_KERNEL);
    let mut out = original.clone();

    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let o = original.get_pixel(x, y);
            let s = smooth.get_pixel(x, y);
            let mut px = [0u8; 4];
            for c in 0..3 {
                let v = s[c] as f32 + factor * (o[c] as f32 - s[c] as f32);
                px[c] = v.round().clamp(0.0, 255.0) as u8;
            }
            px[3] = o[3];
            out.put_pixel(x, y, Rgba(px));
        }
    }

    DynamicImage::ImageRgba8(out)
}

/// Sharpen the image at `src` and write the result to `dst`.
///
/// `src` and `dst` may be the same path (in-place replacement). The output
/// format follows `dst`'s extension.
pub fn enhance_file(src: &Path, dst: &Path, factor: f32) -> Result<(), image::ImageError> {
    let image = image::open(src)?;
    let enhanced = sharpen(&image, factor);
    enhanced.save(dst)?;
    debug!(
        "Enhanced {} → {} (factor {})",
        src.display(),
        dst.display(),
        factor
    );
    Ok(())
}
