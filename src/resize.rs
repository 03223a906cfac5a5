//! High quality image resizing.

use crate::{Error, RasterImage, Result, Size};
use image::imageops::{self, FilterType};
use image::RgbaImage;

/// Resize `image` to exactly `width` x `height` with a bicubic (Catmull-Rom)
/// filter. The result keeps the source resolution.
///
/// The destination starts fully transparent and the scaled source is copied
/// over it (no blending).
pub fn resize_image(image: &RasterImage, width: u32, height: u32, max_output_size: u32) -> Result<RasterImage> {
    if width == 0 || width > max_output_size || height == 0 || height > max_output_size {
        return Err(Error::InvalidDimensionError { width, height, max: max_output_size });
    }
    if image.is_empty() {
        return Err(Error::NullImageError);
    }

    let scaled = imageops::resize(image.pixels(), width, height, FilterType::CatmullRom);
    let mut dest = RgbaImage::new(width, height);
    imageops::replace(&mut dest, &scaled, 0, 0);

    log::trace!("resized {}x{} -> {}x{}", image.width(), image.height(), width, height);
    Ok(RasterImage::with_resolution(dest, image.resolution()))
}

/// Largest size with `captured`'s aspect ratio that fits in `target`.
///
/// `scale = min(tw / cw, th / ch)`; each side is truncated, so an extreme
/// aspect ratio can yield 0, which [`resize_image`] rejects.
pub fn fit_within(captured: Size, target: Size) -> Size {
    let scale = f32::min(
        target.width as f32 / captured.width as f32,
        target.height as f32 / captured.height as f32,
    );
    Size {
        width: (captured.width as f32 * scale) as u32,
        height: (captured.height as f32 * scale) as u32,
    }
}
