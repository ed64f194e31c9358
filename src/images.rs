//! Image decoding helpers shared by the renderers.
//!
//! Logos are the only images placed on reports.  Decoding goes through the
//! [`image`] crate so that the format is sniffed from the content instead of
//! the file extension.

use std::path::Path;

use image::GenericImageView;

use crate::error::RenderError;

/// Loads an image from in-memory bytes.
pub fn decode_image_from_bytes(bytes: impl AsRef<[u8]>) -> Result<image::DynamicImage, RenderError> {
    image::load_from_memory(bytes.as_ref())
        .map_err(|err| RenderError::Image(format!("failed to decode image from bytes: {err}")))
}

/// Loads an image from `path`, guessing the format from its content.
pub fn decode_image_from_path(path: impl AsRef<Path>) -> Result<image::DynamicImage, RenderError> {
    let path = path.as_ref();
    let reader = image::io::Reader::open(path).map_err(|err| RenderError::io(path, err))?;
    reader
        .with_guessed_format()
        .map_err(|err| RenderError::io(path, err))?
        .decode()
        .map_err(|err| {
            RenderError::Image(format!("failed to decode image file {}: {err}", path.display()))
        })
}

/// Uniform scale that fits `image`, placed at `dpi`, into a `width` x `height`
/// box given in points.
pub fn fit_scale(image: &image::DynamicImage, width: f64, height: f64, dpi: f64) -> f64 {
    let (px_width, px_height) = image.dimensions();
    if px_width == 0 || px_height == 0 {
        return 1.0;
    }
    let natural_width = px_width as f64 * 72.0 / dpi;
    let natural_height = px_height as f64 * 72.0 / dpi;
    (width / natural_width).min(height / natural_height)
}
