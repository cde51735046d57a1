use image::{DynamicImage, GenericImageView, ImageFormat};

use super::{fit_dimensions, ThumbnailDecoder};
use crate::error::ThumbnailError;
use crate::format::tiff::IsolatedImage;

const NAME: &str = "raster";

/// Last resort: decode the whole isolated file with `image` and shrink it.
#[derive(Debug, Clone, Copy, Default)]
pub struct RasterDecoder;

impl ThumbnailDecoder for RasterDecoder {
    fn name(&self) -> &'static str {
        NAME
    }

    fn decode(&self, image: &IsolatedImage, target: u32) -> Result<DynamicImage, ThumbnailError> {
        let decoded = image::load_from_memory_with_format(&image.data, ImageFormat::Tiff)
            .map_err(|e| ThumbnailError::Decode {
                decoder: NAME,
                message: e.to_string(),
            })?;

        let (width, height) = decoded.dimensions();
        let (fit_width, fit_height) = fit_dimensions(width, height, target);
        Ok(decoded.thumbnail_exact(fit_width, fit_height))
    }
}
