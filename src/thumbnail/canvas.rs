use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgba, RgbaImage};

/// A thumbnail-sized canvas that decoded chunks are shrunk onto one at a
/// time, so a full-resolution directory is never held in memory.
pub(crate) struct ChunkCanvas {
    image: RgbaImage,
    scale_x: f64,
    scale_y: f64,
    has_alpha: bool,
}

impl ChunkCanvas {
    /// Canvas of `canvas_width` x `canvas_height` for a source of
    /// `source_width` x `source_height` pixels.
    pub fn new(source_width: u32, source_height: u32, canvas_width: u32, canvas_height: u32) -> Self {
        Self {
            image: RgbaImage::from_pixel(canvas_width, canvas_height, Rgba([255, 255, 255, 255])),
            scale_x: canvas_width as f64 / source_width.max(1) as f64,
            scale_y: canvas_height as f64 / source_height.max(1) as f64,
            has_alpha: false,
        }
    }

    /// Shrink `chunk` onto the canvas area of the `w` x `h` source region
    /// at `(x, y)`. The region is larger than the chunk when one decoded
    /// chunk stands in for a block of chunks.
    pub fn paste_span(&mut self, chunk: &DynamicImage, x: u32, y: u32, w: u32, h: u32) {
        let x0 = self.scaled(x, self.scale_x, self.image.width());
        let x1 = self.scaled(x.saturating_add(w), self.scale_x, self.image.width());
        let y0 = self.scaled(y, self.scale_y, self.image.height());
        let y1 = self.scaled(y.saturating_add(h), self.scale_y, self.image.height());
        if x1 <= x0 || y1 <= y0 {
            return;
        }

        self.has_alpha |= chunk.color().has_alpha();
        let resized = imageops::resize(&chunk.to_rgba8(), x1 - x0, y1 - y0, FilterType::Triangle);
        imageops::replace(&mut self.image, &resized, x0 as i64, y0 as i64);
    }

    fn scaled(&self, value: u32, scale: f64, limit: u32) -> u32 {
        ((value as f64 * scale).round() as u32).min(limit)
    }

    pub fn into_image(self) -> DynamicImage {
        let image = DynamicImage::ImageRgba8(self.image);
        if self.has_alpha {
            image
        } else {
            DynamicImage::ImageRgb8(image.to_rgb8())
        }
    }
}
