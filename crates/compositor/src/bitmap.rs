use std::path::Path;

use anyhow::{Context, Result};
use image::RgbaImage;

use crate::gpu::{GpuError, RenderBackend};
use crate::target::RenderTarget;
use crate::types::{Color, Rect, Size};

/// Script-visible image resource backed by its own render target.
///
/// Disposing releases the GPU storage immediately; the bitmap keeps its size
/// so callers can still query it.
pub struct Bitmap<B: RenderBackend> {
    target: Option<RenderTarget<B>>,
    size: Size,
}

impl<B: RenderBackend> Bitmap<B> {
    /// Allocates a transparent bitmap.
    pub fn new(backend: &mut B, size: Size) -> Result<Self, GpuError> {
        let target = RenderTarget::new(backend, size)?;
        target.clear(backend, Color::TRANSPARENT);
        Ok(Self::from_target(target))
    }

    pub(crate) fn from_target(target: RenderTarget<B>) -> Self {
        let size = target.size();
        Self {
            target: Some(target),
            size,
        }
    }

    pub fn from_image(backend: &mut B, image: &RgbaImage) -> Result<Self, GpuError> {
        let size = Size::new(image.width(), image.height());
        let target = RenderTarget::new(backend, size)?;
        target.write_pixels(backend, target.rect(), image.as_raw())?;
        Ok(Self::from_target(target))
    }

    /// Decodes an image file (PNG, JPEG, BMP or GIF) into a new bitmap.
    pub fn load(backend: &mut B, path: &Path) -> Result<Self> {
        let image = image::open(path)
            .with_context(|| format!("failed to load image at {}", path.display()))?
            .to_rgba8();
        Self::from_image(backend, &image)
            .with_context(|| format!("failed to upload image at {}", path.display()))
    }

    /// Horizontal ramp from black on the left to white on the right, usable as
    /// a wipe mask for [`crate::Compositor::transition`].
    pub fn gradient_mask(backend: &mut B, size: Size) -> Result<Self, GpuError> {
        let width = size.width.max(1);
        let image = RgbaImage::from_fn(width, size.height.max(1), |x, _| {
            let level = if width == 1 {
                0
            } else {
                (x * 255 / (width - 1)) as u8
            };
            image::Rgba([level, level, level, 255])
        });
        Self::from_image(backend, &image)
    }

    /// Reads the bitmap back into a CPU image.
    pub fn to_image(&self, backend: &mut B) -> Result<RgbaImage, GpuError> {
        let target = self
            .target
            .as_ref()
            .ok_or_else(|| GpuError::Readback("bitmap is disposed".into()))?;
        let pixels = target.read_pixels(backend, target.rect())?;
        RgbaImage::from_raw(self.size.width, self.size.height, pixels)
            .ok_or_else(|| GpuError::Readback("read-back returned a short buffer".into()))
    }

    pub fn dispose(&mut self) {
        if self.target.take().is_some() {
            tracing::debug!(
                width = self.size.width,
                height = self.size.height,
                "disposed bitmap"
            );
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.target.is_none()
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn rect(&self) -> Rect {
        Rect::from_size(self.size)
    }

    /// Backing target; `None` once disposed.
    pub fn target(&self) -> Option<&RenderTarget<B>> {
        self.target.as_ref()
    }

    pub fn fill_rect(&self, backend: &mut B, rect: Rect, color: Color) {
        if let Some(target) = &self.target {
            backend.fill_rect(target.raw(), rect, target.rect(), color);
        }
    }
}
