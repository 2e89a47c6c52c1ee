use crate::canvas::Canvas;
use crate::gpu::{GpuError, RenderBackend};
use crate::types::{Color, Rect, Size};

/// One texture usable both as a draw destination and as a sample source.
///
/// The backend storage is owned here and released once when the wrapper is
/// dropped. Construction always goes through a backend, so a target cannot
/// exist without a graphics context.
pub struct RenderTarget<B: RenderBackend> {
    raw: B::Target,
    size: Size,
}

impl<B: RenderBackend> RenderTarget<B> {
    pub fn new(backend: &mut B, size: Size) -> Result<Self, GpuError> {
        let raw = backend.create_target(size)?;
        let size = backend.target_size(&raw);
        Ok(Self { raw, size })
    }

    /// Reallocates storage at `size`; previous contents are lost.
    pub fn alloc(&mut self, backend: &mut B, size: Size) -> Result<(), GpuError> {
        backend.alloc_target(&mut self.raw, size)?;
        self.size = backend.target_size(&self.raw);
        Ok(())
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn rect(&self) -> Rect {
        Rect::from_size(self.size)
    }

    pub fn raw(&self) -> &B::Target {
        &self.raw
    }

    pub fn clear(&self, backend: &mut B, color: Color) {
        backend.clear(&self.raw, color);
    }

    /// Binds this target as the draw destination. The binding lasts as long
    /// as the returned canvas.
    pub fn bind<'a>(&'a self, backend: &'a mut B) -> Canvas<'a, B> {
        Canvas::new(backend, self, None)
    }

    /// Blocking read-back of `rect` as RGBA8, top row first.
    pub fn read_pixels(&self, backend: &mut B, rect: Rect) -> Result<Vec<u8>, GpuError> {
        backend.read_pixels(&self.raw, rect)
    }

    pub fn write_pixels(&self, backend: &mut B, rect: Rect, data: &[u8]) -> Result<(), GpuError> {
        backend.write_pixels(&self.raw, rect, data)
    }
}

impl<B: RenderBackend> std::fmt::Debug for RenderTarget<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderTarget")
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::{Command, HeadlessBackend};

    #[test]
    fn alloc_replaces_storage_in_place() {
        let mut backend = HeadlessBackend::new(Size::new(8, 8));
        let mut target = RenderTarget::new(&mut backend, Size::new(4, 4)).unwrap();
        let id = target.raw().id();
        target.alloc(&mut backend, Size::new(6, 2)).unwrap();
        assert_eq!(target.size(), Size::new(6, 2));
        assert_eq!(
            backend.commands().last(),
            Some(&Command::Allocate {
                target: id,
                size: Size::new(6, 2)
            })
        );
    }

    #[test]
    fn read_back_returns_written_rows() {
        let mut backend = HeadlessBackend::new(Size::new(8, 8));
        let target = RenderTarget::new(&mut backend, Size::new(2, 2)).unwrap();
        target.clear(&mut backend, Color::from_rgba8(10, 20, 30, 255));
        let pixels = target.read_pixels(&mut backend, target.rect()).unwrap();
        assert_eq!(pixels.len(), 16);
        assert_eq!(&pixels[12..16], &[10, 20, 30, 255]);
    }
}
