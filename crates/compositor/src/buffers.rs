use crate::gpu::{GpuError, RenderBackend};
use crate::target::RenderTarget;
use crate::types::Size;

/// Screen targets: the front/back pair used for compositing, post effects and
/// transition output, plus the frozen snapshot.
///
/// All three always share one size.
pub struct BufferSet<B: RenderBackend> {
    front: RenderTarget<B>,
    back: RenderTarget<B>,
    frozen: RenderTarget<B>,
}

impl<B: RenderBackend> BufferSet<B> {
    pub fn new(backend: &mut B, size: Size) -> Result<Self, GpuError> {
        Ok(Self {
            front: RenderTarget::new(backend, size)?,
            back: RenderTarget::new(backend, size)?,
            frozen: RenderTarget::new(backend, size)?,
        })
    }

    /// Reallocates every target at `size`.
    pub fn resize(&mut self, backend: &mut B, size: Size) -> Result<(), GpuError> {
        self.front.alloc(backend, size)?;
        self.back.alloc(backend, size)?;
        self.frozen.alloc(backend, size)?;
        tracing::debug!(width = size.width, height = size.height, "resized screen buffers");
        Ok(())
    }

    pub fn size(&self) -> Size {
        self.front.size()
    }

    pub fn front(&self) -> &RenderTarget<B> {
        &self.front
    }

    pub fn back(&self) -> &RenderTarget<B> {
        &self.back
    }

    pub fn frozen(&self) -> &RenderTarget<B> {
        &self.frozen
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::{Command, HeadlessBackend};

    #[test]
    fn resize_reallocates_all_three() {
        let mut backend = HeadlessBackend::new(Size::new(8, 8));
        let mut buffers = BufferSet::new(&mut backend, Size::new(4, 4)).unwrap();
        backend.clear_commands();
        buffers.resize(&mut backend, Size::new(6, 3)).unwrap();
        let allocations = backend
            .commands()
            .into_iter()
            .filter(|command| {
                matches!(command, Command::Allocate { size, .. } if *size == Size::new(6, 3))
            })
            .count();
        assert_eq!(allocations, 3);
        assert_eq!(buffers.size(), Size::new(6, 3));
        assert_eq!(buffers.frozen().size(), Size::new(6, 3));
    }
}
