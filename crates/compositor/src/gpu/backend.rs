use crate::types::{Color, Rect, Size, Tone};

/// Errors surfaced by backend operations after initialisation succeeded.
#[derive(Debug, thiserror::Error)]
pub enum GpuError {
    #[error("surface error: {0}")]
    Surface(String),
    #[error("pixel read-back failed: {0}")]
    Readback(String),
    #[error("requested texture {width}x{height} exceeds device limit {limit}")]
    TextureTooLarge { width: u32, height: u32, limit: u32 },
    #[error("pixel buffer holds {actual} bytes, expected {expected}")]
    PixelLength { expected: usize, actual: usize },
}

/// Rejects regions that are empty or reach outside a `size` target.
pub(crate) fn check_region(size: Size, rect: Rect) -> Result<(), GpuError> {
    if rect.is_empty()
        || rect.x < 0
        || rect.y < 0
        || rect.right() > size.width as i32
        || rect.bottom() > size.height as i32
    {
        return Err(GpuError::Readback(format!(
            "rect {rect:?} is outside of {}x{} target",
            size.width, size.height
        )));
    }
    Ok(())
}

/// Per-draw blending state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlendState {
    /// Source-over alpha blending.
    #[default]
    Normal,
    /// Blending disabled; the source replaces the destination.
    Replace,
}

/// Every graphics call the compositor makes goes through this trait.
///
/// Offscreen targets use a top-left origin: row 0 of a target is the top of
/// the logical image, both when drawing and when sampling. The window used by
/// [`RenderBackend::present`] has a bottom-left origin, which is why the
/// presenter flips its destination rectangle.
///
/// Targets are only ever touched from the thread that owns the backend.
pub trait RenderBackend: 'static {
    /// Owned GPU storage for one render target. Dropping it releases the
    /// storage.
    type Target;

    fn create_target(&mut self, size: Size) -> Result<Self::Target, GpuError>;

    /// Reallocates `target` at `size`. Previous contents are undefined.
    fn alloc_target(&mut self, target: &mut Self::Target, size: Size) -> Result<(), GpuError>;

    fn target_size(&self, target: &Self::Target) -> Size;

    fn clear(&mut self, target: &Self::Target, color: Color);

    /// Fills `rect` with `color`, clipped to `clip`, alpha blended.
    fn fill_rect(&mut self, target: &Self::Target, rect: Rect, clip: Rect, color: Color);

    #[allow(clippy::too_many_arguments)]
    fn blit(
        &mut self,
        src: &Self::Target,
        src_rect: Rect,
        dst: &Self::Target,
        dst_rect: Rect,
        clip: Option<Rect>,
        opacity: f32,
        blend: BlendState,
    );

    /// Writes `mix(frozen, current, progress)` into `dst` with blending disabled.
    fn crossfade(
        &mut self,
        frozen: &Self::Target,
        current: &Self::Target,
        dst: &Self::Target,
        progress: f32,
    );

    /// Threshold dissolve driven by the red channel of `mask`; `vague` is the
    /// width of the soft edge in `0..=1`.
    #[allow(clippy::too_many_arguments)]
    fn dissolve(
        &mut self,
        frozen: &Self::Target,
        current: &Self::Target,
        mask: &Self::Target,
        dst: &Self::Target,
        progress: f32,
        vague: f32,
    );

    /// Samples `src`, applies `tone` then overlays `color`, and writes the
    /// result into `dst` inside `clip` with blending disabled.
    fn viewport_effect(
        &mut self,
        src: &Self::Target,
        dst: &Self::Target,
        clip: Rect,
        tone: Tone,
        color: Color,
    );

    /// Clears the window, draws `src_rect` of `src` into `dst_rect` (window
    /// space, bottom-left origin) and swaps buffers.
    fn present(&mut self, src: &Self::Target, src_rect: Rect, dst_rect: Rect)
        -> Result<(), GpuError>;

    /// Blocking read-back of `rect` as tightly packed RGBA8 rows, top row first.
    fn read_pixels(&mut self, target: &Self::Target, rect: Rect) -> Result<Vec<u8>, GpuError>;

    fn write_pixels(
        &mut self,
        target: &Self::Target,
        rect: Rect,
        data: &[u8],
    ) -> Result<(), GpuError>;

    /// Current physical window size in pixels.
    fn window_size(&self) -> Size;

    fn native_window_handle(&self) -> Option<u64> {
        None
    }
}
