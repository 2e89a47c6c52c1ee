use crate::bitmap::Bitmap;
use crate::effects;
use crate::gpu::{BlendState, RenderBackend};
use crate::target::RenderTarget;
use crate::types::{Color, Rect, Size, Tone};

/// Drawing surface handed to [`crate::Drawable::paint`].
///
/// Wraps a bound render target together with the current clip rectangle and
/// coordinate origin. Nested viewports push a clip and origin while their
/// children paint.
pub struct Canvas<'a, B: RenderBackend> {
    backend: &'a mut B,
    target: &'a RenderTarget<B>,
    scratch: Option<&'a RenderTarget<B>>,
    frames: Vec<ClipFrame>,
}

#[derive(Debug, Clone, Copy)]
struct ClipFrame {
    clip: Rect,
    origin: (i32, i32),
}

impl<'a, B: RenderBackend> Canvas<'a, B> {
    pub(crate) fn new(
        backend: &'a mut B,
        target: &'a RenderTarget<B>,
        scratch: Option<&'a RenderTarget<B>>,
    ) -> Self {
        Self {
            backend,
            target,
            scratch,
            frames: vec![ClipFrame {
                clip: target.rect(),
                origin: (0, 0),
            }],
        }
    }

    fn frame(&self) -> ClipFrame {
        self.frames
            .last()
            .copied()
            .unwrap_or(ClipFrame {
                clip: self.target.rect(),
                origin: (0, 0),
            })
    }

    pub fn size(&self) -> Size {
        self.target.size()
    }

    /// Area drawing is currently clipped to, in target pixels.
    pub fn viewport_rect(&self) -> Rect {
        self.frame().clip
    }

    pub fn origin(&self) -> (i32, i32) {
        self.frame().origin
    }

    pub fn backend(&mut self) -> &mut B {
        self.backend
    }

    /// Fills `rect` (relative to the current origin) with `color`.
    pub fn fill_rect(&mut self, rect: Rect, color: Color) {
        let frame = self.frame();
        let rect = rect.translate(frame.origin.0, frame.origin.1);
        self.backend
            .fill_rect(self.target.raw(), rect, frame.clip, color);
    }

    /// Draws `src_rect` of `source` stretched into `dst_rect`.
    pub fn blit(&mut self, source: &RenderTarget<B>, src_rect: Rect, dst_rect: Rect, opacity: f32) {
        let frame = self.frame();
        let dst_rect = dst_rect.translate(frame.origin.0, frame.origin.1);
        self.backend.blit(
            source.raw(),
            src_rect,
            self.target.raw(),
            dst_rect,
            Some(frame.clip),
            opacity,
            BlendState::Normal,
        );
    }

    /// Draws a whole bitmap at `(x, y)`. Disposed bitmaps draw nothing.
    pub fn blit_bitmap(&mut self, bitmap: &Bitmap<B>, x: i32, y: i32, opacity: f32) {
        let Some(source) = bitmap.target() else {
            return;
        };
        let size = source.size();
        self.blit(
            source,
            source.rect(),
            Rect::new(x, y, size.width as i32, size.height as i32),
            opacity,
        );
    }

    /// Applies tone and color/flash overlay to the current clip area.
    pub fn apply_viewport_effect(&mut self, color: Color, tone: Tone, flash: Color) {
        let clip = self.frame().clip;
        match self.scratch {
            Some(scratch) => effects::apply_viewport_effect(
                self.backend,
                self.target,
                scratch,
                clip,
                color,
                tone,
                flash,
            ),
            None => {
                if !effects::has_effect(color, tone, flash) {
                    return;
                }
                match RenderTarget::new(self.backend, self.target.size()) {
                    Ok(scratch) => effects::apply_viewport_effect(
                        self.backend,
                        self.target,
                        &scratch,
                        clip,
                        color,
                        tone,
                        flash,
                    ),
                    Err(err) => {
                        tracing::warn!(error = %err, "skipping viewport effect without scratch target")
                    }
                }
            }
        }
    }

    /// Restricts drawing to `clip` and moves the origin to `origin` until the
    /// matching [`Canvas::pop`].
    pub(crate) fn push(&mut self, clip: Rect, origin: (i32, i32)) {
        let current = self.frame();
        self.frames.push(ClipFrame {
            clip: current.clip.intersect(&clip),
            origin,
        });
    }

    pub(crate) fn pop(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::HeadlessBackend;

    #[test]
    fn pushed_clip_limits_fills_and_moves_origin() {
        let mut backend = HeadlessBackend::new(Size::new(8, 8));
        let target = RenderTarget::new(&mut backend, Size::new(8, 8)).unwrap();
        {
            let mut canvas = target.bind(&mut backend);
            canvas.push(Rect::new(4, 4, 4, 4), (4, 4));
            canvas.fill_rect(Rect::new(0, 0, 8, 8), Color::WHITE);
            assert_eq!(canvas.viewport_rect(), Rect::new(4, 4, 4, 4));
            canvas.pop();
            assert_eq!(canvas.viewport_rect(), Rect::new(0, 0, 8, 8));
        }
        assert_eq!(target.raw().pixel(3, 3), [0, 0, 0, 0]);
        assert_eq!(target.raw().pixel(4, 4), [255, 255, 255, 255]);
        assert_eq!(target.raw().pixel(7, 7), [255, 255, 255, 255]);
    }

    #[test]
    fn effect_without_scratch_uses_temporary_target() {
        let mut backend = HeadlessBackend::new(Size::new(2, 2));
        let target = RenderTarget::new(&mut backend, Size::new(2, 2)).unwrap();
        target.clear(&mut backend, Color::BLACK);
        {
            let mut canvas = target.bind(&mut backend);
            canvas.apply_viewport_effect(Color::WHITE, Tone::default(), Color::TRANSPARENT);
        }
        assert_eq!(target.raw().pixel(1, 1), [255, 255, 255, 255]);
    }
}
