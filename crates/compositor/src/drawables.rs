//! Leaf drawables used by the runner and by tests.

use std::any::Any;

use crate::bitmap::Bitmap;
use crate::canvas::Canvas;
use crate::gpu::RenderBackend;
use crate::scene::{Drawable, ViewportRect};
use crate::types::{Color, Rect};

/// Solid rectangle. A filling plane tracks its parent's geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct Plane {
    rect: Rect,
    pub color: Color,
    fill_viewport: bool,
    viewport_changes: u32,
}

impl Plane {
    pub fn new(rect: Rect, color: Color) -> Self {
        Self {
            rect,
            color,
            fill_viewport: false,
            viewport_changes: 0,
        }
    }

    /// A plane that always covers its parent's whole rectangle.
    pub fn filling(color: Color) -> Self {
        Self {
            rect: Rect::default(),
            color,
            fill_viewport: true,
            viewport_changes: 0,
        }
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub fn set_rect(&mut self, rect: Rect) {
        self.rect = rect;
        self.fill_viewport = false;
    }

    /// Geometry notifications received so far.
    pub fn viewport_changes(&self) -> u32 {
        self.viewport_changes
    }
}

impl<B: RenderBackend> Drawable<B> for Plane {
    fn paint(&mut self, canvas: &mut Canvas<'_, B>) {
        if self.fill_viewport && self.rect.is_empty() {
            let clip = canvas.viewport_rect();
            let (x, y) = canvas.origin();
            self.rect = Rect::new(clip.x - x, clip.y - y, clip.width, clip.height);
        }
        canvas.fill_rect(self.rect, self.color);
    }

    fn on_viewport_changed(&mut self, viewport: &ViewportRect) {
        self.viewport_changes += 1;
        if self.fill_viewport {
            self.rect = Rect::new(
                viewport.ox,
                viewport.oy,
                viewport.rect.width,
                viewport.rect.height,
            );
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Draws a bitmap (or part of it) at a position with opacity.
pub struct Sprite<B: RenderBackend> {
    bitmap: Bitmap<B>,
    pub src_rect: Option<Rect>,
    pub x: i32,
    pub y: i32,
    pub ox: i32,
    pub oy: i32,
    pub opacity: u8,
}

impl<B: RenderBackend> Sprite<B> {
    pub fn new(bitmap: Bitmap<B>) -> Self {
        Self {
            bitmap,
            src_rect: None,
            x: 0,
            y: 0,
            ox: 0,
            oy: 0,
            opacity: u8::MAX,
        }
    }

    pub fn bitmap(&self) -> &Bitmap<B> {
        &self.bitmap
    }

    pub fn bitmap_mut(&mut self) -> &mut Bitmap<B> {
        &mut self.bitmap
    }
}

impl<B: RenderBackend> Drawable<B> for Sprite<B> {
    fn paint(&mut self, canvas: &mut Canvas<'_, B>) {
        if self.opacity == 0 {
            return;
        }
        let Some(source) = self.bitmap.target() else {
            return;
        };
        let src_rect = self
            .src_rect
            .map_or(source.rect(), |rect| rect.intersect(&source.rect()));
        if src_rect.is_empty() {
            return;
        }
        let dst_rect = Rect::new(
            self.x - self.ox,
            self.y - self.oy,
            src_rect.width,
            src_rect.height,
        );
        canvas.blit(source, src_rect, dst_rect, self.opacity as f32 / 255.0);
    }

    fn dispose(&mut self) {
        self.bitmap.dispose();
    }

    fn is_disposed(&self) -> bool {
        self.bitmap.is_disposed()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::HeadlessBackend;
    use crate::target::RenderTarget;
    use crate::types::Size;

    #[test]
    fn filling_plane_handles_repeated_geometry() {
        let mut plane = Plane::filling(Color::BLACK);
        let viewport = ViewportRect::new(Rect::new(10, 10, 32, 16));
        Drawable::<HeadlessBackend>::on_viewport_changed(&mut plane, &viewport);
        let first = plane.rect();
        Drawable::<HeadlessBackend>::on_viewport_changed(&mut plane, &viewport);
        assert_eq!(plane.rect(), first);
        assert_eq!(first, Rect::new(0, 0, 32, 16));
    }

    #[test]
    fn sprite_draws_source_region() {
        let mut backend = HeadlessBackend::new(Size::new(8, 8));
        let bitmap = Bitmap::new(&mut backend, Size::new(4, 4)).unwrap();
        bitmap.fill_rect(&mut backend, Rect::new(2, 0, 2, 4), Color::WHITE);
        let mut sprite = Sprite::new(bitmap);
        sprite.src_rect = Some(Rect::new(2, 0, 2, 2));
        sprite.x = 5;
        sprite.y = 1;

        let target = RenderTarget::new(&mut backend, Size::new(8, 8)).unwrap();
        {
            let mut canvas = target.bind(&mut backend);
            sprite.paint(&mut canvas);
        }
        assert_eq!(target.raw().pixel(5, 1), [255, 255, 255, 255]);
        assert_eq!(target.raw().pixel(6, 2), [255, 255, 255, 255]);
        assert_eq!(target.raw().pixel(4, 1), [0, 0, 0, 0]);
        assert_eq!(target.raw().pixel(5, 3), [0, 0, 0, 0]);
    }

    #[test]
    fn disposing_sprite_disposes_bitmap() {
        let mut backend = HeadlessBackend::new(Size::new(4, 4));
        let bitmap = Bitmap::new(&mut backend, Size::new(2, 2)).unwrap();
        let mut sprite = Sprite::new(bitmap);
        Drawable::<HeadlessBackend>::dispose(&mut sprite);
        assert!(sprite.bitmap().is_disposed());
        assert!(Drawable::<HeadlessBackend>::is_disposed(&sprite));
    }
}
