use std::any::Any;

use crate::canvas::Canvas;
use crate::gpu::RenderBackend;
use crate::scene::{Drawable, DrawableId, ParentId, Scene, ViewportRect};
use crate::types::{Color, Rect, Tone};

/// A clipped sub-scene with its own color, tone and flash.
///
/// Children attached to [`ViewportHandle::children`] are composited inside
/// `rect`, shifted by `(-ox, -oy)`, and then the effect pass runs over the
/// same rectangle.
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    rect: Rect,
    ox: i32,
    oy: i32,
    pub color: Color,
    pub tone: Tone,
    flash: Option<Flash>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Flash {
    color: Color,
    duration: u32,
    remaining: u32,
}

impl Viewport {
    pub fn new(rect: Rect) -> Self {
        Self {
            rect,
            ox: 0,
            oy: 0,
            color: Color::TRANSPARENT,
            tone: Tone::default(),
            flash: None,
        }
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub fn offset(&self) -> (i32, i32) {
        (self.ox, self.oy)
    }

    pub fn viewport_rect(&self) -> ViewportRect {
        ViewportRect {
            rect: self.rect,
            ox: self.ox,
            oy: self.oy,
        }
    }

    /// Starts a flash that fades out linearly over `duration` updates.
    pub fn flash(&mut self, color: Color, duration: u32) {
        if duration == 0 {
            self.flash = None;
            return;
        }
        self.flash = Some(Flash {
            color,
            duration,
            remaining: duration,
        });
    }

    /// Advances the flash by one tick.
    pub fn update(&mut self) {
        if let Some(flash) = &mut self.flash {
            flash.remaining = flash.remaining.saturating_sub(1);
            if flash.remaining == 0 {
                self.flash = None;
            }
        }
    }

    /// Flash color at the current tick, transparent when idle.
    pub fn current_flash(&self) -> Color {
        match self.flash {
            Some(flash) => {
                let scale = flash.remaining as f32 / flash.duration as f32;
                flash.color.with_alpha(flash.color.alpha * scale)
            }
            None => Color::TRANSPARENT,
        }
    }

    pub fn is_flashing(&self) -> bool {
        self.flash.is_some()
    }
}

impl<B: RenderBackend> Drawable<B> for Viewport {
    fn paint(&mut self, canvas: &mut Canvas<'_, B>) {
        canvas.apply_viewport_effect(self.color, self.tone, self.current_flash());
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Scene handles for an attached [`Viewport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewportHandle {
    pub id: DrawableId,
    pub children: ParentId,
}

impl ViewportHandle {
    /// Adds `viewport` to `scene` under `parent` at `z`.
    pub fn attach<B: RenderBackend>(
        scene: &mut Scene<B>,
        parent: Option<ParentId>,
        z: i32,
        viewport: Viewport,
    ) -> Self {
        let geometry = viewport.viewport_rect();
        let (id, children) = scene.attach_group(parent, z, Box::new(viewport), geometry);
        Self { id, children }
    }

    pub fn get<'a, B: RenderBackend>(&self, scene: &'a Scene<B>) -> Option<&'a Viewport> {
        scene.painter::<Viewport>(self.id)
    }

    pub fn get_mut<'a, B: RenderBackend>(&self, scene: &'a mut Scene<B>) -> Option<&'a mut Viewport> {
        scene.painter_mut::<Viewport>(self.id)
    }

    /// Moves the clip rectangle and tells the children about it.
    pub fn set_rect<B: RenderBackend>(&self, scene: &mut Scene<B>, rect: Rect) {
        self.reshape(scene, |viewport| viewport.rect = rect);
    }

    /// Scrolls the children by `(ox, oy)`.
    pub fn set_offset<B: RenderBackend>(&self, scene: &mut Scene<B>, ox: i32, oy: i32) {
        self.reshape(scene, |viewport| {
            viewport.ox = ox;
            viewport.oy = oy;
        });
    }

    fn reshape<B: RenderBackend>(&self, scene: &mut Scene<B>, change: impl FnOnce(&mut Viewport)) {
        let Some(viewport) = scene.painter_mut::<Viewport>(self.id) else {
            return;
        };
        let before = viewport.viewport_rect();
        change(viewport);
        let after = viewport.viewport_rect();
        if before == after {
            return;
        }
        scene.set_parent_viewport(self.children, after);
        scene.notify_viewport_changed(self.children);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drawables::Plane;
    use crate::gpu::HeadlessBackend;
    use crate::target::RenderTarget;
    use crate::types::Size;

    #[test]
    fn flash_decays_linearly_then_stops() {
        let mut viewport = Viewport::new(Rect::new(0, 0, 4, 4));
        viewport.flash(Color::WHITE, 4);
        assert_eq!(viewport.current_flash().alpha, 1.0);
        viewport.update();
        assert_eq!(viewport.current_flash().alpha, 0.75);
        viewport.update();
        viewport.update();
        viewport.update();
        assert!(!viewport.is_flashing());
        assert_eq!(viewport.current_flash(), Color::TRANSPARENT);
    }

    #[test]
    fn children_are_clipped_and_offset() {
        let mut backend = HeadlessBackend::new(Size::new(8, 8));
        let target = RenderTarget::new(&mut backend, Size::new(8, 8)).unwrap();
        let mut scene: Scene<HeadlessBackend> =
            Scene::new(ViewportRect::new(Rect::new(0, 0, 8, 8)));
        let root = scene.root();
        let handle =
            ViewportHandle::attach(&mut scene, Some(root), 0, Viewport::new(Rect::new(2, 2, 4, 4)));
        handle.set_offset(&mut scene, 1, 1);
        scene.attach(
            Some(handle.children),
            0,
            Box::new(Plane::new(Rect::new(0, 0, 2, 2), Color::WHITE)),
        );

        {
            let mut canvas = target.bind(&mut backend);
            scene.composite(root, &mut canvas);
        }
        // Plane at (0,0) shifted by (2-1, 2-1) and clipped to start at (2,2).
        assert_eq!(target.raw().pixel(1, 1), [0, 0, 0, 0]);
        assert_eq!(target.raw().pixel(2, 2), [255, 255, 255, 255]);
        assert_eq!(target.raw().pixel(3, 3), [0, 0, 0, 0]);
    }

    #[test]
    fn reshape_notifies_children_once_per_change() {
        let mut scene: Scene<HeadlessBackend> =
            Scene::new(ViewportRect::new(Rect::new(0, 0, 8, 8)));
        let root = scene.root();
        let handle =
            ViewportHandle::attach(&mut scene, Some(root), 0, Viewport::new(Rect::new(0, 0, 8, 8)));
        let plane = scene.attach(
            Some(handle.children),
            0,
            Box::new(Plane::filling(Color::WHITE)),
        );
        handle.set_rect(&mut scene, Rect::new(0, 0, 3, 3));
        handle.set_rect(&mut scene, Rect::new(0, 0, 3, 3));
        let plane = scene.painter::<Plane>(plane).unwrap();
        assert_eq!(plane.rect(), Rect::new(0, 0, 3, 3));
        assert_eq!(plane.viewport_changes(), 1);
    }
}
