//! Demo scene exercising the compositor API: planes, a toned viewport with a
//! flash, a sprite, masked transitions, fades and brightness changes.

use anyhow::Result;
use compositor::{
    Bitmap, Color, Compositor, DrawableId, Plane, Rect, RenderBackend, SignalLatch, Size, Sprite,
    Tone, Viewport, ViewportHandle,
};

/// Ticks per cycle of the demo script.
const CYCLE: u64 = 240;

struct Demo<B: RenderBackend> {
    drawables: Vec<DrawableId>,
    viewport: ViewportHandle,
    sprite: DrawableId,
    accent: DrawableId,
    mask: Bitmap<B>,
    tick: u64,
}

/// Runs the demo until quit is requested or `frame_limit` frames have been
/// produced. A reset request tears the scene down and rebuilds it.
pub fn run<B: RenderBackend>(
    compositor: &mut Compositor<B>,
    latch: &SignalLatch,
    frame_limit: Option<i64>,
) -> Result<()> {
    let mut demo = Demo::build(compositor)?;
    loop {
        if latch.quit() {
            tracing::info!("quit requested; leaving demo");
            break;
        }
        if frame_limit.is_some_and(|limit| compositor.frame_count() >= limit) {
            break;
        }
        if latch.take_reset() {
            compositor.reset();
            demo.teardown(compositor);
            demo = Demo::build(compositor)?;
            continue;
        }
        demo.step(compositor)?;
    }
    demo.teardown(compositor);
    Ok(())
}

impl<B: RenderBackend> Demo<B> {
    fn build(compositor: &mut Compositor<B>) -> Result<Self> {
        let size = compositor.resolution();
        let width = size.width as i32;
        let height = size.height as i32;

        let background = compositor.attach(
            -100,
            Box::new(Plane::filling(Color::from_rgba8(24, 28, 48, 255))),
        );
        let accent = compositor.attach(
            10,
            Box::new(Plane::new(
                Rect::new(width / 8, height / 8, width / 3, height / 3),
                Color::from_rgba8(220, 90, 60, 255),
            )),
        );

        let mut viewport = Viewport::new(Rect::new(width / 2, height / 2, width / 2, height / 2));
        viewport.tone = Tone::from_script(0, 0, 40, 128);
        let scene = compositor.scene_mut();
        let root = scene.root();
        let viewport = ViewportHandle::attach(scene, Some(root), 50, viewport);
        let inner = scene.attach(
            Some(viewport.children),
            0,
            Box::new(Plane::filling(Color::from_rgba8(80, 200, 120, 255))),
        );

        let sprite_bitmap = Bitmap::gradient_mask(compositor.backend_mut(), Size::new(32, 32))?;
        let sprite = compositor.attach(100, Box::new(Sprite::new(sprite_bitmap)));
        let mask = Bitmap::gradient_mask(compositor.backend_mut(), size)?;

        tracing::debug!("demo scene built");
        Ok(Self {
            drawables: vec![background, accent, viewport.id, inner, sprite],
            viewport,
            sprite,
            accent,
            mask,
            tick: 0,
        })
    }

    fn step(&mut self, compositor: &mut Compositor<B>) -> Result<()> {
        let phase = self.tick % CYCLE;
        self.tick += 1;
        match phase {
            60 => {
                if let Some(viewport) = self.viewport.get_mut(compositor.scene_mut()) {
                    viewport.flash(Color::WHITE, 30);
                }
                compositor.update()?;
            }
            120 => {
                compositor.freeze();
                self.swap_accent(compositor);
                compositor.transition(40, Some(&self.mask), 64)?;
            }
            180 => {
                compositor.fade_out(20)?;
                compositor.fade_in(20)?;
            }
            200 => {
                compositor.set_brightness(180);
                compositor.update()?;
            }
            230 => {
                compositor.set_brightness(255);
                compositor.update()?;
            }
            _ => {
                self.animate(compositor);
                compositor.update()?;
            }
        }
        Ok(())
    }

    fn animate(&mut self, compositor: &mut Compositor<B>) {
        let width = compositor.resolution().width as i32;
        let scene = compositor.scene_mut();
        if let Some(viewport) = self.viewport.get_mut(scene) {
            viewport.update();
        }
        if let Some(sprite) = scene.painter_mut::<Sprite<B>>(self.sprite) {
            sprite.x = (sprite.x + 2) % width.max(1);
            sprite.y = 8;
        }
    }

    fn swap_accent(&mut self, compositor: &mut Compositor<B>) {
        if let Some(plane) = compositor.scene_mut().painter_mut::<Plane>(self.accent) {
            plane.color = if plane.color.red > plane.color.blue {
                Color::from_rgba8(60, 90, 220, 255)
            } else {
                Color::from_rgba8(220, 90, 60, 255)
            };
        }
    }

    fn teardown(&mut self, compositor: &mut Compositor<B>) {
        for id in self.drawables.drain(..).rev() {
            compositor.detach(id);
        }
        self.mask.dispose();
    }
}
