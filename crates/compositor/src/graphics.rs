//! The compositor: per-tick composite, post effects, presentation and the
//! freeze/transition/fade state machine.

use std::sync::Arc;

use anyhow::{bail, Context, Result};

use crate::bitmap::Bitmap;
use crate::buffers::BufferSet;
use crate::canvas::Canvas;
use crate::cancel::{BindingNotifier, Cancellation, EngineEvent, EventSink, NullSink, RequestFlags};
use crate::effects::{self, ScreenQuad};
use crate::gpu::{BlendState, GpuError, RenderBackend};
use crate::pacing::{Clock, FrameLimiter, SystemClock};
use crate::present::present_screen;
use crate::scene::{Drawable, DrawableId, Scene, ViewportRect};
use crate::target::RenderTarget;
use crate::types::{Color, CompositorConfig, ContentVersion, Rect, Size, Tone};

/// What the compositor does on the next tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Composite and present the live scene.
    Normal,
    /// Hold the frozen snapshot; the live scene is not composited.
    Frozen,
    /// Inside [`Compositor::transition`].
    Transitioning,
}

/// Everything the compositor talks to besides the GPU.
pub struct Collaborators {
    pub flags: Arc<RequestFlags>,
    pub notifier: Box<dyn BindingNotifier>,
    pub events: Box<dyn EventSink>,
    pub clock: Box<dyn Clock>,
}

impl Collaborators {
    /// Real clock, no event delivery.
    pub fn new(flags: Arc<RequestFlags>, notifier: Box<dyn BindingNotifier>) -> Self {
        Self {
            flags,
            notifier,
            events: Box::new(NullSink),
            clock: Box::new(SystemClock),
        }
    }

    pub fn with_events(mut self, events: Box<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

pub struct Compositor<B: RenderBackend> {
    backend: B,
    buffers: BufferSet<B>,
    scene: Scene<B>,
    quad: ScreenQuad,
    resolution: Size,
    content_version: ContentVersion,
    allow_frame_skip: bool,
    mode: Mode,
    brightness: u8,
    frame_count: i64,
    average_fps: f32,
    limiter: FrameLimiter,
    cancel: Cancellation,
    events: Box<dyn EventSink>,
}

impl<B: RenderBackend> Compositor<B> {
    pub fn new(mut backend: B, config: &CompositorConfig, collaborators: Collaborators) -> Result<Self> {
        let resolution = config.resolution;
        if resolution.is_empty() {
            bail!("logical resolution {}x{} has no area", resolution.width, resolution.height);
        }
        let buffers = BufferSet::new(&mut backend, resolution)
            .context("failed to allocate screen buffers")?;
        let frame_rate = config
            .frame_rate
            .unwrap_or_else(|| config.content_version.default_frame_rate());
        let Collaborators {
            flags,
            notifier,
            events,
            clock,
        } = collaborators;
        let limiter = FrameLimiter::new(frame_rate, clock);

        tracing::info!(
            width = resolution.width,
            height = resolution.height,
            frame_rate = limiter.frame_rate(),
            content = ?config.content_version,
            frame_skip = config.allow_frame_skip,
            "compositor ready"
        );

        Ok(Self {
            backend,
            buffers,
            scene: Scene::new(ViewportRect::new(Rect::from_size(resolution))),
            quad: ScreenQuad::new(resolution),
            resolution,
            content_version: config.content_version,
            allow_frame_skip: config.allow_frame_skip,
            mode: Mode::Normal,
            brightness: u8::MAX,
            frame_count: 0,
            average_fps: 0.0,
            limiter,
            cancel: Cancellation::new(flags, notifier),
            events,
        })
    }

    /// One tick: composite and present unless frozen or skipping, then pace.
    pub fn update(&mut self) -> Result<(), GpuError> {
        if self.mode == Mode::Normal {
            if self.limiter.require_frame_skip() {
                if self.allow_frame_skip {
                    tracing::trace!(frame = self.frame_count, "skipping composite");
                    self.frame_process();
                    return Ok(());
                }
                self.limiter.reset();
            }
            self.composite_screen();
            present_screen(&mut self.backend, self.buffers.front())?;
        }

        self.frame_process();
        self.cancel.raise();
        Ok(())
    }

    /// Captures the current scene into the frozen snapshot.
    pub fn freeze(&mut self) {
        if self.mode == Mode::Frozen {
            tracing::debug!("freeze ignored: already frozen");
            return;
        }
        self.composite_screen();
        copy_target(&mut self.backend, self.buffers.front(), self.buffers.frozen());
        self.mode = Mode::Frozen;
        tracing::debug!("screen frozen");
    }

    /// Blends from the frozen snapshot to the live scene over `duration`
    /// ticks. With a `mask`, pixels switch in order of the mask's red channel
    /// with a soft edge `vague` levels wide (1..=256).
    pub fn transition(
        &mut self,
        duration: u32,
        mask: Option<&Bitmap<B>>,
        vague: i32,
    ) -> Result<(), GpuError> {
        if mask.is_some_and(|mask| mask.is_disposed()) {
            tracing::debug!("transition ignored: mask is disposed");
            return Ok(());
        }
        if self.mode != Mode::Frozen {
            tracing::debug!(mode = ?self.mode, "transition ignored: screen is not frozen");
            return Ok(());
        }

        self.brightness = u8::MAX;
        let vague = vague.clamp(1, 256) as f32 / 256.0;
        self.mode = Mode::Transitioning;
        let result = self.run_transition(duration, mask, vague);
        self.mode = Mode::Normal;
        self.cancel.raise();
        tracing::debug!(duration, "transition finished");
        result
    }

    fn run_transition(
        &mut self,
        duration: u32,
        mask: Option<&Bitmap<B>>,
        vague: f32,
    ) -> Result<(), GpuError> {
        self.composite_screen();
        let mask = mask.and_then(|mask| mask.target());
        for step in 0..duration {
            let progress = effects::transition_progress(step, duration);
            let frozen = self.buffers.frozen().raw();
            let current = self.buffers.front().raw();
            let output = self.buffers.back();
            match mask {
                Some(mask) => self.backend.dissolve(
                    frozen,
                    current,
                    mask.raw(),
                    output.raw(),
                    progress,
                    vague,
                ),
                None => self.backend.crossfade(frozen, current, output.raw(), progress),
            }
            present_screen(&mut self.backend, self.buffers.back())?;
            self.frame_process();
            if self.cancel.check() {
                tracing::debug!(step, "transition interrupted");
                break;
            }
        }
        Ok(())
    }

    /// Dims to black over `duration` ticks.
    pub fn fade_out(&mut self, duration: u32) -> Result<(), GpuError> {
        self.fade_to(0, duration)
    }

    /// Restores full brightness over `duration` ticks.
    pub fn fade_in(&mut self, duration: u32) -> Result<(), GpuError> {
        self.fade_to(u8::MAX, duration)
    }

    fn fade_to(&mut self, target: u8, duration: u32) -> Result<(), GpuError> {
        let duration = duration.max(1);
        let start = self.brightness;
        let result = self.run_fade(start, target, duration);
        self.brightness = target;
        self.cancel.raise();
        result
    }

    fn run_fade(&mut self, start: u8, target: u8, duration: u32) -> Result<(), GpuError> {
        for step in 0..duration {
            self.set_brightness(effects::fade_step(start, target, step, duration));
            if self.mode == Mode::Frozen {
                present_screen(&mut self.backend, self.buffers.frozen())?;
                self.frame_process();
            } else {
                self.update()?;
            }
            if self.cancel.check() {
                tracing::debug!(step, "fade interrupted");
                break;
            }
        }
        Ok(())
    }

    /// Runs `duration` plain updates.
    pub fn wait(&mut self, duration: u32) -> Result<(), GpuError> {
        for _ in 0..duration {
            self.update()?;
        }
        Ok(())
    }

    /// Changes the logical resolution. Every screen buffer is reallocated and
    /// top-level drawables are told about the new screen rectangle.
    pub fn resize_screen(&mut self, resolution: Size) -> Result<(), GpuError> {
        let resolution = resolution.at_least_one();
        if resolution == self.resolution {
            return Ok(());
        }
        self.buffers.resize(&mut self.backend, resolution)?;
        self.quad.resize(resolution);
        self.resolution = resolution;

        let root = self.scene.root();
        self.scene
            .set_parent_viewport(root, ViewportRect::new(Rect::from_size(resolution)));
        self.scene.notify_viewport_changed(root);
        tracing::info!(
            width = resolution.width,
            height = resolution.height,
            "logical resolution changed"
        );
        Ok(())
    }

    pub fn brightness(&self) -> u8 {
        self.brightness
    }

    /// Sets brightness, clamped to `0..=255`.
    pub fn set_brightness(&mut self, brightness: i32) {
        self.brightness = brightness.clamp(0, 255) as u8;
    }

    pub fn frame_rate(&self) -> u32 {
        self.limiter.frame_rate()
    }

    pub fn set_frame_rate(&mut self, rate: u32) {
        let applied = self.limiter.set_frame_rate(rate);
        if applied != rate {
            tracing::warn!(requested = rate, applied, "frame rate clamped");
        }
    }

    pub fn frame_count(&self) -> i64 {
        self.frame_count
    }

    pub fn set_frame_count(&mut self, count: i64) {
        self.frame_count = count;
    }

    /// Forgets pacing history so the next frame is not treated as late.
    pub fn frame_reset(&mut self) {
        self.limiter.reset();
    }

    pub fn average_fps(&self) -> f32 {
        self.average_fps
    }

    /// Composites the current scene into a new bitmap owned by the caller.
    pub fn snapshot_to_image(&mut self) -> Result<Bitmap<B>, GpuError> {
        self.composite_screen();
        let target = RenderTarget::new(&mut self.backend, self.resolution)?;
        copy_target(&mut self.backend, self.buffers.front(), &target);
        Ok(Bitmap::from_target(target))
    }

    /// Returns to a clean session: unfreezes, disposes every attached drawable
    /// from the bottom of the order up, and restores rate and brightness.
    pub fn reset(&mut self) {
        self.mode = Mode::Normal;
        let root = self.scene.root();
        self.scene.dispose_all_reverse(root);
        self.limiter
            .set_frame_rate(self.content_version.default_frame_rate());
        self.brightness = u8::MAX;
        self.limiter.reset();
        self.cancel.clear_reset();
        tracing::info!("compositor reset");
        self.cancel.raise();
    }

    /// Tone, color and flash over the whole front buffer.
    pub fn apply_viewport_effect(&mut self, color: Color, tone: Tone, flash: Color) {
        let front = self.buffers.front();
        effects::apply_viewport_effect(
            &mut self.backend,
            front,
            self.buffers.back(),
            front.rect(),
            color,
            tone,
            flash,
        );
    }

    /// Adds a drawable to the screen.
    pub fn attach(&mut self, z: i32, painter: Box<dyn Drawable<B>>) -> DrawableId {
        let root = self.scene.root();
        self.scene.attach(Some(root), z, painter)
    }

    pub fn detach(&mut self, id: DrawableId) -> Option<Box<dyn Drawable<B>>> {
        self.scene.destroy(id)
    }

    pub fn scene(&self) -> &Scene<B> {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene<B> {
        &mut self.scene
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Native window handle when the platform exposes one.
    pub fn window_handle(&self) -> Option<u64> {
        self.backend.native_window_handle()
    }

    pub fn content_version(&self) -> ContentVersion {
        self.content_version
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn resolution(&self) -> Size {
        self.resolution
    }

    pub fn quit_requested(&self) -> bool {
        self.cancel.flags().quit_requested()
    }

    pub fn reset_requested(&self) -> bool {
        self.cancel.flags().reset_requested()
    }

    pub fn flags(&self) -> &Arc<RequestFlags> {
        self.cancel.flags()
    }

    /// Offscreen screen buffers, for inspection.
    pub fn buffers(&self) -> &BufferSet<B> {
        &self.buffers
    }

    fn composite_screen(&mut self) {
        let front = self.buffers.front();
        front.clear(&mut self.backend, Color::TRANSPARENT);
        {
            let mut canvas = Canvas::new(&mut self.backend, front, Some(self.buffers.back()));
            let root = self.scene.root();
            self.scene.composite(root, &mut canvas);
        }
        if let Some(alpha) = effects::dim_alpha(self.brightness) {
            self.backend.fill_rect(
                front.raw(),
                self.quad.rect(),
                front.rect(),
                Color::BLACK.with_alpha(alpha),
            );
        }
    }

    fn frame_process(&mut self) {
        self.limiter.delay();
        self.frame_count += 1;
        self.average_fps = self.limiter.average_fps();
        self.events.emit(EngineEvent::FpsUpdated(self.average_fps));
    }
}

fn copy_target<B: RenderBackend>(backend: &mut B, src: &RenderTarget<B>, dst: &RenderTarget<B>) {
    backend.blit(
        src.raw(),
        src.rect(),
        dst.raw(),
        dst.rect(),
        None,
        1.0,
        BlendState::Replace,
    );
}
