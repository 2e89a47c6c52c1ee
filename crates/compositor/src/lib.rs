//! Frame compositor for the rgu engine.
//!
//! The crate owns the scene graph, the offscreen screen buffers, frame pacing
//! and the freeze/transition/fade state machine. Scripts drive it once per
//! logical tick:
//!
//! ```text
//!   script ──▶ Compositor::update ──▶ FrameLimiter::require_frame_skip
//!                    │
//!                    ├─▶ Scene::composite ──▶ front buffer ──▶ brightness quad
//!                    │
//!                    ├─▶ present_screen (letterbox + flip) ──▶ window swap
//!                    │
//!                    └─▶ FrameLimiter::delay ──▶ EngineEvent::FpsUpdated ──▶ driver
//! ```
//!
//! Every GPU call goes through [`RenderBackend`]. [`WgpuBackend`] draws into a
//! real window opened by [`WindowRuntime`]; [`HeadlessBackend`] rasterizes on
//! the CPU and records a command log for tests. The compositor is confined to
//! one thread; the driver thread only sets [`RequestFlags`] and receives
//! [`EngineEvent`]s.

mod bitmap;
mod buffers;
mod cancel;
mod canvas;
mod drawables;
mod effects;
pub mod gpu;
mod graphics;
mod pacing;
mod present;
mod scene;
mod target;
mod types;
mod viewport;
mod window;

pub use bitmap::Bitmap;
pub use buffers::BufferSet;
pub use cancel::{
    BindingNotifier, Cancellation, EngineEvent, EventSink, NullSink, RequestFlags, SignalLatch,
};
pub use canvas::Canvas;
pub use drawables::{Plane, Sprite};
pub use effects::{dim_alpha, fade_step, has_effect, overlay_color, transition_progress};
pub use gpu::{
    BlendState, Command, GpuError, HeadlessBackend, HeadlessTarget, RenderBackend, WgpuBackend,
    WgpuTarget,
};
pub use graphics::{Collaborators, Compositor, Mode};
pub use pacing::{Clock, FrameLimiter, ManualClock, SystemClock, MIN_FRAME_RATE};
pub use present::{flip_vertical, letterbox};
pub use scene::{Children, Drawable, DrawableId, ParentId, Scene, ViewportRect};
pub use target::RenderTarget;
pub use types::{
    Color, CompositorConfig, ContentVersion, GpuOptions, GpuPowerPreference, Rect, Size, Tone,
};
pub use viewport::{Viewport, ViewportHandle};
pub use window::{WindowOptions, WindowRuntime};
