//! Graphics backends behind the [`RenderBackend`] seam.
//!
//! - `backend` defines the trait every GPU call goes through, plus the
//!   per-draw blend state and the error type.
//! - `context` owns wgpu instance/device/surface wiring and rebuilds the
//!   swapchain when the window size changes.
//! - `shaders` holds the GLSL 450 programs, compiled through naga.
//! - `pipeline` builds one render pipeline per effect over a single bind
//!   group layout.
//! - `uniforms` mirrors the shared uniform block and maps pixel rectangles
//!   into clip space.
//! - `wgpu_backend` glues the above into [`WgpuBackend`].
//! - `headless` is a CPU rasterizer with a command log for tests and the
//!   headless runner.

mod backend;
mod context;
mod headless;
mod pipeline;
mod shaders;
mod uniforms;
mod wgpu_backend;

pub use backend::{BlendState, GpuError, RenderBackend};
pub use headless::{Command, HeadlessBackend, HeadlessTarget};
pub use wgpu_backend::{WgpuBackend, WgpuTarget};
