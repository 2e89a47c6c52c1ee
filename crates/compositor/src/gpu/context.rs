use std::sync::Arc;

use anyhow::{bail, Context as _, Result};
use winit::window::Window;

use crate::types::{GpuOptions, GpuPowerPreference, Size};

/// Frames the swapchain may queue ahead of the compositor.
const SWAPCHAIN_LATENCY: u32 = 2;

/// Device, queue and window surface shared by every pipeline of the wgpu
/// backend. Built once on the compositor thread and never moved off it.
pub(crate) struct GpuContext {
    _instance: wgpu::Instance,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    surface_config: wgpu::SurfaceConfiguration,
    /// Window size the surface is currently configured for.
    pub size: Size,
    pub surface_format: wgpu::TextureFormat,
    pub max_texture_dimension: u32,
    pub adapter_name: String,
}

impl GpuContext {
    pub(crate) fn new(window: Arc<Window>, options: GpuOptions) -> Result<Self> {
        let window_size = window.inner_size();
        let window_size = Size::new(window_size.width, window_size.height);

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let surface = instance
            .create_surface(window)
            .context("window does not expose a presentable surface")?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: power_preference(options.power),
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .context("no GPU adapter can present to the compositor window")?;
        let info = adapter.get_info();
        tracing::debug!(
            name = %info.name,
            backend = ?info.backend,
            device_type = ?info.device_type,
            "adapter chosen"
        );

        let limits = adapter.limits();
        let max_texture_dimension = limits.max_texture_dimension_2d;
        let surface_size = window_size.at_least_one();
        if surface_size.width > max_texture_dimension || surface_size.height > max_texture_dimension {
            bail!(
                "window {}x{} exceeds the adapter texture limit of {max_texture_dimension}",
                surface_size.width,
                surface_size.height
            );
        }

        let capabilities = surface.get_capabilities(&adapter);
        let surface_format = choose_surface_format(&capabilities.formats)?;
        let present_mode = choose_present_mode(&capabilities.present_modes, options.vsync);
        tracing::debug!(?surface_format, ?present_mode, vsync = options.vsync, "surface modes");

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("compositor device"),
            required_features: wgpu::Features::empty(),
            required_limits: limits,
            memory_hints: wgpu::MemoryHints::MemoryUsage,
            trace: wgpu::Trace::Off,
        }))
        .context("adapter refused to open a device")?;

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: surface_size.width,
            height: surface_size.height,
            present_mode,
            alpha_mode: capabilities
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: Vec::new(),
            desired_maximum_frame_latency: SWAPCHAIN_LATENCY,
        };
        surface.configure(&device, &surface_config);

        Ok(Self {
            _instance: instance,
            surface,
            device,
            queue,
            surface_config,
            size: window_size,
            surface_format,
            max_texture_dimension,
            adapter_name: info.name,
        })
    }

    /// Reconfigures the swapchain for a new window size. A minimised window
    /// (zero area) keeps the previous configuration.
    pub(crate) fn resize(&mut self, window_size: Size) {
        if window_size.is_empty() {
            return;
        }
        self.size = window_size;
        self.surface_config.width = window_size.width;
        self.surface_config.height = window_size.height;
        self.surface.configure(&self.device, &self.surface_config);
        tracing::debug!(
            width = window_size.width,
            height = window_size.height,
            "swapchain resized"
        );
    }
}

fn power_preference(power: GpuPowerPreference) -> wgpu::PowerPreference {
    match power {
        GpuPowerPreference::Low => wgpu::PowerPreference::LowPower,
        GpuPowerPreference::High => wgpu::PowerPreference::HighPerformance,
    }
}

/// Brightness, dimming and tone math run on stored values, so a non-sRGB
/// swapchain is preferred to keep presentation from re-encoding them.
fn choose_surface_format(formats: &[wgpu::TextureFormat]) -> Result<wgpu::TextureFormat> {
    let Some(&fallback) = formats.first() else {
        bail!("surface supports no texture formats on this adapter");
    };
    match formats.iter().copied().find(|format| !format.is_srgb()) {
        Some(format) => Ok(format),
        None => {
            tracing::warn!(?fallback, "only sRGB surface formats available");
            Ok(fallback)
        }
    }
}

/// Fifo when vsync is on; otherwise Immediate, then Mailbox, then Fifo.
fn choose_present_mode(modes: &[wgpu::PresentMode], vsync: bool) -> wgpu::PresentMode {
    let supported = |wanted: wgpu::PresentMode| modes.contains(&wanted).then_some(wanted);
    let fifo = supported(wgpu::PresentMode::Fifo)
        .or_else(|| modes.first().copied())
        .unwrap_or(wgpu::PresentMode::Fifo);
    if vsync {
        return fifo;
    }
    supported(wgpu::PresentMode::Immediate)
        .or_else(|| supported(wgpu::PresentMode::Mailbox))
        .unwrap_or(fifo)
}
