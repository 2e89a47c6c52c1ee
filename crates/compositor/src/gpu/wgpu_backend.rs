use std::sync::Arc;

use anyhow::Result;
use crossbeam_channel::bounded;
use raw_window_handle::{HasWindowHandle, RawWindowHandle};
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::types::{Color, GpuOptions, Rect, Size, Tone};

use super::backend::{check_region, BlendState, GpuError, RenderBackend};
use super::context::GpuContext;
use super::pipeline::{EffectPipelines, PipelineLayouts, OFFSCREEN_FORMAT};
use super::uniforms::{Origin, QuadUniforms};

/// Offscreen texture plus its default view.
pub struct WgpuTarget {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    size: Size,
}

impl WgpuTarget {
    pub fn size(&self) -> Size {
        self.size
    }
}

/// [`RenderBackend`] driving a wgpu device and the window surface.
pub struct WgpuBackend {
    window: Arc<Window>,
    context: GpuContext,
    layouts: PipelineLayouts,
    pipelines: EffectPipelines,
    sampler: wgpu::Sampler,
    placeholder: wgpu::TextureView,
}

/// Pipeline, destination and inputs for one quad draw.
struct QuadDraw<'a> {
    pipeline: &'a wgpu::RenderPipeline,
    target: &'a wgpu::TextureView,
    uniforms: QuadUniforms,
    textures: [Option<&'a wgpu::TextureView>; 3],
    scissor: Option<[u32; 4]>,
    clear: Option<wgpu::Color>,
}

impl WgpuBackend {
    /// Creates the device, surface and every effect pipeline for `window`.
    ///
    /// Must be called on the thread that will own the backend for its whole
    /// lifetime.
    pub fn new(window: Arc<Window>, options: GpuOptions) -> Result<Self> {
        let context = GpuContext::new(Arc::clone(&window), options)?;
        let layouts = PipelineLayouts::new(&context.device);
        let pipelines = EffectPipelines::new(&context.device, &layouts, context.surface_format);
        let sampler = context.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("quad sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });
        let placeholder = create_texture(&context.device, Size::new(1, 1), "placeholder").1;

        tracing::info!(
            adapter = %context.adapter_name,
            format = ?context.surface_format,
            "wgpu backend ready"
        );

        Ok(Self {
            window,
            context,
            layouts,
            pipelines,
            sampler,
            placeholder,
        })
    }

    pub fn adapter_name(&self) -> &str {
        &self.context.adapter_name
    }

    fn check_dimensions(&self, size: Size) -> Result<(), GpuError> {
        let limit = self.context.max_texture_dimension;
        if size.width > limit || size.height > limit {
            return Err(GpuError::TextureTooLarge {
                width: size.width,
                height: size.height,
                limit,
            });
        }
        Ok(())
    }

    fn draw(&self, quad: QuadDraw<'_>) {
        let device = &self.context.device;
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("quad uniforms"),
            contents: bytemuck::bytes_of(&quad.uniforms),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        let [source, current, mask] = quad.textures;
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("quad bind group"),
            layout: &self.layouts.bind_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(
                        source.unwrap_or(&self.placeholder),
                    ),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(
                        current.unwrap_or(&self.placeholder),
                    ),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::TextureView(mask.unwrap_or(&self.placeholder)),
                },
            ],
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("quad encoder"),
        });
        {
            let load = match quad.clear {
                Some(color) => wgpu::LoadOp::Clear(color),
                None => wgpu::LoadOp::Load,
            };
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("quad pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: quad.target,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            if let Some([x, y, width, height]) = quad.scissor {
                pass.set_scissor_rect(x, y, width, height);
            }
            pass.set_pipeline(quad.pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.draw(0..4, 0..1);
        }
        self.context.queue.submit(Some(encoder.finish()));
    }
}

fn create_texture(
    device: &wgpu::Device,
    size: Size,
    label: &str,
) -> (wgpu::Texture, wgpu::TextureView) {
    let size = size.at_least_one();
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width: size.width,
            height: size.height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: OFFSCREEN_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT
            | wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::COPY_SRC
            | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    (texture, view)
}

/// Clip rectangle limited to the target, as a scissor; `None` when nothing
/// would be drawn.
fn scissor_for(clip: Rect, size: Size) -> Option<[u32; 4]> {
    let area = clip.intersect(&Rect::from_size(size));
    if area.is_empty() {
        return None;
    }
    Some([
        area.x as u32,
        area.y as u32,
        area.width as u32,
        area.height as u32,
    ])
}

fn to_wgpu_color(color: Color) -> wgpu::Color {
    wgpu::Color {
        r: color.red as f64,
        g: color.green as f64,
        b: color.blue as f64,
        a: color.alpha as f64,
    }
}

fn texel_origin(rect: Rect) -> wgpu::Origin3d {
    wgpu::Origin3d {
        x: rect.x as u32,
        y: rect.y as u32,
        z: 0,
    }
}

fn texel_extent(rect: Rect) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width: rect.width as u32,
        height: rect.height as u32,
        depth_or_array_layers: 1,
    }
}

impl RenderBackend for WgpuBackend {
    type Target = WgpuTarget;

    fn create_target(&mut self, size: Size) -> Result<Self::Target, GpuError> {
        self.check_dimensions(size)?;
        let (texture, view) = create_texture(&self.context.device, size, "render target");
        tracing::debug!(width = size.width, height = size.height, "allocated render target");
        Ok(WgpuTarget {
            texture,
            view,
            size: size.at_least_one(),
        })
    }

    fn alloc_target(&mut self, target: &mut Self::Target, size: Size) -> Result<(), GpuError> {
        self.check_dimensions(size)?;
        let (texture, view) = create_texture(&self.context.device, size, "render target");
        target.texture = texture;
        target.view = view;
        target.size = size.at_least_one();
        tracing::debug!(width = size.width, height = size.height, "reallocated render target");
        Ok(())
    }

    fn target_size(&self, target: &Self::Target) -> Size {
        target.size
    }

    fn clear(&mut self, target: &Self::Target, color: Color) {
        let mut encoder = self
            .context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("clear encoder"),
            });
        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("clear pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &target.view,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(to_wgpu_color(color)),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        self.context.queue.submit(Some(encoder.finish()));
    }

    fn fill_rect(&mut self, target: &Self::Target, rect: Rect, clip: Rect, color: Color) {
        let Some(scissor) = scissor_for(clip, target.size) else {
            return;
        };
        self.draw(QuadDraw {
            pipeline: &self.pipelines.flat,
            target: &target.view,
            uniforms: QuadUniforms::new(rect, target.size, Origin::TopLeft).with_color(color),
            textures: [None, None, None],
            scissor: Some(scissor),
            clear: None,
        });
    }

    fn blit(
        &mut self,
        src: &Self::Target,
        src_rect: Rect,
        dst: &Self::Target,
        dst_rect: Rect,
        clip: Option<Rect>,
        opacity: f32,
        blend: BlendState,
    ) {
        let scissor = match clip {
            Some(clip) => match scissor_for(clip, dst.size) {
                Some(scissor) => Some(scissor),
                None => return,
            },
            None => None,
        };
        let pipeline = match blend {
            BlendState::Normal => &self.pipelines.blit_blend,
            BlendState::Replace => &self.pipelines.blit_replace,
        };
        self.draw(QuadDraw {
            pipeline,
            target: &dst.view,
            uniforms: QuadUniforms::new(dst_rect, dst.size, Origin::TopLeft)
                .with_source(src_rect, src.size)
                .with_params(0.0, 0.0, opacity),
            textures: [Some(&src.view), None, None],
            scissor,
            clear: None,
        });
    }

    fn crossfade(
        &mut self,
        frozen: &Self::Target,
        current: &Self::Target,
        dst: &Self::Target,
        progress: f32,
    ) {
        self.draw(QuadDraw {
            pipeline: &self.pipelines.crossfade,
            target: &dst.view,
            uniforms: QuadUniforms::new(Rect::from_size(dst.size), dst.size, Origin::TopLeft)
                .with_params(progress, 0.0, 1.0),
            textures: [Some(&frozen.view), Some(&current.view), None],
            scissor: None,
            clear: None,
        });
    }

    fn dissolve(
        &mut self,
        frozen: &Self::Target,
        current: &Self::Target,
        mask: &Self::Target,
        dst: &Self::Target,
        progress: f32,
        vague: f32,
    ) {
        self.draw(QuadDraw {
            pipeline: &self.pipelines.dissolve,
            target: &dst.view,
            uniforms: QuadUniforms::new(Rect::from_size(dst.size), dst.size, Origin::TopLeft)
                .with_params(progress, vague, 1.0),
            textures: [Some(&frozen.view), Some(&current.view), Some(&mask.view)],
            scissor: None,
            clear: None,
        });
    }

    fn viewport_effect(
        &mut self,
        src: &Self::Target,
        dst: &Self::Target,
        clip: Rect,
        tone: Tone,
        color: Color,
    ) {
        let Some(scissor) = scissor_for(clip, dst.size) else {
            return;
        };
        self.draw(QuadDraw {
            pipeline: &self.pipelines.viewport,
            target: &dst.view,
            uniforms: QuadUniforms::new(Rect::from_size(dst.size), dst.size, Origin::TopLeft)
                .with_color(color)
                .with_tone(tone),
            textures: [Some(&src.view), None, None],
            scissor: Some(scissor),
            clear: None,
        });
    }

    fn present(
        &mut self,
        src: &Self::Target,
        src_rect: Rect,
        dst_rect: Rect,
    ) -> Result<(), GpuError> {
        let window_size = self.window_size();
        if window_size.is_empty() {
            return Ok(());
        }
        if window_size != self.context.size {
            self.context.resize(window_size);
        }

        let frame = match self.context.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.context.resize(window_size);
                tracing::debug!("surface outdated; skipping frame");
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                tracing::warn!("surface timeout; skipping frame");
                return Ok(());
            }
            Err(err) => return Err(GpuError::Surface(err.to_string())),
        };
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        self.draw(QuadDraw {
            pipeline: &self.pipelines.present,
            target: &view,
            uniforms: QuadUniforms::new(dst_rect, window_size, Origin::BottomLeft)
                .with_source(src_rect, src.size)
                .with_params(0.0, 0.0, 1.0),
            textures: [Some(&src.view), None, None],
            scissor: None,
            clear: Some(wgpu::Color::BLACK),
        });
        self.window.pre_present_notify();
        frame.present();
        Ok(())
    }

    fn read_pixels(&mut self, target: &Self::Target, rect: Rect) -> Result<Vec<u8>, GpuError> {
        check_region(target.size, rect)?;
        let device = &self.context.device;
        let unpadded = rect.width as u32 * 4;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded = unpadded.div_ceil(align) * align;
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("readback buffer"),
            size: padded as u64 * rect.height as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("readback encoder"),
        });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &target.texture,
                mip_level: 0,
                origin: texel_origin(rect),
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded),
                    rows_per_image: Some(rect.height as u32),
                },
            },
            texel_extent(rect),
        );
        self.context.queue.submit(Some(encoder.finish()));

        let slice = buffer.slice(..);
        let (tx, rx) = bounded(1);
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        device
            .poll(wgpu::PollType::Wait)
            .map_err(|err| GpuError::Readback(err.to_string()))?;
        rx.recv()
            .map_err(|err| GpuError::Readback(err.to_string()))?
            .map_err(|err| GpuError::Readback(err.to_string()))?;

        let mapped = slice.get_mapped_range();
        let mut pixels = Vec::with_capacity(unpadded as usize * rect.height as usize);
        for row in mapped.chunks(padded as usize).take(rect.height as usize) {
            pixels.extend_from_slice(&row[..unpadded as usize]);
        }
        drop(mapped);
        buffer.unmap();
        Ok(pixels)
    }

    fn write_pixels(
        &mut self,
        target: &Self::Target,
        rect: Rect,
        data: &[u8],
    ) -> Result<(), GpuError> {
        check_region(target.size, rect)?;
        let expected = rect.width as usize * rect.height as usize * 4;
        if data.len() != expected {
            return Err(GpuError::PixelLength {
                expected,
                actual: data.len(),
            });
        }
        self.context.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &target.texture,
                mip_level: 0,
                origin: texel_origin(rect),
                aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(rect.width as u32 * 4),
                rows_per_image: Some(rect.height as u32),
            },
            texel_extent(rect),
        );
        Ok(())
    }

    fn window_size(&self) -> Size {
        let size = self.window.inner_size();
        Size::new(size.width, size.height)
    }

    fn native_window_handle(&self) -> Option<u64> {
        let handle = self.window.window_handle().ok()?;
        match handle.as_raw() {
            RawWindowHandle::Win32(handle) => Some(handle.hwnd.get() as u64),
            RawWindowHandle::Xlib(handle) => Some(handle.window as u64),
            RawWindowHandle::Xcb(handle) => Some(handle.window.get() as u64),
            RawWindowHandle::Wayland(handle) => Some(handle.surface.as_ptr() as usize as u64),
            RawWindowHandle::AppKit(handle) => Some(handle.ns_view.as_ptr() as usize as u64),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scissor_is_limited_to_target() {
        assert_eq!(
            scissor_for(Rect::new(-10, 5, 50, 50), Size::new(20, 20)),
            Some([0, 5, 20, 15])
        );
        assert_eq!(scissor_for(Rect::new(30, 30, 5, 5), Size::new(20, 20)), None);
    }
}
