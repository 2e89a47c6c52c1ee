use super::shaders::{compile_fragment_shader, compile_vertex_shader, EffectKind};

/// Format of every offscreen target.
pub(crate) const OFFSCREEN_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Bind group layout shared by all effects: uniform block, sampler and three
/// texture slots (source, current, mask). Slots an effect does not read are
/// bound to a 1x1 placeholder.
pub(crate) struct PipelineLayouts {
    pub bind_layout: wgpu::BindGroupLayout,
    pub pipeline_layout: wgpu::PipelineLayout,
    pub vertex_module: wgpu::ShaderModule,
}

impl PipelineLayouts {
    pub fn new(device: &wgpu::Device) -> Self {
        let texture_entry = |binding: u32| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        };
        let bind_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("quad layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                texture_entry(2),
                texture_entry(3),
                texture_entry(4),
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("quad pipeline layout"),
            bind_group_layouts: &[&bind_layout],
            push_constant_ranges: &[],
        });

        Self {
            bind_layout,
            pipeline_layout,
            vertex_module: compile_vertex_shader(device),
        }
    }
}

/// One render pipeline per effect and blend mode.
pub(crate) struct EffectPipelines {
    pub flat: wgpu::RenderPipeline,
    pub blit_blend: wgpu::RenderPipeline,
    pub blit_replace: wgpu::RenderPipeline,
    pub crossfade: wgpu::RenderPipeline,
    pub dissolve: wgpu::RenderPipeline,
    pub viewport: wgpu::RenderPipeline,
    /// Blit into the swapchain format.
    pub present: wgpu::RenderPipeline,
}

impl EffectPipelines {
    pub fn new(
        device: &wgpu::Device,
        layouts: &PipelineLayouts,
        surface_format: wgpu::TextureFormat,
    ) -> Self {
        let alpha = Some(wgpu::BlendState::ALPHA_BLENDING);
        Self {
            flat: build_pipeline(device, layouts, EffectKind::Flat, OFFSCREEN_FORMAT, alpha),
            blit_blend: build_pipeline(device, layouts, EffectKind::Blit, OFFSCREEN_FORMAT, alpha),
            blit_replace: build_pipeline(device, layouts, EffectKind::Blit, OFFSCREEN_FORMAT, None),
            crossfade: build_pipeline(
                device,
                layouts,
                EffectKind::Crossfade,
                OFFSCREEN_FORMAT,
                None,
            ),
            dissolve: build_pipeline(
                device,
                layouts,
                EffectKind::Dissolve,
                OFFSCREEN_FORMAT,
                None,
            ),
            viewport: build_pipeline(
                device,
                layouts,
                EffectKind::Viewport,
                OFFSCREEN_FORMAT,
                None,
            ),
            present: build_pipeline(device, layouts, EffectKind::Blit, surface_format, None),
        }
    }
}

fn build_pipeline(
    device: &wgpu::Device,
    layouts: &PipelineLayouts,
    kind: EffectKind,
    format: wgpu::TextureFormat,
    blend: Option<wgpu::BlendState>,
) -> wgpu::RenderPipeline {
    let fragment_module = compile_fragment_shader(device, kind);
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("effect pipeline"),
        layout: Some(&layouts.pipeline_layout),
        vertex: wgpu::VertexState {
            module: &layouts.vertex_module,
            entry_point: Some("main"),
            buffers: &[],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleStrip,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        fragment: Some(wgpu::FragmentState {
            module: &fragment_module,
            entry_point: Some("main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        multiview: None,
        cache: None,
    })
}
