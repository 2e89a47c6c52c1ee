use std::borrow::Cow;

use wgpu::naga::ShaderStage;

/// Effect programs the wgpu backend builds a pipeline for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EffectKind {
    Flat,
    Blit,
    Crossfade,
    Dissolve,
    Viewport,
}

impl EffectKind {
    fn fragment_source(self) -> &'static str {
        match self {
            EffectKind::Flat => FLAT_FRAGMENT,
            EffectKind::Blit => BLIT_FRAGMENT,
            EffectKind::Crossfade => CROSSFADE_FRAGMENT,
            EffectKind::Dissolve => DISSOLVE_FRAGMENT,
            EffectKind::Viewport => VIEWPORT_FRAGMENT,
        }
    }

    fn label(self) -> &'static str {
        match self {
            EffectKind::Flat => "flat fragment",
            EffectKind::Blit => "blit fragment",
            EffectKind::Crossfade => "crossfade fragment",
            EffectKind::Dissolve => "dissolve fragment",
            EffectKind::Viewport => "viewport effect fragment",
        }
    }
}

/// Compiles the shared quad vertex shader.
pub(crate) fn compile_vertex_shader(device: &wgpu::Device) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("quad vertex"),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Owned(format!("{QUAD_PARAMS}{QUAD_VERTEX}")),
            stage: ShaderStage::Vertex,
            defines: &[],
        },
    })
}

pub(crate) fn compile_fragment_shader(device: &wgpu::Device, kind: EffectKind) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(kind.label()),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Owned(fragment_program(kind)),
            stage: ShaderStage::Fragment,
            defines: &[],
        },
    })
}

fn fragment_program(kind: EffectKind) -> String {
    format!("{QUAD_PARAMS}{FRAGMENT_BINDINGS}{}", kind.fragment_source())
}

/// Uniform block shared by every stage. Must match `QuadUniforms`.
const QUAD_PARAMS: &str = r"#version 450
layout(std140, set = 0, binding = 0) uniform QuadParams {
    vec4 position;
    vec4 texcoord;
    vec4 color;
    vec4 tone;
    vec4 params;
} quad;
";

/// Corner-interpolated quad drawn as a four vertex triangle strip.
const QUAD_VERTEX: &str = r"
layout(location = 0) out vec2 v_uv;

void main() {
    vec2 corner = vec2(float(gl_VertexIndex & 1), float((gl_VertexIndex >> 1) & 1));
    v_uv = mix(quad.texcoord.xy, quad.texcoord.zw, corner);
    gl_Position = vec4(mix(quad.position.xy, quad.position.zw, corner), 0.0, 1.0);
}
";

const FRAGMENT_BINDINGS: &str = r"
layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 out_color;

layout(set = 0, binding = 1) uniform sampler quad_sampler;
layout(set = 0, binding = 2) uniform texture2D source_texture;
layout(set = 0, binding = 3) uniform texture2D current_texture;
layout(set = 0, binding = 4) uniform texture2D mask_texture;

#define SOURCE sampler2D(source_texture, quad_sampler)
#define CURRENT sampler2D(current_texture, quad_sampler)
#define MASK sampler2D(mask_texture, quad_sampler)
";

const FLAT_FRAGMENT: &str = r"
void main() {
    out_color = quad.color;
}
";

const BLIT_FRAGMENT: &str = r"
void main() {
    vec4 texel = texture(SOURCE, v_uv);
    out_color = vec4(texel.rgb, texel.a * quad.params.z);
}
";

const CROSSFADE_FRAGMENT: &str = r"
void main() {
    vec4 frozen = texture(SOURCE, v_uv);
    vec4 current = texture(CURRENT, v_uv);
    out_color = mix(frozen, current, quad.params.x);
}
";

const DISSOLVE_FRAGMENT: &str = r"
void main() {
    vec4 frozen = texture(SOURCE, v_uv);
    vec4 current = texture(CURRENT, v_uv);
    float progress = quad.params.x;
    float vague = quad.params.y;
    float level = clamp(texture(MASK, v_uv).r, progress, progress + vague);
    out_color = mix(current, frozen, (level - progress) / vague);
}
";

const VIEWPORT_FRAGMENT: &str = r"
const vec3 LUMA = vec3(0.299, 0.587, 0.114);

void main() {
    vec4 texel = texture(SOURCE, v_uv);
    float luma = dot(texel.rgb, LUMA);
    vec3 toned = clamp(mix(texel.rgb, vec3(luma), quad.tone.w) + quad.tone.rgb, 0.0, 1.0);
    out_color = vec4(mix(toned, quad.color.rgb, quad.color.a), texel.a);
}
";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_fragment_program_declares_shared_block() {
        for kind in [
            EffectKind::Flat,
            EffectKind::Blit,
            EffectKind::Crossfade,
            EffectKind::Dissolve,
            EffectKind::Viewport,
        ] {
            let program = fragment_program(kind);
            assert!(program.starts_with("#version 450"));
            assert!(program.contains("uniform QuadParams"));
            assert!(program.contains("void main()"));
        }
    }

    #[test]
    fn dissolve_uses_the_mask_red_channel() {
        assert!(DISSOLVE_FRAGMENT.contains("texture(MASK, v_uv).r"));
    }
}
