use bytemuck::{Pod, Zeroable};

use crate::types::{Color, Rect, Size, Tone};

/// Vertical convention of a destination surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Origin {
    /// Offscreen targets: logical y grows down from row 0.
    TopLeft,
    /// The window: y grows up from the bottom edge.
    BottomLeft,
}

/// Per-draw parameters, laid out as five std140 `vec4`s.
#[repr(C, align(16))]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub(crate) struct QuadUniforms {
    /// Destination corners in clip space: x0, y0, x1, y1.
    pub position: [f32; 4],
    /// Source corners in normalized texture space: u0, v0, u1, v1.
    pub texcoord: [f32; 4],
    pub color: [f32; 4],
    pub tone: [f32; 4],
    /// progress, vague, opacity, unused.
    pub params: [f32; 4],
}

unsafe impl Zeroable for QuadUniforms {}
unsafe impl Pod for QuadUniforms {}

impl QuadUniforms {
    pub fn new(dst: Rect, dst_size: Size, origin: Origin) -> Self {
        Self {
            position: clip_space(dst, dst_size, origin),
            texcoord: [0.0, 0.0, 1.0, 1.0],
            ..Self::default()
        }
    }

    pub fn with_source(mut self, src: Rect, src_size: Size) -> Self {
        let width = src_size.width.max(1) as f32;
        let height = src_size.height.max(1) as f32;
        self.texcoord = [
            src.x as f32 / width,
            src.y as f32 / height,
            src.right() as f32 / width,
            src.bottom() as f32 / height,
        ];
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color.to_array();
        self
    }

    pub fn with_tone(mut self, tone: Tone) -> Self {
        self.tone = tone.to_array();
        self
    }

    pub fn with_params(mut self, progress: f32, vague: f32, opacity: f32) -> Self {
        self.params = [progress, vague, opacity, 0.0];
        self
    }
}

fn clip_space(rect: Rect, size: Size, origin: Origin) -> [f32; 4] {
    let width = size.width.max(1) as f32;
    let height = size.height.max(1) as f32;
    let x0 = rect.x as f32 / width * 2.0 - 1.0;
    let x1 = rect.right() as f32 / width * 2.0 - 1.0;
    let (y0, y1) = match origin {
        Origin::TopLeft => (
            1.0 - rect.y as f32 / height * 2.0,
            1.0 - rect.bottom() as f32 / height * 2.0,
        ),
        Origin::BottomLeft => (
            rect.y as f32 / height * 2.0 - 1.0,
            rect.bottom() as f32 / height * 2.0 - 1.0,
        ),
    };
    [x0, y0, x1, y1]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniforms_are_five_vec4s() {
        assert_eq!(std::mem::size_of::<QuadUniforms>(), 80);
    }

    #[test]
    fn full_target_maps_to_clip_space_corners() {
        let size = Size::new(640, 480);
        let uniforms = QuadUniforms::new(Rect::from_size(size), size, Origin::TopLeft);
        assert_eq!(uniforms.position, [-1.0, 1.0, 1.0, -1.0]);
    }

    #[test]
    fn flipped_window_rect_puts_source_top_at_window_top() {
        let size = Size::new(100, 100);
        let uniforms = QuadUniforms::new(Rect::new(0, 100, 100, -100), size, Origin::BottomLeft);
        assert_eq!(uniforms.position, [-1.0, 1.0, 1.0, -1.0]);
    }

    #[test]
    fn source_rect_is_normalized() {
        let uniforms = QuadUniforms::default().with_source(Rect::new(10, 20, 10, 20), Size::new(40, 80));
        assert_eq!(uniforms.texcoord, [0.25, 0.25, 0.5, 0.5]);
    }
}
