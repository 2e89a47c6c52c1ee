//! CPU implementation of [`RenderBackend`].
//!
//! Every target is a plain RGBA8 buffer and every call is appended to a
//! command log, so compositor behaviour (how many presents happened, at which
//! transition progress, which targets were reallocated) can be asserted
//! without a GPU. The `--headless` runner mode uses it as well.

use std::cell::RefCell;
use std::rc::Rc;

use crate::types::{Color, Rect, Size, Tone};

use super::backend::{check_region, BlendState, GpuError, RenderBackend};

/// One recorded backend call.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Allocate { target: u32, size: Size },
    Release { target: u32 },
    Clear { target: u32, color: Color },
    Fill { target: u32, rect: Rect, color: Color },
    Blit { src: u32, dst: u32, dst_rect: Rect, blend: BlendState },
    Crossfade { dst: u32, progress: f32 },
    Dissolve { dst: u32, progress: f32, vague: f32 },
    ViewportEffect { src: u32, dst: u32, clip: Rect, tone: Tone, color: Color },
    Present { src: u32, dst_rect: Rect, window: Size },
    ReadPixels { target: u32, rect: Rect },
    WritePixels { target: u32, rect: Rect },
}

type CommandLog = Rc<RefCell<Vec<Command>>>;

pub struct HeadlessTarget {
    id: u32,
    size: Size,
    pixels: RefCell<Vec<u8>>,
    log: CommandLog,
}

impl HeadlessTarget {
    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn size(&self) -> Size {
        self.size
    }

    /// Copy of the raw RGBA8 contents, top row first.
    pub fn pixels(&self) -> Vec<u8> {
        self.pixels.borrow().clone()
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let pixels = self.pixels.borrow();
        let offset = ((y * self.size.width + x) * 4) as usize;
        [
            pixels[offset],
            pixels[offset + 1],
            pixels[offset + 2],
            pixels[offset + 3],
        ]
    }
}

impl Drop for HeadlessTarget {
    fn drop(&mut self) {
        self.log.borrow_mut().push(Command::Release { target: self.id });
    }
}

impl std::fmt::Debug for HeadlessTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeadlessTarget")
            .field("id", &self.id)
            .field("size", &self.size)
            .finish()
    }
}

pub struct HeadlessBackend {
    window: Size,
    window_pixels: Vec<u8>,
    next_id: u32,
    log: CommandLog,
}

impl HeadlessBackend {
    pub fn new(window: Size) -> Self {
        Self {
            window,
            window_pixels: vec![0; window.byte_len()],
            next_id: 1,
            log: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Simulates the user resizing the window.
    pub fn set_window_size(&mut self, size: Size) {
        self.window = size;
        self.window_pixels = vec![0; size.byte_len()];
    }

    pub fn commands(&self) -> Vec<Command> {
        self.log.borrow().clone()
    }

    pub fn clear_commands(&mut self) {
        self.log.borrow_mut().clear();
    }

    /// Number of presents recorded since the log was last cleared.
    pub fn present_count(&self) -> usize {
        self.log
            .borrow()
            .iter()
            .filter(|command| matches!(command, Command::Present { .. }))
            .count()
    }

    /// Window contents after the last present, top row first.
    pub fn window_pixels(&self) -> &[u8] {
        &self.window_pixels
    }

    pub fn window_pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let offset = ((y * self.window.width + x) * 4) as usize;
        let px = &self.window_pixels[offset..offset + 4];
        [px[0], px[1], px[2], px[3]]
    }

    fn record(&self, command: Command) {
        self.log.borrow_mut().push(command);
    }
}

impl RenderBackend for HeadlessBackend {
    type Target = HeadlessTarget;

    fn create_target(&mut self, size: Size) -> Result<Self::Target, GpuError> {
        let size = size.at_least_one();
        let id = self.next_id;
        self.next_id += 1;
        self.record(Command::Allocate { target: id, size });
        Ok(HeadlessTarget {
            id,
            size,
            pixels: RefCell::new(vec![0; size.byte_len()]),
            log: Rc::clone(&self.log),
        })
    }

    fn alloc_target(&mut self, target: &mut Self::Target, size: Size) -> Result<(), GpuError> {
        let size = size.at_least_one();
        target.size = size;
        *target.pixels.get_mut() = vec![0; size.byte_len()];
        self.record(Command::Allocate {
            target: target.id,
            size,
        });
        Ok(())
    }

    fn target_size(&self, target: &Self::Target) -> Size {
        target.size
    }

    fn clear(&mut self, target: &Self::Target, color: Color) {
        let value = color.to_rgba8();
        for px in target.pixels.borrow_mut().chunks_exact_mut(4) {
            px.copy_from_slice(&value);
        }
        self.record(Command::Clear {
            target: target.id,
            color,
        });
    }

    fn fill_rect(&mut self, target: &Self::Target, rect: Rect, clip: Rect, color: Color) {
        let area = rect
            .intersect(&clip)
            .intersect(&Rect::from_size(target.size));
        let source = color.to_array();
        let mut pixels = target.pixels.borrow_mut();
        for y in area.y..area.bottom() {
            for x in area.x..area.right() {
                let offset = pixel_offset(target.size, x, y);
                let dst = read_px(&pixels, offset);
                write_px(&mut pixels, offset, blend_over(source, dst));
            }
        }
        drop(pixels);
        self.record(Command::Fill {
            target: target.id,
            rect,
            color,
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
        let source = src.pixels();
        let mut area = normalized(dst_rect).intersect(&Rect::from_size(dst.size));
        if let Some(clip) = clip {
            area = area.intersect(&clip);
        }
        let mut pixels = dst.pixels.borrow_mut();
        for y in area.y..area.bottom() {
            for x in area.x..area.right() {
                let fx = (x as f32 + 0.5 - dst_rect.x as f32) / dst_rect.width as f32;
                let fy = (y as f32 + 0.5 - dst_rect.y as f32) / dst_rect.height as f32;
                let mut texel = sample_rect(&source, src.size, src_rect, fx, fy);
                texel[3] *= opacity;
                let offset = pixel_offset(dst.size, x, y);
                let out = match blend {
                    BlendState::Normal => blend_over(texel, read_px(&pixels, offset)),
                    BlendState::Replace => texel,
                };
                write_px(&mut pixels, offset, out);
            }
        }
        drop(pixels);
        self.record(Command::Blit {
            src: src.id,
            dst: dst.id,
            dst_rect,
            blend,
        });
    }

    fn crossfade(
        &mut self,
        frozen: &Self::Target,
        current: &Self::Target,
        dst: &Self::Target,
        progress: f32,
    ) {
        let old = frozen.pixels();
        let new = current.pixels();
        let mut pixels = dst.pixels.borrow_mut();
        for y in 0..dst.size.height {
            for x in 0..dst.size.width {
                let (u, v) = normalized_center(dst.size, x, y);
                let a = sample_uv(&old, frozen.size, u, v);
                let b = sample_uv(&new, current.size, u, v);
                let offset = pixel_offset(dst.size, x as i32, y as i32);
                write_px(&mut pixels, offset, mix(a, b, progress));
            }
        }
        drop(pixels);
        self.record(Command::Crossfade {
            dst: dst.id,
            progress,
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
        let old = frozen.pixels();
        let new = current.pixels();
        let threshold = mask.pixels();
        let mut pixels = dst.pixels.borrow_mut();
        for y in 0..dst.size.height {
            for x in 0..dst.size.width {
                let (u, v) = normalized_center(dst.size, x, y);
                let a = sample_uv(&old, frozen.size, u, v);
                let b = sample_uv(&new, current.size, u, v);
                let level = sample_uv(&threshold, mask.size, u, v)[0];
                let keep_old = dissolve_weight(level, progress, vague);
                let offset = pixel_offset(dst.size, x as i32, y as i32);
                write_px(&mut pixels, offset, mix(b, a, keep_old));
            }
        }
        drop(pixels);
        self.record(Command::Dissolve {
            dst: dst.id,
            progress,
            vague,
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
        let source = src.pixels();
        let area = clip.intersect(&Rect::from_size(dst.size));
        let mut pixels = dst.pixels.borrow_mut();
        for y in area.y..area.bottom() {
            for x in area.x..area.right() {
                let (u, v) = normalized_center(dst.size, x as u32, y as u32);
                let texel = sample_uv(&source, src.size, u, v);
                let offset = pixel_offset(dst.size, x, y);
                write_px(&mut pixels, offset, apply_tone_and_color(texel, tone, color));
            }
        }
        drop(pixels);
        self.record(Command::ViewportEffect {
            src: src.id,
            dst: dst.id,
            clip,
            tone,
            color,
        });
    }

    fn present(
        &mut self,
        src: &Self::Target,
        src_rect: Rect,
        dst_rect: Rect,
    ) -> Result<(), GpuError> {
        let window = self.window;
        let source = src.pixels();
        for px in self.window_pixels.chunks_exact_mut(4) {
            px.copy_from_slice(&[0, 0, 0, 255]);
        }
        let area = normalized(dst_rect).intersect(&Rect::from_size(window));
        for gl_y in area.y..area.bottom() {
            // Window memory is top-down while dst_rect uses a bottom-left origin.
            let row = window.height as i32 - 1 - gl_y;
            for x in area.x..area.right() {
                let fx = (x as f32 + 0.5 - dst_rect.x as f32) / dst_rect.width as f32;
                let fy = (gl_y as f32 + 0.5 - dst_rect.y as f32) / dst_rect.height as f32;
                let texel = sample_rect(&source, src.size, src_rect, fx, fy);
                let offset = pixel_offset(window, x, row);
                write_px(&mut self.window_pixels, offset, texel);
            }
        }
        self.record(Command::Present {
            src: src.id,
            dst_rect,
            window,
        });
        Ok(())
    }

    fn read_pixels(&mut self, target: &Self::Target, rect: Rect) -> Result<Vec<u8>, GpuError> {
        check_region(target.size, rect)?;
        let pixels = target.pixels.borrow();
        let mut out = Vec::with_capacity(rect.width as usize * rect.height as usize * 4);
        for y in rect.y..rect.bottom() {
            let start = pixel_offset(target.size, rect.x, y);
            let end = start + rect.width as usize * 4;
            out.extend_from_slice(&pixels[start..end]);
        }
        drop(pixels);
        self.record(Command::ReadPixels {
            target: target.id,
            rect,
        });
        Ok(out)
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
        let mut pixels = target.pixels.borrow_mut();
        let row_len = rect.width as usize * 4;
        for (row, chunk) in data.chunks_exact(row_len).enumerate() {
            let start = pixel_offset(target.size, rect.x, rect.y + row as i32);
            pixels[start..start + row_len].copy_from_slice(chunk);
        }
        drop(pixels);
        self.record(Command::WritePixels {
            target: target.id,
            rect,
        });
        Ok(())
    }

    fn window_size(&self) -> Size {
        self.window
    }
}

fn normalized(rect: Rect) -> Rect {
    let (y, height) = if rect.height < 0 {
        (rect.y + rect.height, -rect.height)
    } else {
        (rect.y, rect.height)
    };
    let (x, width) = if rect.width < 0 {
        (rect.x + rect.width, -rect.width)
    } else {
        (rect.x, rect.width)
    };
    Rect::new(x, y, width, height)
}

fn pixel_offset(size: Size, x: i32, y: i32) -> usize {
    (y as usize * size.width as usize + x as usize) * 4
}

fn normalized_center(size: Size, x: u32, y: u32) -> (f32, f32) {
    (
        (x as f32 + 0.5) / size.width as f32,
        (y as f32 + 0.5) / size.height as f32,
    )
}

fn read_px(pixels: &[u8], offset: usize) -> [f32; 4] {
    [
        pixels[offset] as f32 / 255.0,
        pixels[offset + 1] as f32 / 255.0,
        pixels[offset + 2] as f32 / 255.0,
        pixels[offset + 3] as f32 / 255.0,
    ]
}

fn write_px(pixels: &mut [u8], offset: usize, value: [f32; 4]) {
    for (channel, component) in value.iter().enumerate() {
        pixels[offset + channel] = (component.clamp(0.0, 1.0) * 255.0).round() as u8;
    }
}

fn sample_uv(pixels: &[u8], size: Size, u: f32, v: f32) -> [f32; 4] {
    let x = ((u * size.width as f32).floor() as i32).clamp(0, size.width as i32 - 1);
    let y = ((v * size.height as f32).floor() as i32).clamp(0, size.height as i32 - 1);
    read_px(pixels, pixel_offset(size, x, y))
}

fn sample_rect(pixels: &[u8], size: Size, rect: Rect, fx: f32, fy: f32) -> [f32; 4] {
    let sx = rect.x as f32 + fx * rect.width as f32;
    let sy = rect.y as f32 + fy * rect.height as f32;
    sample_uv(pixels, size, sx / size.width as f32, sy / size.height as f32)
}

fn blend_over(src: [f32; 4], dst: [f32; 4]) -> [f32; 4] {
    let alpha = src[3];
    [
        src[0] * alpha + dst[0] * (1.0 - alpha),
        src[1] * alpha + dst[1] * (1.0 - alpha),
        src[2] * alpha + dst[2] * (1.0 - alpha),
        alpha + dst[3] * (1.0 - alpha),
    ]
}

fn mix(a: [f32; 4], b: [f32; 4], t: f32) -> [f32; 4] {
    [
        a[0] + (b[0] - a[0]) * t,
        a[1] + (b[1] - a[1]) * t,
        a[2] + (b[2] - a[2]) * t,
        a[3] + (b[3] - a[3]) * t,
    ]
}

/// Share of the frozen image kept at a pixel whose mask level is `level`.
pub(crate) fn dissolve_weight(level: f32, progress: f32, vague: f32) -> f32 {
    let clamped = level.clamp(progress, progress + vague);
    (clamped - progress) / vague
}

pub(crate) fn apply_tone_and_color(texel: [f32; 4], tone: Tone, color: Color) -> [f32; 4] {
    let luma = texel[0] * 0.299 + texel[1] * 0.587 + texel[2] * 0.114;
    let mut rgb = [texel[0], texel[1], texel[2]];
    let shift = [tone.red, tone.green, tone.blue];
    let overlay = [color.red, color.green, color.blue];
    for channel in 0..3 {
        let gray = rgb[channel] + (luma - rgb[channel]) * tone.gray;
        let toned = (gray + shift[channel]).clamp(0.0, 1.0);
        rgb[channel] = toned + (overlay[channel] - toned) * color.alpha;
    }
    [rgb[0], rgb[1], rgb[2], texel[3]]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dropping_a_target_logs_release_once() {
        let mut backend = HeadlessBackend::new(Size::new(4, 4));
        let target = backend.create_target(Size::new(2, 2)).unwrap();
        let id = target.id();
        drop(target);
        let releases = backend
            .commands()
            .into_iter()
            .filter(|command| *command == Command::Release { target: id })
            .count();
        assert_eq!(releases, 1);
    }

    #[test]
    fn fill_rect_respects_clip() {
        let mut backend = HeadlessBackend::new(Size::new(4, 4));
        let target = backend.create_target(Size::new(4, 4)).unwrap();
        backend.fill_rect(
            &target,
            Rect::new(0, 0, 4, 4),
            Rect::new(0, 0, 2, 4),
            Color::WHITE,
        );
        assert_eq!(target.pixel(1, 3), [255, 255, 255, 255]);
        assert_eq!(target.pixel(2, 0), [0, 0, 0, 0]);
    }

    #[test]
    fn crossfade_mixes_linearly() {
        let mut backend = HeadlessBackend::new(Size::new(2, 2));
        let frozen = backend.create_target(Size::new(2, 2)).unwrap();
        let current = backend.create_target(Size::new(2, 2)).unwrap();
        let dst = backend.create_target(Size::new(2, 2)).unwrap();
        backend.clear(&frozen, Color::BLACK);
        backend.clear(&current, Color::WHITE);
        backend.crossfade(&frozen, &current, &dst, 0.5);
        let [r, g, b, a] = dst.pixel(0, 0);
        assert!((127..=128).contains(&r));
        assert_eq!((r, g, b, a), (r, r, r, 255));
    }

    #[test]
    fn dissolve_weight_ramps_across_vague_band() {
        assert_eq!(dissolve_weight(0.0, 0.5, 0.25), 0.0);
        assert_eq!(dissolve_weight(1.0, 0.5, 0.25), 1.0);
        assert!((dissolve_weight(0.625, 0.5, 0.25) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn tone_gray_desaturates_before_overlay() {
        let texel = [1.0, 0.0, 0.0, 1.0];
        let out = apply_tone_and_color(texel, Tone::new(0.0, 0.0, 0.0, 1.0), Color::TRANSPARENT);
        assert!((out[0] - 0.299).abs() < 1e-5);
        assert!((out[1] - 0.299).abs() < 1e-5);

        let flashed = apply_tone_and_color(texel, Tone::default(), Color::WHITE);
        assert_eq!(flashed, [1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn present_with_flipped_rect_keeps_image_upright() {
        let mut backend = HeadlessBackend::new(Size::new(2, 2));
        let src = backend.create_target(Size::new(2, 2)).unwrap();
        backend.clear(&src, Color::BLACK);
        backend.fill_rect(&src, Rect::new(0, 0, 2, 1), Rect::new(0, 0, 2, 2), Color::WHITE);
        // Bottom-left origin: the source's top row must land on the window's top row.
        backend
            .present(&src, Rect::new(0, 0, 2, 2), Rect::new(0, 2, 2, -2))
            .unwrap();
        assert_eq!(backend.window_pixel(0, 0), [255, 255, 255, 255]);
        assert_eq!(backend.window_pixel(0, 1), [0, 0, 0, 255]);
    }

    #[test]
    fn write_then_read_pixels_rejects_bad_length() {
        let mut backend = HeadlessBackend::new(Size::new(2, 2));
        let target = backend.create_target(Size::new(2, 1)).unwrap();
        let data = [1, 2, 3, 4, 5, 6, 7, 8];
        backend
            .write_pixels(&target, Rect::new(0, 0, 2, 1), &data)
            .unwrap();
        assert_eq!(
            backend.read_pixels(&target, Rect::new(1, 0, 1, 1)).unwrap(),
            vec![5, 6, 7, 8]
        );
        let err = backend
            .write_pixels(&target, Rect::new(0, 0, 2, 1), &data[..4])
            .unwrap_err();
        assert!(matches!(err, GpuError::PixelLength { .. }));
    }
}
