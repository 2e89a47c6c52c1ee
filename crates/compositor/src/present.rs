use crate::gpu::{GpuError, RenderBackend};
use crate::target::RenderTarget;
use crate::types::{Rect, Size};

/// Largest rectangle with the aspect ratio of `logical` centered in `window`.
pub fn letterbox(window: Size, logical: Size) -> Rect {
    if window.is_empty() || logical.is_empty() {
        return Rect::from_size(window);
    }
    let window_ratio = window.width as f32 / window.height as f32;
    let screen_ratio = logical.width as f32 / logical.height as f32;

    let mut width = window.width as f32;
    let mut height = window.height as f32;
    if screen_ratio > window_ratio {
        height = width / screen_ratio;
    } else if screen_ratio < window_ratio {
        width = height * screen_ratio;
    }

    let x = (window.width as f32 - width) / 2.0;
    let y = (window.height as f32 - height) / 2.0;
    Rect::new(x as i32, y as i32, width as i32, height as i32)
}

/// Same area addressed from its opposite horizontal edge.
pub fn flip_vertical(rect: Rect) -> Rect {
    Rect::new(rect.x, rect.y + rect.height, rect.width, -rect.height)
}

/// Letterboxes `source` into the window and swaps. A minimized window (zero
/// size) skips the frame.
pub fn present_screen<B: RenderBackend>(
    backend: &mut B,
    source: &RenderTarget<B>,
) -> Result<(), GpuError> {
    let window = backend.window_size();
    if window.is_empty() {
        tracing::trace!("window has no area; skipping present");
        return Ok(());
    }
    let viewport = letterbox(window, source.size());
    backend.present(source.raw(), source.rect(), flip_vertical(viewport))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::HeadlessBackend;
    use crate::types::Color;

    #[test]
    fn matching_aspect_fills_window() {
        assert_eq!(
            letterbox(Size::new(1088, 832), Size::new(544, 416)),
            Rect::new(0, 0, 1088, 832)
        );
    }

    #[test]
    fn wider_window_pillarboxes() {
        assert_eq!(
            letterbox(Size::new(1920, 1080), Size::new(640, 480)),
            Rect::new(240, 0, 1440, 1080)
        );
    }

    #[test]
    fn taller_window_letterboxes() {
        assert_eq!(
            letterbox(Size::new(640, 960), Size::new(640, 480)),
            Rect::new(0, 240, 640, 480)
        );
    }

    #[test]
    fn flip_keeps_area() {
        assert_eq!(flip_vertical(Rect::new(2, 3, 10, 20)), Rect::new(2, 23, 10, -20));
    }

    #[test]
    fn presented_image_is_upright_and_bars_are_black() {
        let mut backend = HeadlessBackend::new(Size::new(4, 2));
        let source = RenderTarget::new(&mut backend, Size::new(2, 2)).unwrap();
        source.clear(&mut backend, Color::BLACK);
        backend.fill_rect(source.raw(), Rect::new(0, 0, 2, 1), source.rect(), Color::WHITE);
        present_screen(&mut backend, &source).unwrap();

        assert_eq!(backend.window_pixel(1, 0), [255, 255, 255, 255]);
        assert_eq!(backend.window_pixel(1, 1), [0, 0, 0, 255]);
        assert_eq!(backend.window_pixel(0, 0), [0, 0, 0, 255]);
        assert_eq!(backend.present_count(), 1);
    }

    #[test]
    fn zero_sized_window_skips_present() {
        let mut backend = HeadlessBackend::new(Size::new(0, 0));
        let source = RenderTarget::new(&mut backend, Size::new(2, 2)).unwrap();
        present_screen(&mut backend, &source).unwrap();
        assert_eq!(backend.present_count(), 0);
    }
}
