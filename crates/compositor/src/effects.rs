use crate::gpu::{BlendState, RenderBackend};
use crate::target::RenderTarget;
use crate::types::{Color, Rect, Size, Tone};

/// True when any of tone, color or flash would change the image.
pub fn has_effect(color: Color, tone: Tone, flash: Color) -> bool {
    !tone.is_zero() || color.alpha != 0.0 || flash.alpha != 0.0
}

/// Overlay color for the viewport pass: the stronger of `color` and `flash`,
/// with the flash winning ties.
pub fn overlay_color(color: Color, flash: Color) -> Color {
    if flash.alpha >= color.alpha {
        flash
    } else {
        color
    }
}

/// Runs the tone/color/flash pass over `clip` of `front`.
///
/// The front buffer is first copied into `back` without clipping, then a
/// single unblended pass samples `back` and writes the result into `front`.
pub(crate) fn apply_viewport_effect<B: RenderBackend>(
    backend: &mut B,
    front: &RenderTarget<B>,
    back: &RenderTarget<B>,
    clip: Rect,
    color: Color,
    tone: Tone,
    flash: Color,
) {
    if !has_effect(color, tone, flash) {
        return;
    }

    backend.blit(
        front.raw(),
        front.rect(),
        back.raw(),
        back.rect(),
        None,
        1.0,
        BlendState::Replace,
    );
    backend.viewport_effect(
        back.raw(),
        front.raw(),
        clip,
        tone,
        overlay_color(color, flash),
    );
}

/// Alpha of the black quad drawn over the frame at `brightness`; `None` at
/// full brightness.
pub fn dim_alpha(brightness: u8) -> Option<f32> {
    if brightness == u8::MAX {
        None
    } else {
        Some((255 - brightness) as f32 / 255.0)
    }
}

/// Brightness for step `step` of a `duration` step fade from `start` toward
/// `target`. Truncates toward zero; callers force the exact end value.
pub fn fade_step(start: u8, target: u8, step: u32, duration: u32) -> i32 {
    let start = start as f32;
    let span = target as f32 - start;
    (start + span * (step as f32 / duration.max(1) as f32)) as i32
}

/// Progress of transition step `step` out of `duration`.
pub fn transition_progress(step: u32, duration: u32) -> f32 {
    step as f32 * (1.0 / duration.max(1) as f32)
}

/// Full-screen quad geometry, kept in sync with the logical resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenQuad {
    position: Rect,
}

impl ScreenQuad {
    pub fn new(size: Size) -> Self {
        Self {
            position: Rect::from_size(size),
        }
    }

    pub fn resize(&mut self, size: Size) {
        self.position = Rect::from_size(size);
    }

    pub fn rect(&self) -> Rect {
        self.position
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::{Command, HeadlessBackend};

    #[test]
    fn no_effect_when_everything_is_zero() {
        assert!(!has_effect(Color::WHITE.with_alpha(0.0), Tone::default(), Color::TRANSPARENT));
        assert!(has_effect(Color::TRANSPARENT, Tone::new(0.0, 0.0, 0.0, 0.5), Color::TRANSPARENT));
        assert!(has_effect(Color::TRANSPARENT, Tone::default(), Color::WHITE));
    }

    #[test]
    fn flash_wins_ties() {
        let color = Color::new(1.0, 0.0, 0.0, 0.5);
        let flash = Color::new(0.0, 0.0, 1.0, 0.5);
        assert_eq!(overlay_color(color, flash), flash);
        assert_eq!(overlay_color(color, flash.with_alpha(0.25)), color);
    }

    #[test]
    fn dimming_quad_alpha() {
        assert_eq!(dim_alpha(255), None);
        assert_eq!(dim_alpha(0), Some(1.0));
        assert!((dim_alpha(128).unwrap() - 127.0 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn fade_steps_truncate_toward_zero() {
        assert_eq!(fade_step(255, 0, 0, 10), 255);
        assert_eq!(fade_step(255, 0, 3, 10), 178);
        assert_eq!(fade_step(0, 255, 9, 10), 229);
        assert_eq!(fade_step(100, 100, 5, 10), 100);
    }

    #[test]
    fn progress_steps_evenly() {
        let values: Vec<f32> = (0..4).map(|step| transition_progress(step, 4)).collect();
        assert_eq!(values, vec![0.0, 0.25, 0.5, 0.75]);
    }

    #[test]
    fn effect_is_skipped_without_any_input() {
        let mut backend = HeadlessBackend::new(Size::new(4, 4));
        let front = RenderTarget::new(&mut backend, Size::new(4, 4)).unwrap();
        let back = RenderTarget::new(&mut backend, Size::new(4, 4)).unwrap();
        backend.clear_commands();
        apply_viewport_effect(
            &mut backend,
            &front,
            &back,
            front.rect(),
            Color::TRANSPARENT,
            Tone::default(),
            Color::TRANSPARENT,
        );
        assert!(backend.commands().is_empty());
    }

    #[test]
    fn effect_copies_front_then_draws_back_into_front() {
        let mut backend = HeadlessBackend::new(Size::new(4, 4));
        let front = RenderTarget::new(&mut backend, Size::new(4, 4)).unwrap();
        let back = RenderTarget::new(&mut backend, Size::new(4, 4)).unwrap();
        backend.clear_commands();
        let clip = Rect::new(1, 1, 2, 2);
        apply_viewport_effect(
            &mut backend,
            &front,
            &back,
            clip,
            Color::TRANSPARENT,
            Tone::new(0.5, 0.0, 0.0, 0.0),
            Color::TRANSPARENT,
        );
        let commands = backend.commands();
        assert!(matches!(
            commands[0],
            Command::Blit { src, dst, blend: BlendState::Replace, .. }
                if src == front.raw().id() && dst == back.raw().id()
        ));
        assert!(matches!(
            commands[1],
            Command::ViewportEffect { src, dst, clip: c, .. }
                if src == back.raw().id() && dst == front.raw().id() && c == clip
        ));
    }
}
