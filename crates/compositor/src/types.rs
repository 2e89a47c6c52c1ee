/// Pixel dimensions of a target, window or logical screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Clamps both dimensions to at least one pixel.
    pub fn at_least_one(self) -> Self {
        Self::new(self.width.max(1), self.height.max(1))
    }

    pub fn byte_len(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }
}

/// Integer rectangle in pixel space.
///
/// `height` is signed so a destination rectangle can describe a vertical flip
/// (see [`crate::flip_vertical`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_size(size: Size) -> Self {
        Self::new(0, 0, size.width as i32, size.height as i32)
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub fn translate(&self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    /// Overlap of two rectangles with positive extents; empty when disjoint.
    pub fn intersect(&self, other: &Rect) -> Rect {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = self.right().min(other.right());
        let y1 = self.bottom().min(other.bottom());
        if x1 <= x0 || y1 <= y0 {
            Rect::new(x0, y0, 0, 0)
        } else {
            Rect::new(x0, y0, x1 - x0, y1 - y0)
        }
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }
}

/// Normalized RGBA color, each channel in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Color {
    pub red: f32,
    pub green: f32,
    pub blue: f32,
    pub alpha: f32,
}

impl Color {
    pub const TRANSPARENT: Color = Color::new(0.0, 0.0, 0.0, 0.0);
    pub const BLACK: Color = Color::new(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Color = Color::new(1.0, 1.0, 1.0, 1.0);

    pub const fn new(red: f32, green: f32, blue: f32, alpha: f32) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    /// Builds a color from the 0-255 channel values scripts work with.
    pub fn from_rgba8(red: u8, green: u8, blue: u8, alpha: u8) -> Self {
        Self::new(
            red as f32 / 255.0,
            green as f32 / 255.0,
            blue as f32 / 255.0,
            alpha as f32 / 255.0,
        )
    }

    pub fn with_alpha(self, alpha: f32) -> Self {
        Self { alpha, ..self }
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.red, self.green, self.blue, self.alpha]
    }

    pub fn to_rgba8(self) -> [u8; 4] {
        let quantize = |value: f32| (value.clamp(0.0, 1.0) * 255.0).round() as u8;
        [
            quantize(self.red),
            quantize(self.green),
            quantize(self.blue),
            quantize(self.alpha),
        ]
    }
}

/// Additive color shift plus desaturation amount.
///
/// `red`/`green`/`blue` are in `-1.0..=1.0`, `gray` in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Tone {
    pub red: f32,
    pub green: f32,
    pub blue: f32,
    pub gray: f32,
}

impl Tone {
    pub const fn new(red: f32, green: f32, blue: f32, gray: f32) -> Self {
        Self {
            red,
            green,
            blue,
            gray,
        }
    }

    /// Builds a tone from script values: `-255..=255` shifts and `0..=255` gray.
    pub fn from_script(red: i32, green: i32, blue: i32, gray: i32) -> Self {
        let shift = |value: i32| value.clamp(-255, 255) as f32 / 255.0;
        Self::new(
            shift(red),
            shift(green),
            shift(blue),
            gray.clamp(0, 255) as f32 / 255.0,
        )
    }

    pub fn is_zero(&self) -> bool {
        self.red == 0.0 && self.green == 0.0 && self.blue == 0.0 && self.gray == 0.0
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.red, self.green, self.blue, self.gray]
    }
}

/// Engine generation the running content was authored for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentVersion {
    Rgss1,
    Rgss2,
    #[default]
    Rgss3,
}

impl ContentVersion {
    /// Frame rate restored by [`crate::Compositor::reset`].
    pub fn default_frame_rate(self) -> u32 {
        match self {
            ContentVersion::Rgss1 => 40,
            ContentVersion::Rgss2 | ContentVersion::Rgss3 => 60,
        }
    }
}

/// Power preference forwarded to adapter selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GpuPowerPreference {
    Low,
    #[default]
    High,
}

/// Options for the wgpu device and surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpuOptions {
    pub power: GpuPowerPreference,
    /// Present with Fifo when true, otherwise prefer Immediate/Mailbox.
    pub vsync: bool,
}

impl Default for GpuOptions {
    fn default() -> Self {
        Self {
            power: GpuPowerPreference::default(),
            vsync: true,
        }
    }
}

/// Immutable configuration handed to [`crate::Compositor::new`].
#[derive(Debug, Clone, PartialEq)]
pub struct CompositorConfig {
    /// Logical resolution every offscreen target is allocated at.
    pub resolution: Size,
    pub content_version: ContentVersion,
    /// Allow `update` to drop composites when pacing falls behind.
    pub allow_frame_skip: bool,
    /// Initial frame rate; `None` uses the content version default.
    pub frame_rate: Option<u32>,
}

impl Default for CompositorConfig {
    fn default() -> Self {
        Self {
            resolution: Size::new(544, 416),
            content_version: ContentVersion::default(),
            allow_frame_skip: false,
            frame_rate: None,
        }
    }
}
