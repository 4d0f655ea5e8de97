// Core types shared by the gesture pipeline, the ink and the overlay.

use std::fmt::{self, Display};
use std::str::FromStr;

use serde::Deserialize;

use crate::error::Error;

/// A plain pixel buffer.
/// The screen stores 0x00RRGGBB (what minifb wants); the ink and overlay
/// layers store 0xAARRGGBB where alpha 0 means "nothing painted here".
#[derive(Clone, Debug, PartialEq)]
pub struct FrameBuffer {
    pub width: usize,     // how wide the buffer is (pixels)
    pub height: usize,    // how tall the buffer is (pixels)
    pub pixels: Vec<u32>, // row-major, length = width * height
}

impl FrameBuffer {
    /// A buffer with every pixel set to `color`.
    pub fn filled(width: usize, height: usize, color: u32) -> Self {
        Self { width, height, pixels: vec![color; width * height] }
    }

    /// A fully transparent layer.
    pub fn transparent(width: usize, height: usize) -> Self {
        Self::filled(width, height, 0)
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Option<u32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.pixels[y * self.width + x])
    }
}

/// One hand keypoint in normalized camera space: x,y in [0,1], origin
/// top-left, y down. Depth is dropped at the source boundary.
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
}

impl Landmark {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Landmark) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// A point in canvas pixel space.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Opaque RGB color packed as 0x00RRGGBB.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rgb(pub u32);

impl Rgb {
    pub const CYAN: Rgb = Rgb(0x00_E5_FF);
    pub const VIOLET: Rgb = Rgb(0x7C_4D_FF);
    pub const BLUE: Rgb = Rgb(0x44_8A_FF);
    pub const PINK: Rgb = Rgb(0xFF_40_81);
    pub const GREEN: Rgb = Rgb(0x00_E6_76);
    pub const WHITE: Rgb = Rgb(0xFF_FF_FF);

    /// The six swatches bound to keys 1..6.
    pub const PALETTE: [Rgb; 6] = [Rgb::CYAN, Rgb::VIOLET, Rgb::BLUE, Rgb::PINK, Rgb::GREEN, Rgb::WHITE];

    /// Pack with an alpha byte for the layer buffers (0xAARRGGBB).
    #[inline]
    pub fn with_alpha(self, alpha: u8) -> u32 {
        ((alpha as u32) << 24) | (self.0 & 0x00FF_FFFF)
    }

    /// Same as `with_alpha` but from an opacity in [0,1].
    #[inline]
    pub fn with_opacity(self, opacity: f32) -> u32 {
        self.with_alpha((opacity.clamp(0.0, 1.0) * 255.0).round() as u8)
    }
}

impl FromStr for Rgb {
    type Err = Error;

    /// Accepts `#rrggbb` or `rrggbb`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(Error::Config(format!("color must look like #rrggbb, got {s:?}")));
        }
        u32::from_str_radix(hex, 16)
            .map(Rgb)
            .map_err(|e| Error::Config(format!("bad color {s:?}: {e}")))
    }
}

impl Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:06x}", self.0 & 0x00FF_FFFF)
    }
}

/// Paint attributes carried by every segment. Caps and joins are always round.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Paint {
    pub color: Rgb,
    pub width: f32,
}

/// The atomic unit committed to the ink: a straight, round-capped line.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StrokeSegment {
    pub from: Point,
    pub to: Point,
    pub paint: Paint,
}

/// Binary pen state derived from the pinch gesture (or the mouse button).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PenState {
    Up,
    Down,
}

/// Which input channel is allowed to drive the ink.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum InputMode {
    #[default]
    Gesture,
    Pointer,
}

impl Display for InputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            InputMode::Gesture => "AIR DRAW",
            InputMode::Pointer => "SCRIBBLE",
        })
    }
}
