use glam::DVec2;
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle: top-left position and size.
///
/// Containment is inclusive on every edge, so a rectangle contains itself
/// and a zero-sized rectangle sitting on an edge is still inside.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub position: DVec2,
    pub size: DVec2,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            position: DVec2::new(x, y),
            size: DVec2::new(width, height),
        }
    }

    pub fn from_pos_size(position: DVec2, size: DVec2) -> Self {
        Self { position, size }
    }

    pub fn min(&self) -> DVec2 {
        self.position
    }

    pub fn max(&self) -> DVec2 {
        self.position + self.size
    }

    pub fn width(&self) -> f64 {
        self.size.x
    }

    pub fn height(&self) -> f64 {
        self.size.y
    }

    /// True if `other` lies fully inside this rectangle.
    pub fn contains_rect(&self, other: &Rect) -> bool {
        let (min, max) = (self.min(), self.max());
        let (omin, omax) = (other.min(), other.max());
        omin.x >= min.x && omin.y >= min.y && omax.x <= max.x && omax.y <= max.y
    }

    pub fn contains_point(&self, point: DVec2) -> bool {
        let (min, max) = (self.min(), self.max());
        point.x >= min.x && point.y >= min.y && point.x <= max.x && point.y <= max.y
    }

    /// True if the interiors of both rectangles overlap.
    pub fn intersects(&self, other: &Rect) -> bool {
        let (min, max) = (self.min(), self.max());
        let (omin, omax) = (other.min(), other.max());
        omin.x < max.x && omax.x > min.x && omin.y < max.y && omax.y > min.y
    }

    pub fn center(&self) -> DVec2 {
        self.position + self.size * 0.5
    }
}

impl std::fmt::Display for Rect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({:.2}, {:.2}) {:.2}x{:.2}",
            self.position.x, self.position.y, self.size.x, self.size.y
        )
    }
}

/// RGBA colour, 8 bits per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const RED: Color = Color::rgb(255, 0, 0);
    pub const BLUE: Color = Color::rgb(0, 0, 255);
    pub const CYAN: Color = Color::rgb(0, 255, 255);
    pub const GRAY: Color = Color::rgb(128, 128, 128);
    pub const DARK_GRAY: Color = Color::rgb(64, 64, 64);
    pub const ORANGE: Color = Color::rgb(255, 200, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
    }
}

/// Splitmix64 step function. Deterministic across platforms, used wherever
/// reproducible pseudo-random placement is needed.
pub fn splitmix64(mut state: u64) -> u64 {
    state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
    let mut z = state;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

/// Map a splitmix64 output to a float in `[0, 1)`.
pub fn unit_f64(bits: u64) -> f64 {
    (bits >> 11) as f64 / (1u64 << 53) as f64
}
