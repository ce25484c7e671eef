use crate::foundation::error::{StrataError, StrataResult};
use crate::foundation::math::{mul_div255_u8, unpremultiply};

/// Integer axis-aligned rectangle, half-open on the right and bottom edges.
///
/// A rectangle with a non-positive width or height is empty. Empty rectangles
/// compare by value like any other, so prefer [`Rect::is_empty`] over `== Rect::default()`.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct Rect {
    /// Left edge (inclusive).
    pub x: i32,
    /// Top edge (inclusive).
    pub y: i32,
    /// Width in pixels.
    pub width: i32,
    /// Height in pixels.
    pub height: i32,
}

impl Rect {
    /// Create a rectangle from its origin and size.
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Create a rectangle from its edges. Inverted edges produce an empty rectangle.
    pub fn from_ltrb(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            x: left,
            y: top,
            width: right.saturating_sub(left).max(0),
            height: bottom.saturating_sub(top).max(0),
        }
    }

    /// Rectangle at the origin covering `size`.
    pub fn from_size(size: Size) -> Self {
        Self::new(0, 0, size.width as i32, size.height as i32)
    }

    /// Left edge (inclusive).
    pub fn left(self) -> i32 {
        self.x
    }

    /// Top edge (inclusive).
    pub fn top(self) -> i32 {
        self.y
    }

    /// Right edge (exclusive).
    pub fn right(self) -> i32 {
        self.x.saturating_add(self.width)
    }

    /// Bottom edge (exclusive).
    pub fn bottom(self) -> i32 {
        self.y.saturating_add(self.height)
    }

    /// Return `true` when the rectangle covers no pixels.
    pub fn is_empty(self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Number of covered pixels (0 for empty rectangles).
    pub fn area(self) -> u64 {
        if self.is_empty() {
            return 0;
        }
        u64::from(self.width as u32) * u64::from(self.height as u32)
    }

    /// Overlap of two rectangles. Disjoint inputs give an empty rectangle.
    pub fn intersect(self, other: Rect) -> Rect {
        let l = self.left().max(other.left());
        let t = self.top().max(other.top());
        let r = self.right().min(other.right());
        let b = self.bottom().min(other.bottom());
        if r <= l || b <= t {
            return Rect::default();
        }
        Rect::from_ltrb(l, t, r, b)
    }

    /// Return `true` when the two rectangles share at least one pixel.
    pub fn intersects(self, other: Rect) -> bool {
        !self.intersect(other).is_empty()
    }

    /// Smallest rectangle containing both inputs. Empty inputs are ignored.
    pub fn union(self, other: Rect) -> Rect {
        if self.is_empty() {
            return other;
        }
        if other.is_empty() {
            return self;
        }
        Rect::from_ltrb(
            self.left().min(other.left()),
            self.top().min(other.top()),
            self.right().max(other.right()),
            self.bottom().max(other.bottom()),
        )
    }

    /// Return `true` when pixel `(x, y)` lies inside the rectangle.
    pub fn contains(self, x: i32, y: i32) -> bool {
        x >= self.left() && x < self.right() && y >= self.top() && y < self.bottom()
    }

    /// Return `true` when `inner` lies completely inside `self`.
    ///
    /// Empty rectangles are contained only when their origin is inside or on the edge.
    pub fn contains_rect(self, inner: Rect) -> bool {
        inner.left() >= self.left()
            && inner.top() >= self.top()
            && inner.right() <= self.right()
            && inner.bottom() <= self.bottom()
    }

    /// Drop the parts of the rectangle that lie at negative coordinates.
    pub fn clip_non_negative(self) -> Rect {
        if self.is_empty() {
            return Rect::default();
        }
        Rect::from_ltrb(
            self.left().max(0),
            self.top().max(0),
            self.right().max(0),
            self.bottom().max(0),
        )
    }
}

/// Pixel dimensions of a buffer, layer, or document.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct Size {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Size {
    /// Largest edge accepted anywhere in the crate; keeps every coordinate representable as `i32`.
    pub const MAX_EDGE: u32 = i32::MAX as u32;

    /// Create a size without validation.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Create a size, rejecting edges that do not fit rectangle coordinates.
    pub fn checked(width: u32, height: u32) -> StrataResult<Self> {
        if width > Self::MAX_EDGE || height > Self::MAX_EDGE {
            return Err(StrataError::precondition(format!(
                "size {width}x{height} exceeds the maximum edge of {}",
                Self::MAX_EDGE
            )));
        }
        Ok(Self { width, height })
    }

    /// Number of pixels.
    pub fn pixel_count(self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Return `true` when either edge is zero.
    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl std::fmt::Display for Size {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Premultiplied BGRA8 pixel (b,g,r already multiplied by a).
#[repr(C)]
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct Bgra8Premul {
    /// Blue channel premultiplied by alpha.
    pub b: u8,
    /// Green channel premultiplied by alpha.
    pub g: u8,
    /// Red channel premultiplied by alpha.
    pub r: u8,
    /// Alpha channel.
    pub a: u8,
}

impl Bgra8Premul {
    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self::new(0, 0, 0, 0);

    /// Opaque white.
    pub const WHITE: Self = Self::new(255, 255, 255, 255);

    /// Opaque black.
    pub const BLACK: Self = Self::new(0, 0, 0, 255);

    /// Create a pixel from already-premultiplied channels.
    pub const fn new(b: u8, g: u8, r: u8, a: u8) -> Self {
        Self { b, g, r, a }
    }

    /// Create an opaque pixel.
    pub const fn opaque(b: u8, g: u8, r: u8) -> Self {
        Self::new(b, g, r, 255)
    }

    /// Convert straight-alpha BGRA8 into premultiplied BGRA8.
    pub fn from_straight(b: u8, g: u8, r: u8, a: u8) -> Self {
        let a16 = u16::from(a);
        Self {
            b: mul_div255_u8(u16::from(b), a16),
            g: mul_div255_u8(u16::from(g), a16),
            r: mul_div255_u8(u16::from(r), a16),
            a,
        }
    }

    /// Convert back to straight-alpha `[b, g, r, a]`.
    pub fn to_straight(self) -> [u8; 4] {
        [
            unpremultiply(self.b, self.a),
            unpremultiply(self.g, self.a),
            unpremultiply(self.r, self.a),
            self.a,
        ]
    }

    /// Channels in memory order.
    pub fn to_array(self) -> [u8; 4] {
        [self.b, self.g, self.r, self.a]
    }
}

impl From<[u8; 4]> for Bgra8Premul {
    fn from(v: [u8; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
