use crate::foundation::core::Bgra8Premul;
use crate::foundation::error::{StrataError, StrataResult};
use crate::foundation::math::{mul_div255_u8, unpremultiply};

/// Per-pixel combination of a source pixel onto a destination pixel.
///
/// Implementations must be pure integer functions so results are identical
/// on every platform.
pub trait BlendOp: Send + Sync {
    /// Combine one source pixel onto one destination pixel.
    fn blend(&self, dst: Bgra8Premul, src: Bgra8Premul) -> Bgra8Premul;

    /// Blend a scanline of `src` onto `dst`. Both spans have the same length.
    fn apply(&self, dst: &mut [Bgra8Premul], src: &[Bgra8Premul]) {
        debug_assert_eq!(dst.len(), src.len());
        for (d, s) in dst.iter_mut().zip(src) {
            *d = self.blend(*d, *s);
        }
    }

    /// Wrap this op so the source is faded by `opacity / 255` first.
    fn with_opacity(self, opacity: u8) -> WithOpacity<Self>
    where
        Self: Sized,
    {
        WithOpacity {
            base: self,
            opacity,
        }
    }
}

/// Built-in blend modes. [`BlendMode::Normal`] is the default.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum BlendMode {
    /// Source over destination.
    #[default]
    Normal,
    /// Channel product; darkens.
    Multiply,
    /// Saturating channel sum.
    Additive,
    /// Inverted product of inverses; lightens.
    Screen,
    /// Per-channel minimum.
    Darken,
    /// Per-channel maximum.
    Lighten,
    /// Absolute channel difference.
    Difference,
    /// `255 - |255 - b - s|`.
    Negation,
}

impl BlendMode {
    /// Every mode, in declaration order.
    pub const ALL: [BlendMode; 8] = [
        BlendMode::Normal,
        BlendMode::Multiply,
        BlendMode::Additive,
        BlendMode::Screen,
        BlendMode::Darken,
        BlendMode::Lighten,
        BlendMode::Difference,
        BlendMode::Negation,
    ];

    /// Stable lowercase name, matching the serde representation.
    pub fn name(self) -> &'static str {
        match self {
            BlendMode::Normal => "normal",
            BlendMode::Multiply => "multiply",
            BlendMode::Additive => "additive",
            BlendMode::Screen => "screen",
            BlendMode::Darken => "darken",
            BlendMode::Lighten => "lighten",
            BlendMode::Difference => "difference",
            BlendMode::Negation => "negation",
        }
    }

    /// Return `true` for the designated default mode.
    pub fn is_default(self) -> bool {
        self == BlendMode::default()
    }

    fn channel_fn(self) -> fn(u8, u8) -> u8 {
        match self {
            BlendMode::Normal => source,
            BlendMode::Multiply => multiply,
            BlendMode::Additive => additive,
            BlendMode::Screen => screen,
            BlendMode::Darken => darken,
            BlendMode::Lighten => lighten,
            BlendMode::Difference => difference,
            BlendMode::Negation => negation,
        }
    }
}

fn source(_b: u8, s: u8) -> u8 {
    s
}

fn multiply(b: u8, s: u8) -> u8 {
    mul_div255_u8(u16::from(b), u16::from(s))
}

fn additive(b: u8, s: u8) -> u8 {
    b.saturating_add(s)
}

fn screen(b: u8, s: u8) -> u8 {
    (u16::from(b) + u16::from(s) - u16::from(multiply(b, s))) as u8
}

fn darken(b: u8, s: u8) -> u8 {
    b.min(s)
}

fn lighten(b: u8, s: u8) -> u8 {
    b.max(s)
}

fn difference(b: u8, s: u8) -> u8 {
    b.abs_diff(s)
}

fn negation(b: u8, s: u8) -> u8 {
    let d = (255 - i16::from(b) - i16::from(s)).unsigned_abs();
    (255 - d.min(255)) as u8
}

impl std::fmt::Display for BlendMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for BlendMode {
    type Err = StrataError;

    fn from_str(s: &str) -> StrataResult<Self> {
        BlendMode::ALL
            .into_iter()
            .find(|m| m.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| StrataError::validation(format!("unknown blend mode '{s}'")))
    }
}

impl BlendOp for BlendMode {
    fn blend(&self, dst: Bgra8Premul, src: Bgra8Premul) -> Bgra8Premul {
        match self {
            BlendMode::Normal => over(dst, src),
            mode => separable(dst, src, mode.channel_fn()),
        }
    }

    fn apply(&self, dst: &mut [Bgra8Premul], src: &[Bgra8Premul]) {
        debug_assert_eq!(dst.len(), src.len());
        match self {
            BlendMode::Normal => {
                for (d, s) in dst.iter_mut().zip(src) {
                    *d = over(*d, *s);
                }
            }
            mode => {
                let f = mode.channel_fn();
                for (d, s) in dst.iter_mut().zip(src) {
                    *d = separable(*d, *s, f);
                }
            }
        }
    }
}

/// A base op applied to a source faded by a constant opacity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WithOpacity<B> {
    base: B,
    opacity: u8,
}

impl<B> WithOpacity<B> {
    /// The wrapped op.
    pub fn base(&self) -> &B {
        &self.base
    }

    /// Fade factor applied to the source, 0..=255.
    pub fn opacity(&self) -> u8 {
        self.opacity
    }
}

impl<B: BlendOp> BlendOp for WithOpacity<B> {
    fn blend(&self, dst: Bgra8Premul, src: Bgra8Premul) -> Bgra8Premul {
        self.base.blend(dst, fade(src, self.opacity))
    }
}

/// Scale every premultiplied channel by `opacity / 255`.
pub fn fade(px: Bgra8Premul, opacity: u8) -> Bgra8Premul {
    if opacity == 255 {
        return px;
    }
    let o = u16::from(opacity);
    Bgra8Premul::new(
        mul_div255_u8(u16::from(px.b), o),
        mul_div255_u8(u16::from(px.g), o),
        mul_div255_u8(u16::from(px.r), o),
        mul_div255_u8(u16::from(px.a), o),
    )
}

/// Premultiplied source-over.
pub fn over(dst: Bgra8Premul, src: Bgra8Premul) -> Bgra8Premul {
    match src.a {
        0 => return dst,
        255 => return src,
        _ => {}
    }
    let inv = 255u16 - u16::from(src.a);
    let ch = |s: u8, d: u8| s.saturating_add(mul_div255_u8(u16::from(d), inv));
    Bgra8Premul::new(
        ch(src.b, dst.b),
        ch(src.g, dst.g),
        ch(src.r, dst.r),
        ch(src.a, dst.a),
    )
}

/// General separable blend on premultiplied pixels.
///
/// `f` receives straight (un-premultiplied) backdrop and source channels.
fn separable(dst: Bgra8Premul, src: Bgra8Premul, f: fn(u8, u8) -> u8) -> Bgra8Premul {
    if src.a == 0 {
        return dst;
    }
    let (sa, da) = (src.a, dst.a);
    let inv_sa = 255u16 - u16::from(sa);
    let inv_da = 255u16 - u16::from(da);

    let ch = |s: u8, d: u8| -> u8 {
        let mixed = if da == 0 {
            0
        } else {
            let m = f(unpremultiply(d, da), unpremultiply(s, sa));
            mul_div255_u8(u16::from(mul_div255_u8(u16::from(m), u16::from(sa))), u16::from(da))
        };
        let sum = u16::from(mul_div255_u8(u16::from(s), inv_da))
            + u16::from(mul_div255_u8(u16::from(d), inv_sa))
            + u16::from(mixed);
        sum.min(255) as u8
    };

    Bgra8Premul::new(
        ch(src.b, dst.b),
        ch(src.g, dst.g),
        ch(src.r, dst.r),
        sa.saturating_add(mul_div255_u8(u16::from(da), inv_sa)),
    )
}

#[cfg(test)]
#[path = "../../tests/unit/blend/ops.rs"]
mod tests;
