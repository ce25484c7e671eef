use smallvec::SmallVec;

use crate::blend::ops::{BlendMode, BlendOp, WithOpacity, fade};
use crate::foundation::core::Bgra8Premul;

/// Pixels faded per batch before handing them to the base op.
const FADE_CHUNK: usize = 256;

/// A blend op resolved for one (mode, opacity) pair.
///
/// Layers cache this and rebuild it only when their opacity or mode changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum CompiledBlend {
    /// Opacity 0: rendering is a no-op.
    Skip,
    /// Opacity 255: the mode applies to the source as-is.
    Direct(BlendMode),
    /// Anything in between.
    Faded(WithOpacity<BlendMode>),
}

impl CompiledBlend {
    pub(crate) fn compile(mode: BlendMode, opacity: u8) -> Self {
        match opacity {
            0 => CompiledBlend::Skip,
            255 => CompiledBlend::Direct(mode),
            o => CompiledBlend::Faded(mode.with_opacity(o)),
        }
    }

    pub(crate) fn is_skip(&self) -> bool {
        matches!(self, CompiledBlend::Skip)
    }

    /// Blend a scanline of `src` onto `dst`.
    pub(crate) fn apply(&self, dst: &mut [Bgra8Premul], src: &[Bgra8Premul]) {
        match self {
            CompiledBlend::Skip => {}
            CompiledBlend::Direct(mode) => mode.apply(dst, src),
            CompiledBlend::Faded(op) => {
                // Fade into a stack buffer so the base op still takes its per-row fast path.
                let mut faded: SmallVec<[Bgra8Premul; FADE_CHUNK]> = SmallVec::new();
                for (d, s) in dst.chunks_mut(FADE_CHUNK).zip(src.chunks(FADE_CHUNK)) {
                    faded.clear();
                    faded.extend(s.iter().map(|&px| fade(px, op.opacity())));
                    op.base().apply(d, &faded);
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/blend/compiled.rs"]
mod tests;
