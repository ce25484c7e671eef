use crate::foundation::core::{Bgra8Premul, Rect};
use crate::foundation::error::StrataResult;
use crate::layer::stack::LayerStack;
use crate::render::scheduler::TileScheduler;
use crate::render::spans::{SpanMut, carve_spans};
use crate::surface::pixel_buffer::PixelBuffer;

/// Composite `layers` into `dst` over `slices`, one pool job per slice.
///
/// Slices must be pairwise disjoint; the carve step rejects overlap before any
/// pixel is written.
pub(crate) fn composite_slices<S: AsRef<[Rect]>>(
    scheduler: &TileScheduler,
    layers: &LayerStack,
    dst: &mut PixelBuffer,
    slices: &[S],
    clear_background: bool,
) -> StrataResult<()> {
    let spans = carve_spans(dst, slices)?;
    tracing::trace!(
        slices = spans.len(),
        spans = spans.iter().map(Vec::len).sum::<usize>(),
        "carved destination"
    );
    scheduler.fan_out(spans, |_, mut spans| {
        composite_spans(layers, &mut spans, clear_background)
    })
}

/// Composite every visible layer, bottom to top, into `spans`.
///
/// With `clear_background`, a bottom layer that is visible, fully opaque and
/// uses the default blend is copied instead of blended and compositing resumes
/// at the next layer; otherwise the spans are cleared to transparent first.
pub(crate) fn composite_spans(
    layers: &LayerStack,
    spans: &mut [SpanMut<'_>],
    clear_background: bool,
) -> StrataResult<()> {
    let mut start = 0;
    if clear_background {
        match layers.bottom() {
            Some(base) if base.is_copyable_base() => {
                base.copy_spans(spans)?;
                start = 1;
            }
            _ => {
                for span in spans.iter_mut() {
                    span.px.fill(Bgra8Premul::TRANSPARENT);
                }
            }
        }
    }
    for layer in layers.iter().skip(start).filter(|l| l.is_visible()) {
        layer.render_spans(spans)?;
    }
    Ok(())
}
