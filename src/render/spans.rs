use crate::foundation::core::{Bgra8Premul, Rect};
use crate::foundation::error::{StrataError, StrataResult};
use crate::surface::pixel_buffer::PixelBuffer;

/// One row segment of a destination buffer, exclusively borrowed.
#[derive(Debug)]
pub(crate) struct SpanMut<'a> {
    pub(crate) x: usize,
    pub(crate) y: usize,
    pub(crate) px: &'a mut [Bgra8Premul],
}

impl SpanMut<'_> {
    pub(crate) fn len(&self) -> usize {
        self.px.len()
    }
}

/// Cut `dst` into disjoint mutable spans, one list per slice of rectangles.
///
/// The returned lists line up with `slices`. Rectangles must lie inside `dst`
/// and must not overlap, within a slice or across slices; either violation is a
/// precondition error and nothing is borrowed.
pub(crate) fn carve_spans<'a, S: AsRef<[Rect]>>(
    dst: &'a mut PixelBuffer,
    slices: &[S],
) -> StrataResult<Vec<Vec<SpanMut<'a>>>> {
    let mut cuts: Vec<(usize, usize, usize, usize)> = Vec::new();
    for (slice, rects) in slices.iter().enumerate() {
        for &rect in rects.as_ref() {
            dst.check_roi(rect)?;
            if rect.is_empty() {
                continue;
            }
            let (x0, x1) = (rect.left() as usize, rect.right() as usize);
            for y in rect.top()..rect.bottom() {
                cuts.push((y as usize, x0, x1, slice));
            }
        }
    }
    cuts.sort_unstable();

    let mut out: Vec<Vec<SpanMut<'a>>> = slices.iter().map(|_| Vec::new()).collect();
    let mut pending = cuts.iter().peekable();

    for (y, row) in dst.rows_mut().enumerate() {
        if pending.peek().is_none() {
            break;
        }
        let mut rest: &'a mut [Bgra8Premul] = row;
        let mut cursor = 0usize;
        while let Some(&&(cy, x0, x1, slice)) = pending.peek() {
            if cy != y {
                break;
            }
            pending.next();
            if x0 < cursor {
                return Err(StrataError::precondition(format!(
                    "render rectangles overlap on row {y} at x={x0}"
                )));
            }
            let (_, tail) = std::mem::take(&mut rest).split_at_mut(x0 - cursor);
            let (px, tail) = tail.split_at_mut(x1 - x0);
            rest = tail;
            cursor = x1;
            out[slice].push(SpanMut { x: x0, y, px });
        }
    }
    Ok(out)
}

#[cfg(test)]
#[path = "../../tests/unit/render/spans.rs"]
mod tests;
