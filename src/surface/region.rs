use std::cell::OnceCell;

use smallvec::SmallVec;

use crate::foundation::core::Rect;

/// Smallest raw rectangle count at which `add` folds the list into its normalized scans.
const COMPACT_THRESHOLD: usize = 1024;

type Spans = SmallVec<[(i32, i32); 8]>;

/// Area of interest built from axis-aligned rectangles.
///
/// Insertion just appends to a list; the non-overlapping decomposition is
/// computed by a sweep line the first time [`Region::scans`] is called after a
/// mutation and cached until the next one. Invalidations are frequent and
/// scan queries rare, so the cost lands on the query side.
#[derive(Clone, Debug, Default)]
pub struct Region {
    rects: Vec<Rect>,
    scans: OnceCell<Vec<Rect>>,
    // Length of `rects` right after the last compaction.
    compacted_len: usize,
}

impl Region {
    /// Empty region.
    pub fn new() -> Self {
        Self::default()
    }

    /// Region covering a single rectangle.
    pub fn from_rect(rect: Rect) -> Self {
        let mut r = Self::new();
        r.add(rect);
        r
    }

    /// Union `rect` into the region.
    ///
    /// Parts at negative coordinates are dropped; an empty rectangle is a no-op.
    pub fn add(&mut self, rect: Rect) {
        let rect = rect.clip_non_negative();
        if rect.is_empty() {
            return;
        }
        // Compact once the list has doubled since the last compaction.
        if self.rects.len() >= (2 * self.compacted_len).max(COMPACT_THRESHOLD) {
            self.rects = self.scans().to_vec();
            self.compacted_len = self.rects.len();
        }
        self.rects.push(rect);
        self.scans.take();
    }

    /// Union every rectangle of `other` into the region.
    pub fn union(&mut self, other: &Region) {
        for &r in other.scans() {
            self.add(r);
        }
    }

    /// Restrict the region to `clip`.
    pub fn intersect_rect(&mut self, clip: Rect) {
        self.rects = self
            .rects
            .iter()
            .map(|r| r.intersect(clip))
            .filter(|r| !r.is_empty())
            .collect();
        self.compacted_len = self.compacted_len.min(self.rects.len());
        self.scans.take();
    }

    /// Remove everything.
    pub fn clear(&mut self) {
        self.rects.clear();
        self.compacted_len = 0;
        self.scans.take();
    }

    /// Return `true` when the region covers no pixels.
    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    /// Rectangles as they were added (possibly overlapping).
    pub fn rects(&self) -> &[Rect] {
        &self.rects
    }

    /// Non-overlapping rectangles whose union is exactly the region.
    ///
    /// Output is banded: sorted by top edge, then left edge. Within a band,
    /// touching spans are merged, and consecutive bands with identical spans
    /// are merged vertically. Calling this again without mutating returns the
    /// same cached slice.
    pub fn scans(&self) -> &[Rect] {
        self.scans.get_or_init(|| normalize(&self.rects))
    }

    /// Smallest rectangle containing the region, or `None` when empty.
    pub fn bounding_box(&self) -> Option<Rect> {
        let mut it = self.rects.iter().copied();
        let first = it.next()?;
        Some(it.fold(first, Rect::union))
    }

    /// Number of covered pixels.
    pub fn area(&self) -> u64 {
        self.scans().iter().map(|r| r.area()).sum()
    }

    /// Return `true` when pixel `(x, y)` is covered.
    pub fn contains(&self, x: i32, y: i32) -> bool {
        self.rects.iter().any(|r| r.contains(x, y))
    }
}

fn normalize(rects: &[Rect]) -> Vec<Rect> {
    match rects {
        [] => return Vec::new(),
        [only] => return vec![*only],
        _ => {}
    }

    let mut ys: Vec<i32> = rects.iter().flat_map(|r| [r.top(), r.bottom()]).collect();
    ys.sort_unstable();
    ys.dedup();

    let mut by_top = rects.to_vec();
    by_top.sort_unstable_by_key(|r| r.top());
    let mut pending = by_top.into_iter().peekable();
    let mut active: Vec<Rect> = Vec::new();

    let mut out = Vec::new();
    let mut open: Vec<Rect> = Vec::new();
    let mut prev: Spans = SmallVec::new();

    for band in ys.windows(2) {
        let (y0, y1) = (band[0], band[1]);
        active.retain(|r| r.bottom() > y0);
        while let Some(r) = pending.next_if(|r| r.top() <= y0) {
            active.push(r);
        }
        let spans = band_spans(&active);

        // Open rects always end at y0 here, so equal spans can simply grow downwards.
        if !open.is_empty() && spans == prev {
            for r in &mut open {
                r.height = y1 - r.y;
            }
            continue;
        }

        out.append(&mut open);
        open.extend(spans.iter().map(|&(l, r)| Rect::from_ltrb(l, y0, r, y1)));
        prev = spans;
    }

    out.append(&mut open);
    out
}

/// Merged horizontal spans of the rectangles crossing the current band.
fn band_spans(active: &[Rect]) -> Spans {
    let mut raw: Spans = active.iter().map(|r| (r.left(), r.right())).collect();
    raw.sort_unstable();

    let mut merged: Spans = SmallVec::new();
    for (l, r) in raw {
        match merged.last_mut() {
            Some(last) if l <= last.1 => last.1 = last.1.max(r),
            _ => merged.push((l, r)),
        }
    }
    merged
}

#[cfg(test)]
#[path = "../../tests/unit/surface/region.rs"]
mod tests;
