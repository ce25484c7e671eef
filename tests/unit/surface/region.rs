use super::*;
use quickcheck::TestResult;
use quickcheck_macros::quickcheck;

fn covered(rects: &[Rect], x: i32, y: i32) -> usize {
    rects.iter().filter(|r| r.contains(x, y)).count()
}

#[test]
fn empty_region_has_no_scans() {
    let r = Region::new();
    assert!(r.is_empty());
    assert!(r.scans().is_empty());
    assert_eq!(r.bounding_box(), None);
    assert_eq!(r.area(), 0);
}

#[test]
fn zero_area_and_negative_parts_are_dropped() {
    let mut r = Region::new();
    r.add(Rect::new(3, 3, 0, 5));
    r.add(Rect::new(-10, -10, 5, 5));
    assert!(r.is_empty());

    r.add(Rect::new(-2, 1, 4, 2));
    assert_eq!(r.scans(), &[Rect::new(0, 1, 2, 2)]);
}

#[test]
fn overlapping_rects_normalize_to_disjoint_bands() {
    let mut r = Region::new();
    r.add(Rect::new(0, 0, 4, 4));
    r.add(Rect::new(2, 2, 4, 4));

    assert_eq!(
        r.scans(),
        &[
            Rect::new(0, 0, 4, 2),
            Rect::new(0, 2, 6, 2),
            Rect::new(2, 4, 4, 2),
        ]
    );
    assert_eq!(r.area(), 16 + 16 - 4);
    assert_eq!(r.bounding_box(), Some(Rect::new(0, 0, 6, 6)));
}

#[test]
fn side_by_side_rects_merge_into_one() {
    let mut r = Region::new();
    r.add(Rect::new(0, 0, 2, 3));
    r.add(Rect::new(2, 0, 3, 3));
    assert_eq!(r.scans(), &[Rect::new(0, 0, 5, 3)]);
}

#[test]
fn stacked_rects_with_equal_spans_merge_vertically() {
    let mut r = Region::new();
    r.add(Rect::new(1, 0, 3, 2));
    r.add(Rect::new(1, 2, 3, 5));
    r.add(Rect::new(1, 1, 3, 1));
    assert_eq!(r.scans(), &[Rect::new(1, 0, 3, 7)]);
}

#[test]
fn gap_between_bands_is_preserved() {
    let mut r = Region::new();
    r.add(Rect::new(0, 0, 2, 1));
    r.add(Rect::new(0, 3, 2, 1));
    assert_eq!(r.scans(), &[Rect::new(0, 0, 2, 1), Rect::new(0, 3, 2, 1)]);
}

#[test]
fn clear_and_intersect_reset_cached_scans() {
    let mut r = Region::from_rect(Rect::new(0, 0, 10, 10));
    assert_eq!(r.scans().len(), 1);

    r.intersect_rect(Rect::new(5, 5, 10, 10));
    assert_eq!(r.scans(), &[Rect::new(5, 5, 5, 5)]);

    r.clear();
    assert!(r.scans().is_empty());
}

#[test]
fn union_merges_other_region() {
    let mut a = Region::from_rect(Rect::new(0, 0, 2, 2));
    let b = Region::from_rect(Rect::new(2, 0, 2, 2));
    a.union(&b);
    assert_eq!(a.scans(), &[Rect::new(0, 0, 4, 2)]);
    assert!(a.contains(3, 1));
    assert!(!a.contains(4, 1));
}

#[test]
fn many_small_adds_stay_exact_after_compaction() {
    let mut r = Region::new();
    for i in 0..3000 {
        r.add(Rect::new(i % 50, i / 50, 1, 1));
    }
    assert!(r.rects().len() <= 1024 + 64);
    assert_eq!(r.area(), 3000);
    assert_eq!(r.bounding_box(), Some(Rect::new(0, 0, 50, 60)));
}

#[quickcheck]
fn scans_cover_exactly_once(input: Vec<(u8, u8, u8, u8)>) -> TestResult {
    let rects: Vec<Rect> = input
        .iter()
        .take(24)
        .map(|&(x, y, w, h)| {
            Rect::new(
                i32::from(x % 24) - 4,
                i32::from(y % 24) - 4,
                i32::from(w % 12),
                i32::from(h % 12),
            )
        })
        .collect();

    let mut region = Region::new();
    for &r in &rects {
        region.add(r);
    }
    let scans = region.scans();

    for y in -4..32 {
        for x in -4..32 {
            let want = usize::from(covered(&rects, x, y) > 0 && x >= 0 && y >= 0);
            if covered(scans, x, y) != want {
                return TestResult::failed();
            }
        }
    }
    TestResult::passed()
}

#[test]
fn thousands_of_isolated_pixels_stay_cheap() {
    let start = std::time::Instant::now();
    let mut r = Region::new();
    let n = 6000;
    for i in 0..n {
        r.add(Rect::new(2 * (i % 100), 2 * (i / 100), 1, 1));
    }
    assert!(r.rects().len() <= n as usize);
    assert_eq!(r.area(), n as u64);
    assert_eq!(r.scans().len(), n as usize);
    assert!(r.contains(198, 118));
    assert!(!r.contains(1, 0));
    assert!(
        start.elapsed() < std::time::Duration::from_secs(5),
        "{n} adds took {:?}",
        start.elapsed()
    );
}
