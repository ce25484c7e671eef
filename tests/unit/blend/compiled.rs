use super::*;

#[test]
fn compile_picks_variant_by_opacity() {
    assert_eq!(CompiledBlend::compile(BlendMode::Multiply, 0), CompiledBlend::Skip);
    assert_eq!(
        CompiledBlend::compile(BlendMode::Multiply, 255),
        CompiledBlend::Direct(BlendMode::Multiply)
    );
    assert_eq!(
        CompiledBlend::compile(BlendMode::Screen, 40),
        CompiledBlend::Faded(BlendMode::Screen.with_opacity(40))
    );
    assert!(CompiledBlend::compile(BlendMode::Normal, 0).is_skip());
}

#[test]
fn skip_leaves_dst_untouched() {
    let mut dst = vec![Bgra8Premul::opaque(1, 2, 3); 8];
    let src = vec![Bgra8Premul::WHITE; 8];
    CompiledBlend::Skip.apply(&mut dst, &src);
    assert!(dst.iter().all(|&p| p == Bgra8Premul::opaque(1, 2, 3)));
}

#[test]
fn faded_apply_matches_per_pixel_blend_across_chunks() {
    let n = FADE_CHUNK * 2 + 17;
    let src: Vec<Bgra8Premul> = (0..n)
        .map(|i| {
            let a = (i % 256) as u8;
            Bgra8Premul::new(a / 2, a / 3, a, a)
        })
        .collect();
    let base: Vec<Bgra8Premul> = (0..n)
        .map(|i| Bgra8Premul::opaque((i % 200) as u8, 50, 90))
        .collect();

    for mode in BlendMode::ALL {
        let op = mode.with_opacity(77);
        let mut got = base.clone();
        CompiledBlend::compile(mode, 77).apply(&mut got, &src);
        let want: Vec<Bgra8Premul> = base
            .iter()
            .zip(&src)
            .map(|(&d, &s)| op.blend(d, s))
            .collect();
        assert_eq!(got, want, "{mode}");
    }
}
