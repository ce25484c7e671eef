use super::*;
use crate::render::spans::carve_spans;

const RED: Bgra8Premul = Bgra8Premul::opaque(0, 0, 255);
const BLUE: Bgra8Premul = Bgra8Premul::opaque(255, 0, 0);
const PIXEL: Rect = Rect::new(0, 0, 1, 1);

#[test]
fn constructors_set_defaults() {
    let l = Layer::bitmap(3, 2).unwrap();
    assert_eq!(l.size(), Size::new(3, 2));
    assert!(l.is_visible());
    assert_eq!(l.opacity(), 255);
    assert_eq!(l.blend_mode(), BlendMode::Normal);
    assert!(!l.is_background());
    assert!(l.surface().unwrap().pixels().iter().all(|&p| p == Bgra8Premul::TRANSPARENT));

    let bg = Layer::background(3, 2).unwrap();
    assert_eq!(bg.name(), "Background");
    assert!(bg.is_background());
    assert!(bg.surface().unwrap().pixels().iter().all(|&p| p == Bgra8Premul::WHITE));

    assert!(Layer::bitmap(0, 2).is_err());
}

#[test]
fn render_blends_only_inside_roi() {
    let layer = Layer::bitmap_filled(4, 4, BLUE).unwrap();
    let mut dst = PixelBuffer::filled(4, 4, RED).unwrap();
    layer.render(&mut dst, Rect::new(1, 1, 2, 1)).unwrap();

    assert_eq!(dst.pixel(1, 1), Some(BLUE));
    assert_eq!(dst.pixel(2, 1), Some(BLUE));
    assert_eq!(dst.pixel(0, 1), Some(RED));
    assert_eq!(dst.pixel(1, 2), Some(RED));
}

#[test]
fn render_applies_opacity() {
    let mut layer = Layer::bitmap_filled(2, 2, BLUE).unwrap();
    layer.set_opacity(128).unwrap();
    let mut dst = PixelBuffer::filled(2, 2, RED).unwrap();
    layer.render(&mut dst, Rect::new(0, 0, 2, 2)).unwrap();
    assert!(dst.pixels().iter().all(|&p| p == Bgra8Premul::new(128, 0, 127, 255)));
}

#[test]
fn render_at_opacity_zero_is_noop() {
    let mut layer = Layer::bitmap_filled(2, 2, BLUE).unwrap();
    layer.set_opacity(0).unwrap();
    let mut dst = PixelBuffer::filled(2, 2, RED).unwrap();
    layer.render(&mut dst, Rect::new(0, 0, 2, 2)).unwrap();
    assert!(dst.pixels().iter().all(|&p| p == RED));
}

#[test]
fn render_rejects_bad_target_or_roi() {
    let layer = Layer::bitmap(4, 4).unwrap();
    let mut small = PixelBuffer::new(3, 4).unwrap();
    let err = layer.render(&mut small, Rect::new(0, 0, 1, 1)).unwrap_err();
    assert!(matches!(err, StrataError::Precondition(_)), "{err}");

    let mut dst = PixelBuffer::new(4, 4).unwrap();
    assert!(layer.render(&mut dst, Rect::new(2, 2, 3, 1)).is_err());
    assert!(layer.render(&mut dst, Rect::new(-1, 0, 2, 1)).is_err());
}

#[test]
fn render_batch_covers_every_rect() {
    let layer = Layer::bitmap_filled(4, 4, BLUE).unwrap();
    let mut dst = PixelBuffer::filled(4, 4, RED).unwrap();
    layer
        .render_batch(&mut dst, &[Rect::new(0, 0, 1, 1), Rect::new(3, 3, 1, 1)])
        .unwrap();
    assert_eq!(dst.pixel(0, 0), Some(BLUE));
    assert_eq!(dst.pixel(3, 3), Some(BLUE));
    assert_eq!(dst.pixel(1, 1), Some(RED));
}

#[test]
fn opacity_change_recompiles_blend() {
    let mut layer = Layer::bitmap_filled(1, 1, BLUE).unwrap();
    let mut dst = PixelBuffer::filled(1, 1, RED).unwrap();
    layer.render(&mut dst, PIXEL).unwrap();
    assert_eq!(dst.pixel(0, 0), Some(BLUE));

    layer.set_opacity(0).unwrap();
    let mut dst = PixelBuffer::filled(1, 1, RED).unwrap();
    layer.render(&mut dst, PIXEL).unwrap();
    assert_eq!(dst.pixel(0, 0), Some(RED));

    layer.set_opacity(255).unwrap();
    layer.set_blend_mode(BlendMode::Multiply).unwrap();
    let mut dst = PixelBuffer::filled(1, 1, RED).unwrap();
    layer.render(&mut dst, PIXEL).unwrap();
    assert_eq!(dst.pixel(0, 0), Some(Bgra8Premul::BLACK));
}

#[test]
fn pixel_mutators_raise_full_invalidation() {
    let mut layer = Layer::bitmap(4, 3).unwrap();
    let sub = layer.subscribe();

    layer.set_opacity(10).unwrap();
    layer.set_visible(false).unwrap();
    layer.set_blend_mode(BlendMode::Screen).unwrap();

    let full = LayerEvent::Invalidated(Rect::new(0, 0, 4, 3));
    assert_eq!(
        sub.drain(),
        vec![
            LayerEvent::PropertyChanged(LayerProperty::Opacity),
            full,
            LayerEvent::PropertyChanged(LayerProperty::Visible),
            full,
            LayerEvent::PropertyChanged(LayerProperty::BlendMode),
            full,
        ]
    );
}

#[test]
fn unchanged_values_raise_nothing() {
    let mut layer = Layer::bitmap(2, 2).unwrap();
    let sub = layer.subscribe();
    layer.set_opacity(255).unwrap();
    layer.set_visible(true).unwrap();
    layer.set_blend_mode(BlendMode::Normal).unwrap();
    layer.set_name("").unwrap();
    assert!(sub.drain().is_empty());
}

#[test]
fn name_and_background_do_not_invalidate() {
    let mut layer = Layer::bitmap(2, 2).unwrap();
    let sub = layer.subscribe();
    layer.set_name("ink").unwrap();
    layer.set_background(true).unwrap();
    assert_eq!(layer.name(), "ink");
    assert_eq!(
        sub.drain(),
        vec![
            LayerEvent::PropertyChanged(LayerProperty::Name),
            LayerEvent::PropertyChanged(LayerProperty::Background),
        ]
    );
}

#[test]
fn invalidate_rect_is_clipped_to_bounds() {
    let mut layer = Layer::bitmap(4, 4).unwrap();
    let sub = layer.subscribe();
    layer.invalidate_rect(Rect::new(2, -1, 10, 2)).unwrap();
    layer.invalidate_rect(Rect::new(9, 9, 2, 2)).unwrap();
    layer.invalidate().unwrap();
    assert_eq!(
        sub.drain(),
        vec![
            LayerEvent::Invalidated(Rect::new(2, 0, 2, 1)),
            LayerEvent::Invalidated(Rect::new(0, 0, 4, 4)),
        ]
    );
}

#[test]
fn spans_render_like_rects() {
    let mut layer = Layer::bitmap_filled(4, 2, BLUE).unwrap();
    layer.set_opacity(128).unwrap();

    let mut via_rect = PixelBuffer::filled(4, 2, RED).unwrap();
    layer.render(&mut via_rect, Rect::new(1, 0, 2, 2)).unwrap();

    let mut via_spans = PixelBuffer::filled(4, 2, RED).unwrap();
    {
        let mut spans = carve_spans(&mut via_spans, &[vec![Rect::new(1, 0, 2, 2)]]).unwrap();
        layer.render_spans(&mut spans[0]).unwrap();
    }
    assert_eq!(via_rect, via_spans);
}

#[test]
fn copy_spans_ignores_blend_state() {
    let layer = Layer::bitmap_filled(2, 1, Bgra8Premul::new(10, 20, 30, 40)).unwrap();
    let mut dst = PixelBuffer::filled(2, 1, RED).unwrap();
    {
        let mut spans = carve_spans(&mut dst, &[vec![Rect::new(0, 0, 1, 1)]]).unwrap();
        layer.copy_spans(&mut spans[0]).unwrap();
    }
    assert_eq!(dst.pixel(0, 0), Some(Bgra8Premul::new(10, 20, 30, 40)));
    assert_eq!(dst.pixel(1, 0), Some(RED));
}

#[test]
fn copyable_base_requires_visible_opaque_default_blend() {
    let mut layer = Layer::background(2, 2).unwrap();
    assert!(layer.is_copyable_base());
    layer.set_opacity(200).unwrap();
    assert!(!layer.is_copyable_base());
    layer.set_opacity(255).unwrap();
    layer.set_blend_mode(BlendMode::Darken).unwrap();
    assert!(!layer.is_copyable_base());
    layer.set_blend_mode(BlendMode::Normal).unwrap();
    layer.set_visible(false).unwrap();
    assert!(!layer.is_copyable_base());
}

#[test]
fn duplicate_copies_pixels_but_not_listeners() {
    let mut layer = Layer::bitmap_filled(2, 2, BLUE).unwrap();
    layer.set_name("copy me").unwrap();
    layer.set_opacity(90).unwrap();
    let sub = layer.subscribe();

    let mut copy = layer.duplicate().unwrap();
    assert_eq!(copy.name(), "copy me");
    assert_eq!(copy.opacity(), 90);
    assert_eq!(copy.surface().unwrap(), layer.surface().unwrap());

    copy.set_opacity(1).unwrap();
    assert!(sub.drain().is_empty());
}

#[test]
fn disposed_layer_rejects_operations() {
    let mut layer = Layer::bitmap(2, 2).unwrap();
    let sub = layer.subscribe();
    layer.dispose();
    assert!(layer.is_disposed());

    let mut dst = PixelBuffer::new(2, 2).unwrap();
    for err in [
        layer.render(&mut dst, Rect::new(0, 0, 2, 2)).unwrap_err(),
        layer.set_opacity(3).unwrap_err(),
        layer.invalidate().unwrap_err(),
        layer.duplicate().unwrap_err(),
    ] {
        assert!(matches!(err, StrataError::Disposed("layer")), "{err}");
    }
    assert!(layer.surface().is_err());
    assert!(sub.drain().is_empty());
}
