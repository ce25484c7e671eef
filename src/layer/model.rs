use std::sync::OnceLock;
use std::sync::mpsc;

use crate::blend::compiled::CompiledBlend;
use crate::blend::ops::BlendMode;
use crate::foundation::core::{Bgra8Premul, Rect, Size};
use crate::foundation::error::{StrataError, StrataResult};
use crate::foundation::events::{ListenerId, Notifier, Subscription};
use crate::render::spans::SpanMut;
use crate::surface::pixel_buffer::{PixelBuffer, SurfaceMut};

/// Layer property that changed, carried by [`LayerEvent::PropertyChanged`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LayerProperty {
    /// Display name.
    Name,
    /// Visibility flag.
    Visible,
    /// Layer opacity.
    Opacity,
    /// Blend mode of a bitmap layer.
    BlendMode,
    /// Advisory background flag.
    Background,
}

/// Notification raised by a [`Layer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayerEvent {
    /// Pixels inside the rectangle (layer coordinates) may have changed.
    Invalidated(Rect),
    /// A property changed value.
    PropertyChanged(LayerProperty),
}

/// Pixel source behind a layer.
#[derive(Clone, Debug)]
pub enum LayerKind {
    /// Raster layer owning its pixels.
    Bitmap {
        /// Layer pixels, same size as the layer.
        surface: PixelBuffer,
        /// How the pixels combine with what lies beneath.
        blend: BlendMode,
    },
}

/// One fixed-size element of a layer stack.
///
/// A layer never refers to its owner. Anything it does that may change the
/// composite is announced as a [`LayerEvent`] to its listeners.
pub struct Layer {
    size: Size,
    name: String,
    visible: bool,
    opacity: u8,
    is_background: bool,
    kind: LayerKind,
    compiled: OnceLock<CompiledBlend>,
    events: Notifier<LayerEvent>,
    disposed: bool,
}

impl std::fmt::Debug for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Layer")
            .field("name", &self.name)
            .field("size", &self.size)
            .field("visible", &self.visible)
            .field("opacity", &self.opacity)
            .field("blend", &self.blend_mode())
            .field("is_background", &self.is_background)
            .field("disposed", &self.disposed)
            .finish_non_exhaustive()
    }
}

impl Layer {
    /// Bitmap layer cleared to transparent.
    pub fn bitmap(width: u32, height: u32) -> StrataResult<Self> {
        Self::bitmap_filled(width, height, Bgra8Premul::TRANSPARENT)
    }

    /// Bitmap layer with every pixel set to `color`.
    pub fn bitmap_filled(width: u32, height: u32, color: Bgra8Premul) -> StrataResult<Self> {
        Ok(Self::from_buffer(PixelBuffer::filled(width, height, color)?))
    }

    /// Opaque white bitmap layer named "Background" with the background flag set.
    pub fn background(width: u32, height: u32) -> StrataResult<Self> {
        let mut layer = Self::bitmap_filled(width, height, Bgra8Premul::WHITE)?;
        layer.name = "Background".to_owned();
        layer.is_background = true;
        Ok(layer)
    }

    /// Bitmap layer that takes ownership of `surface`.
    pub fn from_buffer(surface: PixelBuffer) -> Self {
        Self {
            size: surface.size(),
            name: String::new(),
            visible: true,
            opacity: 255,
            is_background: false,
            kind: LayerKind::Bitmap {
                surface,
                blend: BlendMode::default(),
            },
            compiled: OnceLock::new(),
            events: Notifier::new(),
            disposed: false,
        }
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.size.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.size.height
    }

    /// Layer dimensions.
    pub fn size(&self) -> Size {
        self.size
    }

    /// `[0, 0, width, height]`.
    pub fn bounds(&self) -> Rect {
        Rect::from_size(self.size)
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the layer takes part in compositing.
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Opacity, 0 (invisible) to 255 (as painted).
    pub fn opacity(&self) -> u8 {
        self.opacity
    }

    /// Advisory background flag; compositing ignores it.
    pub fn is_background(&self) -> bool {
        self.is_background
    }

    /// Blend mode of the layer's pixels.
    pub fn blend_mode(&self) -> BlendMode {
        match &self.kind {
            LayerKind::Bitmap { blend, .. } => *blend,
        }
    }

    /// Pixel source.
    pub fn kind(&self) -> &LayerKind {
        &self.kind
    }

    /// Return `true` once [`Layer::dispose`] has run.
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Layer pixels, for lossless export.
    pub fn surface(&self) -> StrataResult<&PixelBuffer> {
        self.ensure_live()?;
        Ok(self.pixels())
    }

    /// Layer pixels for editing. Report every edit with [`Layer::invalidate_rect`].
    ///
    /// The view can rewrite pixels but not swap the buffer, so the layer keeps its size.
    pub fn surface_mut(&mut self) -> StrataResult<SurfaceMut<'_>> {
        self.ensure_live()?;
        match &mut self.kind {
            LayerKind::Bitmap { surface, .. } => Ok(SurfaceMut::new(surface)),
        }
    }

    /// Rename the layer.
    pub fn set_name(&mut self, name: impl Into<String>) -> StrataResult<()> {
        self.ensure_live()?;
        let name = name.into();
        if self.name == name {
            return Ok(());
        }
        self.name = name;
        self.events
            .emit(&LayerEvent::PropertyChanged(LayerProperty::Name));
        Ok(())
    }

    /// Set the advisory background flag.
    pub fn set_background(&mut self, is_background: bool) -> StrataResult<()> {
        self.ensure_live()?;
        if self.is_background == is_background {
            return Ok(());
        }
        self.is_background = is_background;
        self.events
            .emit(&LayerEvent::PropertyChanged(LayerProperty::Background));
        Ok(())
    }

    /// Show or hide the layer.
    pub fn set_visible(&mut self, visible: bool) -> StrataResult<()> {
        self.ensure_live()?;
        if self.visible == visible {
            return Ok(());
        }
        self.visible = visible;
        self.changed(LayerProperty::Visible);
        Ok(())
    }

    /// Change the layer opacity.
    pub fn set_opacity(&mut self, opacity: u8) -> StrataResult<()> {
        self.ensure_live()?;
        if self.opacity == opacity {
            return Ok(());
        }
        self.opacity = opacity;
        self.compiled.take();
        self.changed(LayerProperty::Opacity);
        Ok(())
    }

    /// Change the blend mode.
    pub fn set_blend_mode(&mut self, mode: BlendMode) -> StrataResult<()> {
        self.ensure_live()?;
        match &mut self.kind {
            LayerKind::Bitmap { blend, .. } => {
                if *blend == mode {
                    return Ok(());
                }
                *blend = mode;
            }
        }
        self.compiled.take();
        self.changed(LayerProperty::BlendMode);
        Ok(())
    }

    /// Report that every pixel may have changed.
    pub fn invalidate(&mut self) -> StrataResult<()> {
        self.invalidate_rect(self.bounds())
    }

    /// Report that pixels inside `rect` changed. The rectangle is clipped to the layer.
    pub fn invalidate_rect(&mut self, rect: Rect) -> StrataResult<()> {
        self.ensure_live()?;
        let clipped = rect.intersect(self.bounds());
        if !clipped.is_empty() {
            self.events.emit(&LayerEvent::Invalidated(clipped));
        }
        Ok(())
    }

    /// Listen for this layer's events.
    pub fn subscribe(&mut self) -> Subscription<LayerEvent> {
        self.events.subscribe()
    }

    /// Drop a registration made by [`Layer::subscribe`].
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.events.unsubscribe(id)
    }

    pub(crate) fn attach(&mut self, tx: mpsc::Sender<LayerEvent>) -> ListenerId {
        self.events.attach(tx)
    }

    /// Blend this layer into `dst` over `roi`.
    ///
    /// `dst` must be the size of the layer and `roi` must lie inside it.
    pub fn render(&self, dst: &mut PixelBuffer, roi: Rect) -> StrataResult<()> {
        self.render_batch(dst, std::slice::from_ref(&roi))
    }

    /// Blend this layer into `dst` over several rectangles with one compiled blend.
    pub fn render_batch(&self, dst: &mut PixelBuffer, rects: &[Rect]) -> StrataResult<()> {
        self.ensure_live()?;
        if dst.size() != self.size {
            return Err(StrataError::precondition(format!(
                "render target is {} but layer is {}",
                dst.size(),
                self.size
            )));
        }
        for &roi in rects {
            dst.check_roi(roi)?;
        }
        let compiled = self.compiled();
        if compiled.is_skip() {
            return Ok(());
        }
        let src = self.pixels();
        for &roi in rects.iter().filter(|r| !r.is_empty()) {
            let (x0, x1) = (roi.left() as usize, roi.right() as usize);
            for y in roi.top()..roi.bottom() {
                let y = y as u32;
                compiled.apply(&mut dst.row_mut(y)[x0..x1], &src.row(y)[x0..x1]);
            }
        }
        Ok(())
    }

    /// Blend into spans carved from a buffer the size of this layer.
    pub(crate) fn render_spans(&self, spans: &mut [SpanMut<'_>]) -> StrataResult<()> {
        self.ensure_live()?;
        let compiled = self.compiled();
        if compiled.is_skip() {
            return Ok(());
        }
        for span in spans {
            let row = self.source_row(span)?;
            compiled.apply(span.px, row);
        }
        Ok(())
    }

    /// Overwrite spans with this layer's pixels, ignoring opacity and blend.
    pub(crate) fn copy_spans(&self, spans: &mut [SpanMut<'_>]) -> StrataResult<()> {
        self.ensure_live()?;
        for span in spans {
            let row = self.source_row(span)?;
            span.px.copy_from_slice(row);
        }
        Ok(())
    }

    /// Visible, fully opaque, default-blend layer: drawing it over transparent
    /// is a plain copy.
    pub(crate) fn is_copyable_base(&self) -> bool {
        self.visible && self.opacity == 255 && self.blend_mode().is_default()
    }

    /// Deep copy of properties and pixels, with no listeners.
    pub fn duplicate(&self) -> StrataResult<Self> {
        self.ensure_live()?;
        Ok(Self {
            size: self.size,
            name: self.name.clone(),
            visible: self.visible,
            opacity: self.opacity,
            is_background: self.is_background,
            kind: self.kind.clone(),
            compiled: OnceLock::new(),
            events: Notifier::new(),
            disposed: false,
        })
    }

    /// Tear the layer down. Listeners are dropped and later operations fail.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.events = Notifier::new();
        self.compiled.take();
    }

    fn compiled(&self) -> CompiledBlend {
        *self
            .compiled
            .get_or_init(|| CompiledBlend::compile(self.blend_mode(), self.opacity))
    }

    fn pixels(&self) -> &PixelBuffer {
        match &self.kind {
            LayerKind::Bitmap { surface, .. } => surface,
        }
    }

    fn source_row(&self, span: &SpanMut<'_>) -> StrataResult<&[Bgra8Premul]> {
        let w = self.size.width as usize;
        if span.x + span.len() > w {
            return Err(StrataError::precondition(format!(
                "span at ({}, {}) of {} pixels leaves {} layer",
                span.x,
                span.y,
                span.len(),
                self.size
            )));
        }
        let start = span.y * w + span.x;
        self.pixels()
            .pixels()
            .get(start..start + span.len())
            .ok_or_else(|| {
                StrataError::precondition(format!(
                    "span row {} is outside {} layer",
                    span.y, self.size
                ))
            })
    }

    fn changed(&mut self, property: LayerProperty) {
        let bounds = self.bounds();
        self.events.emit(&LayerEvent::PropertyChanged(property));
        self.events.emit(&LayerEvent::Invalidated(bounds));
    }

    fn ensure_live(&self) -> StrataResult<()> {
        if self.disposed {
            return Err(StrataError::disposed("layer"));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/layer/model.rs"]
mod tests;
