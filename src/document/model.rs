use std::ops::Deref;
use std::sync::{Arc, mpsc};

use crate::document::compose::{composite_slices, composite_spans};
use crate::foundation::core::{Bgra8Premul, Rect, Size};
use crate::foundation::error::{StrataError, StrataResult};
use crate::foundation::events::{ListenerId, Notifier, Subscription};
use crate::layer::model::{Layer, LayerEvent};
use crate::layer::stack::{LayerMut, LayerStack, StackEvent};
use crate::render::scheduler::{CompositorOpts, TileScheduler};
use crate::render::spans::carve_spans;
use crate::surface::pixel_buffer::PixelBuffer;
use crate::surface::region::Region;

/// A stack of layers plus the record of what needs recompositing.
///
/// Edits reach the document as events: the stack reports structural changes
/// and every layer in it reports invalidations over a channel the document
/// owns. Those events are folded into the dirty region whenever a
/// [`LayersMut`] guard is released and again at the start of [`Document::update`].
///
/// ```
/// use strata::{Bgra8Premul, Document, Layer, PixelBuffer};
///
/// let mut doc = Document::new(4, 4)?;
/// doc.layers_mut()?.add(Layer::bitmap_filled(4, 4, Bgra8Premul::opaque(0, 0, 255))?)?;
///
/// let mut frame = PixelBuffer::new(4, 4)?;
/// assert!(doc.update(&mut frame)?);
/// assert!(!doc.update(&mut frame)?);
/// # Ok::<(), strata::StrataError>(())
/// ```
pub struct Document {
    size: Size,
    layers: LayerStack,
    update_region: Region,
    dirty: bool,
    scheduler: Arc<TileScheduler>,
    stack_events: Subscription<StackEvent>,
    layer_events: mpsc::Receiver<LayerEvent>,
    invalidated: Notifier<Rect>,
    dirty_changed: Notifier<bool>,
    disposed: bool,
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("size", &self.size)
            .field("layers", &self.layers.len())
            .field("dirty", &self.dirty)
            .field("update_rects", &self.update_region.rects().len())
            .field("workers", &self.scheduler.workers())
            .field("disposed", &self.disposed)
            .finish_non_exhaustive()
    }
}

/// Mutable access to a document's layers.
///
/// Only the stack's checked mutators and per-layer edit handles are offered.
/// Dropping the guard folds every change made through it into the
/// document's dirty region.
///
/// The stack's own listener list stays with the document:
///
/// ```compile_fail
/// let mut doc = strata::Document::new(4, 4).unwrap();
/// let sub = doc.layers_mut().unwrap().subscribe();
/// ```
pub struct LayersMut<'a> {
    doc: &'a mut Document,
}

impl LayersMut<'_> {
    /// See [`LayerStack::add`].
    pub fn add(&mut self, layer: Layer) -> StrataResult<usize> {
        self.doc.layers.add(layer)
    }

    /// See [`LayerStack::insert`].
    pub fn insert(&mut self, index: usize, layer: Layer) -> StrataResult<()> {
        self.doc.layers.insert(index, layer)
    }

    /// See [`LayerStack::remove_at`].
    pub fn remove_at(&mut self, index: usize) -> StrataResult<Layer> {
        self.doc.layers.remove_at(index)
    }

    /// See [`LayerStack::replace_at`].
    pub fn replace_at(&mut self, index: usize, layer: Layer) -> StrataResult<Layer> {
        self.doc.layers.replace_at(index, layer)
    }

    /// See [`LayerStack::clear`].
    pub fn clear(&mut self) -> Vec<Layer> {
        self.doc.layers.clear()
    }

    /// See [`LayerStack::get_mut`].
    pub fn get_mut(&mut self, index: usize) -> Option<LayerMut<'_>> {
        self.doc.layers.get_mut(index)
    }

    /// See [`LayerStack::iter_mut`].
    pub fn iter_mut(&mut self) -> impl Iterator<Item = LayerMut<'_>> {
        self.doc.layers.iter_mut()
    }
}

impl Deref for LayersMut<'_> {
    type Target = LayerStack;

    fn deref(&self) -> &LayerStack {
        &self.doc.layers
    }
}

impl Drop for LayersMut<'_> {
    fn drop(&mut self) {
        self.doc.pump();
    }
}

impl Document {
    /// Blank document (no layers, fully dirty) using one worker per logical CPU.
    pub fn new(width: u32, height: u32) -> StrataResult<Self> {
        Self::with_opts(width, height, &CompositorOpts::default())
    }

    /// Blank document with explicit compositor options.
    pub fn with_opts(width: u32, height: u32, opts: &CompositorOpts) -> StrataResult<Self> {
        Self::with_scheduler(width, height, Arc::new(TileScheduler::new(opts)?))
    }

    /// Rebuild a document from stored layers, bottom first. The result is fully dirty.
    pub fn from_layers(
        width: u32,
        height: u32,
        layers: impl IntoIterator<Item = Layer>,
    ) -> StrataResult<Self> {
        let mut doc = Self::new(width, height)?;
        doc.push_layers(layers)?;
        Ok(doc)
    }

    /// One-layer document whose background layer takes ownership of `surface`.
    pub fn from_buffer(surface: PixelBuffer) -> StrataResult<Self> {
        let layer = background_layer(surface)?;
        Self::from_layers(layer.width(), layer.height(), [layer])
    }

    fn with_scheduler(
        width: u32,
        height: u32,
        scheduler: Arc<TileScheduler>,
    ) -> StrataResult<Self> {
        let mut layers = LayerStack::new(width, height)?;
        let stack_events = layers.subscribe();
        let (_, layer_events) = mpsc::channel();
        let size = layers.size();
        Ok(Self {
            size,
            layers,
            update_region: Region::from_rect(Rect::from_size(size)),
            dirty: true,
            scheduler,
            stack_events,
            layer_events,
            invalidated: Notifier::new(),
            dirty_changed: Notifier::new(),
            disposed: false,
        })
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.size.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.size.height
    }

    /// Document dimensions.
    pub fn size(&self) -> Size {
        self.size
    }

    /// `[0, 0, width, height]`.
    pub fn bounds(&self) -> Rect {
        Rect::from_size(self.size)
    }

    /// Number of slices an update fans out to.
    pub fn workers(&self) -> usize {
        self.scheduler.workers()
    }

    /// The layers, bottom first.
    pub fn layers(&self) -> &LayerStack {
        &self.layers
    }

    /// Edit the layers. Changes are picked up when the guard is dropped.
    pub fn layers_mut(&mut self) -> StrataResult<LayersMut<'_>> {
        self.ensure_live()?;
        Ok(LayersMut { doc: self })
    }

    /// Whether anything changed since the flag was last cleared.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Set or clear the unsaved-changes flag, notifying listeners on change.
    pub fn set_dirty(&mut self, dirty: bool) -> StrataResult<()> {
        self.ensure_live()?;
        self.set_dirty_flag(dirty);
        Ok(())
    }

    /// Outstanding dirty area as non-overlapping rectangles.
    pub fn update_rects(&self) -> &[Rect] {
        self.update_region.scans()
    }

    /// Listen for invalidated rectangles (document coordinates).
    pub fn subscribe_invalidated(&mut self) -> Subscription<Rect> {
        self.invalidated.subscribe()
    }

    /// Listen for changes of the unsaved-changes flag.
    pub fn subscribe_dirty_changed(&mut self) -> Subscription<bool> {
        self.dirty_changed.subscribe()
    }

    /// Drop a registration made by either `subscribe_*` method.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.invalidated.unsubscribe(id) | self.dirty_changed.unsubscribe(id)
    }

    /// Mark the whole document for recompositing.
    pub fn invalidate(&mut self) -> StrataResult<()> {
        self.ensure_live()?;
        self.pump();
        self.invalidate_all();
        Ok(())
    }

    /// Mark `rect` for recompositing. It is clipped to the document first.
    pub fn invalidate_rect(&mut self, rect: Rect) -> StrataResult<()> {
        self.ensure_live()?;
        self.pump();
        self.invalidate_clipped(rect);
        Ok(())
    }

    /// Recomposite every dirty pixel into `dst` and clear the dirty region.
    ///
    /// Returns `false` without touching `dst` when nothing is dirty. `dst` must
    /// match the document size.
    #[tracing::instrument(skip(self, dst))]
    pub fn update(&mut self, dst: &mut PixelBuffer) -> StrataResult<bool> {
        self.ensure_live()?;
        self.check_target(dst)?;
        self.pump();
        if self.update_region.is_empty() {
            return Ok(false);
        }

        let workers = self.scheduler.workers();
        let rects = match self.update_region.scans() {
            [only] if only.height > 1 => TileScheduler::split_rectangle(*only, workers),
            scans => scans.to_vec(),
        };
        tracing::debug!(rects = rects.len(), workers, "compositing dirty region");

        let slices = TileScheduler::split_evenly(&rects, workers);
        composite_slices(&self.scheduler, &self.layers, dst, &slices, true)?;
        self.update_region.clear();
        Ok(true)
    }

    /// Composite `roi` into `dst` on the calling thread.
    pub fn render(
        &self,
        dst: &mut PixelBuffer,
        roi: Rect,
        clear_background: bool,
    ) -> StrataResult<()> {
        self.render_rects(dst, std::slice::from_ref(&roi), clear_background)
    }

    /// Composite several rectangles into `dst` on the calling thread.
    ///
    /// Rectangles must lie inside the document; overlapping ones are merged
    /// so no pixel is blended twice.
    pub fn render_rects(
        &self,
        dst: &mut PixelBuffer,
        rects: &[Rect],
        clear_background: bool,
    ) -> StrataResult<()> {
        self.ensure_live()?;
        self.check_target(dst)?;
        let mut region = Region::new();
        for &roi in rects {
            dst.check_roi(roi)?;
            region.add(roi);
        }
        let mut spans = carve_spans(dst, &[region.scans()])?;
        match spans.first_mut() {
            Some(spans) => composite_spans(&self.layers, spans, clear_background),
            None => Ok(()),
        }
    }

    /// Composite the whole document into a new buffer, in parallel.
    #[tracing::instrument(skip(self))]
    pub fn composite(&self, clear_background: bool) -> StrataResult<PixelBuffer> {
        self.ensure_live()?;
        let mut dst = PixelBuffer::new(self.size.width, self.size.height)?;
        let workers = self.scheduler.workers();
        let bands = TileScheduler::split_rectangle(self.bounds(), workers);
        let slices = TileScheduler::split_evenly(&bands, workers);
        composite_slices(
            &self.scheduler,
            &self.layers,
            &mut dst,
            &slices,
            clear_background,
        )?;
        Ok(dst)
    }

    /// Clear `dst` to transparent and composite the whole document into it.
    pub fn flatten_into(&self, dst: &mut PixelBuffer) -> StrataResult<()> {
        self.ensure_live()?;
        self.check_target(dst)?;
        dst.clear(Bgra8Premul::TRANSPARENT);
        self.render(dst, self.bounds(), true)
    }

    /// New document holding one background layer with this document's composite.
    pub fn flatten(&self) -> StrataResult<Document> {
        self.ensure_live()?;
        let mut surface = PixelBuffer::new(self.size.width, self.size.height)?;
        self.flatten_into(&mut surface)?;
        let layer = background_layer(surface)?;
        let mut doc = Self::with_scheduler(
            self.size.width,
            self.size.height,
            Arc::clone(&self.scheduler),
        )?;
        doc.push_layers([layer])?;
        Ok(doc)
    }

    /// Deep copy of layers and pixels. The copy has no listeners and is fully dirty.
    pub fn duplicate(&self) -> StrataResult<Document> {
        self.ensure_live()?;
        let layers = self
            .layers
            .iter()
            .map(Layer::duplicate)
            .collect::<StrataResult<Vec<_>>>()?;
        let mut doc = Self::with_scheduler(
            self.size.width,
            self.size.height,
            Arc::clone(&self.scheduler),
        )?;
        doc.push_layers(layers)?;
        Ok(doc)
    }

    /// Tear the document down, disposing every layer. Later operations fail.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        for mut layer in self.layers.iter_mut() {
            layer.dispose();
        }
        self.invalidated = Notifier::new();
        self.dirty_changed = Notifier::new();
        self.update_region.clear();
        self.disposed = true;
    }

    /// Return `true` once [`Document::dispose`] has run.
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    fn push_layers(&mut self, layers: impl IntoIterator<Item = Layer>) -> StrataResult<()> {
        let mut stack = self.layers_mut()?;
        for layer in layers {
            stack.add(layer)?;
        }
        Ok(())
    }

    /// Fold pending stack and layer events into the dirty state.
    fn pump(&mut self) {
        if !self.stack_events.drain().is_empty() {
            // Pending layer events are covered by the full invalidation below.
            self.relink();
            self.invalidate_all();
            return;
        }
        let pending: Vec<LayerEvent> = self.layer_events.try_iter().collect();
        for event in pending {
            if let LayerEvent::Invalidated(rect) = event {
                self.invalidate_clipped(rect);
            }
        }
    }

    /// Listen to every layer currently in the stack on a fresh channel.
    ///
    /// Layers that left the stack still hold senders into the old channel;
    /// dropping its receiver makes their next emit prune them.
    fn relink(&mut self) {
        let (tx, rx) = mpsc::channel();
        self.layers.attach_all(&tx);
        self.layer_events = rx;
        tracing::trace!(layers = self.layers.len(), "relinked layer listeners");
    }

    fn invalidate_all(&mut self) {
        let bounds = self.bounds();
        self.set_dirty_flag(true);
        self.update_region = Region::from_rect(bounds);
        self.invalidated.emit(&bounds);
    }

    fn invalidate_clipped(&mut self, rect: Rect) {
        let clipped = rect.intersect(self.bounds());
        if clipped.is_empty() {
            return;
        }
        self.set_dirty_flag(true);
        self.update_region.add(clipped);
        self.invalidated.emit(&clipped);
    }

    fn set_dirty_flag(&mut self, dirty: bool) {
        if self.dirty != dirty {
            self.dirty = dirty;
            self.dirty_changed.emit(&dirty);
        }
    }

    fn check_target(&self, dst: &PixelBuffer) -> StrataResult<()> {
        if dst.size() != self.size {
            return Err(StrataError::precondition(format!(
                "destination is {} but document is {}",
                dst.size(),
                self.size
            )));
        }
        Ok(())
    }

    fn ensure_live(&self) -> StrataResult<()> {
        if self.disposed {
            return Err(StrataError::disposed("document"));
        }
        Ok(())
    }
}

fn background_layer(surface: PixelBuffer) -> StrataResult<Layer> {
    let mut layer = Layer::from_buffer(surface);
    layer.set_name("Background")?;
    layer.set_background(true)?;
    Ok(layer)
}

#[cfg(test)]
#[path = "../../tests/unit/document/model.rs"]
mod tests;
