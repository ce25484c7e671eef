use std::sync::mpsc;

use crate::blend::ops::BlendMode;
use crate::foundation::core::{Rect, Size};
use crate::foundation::error::{StrataError, StrataResult};
use crate::foundation::events::{ListenerId, Notifier, Subscription};
use crate::layer::model::{Layer, LayerEvent};
use crate::surface::pixel_buffer::SurfaceMut;

/// Structural notification raised by a [`LayerStack`].
///
/// Every successful mutation is bracketed by `Changing` and `Changed`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StackEvent {
    /// A mutation is about to start.
    Changing,
    /// A layer now sits at this index.
    Inserted(usize),
    /// The layer at this index is about to leave the stack.
    RemovingAt(usize),
    /// The layer that was at this index has left the stack.
    RemovedAt(usize),
    /// Every layer was removed.
    Cleared,
    /// The mutation finished.
    Changed,
}

/// Ordered layers, index 0 at the bottom. All layers share the stack's size.
///
/// Only insertion and removal are offered; order is meaningful to the user, so
/// there is no sort and no range mutation.
#[derive(Debug)]
pub struct LayerStack {
    size: Size,
    layers: Vec<Layer>,
    events: Notifier<StackEvent>,
}

impl LayerStack {
    /// Empty stack accepting layers of `width x height`.
    pub fn new(width: u32, height: u32) -> StrataResult<Self> {
        let size = Size::checked(width, height)?;
        if size.is_empty() {
            return Err(StrataError::precondition(format!(
                "layer stack dimensions must be non-zero, got {size}"
            )));
        }
        Ok(Self {
            size,
            layers: Vec::new(),
            events: Notifier::new(),
        })
    }

    /// Size every layer must have.
    pub fn size(&self) -> Size {
        self.size
    }

    /// Number of layers.
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Return `true` when the stack holds no layers.
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Layer at `index`, counting from the bottom.
    pub fn get(&self, index: usize) -> Option<&Layer> {
        self.layers.get(index)
    }

    /// Edit handle for the layer at `index`.
    ///
    /// The handle edits the layer in place; [`LayerStack::replace_at`] is the
    /// only way to put a different layer there.
    pub fn get_mut(&mut self, index: usize) -> Option<LayerMut<'_>> {
        self.layers.get_mut(index).map(|layer| LayerMut { layer })
    }

    /// Bottom-most layer.
    pub fn bottom(&self) -> Option<&Layer> {
        self.layers.first()
    }

    /// Layers bottom to top.
    pub fn iter(&self) -> std::slice::Iter<'_, Layer> {
        self.layers.iter()
    }

    /// Edit handles for every layer, bottom to top.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = LayerMut<'_>> {
        self.layers.iter_mut().map(|layer| LayerMut { layer })
    }

    /// Index of the lowest layer called `name`.
    pub fn index_of_name(&self, name: &str) -> Option<usize> {
        self.layers.iter().position(|l| l.name() == name)
    }

    /// Push `layer` on top. Returns its index.
    pub fn add(&mut self, layer: Layer) -> StrataResult<usize> {
        let index = self.layers.len();
        self.insert(index, layer)?;
        Ok(index)
    }

    /// Insert `layer` at `index`, shifting the layers above it up.
    pub fn insert(&mut self, index: usize, layer: Layer) -> StrataResult<()> {
        self.check_layer(&layer)?;
        if index > self.layers.len() {
            return Err(self.index_error("insert", index, self.layers.len() + 1));
        }
        self.events.emit(&StackEvent::Changing);
        self.insert_unchecked(index, layer);
        self.events.emit(&StackEvent::Changed);
        Ok(())
    }

    /// Remove and return the layer at `index`.
    pub fn remove_at(&mut self, index: usize) -> StrataResult<Layer> {
        if index >= self.layers.len() {
            return Err(self.index_error("remove", index, self.layers.len()));
        }
        self.events.emit(&StackEvent::Changing);
        let layer = self.remove_unchecked(index);
        self.events.emit(&StackEvent::Changed);
        Ok(layer)
    }

    /// Put `layer` at `index` and return the layer it displaced.
    pub fn replace_at(&mut self, index: usize, layer: Layer) -> StrataResult<Layer> {
        self.check_layer(&layer)?;
        if index >= self.layers.len() {
            return Err(self.index_error("replace", index, self.layers.len()));
        }
        self.events.emit(&StackEvent::Changing);
        let old = self.remove_unchecked(index);
        self.insert_unchecked(index, layer);
        self.events.emit(&StackEvent::Changed);
        Ok(old)
    }

    /// Remove every layer, returning them bottom to top.
    pub fn clear(&mut self) -> Vec<Layer> {
        self.events.emit(&StackEvent::Changing);
        let layers = std::mem::take(&mut self.layers);
        self.events.emit(&StackEvent::Cleared);
        self.events.emit(&StackEvent::Changed);
        layers
    }

    /// Listen for structural changes.
    pub fn subscribe(&mut self) -> Subscription<StackEvent> {
        self.events.subscribe()
    }

    /// Drop a registration made by [`LayerStack::subscribe`].
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.events.unsubscribe(id)
    }

    /// Route every layer's events into `tx`.
    pub(crate) fn attach_all(&mut self, tx: &mpsc::Sender<LayerEvent>) {
        for layer in &mut self.layers {
            layer.attach(tx.clone());
        }
    }

    fn insert_unchecked(&mut self, index: usize, layer: Layer) {
        self.layers.insert(index, layer);
        self.events.emit(&StackEvent::Inserted(index));
    }

    fn remove_unchecked(&mut self, index: usize) -> Layer {
        self.events.emit(&StackEvent::RemovingAt(index));
        let layer = self.layers.remove(index);
        self.events.emit(&StackEvent::RemovedAt(index));
        layer
    }

    fn check_layer(&self, layer: &Layer) -> StrataResult<()> {
        if layer.is_disposed() {
            return Err(StrataError::disposed("layer"));
        }
        if layer.size() != self.size {
            return Err(StrataError::precondition(format!(
                "layer is {} but the stack holds {} layers",
                layer.size(),
                self.size
            )));
        }
        Ok(())
    }

    fn index_error(&self, op: &str, index: usize, bound: usize) -> StrataError {
        StrataError::precondition(format!(
            "cannot {op} at index {index}; valid range is 0..{bound}"
        ))
    }
}

impl<'a> IntoIterator for &'a LayerStack {
    type Item = &'a Layer;
    type IntoIter = std::slice::Iter<'a, Layer>;

    fn into_iter(self) -> Self::IntoIter {
        self.layers.iter()
    }
}

/// Edit handle for a layer that lives in a [`LayerStack`].
///
/// Reads go through `Deref`; edits are the layer's own checked mutators.
/// The handle cannot be assigned through, so a layer of another size can
/// only enter the stack by way of [`LayerStack::replace_at`].
///
/// ```compile_fail
/// let mut stack = strata::LayerStack::new(4, 4).unwrap();
/// stack.add(strata::Layer::bitmap(4, 4).unwrap()).unwrap();
/// *stack.get_mut(0).unwrap() = strata::Layer::bitmap(8, 4).unwrap();
/// ```
#[derive(Debug)]
pub struct LayerMut<'a> {
    layer: &'a mut Layer,
}

impl LayerMut<'_> {
    /// See [`Layer::surface_mut`].
    pub fn surface_mut(&mut self) -> StrataResult<SurfaceMut<'_>> {
        self.layer.surface_mut()
    }

    /// See [`Layer::set_name`].
    pub fn set_name(&mut self, name: impl Into<String>) -> StrataResult<()> {
        self.layer.set_name(name)
    }

    /// See [`Layer::set_background`].
    pub fn set_background(&mut self, is_background: bool) -> StrataResult<()> {
        self.layer.set_background(is_background)
    }

    /// See [`Layer::set_visible`].
    pub fn set_visible(&mut self, visible: bool) -> StrataResult<()> {
        self.layer.set_visible(visible)
    }

    /// See [`Layer::set_opacity`].
    pub fn set_opacity(&mut self, opacity: u8) -> StrataResult<()> {
        self.layer.set_opacity(opacity)
    }

    /// See [`Layer::set_blend_mode`].
    pub fn set_blend_mode(&mut self, mode: BlendMode) -> StrataResult<()> {
        self.layer.set_blend_mode(mode)
    }

    /// See [`Layer::invalidate`].
    pub fn invalidate(&mut self) -> StrataResult<()> {
        self.layer.invalidate()
    }

    /// See [`Layer::invalidate_rect`].
    pub fn invalidate_rect(&mut self, rect: Rect) -> StrataResult<()> {
        self.layer.invalidate_rect(rect)
    }

    /// See [`Layer::subscribe`].
    pub fn subscribe(&mut self) -> Subscription<LayerEvent> {
        self.layer.subscribe()
    }

    /// See [`Layer::unsubscribe`].
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.layer.unsubscribe(id)
    }

    /// See [`Layer::dispose`].
    pub fn dispose(&mut self) {
        self.layer.dispose();
    }
}

impl std::ops::Deref for LayerMut<'_> {
    type Target = Layer;

    fn deref(&self) -> &Layer {
        self.layer
    }
}

#[cfg(test)]
#[path = "../../tests/unit/layer/stack.rs"]
mod tests;
