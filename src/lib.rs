//! Strata is an incremental, parallel layer-compositing engine.
//!
//! A [`Document`] owns a [`LayerStack`] and the region of pixels that changed
//! since the last composite. Editing a [`Layer`] reports the touched area;
//! [`Document::update`] recomposites only that area, split across a rayon pool
//! so that every worker writes a disjoint part of the destination.
//!
//! - Build layers from [`PixelBuffer`]s (premultiplied BGRA8)
//! - Stack them in a [`Document`] and edit them through [`Document::layers_mut`]
//! - Call [`Document::update`] whenever a fresh frame is needed
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod blend;
mod document;
mod foundation;
mod layer;
mod render;
mod surface;

pub use crate::blend::ops::{BlendMode, BlendOp, WithOpacity, fade, over};
pub use crate::document::model::{Document, LayersMut};
pub use crate::foundation::core::{Bgra8Premul, Rect, Size};
pub use crate::foundation::error::{StrataError, StrataResult};
pub use crate::foundation::events::{ListenerId, Notifier, Subscription};
pub use crate::layer::model::{Layer, LayerEvent, LayerKind, LayerProperty};
pub use crate::layer::stack::{LayerMut, LayerStack, StackEvent};
pub use crate::render::scheduler::{CompositorOpts, TileScheduler};
pub use crate::surface::pixel_buffer::{PixelBuffer, SurfaceMut};
pub use crate::surface::region::Region;
