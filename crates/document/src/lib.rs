//! Document model for the editor.
//!
//! This crate handles:
//! - Layer entities (raster bitmaps and vector paths)
//! - The ordered layer store, the single source of truth per open document
//! - Change notification for views observing the store

pub mod events;
pub mod layer;
pub mod store;

pub use events::{ChangeEvent, ChangeNotifier, LayerAspect, SubscriberId};
pub use layer::{
    Layer, LayerContent, LayerId, PathBuilder, PathCommand, RasterContent, Stroke, VectorContent,
};
pub use store::{LayerStore, StoreError};
