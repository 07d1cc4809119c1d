//! Software compositor for the editor.
//!
//! This crate handles:
//! - Target pixel buffers for composite output
//! - Pure compositing of an ordered, visible layer sequence
//! - Bounding-rectangle aggregation
//! - Path flattening and scanline filling for vector layers
//!
//! The compositor never filters by visibility; callers hand it the layers
//! they want drawn, in paint order.

pub mod composite;
mod path;
pub mod raster;

pub use composite::{bounding_rect, render, thumbnail, CompositeError};
pub use raster::PixelBuffer;
