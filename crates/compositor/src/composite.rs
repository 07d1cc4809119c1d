//! Pure compositing over an ordered layer sequence.
//!
//! Both entry points take the layers to draw explicitly; filtering hidden
//! layers is the store's responsibility. That split keeps these functions
//! deterministic over their inputs and testable without a document.

use crate::path;
use crate::raster::PixelBuffer;
use common::geometry::{Point, Rect};
use document::layer::{Layer, LayerContent, RasterContent, VectorContent};
use thiserror::Error;

/// Errors from compositing.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CompositeError {
    #[error("cannot allocate a {width}x{height} target raster")]
    AllocationFailed { width: u32, height: u32 },
}

/// Smallest axis-aligned rectangle covering every layer's translated
/// bounds. Empty input yields [`Rect::ZERO`]. Union is order-independent:
/// any permutation of the same layers produces the same rectangle.
pub fn bounding_rect<'a, I>(layers: I) -> Rect
where
    I: IntoIterator<Item = &'a Layer>,
{
    layers
        .into_iter()
        .map(Layer::bounding_rect)
        .reduce(|acc, rect| acc.union(&rect))
        .unwrap_or(Rect::ZERO)
}

/// Composite `layers` in order into a transparent target of `target_size`,
/// with a uniform `scale` applied to the whole composite. The first layer
/// is drawn first; each subsequent layer is drawn over it with alpha-over
/// blending.
pub fn render<'a, I>(
    layers: I,
    target_size: (u32, u32),
    scale: f32,
) -> Result<PixelBuffer, CompositeError>
where
    I: IntoIterator<Item = &'a Layer>,
{
    let (width, height) = target_size;
    tracing::debug!(width, height, scale = f64::from(scale), "compositing");

    let mut buffer = PixelBuffer::alloc(width, height)?;
    for layer in layers {
        draw_layer(&mut buffer, layer, scale);
    }

    Ok(buffer)
}

/// Render a single-layer preview that fits in a `max_dim` square,
/// preserving aspect ratio. The layer is drawn at its content's origin,
/// ignoring its document offset.
pub fn thumbnail(layer: &Layer, max_dim: u32) -> Result<PixelBuffer, CompositeError> {
    let local = layer.content.local_bounds();
    if max_dim == 0 || local.is_empty() {
        return Err(CompositeError::AllocationFailed {
            width: 0,
            height: 0,
        });
    }

    let scale = max_dim as f32 / local.width.max(local.height);
    let width = ((local.width * scale).round() as u32).max(1);
    let height = ((local.height * scale).round() as u32).max(1);

    let mut preview = layer.clone();
    preview.offset = Point::new(-local.x, -local.y);

    render(std::iter::once(&preview), (width, height), scale)
}

fn draw_layer(buffer: &mut PixelBuffer, layer: &Layer, scale: f32) {
    if scale <= 0.0 {
        return;
    }

    match &layer.content {
        LayerContent::Raster(raster) => blit_raster(buffer, raster, layer.offset, scale),
        LayerContent::Vector(vector) => draw_vector(buffer, vector, layer.offset, scale),
    }
}

/// Blit a bitmap at `offset`, scaled. Destination pixels map back to source
/// pixels (nearest neighbor), so the blit stays exact at scale 1.0.
fn blit_raster(buffer: &mut PixelBuffer, raster: &RasterContent, offset: Point, scale: f32) {
    if raster.width() == 0 || raster.height() == 0 {
        return;
    }

    let dest_x = offset.x * scale;
    let dest_y = offset.y * scale;
    let dest_w = raster.width() as f32 * scale;
    let dest_h = raster.height() as f32 * scale;

    let x_start = dest_x.max(0.0) as u32;
    let y_start = dest_y.max(0.0) as u32;
    let x_end = (dest_x + dest_w).min(buffer.width as f32) as u32;
    let y_end = (dest_y + dest_h).min(buffer.height as f32) as u32;

    for y in y_start..y_end {
        for x in x_start..x_end {
            let src_x = ((x as f32 - dest_x) / scale) as u32;
            let src_y = ((y as f32 - dest_y) / scale) as u32;

            if src_x < raster.width() && src_y < raster.height() {
                buffer.blend_pixel(x, y, raster.pixel(src_x, src_y));
            }
        }
    }
}

fn draw_vector(buffer: &mut PixelBuffer, vector: &VectorContent, offset: Point, scale: f32) {
    let subpaths = path::flatten(vector.commands(), offset, scale);
    if subpaths.is_empty() {
        return;
    }

    if let Some(fill) = vector.fill() {
        path::fill_path(buffer, &subpaths, fill);
    }
    if let Some(stroke) = vector.stroke() {
        path::stroke_path(buffer, &subpaths, stroke, scale);
    }
}
