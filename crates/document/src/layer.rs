//! Layer entities.
//!
//! A layer is plain data: a name, flags, an offset, and either raster or
//! vector content. Nothing here knows how to paint; rasterization lives in
//! the compositor crate.

use common::color::Color;
use common::geometry::{Point, Rect};
use slotmap::new_key_type;

new_key_type! {
    /// Stable handle for a layer, independent of its paint-order position.
    pub struct LayerId;
}

/// One visual element in a document.
#[derive(Clone, Debug)]
pub struct Layer {
    /// Display name, distinct from the handle.
    pub name: String,
    /// Hidden layers are skipped by the store's visible iteration.
    pub visible: bool,
    /// Selection state, owned here so every view reads the same truth.
    pub selected: bool,
    /// Translation applied to the content when compositing.
    pub offset: Point,
    /// Raster or vector content.
    pub content: LayerContent,
}

impl Layer {
    /// Create a raster layer at the origin, visible and unselected.
    pub fn raster(name: impl Into<String>, content: RasterContent) -> Self {
        Self {
            name: name.into(),
            visible: true,
            selected: false,
            offset: Point::ZERO,
            content: LayerContent::Raster(content),
        }
    }

    /// Create a vector layer at the origin, visible and unselected.
    pub fn vector(name: impl Into<String>, content: VectorContent) -> Self {
        Self {
            name: name.into(),
            visible: true,
            selected: false,
            offset: Point::ZERO,
            content: LayerContent::Vector(content),
        }
    }

    pub fn with_offset(mut self, x: f32, y: f32) -> Self {
        self.offset = Point::new(x, y);
        self
    }

    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    /// Content bounds translated by the layer offset.
    pub fn bounding_rect(&self) -> Rect {
        self.content
            .local_bounds()
            .translate(self.offset.x, self.offset.y)
    }
}

/// The two kinds of layer content.
#[derive(Clone, Debug)]
pub enum LayerContent {
    Raster(RasterContent),
    Vector(VectorContent),
}

impl LayerContent {
    /// Bounding rectangle in content-local coordinates.
    pub fn local_bounds(&self) -> Rect {
        match self {
            LayerContent::Raster(raster) => raster.local_bounds(),
            LayerContent::Vector(vector) => vector.local_bounds(),
        }
    }
}

/// A decoded RGBA8 bitmap.
#[derive(Clone)]
pub struct RasterContent {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl RasterContent {
    /// Fully transparent bitmap.
    pub fn new(width: u32, height: u32) -> Self {
        let size = (width as usize) * (height as usize) * 4;
        Self {
            width,
            height,
            pixels: vec![0; size],
        }
    }

    /// Wrap an existing RGBA8 buffer. The buffer length must be
    /// `width * height * 4`.
    pub fn from_pixels(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        debug_assert_eq!(pixels.len(), (width as usize) * (height as usize) * 4);
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Bitmap filled with a single color.
    pub fn solid(width: u32, height: u32, color: Color) -> Self {
        let mut content = Self::new(width, height);
        for chunk in content.pixels.chunks_exact_mut(4) {
            chunk[0] = color.r;
            chunk[1] = color.g;
            chunk[2] = color.b;
            chunk[3] = color.a;
        }
        content
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.pixels
    }

    /// Pixel at position; transparent outside the bitmap.
    pub fn pixel(&self, x: u32, y: u32) -> Color {
        if x >= self.width || y >= self.height {
            return Color::TRANSPARENT;
        }

        let offset = ((y * self.width + x) * 4) as usize;
        Color::rgba(
            self.pixels[offset],
            self.pixels[offset + 1],
            self.pixels[offset + 2],
            self.pixels[offset + 3],
        )
    }

    pub fn put_pixel(&mut self, x: u32, y: u32, color: Color) {
        if x >= self.width || y >= self.height {
            return;
        }

        let offset = ((y * self.width + x) * 4) as usize;
        self.pixels[offset] = color.r;
        self.pixels[offset + 1] = color.g;
        self.pixels[offset + 2] = color.b;
        self.pixels[offset + 3] = color.a;
    }

    pub fn local_bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width as f32, self.height as f32)
    }
}

impl std::fmt::Debug for RasterContent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RasterContent")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.pixels.len())
            .finish()
    }
}

/// One step of a vector path.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PathCommand {
    MoveTo(Point),
    LineTo(Point),
    /// Quadratic curve: control point, then end point.
    QuadTo(Point, Point),
    /// Cubic curve: two control points, then end point.
    CubicTo(Point, Point, Point),
    Close,
}

/// Stroke styling for a vector path.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Stroke {
    pub color: Color,
    pub width: f32,
}

impl Stroke {
    pub fn new(color: Color, width: f32) -> Self {
        Self { color, width }
    }
}

/// A vector path with styling and a cached local bounding rectangle.
///
/// The cached bounds are conservative: curve control points count toward
/// them even when the curve stays inside its hull.
#[derive(Clone, Debug)]
pub struct VectorContent {
    commands: Vec<PathCommand>,
    fill: Option<Color>,
    stroke: Option<Stroke>,
    bounds: Rect,
}

impl VectorContent {
    pub fn new(commands: Vec<PathCommand>, fill: Option<Color>, stroke: Option<Stroke>) -> Self {
        let bounds = path_bounds(&commands);
        Self {
            commands,
            fill,
            stroke,
            bounds,
        }
    }

    pub fn commands(&self) -> &[PathCommand] {
        &self.commands
    }

    pub fn fill(&self) -> Option<Color> {
        self.fill
    }

    pub fn stroke(&self) -> Option<Stroke> {
        self.stroke
    }

    pub fn local_bounds(&self) -> Rect {
        self.bounds
    }
}

/// Incremental builder for vector paths.
#[derive(Clone, Debug, Default)]
pub struct PathBuilder {
    commands: Vec<PathCommand>,
}

impl PathBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn move_to(mut self, x: f32, y: f32) -> Self {
        self.commands.push(PathCommand::MoveTo(Point::new(x, y)));
        self
    }

    pub fn line_to(mut self, x: f32, y: f32) -> Self {
        self.commands.push(PathCommand::LineTo(Point::new(x, y)));
        self
    }

    pub fn quad_to(mut self, cx: f32, cy: f32, x: f32, y: f32) -> Self {
        self.commands
            .push(PathCommand::QuadTo(Point::new(cx, cy), Point::new(x, y)));
        self
    }

    pub fn cubic_to(mut self, c1x: f32, c1y: f32, c2x: f32, c2y: f32, x: f32, y: f32) -> Self {
        self.commands.push(PathCommand::CubicTo(
            Point::new(c1x, c1y),
            Point::new(c2x, c2y),
            Point::new(x, y),
        ));
        self
    }

    pub fn close(mut self) -> Self {
        self.commands.push(PathCommand::Close);
        self
    }

    /// Axis-aligned rectangle subpath.
    pub fn rect(self, x: f32, y: f32, width: f32, height: f32) -> Self {
        self.move_to(x, y)
            .line_to(x + width, y)
            .line_to(x + width, y + height)
            .line_to(x, y + height)
            .close()
    }

    pub fn filled(self, fill: Color) -> VectorContent {
        VectorContent::new(self.commands, Some(fill), None)
    }

    pub fn stroked(self, stroke: Stroke) -> VectorContent {
        VectorContent::new(self.commands, None, Some(stroke))
    }

    pub fn styled(self, fill: Option<Color>, stroke: Option<Stroke>) -> VectorContent {
        VectorContent::new(self.commands, fill, stroke)
    }
}

/// Bounding box over every point referenced by the path.
fn path_bounds(commands: &[PathCommand]) -> Rect {
    let mut min_x = f32::INFINITY;
    let mut min_y = f32::INFINITY;
    let mut max_x = f32::NEG_INFINITY;
    let mut max_y = f32::NEG_INFINITY;
    let mut any = false;

    let mut visit = |p: &Point| {
        any = true;
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    };

    for command in commands {
        match command {
            PathCommand::MoveTo(p) | PathCommand::LineTo(p) => visit(p),
            PathCommand::QuadTo(c, p) => {
                visit(c);
                visit(p);
            }
            PathCommand::CubicTo(c1, c2, p) => {
                visit(c1);
                visit(c2);
                visit(p);
            }
            PathCommand::Close => {}
        }
    }

    if !any {
        return Rect::ZERO;
    }

    Rect::new(min_x, min_y, max_x - min_x, max_y - min_y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raster_layer_bounding_rect() {
        let layer = Layer::raster("bg", RasterContent::new(100, 50)).with_offset(10.0, 20.0);
        assert_eq!(layer.bounding_rect(), Rect::new(10.0, 20.0, 100.0, 50.0));
    }

    #[test]
    fn test_vector_layer_bounding_rect() {
        let content = PathBuilder::new()
            .rect(5.0, 3.0, 20.0, 10.0)
            .filled(Color::RED);
        let layer = Layer::vector("shape", content).with_offset(1.0, 1.0);
        assert_eq!(layer.bounding_rect(), Rect::new(6.0, 4.0, 20.0, 10.0));
    }

    #[test]
    fn test_empty_path_bounds() {
        let content = PathBuilder::new().filled(Color::RED);
        assert_eq!(content.local_bounds(), Rect::ZERO);
    }

    #[test]
    fn test_solid_raster_pixels() {
        let raster = RasterContent::solid(4, 4, Color::RED);
        assert_eq!(raster.pixel(0, 0), Color::RED);
        assert_eq!(raster.pixel(3, 3), Color::RED);
        assert_eq!(raster.pixel(4, 0), Color::TRANSPARENT);
    }

    #[test]
    fn test_put_pixel() {
        let mut raster = RasterContent::new(2, 2);
        raster.put_pixel(1, 1, Color::BLUE);
        assert_eq!(raster.pixel(1, 1), Color::BLUE);
        assert_eq!(raster.pixel(0, 0), Color::TRANSPARENT);
        // out of range writes are ignored
        raster.put_pixel(5, 5, Color::BLUE);
    }
}
