//! Path flattening and rasterization for vector layers.

use crate::raster::PixelBuffer;
use common::color::Color;
use common::geometry::Point;
use document::layer::{PathCommand, Stroke};
use std::cmp::Ordering;

/// Fixed subdivision count for curve flattening.
const CURVE_SEGMENTS: u32 = 16;

/// Flatten path commands into polylines, translated by `offset` and scaled
/// uniformly. One polyline per subpath.
pub(crate) fn flatten(commands: &[PathCommand], offset: Point, scale: f32) -> Vec<Vec<Point>> {
    let transform =
        |p: Point| Point::new((p.x + offset.x) * scale, (p.y + offset.y) * scale);

    let mut subpaths: Vec<Vec<Point>> = Vec::new();
    let mut current: Vec<Point> = Vec::new();
    let mut subpath_start = Point::ZERO;

    let finish = |points: &mut Vec<Point>, subpaths: &mut Vec<Vec<Point>>| {
        if points.len() > 1 {
            subpaths.push(std::mem::take(points));
        } else {
            points.clear();
        }
    };

    for command in commands {
        match *command {
            PathCommand::MoveTo(p) => {
                finish(&mut current, &mut subpaths);
                let p = transform(p);
                subpath_start = p;
                current.push(p);
            }
            PathCommand::LineTo(p) => {
                let p = transform(p);
                if current.is_empty() {
                    subpath_start = p;
                }
                current.push(p);
            }
            PathCommand::QuadTo(c, p) => {
                let from = *current.last().unwrap_or(&subpath_start);
                let c = transform(c);
                let p = transform(p);
                if current.is_empty() {
                    current.push(from);
                }
                for i in 1..=CURVE_SEGMENTS {
                    let t = i as f32 / CURVE_SEGMENTS as f32;
                    current.push(quad_point(from, c, p, t));
                }
            }
            PathCommand::CubicTo(c1, c2, p) => {
                let from = *current.last().unwrap_or(&subpath_start);
                let c1 = transform(c1);
                let c2 = transform(c2);
                let p = transform(p);
                if current.is_empty() {
                    current.push(from);
                }
                for i in 1..=CURVE_SEGMENTS {
                    let t = i as f32 / CURVE_SEGMENTS as f32;
                    current.push(cubic_point(from, c1, c2, p, t));
                }
            }
            PathCommand::Close => {
                if !current.is_empty() {
                    current.push(subpath_start);
                }
                finish(&mut current, &mut subpaths);
                // Commands after a close continue from the subpath start.
                current.push(subpath_start);
            }
        }
    }

    finish(&mut current, &mut subpaths);
    subpaths
}

fn quad_point(p0: Point, c: Point, p1: Point, t: f32) -> Point {
    let u = 1.0 - t;
    Point::new(
        u * u * p0.x + 2.0 * u * t * c.x + t * t * p1.x,
        u * u * p0.y + 2.0 * u * t * c.y + t * t * p1.y,
    )
}

fn cubic_point(p0: Point, c1: Point, c2: Point, p1: Point, t: f32) -> Point {
    let u = 1.0 - t;
    Point::new(
        u * u * u * p0.x + 3.0 * u * u * t * c1.x + 3.0 * u * t * t * c2.x + t * t * t * p1.x,
        u * u * u * p0.y + 3.0 * u * u * t * c1.y + 3.0 * u * t * t * c2.y + t * t * t * p1.y,
    )
}

/// Even-odd scanline fill over flattened subpaths. Subpaths are treated as
/// implicitly closed.
pub(crate) fn fill_path(buffer: &mut PixelBuffer, subpaths: &[Vec<Point>], color: Color) {
    let mut edges: Vec<(Point, Point)> = Vec::new();
    let mut min_y = f32::INFINITY;
    let mut max_y = f32::NEG_INFINITY;

    for subpath in subpaths {
        for pair in subpath.windows(2) {
            edges.push((pair[0], pair[1]));
        }
        if let (Some(&first), Some(&last)) = (subpath.first(), subpath.last()) {
            if first != last {
                edges.push((last, first));
            }
        }
        for p in subpath {
            min_y = min_y.min(p.y);
            max_y = max_y.max(p.y);
        }
    }

    if edges.is_empty() {
        return;
    }

    let y_start = min_y.max(0.0) as u32;
    let y_end = (max_y.ceil().min(buffer.height as f32)).max(0.0) as u32;

    let mut crossings: Vec<f32> = Vec::new();
    for y in y_start..y_end {
        let scan_y = y as f32 + 0.5;

        crossings.clear();
        for &(a, b) in &edges {
            if (a.y <= scan_y) != (b.y <= scan_y) {
                let t = (scan_y - a.y) / (b.y - a.y);
                crossings.push(a.x + t * (b.x - a.x));
            }
        }

        crossings.sort_by(|p, q| p.partial_cmp(q).unwrap_or(Ordering::Equal));

        for span in crossings.chunks_exact(2) {
            let x_start = span[0].max(0.0).round() as u32;
            let x_end = (span[1].min(buffer.width as f32)).max(0.0).round() as u32;
            for x in x_start..x_end {
                buffer.blend_pixel(x, y, color);
            }
        }
    }
}

/// Stroke flattened subpaths as thick line segments. The stroke width is in
/// pre-scale units.
pub(crate) fn stroke_path(
    buffer: &mut PixelBuffer,
    subpaths: &[Vec<Point>],
    stroke: Stroke,
    scale: f32,
) {
    let width = (stroke.width * scale).max(1.0);
    for subpath in subpaths {
        for pair in subpath.windows(2) {
            draw_line(buffer, pair[0], pair[1], stroke.color, width);
        }
    }
}

/// Bresenham line with thickness.
fn draw_line(buffer: &mut PixelBuffer, start: Point, end: Point, color: Color, width: f32) {
    let x0 = start.x as i32;
    let y0 = start.y as i32;
    let x1 = end.x as i32;
    let y1 = end.y as i32;

    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    let half_width = (width / 2.0) as i32;

    let mut x = x0;
    let mut y = y0;

    loop {
        for ty in -half_width..=half_width {
            for tx in -half_width..=half_width {
                let px = x + tx;
                let py = y + ty;
                if px >= 0 && py >= 0 {
                    buffer.set_pixel(px as u32, py as u32, color);
                }
            }
        }

        if x == x1 && y == y1 {
            break;
        }

        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use document::layer::PathBuilder;

    fn rect_commands() -> Vec<PathCommand> {
        PathBuilder::new()
            .rect(2.0, 2.0, 4.0, 4.0)
            .filled(Color::RED)
            .commands()
            .to_vec()
    }

    #[test]
    fn test_flatten_rect() {
        let subpaths = flatten(&rect_commands(), Point::ZERO, 1.0);
        assert_eq!(subpaths.len(), 1);
        // Four corners plus the closing point.
        assert_eq!(subpaths[0].len(), 5);
        assert_eq!(subpaths[0][0], subpaths[0][4]);
    }

    #[test]
    fn test_flatten_applies_offset_and_scale() {
        let subpaths = flatten(&rect_commands(), Point::new(1.0, 1.0), 2.0);
        assert_eq!(subpaths[0][0], Point::new(6.0, 6.0));
    }

    #[test]
    fn test_flatten_curve_segment_count() {
        let commands = PathBuilder::new()
            .move_to(0.0, 0.0)
            .quad_to(5.0, 10.0, 10.0, 0.0)
            .filled(Color::RED)
            .commands()
            .to_vec();
        let subpaths = flatten(&commands, Point::ZERO, 1.0);
        assert_eq!(subpaths[0].len(), 1 + CURVE_SEGMENTS as usize);
        assert_eq!(subpaths[0][CURVE_SEGMENTS as usize], Point::new(10.0, 0.0));
    }

    #[test]
    fn test_fill_rect_covers_interior_only() {
        let mut buffer = PixelBuffer::alloc(8, 8).unwrap();
        let subpaths = flatten(&rect_commands(), Point::ZERO, 1.0);
        fill_path(&mut buffer, &subpaths, Color::RED);

        assert_eq!(buffer.get_pixel(3, 3), Color::RED);
        assert_eq!(buffer.get_pixel(5, 5), Color::RED);
        assert_eq!(buffer.get_pixel(1, 1), Color::TRANSPARENT);
        assert_eq!(buffer.get_pixel(6, 6), Color::TRANSPARENT);
    }

    #[test]
    fn test_stroke_marks_outline() {
        let mut buffer = PixelBuffer::alloc(8, 8).unwrap();
        let subpaths = flatten(&rect_commands(), Point::ZERO, 1.0);
        stroke_path(&mut buffer, &subpaths, Stroke::new(Color::BLACK, 1.0), 1.0);

        assert_eq!(buffer.get_pixel(2, 2), Color::BLACK);
        assert_eq!(buffer.get_pixel(4, 2), Color::BLACK);
        assert_eq!(buffer.get_pixel(0, 0), Color::TRANSPARENT);
    }
}
