//! Rasterisation of planar polygons over an RGB basemap.

use anyhow::{Context, Result};
use geo::{Coord, MultiPolygon, Polygon};
use image::{Rgb, RgbImage};
use tiny_skia::{FillRule, Paint, Path, PathBuilder, Pixmap, Stroke, Transform};

use crate::geom::Frame;

pub(crate) const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
pub(crate) const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

/// Outline width, in pixels.
const EDGE_WIDTH_PX: f32 = 1.5;

/// Maps a square `Frame` in planar metres onto a `size` x `size` pixel canvas (y down).
#[derive(Debug, Clone, Copy)]
pub(crate) struct Viewport {
    frame: Frame,
    size: u32,
}

impl Viewport {
    pub(crate) fn new(frame: Frame, size: u32) -> Self { Self { frame, size } }

    #[inline] pub(crate) fn size(&self) -> u32 { self.size }

    #[inline]
    fn scale(&self) -> f64 { self.size as f64 / self.frame.side() }

    /// World coordinate -> continuous pixel coordinate.
    #[inline]
    pub(crate) fn to_pixel(&self, coord: Coord<f64>) -> (f64, f64) {
        let (min, max) = (self.frame.min(), self.frame.max());
        ((coord.x - min.x) * self.scale(), (max.y - coord.y) * self.scale())
    }

    /// Continuous pixel coordinate -> world coordinate.
    #[inline]
    pub(crate) fn to_world(&self, px: f64, py: f64) -> Coord<f64> {
        let (min, max) = (self.frame.min(), self.frame.max());
        Coord { x: min.x + px / self.scale(), y: max.y - py / self.scale() }
    }
}

/// Fill every polygon of `shapes` (even-odd, so holes stay unfilled), outline its rings,
/// and composite the result over `canvas`.
pub(crate) fn draw_shapes(
    canvas: &mut RgbImage,
    shapes: &[MultiPolygon<f64>],
    viewport: &Viewport,
    fill: Rgb<u8>,
    edge: Rgb<u8>,
) -> Result<()> {
    let size = viewport.size();
    let mut layer = Pixmap::new(size, size)
        .with_context(|| format!("[render] cannot allocate a {size}x{size} drawing layer"))?;

    let paths: Vec<Path> = shapes.iter()
        .flat_map(|shape| &shape.0)
        .filter_map(|polygon| polygon_path(polygon, viewport))
        .collect();

    let fill_paint = paint(fill);
    for path in &paths {
        layer.fill_path(path, &fill_paint, FillRule::EvenOdd, Transform::identity(), None);
    }

    let edge_paint = paint(edge);
    let stroke = Stroke { width: EDGE_WIDTH_PX, ..Stroke::default() };
    for path in &paths {
        layer.stroke_path(path, &edge_paint, &stroke, Transform::identity(), None);
    }

    composite(canvas, &layer);
    Ok(())
}

/// One closed subpath per ring, in pixel space. `None` for degenerate polygons.
fn polygon_path(polygon: &Polygon<f64>, viewport: &Viewport) -> Option<Path> {
    let mut builder = PathBuilder::new();
    for ring in std::iter::once(polygon.exterior()).chain(polygon.interiors()) {
        let mut points = ring.coords().map(|&c| viewport.to_pixel(c));
        let Some((x, y)) = points.next() else { continue };
        builder.move_to(x as f32, y as f32);
        for (x, y) in points {
            builder.line_to(x as f32, y as f32);
        }
        builder.close();
    }
    builder.finish()
}

fn paint(color: Rgb<u8>) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color_rgba8(color[0], color[1], color[2], 255);
    paint.anti_alias = true;
    paint
}

/// Source-over blend of the premultiplied `layer` onto `canvas`.
fn composite(canvas: &mut RgbImage, layer: &Pixmap) {
    let width = layer.width();
    for (idx, src) in layer.pixels().iter().enumerate() {
        let alpha = src.alpha() as u16;
        if alpha == 0 { continue }

        let (x, y) = (idx as u32 % width, idx as u32 / width);
        let Some(dst) = canvas.get_pixel_mut_checked(x, y) else { continue };
        let keep = 255 - alpha;
        for (channel, value) in dst.0.iter_mut().zip([src.red(), src.green(), src.blue()]) {
            *channel = (value as u16 + (*channel as u16 * keep + 127) / 255).min(255) as u8;
        }
    }
}
