use geo::{BoundingRect, Coord, MultiPolygon, Rect};

/// Bounding rectangle covering every shape, or `None` if all shapes are empty.
pub(crate) fn union_bounds<'a>(shapes: impl IntoIterator<Item = &'a MultiPolygon<f64>>) -> Option<Rect<f64>> {
    shapes.into_iter()
        .filter_map(|shape| shape.bounding_rect())
        .reduce(|a, b| Rect::new(
            Coord {
                x: a.min().x.min(b.min().x),
                y: a.min().y.min(b.min().y),
            },
            Coord {
                x: a.max().x.max(b.max().x),
                y: a.max().y.max(b.max().y),
            }
        ))
}

/// Square viewport in planar metres: a centre and the distance from it to each edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    center: Coord<f64>,
    half_extent: f64,
}

impl Frame {
    pub fn new(center: Coord<f64>, half_extent: f64) -> Self {
        Self { center, half_extent }
    }

    /// Pad `bounds` by `padding` times its width (x) and height (y) on each side,
    /// then square it around the centre using the larger padded dimension.
    pub fn around(bounds: Rect<f64>, padding: f64) -> Self {
        let (width, height) = (bounds.width(), bounds.height());

        let min_x = bounds.min().x - width * padding;
        let max_x = bounds.max().x + width * padding;
        let min_y = bounds.min().y - height * padding;
        let max_y = bounds.max().y + height * padding;

        Self {
            center: Coord { x: (min_x + max_x) / 2.0, y: (min_y + max_y) / 2.0 },
            half_extent: (max_x - min_x).max(max_y - min_y) / 2.0,
        }
    }

    #[inline] pub fn center(&self) -> Coord<f64> { self.center }

    #[inline] pub fn half_extent(&self) -> f64 { self.half_extent }

    /// Side length of the square.
    #[inline] pub fn side(&self) -> f64 { self.half_extent * 2.0 }

    #[inline]
    pub fn min(&self) -> Coord<f64> {
        Coord { x: self.center.x - self.half_extent, y: self.center.y - self.half_extent }
    }

    #[inline]
    pub fn max(&self) -> Coord<f64> {
        Coord { x: self.center.x + self.half_extent, y: self.center.y + self.half_extent }
    }

    /// A frame can only be rendered if it has a finite, positive size.
    #[inline]
    pub fn is_drawable(&self) -> bool {
        self.half_extent.is_finite() && self.half_extent > 0.0
            && self.center.x.is_finite() && self.center.y.is_finite()
    }
}
