use anyhow::{Context, Result, anyhow};
use geo::{Coord, MapCoords, MultiPolygon};
use proj4rs::{proj::Proj, transform::transform};

/// Coordinate reference systems the pipeline moves between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Crs {
    /// Longitude/latitude in degrees (EPSG:4326), as found in KML.
    Wgs84,
    /// Spherical Web Mercator metres (EPSG:3857), shared by distances and basemap tiles.
    WebMercator,
}

/// CRS of parsed boundary files.
pub const SOURCE_CRS: Crs = Crs::Wgs84;

/// Planar CRS used for every distance, bounds and framing computation.
pub const PLANAR_CRS: Crs = Crs::WebMercator;

impl Crs {
    #[inline]
    pub fn epsg(self) -> u32 {
        match self {
            Crs::Wgs84 => 4326,
            Crs::WebMercator => 3857,
        }
    }

    /// Geographic systems take and return angles; proj4rs wants radians for those.
    #[inline]
    pub fn is_geographic(self) -> bool { matches!(self, Crs::Wgs84) }

    #[inline]
    fn proj4(self) -> &'static str {
        match self {
            Crs::Wgs84 => "+proj=longlat +datum=WGS84 +no_defs +type=crs",
            Crs::WebMercator => "+proj=merc +a=6378137 +b=6378137 +lat_ts=0 +lon_0=0 +x_0=0 +y_0=0 +k=1 +units=m +no_defs +type=crs",
        }
    }

    fn build(self) -> Result<Proj> {
        let proj_string = self.proj4();
        Proj::from_proj_string(proj_string)
            .with_context(|| anyhow!("failed to build PROJ.4 for EPSG:{}: {proj_string}", self.epsg()))
    }
}

/// A prepared transform between two CRSs.
pub(crate) struct Reprojector {
    from: Proj,
    to: Proj,
    from_crs: Crs,
    to_crs: Crs,
}

impl Reprojector {
    pub(crate) fn new(from_crs: Crs, to_crs: Crs) -> Result<Self> {
        Ok(Self { from: from_crs.build()?, to: to_crs.build()?, from_crs, to_crs })
    }

    /// Transform a single coordinate.
    pub(crate) fn coord(&self, coord: Coord<f64>) -> Result<Coord<f64>> {
        if self.from_crs == self.to_crs { return Ok(coord) }

        let mut point = if self.from_crs.is_geographic() {
            (coord.x.to_radians(), coord.y.to_radians(), 0.0)
        } else {
            (coord.x, coord.y, 0.0)
        };

        transform(&self.from, &self.to, &mut point)
            .with_context(|| format!(
                "[geom::proj] EPSG:{} -> EPSG:{} failed at ({}, {})",
                self.from_crs.epsg(), self.to_crs.epsg(), coord.x, coord.y,
            ))?;

        Ok(if self.to_crs.is_geographic() {
            Coord { x: point.0.to_degrees(), y: point.1.to_degrees() }
        } else {
            Coord { x: point.0, y: point.1 }
        })
    }

    /// Transform every vertex of a shape.
    pub(crate) fn shape(&self, shape: &MultiPolygon<f64>) -> Result<MultiPolygon<f64>> {
        shape.try_map_coords(|coord| self.coord(coord))
    }
}
