//! Web-Mercator XYZ basemap tiles.

use anyhow::Result;
use image::RgbImage;
use serde::{Deserialize, Serialize};

/// Pixel size of a basemap tile.
pub const TILE_SIZE: u32 = 256;

/// Highest zoom level requested from tile servers.
pub const MAX_ZOOM: u8 = 19;

/// Half the width of the Web Mercator world, in metres.
pub(crate) const HALF_WORLD: f64 = 20_037_508.342_789_244;

/// Basemap providers the renderer knows how to address.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TileSource {
    /// OpenStreetMap standard ("Mapnik") tiles.
    #[default]
    OpenStreetMap,
    /// Google Maps road tiles via the public tile template.
    Google,
}

impl TileSource {
    /// URL template with `{z}`, `{x}` and `{y}` placeholders.
    pub fn url_template(self) -> &'static str {
        match self {
            TileSource::OpenStreetMap => "https://tile.openstreetmap.org/{z}/{x}/{y}.png",
            TileSource::Google => "http://mt1.google.com/vt/lyrs=m&x={x}&y={y}&z={z}",
        }
    }

    pub fn url(self, tile: TileId) -> String {
        self.url_template()
            .replace("{z}", &tile.z.to_string())
            .replace("{x}", &tile.x.to_string())
            .replace("{y}", &tile.y.to_string())
    }
}

/// Address of one tile: zoom level, column (west to east), row (north to south).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileId {
    pub z: u8,
    pub x: u32,
    pub y: u32,
}

/// Source of decoded basemap tiles.
pub trait TileFetcher {
    fn fetch(&self, tile: TileId) -> Result<RgbImage>;
}

impl<T: TileFetcher + ?Sized> TileFetcher for &T {
    #[inline]
    fn fetch(&self, tile: TileId) -> Result<RgbImage> { (**self).fetch(tile) }
}

/// Metres covered by one pixel of a tile at zoom `z`.
#[inline]
pub(crate) fn metres_per_pixel(z: u8) -> f64 {
    2.0 * HALF_WORLD / (TILE_SIZE as f64 * 2f64.powi(z as i32))
}

/// Lowest zoom whose tiles are at least as detailed as a `side_m` wide view drawn at `size_px`.
pub(crate) fn zoom_for(side_m: f64, size_px: u32) -> u8 {
    let wanted = side_m / size_px.max(1) as f64;
    (0..=MAX_ZOOM)
        .find(|&z| metres_per_pixel(z) <= wanted)
        .unwrap_or(MAX_ZOOM)
}

#[cfg(feature = "download")]
mod http {
    use std::time::Duration;

    use anyhow::{Context, Result};
    use image::RgbImage;
    use reqwest::blocking::Client;

    use super::{TileFetcher, TileId, TileSource};

    /// Fetches tiles over HTTP. Failures are not retried.
    pub struct HttpTileFetcher {
        client: Client,
        source: TileSource,
    }

    impl HttpTileFetcher {
        pub fn new(source: TileSource) -> Result<Self> {
            let client = Client::builder()
                .user_agent(concat!("suburb-cards/", env!("CARGO_PKG_VERSION")))
                .timeout(Duration::from_secs(30))
                .build()
                .context("[render::tiles] failed to build HTTP client")?;
            Ok(Self { client, source })
        }
    }

    impl TileFetcher for HttpTileFetcher {
        fn fetch(&self, tile: TileId) -> Result<RgbImage> {
            let url = self.source.url(tile);
            log::debug!("[render::tiles] GET {url}");

            let bytes = self.client.get(&url)
                .send()
                .with_context(|| format!("GET {url}"))?
                .error_for_status()
                .with_context(|| format!("GET {url} returned error status"))?
                .bytes()
                .with_context(|| format!("GET {url} body"))?;

            Ok(image::load_from_memory(&bytes)
                .with_context(|| format!("[render::tiles] failed to decode tile {url}"))?
                .to_rgb8())
        }
    }
}

#[cfg(feature = "download")]
pub use http::HttpTileFetcher;
