pub mod deck;
pub mod render;
pub mod run;

use anyhow::Result;
use suburb_cards::{DeckConfig, HttpTileFetcher, MapRenderer};

/// Renderer backed by the configured web tile source.
pub(crate) fn tile_renderer(config: &DeckConfig) -> Result<MapRenderer<HttpTileFetcher>> {
    let fetcher = HttpTileFetcher::new(config.tile_source)?;
    Ok(MapRenderer::new(fetcher, config.image_size_px(), config.jpeg_quality))
}
