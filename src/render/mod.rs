mod plan;
mod raster;
mod renderer;
mod tiles;

pub use plan::{ImageCategory, RenderJob, image_path, plan_renders};
pub use renderer::MapRenderer;
pub use tiles::{MAX_ZOOM, TILE_SIZE, TileFetcher, TileId, TileSource};

#[cfg(feature = "download")]
pub use tiles::HttpTileFetcher;
