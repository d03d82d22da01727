use std::{collections::HashMap, fs::File, io::{BufWriter, Write}, path::Path};

use anyhow::{Context, Result, ensure};
use geo::MultiPolygon;
use image::{ExtendedColorType, ImageEncoder, RgbImage, codecs::jpeg::JpegEncoder};

use crate::{common::ensure_dir_exists, geom::Frame};
use super::{raster::{self, BLACK, Viewport, WHITE}, tiles::{self, HALF_WORLD, TILE_SIZE, TileFetcher, TileId}};

/// Draws filled shapes over a basemap and writes square JPEGs.
pub struct MapRenderer<F: TileFetcher> {
    fetcher: F,
    size_px: u32,
    jpeg_quality: u8,
}

impl<F: TileFetcher> MapRenderer<F> {
    pub fn new(fetcher: F, size_px: u32, jpeg_quality: u8) -> Self {
        Self { fetcher, size_px, jpeg_quality }
    }

    #[inline] pub fn size_px(&self) -> u32 { self.size_px }

    /// Render `shapes` (planar metres) inside `frame` and write the image to `path`.
    pub fn render(&self, shapes: &[MultiPolygon<f64>], frame: &Frame, path: &Path) -> Result<()> {
        let canvas = self.draw(shapes, frame)?;
        write_jpeg(&canvas, path, self.jpeg_quality)
    }

    /// Render into memory.
    pub fn draw(&self, shapes: &[MultiPolygon<f64>], frame: &Frame) -> Result<RgbImage> {
        ensure!(self.size_px > 0, "[render] image size must be positive");
        ensure!(frame.is_drawable(), "[render] cannot frame geometry with extent {:?}", frame);

        let viewport = Viewport::new(*frame, self.size_px);
        let mut canvas = self.basemap(frame, &viewport)?;
        raster::draw_shapes(&mut canvas, shapes, &viewport, WHITE, BLACK)?;
        Ok(canvas)
    }

    /// Sample basemap tiles at every pixel centre; pixels beyond the mapped world stay white.
    fn basemap(&self, frame: &Frame, viewport: &Viewport) -> Result<RgbImage> {
        let size = viewport.size();
        let zoom = tiles::zoom_for(frame.side(), size);
        let world_px = TILE_SIZE as f64 * 2f64.powi(zoom as i32);
        let tiles_per_axis = 1u64 << zoom;

        let mut canvas = RgbImage::from_pixel(size, size, WHITE);
        let mut cache: HashMap<TileId, RgbImage> = HashMap::new();

        for py in 0..size {
            for px in 0..size {
                let world = viewport.to_world(px as f64 + 0.5, py as f64 + 0.5);
                let gx = (world.x + HALF_WORLD) / (2.0 * HALF_WORLD) * world_px;
                let gy = (HALF_WORLD - world.y) / (2.0 * HALF_WORLD) * world_px;
                if !(0.0..world_px).contains(&gx) || !(0.0..world_px).contains(&gy) { continue }

                let (tx, ty) = ((gx / TILE_SIZE as f64) as u64, (gy / TILE_SIZE as f64) as u64);
                if tx >= tiles_per_axis || ty >= tiles_per_axis { continue }
                let id = TileId { z: zoom, x: tx as u32, y: ty as u32 };

                if !cache.contains_key(&id) {
                    let tile = self.fetcher.fetch(id)
                        .with_context(|| format!("[render] failed to fetch basemap tile {}/{}/{}", id.z, id.x, id.y))?;
                    ensure!(tile.width() > 0 && tile.height() > 0, "[render] empty basemap tile {id:?}");
                    cache.insert(id, tile);
                }
                let Some(tile) = cache.get(&id) else { continue };

                let fx = (gx - tx as f64 * TILE_SIZE as f64) / TILE_SIZE as f64;
                let fy = (gy - ty as f64 * TILE_SIZE as f64) / TILE_SIZE as f64;
                let lx = ((fx * tile.width() as f64) as u32).min(tile.width() - 1);
                let ly = ((fy * tile.height() as f64) as u32).min(tile.height() - 1);
                canvas.put_pixel(px, py, *tile.get_pixel(lx, ly));
            }
        }

        log::debug!("[render] basemap zoom {zoom}, {} tiles", cache.len());
        Ok(canvas)
    }
}

/// Encode `canvas` as JPEG at `path`, creating the parent directory if needed.
pub(crate) fn write_jpeg(canvas: &RgbImage, path: &Path, quality: u8) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir_exists(parent)?;
    }
    let file = File::create(path)
        .with_context(|| format!("[render] Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);

    JpegEncoder::new_with_quality(&mut writer, quality)
        .write_image(canvas.as_raw(), canvas.width(), canvas.height(), ExtendedColorType::Rgb8)
        .with_context(|| format!("[render] Failed to encode {}", path.display()))?;
    writer.flush()
        .with_context(|| format!("[render] Failed to write {}", path.display()))?;
    Ok(())
}
