use anyhow::Result;
use suburb_cards::{prepare, render_images};

use super::tile_renderer;

pub fn run(cli: &crate::cli::Cli) -> Result<()> {
    let config = cli.deck_config()?;

    let prepared = prepare(&config, &cli.input)?;
    let images = render_images(&prepared, &tile_renderer(&config)?, &cli.output)?;

    log::info!("[render] {} images under {}", images.len(), cli.output.display());
    Ok(())
}
