use anyhow::Result;

use super::tile_renderer;

pub fn run(cli: &crate::cli::Cli) -> Result<()> {
    let config = cli.deck_config()?;
    let paths = cli.paths();

    let report = suburb_cards::run(&config, &paths, &tile_renderer(&config)?)?;

    log::info!("[run] {} cards in {} ({} images skipped)",
        report.deck.notes, report.deck.path.display(), report.skipped.len());
    Ok(())
}
