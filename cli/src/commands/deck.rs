use anyhow::Result;
use suburb_cards::{build_deck, prepare};

pub fn run(cli: &crate::cli::Cli) -> Result<()> {
    let config = cli.deck_config()?;

    // Ranks are recomputed from the boundaries; images are taken as they are on disk.
    let prepared = prepare(&config, &cli.input)?;
    let report = build_deck(&config, &prepared.ranking, &cli.output, &cli.deck, cli.facts.as_deref())?;

    log::info!("[deck] {} cards in {} ({} images skipped)",
        report.deck.notes, report.deck.path.display(), report.skipped.len());
    Ok(())
}
