//! Stage orchestration: read and rank, render, then assemble and package the deck.

use std::{collections::BTreeMap, path::{Path, PathBuf}};

use anyhow::{Context, Result, ensure};

use crate::{
    common::ensure_dir_exists,
    config::DeckConfig,
    deck::{Assembly, DeckSummary, ImageRef, JoinFailure, assemble_cards, scan_images, write_deck},
    io::csv::{read_auxiliary_text, read_string_csv},
    locality::Localities,
    rank::Ranking,
    render::{ImageCategory, MapRenderer, RenderJob, TileFetcher, plan_renders},
};

/// Where a run reads from and writes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelinePaths {
    pub input: PathBuf,
    pub output: PathBuf,
    pub deck: PathBuf,
    pub facts: Option<PathBuf>,
}

impl Default for PipelinePaths {
    fn default() -> Self {
        Self {
            input: PathBuf::from("doc.kml"),
            output: PathBuf::from("output"),
            deck: PathBuf::from("suburb_maps.apkg"),
            facts: None,
        }
    }
}

/// Everything known before the first image is drawn.
#[derive(Debug, Clone)]
pub struct Prepared {
    /// The locality table in the planar CRS.
    pub localities: Localities,
    pub ranking: Ranking,
    pub jobs: Vec<RenderJob>,
}

/// The deck that was written and the images left out of it.
#[derive(Debug, Clone)]
pub struct DeckReport {
    pub deck: DeckSummary,
    pub skipped: Vec<JoinFailure>,
}

/// Read the KML at `input`, then see [`prepare_table`].
pub fn prepare(config: &DeckConfig, input: &Path) -> Result<Prepared> {
    let table = Localities::read_kml(input)?;
    log::info!("[pipeline] read {} localities from {}", table.len(), input.display());
    prepare_table(config, &table)
}

/// Validate the configuration against `table`, rank it and plan every image. Configuration
/// that cannot produce a consistent deck is rejected here, before anything is rendered.
pub fn prepare_table(config: &DeckConfig, table: &Localities) -> Result<Prepared> {
    config.validate()?;

    let localities = table.to_planar()?;
    let ranking = Ranking::by_distance(&localities, &config.reference_locality, &config.areas)?;
    ensure!(!ranking.is_empty(), "[pipeline] no localities in areas {:?}", config.areas);
    log::info!("[pipeline] ranked {} localities around {:?}", ranking.len(), config.reference_locality);

    for cluster in &config.clusters {
        ensure!(ranking.get(&cluster.anchor).is_some(),
            "[pipeline] anchor {:?} of cluster {:?} is not in the areas of interest", cluster.anchor, cluster.label);
    }
    if let Some(enclave) = &config.enclave {
        for member in &enclave.members {
            ensure!(ranking.get(member).is_some(),
                "[pipeline] enclave member {member:?} of {:?} is not in the areas of interest", enclave.enclosing);
        }
    }

    let jobs = plan_renders(&localities, config)?;
    Ok(Prepared { localities, ranking, jobs })
}

/// Draw every planned image under `output`; returns what was written in plan order.
pub fn render_images<F: TileFetcher>(prepared: &Prepared, renderer: &MapRenderer<F>, output: &Path) -> Result<Vec<ImageRef>> {
    for category in ImageCategory::ALL {
        ensure_dir_exists(&output.join(category.dir_name()))?;
    }

    let mut written = Vec::with_capacity(prepared.jobs.len());
    for (idx, job) in prepared.jobs.iter().enumerate() {
        let path = job.output_path(output)?;
        renderer.render(&job.shapes, &job.frame, &path)
            .with_context(|| format!("[pipeline] Failed to render {} image for {:?}", job.category, job.name))?;
        log::info!("[pipeline] ({}/{}) saved {}", idx + 1, prepared.jobs.len(), path.display());
        written.push(ImageRef { category: job.category, name: job.name.clone(), path });
    }
    Ok(written)
}

/// Join the images under `output` to `ranking` and write the deck to `deck_path`.
pub fn build_deck(
    config: &DeckConfig,
    ranking: &Ranking,
    output: &Path,
    deck_path: &Path,
    facts: Option<&Path>,
) -> Result<DeckReport> {
    let auxiliary = match facts {
        Some(path) => read_auxiliary_text(&read_string_csv(path)?)
            .with_context(|| format!("[pipeline] Failed to read facts from {}", path.display()))?,
        None => BTreeMap::new(),
    };

    let images = scan_images(output)?;
    let Assembly { records, skipped } = assemble_cards(&images, ranking, config, &auxiliary);
    if !skipped.is_empty() {
        log::warn!("[pipeline] {} image(s) left out of the deck", skipped.len());
    }
    for record in &records {
        ensure!((record.rank as usize) < ranking.len(),
            "[pipeline] {:?} has rank {} outside 0..{}", record.display_name, record.rank, ranking.len());
    }

    let deck = write_deck(&records, deck_path)?;
    Ok(DeckReport { deck, skipped })
}

/// Render every image, then package the deck.
pub fn run<F: TileFetcher>(config: &DeckConfig, paths: &PipelinePaths, renderer: &MapRenderer<F>) -> Result<DeckReport> {
    let prepared = prepare(config, &paths.input)?;
    render_images(&prepared, renderer, &paths.output)?;
    build_deck(config, &prepared.ranking, &paths.output, &paths.deck, paths.facts.as_deref())
}
