use std::path::PathBuf;

use anyhow::Result;
use suburb_cards::{DeckConfig, PipelinePaths};

/// Brisbane suburb flashcards from locality boundaries
#[derive(clap::Parser, Debug)]
#[command(name = "suburb-cards", version, about, propagate_version = true)]
pub struct Cli {
    /// Increase output verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// JSON configuration; omitted keys take their defaults
    #[arg(short, long, value_hint = clap::ValueHint::FilePath, global = true)]
    pub config: Option<PathBuf>,

    /// Locality boundary KML
    #[arg(short, long, default_value = "doc.kml", value_hint = clap::ValueHint::FilePath, global = true)]
    pub input: PathBuf,

    /// Root directory for rendered images
    #[arg(short, long, default_value = "output", value_hint = clap::ValueHint::DirPath, global = true)]
    pub output: PathBuf,

    /// Deck archive to write
    #[arg(short, long, default_value = "suburb_maps.apkg", value_hint = clap::ValueHint::FilePath, global = true)]
    pub deck: PathBuf,

    /// CSV with `name,fact` columns shown on the back of matching cards
    #[arg(short, long, value_hint = clap::ValueHint::FilePath, global = true)]
    pub facts: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Render every image, then package the deck (default)
    Run,

    /// Render images only
    Render,

    /// Package the deck from images already on disk
    Deck,
}

impl Cli {
    pub fn deck_config(&self) -> Result<DeckConfig> {
        match &self.config {
            Some(path) => DeckConfig::from_json_file(path),
            None => Ok(DeckConfig::default()),
        }
    }

    pub fn paths(&self) -> PipelinePaths {
        PipelinePaths {
            input: self.input.clone(),
            output: self.output.clone(),
            deck: self.deck.clone(),
            facts: self.facts.clone(),
        }
    }
}
