#![doc = "Brisbane suburb flashcards: locality boundaries to distance-ranked map cards"]
mod common;
mod config;
mod deck;
mod geom;
mod io;
mod locality;
mod pipeline;
mod rank;
mod render;

#[doc(inline)]
pub use config::{Cluster, DeckConfig, Enclave};

#[doc(inline)]
pub use deck::{
    Assembly, DECK_ID, DECK_NAME, DeckSummary, FlashcardRecord, ImageRef, JoinFailure, MODEL_ID, MODEL_NAME,
    assemble_cards, scan_images, write_deck,
};

#[doc(inline)]
pub use geom::{Crs, Frame, PLANAR_CRS, SOURCE_CRS};

#[doc(inline)]
pub use locality::{Localities, Locality};

#[doc(inline)]
pub use pipeline::{DeckReport, PipelinePaths, Prepared, build_deck, prepare, prepare_table, render_images, run};

#[doc(inline)]
pub use rank::{RankedLocality, Ranking};

#[doc(inline)]
pub use render::{ImageCategory, MAX_ZOOM, MapRenderer, RenderJob, TILE_SIZE, TileFetcher, TileId, TileSource, image_path, plan_renders};

#[cfg(feature = "download")]
#[doc(inline)]
pub use render::HttpTileFetcher;
