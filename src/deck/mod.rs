//! Flashcard deck: join rendered images to ranks and package them in study order.

mod assemble;
mod collection;
mod model;
mod package;
mod record;

pub use assemble::{assemble_cards, scan_images};
pub use model::{DECK_ID, DECK_NAME, MODEL_ID, MODEL_NAME};
pub use package::{DeckSummary, write_deck};
pub use record::{Assembly, FlashcardRecord, ImageRef, JoinFailure};
