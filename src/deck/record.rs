use std::path::PathBuf;

use crate::render::ImageCategory;

/// One card: an image and what the learner should answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashcardRecord {
    pub image_path: PathBuf,
    /// Locality name or cluster label.
    pub display_name: String,
    pub lga: String,
    /// Position in study order; cards are introduced by ascending rank.
    pub rank: u32,
    pub auxiliary_text: Option<String>,
}

/// A rendered image found on disk; `name` is its file stem.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ImageRef {
    pub category: ImageCategory,
    pub name: String,
    pub path: PathBuf,
}

/// An image that could not be joined to a rank and was left out of the deck.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinFailure {
    pub image: ImageRef,
    pub reason: String,
}

/// Result of joining images to ranks: records in study order plus what was left out.
#[derive(Debug, Clone, Default)]
pub struct Assembly {
    pub records: Vec<FlashcardRecord>,
    pub skipped: Vec<JoinFailure>,
}
