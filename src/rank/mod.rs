mod ranking;

pub use ranking::{RankedLocality, Ranking};
