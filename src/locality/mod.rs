mod describe;
mod locality;

pub use locality::{Locality, Localities};
