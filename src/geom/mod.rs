mod frame;
mod proj;

pub use frame::Frame;
pub(crate) use frame::union_bounds;
pub use proj::{Crs, PLANAR_CRS, SOURCE_CRS};
pub(crate) use proj::Reprojector;
