//! IO module for format-specific reading operations.
//!
//! # Format Modules
//!
//! - `kml` - KML boundary files (placemarks, polygons, descriptions)
//! - `csv` - CSV tables of auxiliary card text
//!
//! Image and deck output live with the renderer and packager, which own those formats.

pub(crate) mod csv;
pub(crate) mod kml;
