use std::{collections::{BTreeMap, BTreeSet}, path::Path};

use anyhow::{Context, Result, bail};
use geo::MultiPolygon;

use crate::{geom::{Crs, PLANAR_CRS, Reprojector, SOURCE_CRS}, io::kml::{Placemark, read_kml_file, read_kml_str}};
use super::describe::DescriptionParser;

/// One boundary feature: a named locality inside an administrative area (LGA).
/// Name and LGA are `None` when the feature's description did not carry them.
#[derive(Debug, Clone)]
pub struct Locality {
    name: Option<String>,
    lga: Option<String>,
    geometry: MultiPolygon<f64>,
}

impl Locality {
    pub fn new(name: Option<String>, lga: Option<String>, geometry: MultiPolygon<f64>) -> Self {
        Self { name, lga, geometry }
    }

    #[inline] pub fn name(&self) -> Option<&str> { self.name.as_deref() }

    #[inline] pub fn lga(&self) -> Option<&str> { self.lga.as_deref() }

    #[inline] pub fn geometry(&self) -> &MultiPolygon<f64> { &self.geometry }

    /// True if the locality has both a name and an LGA listed in `areas`.
    #[inline]
    pub fn is_in(&self, areas: &BTreeSet<String>) -> bool {
        self.name.is_some() && self.lga.as_ref().is_some_and(|lga| areas.contains(lga))
    }

    /// File stem of the locality's plain image: its name, qualified as `Name (LGA)` when the
    /// name is in `shared` (carried by more than one locality in the areas of interest).
    pub fn image_stem(&self, shared: &BTreeSet<String>) -> Option<String> {
        let name = self.name.as_deref()?;
        match self.lga.as_deref() {
            Some(lga) if shared.contains(name) => Some(format!("{name} ({lga})")),
            _ => Some(name.to_string()),
        }
    }
}

/// The locality table: every feature of a boundary file, in one CRS.
#[derive(Debug, Clone)]
pub struct Localities {
    rows: Vec<Locality>,
    crs: Crs,
}

impl Localities {
    pub fn new(rows: Vec<Locality>, crs: Crs) -> Self {
        Self { rows, crs }
    }

    /// Parse a KML boundary file.
    pub fn read_kml(path: &Path) -> Result<Self> {
        let placemarks = read_kml_file(path)?;
        Self::from_placemarks(placemarks)
    }

    /// Parse a KML boundary document held in memory.
    pub fn from_kml_str(text: &str) -> Result<Self> {
        let placemarks = read_kml_str(text)?;
        Self::from_placemarks(placemarks)
    }

    fn from_placemarks(placemarks: Vec<Placemark>) -> Result<Self> {
        let parser = DescriptionParser::new()?;

        let rows = placemarks.into_iter().enumerate()
            .map(|(idx, placemark)| {
                let label = placemark.name.clone().unwrap_or_else(|| format!("#{idx}"));
                let description = match placemark.description.as_deref() {
                    Some(html) => parser.parse(html),
                    None => {
                        log::warn!("[locality] feature {label} has no description; excluded");
                        Default::default()
                    }
                };

                match (&description.locality, &description.lga) {
                    (None, None) if placemark.description.is_some() =>
                        log::warn!("[locality] feature {label} has neither a locality nor an lga row; excluded"),
                    (None, Some(_)) => log::warn!("[locality] feature {label} has no locality row; excluded"),
                    (Some(name), None) => log::warn!("[locality] feature {label} ({name}) has no lga row; excluded"),
                    _ => {}
                }

                Locality::new(description.locality, description.lga, placemark.geometry)
            })
            .collect();

        Ok(Self::new(rows, SOURCE_CRS))
    }

    #[inline] pub fn len(&self) -> usize { self.rows.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.rows.is_empty() }

    #[inline] pub fn crs(&self) -> Crs { self.crs }

    #[inline] pub fn rows(&self) -> &[Locality] { &self.rows }

    #[inline] pub fn iter(&self) -> impl Iterator<Item = &Locality> { self.rows.iter() }

    /// Localities whose LGA is in `areas` (and whose name is known).
    pub fn in_areas<'a>(&'a self, areas: &'a BTreeSet<String>) -> impl Iterator<Item = &'a Locality> + 'a {
        self.rows.iter().filter(move |locality| locality.is_in(areas))
    }

    /// Names carried by more than one locality in `areas`.
    pub fn shared_names(&self, areas: &BTreeSet<String>) -> BTreeSet<String> {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for name in self.in_areas(areas).filter_map(Locality::name) {
            *counts.entry(name).or_default() += 1;
        }
        counts.into_iter()
            .filter(|&(_, count)| count > 1)
            .map(|(name, _)| name.to_string())
            .collect()
    }

    /// Every locality carrying `name`, in any LGA.
    pub fn named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Locality> + 'a {
        self.rows.iter().filter(move |locality| locality.name() == Some(name))
    }

    /// The single locality carrying `name`; zero or several matches is an error.
    pub fn find_unique(&self, name: &str) -> Result<&Locality> {
        let mut matches = self.rows.iter().filter(|locality| locality.name() == Some(name));
        match (matches.next(), matches.next()) {
            (Some(locality), None) => Ok(locality),
            (None, _) => bail!("[locality] no locality named {name:?}"),
            (Some(_), Some(_)) => bail!(
                "[locality] locality name {name:?} is ambiguous ({} features share it)",
                2 + matches.count(),
            ),
        }
    }

    /// Return a new table with every geometry transformed into `to`.
    pub fn reproject(&self, to: Crs) -> Result<Self> {
        if to == self.crs { return Ok(self.clone()) }

        let reproject = Reprojector::new(self.crs, to)?;
        let rows = self.rows.iter()
            .map(|locality| Ok(Locality {
                geometry: reproject.shape(&locality.geometry)
                    .with_context(|| format!("[locality] failed to reproject {}", locality.name().unwrap_or("<unnamed>")))?,
                ..locality.clone()
            }))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self::new(rows, to))
    }

    /// Reproject into the planar CRS used for distances and framing.
    #[inline]
    pub fn to_planar(&self) -> Result<Self> { self.reproject(PLANAR_CRS) }
}
