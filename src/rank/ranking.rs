use std::{borrow::Cow, collections::{BTreeSet, HashMap}};

use anyhow::{Context, Result, bail};
use geo::{Centroid, Point};

use crate::{geom::PLANAR_CRS, locality::Localities};

/// A locality's place in study order.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedLocality {
    pub name: String,
    pub lga: String,
    /// File stem of the locality's plain image, see [`Locality::image_stem`](crate::Locality::image_stem).
    pub stem: String,
    /// Planar distance from the reference centroid, in metres.
    pub distance_m: f64,
    pub rank: u32,
}

/// Dense 0-based study order of the localities in a set of LGAs, nearest to the reference first.
#[derive(Debug, Clone, Default)]
pub struct Ranking {
    entries: Vec<RankedLocality>,
    by_name: HashMap<String, usize>, // name -> index of its lowest-ranked entry
    by_stem: HashMap<String, usize>,
}

impl Ranking {
    /// Rank every locality in `areas` by the distance from its centroid to the centroid of
    /// `reference`, measured in the planar CRS. Ties fall back to (lga, name), so the result
    /// does not depend on the order of rows in `table`.
    pub fn by_distance(table: &Localities, reference: &str, areas: &BTreeSet<String>) -> Result<Self> {
        let planar = match table.crs() {
            PLANAR_CRS => Cow::Borrowed(table),
            _ => Cow::Owned(table.to_planar()?),
        };

        let origin = planar.find_unique(reference)
            .with_context(|| format!("[rank] reference locality {reference:?} must match exactly one feature"))?
            .geometry()
            .centroid()
            .with_context(|| format!("[rank] reference locality {reference:?} has empty geometry"))?;

        let shared = planar.shared_names(areas);
        let mut entries = planar.in_areas(areas)
            .map(|locality| {
                let (Some(name), Some(lga)) = (locality.name(), locality.lga()) else {
                    bail!("[rank] filtered locality without name or lga");
                };
                let centroid = locality.geometry().centroid()
                    .with_context(|| format!("[rank] locality {name:?} ({lga}) has empty geometry"))?;
                Ok(RankedLocality {
                    name: name.to_string(),
                    lga: lga.to_string(),
                    stem: locality.image_stem(&shared).unwrap_or_else(|| name.to_string()),
                    distance_m: planar_distance(centroid, origin),
                    rank: 0,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        entries.sort_by(|a, b| a.distance_m.total_cmp(&b.distance_m)
            .then_with(|| a.lga.cmp(&b.lga))
            .then_with(|| a.name.cmp(&b.name)));

        Ok(Self::from_sorted(entries))
    }

    /// Assign ranks by position and index names.
    fn from_sorted(mut entries: Vec<RankedLocality>) -> Self {
        let mut by_name = HashMap::with_capacity(entries.len());
        let mut by_stem = HashMap::with_capacity(entries.len());
        for (idx, entry) in entries.iter_mut().enumerate() {
            entry.rank = idx as u32;
            by_stem.entry(entry.stem.clone()).or_insert(idx);
            if let Some(&first) = by_name.get(&entry.name) {
                log::warn!(
                    "[rank] {:?} ({}) at rank {idx} shares its name with rank {first}; lookups by name use rank {first}",
                    entry.name, entry.lga,
                );
                continue;
            }
            by_name.insert(entry.name.clone(), idx);
        }
        Self { entries, by_name, by_stem }
    }

    /// Number of ranked localities.
    #[inline] pub fn len(&self) -> usize { self.entries.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    /// Entries in rank order.
    #[inline] pub fn entries(&self) -> &[RankedLocality] { &self.entries }

    /// The lowest-ranked entry for `name`.
    #[inline]
    pub fn get(&self, name: &str) -> Option<&RankedLocality> {
        self.by_name.get(name).map(|&idx| &self.entries[idx])
    }

    /// The entry whose plain image has file stem `stem`.
    #[inline]
    pub fn by_stem(&self, stem: &str) -> Option<&RankedLocality> {
        self.by_stem.get(stem).map(|&idx| &self.entries[idx])
    }

    #[inline]
    pub fn rank_of(&self, name: &str) -> Option<u32> { self.get(name).map(|entry| entry.rank) }
}

#[inline]
fn planar_distance(a: Point<f64>, b: Point<f64>) -> f64 {
    (a.x() - b.x()).hypot(a.y() - b.y())
}
