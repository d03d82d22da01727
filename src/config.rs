//! Run configuration: reference point, areas of interest, rendering options and the
//! special cases (combined clusters, enclave micro-localities).

use std::{collections::BTreeSet, fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result, bail, ensure};
use serde::{Deserialize, Serialize};

use crate::render::TileSource;

/// Localities studied as one card: rendered together, ranked by `anchor`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    /// Card name and image base name, e.g. "Kenmore and Kenmore Hills".
    pub label: String,
    pub members: BTreeSet<String>,
    /// Member whose rank the card takes.
    pub anchor: String,
}

impl Cluster {
    pub fn new(label: &str, members: &[&str], anchor: &str) -> Self {
        Self {
            label: label.to_string(),
            members: members.iter().map(|m| m.to_string()).collect(),
            anchor: anchor.to_string(),
        }
    }
}

/// Micro-localities framed by the extent of the locality that encloses them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enclave {
    pub enclosing: String,
    pub members: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeckConfig {
    /// Locality whose centroid is the origin of the study order.
    pub reference_locality: String,
    /// LGAs whose localities are ranked, rendered and carded.
    pub areas: BTreeSet<String>,
    /// Fraction of the geometry's width/height added on each side before squaring the frame.
    pub zoom_out: f64,
    pub tile_source: TileSource,
    pub figure_inches: f64,
    pub dpi: u32,
    pub jpeg_quality: u8,
    pub clusters: Vec<Cluster>,
    pub enclave: Option<Enclave>,
}

impl Default for DeckConfig {
    fn default() -> Self {
        Self {
            reference_locality: "Brisbane City".into(),
            areas: ["Brisbane City", "Logan City", "Moreton Bay City"]
                .into_iter().map(String::from).collect(),
            zoom_out: 0.8,
            tile_source: TileSource::default(),
            figure_inches: 5.0,
            dpi: 150,
            jpeg_quality: 90,
            clusters: vec![
                Cluster::new("Chermside and Chermside West", &["Chermside", "Chermside West"], "Chermside"),
                Cluster::new("Holland Park and Holland Park West", &["Holland Park", "Holland Park West"], "Holland Park"),
                Cluster::new("Kenmore and Kenmore Hills", &["Kenmore", "Kenmore Hills"], "Kenmore"),
                Cluster::new("Manly and Manly West", &["Manly", "Manly West"], "Manly"),
                Cluster::new(
                    "Mount Gravatt, Mount Gravatt East, and Upper Mount Gravatt",
                    &["Mount Gravatt", "Mount Gravatt East", "Upper Mount Gravatt"],
                    "Mount Gravatt",
                ),
                Cluster::new("Stafford and Stafford Heights", &["Stafford", "Stafford Heights"], "Stafford"),
                Cluster::new("Sunnybank and Sunnybank Hills", &["Sunnybank", "Sunnybank Hills"], "Sunnybank"),
                Cluster::new("Brookfield and Upper Brookfield", &["Brookfield", "Upper Brookfield"], "Brookfield"),
            ],
            enclave: Some(Enclave {
                enclosing: "Moreton Island".into(),
                members: ["Cowan Cowan", "Kooringal", "Bulwer"].into_iter().map(String::from).collect(),
            }),
        }
    }
}

impl DeckConfig {
    /// Load a JSON config file; absent keys take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("[config] Failed to open config file: {}", path.display()))?;
        let config: Self = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("[config] Failed to parse config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges and the internal consistency of clusters and enclaves.
    pub fn validate(&self) -> Result<()> {
        ensure!(!self.reference_locality.trim().is_empty(), "[config] reference_locality is empty");
        ensure!(!self.areas.is_empty(), "[config] areas must name at least one LGA");
        ensure!(self.zoom_out.is_finite() && self.zoom_out >= 0.0,
            "[config] zoom_out must be a non-negative number, got {}", self.zoom_out);
        ensure!(self.figure_inches.is_finite() && self.figure_inches > 0.0,
            "[config] figure_inches must be positive, got {}", self.figure_inches);
        ensure!(self.dpi > 0, "[config] dpi must be positive");
        ensure!((1..=100).contains(&self.jpeg_quality),
            "[config] jpeg_quality must be within 1..=100, got {}", self.jpeg_quality);
        ensure!(self.image_size_px() > 0, "[config] figure_inches x dpi rounds to an empty image");

        let mut labels = BTreeSet::new();
        for cluster in &self.clusters {
            ensure!(labels.insert(cluster.label.as_str()), "[config] duplicate cluster label {:?}", cluster.label);
            ensure!(cluster.members.len() >= 2,
                "[config] cluster {:?} needs at least two members", cluster.label);
            ensure!(cluster.members.contains(&cluster.anchor),
                "[config] cluster {:?} anchor {:?} is not one of its members", cluster.label, cluster.anchor);
        }

        let mut grouped = BTreeSet::new();
        for member in self.clusters.iter().flat_map(|cluster| &cluster.members) {
            ensure!(grouped.insert(member.as_str()), "[config] {member:?} belongs to more than one cluster");
        }

        if let Some(enclave) = &self.enclave {
            if enclave.members.contains(&enclave.enclosing) {
                bail!("[config] enclave {:?} lists itself as a member", enclave.enclosing);
            }
            if let Some(member) = enclave.members.iter().find(|m| grouped.contains(m.as_str())) {
                bail!("[config] {member:?} is both an enclave member and a cluster member");
            }
        }

        Ok(())
    }

    /// Side length of rendered images, in pixels.
    #[inline]
    pub fn image_size_px(&self) -> u32 {
        (self.figure_inches * self.dpi as f64).round() as u32
    }

    /// The cluster labelled `label`.
    pub fn cluster(&self, label: &str) -> Option<&Cluster> {
        self.clusters.iter().find(|cluster| cluster.label == label)
    }

    /// True if `name` is a member of some cluster.
    pub fn is_cluster_member(&self, name: &str) -> bool {
        self.clusters.iter().any(|cluster| cluster.members.contains(name))
    }

    /// True if `name` is an enclave micro-locality.
    pub fn is_enclave_member(&self, name: &str) -> bool {
        self.enclave.as_ref().is_some_and(|enclave| enclave.members.contains(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = DeckConfig::default();
        config.validate().unwrap();
        assert_eq!(config.reference_locality, "Brisbane City");
        assert_eq!(config.areas.len(), 3);
        assert_eq!(config.image_size_px(), 750);
        assert_eq!(config.clusters.len(), 8);
        assert!(config.is_cluster_member("Upper Mount Gravatt"));
        assert!(config.is_enclave_member("Bulwer"));
        assert!(!config.is_enclave_member("Moreton Island"));
        assert_eq!(config.cluster("Manly and Manly West").unwrap().anchor, "Manly");
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "zoom_out": 0.5, "tile_source": "google", "clusters": [] }"#).unwrap();

        let config = DeckConfig::from_json_file(&path).unwrap();
        assert_eq!(config.zoom_out, 0.5);
        assert_eq!(config.tile_source, TileSource::Google);
        assert!(config.clusters.is_empty());
        assert_eq!(config.dpi, 150);
        assert!(config.enclave.is_some());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "zoom": 0.5 }"#).unwrap();
        assert!(DeckConfig::from_json_file(&path).is_err());
    }

    #[test]
    fn anchor_must_be_a_member() {
        let config = DeckConfig {
            clusters: vec![Cluster::new("X and Y", &["X", "Y"], "Z")],
            ..DeckConfig::default()
        };
        assert!(config.validate().unwrap_err().to_string().contains("anchor"));
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        for config in [
            DeckConfig { zoom_out: -0.1, ..DeckConfig::default() },
            DeckConfig { zoom_out: f64::NAN, ..DeckConfig::default() },
            DeckConfig { dpi: 0, ..DeckConfig::default() },
            DeckConfig { jpeg_quality: 0, ..DeckConfig::default() },
            DeckConfig { areas: BTreeSet::new(), ..DeckConfig::default() },
        ] {
            assert!(config.validate().is_err(), "{config:?}");
        }
    }

    #[test]
    fn overlapping_special_cases_are_rejected() {
        let config = DeckConfig {
            clusters: vec![Cluster::new("Bulwer and Kooringal", &["Bulwer", "Kooringal"], "Bulwer")],
            ..DeckConfig::default()
        };
        assert!(config.validate().is_err());

        let config = DeckConfig {
            clusters: vec![
                Cluster::new("A and B", &["A", "B"], "A"),
                Cluster::new("B and C", &["B", "C"], "B"),
            ],
            ..DeckConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
