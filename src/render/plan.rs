use std::{collections::BTreeSet, fmt, path::{Path, PathBuf}};

use anyhow::{Context, Result, bail, ensure};
use geo::{BoundingRect, MultiPolygon};

use crate::{config::DeckConfig, geom::{Frame, PLANAR_CRS, union_bounds}, locality::Localities};

/// Output category of a rendered image; each maps to one directory under the output root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ImageCategory {
    /// One image per locality in the areas of interest.
    Localities,
    /// One image per cluster, all members drawn together.
    Clusters,
    /// One image per enclave micro-locality, framed by its enclosing locality.
    Enclaves,
}

impl ImageCategory {
    pub const ALL: [ImageCategory; 3] = [Self::Localities, Self::Clusters, Self::Enclaves];

    pub fn dir_name(self) -> &'static str {
        match self {
            Self::Localities => "localities",
            Self::Clusters => "combined_localities",
            Self::Enclaves => "enclave_localities",
        }
    }
}

impl fmt::Display for ImageCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.dir_name()) }
}

/// `<root>/<category>/<name>.jpg`. The file stem is the join key back to the locality or
/// cluster, so names that would not survive as a single path component are rejected.
pub fn image_path(root: &Path, category: ImageCategory, name: &str) -> Result<PathBuf> {
    ensure!(!name.trim().is_empty(), "[render] empty image name");
    ensure!(
        !name.contains(['/', '\\']) && name != "." && name != "..",
        "[render] {name:?} cannot be used as a file name",
    );
    Ok(root.join(category.dir_name()).join(format!("{name}.jpg")))
}

/// Everything needed to draw one image.
#[derive(Debug, Clone)]
pub struct RenderJob {
    pub category: ImageCategory,
    pub name: String,
    pub shapes: Vec<MultiPolygon<f64>>,
    pub frame: Frame,
}

impl RenderJob {
    #[inline]
    pub fn output_path(&self, root: &Path) -> Result<PathBuf> { image_path(root, self.category, &self.name) }
}

/// Plan every image: plain localities in the configured areas, one combined image per
/// cluster, and the enclave micro-localities. `planar` must be in the planar CRS.
pub fn plan_renders(planar: &Localities, config: &DeckConfig) -> Result<Vec<RenderJob>> {
    ensure!(planar.crs() == PLANAR_CRS,
        "[render] planning needs EPSG:{} geometry, got EPSG:{}", PLANAR_CRS.epsg(), planar.crs().epsg());

    let mut jobs = Vec::new();

    let shared = planar.shared_names(&config.areas);
    for locality in planar.in_areas(&config.areas) {
        let Some(stem) = locality.image_stem(&shared) else { continue };
        let bounds = locality.geometry().bounding_rect()
            .with_context(|| format!("[render] locality {stem:?} has empty geometry"))?;
        jobs.push(RenderJob {
            category: ImageCategory::Localities,
            name: stem,
            shapes: vec![locality.geometry().clone()],
            frame: Frame::around(bounds, config.zoom_out),
        });
    }

    for cluster in &config.clusters {
        let mut shapes = Vec::new();
        for member in &cluster.members {
            let before = shapes.len();
            shapes.extend(planar.in_areas(&config.areas)
                .filter(|locality| locality.name() == Some(member.as_str()))
                .map(|locality| locality.geometry().clone()));
            if shapes.len() == before {
                log::warn!("[render] cluster {:?}: member {member:?} not found in the areas of interest", cluster.label);
            }
        }
        if shapes.is_empty() {
            bail!("[render] cluster {:?} has no members in the areas of interest", cluster.label);
        }
        let bounds = union_bounds(&shapes)
            .with_context(|| format!("[render] cluster {:?} has empty geometry", cluster.label))?;
        jobs.push(RenderJob {
            category: ImageCategory::Clusters,
            name: cluster.label.clone(),
            frame: Frame::around(bounds, config.zoom_out),
            shapes,
        });
    }

    if let Some(enclave) = &config.enclave {
        let enclosing = planar.find_unique(&enclave.enclosing)
            .with_context(|| format!("[render] enclosing locality {:?}", enclave.enclosing))?;
        let bounds = enclosing.geometry().bounding_rect()
            .with_context(|| format!("[render] enclosing locality {:?} has empty geometry", enclave.enclosing))?;
        // Micro-localities are unreadable at their own scale: frame the whole enclosing locality.
        let frame = Frame::around(bounds, 0.0);

        for member in &enclave.members {
            let locality = planar.find_unique(member)
                .with_context(|| format!("[render] enclave member of {:?}", enclave.enclosing))?;
            jobs.push(RenderJob {
                category: ImageCategory::Enclaves,
                name: member.clone(),
                shapes: vec![locality.geometry().clone()],
                frame,
            });
        }
    }

    let mut targets = BTreeSet::new();
    for job in &jobs {
        ensure!(targets.insert((job.category, job.name.as_str())),
            "[render] more than one {} image would be named {:?}", job.category, job.name);
    }

    Ok(jobs)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use geo::{Coord, Rect, polygon};

    use crate::{config::{Cluster, Enclave}, locality::Locality};
    use super::*;

    fn square(name: &str, lga: &str, x: f64, y: f64, half: f64) -> Locality {
        Locality::new(Some(name.into()), Some(lga.into()), MultiPolygon(vec![polygon![
            (x: x - half, y: y - half), (x: x + half, y: y - half),
            (x: x + half, y: y + half), (x: x - half, y: y + half),
        ]]))
    }

    fn table() -> Localities {
        Localities::new(vec![
            square("X", "In", 0.0, 0.0, 100.0),
            square("Y", "In", 300.0, 0.0, 100.0),
            square("Z", "In", 0.0, 500.0, 50.0),
            square("Outside", "Out", 900.0, 900.0, 10.0),
            square("Island", "In", 5_000.0, 5_000.0, 2_000.0),
            square("Tiny A", "In", 4_000.0, 6_000.0, 5.0),
            square("Tiny B", "In", 6_500.0, 3_200.0, 8.0),
        ], PLANAR_CRS)
    }

    fn config() -> DeckConfig {
        DeckConfig {
            areas: BTreeSet::from(["In".to_string()]),
            zoom_out: 0.5,
            clusters: vec![Cluster::new("X and Y", &["X", "Y"], "X")],
            enclave: Some(Enclave {
                enclosing: "Island".into(),
                members: BTreeSet::from(["Tiny A".to_string(), "Tiny B".to_string()]),
            }),
            ..DeckConfig::default()
        }
    }

    fn jobs_in(jobs: &[RenderJob], category: ImageCategory) -> Vec<&RenderJob> {
        jobs.iter().filter(|job| job.category == category).collect()
    }

    #[test]
    fn plain_images_cover_every_locality_in_the_areas() {
        let jobs = plan_renders(&table(), &config()).unwrap();
        let names: Vec<_> = jobs_in(&jobs, ImageCategory::Localities).iter().map(|j| j.name.as_str()).collect();
        assert_eq!(names, ["X", "Y", "Z", "Island", "Tiny A", "Tiny B"]);

        let z = jobs.iter().find(|j| j.name == "Z").unwrap();
        // 100 m square padded by 50% each side -> 200 m wide.
        assert!((z.frame.half_extent() - 100.0).abs() < 1e-9);
        assert_eq!(z.frame.center(), Coord { x: 0.0, y: 500.0 });
    }

    #[test]
    fn clusters_are_framed_around_all_members() {
        let jobs = plan_renders(&table(), &config()).unwrap();
        let clusters = jobs_in(&jobs, ImageCategory::Clusters);
        assert_eq!(clusters.len(), 1);

        let cluster = clusters[0];
        assert_eq!(cluster.name, "X and Y");
        assert_eq!(cluster.shapes.len(), 2);
        let expected = Frame::around(Rect::new(Coord { x: -100.0, y: -100.0 }, Coord { x: 400.0, y: 100.0 }), 0.5);
        assert_eq!(cluster.frame, expected);
    }

    #[test]
    fn enclave_members_share_the_enclosing_frame() {
        let jobs = plan_renders(&table(), &config()).unwrap();
        let enclaves = jobs_in(&jobs, ImageCategory::Enclaves);
        assert_eq!(enclaves.len(), 2);

        let island = Rect::new(Coord { x: 3_000.0, y: 3_000.0 }, Coord { x: 7_000.0, y: 7_000.0 });
        for job in enclaves {
            assert!((job.frame.half_extent() - 2_000.0).abs() < 1e-9, "{}", job.name);
            assert_eq!(job.frame, Frame::around(island, 0.0));
            // Not the member's own extent.
            let own = job.shapes[0].bounding_rect().unwrap();
            assert!(job.frame.half_extent() > own.width());
        }
    }

    #[test]
    fn shared_names_render_to_separate_files() {
        let mut rows = table().rows().to_vec();
        rows.push(square("Z", "Also", 5_000.0, 500.0, 50.0));
        let table = Localities::new(rows, PLANAR_CRS);
        let config = DeckConfig { areas: BTreeSet::from(["In".to_string(), "Also".to_string()]), ..config() };

        let jobs = plan_renders(&table, &config).unwrap();
        let plain = jobs_in(&jobs, ImageCategory::Localities);
        let z: Vec<_> = plain.iter().filter(|job| job.name.starts_with('Z')).collect();
        assert_eq!(z.len(), 2);
        assert_eq!(z[0].name, "Z (In)");
        assert_eq!(z[1].name, "Z (Also)");
        assert_ne!(z[0].frame, z[1].frame);

        let root = Path::new("out");
        assert_ne!(z[0].output_path(root).unwrap(), z[1].output_path(root).unwrap());
    }

    #[test]
    fn same_name_twice_in_one_lga_is_an_error() {
        let mut rows = table().rows().to_vec();
        rows.push(square("Z", "In", 5_000.0, 500.0, 50.0));
        let table = Localities::new(rows, PLANAR_CRS);
        let err = plan_renders(&table, &config()).unwrap_err();
        assert!(err.to_string().contains("more than one"));
    }

    #[test]
    fn cluster_without_members_is_an_error() {
        let config = DeckConfig {
            clusters: vec![Cluster::new("P and Q", &["P", "Q"], "P")],
            ..config()
        };
        assert!(plan_renders(&table(), &config).is_err());
    }

    #[test]
    fn missing_enclave_member_is_an_error() {
        let mut config = config();
        config.enclave.as_mut().unwrap().members.insert("Tiny C".into());
        assert!(plan_renders(&table(), &config).is_err());
    }

    #[test]
    fn geographic_tables_are_rejected() {
        let table = Localities::new(vec![], crate::geom::SOURCE_CRS);
        assert!(plan_renders(&table, &config()).is_err());
    }

    #[test]
    fn image_paths_reject_separators() {
        let root = Path::new("out");
        assert_eq!(
            image_path(root, ImageCategory::Clusters, "X and Y").unwrap(),
            Path::new("out/combined_localities/X and Y.jpg"),
        );
        assert!(image_path(root, ImageCategory::Localities, "a/b").is_err());
        assert!(image_path(root, ImageCategory::Localities, "..").is_err());
        assert!(image_path(root, ImageCategory::Localities, " ").is_err());
    }
}
