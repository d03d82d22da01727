use std::{collections::BTreeMap, path::Path};

use anyhow::{Context, Result};
use walkdir::WalkDir;

use crate::{config::DeckConfig, rank::{RankedLocality, Ranking}, render::ImageCategory};
use super::record::{Assembly, FlashcardRecord, ImageRef, JoinFailure};

/// List the `.jpg` images under each category directory of `root`, sorted by category then name.
/// Missing category directories are skipped.
pub fn scan_images(root: &Path) -> Result<Vec<ImageRef>> {
    let mut images = Vec::new();

    for category in ImageCategory::ALL {
        let dir = root.join(category.dir_name());
        if !dir.is_dir() {
            log::debug!("[deck] no {} directory under {}", category, root.display());
            continue;
        }

        for entry in WalkDir::new(&dir).min_depth(1).max_depth(1) {
            let entry = entry.with_context(|| format!("[deck] Failed to list {}", dir.display()))?;
            let path = entry.path();
            let is_jpg = path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("jpg"));
            if !entry.file_type().is_file() || !is_jpg { continue }

            let Some(name) = path.file_stem().and_then(|stem| stem.to_str()) else {
                log::warn!("[deck] skipping non-UTF-8 file name {}", path.display());
                continue;
            };
            images.push(ImageRef { category, name: name.to_string(), path: path.to_path_buf() });
        }
    }

    images.sort();
    Ok(images)
}

/// Join images to ranks by file stem.
///
/// - `localities/` images use their own rank, except cluster and enclave members, whose
///   plain images are archival only and never become cards.
/// - `combined_localities/` images are cluster labels and take the anchor's rank.
/// - `enclave_localities/` images are enclave members and use their own rank.
///
/// Images that cannot be joined are reported in [`Assembly::skipped`].
pub fn assemble_cards(
    images: &[ImageRef],
    ranking: &Ranking,
    config: &DeckConfig,
    auxiliary: &BTreeMap<String, String>,
) -> Assembly {
    let mut assembly = Assembly::default();

    for image in images {
        let joined: Result<(String, &RankedLocality), String> = match image.category {
            ImageCategory::Localities => match ranking.by_stem(&image.name) {
                Some(entry) if config.is_cluster_member(&entry.name) || config.is_enclave_member(&entry.name) => {
                    log::debug!("[deck] {} is carded through a special case; plain image kept as archive", image.name);
                    continue;
                }
                Some(entry) => Ok((entry.name.clone(), entry)),
                None => Err(format!("{:?} has no rank", image.name)),
            },
            ImageCategory::Clusters => match config.cluster(&image.name) {
                Some(cluster) => ranking.get(&cluster.anchor)
                    .map(|entry| (cluster.label.clone(), entry))
                    .ok_or_else(|| format!("cluster anchor {:?} has no rank", cluster.anchor)),
                None => Err(format!("{:?} is not a configured cluster", image.name)),
            },
            ImageCategory::Enclaves => if config.is_enclave_member(&image.name) {
                ranking.get(&image.name)
                    .map(|entry| (image.name.clone(), entry))
                    .ok_or_else(|| format!("{:?} has no rank", image.name))
            } else {
                Err(format!("{:?} is not a configured enclave member", image.name))
            },
        };

        match joined {
            Ok((display_name, entry)) => assembly.records.push(FlashcardRecord {
                image_path: image.path.clone(),
                auxiliary_text: auxiliary.get(&display_name).cloned(),
                display_name,
                lga: entry.lga.clone(),
                rank: entry.rank,
            }),
            Err(reason) => {
                log::warn!("[deck] excluding {}: {reason}", image.path.display());
                assembly.skipped.push(JoinFailure { image: image.clone(), reason });
            }
        }
    }

    assembly.records.sort_by(|a, b| a.rank.cmp(&b.rank).then_with(|| a.display_name.cmp(&b.display_name)));
    assembly
}
