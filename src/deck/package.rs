use std::{collections::{BTreeMap, BTreeSet}, io::Write, path::{Path, PathBuf}, time::{SystemTime, UNIX_EPOCH}};

use anyhow::{Context, Result, ensure};
use zip::{CompressionMethod, ZipWriter, write::SimpleFileOptions};

use crate::common::{PendingWrite, require_file_exists};
use super::{collection::write_collection, model::Note, record::FlashcardRecord};

/// Name of the SQLite collection inside a package.
const COLLECTION_ENTRY: &str = "collection.anki2";

/// What [`write_deck`] produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeckSummary {
    pub path: PathBuf,
    pub notes: usize,
    pub media: usize,
}

/// Write `records` as an Anki package at `path`: a `collection.anki2` with one new card per
/// record in ascending rank, each image stored as a numbered entry, and a `media` map from
/// those numbers to the file names the cards reference.
/// The package replaces `path` only once it is complete.
pub fn write_deck(records: &[FlashcardRecord], path: &Path) -> Result<DeckSummary> {
    let mut ordered: Vec<&FlashcardRecord> = records.iter().collect();
    ordered.sort_by(|a, b| a.rank.cmp(&b.rank).then_with(|| a.display_name.cmp(&b.display_name)));

    let mut media_names = BTreeSet::new();
    let mut notes = Vec::with_capacity(ordered.len());
    let mut media = Vec::with_capacity(ordered.len());
    for record in ordered {
        require_file_exists(&record.image_path)
            .with_context(|| format!("[deck] image for {:?} is missing", record.display_name))?;
        let media_name = record.image_path.file_name()
            .and_then(|name| name.to_str())
            .with_context(|| format!("[deck] image path {} has no usable file name", record.image_path.display()))?;
        ensure!(media_names.insert(media_name.to_string()),
            "[deck] two cards use an image named {media_name:?}; media names must be unique");

        notes.push(Note::from_record(record, media_name));
        media.push((media_name.to_string(), &record.image_path));
    }

    let scratch = tempfile::tempdir().context("[deck] Failed to create scratch directory")?;
    let collection_path = scratch.path().join(COLLECTION_ENTRY);
    write_collection(&collection_path, &notes, now_millis())?;
    let collection = std::fs::read(&collection_path)
        .with_context(|| format!("[deck] Failed to read back {}", collection_path.display()))?;

    let sink = PendingWrite::open(path)?;
    let mut zip = ZipWriter::new(sink);
    add_entry(&mut zip, COLLECTION_ENTRY, &collection, CompressionMethod::Deflated)?;

    // JPEG data does not compress further.
    let mut media_map = BTreeMap::new();
    for (idx, (name, source)) in media.iter().enumerate() {
        let bytes = std::fs::read(source)
            .with_context(|| format!("[deck] Failed to read image {}", source.display()))?;
        add_entry(&mut zip, &idx.to_string(), &bytes, CompressionMethod::Stored)?;
        media_map.insert(idx.to_string(), name.as_str());
    }
    add_entry(&mut zip, "media", &serde_json::to_vec(&media_map)?, CompressionMethod::Deflated)?;

    let sink = zip.finish()
        .with_context(|| format!("[deck] Failed to finish package {}", path.display()))?;
    sink.finalize()
        .with_context(|| format!("[deck] Failed to write {}", path.display()))?;

    log::info!("[deck] wrote {} ({} notes, {} media files)", path.display(), notes.len(), media.len());
    Ok(DeckSummary { path: path.to_path_buf(), notes: notes.len(), media: media.len() })
}

fn add_entry<W: Write + std::io::Seek>(
    zip: &mut ZipWriter<W>,
    name: &str,
    bytes: &[u8],
    method: CompressionMethod,
) -> Result<()> {
    zip.start_file(name, SimpleFileOptions::default().compression_method(method))
        .with_context(|| format!("[deck] Failed to add {name}"))?;
    zip.write_all(bytes)?;
    Ok(())
}

#[inline]
fn now_millis() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |elapsed| elapsed.as_millis() as i64)
}

#[cfg(test)]
mod tests {
    use std::{fs::File, io::Read};

    use rusqlite::Connection;
    use zip::ZipArchive;

    use super::*;
    use crate::deck::{DECK_ID, DECK_NAME};

    fn record(dir: &Path, name: &str, rank: u32) -> FlashcardRecord {
        let image_path = dir.join(format!("{name}.jpg"));
        std::fs::write(&image_path, format!("jpeg bytes for {name}")).unwrap();
        FlashcardRecord {
            image_path,
            display_name: name.into(),
            lga: "Brisbane City".into(),
            rank,
            auxiliary_text: None,
        }
    }

    fn read_entry(archive: &mut ZipArchive<File>, name: &str) -> Vec<u8> {
        let mut bytes = Vec::new();
        archive.by_name(name).unwrap().read_to_end(&mut bytes).unwrap();
        bytes
    }

    fn open_collection(archive: &mut ZipArchive<File>, dir: &Path) -> Connection {
        let path = dir.join("extracted.anki2");
        std::fs::write(&path, read_entry(archive, COLLECTION_ENTRY)).unwrap();
        Connection::open(path).unwrap()
    }

    #[test]
    fn notes_are_written_in_rank_order_with_media() {
        let dir = tempfile::tempdir().unwrap();
        let records = vec![
            record(dir.path(), "Toowong", 2),
            record(dir.path(), "Spring Hill", 0),
            record(dir.path(), "Paddington", 1),
        ];
        let deck = dir.path().join("out").join("deck.apkg");

        let summary = write_deck(&records, &deck).unwrap();
        assert_eq!(summary, DeckSummary { path: deck.clone(), notes: 3, media: 3 });

        let mut archive = ZipArchive::new(File::open(&deck).unwrap()).unwrap();
        let media: BTreeMap<String, String> = serde_json::from_slice(&read_entry(&mut archive, "media")).unwrap();
        assert_eq!(media["0"], "Spring Hill.jpg");
        assert_eq!(media["2"], "Toowong.jpg");
        assert_eq!(read_entry(&mut archive, "2"), b"jpeg bytes for Toowong");

        let conn = open_collection(&mut archive, dir.path());
        let mut stmt = conn.prepare(
            "SELECT n.flds, c.due FROM cards c JOIN notes n ON n.id = c.nid ORDER BY c.due",
        ).unwrap();
        let rows: Vec<(String, i64)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
            .unwrap()
            .collect::<rusqlite::Result<_>>()
            .unwrap();
        let suburbs: Vec<&str> = rows.iter().map(|(flds, _)| flds.split('\u{1f}').nth(1).unwrap()).collect();
        assert_eq!(suburbs, ["Spring Hill", "Paddington", "Toowong"]);
        assert_eq!(rows[2].1, 2);
        assert!(rows[0].0.starts_with(r#"<img src="Spring Hill.jpg">"#));

        let decks: String = conn.query_row("SELECT decks FROM col", [], |row| row.get(0)).unwrap();
        let decks: serde_json::Value = serde_json::from_str(&decks).unwrap();
        assert_eq!(decks[DECK_ID.to_string()]["name"], DECK_NAME);
    }

    #[test]
    fn missing_image_is_fatal_and_leaves_no_package() {
        let dir = tempfile::tempdir().unwrap();
        let mut records = vec![record(dir.path(), "Toowong", 0)];
        records.push(FlashcardRecord { image_path: dir.path().join("Ghost.jpg"), ..records[0].clone() });
        let deck = dir.path().join("deck.apkg");

        assert!(write_deck(&records, &deck).is_err());
        assert!(!deck.exists());
    }

    #[test]
    fn duplicate_media_names_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let other = dir.path().join("other");
        std::fs::create_dir(&other).unwrap();
        let records = vec![record(dir.path(), "Toowong", 0), record(&other, "Toowong", 1)];

        let err = write_deck(&records, &dir.path().join("deck.apkg")).unwrap_err();
        assert!(err.to_string().contains("unique"));
    }

    #[test]
    fn empty_deck_is_still_written() {
        let dir = tempfile::tempdir().unwrap();
        let deck = dir.path().join("deck.apkg");
        assert_eq!(write_deck(&[], &deck).unwrap().notes, 0);

        let mut archive = ZipArchive::new(File::open(&deck).unwrap()).unwrap();
        assert_eq!(read_entry(&mut archive, "media"), b"{}");
        let conn = open_collection(&mut archive, dir.path());
        let notes: i64 = conn.query_row("SELECT COUNT(*) FROM notes", [], |row| row.get(0)).unwrap();
        assert_eq!(notes, 0);
    }
}
