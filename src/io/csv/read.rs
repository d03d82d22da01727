//! CSV reading operations.

use std::{collections::BTreeMap, fs::File, path::Path};

use anyhow::{Context, Result, ensure};
use polars::{frame::DataFrame, io::SerReader, prelude::{CsvReadOptions, DataType}};

/// Column holding the card name (image base name) in an auxiliary text file.
pub(crate) const NAME_COLUMN: &str = "name";

/// Column holding the auxiliary text in an auxiliary text file.
pub(crate) const TEXT_COLUMN: &str = "fact";

/// Reads a comma-separated file with a header row, every column as a string.
pub(crate) fn read_string_csv(path: &Path) -> Result<DataFrame> {
    let file = File::open(path)
        .with_context(|| format!("[io::csv::read] Failed to open CSV file: {}", path.display()))?;
    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .into_reader_with_file_handle(file)
        .finish()
        .with_context(|| format!("[io::csv::read] Failed to read CSV from {:?}", path))
}

/// Extract a name -> text mapping from a DataFrame with `name` and `fact` columns.
/// Rows with an empty or null name or text are skipped; the first row for a name wins.
pub(crate) fn read_auxiliary_text(df: &DataFrame) -> Result<BTreeMap<String, String>> {
    let columns = df.get_column_names();
    ensure!(
        columns.iter().any(|c| c.as_str() == NAME_COLUMN) && columns.iter().any(|c| c.as_str() == TEXT_COLUMN),
        "[io::csv::read] CSV must have columns: {NAME_COLUMN},{TEXT_COLUMN} (found {:?})",
        columns,
    );

    let names = df.column(NAME_COLUMN)?.cast(&DataType::String)?;
    let texts = df.column(TEXT_COLUMN)?.cast(&DataType::String)?;

    let mut out = BTreeMap::new();
    for (name, text) in names.str()?.into_iter().zip(texts.str()?.into_iter()) {
        let (Some(name), Some(text)) = (name, text) else { continue };
        let (name, text) = (name.trim(), text.trim());
        if name.is_empty() || text.is_empty() { continue }
        out.entry(name.to_string()).or_insert_with(|| text.to_string());
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_facts_keyed_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("facts.csv");
        std::fs::write(&path, "name,fact,extra\n\
            Spring Hill,Home of the Windmill,1\n\
            Kenmore and Kenmore Hills,\"Leafy, hilly\",2\n\
            Spring Hill,Ignored duplicate,3\n\
            Bowen Hills,,4\n").unwrap();

        let df = read_string_csv(&path).unwrap();
        let facts = read_auxiliary_text(&df).unwrap();

        assert_eq!(facts.len(), 2);
        assert_eq!(facts["Spring Hill"], "Home of the Windmill");
        assert_eq!(facts["Kenmore and Kenmore Hills"], "Leafy, hilly");
        assert!(!facts.contains_key("Bowen Hills"));
    }

    #[test]
    fn missing_columns_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("facts.csv");
        std::fs::write(&path, "suburb,text\nA,B\n").unwrap();

        let df = read_string_csv(&path).unwrap();
        assert!(read_auxiliary_text(&df).is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(read_string_csv(Path::new("/no/such/facts.csv")).is_err());
    }
}
