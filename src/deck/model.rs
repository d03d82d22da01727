use quick_xml::escape::{escape, partial_escape};
use serde::Serialize;

use crate::common::{sha1_hex, sha256_hex};
use super::record::FlashcardRecord;

/// Identifier of the deck; stable so re-imports update rather than duplicate it.
pub const DECK_ID: u64 = 1_884_931_520;
pub const DECK_NAME: &str = "Brisbane Suburbs";

/// Identifier of the note model shared by every card.
pub const MODEL_ID: u64 = 1_415_815_641;
pub const MODEL_NAME: &str = "Image-Suburb Card";

const FIELD_NAMES: [&str; 4] = ["Image", "Suburb", "LGA", "Fact"];

/// Index of the field the card browser sorts by and duplicate checks hash.
pub(crate) const SORT_FIELD: usize = 1;

const CARD_CSS: &str = ".card {\n font-family: arial;\n font-size: 20px;\n text-align: center;\n color: black;\n background-color: white;\n}\n";

#[derive(Debug, Clone, Serialize)]
pub(crate) struct FieldDef {
    name: &'static str,
    ord: usize,
    font: &'static str,
    size: u32,
    rtl: bool,
    sticky: bool,
    media: Vec<String>,
}

/// Front/back layout of a card.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct CardTemplate {
    name: &'static str,
    ord: usize,
    qfmt: &'static str,
    afmt: &'static str,
    bqfmt: &'static str,
    bafmt: &'static str,
    did: Option<u64>,
}

/// Note model in the JSON layout of a collection's `col.models` column.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NoteModel {
    #[serde(serialize_with = "serialize_id")]
    id: u64,
    name: &'static str,
    #[serde(rename = "type")]
    kind: u8,
    #[serde(rename = "mod")]
    modified: i64,
    usn: i64,
    sortf: usize,
    did: u64,
    flds: Vec<FieldDef>,
    tmpls: Vec<CardTemplate>,
    css: &'static str,
    latex_pre: &'static str,
    latex_post: &'static str,
    /// Template 0 needs the Image field.
    req: Vec<(usize, &'static str, Vec<usize>)>,
    tags: Vec<String>,
    vers: Vec<String>,
}

fn serialize_id<S: serde::Serializer>(id: &u64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&id.to_string())
}

impl NoteModel {
    /// Image on the front; suburb, LGA and the optional fact on the back.
    pub(crate) fn suburb(modified: i64) -> Self {
        Self {
            id: MODEL_ID,
            name: MODEL_NAME,
            kind: 0,
            modified,
            usn: -1,
            sortf: SORT_FIELD,
            did: DECK_ID,
            flds: FIELD_NAMES.iter().enumerate()
                .map(|(ord, &name)| FieldDef {
                    name, ord, font: "Arial", size: 20, rtl: false, sticky: false, media: Vec::new(),
                })
                .collect(),
            tmpls: vec![CardTemplate {
                name: "ImageSuburbCard",
                ord: 0,
                qfmt: "{{Image}}",
                afmt: concat!(
                    r#"{{FrontSide}}<hr id="answer" style="border:none;"/>"#,
                    r#"<div style="text-align:center; font-size: 2em;">{{Suburb}}</div>"#,
                    r#"<div style="text-align:center; font-size: 1em;">{{LGA}}</div>"#,
                    r#"{{#Fact}}<div style="text-align:center; font-size: 0.9em; font-style: italic;">{{Fact}}</div>{{/Fact}}"#,
                ),
                bqfmt: "",
                bafmt: "",
                did: None,
            }],
            css: CARD_CSS,
            latex_pre: "\\documentclass[12pt]{article}\n\\special{papersize=3in,5in}\n\\usepackage[utf8]{inputenc}\n\\usepackage{amssymb,amsmath}\n\\pagestyle{empty}\n\\setlength{\\parindent}{0in}\n\\begin{document}\n",
            latex_post: "\\end{document}",
            req: vec![(0, "all", vec![0])],
            tags: Vec::new(),
            vers: Vec::new(),
        }
    }
}

/// One note: its fields as stored, plus the plain-text sort field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Note {
    pub guid: String,
    /// Position among new cards; equal to the record's rank.
    pub due: u32,
    pub fields: Vec<String>,
    pub sort_field: String,
}

impl Note {
    /// Build the note for `record`, whose image is stored in the deck as `media_name`.
    pub(crate) fn from_record(record: &FlashcardRecord, media_name: &str) -> Self {
        let fields = vec![
            format!(r#"<img src="{}">"#, escape(media_name)),
            partial_escape(&record.display_name).into_owned(),
            partial_escape(&record.lga).into_owned(),
            record.auxiliary_text.as_deref().map(|fact| partial_escape(fact).into_owned()).unwrap_or_default(),
        ];
        Self {
            guid: guid_for(&fields),
            due: record.rank,
            sort_field: record.display_name.clone(),
            fields,
        }
    }

    /// Fields joined the way a collection stores them.
    #[inline] pub(crate) fn joined_fields(&self) -> String { self.fields.join("\u{1f}") }

    /// Duplicate-check checksum: first 8 hex digits of the SHA-1 of the sort field.
    pub(crate) fn checksum(&self) -> i64 {
        let digest = sha1_hex(self.sort_field.as_bytes());
        i64::from_str_radix(&digest[..8], 16).unwrap_or_default()
    }
}

/// Stable note id derived from the field contents.
pub(crate) fn guid_for(fields: &[String]) -> String {
    sha256_hex(fields.join("\u{1f}").as_bytes())[..10].to_string()
}
