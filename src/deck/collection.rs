//! The SQLite collection (`collection.anki2`) inside a deck package.

use std::{collections::BTreeMap, path::Path};

use anyhow::{Context, Result};
use rusqlite::{Connection, params};
use serde_json::json;

use super::model::{DECK_ID, DECK_NAME, MODEL_ID, Note, NoteModel};

/// Collection schema version 11, as read by every Anki release that imports `.apkg` files.
const SCHEMA: &str = "
CREATE TABLE col (
    id integer primary key, crt integer not null, mod integer not null, scm integer not null,
    ver integer not null, dty integer not null, usn integer not null, ls integer not null,
    conf text not null, models text not null, decks text not null, dconf text not null, tags text not null
);
CREATE TABLE notes (
    id integer primary key, guid text not null, mid integer not null, mod integer not null,
    usn integer not null, tags text not null, flds text not null, sfld integer not null,
    csum integer not null, flags integer not null, data text not null
);
CREATE TABLE cards (
    id integer primary key, nid integer not null, did integer not null, ord integer not null,
    mod integer not null, usn integer not null, type integer not null, queue integer not null,
    due integer not null, ivl integer not null, factor integer not null, reps integer not null,
    lapses integer not null, left integer not null, odue integer not null, odid integer not null,
    flags integer not null, data text not null
);
CREATE TABLE revlog (
    id integer primary key, cid integer not null, usn integer not null, ease integer not null,
    ivl integer not null, lastIvl integer not null, factor integer not null, time integer not null,
    type integer not null
);
CREATE TABLE graves (usn integer not null, oid integer not null, type integer not null);
CREATE INDEX ix_notes_usn on notes (usn);
CREATE INDEX ix_cards_usn on cards (usn);
CREATE INDEX ix_revlog_usn on revlog (usn);
CREATE INDEX ix_cards_nid on cards (nid);
CREATE INDEX ix_cards_sched on cards (did, queue, due);
CREATE INDEX ix_revlog_cid on revlog (cid);
CREATE INDEX ix_notes_csum on notes (csum);
";

/// Write a collection holding `notes` (one new card each, in the given order) to `path`.
/// `now_ms` seeds the note and card ids and the modification times.
pub(crate) fn write_collection(path: &Path, notes: &[Note], now_ms: i64) -> Result<()> {
    let now_s = now_ms / 1000;
    let mut conn = Connection::open(path)
        .with_context(|| format!("[deck::collection] Failed to create {}", path.display()))?;
    conn.execute_batch(SCHEMA).context("[deck::collection] Failed to create schema")?;

    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO col VALUES (1, ?1, ?2, ?2, 11, 0, 0, 0, ?3, ?4, ?5, ?6, '{}')",
        params![
            now_s,
            now_ms,
            collection_conf().to_string(),
            serde_json::to_string(&BTreeMap::from([(MODEL_ID.to_string(), NoteModel::suburb(now_s))]))?,
            decks(now_s).to_string(),
            deck_options().to_string(),
        ],
    ).context("[deck::collection] Failed to write collection row")?;

    let card_base = now_ms + notes.len() as i64;
    for (idx, note) in notes.iter().enumerate() {
        let note_id = now_ms + idx as i64;
        tx.execute(
            "INSERT INTO notes VALUES (?1, ?2, ?3, ?4, -1, '', ?5, ?6, ?7, 0, '')",
            params![note_id, note.guid, MODEL_ID as i64, now_s, note.joined_fields(), note.sort_field, note.checksum()],
        ).with_context(|| format!("[deck::collection] Failed to write note {:?}", note.sort_field))?;
        // New card: type 0, queue 0, introduced in `due` order.
        tx.execute(
            "INSERT INTO cards VALUES (?1, ?2, ?3, 0, ?4, -1, 0, 0, ?5, 0, 0, 0, 0, 0, 0, 0, 0, '')",
            params![card_base + idx as i64, note_id, DECK_ID as i64, now_s, note.due],
        ).with_context(|| format!("[deck::collection] Failed to write card {:?}", note.sort_field))?;
    }
    tx.commit().context("[deck::collection] Failed to commit")?;

    conn.close()
        .map_err(|(_, err)| err)
        .with_context(|| format!("[deck::collection] Failed to close {}", path.display()))
}

/// Collection-wide settings; new cards come in `due` order.
fn collection_conf() -> serde_json::Value {
    json!({
        "activeDecks": [DECK_ID],
        "curDeck": DECK_ID,
        "newSpread": 0,
        "collapseTime": 1200,
        "timeLim": 0,
        "estTimes": true,
        "dueCounts": true,
        "curModel": MODEL_ID.to_string(),
        "nextPos": 1,
        "sortType": "noteFld",
        "sortBackwards": false,
        "addToCur": true,
    })
}

fn decks(modified: i64) -> serde_json::Value {
    let deck = |id: u64, name: &str| json!({
        "id": id,
        "name": name,
        "mod": modified,
        "usn": -1,
        "desc": "",
        "dyn": 0,
        "conf": 1,
        "collapsed": false,
        "newToday": [0, 0],
        "revToday": [0, 0],
        "lrnToday": [0, 0],
        "timeToday": [0, 0],
        "extendNew": 10,
        "extendRev": 50,
    });
    json!({
        "1": deck(1, "Default"),
        DECK_ID.to_string(): deck(DECK_ID, DECK_NAME),
    })
}

/// The default options group both decks point at.
fn deck_options() -> serde_json::Value {
    json!({
        "1": {
            "id": 1,
            "name": "Default",
            "mod": 0,
            "usn": 0,
            "maxTaken": 60,
            "autoplay": true,
            "timer": 0,
            "replayq": true,
            "dyn": false,
            "new": {
                "bury": true,
                "delays": [1, 10],
                "initialFactor": 2500,
                "ints": [1, 4, 7],
                "order": 1,
                "perDay": 20,
                "separate": true,
            },
            "rev": {
                "bury": true,
                "ease4": 1.3,
                "fuzz": 0.05,
                "ivlFct": 1,
                "maxIvl": 36500,
                "minSpace": 1,
                "perDay": 100,
            },
            "lapse": {
                "delays": [10],
                "leechAction": 0,
                "leechFails": 8,
                "minInt": 1,
                "mult": 0,
            },
        }
    })
}
