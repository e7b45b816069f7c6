//! Audit event log
//!
//! Append and read audit events in JSONL files, one file per UTC day
//! (`2026-03-25.jsonl`), named after the event timestamp.

pub mod replay;
pub mod store;

pub use replay::{EventFilter, EventReader};
pub use store::EventStore;

use chrono::NaiveDate;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const DAY_FORMAT: &str = "%Y-%m-%d";

fn day_file(base: &Path, day: NaiveDate) -> PathBuf {
    base.join(format!("{}.jsonl", day.format(DAY_FORMAT)))
}

/// Day files under `base`, oldest first. A missing directory has none.
fn day_files(base: &Path) -> io::Result<Vec<PathBuf>> {
    if !base.exists() {
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in fs::read_dir(base)? {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "jsonl") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Numeric part of an `EVT_000042` id
fn event_number(event_id: &str) -> Option<u64> {
    event_id.strip_prefix("EVT_")?.parse().ok()
}
