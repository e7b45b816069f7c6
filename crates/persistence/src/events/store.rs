//! Append-only audit writer

use super::{day_file, day_files, event_number};
use crate::error::{PersistenceError, PersistenceResult};
use chrono::NaiveDate;
use payroll_core::AuditEvent;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

/// Audit event store.
///
/// Each event goes to the file of the day of its own timestamp, so a
/// long-running process crossing midnight starts a new file. Ids continue
/// from the highest `EVT_` number found on disk.
pub struct EventStore {
    base_path: PathBuf,
    next_id: AtomicU64,
    open_day: Mutex<Option<DayWriter>>,
}

struct DayWriter {
    day: NaiveDate,
    out: BufWriter<File>,
}

impl EventStore {
    pub fn new<P: AsRef<Path>>(base_path: P) -> PersistenceResult<Self> {
        let base_path = base_path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path)?;

        let last_id = highest_event_number(&base_path)?;

        Ok(Self {
            base_path,
            next_id: AtomicU64::new(last_id + 1),
            open_day: Mutex::new(None),
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn writer(&self) -> PersistenceResult<MutexGuard<'_, Option<DayWriter>>> {
        self.open_day
            .lock()
            .map_err(|_| PersistenceError::Other("audit writer lock poisoned".to_string()))
    }

    pub fn next_event_id(&self) -> String {
        AuditEvent::generate_id(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    /// Append one event, assigning an id if it has none. Returns the stored event.
    pub fn append(&self, mut event: AuditEvent) -> PersistenceResult<AuditEvent> {
        if event.event_id.is_empty() {
            event.event_id = self.next_event_id();
        }
        let line = event.to_json()?;
        let day = event.timestamp.date_naive();

        let mut guard = self.writer()?;
        let writer = match guard.take() {
            Some(open) if open.day == day => open,
            stale => {
                if let Some(mut stale) = stale {
                    stale.out.flush()?;
                }
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(day_file(&self.base_path, day))?;
                DayWriter {
                    day,
                    out: BufWriter::new(file),
                }
            }
        };
        let writer = guard.insert(writer);

        writeln!(writer.out, "{}", line)?;
        writer.out.flush()?;

        Ok(event)
    }

    pub fn append_batch(&self, events: Vec<AuditEvent>) -> PersistenceResult<Vec<AuditEvent>> {
        events.into_iter().map(|e| self.append(e)).collect()
    }

    /// Day files of this store, oldest first
    pub fn list_files(&self) -> PersistenceResult<Vec<PathBuf>> {
        Ok(day_files(&self.base_path)?)
    }

    pub fn flush(&self) -> PersistenceResult<()> {
        if let Some(open) = self.writer()?.as_mut() {
            open.out.flush()?;
        }
        Ok(())
    }
}

impl Drop for EventStore {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

/// Highest event number on disk; lines that do not parse are ignored
fn highest_event_number(base_path: &Path) -> PersistenceResult<u64> {
    let mut highest = 0;
    for path in day_files(base_path)? {
        for line in BufReader::new(File::open(&path)?).lines() {
            let line = line?;
            let Ok(event) = serde_json::from_str::<AuditEvent>(&line) else {
                continue;
            };
            if let Some(n) = event_number(&event.event_id) {
                highest = highest.max(n);
            }
        }
    }
    Ok(highest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use payroll_core::AuditAction;
    use tempfile::tempdir;
    use uuid::Uuid;

    fn event(action: AuditAction) -> AuditEvent {
        AuditEvent::new(action, "admin", Uuid::new_v4()).with_company(1)
    }

    #[test]
    fn test_event_store_append() {
        let dir = tempdir().unwrap();
        let store = EventStore::new(dir.path()).unwrap();

        let stored = store.append(event(AuditAction::BatchExported)).unwrap();
        assert_eq!(stored.event_id, "EVT_000001");

        let files = store.list_files().unwrap();
        assert_eq!(files.len(), 1);

        let content = fs::read_to_string(&files[0]).unwrap();
        assert!(content.contains("EVT_000001"));
        assert!(content.contains("batch_exported"));
    }

    #[test]
    fn test_events_go_to_the_day_of_their_timestamp() {
        let dir = tempdir().unwrap();
        let store = EventStore::new(dir.path()).unwrap();

        let mut late = event(AuditAction::SalaryUploaded);
        late.timestamp = Utc.with_ymd_and_hms(2026, 3, 31, 23, 59, 0).unwrap();
        let mut early = event(AuditAction::BatchFinalized);
        early.timestamp = Utc.with_ymd_and_hms(2026, 4, 1, 0, 1, 0).unwrap();
        store.append_batch(vec![late, early]).unwrap();

        let names: Vec<String> = store
            .list_files()
            .unwrap()
            .iter()
            .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .collect();
        assert_eq!(names, vec!["2026-03-31.jsonl", "2026-04-01.jsonl"]);
    }

    #[test]
    fn test_event_store_counter() {
        let dir = tempdir().unwrap();
        let store = EventStore::new(dir.path()).unwrap();

        assert_eq!(store.next_event_id(), "EVT_000001");
        assert_eq!(store.next_event_id(), "EVT_000002");
    }

    #[test]
    fn test_event_store_reload_counter() {
        let dir = tempdir().unwrap();

        {
            let store = EventStore::new(dir.path()).unwrap();
            store
                .append_batch(vec![
                    event(AuditAction::SalaryUploaded),
                    event(AuditAction::BatchFinalized),
                ])
                .unwrap();
        }
        fs::write(dir.path().join("junk.jsonl"), "not json\n").unwrap();

        let store = EventStore::new(dir.path()).unwrap();
        assert_eq!(store.next_event_id(), "EVT_000003");
    }
}
