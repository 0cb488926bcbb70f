//! Durable resume state on top of a string-keyed store.
//!
//! The store itself is a host concern; [`KeyValueStore`] is the seam. Two
//! implementations ship with the crate: [`MemoryStore`] and
//! [`JsonFileStore`], which rewrites a JSON file atomically (temp file +
//! rename) on every change.
//!
//! Key layout:
//!
//! | Key | Value |
//! |-----|-------|
//! | `last_audiobook_id` | id of the most recently played book |
//! | `last_chapter` / `last_position` | its chapter index and offset |
//! | `chapter_{id}` / `position_{id}` | per-book chapter index and offset |

use crate::error::{Result, TimelineError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::warn;

const LAST_AUDIOBOOK_ID: &str = "last_audiobook_id";
const LAST_CHAPTER: &str = "last_chapter";
const LAST_POSITION: &str = "last_position";

/// A primitive value held by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredValue {
    Int(i64),
    Str(String),
    Bool(bool),
    Float(f64),
}

impl StoredValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }
}

/// A durable map of string keys to primitive values.
///
/// Writes to one key are applied in call order; nothing is transactional
/// across keys.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<StoredValue>>;
    fn set(&self, key: &str, value: StoredValue) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    fn get(&self, key: &str) -> Result<Option<StoredValue>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: StoredValue) -> Result<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        (**self).remove(key)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| TimelineError::Persistence("store lock poisoned".into()))
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<BTreeMap<String, StoredValue>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.lock().map(|v| v.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<StoredValue>> {
        Ok(lock(&self.values)?.get(key).cloned())
    }

    fn set(&self, key: &str, value: StoredValue) -> Result<()> {
        lock(&self.values)?.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        lock(&self.values)?.remove(key);
        Ok(())
    }
}

/// Store persisted as a single JSON object.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    values: Mutex<BTreeMap<String, StoredValue>>,
}

impl JsonFileStore {
    /// Open the store at `path`.
    ///
    /// A missing file starts empty. An unreadable or corrupt file is logged,
    /// discarded, and also starts empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "discarding corrupt store");
                BTreeMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot read store");
                BTreeMap::new()
            }
        };
        Self {
            path,
            values: Mutex::new(values),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, values: &BTreeMap<String, StoredValue>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_vec_pretty(values)?;

        let temp_path = self.path.with_extension("json.tmp");
        {
            let mut file = fs::File::create(&temp_path)?;
            file.write_all(&content)?;
            file.sync_all()?;
        }
        fs::rename(&temp_path, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<StoredValue>> {
        Ok(lock(&self.values)?.get(key).cloned())
    }

    fn set(&self, key: &str, value: StoredValue) -> Result<()> {
        let mut values = lock(&self.values)?;
        values.insert(key.to_string(), value);
        self.flush(&values)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut values = lock(&self.values)?;
        if values.remove(key).is_some() {
            self.flush(&values)?;
        }
        Ok(())
    }
}

/// Where playback of a book should resume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeState {
    pub audiobook_id: String,
    pub chapter_index: u32,
    /// Offset into the chapter.
    pub position_ms: u64,
}

/// Reads and writes [`ResumeState`] records.
#[derive(Debug, Clone)]
pub struct ResumeStore<S> {
    store: S,
}

impl<S: KeyValueStore> ResumeStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn chapter_key(id: &str) -> String {
        format!("chapter_{}", id)
    }

    fn position_key(id: &str) -> String {
        format!("position_{}", id)
    }

    fn get_int(&self, key: &str) -> Result<Option<i64>> {
        Ok(self.store.get(key)?.and_then(|v| v.as_int()))
    }

    fn read_pair(&self, chapter_key: &str, position_key: &str) -> Result<(u32, u64)> {
        let chapter = self.get_int(chapter_key)?.unwrap_or(0);
        let position = self.get_int(position_key)?.unwrap_or(0);
        Ok((
            u32::try_from(chapter).unwrap_or(0),
            u64::try_from(position).unwrap_or(0),
        ))
    }

    /// Write the per-book record and mirror it as the global last-played one.
    pub fn save(&self, state: &ResumeState) -> Result<()> {
        let chapter = StoredValue::Int(i64::from(state.chapter_index));
        let position = StoredValue::Int(i64::try_from(state.position_ms).unwrap_or(i64::MAX));

        self.store
            .set(LAST_AUDIOBOOK_ID, StoredValue::Str(state.audiobook_id.clone()))?;
        self.store.set(LAST_CHAPTER, chapter.clone())?;
        self.store.set(LAST_POSITION, position.clone())?;
        self.store.set(&Self::chapter_key(&state.audiobook_id), chapter)?;
        self.store.set(&Self::position_key(&state.audiobook_id), position)?;
        Ok(())
    }

    /// Saved state for one book; a book never played resumes at the start.
    pub fn book_progress(&self, audiobook_id: &str) -> Result<ResumeState> {
        let (chapter_index, position_ms) = self.read_pair(
            &Self::chapter_key(audiobook_id),
            &Self::position_key(audiobook_id),
        )?;
        Ok(ResumeState {
            audiobook_id: audiobook_id.to_string(),
            chapter_index,
            position_ms,
        })
    }

    /// The global last-played record, if any book was ever played.
    pub fn last_played(&self) -> Result<Option<ResumeState>> {
        let Some(id) = self
            .store
            .get(LAST_AUDIOBOOK_ID)?
            .and_then(|v| v.as_str().map(str::to_string))
        else {
            return Ok(None);
        };
        let (chapter_index, position_ms) = self.read_pair(LAST_CHAPTER, LAST_POSITION)?;
        Ok(Some(ResumeState {
            audiobook_id: id,
            chapter_index,
            position_ms,
        }))
    }

    /// Forget a book's record, and the global one if it points at the book.
    pub fn invalidate(&self, audiobook_id: &str) -> Result<()> {
        self.store.remove(&Self::chapter_key(audiobook_id))?;
        self.store.remove(&Self::position_key(audiobook_id))?;

        let is_last = self
            .store
            .get(LAST_AUDIOBOOK_ID)?
            .is_some_and(|v| v.as_str() == Some(audiobook_id));
        if is_last {
            self.store.remove(LAST_AUDIOBOOK_ID)?;
            self.store.remove(LAST_CHAPTER)?;
            self.store.remove(LAST_POSITION)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(id: &str, chapter_index: u32, position_ms: u64) -> ResumeState {
        ResumeState {
            audiobook_id: id.into(),
            chapter_index,
            position_ms,
        }
    }

    #[test]
    fn test_save_writes_book_and_global_records() {
        let resume = ResumeStore::new(MemoryStore::new());
        resume.save(&state("dune", 1, 700)).unwrap();
        resume.save(&state("emma", 4, 12)).unwrap();

        assert_eq!(resume.book_progress("dune").unwrap(), state("dune", 1, 700));
        assert_eq!(resume.last_played().unwrap(), Some(state("emma", 4, 12)));
        assert_eq!(resume.store().len(), 7);
    }

    #[test]
    fn test_unknown_book_starts_at_zero() {
        let resume = ResumeStore::new(MemoryStore::new());
        assert_eq!(resume.book_progress("new").unwrap(), state("new", 0, 0));
        assert_eq!(resume.last_played().unwrap(), None);
    }

    #[test]
    fn test_invalidate_clears_global_only_for_same_book() {
        let resume = ResumeStore::new(MemoryStore::new());
        resume.save(&state("a", 2, 50)).unwrap();
        resume.save(&state("b", 3, 60)).unwrap();

        resume.invalidate("a").unwrap();
        assert_eq!(resume.book_progress("a").unwrap(), state("a", 0, 0));
        assert_eq!(resume.last_played().unwrap(), Some(state("b", 3, 60)));

        resume.invalidate("b").unwrap();
        assert_eq!(resume.last_played().unwrap(), None);
        assert!(resume.store().is_empty());
    }

    #[test]
    fn test_wrong_value_types_read_as_defaults() {
        let store = MemoryStore::new();
        store.set("chapter_x", StoredValue::Str("nope".into())).unwrap();
        store.set("position_x", StoredValue::Int(-5)).unwrap();
        let resume = ResumeStore::new(store);
        assert_eq!(resume.book_progress("x").unwrap(), state("x", 0, 0));
    }

    #[test]
    fn test_json_store_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("resume.json");

        {
            let resume = ResumeStore::new(JsonFileStore::open(&path));
            resume.save(&state("dune", 5, 123_456)).unwrap();
        }
        assert!(path.exists());

        let reopened = ResumeStore::new(JsonFileStore::open(&path));
        assert_eq!(reopened.last_played().unwrap(), Some(state("dune", 5, 123_456)));
    }

    #[test]
    fn test_json_store_discards_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resume.json");
        fs::write(&path, b"{not json").unwrap();

        let store = JsonFileStore::open(&path);
        assert_eq!(store.get("anything").unwrap(), None);
        store.set("k", StoredValue::Bool(true)).unwrap();
        assert_eq!(JsonFileStore::open(&path).get("k").unwrap(), Some(StoredValue::Bool(true)));
    }

    #[test]
    fn test_shared_store_through_arc() {
        let shared = Arc::new(MemoryStore::new());
        let resume = ResumeStore::new(Arc::clone(&shared));
        resume.save(&state("a", 1, 2)).unwrap();
        assert_eq!(
            shared.get("last_audiobook_id").unwrap(),
            Some(StoredValue::Str("a".into()))
        );
    }
}
