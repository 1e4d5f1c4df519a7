use std::{
    collections::BTreeMap,
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use log::warn;
use serde::{Deserialize, Serialize};

use crate::config::HIGH_SCORE_KEY;
use crate::error::StoreError;

/// String key/value storage with per-entry expiry.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for &mut S {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        (**self).set(key, value, ttl)
    }
}

pub fn load_high_score<S: KeyValueStore + ?Sized>(store: &S) -> u32 {
    store
        .get(HIGH_SCORE_KEY)
        .and_then(|raw| raw.trim().parse().ok())
        .unwrap_or(0)
}

pub fn save_high_score<S: KeyValueStore + ?Sized>(
    store: &mut S,
    score: u32,
    ttl: Duration,
) -> Result<(), StoreError> {
    store.set(HIGH_SCORE_KEY, &score.to_string(), ttl)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Entry {
    value: String,
    /// Unix seconds.
    expires_at: u64,
}

/// A JSON file holding every entry. Rewritten in full on each `set`.
pub struct FileStore {
    path: PathBuf,
    entries: BTreeMap<String, Entry>,
}

impl FileStore {
    /// Opens the store at `path`. A missing file is an empty store; an
    /// unreadable one is logged and treated as empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!("ignoring corrupt store {}: {}", path.display(), e);
                BTreeMap::new()
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                warn!("could not read store {}: {}", path.display(), e);
                BTreeMap::new()
            }
        };

        FileStore { path, entries }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> Result<(), StoreError> {
        let tmp = self.path.with_extension("json.tmp");
        let data = serde_json::to_vec_pretty(&self.entries)?;
        fs::write(&tmp, data)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .get(key)
            .filter(|entry| entry.expires_at > unix_now())
            .map(|entry| entry.value.clone())
    }

    fn set(&mut self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let entry = Entry {
            value: value.to_owned(),
            expires_at: unix_now().saturating_add(ttl.as_secs()),
        };
        self.entries.insert(key.to_owned(), entry);
        self.persist()
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// In-process store. Entries never expire.
#[cfg(test)]
#[derive(Default)]
pub struct MemoryStore {
    entries: std::collections::HashMap<String, String>,
    pub writes: usize,
}

#[cfg(test)]
impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str, _ttl: Duration) -> Result<(), StoreError> {
        self.entries.insert(key.to_owned(), value.to_owned());
        self.writes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process;

    const YEAR: Duration = Duration::from_secs(365 * 24 * 60 * 60);

    fn temp_path(name: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("mimizu-{}-{}.json", name, process::id()));
        let _ = fs::remove_file(&path);
        path
    }

    #[test]
    fn missing_file_has_no_high_score() {
        let store = FileStore::open(temp_path("missing"));
        assert_eq!(load_high_score(&store), 0);
    }

    #[test]
    fn high_score_survives_reopening() {
        let path = temp_path("reopen");

        let mut store = FileStore::open(&path);
        save_high_score(&mut store, 42, YEAR).unwrap();

        let reopened = FileStore::open(&path);
        assert_eq!(load_high_score(&reopened), 42);
        assert_eq!(reopened.path(), path.as_path());

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn expired_entries_read_as_absent() {
        let path = temp_path("expired");
        let mut store = FileStore::open(&path);

        store.set(HIGH_SCORE_KEY, "9", Duration::from_secs(0)).unwrap();

        assert_eq!(store.get(HIGH_SCORE_KEY), None);
        assert_eq!(load_high_score(&store), 0);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn corrupt_file_is_treated_as_empty() {
        let path = temp_path("corrupt");
        fs::write(&path, "high_score=12").unwrap();

        let store = FileStore::open(&path);
        assert_eq!(load_high_score(&store), 0);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn garbage_value_defaults_to_zero() {
        let mut store = MemoryStore::default();
        store.set(HIGH_SCORE_KEY, "lots", YEAR).unwrap();
        assert_eq!(load_high_score(&store), 0);
    }

    #[test]
    fn mutable_reference_is_a_store() {
        let mut store = MemoryStore::default();
        {
            let mut borrowed = &mut store;
            save_high_score(&mut borrowed, 7, YEAR).unwrap();
            assert_eq!(load_high_score(&borrowed), 7);
        }
        assert_eq!(store.writes, 1);
    }
}
