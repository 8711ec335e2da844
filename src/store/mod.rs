//! Key-value settings persistence. The engine touches exactly one key, the
//! item list; everything else is left to the embedding application.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use blake3::Hash;
use serde_json::{Map, Value};

use crate::error::Result;
use crate::item::Item;

/// Store key holding the placed item list.
pub const ITEMS_KEY: &str = "grid.items";

/// Synchronous key-value settings store. Reads serve from memory and cannot
/// fail; writes are read-your-writes consistent within the process.
pub trait SettingsStore {
    fn get(&self, key: &str) -> Option<Value>;
    fn set(&mut self, key: &str, value: Value) -> Result<()>;
}

/// In-memory store for tests and embedders that persist elsewhere.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemoryStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: Value) -> Result<()> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }
}

/// File-backed store: one JSON object per file, loaded once at open, served
/// from memory afterwards. A content hash gates writes so a `set` that does
/// not change the serialized document never touches the disk.
pub struct JsonFileStore {
    path: PathBuf,
    entries: Map<String, Value>,
    written: Option<Hash>,
}

impl JsonFileStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let (entries, written) = match fs::read_to_string(&path) {
            Ok(body) => {
                let value: Value = serde_json::from_str(&body)?;
                let entries = match value {
                    Value::Object(map) => map,
                    _ => Map::new(),
                };
                let hash = blake3::hash(serialize(&entries)?.as_bytes());
                (entries, Some(hash))
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => (Map::new(), None),
            Err(err) => return Err(err.into()),
        };
        Ok(Self {
            path,
            entries,
            written,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&mut self) -> Result<()> {
        let body = serialize(&self.entries)?;
        let hash = blake3::hash(body.as_bytes());
        if self.written == Some(hash) {
            return Ok(());
        }
        fs::write(&self.path, body)?;
        self.written = Some(hash);
        Ok(())
    }
}

fn serialize(entries: &Map<String, Value>) -> Result<String> {
    Ok(serde_json::to_string_pretty(&Value::Object(entries.clone()))?)
}

impl SettingsStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: Value) -> Result<()> {
        self.entries.insert(key.to_string(), value);
        self.persist()
    }
}

/// Read the live item list. A missing or malformed entry reads as empty,
/// matching the store's "default on get" contract.
pub fn load_items(store: &impl SettingsStore) -> Vec<Item> {
    store
        .get(ITEMS_KEY)
        .and_then(|value| serde_json::from_value(value).ok())
        .unwrap_or_default()
}

/// Replace the persisted item list wholesale.
pub fn save_items(store: &mut impl SettingsStore, items: &[Item]) -> Result<()> {
    store.set(ITEMS_KEY, serde_json::to_value(items)?)
}
