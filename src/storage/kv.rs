use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::error::StorageError;

/// String key-value persistence, scoped to one user profile.
pub trait KeyValueStore: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
    fn clear(&self) -> Result<(), StorageError>;
    fn keys(&self) -> Result<Vec<String>, StorageError>;
}

/// Volatile store, gone when the process exits.
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.items.lock().unwrap().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.items
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.items.lock().unwrap().remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        self.items.lock().unwrap().clear();
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.items.lock().unwrap().keys().cloned().collect())
    }
}

/// Store backed by one JSON object file, written through on every change.
///
/// Every operation reads the file afresh, so handles on the same file see
/// each other's writes. A change rewrites the whole file; two handles
/// rewriting the same key at once still race and the later write wins.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Default location: ~/.local/share/proxy-studio/storage.json
    pub fn default_path() -> PathBuf {
        let mut p = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
        p.push("proxy-studio");
        p.push("storage.json");
        p
    }

    /// Open the file. A missing file starts empty. A file that does not
    /// parse is moved aside to `<name>.corrupt` and the store starts empty.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let store = Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        };
        match store.load() {
            Ok(_) => {}
            Err(StorageError::Corrupt(reason)) => {
                let backup = store.backup_path();
                log::warn!(
                    "Unreadable storage file ({reason}), moving it to {}",
                    backup.display()
                );
                fs::rename(&store.path, &backup)
                    .map_err(|e| StorageError::Unavailable(format!("{}: {e}", backup.display())))?;
            }
            Err(e) => return Err(e),
        }
        Ok(store)
    }

    fn backup_path(&self) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(".corrupt");
        PathBuf::from(name)
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(format!(".{}.tmp", std::process::id()));
        PathBuf::from(name)
    }

    fn load(&self) -> Result<BTreeMap<String, String>, StorageError> {
        match fs::read_to_string(&self.path) {
            Ok(data) => serde_json::from_str(&data)
                .map_err(|e| StorageError::Corrupt(format!("{}: {e}", self.path.display()))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(StorageError::Unavailable(format!(
                "{}: {e}",
                self.path.display()
            ))),
        }
    }

    /// Re-read the file, apply `change` and write the result back.
    fn mutate<F>(&self, change: F) -> Result<(), StorageError>
    where
        F: FnOnce(&mut BTreeMap<String, String>),
    {
        let _guard = self.write_lock.lock().unwrap();
        let mut items = self.load()?;
        change(&mut items);
        self.persist(&items)
    }

    fn persist(&self, items: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .map_err(|e| StorageError::Unavailable(format!("{}: {e}", dir.display())))?;
        }
        let data = serde_json::to_string_pretty(items)?;
        let tmp = self.tmp_path();
        fs::write(&tmp, data)
            .and_then(|_| fs::rename(&tmp, &self.path))
            .map_err(|e| StorageError::Write(format!("{}: {e}", self.path.display())))
    }
}

impl KeyValueStore for FileStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.load()?.remove(key))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.mutate(|items| {
            items.insert(key.to_string(), value.to_string());
        })
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.mutate(|items| {
            items.remove(key);
        })
    }

    fn clear(&self) -> Result<(), StorageError> {
        self.mutate(BTreeMap::clear)
    }

    fn keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.load()?.into_keys().collect())
    }
}
