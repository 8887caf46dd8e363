//! Flat-file backend.
//!
//! The identity map lives in memory; `persist` serializes all of it as one
//! JSON object (`{"kind.id": {...}}`) and `reload` reads it back. The file is
//! replaced by write-then-rename, so readers never see a half-written store.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use hbnb_core::{EntityKind, Fields, Record, RecordKey, StorageEngine, StoreError, StoreResult};
use tracing::{debug, info, warn};

enum FileState {
    Unopened,
    Open(HashMap<RecordKey, Record>),
    Closed,
}

/// JSON-file-backed storage engine.
pub struct FileStorage {
    path: PathBuf,
    state: FileState,
    dirty: bool,
}

impl FileStorage {
    /// Engine over `path`. Nothing is read until [`StorageEngine::reload`].
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            state: FileState::Unopened,
            dirty: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the map holds registrations the file does not have yet.
    pub fn has_unpersisted_changes(&self) -> bool {
        self.dirty
    }

    fn objects(&self, operation: &str) -> StoreResult<&HashMap<RecordKey, Record>> {
        match &self.state {
            FileState::Open(objects) => Ok(objects),
            _ => Err(StoreError::not_open(operation)),
        }
    }

    fn objects_mut(&mut self, operation: &str) -> StoreResult<&mut HashMap<RecordKey, Record>> {
        match &mut self.state {
            FileState::Open(objects) => Ok(objects),
            _ => Err(StoreError::not_open(operation)),
        }
    }

    fn load(&self) -> StoreResult<HashMap<RecordKey, Record>> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(e) => {
                return Err(StoreError::resource(format!(
                    "failed to read {}: {e}",
                    self.path.display()
                )));
            }
        };
        if text.trim().is_empty() {
            return Ok(HashMap::new());
        }

        let stored: BTreeMap<String, Fields> = serde_json::from_str(&text).map_err(|e| {
            StoreError::format(format!("{} is not a valid store file: {e}", self.path.display()))
        })?;

        let mut objects = HashMap::with_capacity(stored.len());
        for (key_text, dict) in stored {
            let key: RecordKey = key_text.parse()?;
            let record = Record::from_dict(&dict)?;
            if record.key() != key {
                return Err(StoreError::format(format!(
                    "entry '{key_text}' holds record {}",
                    record.key()
                )));
            }
            objects.insert(key, record);
        }
        Ok(objects)
    }

    fn write(&self, objects: &HashMap<RecordKey, Record>) -> StoreResult<()> {
        let mut stored = BTreeMap::new();
        for (key, record) in objects {
            stored.insert(key.to_string(), record.to_dict()?);
        }
        let text = serde_json::to_string(&stored)
            .map_err(|e| StoreError::durability(format!("failed to encode store: {e}")))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                StoreError::durability(format!("failed to create {}: {e}", parent.display()))
            })?;
        }

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, text)
            .map_err(|e| StoreError::durability(format!("failed to write {}: {e}", tmp.display())))?;
        fs::rename(&tmp, &self.path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            StoreError::durability(format!("failed to replace {}: {e}", self.path.display()))
        })
    }
}

impl StorageEngine for FileStorage {
    fn all(&self, kind: Option<EntityKind>) -> StoreResult<BTreeMap<String, Record>> {
        Ok(self
            .objects("all")?
            .iter()
            .filter(|(key, _)| kind.is_none_or(|k| key.kind == k))
            .map(|(key, record)| (key.to_string(), record.clone()))
            .collect())
    }

    fn register(&mut self, record: Record) -> StoreResult<()> {
        let key = record.key();
        let objects = self.objects_mut("register")?;

        if let Some(existing) = objects
            .keys()
            .find(|k| k.id == key.id && k.kind != key.kind)
        {
            return Err(StoreError::conflict(format!(
                "identity {} is already registered as {existing}",
                key.id
            )));
        }

        debug!(key = %key, "register");
        objects.insert(key, record);
        self.dirty = true;
        Ok(())
    }

    fn persist(&mut self) -> StoreResult<()> {
        let objects = self.objects("persist")?;
        self.write(objects)?;
        debug!(path = %self.path.display(), records = objects.len(), "persisted");
        self.dirty = false;
        Ok(())
    }

    fn delete(&mut self, record: Option<&Record>) -> StoreResult<()> {
        let Some(record) = record else {
            return Ok(());
        };
        let key = record.key();
        let removed = self.objects_mut("delete")?.remove(&key);

        if let Err(err) = self.persist() {
            if let (Some(previous), Ok(objects)) = (removed, self.objects_mut("delete")) {
                objects.insert(key, previous);
            }
            return Err(err);
        }
        debug!(key = %key, "deleted");
        Ok(())
    }

    fn reload(&mut self) -> StoreResult<()> {
        let objects = self.load()?;
        info!(path = %self.path.display(), records = objects.len(), "file storage loaded");
        self.state = FileState::Open(objects);
        self.dirty = false;
        Ok(())
    }

    fn close(&mut self) {
        if let FileState::Open(_) = std::mem::replace(&mut self.state, FileState::Closed) {
            if self.dirty {
                warn!(
                    path = %self.path.display(),
                    "file storage closed with unpersisted changes; discarding them"
                );
            }
        }
        self.dirty = false;
    }

    fn is_open(&self) -> bool {
        matches!(self.state, FileState::Open(_))
    }
}
