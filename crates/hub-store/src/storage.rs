//! Key-value storage port for persisted layouts.
//!
//! The store never talks to a filesystem or database directly. It reads and
//! writes JSON values under a single key through a [`StorageBackend`], and
//! the host decides which backend (and which scope) that is.
//!
//! Two backends ship with the crate:
//!
//! - [`MemoryStorage`]: a lock-protected map, for tests and throwaway scopes.
//! - [`FileStorage`]: one JSON file per key inside a scope directory,
//!   written atomically.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Mutex;

use hub_layout::ProjectId;
use serde_json::Value;

/// Errors surfaced by a storage backend.
#[derive(Debug)]
pub enum StorageError {
    /// The underlying I/O failed.
    Io(std::io::Error),
    /// A stored value could not be encoded or decoded.
    Serialization(String),
    /// Any other backend-specific failure.
    Backend(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "storage I/O error: {e}"),
            Self::Serialization(msg) => write!(f, "storage serialization error: {msg}"),
            Self::Backend(msg) => write!(f, "storage backend error: {msg}"),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Serialization(_) | Self::Backend(_) => None,
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

/// A synchronous JSON key-value store.
///
/// Writes to the same key are idempotent: writing a value twice leaves the
/// same durable state as writing it once.
pub trait StorageBackend {
    /// Short human-readable backend name, used in log fields.
    fn name(&self) -> &str;

    /// Value stored under `key`, or `None` if absent.
    fn read(&self, key: &str) -> StorageResult<Option<Value>>;

    fn write(&self, key: &str, value: &Value) -> StorageResult<()>;

    /// Remove `key`. Removing an absent key succeeds.
    fn delete(&self, key: &str) -> StorageResult<()>;

    /// All stored keys, sorted.
    fn list(&self) -> StorageResult<Vec<String>>;
}

/// Which persistence scope a layout belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StorageScope {
    /// Shared by the whole application.
    App,
    /// Private to one project.
    Project(ProjectId),
}

/// In-memory backend.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<BTreeMap<String, Value>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn with_entries<R>(&self, f: impl FnOnce(&mut BTreeMap<String, Value>) -> R) -> StorageResult<R> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| StorageError::Backend("memory storage lock poisoned".into()))?;
        Ok(f(&mut entries))
    }
}

impl StorageBackend for MemoryStorage {
    fn name(&self) -> &str {
        "memory"
    }

    fn read(&self, key: &str) -> StorageResult<Option<Value>> {
        self.with_entries(|entries| entries.get(key).cloned())
    }

    fn write(&self, key: &str, value: &Value) -> StorageResult<()> {
        self.with_entries(|entries| {
            entries.insert(key.to_owned(), value.clone());
        })
    }

    fn delete(&self, key: &str) -> StorageResult<()> {
        self.with_entries(|entries| {
            entries.remove(key);
        })
    }

    fn list(&self) -> StorageResult<Vec<String>> {
        self.with_entries(|entries| entries.keys().cloned().collect())
    }
}

pub use file::FileStorage;

mod file {
    use std::io;
    use std::path::{Path, PathBuf};

    use serde_json::Value;

    use super::{StorageBackend, StorageError, StorageResult, StorageScope};

    /// Directory-backed storage: key `k` lives in `<dir>/k.json`.
    ///
    /// Writes go to `k.json.tmp` first and are renamed into place, so a crash
    /// mid-write never leaves a truncated entry behind.
    #[derive(Debug, Clone)]
    pub struct FileStorage {
        dir: PathBuf,
    }

    impl FileStorage {
        /// Storage rooted directly at `dir`. The directory is created on the
        /// first write.
        #[must_use]
        pub fn new(dir: impl Into<PathBuf>) -> Self {
            Self { dir: dir.into() }
        }

        /// Storage for `scope` under `root`: `root/app` or
        /// `root/projects/<project>`.
        pub fn for_scope(root: impl AsRef<Path>, scope: &StorageScope) -> StorageResult<Self> {
            let root = root.as_ref();
            let dir = match scope {
                StorageScope::App => root.join("app"),
                StorageScope::Project(project) => {
                    check_component(project.as_str())?;
                    root.join("projects").join(project.as_str())
                }
            };
            Ok(Self { dir })
        }

        #[must_use]
        pub fn dir(&self) -> &Path {
            &self.dir
        }

        fn path_for(&self, key: &str) -> StorageResult<PathBuf> {
            check_component(key)?;
            Ok(self.dir.join(format!("{key}.json")))
        }
    }

    /// Keys and project ids become path components.
    fn check_component(raw: &str) -> StorageResult<()> {
        if raw.is_empty()
            || raw == "."
            || raw == ".."
            || raw.contains(['/', '\\'])
            || raw.contains('\0')
        {
            return Err(StorageError::Backend(format!(
                "invalid storage path component: {raw:?}"
            )));
        }
        Ok(())
    }

    impl StorageBackend for FileStorage {
        fn name(&self) -> &str {
            "file"
        }

        fn read(&self, key: &str) -> StorageResult<Option<Value>> {
            let path = self.path_for(key)?;
            let contents = match std::fs::read_to_string(&path) {
                Ok(contents) => contents,
                Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
                Err(e) => return Err(e.into()),
            };
            serde_json::from_str(&contents)
                .map(Some)
                .map_err(|e| StorageError::Serialization(format!("{}: {e}", path.display())))
        }

        fn write(&self, key: &str, value: &Value) -> StorageResult<()> {
            let path = self.path_for(key)?;
            let json = serde_json::to_string_pretty(value)
                .map_err(|e| StorageError::Serialization(e.to_string()))?;
            std::fs::create_dir_all(&self.dir)?;

            // Atomic write: temp file then rename
            let temp = path.with_extension("json.tmp");
            std::fs::write(&temp, json)?;
            std::fs::rename(&temp, &path)?;
            Ok(())
        }

        fn delete(&self, key: &str) -> StorageResult<()> {
            let path = self.path_for(key)?;
            match std::fs::remove_file(&path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(e.into()),
            }
        }

        fn list(&self) -> StorageResult<Vec<String>> {
            let entries = match std::fs::read_dir(&self.dir) {
                Ok(entries) => entries,
                Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
                Err(e) => return Err(e.into()),
            };
            let mut keys = Vec::new();
            for entry in entries {
                let path = entry?.path();
                if path.extension().is_some_and(|ext| ext == "json")
                    && let Some(stem) = path.file_stem().and_then(|s| s.to_str())
                {
                    keys.push(stem.to_owned());
                }
            }
            keys.sort();
            Ok(keys)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn memory_storage_read_write_delete() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.read("k").expect("read"), None);

        storage.write("k", &json!({"type": "leaf", "id": "hub_1"})).expect("write");
        assert_eq!(
            storage.read("k").expect("read"),
            Some(json!({"type": "leaf", "id": "hub_1"}))
        );

        storage.delete("k").expect("delete");
        storage.delete("k").expect("delete absent");
        assert_eq!(storage.read("k").expect("read"), None);
    }

    #[test]
    fn memory_storage_lists_sorted_keys() {
        let storage = MemoryStorage::new();
        storage.write("b", &json!(1)).expect("write");
        storage.write("a", &json!(2)).expect("write");
        assert_eq!(storage.list().expect("list"), vec!["a", "b"]);
    }

    #[test]
    fn storage_error_display() {
        let err = StorageError::Backend("offline".into());
        assert_eq!(err.to_string(), "storage backend error: offline");
        let err = StorageError::from(std::io::Error::other("disk"));
        assert!(err.to_string().contains("disk"));
        assert!(std::error::Error::source(&err).is_some());
    }

    mod file_storage {
        use super::*;

        #[test]
        fn write_then_read_round_trips() {
            let dir = tempfile::tempdir().expect("tempdir");
            let storage = FileStorage::new(dir.path().join("app"));
            assert_eq!(storage.read("layout").expect("read"), None);

            let value = json!({"type": "leaf", "id": "hub_1", "agentId": "a1"});
            storage.write("layout", &value).expect("write");
            assert_eq!(storage.read("layout").expect("read"), Some(value));
            assert!(!dir.path().join("app/layout.json.tmp").exists());
        }

        #[test]
        fn scopes_map_to_directories() {
            let dir = tempfile::tempdir().expect("tempdir");
            let app = FileStorage::for_scope(dir.path(), &StorageScope::App).expect("app");
            assert_eq!(app.dir(), dir.path().join("app"));

            let project = StorageScope::Project(ProjectId::from("p1"));
            let project = FileStorage::for_scope(dir.path(), &project).expect("project");
            assert_eq!(project.dir(), dir.path().join("projects").join("p1"));
        }

        #[test]
        fn path_components_are_checked() {
            let dir = tempfile::tempdir().expect("tempdir");
            let escape = StorageScope::Project(ProjectId::from("../x"));
            assert!(matches!(
                FileStorage::for_scope(dir.path(), &escape),
                Err(StorageError::Backend(_))
            ));

            let storage = FileStorage::new(dir.path());
            assert!(storage.write("a/b", &json!(1)).is_err());
            assert!(storage.read("").is_err());
        }

        #[test]
        fn list_ignores_temp_files_and_sorts() {
            let dir = tempfile::tempdir().expect("tempdir");
            let storage = FileStorage::new(dir.path());
            assert!(storage.list().expect("list of missing dir").is_empty());

            storage.write("zeta", &json!(1)).expect("write");
            storage.write("alpha", &json!(2)).expect("write");
            std::fs::write(dir.path().join("beta.json.tmp"), "{}").expect("temp");
            assert_eq!(storage.list().expect("list"), vec!["alpha", "zeta"]);

            storage.delete("zeta").expect("delete");
            storage.delete("zeta").expect("delete absent");
            assert_eq!(storage.list().expect("list"), vec!["alpha"]);
        }

        #[test]
        fn corrupt_file_is_a_serialization_error() {
            let dir = tempfile::tempdir().expect("tempdir");
            std::fs::write(dir.path().join("layout.json"), "{not json").expect("seed");
            let storage = FileStorage::new(dir.path());
            assert!(matches!(
                storage.read("layout"),
                Err(StorageError::Serialization(_))
            ));
        }
    }
}
