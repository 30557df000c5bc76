//! Storage backends for the transaction store.
//!
//! A backend is a keyed string store, mirroring the browser's local storage:
//! the transaction store serializes the whole collection to JSON and writes
//! it under a fixed key after every successful mutation. Backends are
//! injected behind the [Storage] trait so tests can substitute
//! [MemoryStorage] for the file-backed production backend.

use std::{
    collections::HashMap,
    fs, io,
    path::PathBuf,
    sync::{Arc, Mutex},
};

use crate::Error;

/// A keyed string store that holds the serialized transaction collection.
pub trait Storage {
    /// Read the value stored under `key`, or `None` if nothing has been
    /// stored yet.
    ///
    /// # Errors
    /// This function will return an [Error::Storage] if the backend exists
    /// but could not be read.
    fn read(&self, key: &str) -> Result<Option<String>, Error>;

    /// Replace the value stored under `key`.
    ///
    /// # Errors
    /// This function will return an [Error::Storage] if the value could not
    /// be written durably.
    fn write(&mut self, key: &str, value: &str) -> Result<(), Error>;
}

/// File-backed storage: each key is stored as `<key>.json` in a directory.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    directory: PathBuf,
}

impl JsonFileStorage {
    /// Create a storage backend rooted at `directory`.
    ///
    /// The directory is created on the first write.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.directory.join(format!("{key}.json"))
    }
}

impl Storage for JsonFileStorage {
    fn read(&self, key: &str) -> Result<Option<String>, Error> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(Error::Storage(error.to_string())),
        }
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), Error> {
        fs::create_dir_all(&self.directory).map_err(|error| Error::Storage(error.to_string()))?;

        // Write-then-rename: the stored key never holds a partial value.
        let path = self.path_for(key);
        let temp_path = self.directory.join(format!("{key}.json.tmp"));
        fs::write(&temp_path, value).map_err(|error| Error::Storage(error.to_string()))?;
        fs::rename(&temp_path, &path).map_err(|error| Error::Storage(error.to_string()))?;

        Ok(())
    }
}

/// In-memory storage for tests and ephemeral sessions.
///
/// Cloning produces a handle onto the same underlying map, so a test can
/// keep a handle, drop a store, and load a new store from the same data to
/// simulate a restart.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    values: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStorage {
    /// Create an empty in-memory backend.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>, Error> {
        let values = self
            .values
            .lock()
            .map_err(|_| Error::Storage("storage lock poisoned".to_owned()))?;

        Ok(values.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), Error> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| Error::Storage("storage lock poisoned".to_owned()))?;

        values.insert(key.to_owned(), value.to_owned());

        Ok(())
    }
}

#[cfg(test)]
mod storage_tests {
    use super::{JsonFileStorage, MemoryStorage, Storage};

    #[test]
    fn memory_storage_round_trips() {
        let mut storage = MemoryStorage::new();

        assert_eq!(storage.read("missing"), Ok(None));

        storage.write("key", "value").unwrap();

        assert_eq!(storage.read("key"), Ok(Some("value".to_owned())));
    }

    #[test]
    fn memory_storage_clones_share_data() {
        let mut storage = MemoryStorage::new();
        let handle = storage.clone();

        storage.write("key", "value").unwrap();

        assert_eq!(handle.read("key"), Ok(Some("value".to_owned())));
    }

    #[test]
    fn file_storage_round_trips() {
        let directory = tempfile::tempdir().unwrap();
        let mut storage = JsonFileStorage::new(directory.path());

        assert_eq!(storage.read("transactions"), Ok(None));

        storage.write("transactions", r#"{"state":{"transactions":[]}}"#).unwrap();

        assert_eq!(
            storage.read("transactions"),
            Ok(Some(r#"{"state":{"transactions":[]}}"#.to_owned()))
        );
    }

    #[test]
    fn file_storage_overwrites_previous_value() {
        let directory = tempfile::tempdir().unwrap();
        let mut storage = JsonFileStorage::new(directory.path());

        storage.write("transactions", "first").unwrap();
        storage.write("transactions", "second").unwrap();

        assert_eq!(storage.read("transactions"), Ok(Some("second".to_owned())));
    }
}
