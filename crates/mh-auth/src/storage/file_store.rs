use crate::{KeyValueStore, StorageError, StorageResult};

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use log::debug;

/// Stores each key as `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
    dir: PathBuf,
}

impl FileKeyValueStore {
    /// The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let path = self.path_for(key);

        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::file_read(path, e)),
        }
    }

    /// Atomic write: temp file, fsync, rename over the final path.
    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| StorageError::dir_creation(self.dir.clone(), e))?;

        let final_path = self.path_for(key);
        let temp_path = self
            .dir
            .join(format!("{key}.json.tmp.{}", std::process::id()));

        {
            let mut file = fs::File::create(&temp_path)
                .map_err(|e| StorageError::file_write(temp_path.clone(), e))?;

            file.write_all(value.as_bytes())
                .map_err(|e| StorageError::file_write(temp_path.clone(), e))?;

            file.sync_all()
                .map_err(|e| StorageError::file_write(temp_path.clone(), e))?;
        }

        fs::rename(&temp_path, &final_path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            StorageError::atomic_rename(temp_path, final_path.clone(), e)
        })?;

        debug!("Wrote {}", final_path.display());
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let path = self.path_for(key);

        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::file_write(path, e)),
        }
    }
}
