//! Atomic TOML file operations.
//!
//! Writes go to a hidden tmp file in the same directory, are fsynced, then
//! renamed over the target. Writers serialize on an advisory `fs2` lock file
//! next to the target.

use formnav_core::error::{NavigationError, Result};
use serde::{Serialize, de::DeserializeOwned};
use std::fs::{self, File, OpenOptions};
use std::io::Write as IoWrite;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

/// A handle to one TOML file holding a `T`.
pub struct AtomicTomlFile<T> {
    path: PathBuf,
    _phantom: PhantomData<T>,
}

impl<T> AtomicTomlFile<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            _phantom: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads and deserializes the file.
    ///
    /// A missing or blank file reads as `Ok(None)`.
    pub fn load(&self) -> Result<Option<T>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(None);
        }

        let data: T = toml::from_str(&content)?;
        Ok(Some(data))
    }

    /// Replaces the file contents atomically while holding the write lock.
    pub fn save(&self, data: &T) -> Result<()> {
        let _lock = FileLock::acquire(&self.path)?;
        self.write_atomically(data)
    }

    /// Deletes the file. Returns whether it existed.
    pub fn remove(&self) -> Result<bool> {
        let _lock = FileLock::acquire(&self.path)?;
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn write_atomically(&self, data: &T) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let toml_string = toml::to_string_pretty(data)?;

        let tmp_path = self.temp_path()?;
        let mut tmp_file = File::create(&tmp_path)?;
        tmp_file.write_all(toml_string.as_bytes())?;
        tmp_file.sync_all()?;
        drop(tmp_file);

        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    fn temp_path(&self) -> Result<PathBuf> {
        let parent = self.path.parent().ok_or_else(|| NavigationError::Io {
            message: format!("{} has no parent directory", self.path.display()),
        })?;
        let file_name = self.path.file_name().ok_or_else(|| NavigationError::Io {
            message: format!("{} has no file name", self.path.display()),
        })?;
        Ok(parent.join(format!(".{}.tmp", file_name.to_string_lossy())))
    }
}

/// Exclusive advisory lock, released when dropped.
struct FileLock {
    #[allow(dead_code)]
    file: File,
}

impl FileLock {
    fn acquire(path: &Path) -> Result<Self> {
        let lock_path = path.with_extension("lock");
        if let Some(parent) = lock_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;

        use fs2::FileExt;
        file.lock_exclusive().map_err(|e| NavigationError::Io {
            message: format!("failed to lock {}: {}", lock_path.display(), e),
        })?;

        Ok(FileLock { file })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Counter {
        label: String,
        hits: u32,
    }

    fn counter(hits: u32) -> Counter {
        Counter {
            label: "visits".to_string(),
            hits,
        }
    }

    #[test]
    fn test_save_then_load() {
        let temp_dir = TempDir::new().unwrap();
        let file = AtomicTomlFile::<Counter>::new(temp_dir.path().join("nested/counter.toml"));

        file.save(&counter(3)).unwrap();

        assert_eq!(file.load().unwrap(), Some(counter(3)));
        assert!(!temp_dir.path().join("nested/.counter.toml.tmp").exists());
    }

    #[test]
    fn test_missing_and_blank_files_read_as_none() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("counter.toml");
        let file = AtomicTomlFile::<Counter>::new(path.clone());
        assert!(file.load().unwrap().is_none());

        fs::write(&path, "  \n").unwrap();
        assert!(file.load().unwrap().is_none());
    }

    #[test]
    fn test_corrupt_file_is_serialization_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("counter.toml");
        fs::write(&path, "label = [").unwrap();

        let err = AtomicTomlFile::<Counter>::new(path).load().unwrap_err();
        assert!(matches!(err, NavigationError::Serialization { .. }));
    }

    #[test]
    fn test_remove_reports_existence() {
        let temp_dir = TempDir::new().unwrap();
        let file = AtomicTomlFile::<Counter>::new(temp_dir.path().join("counter.toml"));

        assert!(!file.remove().unwrap());
        file.save(&counter(1)).unwrap();
        assert!(file.remove().unwrap());
        assert!(file.load().unwrap().is_none());
    }
}
