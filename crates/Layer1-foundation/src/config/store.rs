//! Config Store - 설정 레코드 영속화
//!
//! Loads are self-healing: a missing or unreadable file is replaced by the
//! defaults. Read-modify-write cycles go through [`ConfigStore::update`], which
//! serializes them so two writers never clobber each other's fields.

use super::save::{SaveConfig, SAVE_CONFIG_FILE};
use crate::storage::JsonStore;
use crate::Result;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Persistent home of [`SaveConfig`]
#[derive(Debug)]
pub struct ConfigStore {
    store: JsonStore,
    filename: String,
    write_lock: Mutex<()>,
}

impl ConfigStore {
    pub fn new(store: JsonStore) -> Self {
        Self::with_filename(store, SAVE_CONFIG_FILE)
    }

    pub fn with_filename(store: JsonStore, filename: impl Into<String>) -> Self {
        Self {
            store,
            filename: filename.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Store backed by an explicit file path
    pub fn at_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let filename = path
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_else(|| SAVE_CONFIG_FILE.to_string());
        Self::with_filename(JsonStore::new(dir), filename)
    }

    /// 글로벌 설정 (~/.config/cloudsave/config.json)
    pub fn global() -> Result<Self> {
        Ok(Self::new(JsonStore::global()?))
    }

    pub fn path(&self) -> PathBuf {
        self.store.file_path(&self.filename)
    }

    /// Load the record, writing defaults when absent or unreadable
    pub fn load(&self) -> Result<SaveConfig> {
        let _guard = self.write_lock.lock();
        self.load_unlocked()
    }

    /// Overwrite the record
    pub fn save(&self, config: &SaveConfig) -> Result<()> {
        let _guard = self.write_lock.lock();
        self.store.save(&self.filename, config)
    }

    /// Atomic read-modify-write
    pub fn update<R>(&self, f: impl FnOnce(&mut SaveConfig) -> R) -> Result<R> {
        let _guard = self.write_lock.lock();
        let mut config = self.load_unlocked()?;
        let out = f(&mut config);
        self.store.save(&self.filename, &config)?;
        Ok(out)
    }

    /// Fallible read-modify-write; nothing is written when `f` fails
    pub fn try_update<R, E>(
        &self,
        f: impl FnOnce(&mut SaveConfig) -> std::result::Result<R, E>,
    ) -> std::result::Result<R, E>
    where
        E: From<crate::Error>,
    {
        let _guard = self.write_lock.lock();
        let mut config = self.load_unlocked()?;
        let out = f(&mut config)?;
        self.store.save(&self.filename, &config)?;
        Ok(out)
    }

    fn load_unlocked(&self) -> Result<SaveConfig> {
        match self.store.load_optional::<SaveConfig>(&self.filename) {
            Ok(Some(mut config)) => {
                config.normalize();
                Ok(config)
            }
            Ok(None) => {
                debug!("Config {} not found, writing defaults", self.path().display());
                let config = SaveConfig::default();
                self.store.save(&self.filename, &config)?;
                Ok(config)
            }
            Err(e) => {
                warn!("Failed to read config, recreating defaults: {}", e);
                let config = SaveConfig::default();
                self.store.save(&self.filename, &config)?;
                Ok(config)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_BRANCH;

    #[test]
    fn test_load_creates_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::at_path(dir.path().join("config.json"));

        let config = store.load().unwrap();
        assert_eq!(config, SaveConfig::default());
        assert!(store.path().exists());
    }

    #[test]
    fn test_corrupt_file_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "][").unwrap();

        let store = ConfigStore::at_path(&path);
        let config = store.load().unwrap();
        assert_eq!(config.branch, DEFAULT_BRANCH);

        let on_disk: SaveConfig =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk, SaveConfig::default());
    }

    #[test]
    fn test_update_persists() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::at_path(dir.path().join("config.json"));

        let flag = store
            .update(|c| {
                c.has_temp_stash = true;
                c.has_temp_stash
            })
            .unwrap();
        assert!(flag);
        assert!(store.load().unwrap().has_temp_stash);
    }

    #[test]
    fn test_try_update_failure_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::at_path(dir.path().join("config.json"));
        store.load().unwrap();

        let result: std::result::Result<(), crate::Error> = store.try_update(|c| {
            c.display_name = "changed".into();
            Err(crate::Error::InvalidInput("nope".into()))
        });
        assert!(result.is_err());
        assert!(store.load().unwrap().display_name.is_empty());
    }
}
