use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::db::CatalogStore;

/// How long to wait for another process to release the lock file
const LOCK_TIMEOUT: Duration = Duration::from_secs(5);
const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Clone, Copy)]
enum LockMode {
    Shared,
    Exclusive,
}

/// Saves and loads the catalog from a single YAML file, using an advisory
/// lock file so that several processes can share it
pub struct Storage {
    file_path: PathBuf,
    lock_file_path: PathBuf,
}

impl Storage {
    /// Creates a new Storage instance
    pub fn new<P: AsRef<Path>>(file_path: P) -> Self {
        let file_path = file_path.as_ref().to_path_buf();
        let lock_file_path = file_path.with_extension("yaml.lock");
        Self {
            file_path,
            lock_file_path,
        }
    }

    fn lock_file(&self, options: &mut OpenOptions) -> Result<File> {
        options
            .open(&self.lock_file_path)
            .with_context(|| format!("Failed to open lock file: {:?}", self.lock_file_path))
    }

    /// Polls for the advisory lock until it is granted or `LOCK_TIMEOUT` passes
    fn wait_for_lock(&self, file: File, mode: LockMode) -> Result<File> {
        let deadline = Instant::now() + LOCK_TIMEOUT;
        loop {
            let attempt = match mode {
                LockMode::Shared => FileExt::try_lock_shared(&file),
                LockMode::Exclusive => FileExt::try_lock_exclusive(&file),
            };
            match attempt {
                Ok(()) => return Ok(file),
                Err(e) if e.kind() == ErrorKind::WouldBlock && Instant::now() < deadline => {
                    std::thread::sleep(LOCK_POLL_INTERVAL);
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => anyhow::bail!(
                    "Timed out after {:?} waiting for {:?}; another process holds the catalog",
                    LOCK_TIMEOUT,
                    self.lock_file_path
                ),
                Err(e) => {
                    return Err(e)
                        .with_context(|| format!("Failed to lock {:?}", self.lock_file_path))
                }
            }
        }
    }

    /// Exclusive lock held for the duration of a write
    fn write_lock(&self) -> Result<File> {
        if let Some(parent) = self.lock_file_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = self.lock_file(OpenOptions::new().create(true).write(true).truncate(true))?;
        self.wait_for_lock(file, LockMode::Exclusive)
    }

    /// Shared lock held while reading; None before anything was ever written
    fn read_lock(&self) -> Result<Option<File>> {
        if !self.lock_file_path.exists() {
            return Ok(None);
        }
        let file = self.lock_file(OpenOptions::new().read(true))?;
        self.wait_for_lock(file, LockMode::Shared).map(Some)
    }

    fn read_store(&self) -> Result<CatalogStore> {
        let file = File::open(&self.file_path)
            .with_context(|| format!("Failed to open file: {:?}", self.file_path))?;
        let reader = BufReader::new(file);
        serde_yaml::from_reader(reader)
            .with_context(|| format!("Failed to parse YAML from {:?}", self.file_path))
    }

    fn write_store(&self, lock_file: &mut File, store: &CatalogStore) -> Result<()> {
        // Holder stamp for humans inspecting the lock file; failures are ignored
        let _ = writeln!(
            lock_file,
            "watchstock pid {} since {}",
            std::process::id(),
            chrono::Utc::now().to_rfc3339()
        );

        let yaml = serde_yaml::to_string(store)?;
        fs::write(&self.file_path, yaml)
            .with_context(|| format!("Failed to write {:?}", self.file_path))
    }

    /// Loads the catalog, creating an empty file on first use
    pub fn load(&self) -> Result<CatalogStore> {
        if !self.file_path.exists() {
            let store = CatalogStore::new();
            self.save(&store)?;
            return Ok(store);
        }

        let _lock = self.read_lock()?;
        self.read_store()
    }

    /// Saves the catalog under an exclusive lock
    pub fn save(&self, store: &CatalogStore) -> Result<()> {
        if let Some(parent) = self.file_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut lock_file = self.write_lock()?;
        self.write_store(&mut lock_file, store)
    }

    /// Reloads the file, applies changes, and saves, all under one lock
    pub fn update_atomically<F>(&self, update_fn: F) -> Result<CatalogStore>
    where
        F: FnOnce(&mut CatalogStore),
    {
        if !self.file_path.exists() {
            self.save(&CatalogStore::new())?;
        }

        let mut lock_file = self.write_lock()?;
        let mut store = self.read_store()?;
        update_fn(&mut store);
        self.write_store(&mut lock_file, &store)?;
        Ok(store)
    }
}
