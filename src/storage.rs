use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::NamedTempFile;
use tracing::warn;

/// Key under which the snapshot is stored.
pub const STORAGE_KEY: &str = "fithouse_db";

/// A single-key store holding the serialized state snapshot.
pub trait SnapshotStorage {
    /// Returns `None` when nothing has been saved yet.
    fn load(&self) -> Result<Option<String>>;

    /// Replace the stored snapshot. A failed save leaves the previous one
    /// intact.
    fn save(&mut self, snapshot: &str) -> Result<()>;

    /// Move the stored snapshot out of the way, keeping its content, so the
    /// next save starts fresh instead of overwriting it.
    fn set_aside(&mut self) -> Result<()>;
}

/// Keeps the snapshot as `<dir>/fithouse_db.json`.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            path: data_dir.as_ref().join(format!("{}.json", STORAGE_KEY)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FileStorage {
    /// First free `<path>.bak`, `<path>.bak.1`, ...
    fn backup_path(&self) -> PathBuf {
        let with_suffix = |suffix: String| {
            let mut name = OsString::from(self.path.as_os_str());
            name.push(suffix);
            PathBuf::from(name)
        };
        std::iter::once(with_suffix(".bak".to_string()))
            .chain((1u32..).map(|n| with_suffix(format!(".bak.{}", n))))
            .find(|p| !p.exists())
            .unwrap_or_else(|| with_suffix(".bak".to_string()))
    }
}

impl SnapshotStorage for FileStorage {
    fn load(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        Ok(Some(content))
    }

    /// Writes a temp file next to the snapshot and renames it into place.
    fn save(&mut self, snapshot: &str) -> Result<()> {
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;

        let mut tmp = NamedTempFile::new_in(dir)
            .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
        tmp.write_all(snapshot.as_bytes())
            .and_then(|_| tmp.as_file().sync_all())
            .with_context(|| format!("Failed to write {}", tmp.path().display()))?;
        tmp.persist(&self.path)
            .map_err(|e| e.error)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;
        Ok(())
    }

    fn set_aside(&mut self) -> Result<()> {
        if !self.path.exists() {
            return Ok(());
        }
        let backup = self.backup_path();
        std::fs::rename(&self.path, &backup).with_context(|| {
            format!(
                "Failed to move {} to {}",
                self.path.display(),
                backup.display()
            )
        })?;
        warn!("Unreadable snapshot kept as {}", backup.display());
        Ok(())
    }
}

/// In-process storage, mostly for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    value: Option<String>,
    set_aside: Vec<String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: impl Into<String>) -> Self {
        Self {
            value: Some(snapshot.into()),
            set_aside: Vec::new(),
        }
    }

    pub fn snapshot(&self) -> Option<&str> {
        self.value.as_deref()
    }

    /// Snapshots moved aside, oldest first.
    pub fn set_aside_snapshots(&self) -> &[String] {
        &self.set_aside
    }
}

impl SnapshotStorage for MemoryStorage {
    fn load(&self) -> Result<Option<String>> {
        Ok(self.value.clone())
    }

    fn save(&mut self, snapshot: &str) -> Result<()> {
        self.value = Some(snapshot.to_string());
        Ok(())
    }

    fn set_aside(&mut self) -> Result<()> {
        self.set_aside.extend(self.value.take());
        Ok(())
    }
}
