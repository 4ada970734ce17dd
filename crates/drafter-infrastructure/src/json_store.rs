//! File-backed staged-change store.
//!
//! One JSON file per project id under the store directory:
//!
//! ```text
//! base_dir/
//! ├── proj-1.json
//! └── proj-2.json
//! ```
//!
//! Writes are atomic: serialize to a uniquely named temporary file, fsync,
//! then rename over the target while holding an advisory lock. Concurrent
//! writers therefore resolve last-writer-wins at the rename, never as a
//! torn file.

use std::fs::{self, File, OpenOptions};
use std::io::Write as IoWrite;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use drafter_core::{Change, DrafterError, Result, StagedChangeRepository};
use tracing::debug;

use crate::paths::DrafterPaths;

/// JSON-file persistence shim for staged changes.
pub struct JsonChangeStore {
    dir: PathBuf,
}

impl JsonChangeStore {
    /// Creates a store rooted at `dir`. The directory is created lazily on
    /// first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Creates a store at the default location under the user config dir.
    pub fn at_default_location() -> Result<Self> {
        Ok(Self::new(DrafterPaths::staged_changes_dir()?))
    }

    fn file_path(&self, project_id: &str) -> PathBuf {
        // Project ids are opaque; keep path separators out of the filename.
        let name: String = project_id
            .chars()
            .map(|c| if c == '/' || c == '\\' { '_' } else { c })
            .collect();
        self.dir.join(format!("{name}.json"))
    }
}

#[async_trait]
impl StagedChangeRepository for JsonChangeStore {
    async fn load(&self, project_id: &str) -> Result<Option<Change>> {
        let path = self.file_path(project_id);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        if content.trim().is_empty() {
            return Ok(None);
        }
        let change: Change = serde_json::from_str(&content)?;
        Ok(Some(change))
    }

    async fn save(&self, project_id: &str, change: &Change) -> Result<()> {
        let path = self.file_path(project_id);
        let payload = serde_json::to_string_pretty(change)?;
        debug!(project_id, change_id = %change.change_id, "persisting staged change");
        tokio::task::spawn_blocking(move || write_atomic(&path, &payload))
            .await
            .map_err(|err| DrafterError::internal(format!("storage task failed: {err}")))??;
        Ok(())
    }

    async fn clear(&self, project_id: &str) -> Result<()> {
        let path = self.file_path(project_id);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

fn write_atomic(path: &Path, payload: &str) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| DrafterError::io("store path has no parent directory"))?;
    let file_name = path
        .file_name()
        .ok_or_else(|| DrafterError::io("store path has no file name"))?;
    fs::create_dir_all(parent)?;

    let _lock = StoreLock::acquire(path)?;

    // Unique temp name so a concurrent writer cannot clobber our scratch
    // file before the rename.
    let tmp_path = parent.join(format!(
        ".{}.{}.tmp",
        file_name.to_string_lossy(),
        uuid::Uuid::new_v4()
    ));

    let mut tmp_file = File::create(&tmp_path)?;
    tmp_file.write_all(payload.as_bytes())?;
    tmp_file.sync_all()?;
    drop(tmp_file);

    fs::rename(&tmp_path, path)?;
    Ok(())
}

/// An advisory lock guard that releases when dropped.
struct StoreLock {
    #[allow(dead_code)]
    file: File,
}

impl StoreLock {
    fn acquire(path: &Path) -> Result<Self> {
        let lock_path = path.with_extension("lock");
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;

        #[cfg(unix)]
        {
            use fs2::FileExt;
            file.lock_exclusive().map_err(|err| {
                DrafterError::data_access(format!("failed to acquire store lock: {err}"))
            })?;
        }

        Ok(Self { file })
    }
}
