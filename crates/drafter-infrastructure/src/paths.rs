//! Centralized storage path resolution.

use drafter_core::{DrafterError, Result};
use std::path::PathBuf;

/// Resolves the on-disk locations Drafter uses.
pub struct DrafterPaths;

impl DrafterPaths {
    /// Base configuration directory (`~/.config/drafter` on Linux).
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join("drafter"))
            .ok_or_else(|| DrafterError::io("could not determine config directory"))
    }

    /// Directory holding one staged-change file per project.
    pub fn staged_changes_dir() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("staged_changes"))
    }
}
