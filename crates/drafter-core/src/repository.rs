//! Staged-change repository trait.
//!
//! Defines the persistence-shim interface for staged changes.

use crate::change::Change;
use crate::error::Result;
use async_trait::async_trait;

/// An abstract key-value store for the last staged change per project.
///
/// This trait decouples the review engine from the concrete storage backend
/// so a reload or reconnect can restore in-flight review state. The key is
/// the project id; the value is the JSON-serialized [`Change`].
///
/// # Implementation Notes
///
/// Implementations may be read by multiple conversation instances for the
/// same project (e.g., a hidden keep-alive instance and a visible chat
/// instance), but only the instance that received the triggering
/// `show_diff_modal` event writes. Writers are last-writer-wins; there is no
/// merge.
#[async_trait]
pub trait StagedChangeRepository: Send + Sync {
    /// Loads the staged change persisted for a project, if any.
    async fn load(&self, project_id: &str) -> Result<Option<Change>>;

    /// Persists the staged change for a project, replacing any prior value.
    async fn save(&self, project_id: &str, change: &Change) -> Result<()>;

    /// Removes the persisted change for a project. Removing a missing entry
    /// is not an error.
    async fn clear(&self, project_id: &str) -> Result<()>;
}
