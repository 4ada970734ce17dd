//! In-memory staged-change store.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use drafter_core::{Change, Result, StagedChangeRepository};

/// HashMap-backed persistence shim.
///
/// Used by tests and by hidden keep-alive conversation instances that share
/// a process with the visible one. Last-writer-wins, like every
/// [`StagedChangeRepository`] implementation.
#[derive(Default)]
pub struct InMemoryChangeStore {
    entries: Mutex<HashMap<String, Change>>,
}

impl InMemoryChangeStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, Change>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl StagedChangeRepository for InMemoryChangeStore {
    async fn load(&self, project_id: &str) -> Result<Option<Change>> {
        Ok(self.entries().get(project_id).cloned())
    }

    async fn save(&self, project_id: &str, change: &Change) -> Result<()> {
        self.entries()
            .insert(project_id.to_string(), change.clone());
        Ok(())
    }

    async fn clear(&self, project_id: &str) -> Result<()> {
        self.entries().remove(project_id);
        Ok(())
    }
}
