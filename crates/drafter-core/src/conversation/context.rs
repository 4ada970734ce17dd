//! Conversation context.

use serde::{Deserialize, Serialize};

/// The project/app/file scope a conversation is bound to.
///
/// Immutable for the conversation's lifetime; the backend uses it to select
/// the conversation's context server-side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationContext {
    /// Owning project identifier.
    pub project_id: String,
    /// Optional application scope within the project.
    #[serde(default)]
    pub app_name: Option<String>,
    /// Optional file scope within the application.
    #[serde(default)]
    pub file_path: Option<String>,
}

impl ConversationContext {
    /// Creates a project-wide context.
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            app_name: None,
            file_path: None,
        }
    }

    /// Narrows the context to an application.
    pub fn with_app(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = Some(app_name.into());
        self
    }

    /// Narrows the context to a single file.
    pub fn with_file(mut self, file_path: impl Into<String>) -> Self {
        self.file_path = Some(file_path.into());
        self
    }
}
