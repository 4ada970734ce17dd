//! Channel endpoint and connect-URL construction.

use drafter_core::{ConversationContext, DrafterError, Result};
use url::Url;

/// Where, and as whom, a channel connects.
///
/// One endpoint per (project, context) pair; the context is immutable for
/// the lifetime of the conversation it serves.
#[derive(Debug, Clone)]
pub struct ChannelEndpoint {
    base_url: Url,
    context: ConversationContext,
    token: Option<String>,
}

impl ChannelEndpoint {
    /// Creates an endpoint. The base URL must use the `ws` or `wss` scheme.
    pub fn new(
        base_url: Url,
        context: ConversationContext,
        token: Option<String>,
    ) -> Result<Self> {
        if base_url.scheme() != "ws" && base_url.scheme() != "wss" {
            return Err(DrafterError::internal(format!(
                "channel URL must use ws:// or wss://, got: {}",
                base_url.scheme()
            )));
        }
        Ok(Self {
            base_url,
            context,
            token,
        })
    }

    /// The conversation scope this endpoint serves.
    pub fn context(&self) -> &ConversationContext {
        &self.context
    }

    /// Whether a bearer credential is available.
    pub fn has_credentials(&self) -> bool {
        self.token.is_some()
    }

    /// Builds the connect URL: the project-scoped assistant path plus the
    /// `token`, `app_name`, and `file_path` query parameters that select the
    /// conversation's context server-side.
    pub fn connect_url(&self) -> Result<Url> {
        let token = self.token.as_deref().ok_or(DrafterError::AuthMissing)?;

        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| DrafterError::internal("channel URL cannot be a base"))?
            .pop_if_empty()
            .extend(["projects", &self.context.project_id, "assistant"]);

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("token", token);
            if let Some(app_name) = &self.context.app_name {
                query.append_pair("app_name", app_name);
            }
            if let Some(file_path) = &self.context.file_path {
                query.append_pair("file_path", file_path);
            }
        }

        Ok(url)
    }
}
