//! REST collaborators for the assistant backend.
//!
//! These are plain request/response services consumed around the duplex
//! channel. Cancellation goes through here on purpose: discarding a staged
//! change must succeed even when the socket is down.

use async_trait::async_trait;
use drafter_core::{ConversationContext, DrafterError, Result};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use url::Url;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// The request/response endpoints the review engine consumes.
///
/// A trait seam so the controller can be exercised against a recording
/// backend in tests.
#[async_trait]
pub trait AssistantBackend: Send + Sync {
    /// Creates a conversation scoped to `context` and returns the
    /// backend-assigned id.
    async fn create_conversation(&self, context: &ConversationContext) -> Result<String>;

    /// Sends a chat message over REST when the socket is unavailable.
    async fn send_message(
        &self,
        conversation_id: &str,
        message: &str,
        file_type: Option<&str>,
    ) -> Result<()>;

    /// Discards a staged change.
    async fn cancel_change(&self, change_id: &str) -> Result<()>;

    /// Applies a staged change when the socket frame cannot be sent.
    async fn confirm_change(&self, change_id: &str) -> Result<()>;
}

/// `reqwest`-backed implementation of [`AssistantBackend`].
#[derive(Clone)]
pub struct AssistantApi {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl AssistantApi {
    /// Creates a client for the given API base URL and bearer credential.
    pub fn new(base_url: Url, token: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| DrafterError::internal(format!("failed to build HTTP client: {err}")))?;
        Ok(Self {
            client,
            base_url,
            token,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| DrafterError::internal("API base URL cannot be a base"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn post(&self, url: Url, body: serde_json::Value) -> Result<reqwest::Response> {
        let token = self.token.as_deref().ok_or(DrafterError::AuthMissing)?;
        let response = self
            .client
            .post(url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|err| DrafterError::backend(err.to_string()))?;

        // A 401 from any collaborator is the global auth-missing signal,
        // not a protocol-level error.
        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(DrafterError::AuthMissing);
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DrafterError::backend(format!("{status}: {body}")));
        }
        Ok(response)
    }
}

#[derive(Deserialize)]
struct CreatedConversation {
    id: String,
}

#[async_trait]
impl AssistantBackend for AssistantApi {
    async fn create_conversation(&self, context: &ConversationContext) -> Result<String> {
        let url = self.endpoint(&["projects", &context.project_id, "conversations"])?;
        let body = json!({
            "project": context.project_id,
            "app_name": context.app_name,
            "file_path": context.file_path,
        });
        let response = self.post(url, body).await?;
        let created: CreatedConversation = response.json().await.map_err(|err| {
            DrafterError::backend(format!("invalid create-conversation response: {err}"))
        })?;
        Ok(created.id)
    }

    async fn send_message(
        &self,
        conversation_id: &str,
        message: &str,
        file_type: Option<&str>,
    ) -> Result<()> {
        let url = self.endpoint(&["conversations", conversation_id, "messages"])?;
        self.post(url, json!({ "message": message, "file_type": file_type }))
            .await?;
        Ok(())
    }

    async fn cancel_change(&self, change_id: &str) -> Result<()> {
        let url = self.endpoint(&["changes", change_id, "cancel"])?;
        self.post(url, json!({})).await?;
        Ok(())
    }

    async fn confirm_change(&self, change_id: &str) -> Result<()> {
        let url = self.endpoint(&["changes", change_id, "confirm"])?;
        self.post(url, json!({})).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_builds_nested_paths() {
        let api = AssistantApi::new(
            Url::parse("http://127.0.0.1:8000/api").unwrap(),
            Some("tok".to_string()),
        )
        .unwrap();
        let url = api.endpoint(&["changes", "c1", "cancel"]).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8000/api/changes/c1/cancel");
    }

    #[tokio::test]
    async fn missing_token_short_circuits_before_any_request() {
        let api =
            AssistantApi::new(Url::parse("http://127.0.0.1:1/api").unwrap(), None).unwrap();
        let err = api.cancel_change("c1").await.unwrap_err();
        assert_eq!(err, DrafterError::AuthMissing);
    }
}
