//! Change review controller.
//!
//! The state machine driving a conversation between `open`, `thinking`,
//! `review`, and the per-change terminal states. Incoming protocol events
//! become store mutations, applied strictly in delivery order; outbound
//! commands (chat, confirm) go through the transport channel, while cancel
//! goes out of band over REST so it works with the socket down.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use drafter_core::{
    Change, ChatMessage, ConversationContext, ConversationStatus, ConversationStore, DrafterError,
    Result, Sender, StagedChangeRepository,
};
use drafter_protocol::frame::{AssistantStatus, ClientFrame, ServerFrame};
use drafter_protocol::staging;
use drafter_transport::channel::FrameSink;
use drafter_transport::event::ChannelEvent;
use drafter_transport::rest::AssistantBackend;

use crate::events::{ConnectionNotice, ReviewEvent, ReviewObserver};

/// Drives one conversation through the change-review lifecycle.
///
/// The controller is the only writer of the conversation status. It owns the
/// store; the channel, backend, and persistence shim are injected trait
/// objects so the machine can be exercised without sockets or disk.
pub struct ReviewController {
    store: ConversationStore,
    sink: Arc<dyn FrameSink>,
    backend: Arc<dyn AssistantBackend>,
    changes: Arc<dyn StagedChangeRepository>,
    observer: Arc<dyn ReviewObserver>,
    pending_confirm: bool,
    pending_cancel: bool,
}

impl ReviewController {
    /// Creates a controller for a fresh conversation in the given context.
    ///
    /// The observer is registered here, once; all notifications flow through
    /// it as typed events.
    pub fn new(
        context: ConversationContext,
        sink: Arc<dyn FrameSink>,
        backend: Arc<dyn AssistantBackend>,
        changes: Arc<dyn StagedChangeRepository>,
        observer: Arc<dyn ReviewObserver>,
    ) -> Self {
        Self {
            store: ConversationStore::new(context),
            sink,
            backend,
            changes,
            observer,
            pending_confirm: false,
            pending_cancel: false,
        }
    }

    /// Bootstraps the conversation.
    ///
    /// Obtains a backend conversation id if none is known yet, then restores
    /// any staged change persisted for the project so a reload resumes the
    /// review in progress. The restored change is shown, never applied
    /// automatically.
    pub async fn start(&mut self) -> Result<()> {
        if self.store.id().is_none() {
            match self.backend.create_conversation(self.store.context()).await {
                Ok(id) => self.store.set_id(id),
                Err(err) if err.is_auth_missing() => {
                    // Read-only mode; the channel surfaces the same signal.
                    warn!("starting conversation without a credential");
                }
                Err(err) => return Err(err),
            }
        }

        let project_id = self.store.context().project_id.clone();
        if let Some(change) = self.changes.load(&project_id).await? {
            debug!(change_id = %change.change_id, "restoring persisted staged change");
            self.store.stage(change.clone());
            self.set_status(ConversationStatus::Review);
            self.emit(ReviewEvent::DiffRestored(change));
        }
        Ok(())
    }

    /// Read access to the conversation.
    pub fn conversation(&self) -> &drafter_core::Conversation {
        self.store.conversation()
    }

    /// Current conversation status.
    pub fn status(&self) -> ConversationStatus {
        self.store.status()
    }

    /// The change currently under review, if any.
    pub fn staged_change(&self) -> Option<&Change> {
        self.store.staged()
    }

    /// Sends a user message over the channel.
    ///
    /// Allowed only while the conversation is `Open`. With the socket down
    /// the call is rejected (nothing is queued across reconnects) and a
    /// visible notice lands in the log; callers may then choose
    /// [`send_message_fallback`](Self::send_message_fallback) explicitly.
    pub async fn send_message(&mut self, text: &str) -> Result<()> {
        if !self.store.status().accepts_input() {
            return Err(DrafterError::Rejected(format!(
                "conversation does not accept input while {:?}",
                self.store.status()
            )));
        }

        self.append(ChatMessage::user(text));
        let frame = ClientFrame::ChatMessage {
            text: text.to_string(),
        };
        match self.sink.send_frame(&frame) {
            Ok(()) => {
                self.set_status(ConversationStatus::Thinking);
                Ok(())
            }
            Err(err) if err.is_not_connected() => {
                self.append_notice(
                    "Not connected to the assistant. Retry after the connection is restored.",
                );
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    /// Sends a user message through the REST fallback.
    ///
    /// An explicit caller choice for when the socket is unavailable; the
    /// message goes out immediately rather than being queued for replay.
    pub async fn send_message_fallback(&mut self, text: &str) -> Result<()> {
        if !self.store.status().accepts_input() {
            return Err(DrafterError::Rejected(format!(
                "conversation does not accept input while {:?}",
                self.store.status()
            )));
        }
        let Some(conversation_id) = self.store.id().map(str::to_string) else {
            return Err(DrafterError::Rejected(
                "conversation has no backend id yet".to_string(),
            ));
        };

        self.append(ChatMessage::user(text));
        let file_type = self.file_type();
        match self
            .backend
            .send_message(&conversation_id, text, file_type.as_deref())
            .await
        {
            Ok(()) => {
                self.set_status(ConversationStatus::Thinking);
                Ok(())
            }
            Err(err) => {
                self.append_notice(&format!("The assistant is unreachable: {err}"));
                Err(err)
            }
        }
    }

    /// Applies the staged change.
    ///
    /// A `change_id` that does not match the staged change is stale (it
    /// raced a superseding proposal) and is ignored rather than applied.
    /// Duplicate submissions while a round-trip is in flight are rejected,
    /// not queued. On success the conversation passes through `Closed` and
    /// returns to `Open`.
    pub async fn confirm(&mut self, change_id: &str) -> Result<()> {
        if !self.store.staged_matches(change_id) {
            warn!(change_id, "ignoring confirm for a change that is not staged");
            return Err(DrafterError::stale(change_id));
        }
        if self.pending_confirm || self.pending_cancel {
            return Err(DrafterError::Rejected(
                "a change submission is already in flight".to_string(),
            ));
        }

        self.pending_confirm = true;
        let frame = ClientFrame::ConfirmChanges {
            change_id: change_id.to_string(),
        };
        let sent = match self.sink.send_frame(&frame) {
            Ok(()) => Ok(()),
            Err(err) if err.is_not_connected() => {
                // The socket is down; the REST fallback can still apply it.
                self.backend.confirm_change(change_id).await
            }
            Err(err) => Err(err),
        };
        self.pending_confirm = false;

        match sent {
            Ok(()) => {
                self.set_status(ConversationStatus::Closed);
                self.store.clear_staged();
                self.emit(ReviewEvent::DiffCleared {
                    change_id: change_id.to_string(),
                });
                self.persist_clear().await;
                self.set_status(ConversationStatus::Open);
                Ok(())
            }
            Err(err) => {
                self.append_notice(&format!("Could not apply the change: {err}"));
                Err(err)
            }
        }
    }

    /// Discards the staged change.
    ///
    /// The local clear is optimistic: state, persistence, and observers are
    /// updated before the backend round-trip, and a failed backend cancel is
    /// not rolled back; it only leaves a visible trace in the log. The
    /// request itself goes over REST so it succeeds with the socket down.
    pub async fn cancel(&mut self, change_id: &str) -> Result<()> {
        if !self.store.staged_matches(change_id) {
            warn!(change_id, "ignoring cancel for a change that is not staged");
            return Err(DrafterError::stale(change_id));
        }
        if self.pending_confirm || self.pending_cancel {
            return Err(DrafterError::Rejected(
                "a change submission is already in flight".to_string(),
            ));
        }

        self.pending_cancel = true;
        self.set_status(ConversationStatus::Cancelled);
        self.store.clear_staged();
        self.emit(ReviewEvent::DiffCleared {
            change_id: change_id.to_string(),
        });
        self.persist_clear().await;
        self.set_status(ConversationStatus::Open);

        let result = self.backend.cancel_change(change_id).await;
        self.pending_cancel = false;
        if let Err(err) = result {
            warn!(error = %err, change_id, "backend cancel failed after local clear");
            self.append_notice(&format!("The assistant could not cancel the change: {err}"));
            return Err(err);
        }
        Ok(())
    }

    /// Applies one channel event.
    ///
    /// Events must be fed in the exact order the transport delivered them;
    /// the controller never reorders or coalesces frames.
    pub async fn handle_channel_event(&mut self, event: ChannelEvent) {
        match event {
            ChannelEvent::Connected => {
                self.emit(ReviewEvent::Connection(ConnectionNotice::Connected));
            }
            ChannelEvent::Reconnecting { attempt, delay } => {
                self.emit(ReviewEvent::Connection(ConnectionNotice::Reconnecting {
                    attempt,
                    delay,
                }));
            }
            ChannelEvent::Disconnected => {
                self.emit(ReviewEvent::Connection(ConnectionNotice::Disconnected));
            }
            ChannelEvent::Exhausted { attempts } => {
                self.clear_thinking();
                self.append_notice(
                    "Lost the connection to the assistant. Reload the page to reconnect.",
                );
                self.emit(ReviewEvent::Connection(ConnectionNotice::Exhausted {
                    attempts,
                }));
            }
            ChannelEvent::AuthMissing => {
                self.append_notice(
                    "Sign in to chat with the assistant. The editor stays available read-only.",
                );
                self.emit(ReviewEvent::Connection(ConnectionNotice::AuthMissing));
            }
            ChannelEvent::Frame(frame) => self.handle_frame(frame).await,
        }
    }

    /// Convenience driver: drains channel events until the channel closes.
    pub async fn run(mut self, mut events: mpsc::UnboundedReceiver<ChannelEvent>) -> Self {
        while let Some(event) = events.recv().await {
            self.handle_channel_event(event).await;
        }
        self
    }

    async fn handle_frame(&mut self, frame: ServerFrame) {
        match frame {
            ServerFrame::ConnectionEstablished => {
                debug!("assistant handshake complete");
            }
            ServerFrame::Status { status } => {
                if self.store.status().in_review() {
                    // The busy indicator is meaningful only outside review; a
                    // background status frame must not knock us out of it.
                    debug!(?status, "ignoring status frame during review");
                    return;
                }
                match status {
                    AssistantStatus::Thinking => self.set_status(ConversationStatus::Thinking),
                    AssistantStatus::Idle => self.set_status(ConversationStatus::Open),
                }
            }
            ServerFrame::ChatMessage { sender, text } => {
                let message = match sender {
                    Sender::User => ChatMessage::user(text),
                    Sender::Assistant => ChatMessage::assistant(text),
                };
                self.append(message);
                if sender == Sender::Assistant {
                    self.clear_thinking();
                }
            }
            ServerFrame::ShowDiffModal(proposal) => match staging::assemble_change(proposal) {
                Ok(change) => self.stage_change(change).await,
                Err(err) => {
                    // An empty proposal is handled exactly like an error
                    // frame; the review modal is never shown with nothing in
                    // it.
                    warn!(error = %err, "rejected change proposal");
                    self.handle_error_frame(err.to_string()).await;
                }
            },
            ServerFrame::Error { message } | ServerFrame::ConnectionError { message } => {
                self.handle_error_frame(message).await;
            }
            ServerFrame::Ping | ServerFrame::Pong => {
                // Keep-alive echoes are consumed by the channel already.
            }
        }
    }

    async fn stage_change(&mut self, change: Change) {
        if let Some(replaced) = self.store.stage(change.clone()) {
            // A newer proposal silently supersedes the one under review.
            debug!(
                replaced = %replaced.change_id,
                staged = %change.change_id,
                "replacing staged change"
            );
        }
        self.set_status(ConversationStatus::Review);

        // This instance received the proposal, so it is the writer.
        let project_id = self.store.context().project_id.clone();
        if let Err(err) = self.changes.save(&project_id, &change).await {
            warn!(error = %err, "failed to persist staged change");
        }
        self.emit(ReviewEvent::DiffStaged(change));
    }

    /// Error frames never leave the conversation stuck in `thinking` or
    /// `review`: any staged change is discarded locally and the conversation
    /// returns to `open` with the error visible in the log.
    async fn handle_error_frame(&mut self, message: String) {
        if let Some(stale) = self.store.clear_staged() {
            self.emit(ReviewEvent::DiffCleared {
                change_id: stale.change_id,
            });
            self.persist_clear().await;
        }
        self.append(ChatMessage::assistant(message));
        self.set_status(ConversationStatus::Open);
    }

    fn set_status(&mut self, status: ConversationStatus) {
        if self.store.status() != status {
            self.store.set_status(status);
            self.emit(ReviewEvent::StatusChanged(status));
        }
    }

    fn clear_thinking(&mut self) {
        if self.store.status() == ConversationStatus::Thinking {
            self.set_status(ConversationStatus::Open);
        }
    }

    fn append(&mut self, message: ChatMessage) {
        let message = self.store.push(message).clone();
        self.emit(ReviewEvent::MessageAppended(message));
    }

    /// Appends an assistant-sender notice so the user always has an
    /// in-context explanation; no error is swallowed without a trace.
    fn append_notice(&mut self, text: &str) {
        self.append(ChatMessage::assistant(text));
    }

    async fn persist_clear(&self) {
        let project_id = &self.store.context().project_id;
        if let Err(err) = self.changes.clear(project_id).await {
            warn!(error = %err, "failed to clear persisted staged change");
        }
    }

    fn file_type(&self) -> Option<String> {
        self.store
            .context()
            .file_path
            .as_ref()
            .and_then(|path| std::path::Path::new(path).extension())
            .map(|ext| ext.to_string_lossy().into_owned())
    }

    fn emit(&self, event: ReviewEvent) {
        self.observer.on_event(event);
    }
}
