//! Conversation state machine behavior, exercised against recording
//! collaborators instead of sockets and disk.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use drafter_application::{ConnectionNotice, ReviewController, ReviewEvent, ReviewObserver};
use drafter_core::{
    Change, ChangedFile, ConversationContext, ConversationStatus, DrafterError, Result, Sender,
    StagedChangeRepository,
};
use drafter_infrastructure::InMemoryChangeStore;
use drafter_protocol::{ClientFrame, ServerFrame, decode_server};
use drafter_transport::{AssistantBackend, ChannelEvent, FrameSink};

// Recording frame sink standing in for the transport channel.
#[derive(Default)]
struct RecordingSink {
    connected: AtomicBool,
    frames: Mutex<Vec<ClientFrame>>,
}

impl RecordingSink {
    fn online() -> Self {
        let sink = Self::default();
        sink.connected.store(true, Ordering::SeqCst);
        sink
    }

    fn sent(&self) -> Vec<ClientFrame> {
        self.frames.lock().unwrap().clone()
    }
}

impl FrameSink for RecordingSink {
    fn send_frame(&self, frame: &ClientFrame) -> Result<()> {
        if !self.is_open() {
            return Err(DrafterError::NotConnected);
        }
        self.frames.lock().unwrap().push(frame.clone());
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

// Recording REST backend.
#[derive(Default)]
struct RecordingBackend {
    confirms: Mutex<Vec<String>>,
    cancels: Mutex<Vec<String>>,
    rest_messages: Mutex<Vec<String>>,
    fail_cancel: AtomicBool,
}

#[async_trait]
impl AssistantBackend for RecordingBackend {
    async fn create_conversation(&self, _context: &ConversationContext) -> Result<String> {
        Ok("conv-1".to_string())
    }

    async fn send_message(
        &self,
        _conversation_id: &str,
        message: &str,
        _file_type: Option<&str>,
    ) -> Result<()> {
        self.rest_messages.lock().unwrap().push(message.to_string());
        Ok(())
    }

    async fn cancel_change(&self, change_id: &str) -> Result<()> {
        if self.fail_cancel.load(Ordering::SeqCst) {
            return Err(DrafterError::backend("cancel endpoint unavailable"));
        }
        self.cancels.lock().unwrap().push(change_id.to_string());
        Ok(())
    }

    async fn confirm_change(&self, change_id: &str) -> Result<()> {
        self.confirms.lock().unwrap().push(change_id.to_string());
        Ok(())
    }
}

#[derive(Default)]
struct CollectingObserver {
    events: Mutex<Vec<ReviewEvent>>,
}

impl CollectingObserver {
    fn events(&self) -> Vec<ReviewEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl ReviewObserver for CollectingObserver {
    fn on_event(&self, event: ReviewEvent) {
        self.events.lock().unwrap().push(event);
    }
}

struct Harness {
    controller: ReviewController,
    sink: Arc<RecordingSink>,
    backend: Arc<RecordingBackend>,
    changes: Arc<InMemoryChangeStore>,
    observer: Arc<CollectingObserver>,
}

fn harness_with_sink(sink: RecordingSink) -> Harness {
    let sink = Arc::new(sink);
    let backend = Arc::new(RecordingBackend::default());
    let changes = Arc::new(InMemoryChangeStore::new());
    let observer = Arc::new(CollectingObserver::default());
    let controller = ReviewController::new(
        ConversationContext::new("p1").with_file("templates/index.html"),
        sink.clone(),
        backend.clone(),
        changes.clone(),
        observer.clone(),
    );
    Harness {
        controller,
        sink,
        backend,
        changes,
        observer,
    }
}

fn harness() -> Harness {
    harness_with_sink(RecordingSink::online())
}

fn diff_frame(change_id: &str) -> ServerFrame {
    let raw = format!(
        concat!(
            r#"{{"type":"show_diff_modal","#,
            r#""files":{{"templates/a.html":"<p>new</p>"}},"#,
            r#""diff":{{"templates/a.html":"<p>old</p>"}},"#,
            r#""change_id":"{}"}}"#,
        ),
        change_id
    );
    decode_server(&raw).remove(0)
}

async fn stage(harness: &mut Harness, change_id: &str) {
    harness
        .controller
        .handle_channel_event(ChannelEvent::Frame(diff_frame(change_id)))
        .await;
    assert_eq!(harness.controller.status(), ConversationStatus::Review);
}

#[tokio::test]
async fn send_message_appends_and_enters_thinking() {
    let mut h = harness();

    h.controller.send_message("add a field").await.unwrap();

    let conversation = h.controller.conversation();
    assert_eq!(conversation.messages.len(), 1);
    assert_eq!(conversation.messages[0].sender, Sender::User);
    assert_eq!(conversation.messages[0].text, "add a field");
    assert_eq!(h.controller.status(), ConversationStatus::Thinking);
    assert_eq!(
        h.sink.sent(),
        vec![ClientFrame::ChatMessage {
            text: "add a field".to_string()
        }]
    );
}

#[tokio::test]
async fn send_message_is_rejected_offline_without_queueing() {
    let mut h = harness_with_sink(RecordingSink::default());

    let err = h.controller.send_message("hello").await.unwrap_err();

    assert!(err.is_not_connected());
    assert!(h.sink.sent().is_empty());
    // The user message plus a visible notice; nothing waits for replay.
    let conversation = h.controller.conversation();
    assert_eq!(conversation.messages.len(), 2);
    assert_eq!(conversation.messages[1].sender, Sender::Assistant);
    assert_eq!(h.controller.status(), ConversationStatus::Open);
}

#[tokio::test]
async fn explicit_rest_fallback_sends_without_socket() {
    let mut h = harness_with_sink(RecordingSink::default());
    h.controller.start().await.unwrap();

    h.controller.send_message_fallback("hello").await.unwrap();

    assert_eq!(
        h.backend.rest_messages.lock().unwrap().clone(),
        vec!["hello".to_string()]
    );
    assert_eq!(h.controller.status(), ConversationStatus::Thinking);
}

#[tokio::test]
async fn assistant_reply_clears_thinking() {
    let mut h = harness();
    h.controller.send_message("hi").await.unwrap();

    h.controller
        .handle_channel_event(ChannelEvent::Frame(ServerFrame::ChatMessage {
            sender: Sender::Assistant,
            text: "done".to_string(),
        }))
        .await;

    assert_eq!(h.controller.status(), ConversationStatus::Open);
    let texts: Vec<&str> = h
        .controller
        .conversation()
        .messages
        .iter()
        .map(|m| m.text.as_str())
        .collect();
    assert_eq!(texts, vec!["hi", "done"]);
}

#[tokio::test]
async fn idle_status_frame_clears_thinking() {
    let mut h = harness();
    h.controller.send_message("hi").await.unwrap();
    assert_eq!(h.controller.status(), ConversationStatus::Thinking);

    let frames = decode_server(r#"{"type":"status","status":"idle"}"#);
    h.controller
        .handle_channel_event(ChannelEvent::Frame(frames[0].clone()))
        .await;

    assert_eq!(h.controller.status(), ConversationStatus::Open);
}

#[tokio::test]
async fn diff_proposal_stages_canonical_change() {
    let mut h = harness();

    stage(&mut h, "c1").await;

    let staged = h.controller.staged_change().unwrap();
    assert_eq!(staged.change_id, "c1");
    assert_eq!(
        staged.files,
        vec![ChangedFile {
            file_path: "a.html".to_string(),
            before: "<p>old</p>".to_string(),
            after: "<p>new</p>".to_string(),
        }]
    );
    // The receiving instance persists the staged change for reload recovery.
    let persisted = h.changes.load("p1").await.unwrap().unwrap();
    assert_eq!(persisted.change_id, "c1");
    assert!(
        h.observer
            .events()
            .iter()
            .any(|e| matches!(e, ReviewEvent::DiffStaged(c) if c.change_id == "c1"))
    );
}

#[tokio::test]
async fn newer_proposal_silently_replaces_staged_change() {
    let mut h = harness();
    stage(&mut h, "c1").await;
    stage(&mut h, "c2").await;

    assert_eq!(h.controller.staged_change().unwrap().change_id, "c2");
    assert_eq!(
        h.changes.load("p1").await.unwrap().unwrap().change_id,
        "c2"
    );
    assert_eq!(h.controller.status(), ConversationStatus::Review);
}

#[tokio::test]
async fn stale_confirm_is_a_noop() {
    let mut h = harness();
    stage(&mut h, "c2").await;

    let err = h.controller.confirm("c1").await.unwrap_err();

    assert_eq!(
        err,
        DrafterError::StaleChangeReference {
            change_id: "c1".to_string()
        }
    );
    assert_eq!(h.controller.status(), ConversationStatus::Review);
    assert_eq!(h.controller.staged_change().unwrap().change_id, "c2");
    // No confirm frame went out.
    assert!(
        !h.sink
            .sent()
            .iter()
            .any(|f| matches!(f, ClientFrame::ConfirmChanges { .. }))
    );
}

#[tokio::test]
async fn confirm_applies_and_returns_to_open() {
    let mut h = harness();
    stage(&mut h, "c1").await;

    h.controller.confirm("c1").await.unwrap();

    assert_eq!(
        h.sink.sent(),
        vec![ClientFrame::ConfirmChanges {
            change_id: "c1".to_string()
        }]
    );
    assert!(h.controller.staged_change().is_none());
    assert_eq!(h.controller.status(), ConversationStatus::Open);
    assert!(h.changes.load("p1").await.unwrap().is_none());

    // The conversation passed through the applied terminal state.
    let statuses: Vec<ConversationStatus> = h
        .observer
        .events()
        .iter()
        .filter_map(|e| match e {
            ReviewEvent::StatusChanged(s) => Some(*s),
            _ => None,
        })
        .collect();
    assert_eq!(
        statuses,
        vec![
            ConversationStatus::Review,
            ConversationStatus::Closed,
            ConversationStatus::Open,
        ]
    );
}

#[tokio::test]
async fn confirm_falls_back_to_rest_when_socket_is_down() {
    let mut h = harness();
    stage(&mut h, "c1").await;
    h.sink.connected.store(false, Ordering::SeqCst);

    h.controller.confirm("c1").await.unwrap();

    assert_eq!(
        h.backend.confirms.lock().unwrap().clone(),
        vec!["c1".to_string()]
    );
    assert!(h.controller.staged_change().is_none());
    assert_eq!(h.controller.status(), ConversationStatus::Open);
}

#[tokio::test]
async fn cancel_clears_locally_even_when_backend_fails() {
    let mut h = harness();
    stage(&mut h, "c1").await;
    h.backend.fail_cancel.store(true, Ordering::SeqCst);

    let err = h.controller.cancel("c1").await.unwrap_err();

    // Optimistic clear: not rolled back, but the failure leaves a trace.
    assert!(matches!(err, DrafterError::Backend { .. }));
    assert!(h.controller.staged_change().is_none());
    assert_eq!(h.controller.status(), ConversationStatus::Open);
    assert!(h.changes.load("p1").await.unwrap().is_none());
    let last = h.controller.conversation().messages.last().unwrap();
    assert_eq!(last.sender, Sender::Assistant);
    assert!(last.text.contains("could not cancel"));
}

#[tokio::test]
async fn cancel_goes_out_of_band_over_rest() {
    let mut h = harness();
    stage(&mut h, "c1").await;

    h.controller.cancel("c1").await.unwrap();

    assert_eq!(
        h.backend.cancels.lock().unwrap().clone(),
        vec!["c1".to_string()]
    );
    // Nothing about the cancel crossed the socket.
    assert!(h.sink.sent().is_empty());

    let statuses: Vec<ConversationStatus> = h
        .observer
        .events()
        .iter()
        .filter_map(|e| match e {
            ReviewEvent::StatusChanged(s) => Some(*s),
            _ => None,
        })
        .collect();
    assert_eq!(
        statuses,
        vec![
            ConversationStatus::Review,
            ConversationStatus::Cancelled,
            ConversationStatus::Open,
        ]
    );
}

#[tokio::test]
async fn stale_cancel_is_a_noop() {
    let mut h = harness();
    stage(&mut h, "c2").await;

    let err = h.controller.cancel("c1").await.unwrap_err();

    assert!(matches!(err, DrafterError::StaleChangeReference { .. }));
    assert_eq!(h.controller.status(), ConversationStatus::Review);
    assert!(h.backend.cancels.lock().unwrap().is_empty());
}

#[tokio::test]
async fn error_frame_recovers_from_review() {
    let mut h = harness();
    stage(&mut h, "c1").await;

    h.controller
        .handle_channel_event(ChannelEvent::Frame(ServerFrame::Error {
            message: "generation failed".to_string(),
        }))
        .await;

    assert!(h.controller.staged_change().is_none());
    assert_eq!(h.controller.status(), ConversationStatus::Open);
    let last = h.controller.conversation().messages.last().unwrap();
    assert_eq!(last.sender, Sender::Assistant);
    assert_eq!(last.text, "generation failed");
}

#[tokio::test]
async fn error_frame_recovers_from_thinking() {
    let mut h = harness();
    h.controller.send_message("hi").await.unwrap();

    let frames = decode_server(r#"{"kind":"connection_error","message":"backend hiccup"}"#);
    h.controller
        .handle_channel_event(ChannelEvent::Frame(frames[0].clone()))
        .await;

    assert_eq!(h.controller.status(), ConversationStatus::Open);
}

#[tokio::test]
async fn empty_proposal_is_surfaced_as_error() {
    let mut h = harness();

    let frames =
        decode_server(r#"{"type":"show_diff_modal","files":[],"change_id":"c9"}"#);
    h.controller
        .handle_channel_event(ChannelEvent::Frame(frames[0].clone()))
        .await;

    assert!(h.controller.staged_change().is_none());
    assert_eq!(h.controller.status(), ConversationStatus::Open);
    let last = h.controller.conversation().messages.last().unwrap();
    assert_eq!(last.sender, Sender::Assistant);
}

#[tokio::test]
async fn start_restores_persisted_change_for_review() {
    let mut h = harness();
    let change = Change {
        change_id: "c-restored".to_string(),
        files: vec![ChangedFile {
            file_path: "a.html".to_string(),
            before: "old".to_string(),
            after: "new".to_string(),
        }],
        preview_map: None,
    };
    h.changes.save("p1", &change).await.unwrap();

    h.controller.start().await.unwrap();

    assert_eq!(h.controller.conversation().id.as_deref(), Some("conv-1"));
    assert_eq!(
        h.controller.staged_change().unwrap().change_id,
        "c-restored"
    );
    assert_eq!(h.controller.status(), ConversationStatus::Review);
    // Restored for review, never auto-applied.
    assert!(h.sink.sent().is_empty());
    assert!(h.backend.confirms.lock().unwrap().is_empty());
    assert!(
        h.observer
            .events()
            .iter()
            .any(|e| matches!(e, ReviewEvent::DiffRestored(c) if c.change_id == "c-restored"))
    );
}

#[tokio::test]
async fn exhaustion_leaves_a_visible_trace() {
    let mut h = harness();

    h.controller
        .handle_channel_event(ChannelEvent::Exhausted { attempts: 5 })
        .await;

    let last = h.controller.conversation().messages.last().unwrap();
    assert_eq!(last.sender, Sender::Assistant);
    assert!(
        h.observer
            .events()
            .iter()
            .any(|e| matches!(
                e,
                ReviewEvent::Connection(ConnectionNotice::Exhausted { attempts: 5 })
            ))
    );
}

#[tokio::test]
async fn auth_missing_keeps_conversation_readable() {
    let mut h = harness();

    h.controller.handle_channel_event(ChannelEvent::AuthMissing).await;

    assert_eq!(h.controller.status(), ConversationStatus::Open);
    let last = h.controller.conversation().messages.last().unwrap();
    assert_eq!(last.sender, Sender::Assistant);
}

#[tokio::test]
async fn status_frames_are_ignored_during_review() {
    let mut h = harness();
    stage(&mut h, "c1").await;

    let frames = decode_server(r#"{"type":"status","status":"thinking"}"#);
    h.controller
        .handle_channel_event(ChannelEvent::Frame(frames[0].clone()))
        .await;

    assert_eq!(h.controller.status(), ConversationStatus::Review);
}

#[tokio::test]
async fn status_stays_within_the_defined_set_for_any_frame_sequence() {
    let mut h = harness();
    let sequence = vec![
        ChannelEvent::Connected,
        ChannelEvent::Frame(ServerFrame::ConnectionEstablished),
        ChannelEvent::Frame(decode_server(r#"{"type":"status","status":"thinking"}"#).remove(0)),
        ChannelEvent::Frame(diff_frame("c1")),
        ChannelEvent::Frame(ServerFrame::Error {
            message: "oops".to_string(),
        }),
        ChannelEvent::Frame(diff_frame("c2")),
        ChannelEvent::Frame(decode_server(r#"{"type":"status","status":"idle"}"#).remove(0)),
        ChannelEvent::Disconnected,
        ChannelEvent::Frame(ServerFrame::ChatMessage {
            sender: Sender::Assistant,
            text: "hello".to_string(),
        }),
    ];

    for event in sequence {
        h.controller.handle_channel_event(event).await;
        // Every intermediate state is one of the five defined states; the
        // enum makes that structural, so assert the store agrees with the
        // events the observer saw.
        let status = h.controller.status();
        assert!(matches!(
            status,
            ConversationStatus::Open
                | ConversationStatus::Thinking
                | ConversationStatus::Review
                | ConversationStatus::Closed
                | ConversationStatus::Cancelled
        ));
    }
}
