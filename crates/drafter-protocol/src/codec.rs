//! Wire codec.
//!
//! Converts wire text to typed frames and back. The wire format is UTF-8
//! JSON with a `type` discriminator; legacy envelopes use `kind`. Both are
//! accepted on decode and normalized here, once, at the edge, so the rest
//! of the engine only sees [`ServerFrame`]. Unknown or unparseable
//! envelopes are logged and dropped; they must never crash the channel.

use crate::frame::{ClientFrame, ServerFrame};
use drafter_core::Result;
use serde_json::Value;
use tracing::warn;

/// Encodes a client frame as a single JSON envelope.
pub fn encode_client(frame: &ClientFrame) -> Result<String> {
    Ok(serde_json::to_string(frame)?)
}

/// Decodes one network read into an ordered frame queue.
///
/// A single read may carry several whitespace- or newline-separated
/// envelopes; they are split here and returned in arrival order so the
/// controller can drain them one at a time. Envelopes that fail to parse
/// are dropped with a warning.
pub fn decode_server(payload: &str) -> Vec<ServerFrame> {
    let mut frames = Vec::new();
    let mut values = serde_json::Deserializer::from_str(payload).into_iter::<Value>();
    loop {
        match values.next() {
            Some(Ok(value)) => frames.extend(decode_envelope(value)),
            Some(Err(err)) => {
                // A syntax error leaves no resync point; drop the rest.
                warn!(error = %err, "dropping undecodable frame payload");
                break;
            }
            None => break,
        }
    }
    frames
}

fn decode_envelope(mut value: Value) -> Option<ServerFrame> {
    // Legacy envelopes discriminate on `kind`. When both fields are present
    // `type` wins.
    if let Some(object) = value.as_object_mut() {
        if !object.contains_key("type") {
            if let Some(kind) = object.remove("kind") {
                object.insert("type".to_string(), kind);
            }
        }
    }

    match serde_json::from_value::<ServerFrame>(value) {
        Ok(frame) => Some(frame),
        Err(err) => {
            warn!(error = %err, "dropping unrecognized frame");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::AssistantStatus;
    use drafter_core::Sender;

    #[test]
    fn encodes_client_frames_with_type_discriminator() {
        let ping = encode_client(&ClientFrame::Ping).unwrap();
        assert_eq!(ping, r#"{"type":"ping"}"#);

        let confirm = encode_client(&ClientFrame::ConfirmChanges {
            change_id: "c1".to_string(),
        })
        .unwrap();
        assert_eq!(confirm, r#"{"type":"confirm_changes","change_id":"c1"}"#);
    }

    #[test]
    fn decodes_type_discriminator() {
        let frames = decode_server(r#"{"type":"status","status":"thinking"}"#);
        assert_eq!(
            frames,
            vec![ServerFrame::Status {
                status: AssistantStatus::Thinking
            }]
        );
    }

    #[test]
    fn decodes_legacy_kind_discriminator() {
        let frames =
            decode_server(r#"{"kind":"chat_message","sender":"assistant","text":"hello"}"#);
        assert_eq!(
            frames,
            vec![ServerFrame::ChatMessage {
                sender: Sender::Assistant,
                text: "hello".to_string(),
            }]
        );
    }

    #[test]
    fn type_wins_when_both_discriminators_present() {
        let frames = decode_server(r#"{"type":"pong","kind":"ping"}"#);
        assert_eq!(frames, vec![ServerFrame::Pong]);
    }

    #[test]
    fn splits_multi_frame_reads_in_order() {
        let payload = concat!(
            r#"{"type":"connection_established"}"#,
            "\n",
            r#"{"type":"status","status":"idle"}"#,
            "\n",
            r#"{"type":"chat_message","sender":"user","text":"hi"}"#,
        );

        let frames = decode_server(payload);
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0], ServerFrame::ConnectionEstablished);
        assert_eq!(
            frames[1],
            ServerFrame::Status {
                status: AssistantStatus::Idle
            }
        );
        assert!(matches!(frames[2], ServerFrame::ChatMessage { .. }));
    }

    #[test]
    fn unknown_discriminators_are_dropped_not_fatal() {
        let payload = concat!(
            r#"{"type":"telemetry","count":3}"#,
            "\n",
            r#"{"type":"pong"}"#,
        );

        let frames = decode_server(payload);
        assert_eq!(frames, vec![ServerFrame::Pong]);
    }

    #[test]
    fn malformed_payload_is_a_noop() {
        assert!(decode_server("not json at all").is_empty());
        assert!(decode_server("").is_empty());
        assert!(decode_server("   \n  ").is_empty());
    }
}
