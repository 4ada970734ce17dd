//! Canonical staged-change model.
//!
//! A [`Change`] is a proposed multi-file edit awaiting explicit user
//! confirmation or cancellation. The backend sends proposals in two loose
//! shapes; the protocol crate normalizes both into this canonical form, so
//! the rest of the engine only ever sees one shape.

use serde::{Deserialize, Serialize};

/// A single file touched by a staged change.
///
/// `before` and `after` are full-file text snapshots, not line-diffs; the
/// renderer computes the visual diff from the two snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangedFile {
    /// Display path, with the template-root prefix already stripped.
    pub file_path: String,
    /// Full file content before the change.
    pub before: String,
    /// Full file content after the change.
    pub after: String,
}

/// Links to rendered HTML snapshots of the file set before and after the
/// change. Supplied by the backend, never computed locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewMap {
    /// URL of the rendered "before" snapshot.
    pub before: String,
    /// URL of the rendered "after" snapshot.
    pub after: String,
}

/// A proposed multi-file edit awaiting user confirmation or cancellation.
///
/// Created when the backend emits a `show_diff_modal` event; destroyed when
/// the conversation leaves review via confirm, cancel, or a newer incoming
/// change replacing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    /// Opaque identifier from the backend, unique per staged proposal.
    pub change_id: String,
    /// Ordered file snapshots making up the proposal.
    pub files: Vec<ChangedFile>,
    /// Optional rendered before/after preview links.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_map: Option<PreviewMap>,
}
