//! Change staging and diff assembly.
//!
//! The backend proposes changes in two shapes: `files` as an ordered list of
//! per-file objects, or `files` as a path→content map plus a parallel `diff`
//! map holding the "before" text. Both are normalized here, once, into the
//! canonical [`Change`] so the store and controller only ever see one shape.

use std::collections::BTreeMap;

use drafter_core::{Change, ChangedFile, DrafterError, PreviewMap, Result};
use serde::{Deserialize, Serialize};

/// Root prefix stripped from display paths.
pub const TEMPLATE_ROOT: &str = "templates/";

/// The loose `show_diff_modal` payload as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeProposal {
    /// Opaque identifier for this proposal.
    pub change_id: String,
    /// File contents, in either backend shape.
    pub files: ProposedFiles,
    /// "Before" text per path; only sent alongside the map shape.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff: Option<BTreeMap<String, String>>,
    /// Rendered before/after preview links.
    #[serde(
        default,
        rename = "previewMap",
        alias = "preview_map",
        skip_serializing_if = "Option::is_none"
    )]
    pub preview_map: Option<PreviewMap>,
}

/// The two shapes `files` may take on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProposedFiles {
    /// Ordered list of per-file objects carrying their own snapshots.
    List(Vec<ProposedFile>),
    /// Unordered path→content map; "before" text lives in the sibling
    /// `diff` map.
    Map(BTreeMap<String, String>),
}

/// One entry of the list-shaped `files` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposedFile {
    /// Path as sent by the backend, template root still attached.
    #[serde(alias = "filePath", alias = "path")]
    pub file_path: String,
    /// Full file content before the change.
    #[serde(default)]
    pub before: String,
    /// Full file content after the change.
    #[serde(default)]
    pub after: String,
}

/// Strips the fixed template-root prefix from a display path.
///
/// Idempotent: an already-stripped path comes back unchanged.
pub fn normalize_display_path(path: &str) -> &str {
    path.strip_prefix(TEMPLATE_ROOT).unwrap_or(path)
}

/// Normalizes a proposal into the canonical [`Change`].
///
/// The list shape keeps its order; the map shape is unordered on the wire,
/// so entries are emitted sorted by display path. Fails with
/// [`DrafterError::EmptyChangeSet`] when normalization yields no files;
/// the review modal is never shown with nothing to review.
pub fn assemble_change(proposal: ChangeProposal) -> Result<Change> {
    let files: Vec<ChangedFile> = match proposal.files {
        ProposedFiles::List(entries) => entries
            .into_iter()
            .map(|entry| ChangedFile {
                file_path: normalize_display_path(&entry.file_path).to_string(),
                before: entry.before,
                after: entry.after,
            })
            .collect(),
        ProposedFiles::Map(contents) => {
            let diff = proposal.diff.unwrap_or_default();
            contents
                .into_iter()
                .map(|(path, after)| ChangedFile {
                    before: diff.get(&path).cloned().unwrap_or_default(),
                    file_path: normalize_display_path(&path).to_string(),
                    after,
                })
                .collect()
        }
    };

    if files.is_empty() {
        return Err(DrafterError::EmptyChangeSet);
    }

    Ok(Change {
        change_id: proposal.change_id,
        files,
        preview_map: proposal.preview_map,
    })
}
