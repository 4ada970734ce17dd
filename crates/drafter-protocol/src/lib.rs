//! Drafter wire protocol: frame types, the codec, and change staging.
//!
//! This crate owns the boundary between wire bytes and the core domain.
//! Everything loose about the protocol (the legacy `kind` discriminator,
//! the two `files` payload shapes, template-root path prefixes) is
//! normalized here so the rest of the engine sees exactly one canonical
//! shape.

pub mod codec;
pub mod frame;
pub mod staging;

pub use codec::{decode_server, encode_client};
pub use frame::{AssistantStatus, ClientFrame, ServerFrame};
pub use staging::{
    ChangeProposal, ProposedFile, ProposedFiles, assemble_change, normalize_display_path,
};
