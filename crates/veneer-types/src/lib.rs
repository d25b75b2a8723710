//! Shared identity and change-event types for veneer.
//!
//! This crate is the leaf of the workspace: URIs, content hashes, file
//! identities, file kinds, and the decoded editor change events that drive
//! the overlay cache in `veneer-fs`. It has **no internal veneer
//! dependencies**.
//!
//! # Key Types
//!
//! |-------------------|----------------------------------------------|
//! | Type              | Purpose                                      |
//! |-------------------|----------------------------------------------|
//! | [`DocumentUri`]   | Canonical file identifier (`file://...`)     |
//! | [`ContentHash`]   | BLAKE3 digest of file bytes                  |
//! | [`FileIdentity`]  | URI + hash: "these exact bytes at this path" |
//! | [`FileKind`]      | Classification fixed at open time            |
//! | [`FileAction`]    | Lifecycle action of a change event           |
//! | [`Modification`]  | One decoded change event                     |
//! |-------------------|----------------------------------------------|

pub mod hash;
pub mod identity;
pub mod kind;
pub mod modification;
pub mod uri;

// Re-export primary types at crate root for convenience.
pub use hash::ContentHash;
pub use identity::FileIdentity;
pub use kind::FileKind;
pub use modification::{FileAction, Modification};
pub use uri::DocumentUri;
