//! File identity: a URI pinned to specific content.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::hash::ContentHash;
use crate::uri::DocumentUri;

/// Identifies "these exact bytes at this location".
///
/// Two identities are equal iff both the URI and the hash match, so a
/// consumer can tell whether it has already processed a file's current
/// content without caring whether that content came from disk or an overlay.
#[derive(Clone, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct FileIdentity {
    pub uri: DocumentUri,
    pub hash: ContentHash,
}

impl FileIdentity {
    pub fn new(uri: DocumentUri, hash: ContentHash) -> Self {
        Self { uri, hash }
    }
}

impl fmt::Display for FileIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.uri, self.hash)
    }
}
