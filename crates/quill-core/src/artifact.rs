//! Artifact identity shared between the agent layer and renderers.
//!
//! The kind key is the whole contract: the agent tags document updates
//! with it and the UI looks up its renderer by the same string.

use std::fmt;

use uuid::Uuid;

/// Kind key for the markdown document artifact.
pub const MARKDOWN_ARTIFACT: &str = "markdown_artifact";

/// Identity of one artifact lifetime.
///
/// Content updates keep the id; a new id marks a genuinely new artifact
/// (document reset or a different document loaded).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArtifactId(Uuid);

impl ArtifactId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ArtifactId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
