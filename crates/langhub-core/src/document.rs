//! Document collaborator contract and an in-memory implementation.

use async_trait::async_trait;
use std::sync::{Arc, PoisonError, RwLock};
use tower_lsp_server::ls_types::Uri;

use crate::error::Result;
use crate::selector::DocumentIdentity;

/// Immutable view of a document at the moment a request was issued.
///
/// Cloning is cheap: the text is shared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSnapshot {
    pub identity: DocumentIdentity,
    pub version: i32,
    pub text: Arc<str>,
}

impl DocumentSnapshot {
    pub fn new(identity: DocumentIdentity, version: i32, text: impl Into<Arc<str>>) -> Self {
        Self {
            identity,
            version,
            text: text.into(),
        }
    }

    pub fn uri(&self) -> &Uri {
        &self.identity.uri
    }

    pub fn line(&self, index: u32) -> Option<&str> {
        self.text.split('\n').nth(index as usize).map(|line| line.trim_end_matches('\r'))
    }

    pub fn line_count(&self) -> u32 {
        self.text.split('\n').count() as u32
    }
}

/// Document surface consumed by the handlers.
///
/// The handlers never parse raw text beyond the word-character check; every
/// other question about the buffer goes through this trait.
#[async_trait]
pub trait Document: Send + Sync {
    fn identity(&self) -> DocumentIdentity;

    fn version(&self) -> i32;

    fn line_count(&self) -> u32;

    fn line(&self, index: u32) -> Option<String>;

    fn is_word_char(&self, ch: char) -> bool {
        ch.is_alphanumeric() || ch == '_'
    }

    fn snapshot(&self) -> DocumentSnapshot;

    /// Resolves once every pending edit has been flushed to the document.
    async fn synchronize(&self) -> Result<()>;
}

struct MemoryState {
    text: String,
    version: i32,
}

/// In-memory [`Document`].
///
/// Edits are applied synchronously, so [`synchronize`](Document::synchronize)
/// completes immediately.
///
/// # Examples
///
/// ```
/// use langhub_core::document::{Document, MemoryDocument};
/// use std::str::FromStr;
/// use tower_lsp_server::ls_types::Uri;
///
/// let doc = MemoryDocument::new(Uri::from_str("file:///a.rs").unwrap(), "rust", "fn main() {}");
/// assert_eq!(doc.version(), 1);
///
/// doc.set_text("fn main() { run(); }");
/// assert_eq!(doc.version(), 2);
/// assert_eq!(doc.line(0).as_deref(), Some("fn main() { run(); }"));
/// ```
pub struct MemoryDocument {
    uri: Uri,
    language_id: String,
    extra_word_chars: String,
    state: RwLock<MemoryState>,
}

impl MemoryDocument {
    pub fn new(uri: Uri, language_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            uri,
            language_id: language_id.into(),
            extra_word_chars: String::new(),
            state: RwLock::new(MemoryState {
                text: text.into(),
                version: 1,
            }),
        }
    }

    /// Treats the given characters as part of words, e.g. `-` for CSS.
    #[must_use]
    pub fn with_word_chars(mut self, chars: impl Into<String>) -> Self {
        self.extra_word_chars = chars.into();
        self
    }

    /// Replaces the text and bumps the version.
    pub fn set_text(&self, text: impl Into<String>) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.text = text.into();
        state.version += 1;
    }

    pub fn text(&self) -> String {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .text
            .clone()
    }
}

#[async_trait]
impl Document for MemoryDocument {
    fn identity(&self) -> DocumentIdentity {
        DocumentIdentity::new(self.uri.clone(), self.language_id.clone())
    }

    fn version(&self) -> i32 {
        self.state.read().unwrap_or_else(PoisonError::into_inner).version
    }

    fn line_count(&self) -> u32 {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.text.split('\n').count() as u32
    }

    fn line(&self, index: u32) -> Option<String> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state
            .text
            .split('\n')
            .nth(index as usize)
            .map(|line| line.trim_end_matches('\r').to_string())
    }

    fn is_word_char(&self, ch: char) -> bool {
        ch.is_alphanumeric() || ch == '_' || self.extra_word_chars.contains(ch)
    }

    fn snapshot(&self) -> DocumentSnapshot {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        DocumentSnapshot::new(self.identity(), state.version, state.text.as_str())
    }

    async fn synchronize(&self) -> Result<()> {
        Ok(())
    }
}
