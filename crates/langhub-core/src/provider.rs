//! Capability provider contracts.
//!
//! Each capability has exactly one well-typed provider trait. A provider
//! returns `Ok(None)` (or an empty list) when it has nothing to contribute;
//! `Err` is reserved for genuine failures, which callers log and skip.

use async_trait::async_trait;
use std::fmt;
use tower_lsp_server::ls_types::{
    CodeAction, CodeActionContext, CodeActionOrCommand, DocumentHighlight, FormattingOptions,
    Position, Range, SignatureHelp, SignatureHelpContext, TextEdit,
};

use crate::cancellation::CancellationToken;
use crate::document::DocumentSnapshot;
use crate::error::Result;
use crate::registry::ProviderRegistry;

/// Language feature types coordinated by langhub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Capability {
    DocumentHighlight,
    CodeAction,
    SignatureHelp,
    Formatting,
    RangeFormatting,
}

impl Capability {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DocumentHighlight => "document highlight",
            Self::CodeAction => "code action",
            Self::SignatureHelp => "signature help",
            Self::Formatting => "formatting",
            Self::RangeFormatting => "range formatting",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[async_trait]
pub trait DocumentHighlightProvider: Send + Sync {
    async fn provide_document_highlights(
        &self,
        document: &DocumentSnapshot,
        position: Position,
        token: &CancellationToken,
    ) -> Result<Option<Vec<DocumentHighlight>>>;
}

#[async_trait]
pub trait CodeActionProvider: Send + Sync {
    async fn provide_code_actions(
        &self,
        document: &DocumentSnapshot,
        range: Range,
        context: &CodeActionContext,
        token: &CancellationToken,
    ) -> Result<Option<Vec<CodeActionOrCommand>>>;

    /// Fills in a lazily computed edit or command.
    ///
    /// The default returns the action unchanged.
    async fn resolve_code_action(
        &self,
        action: CodeAction,
        _token: &CancellationToken,
    ) -> Result<CodeAction> {
        Ok(action)
    }
}

#[async_trait]
pub trait SignatureHelpProvider: Send + Sync {
    async fn provide_signature_help(
        &self,
        document: &DocumentSnapshot,
        position: Position,
        context: &SignatureHelpContext,
        token: &CancellationToken,
    ) -> Result<Option<SignatureHelp>>;
}

#[async_trait]
pub trait DocumentFormattingProvider: Send + Sync {
    async fn provide_document_formatting_edits(
        &self,
        document: &DocumentSnapshot,
        options: &FormattingOptions,
        token: &CancellationToken,
    ) -> Result<Option<Vec<TextEdit>>>;
}

#[async_trait]
pub trait DocumentRangeFormattingProvider: Send + Sync {
    async fn provide_document_range_formatting_edits(
        &self,
        document: &DocumentSnapshot,
        range: Range,
        options: &FormattingOptions,
        token: &CancellationToken,
    ) -> Result<Option<Vec<TextEdit>>>;
}

/// One registry per capability, owned by the composition root.
///
/// # Examples
///
/// ```
/// use langhub_core::provider::Providers;
///
/// let providers = Providers::new();
/// assert!(providers.code_action.is_empty());
/// assert!(providers.signature_help.is_empty());
/// ```
#[derive(Default)]
pub struct Providers {
    pub document_highlight: ProviderRegistry<dyn DocumentHighlightProvider>,
    pub code_action: ProviderRegistry<dyn CodeActionProvider>,
    pub signature_help: ProviderRegistry<dyn SignatureHelpProvider>,
    pub formatting: ProviderRegistry<dyn DocumentFormattingProvider>,
    pub range_formatting: ProviderRegistry<dyn DocumentRangeFormattingProvider>,
}

impl Providers {
    pub fn new() -> Self {
        Self::default()
    }
}
