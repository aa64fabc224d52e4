//! Core abstractions for langhub.
//!
//! This crate provides the provider-coordination layer that editor-side
//! language features are built on.
//!
//! # Architecture
//!
//! langhub-core defines:
//! - **Registries**: `ProviderRegistry`, one explicitly constructed instance per capability
//! - **Selectors**: `DocumentSelector` scoring against a `DocumentIdentity`
//! - **Cancellation**: `CancellationSource` (owner) / `CancellationToken` (read-only)
//! - **Coordination**: `RequestCoordinator`, single-flight per context key with timeouts
//! - **Provider traits**: one async trait per capability
//! - **Error Types**: `LanghubError`
//!
//! # Examples
//!
//! Registering a highlight provider and resolving it for a document:
//!
//! ```no_run
//! use async_trait::async_trait;
//! use langhub_core::{
//!     CancellationToken, DocumentHighlightProvider, DocumentIdentity, DocumentSelector,
//!     DocumentSnapshot, Providers,
//! };
//! use std::str::FromStr;
//! use std::sync::Arc;
//! use tower_lsp_server::ls_types::{DocumentHighlight, Position, Uri};
//!
//! struct Highlighter;
//!
//! #[async_trait]
//! impl DocumentHighlightProvider for Highlighter {
//!     async fn provide_document_highlights(
//!         &self,
//!         _document: &DocumentSnapshot,
//!         _position: Position,
//!         _token: &CancellationToken,
//!     ) -> langhub_core::Result<Option<Vec<DocumentHighlight>>> {
//!         Ok(None)
//!     }
//! }
//!
//! let providers = Providers::new();
//! let _handle = providers
//!     .document_highlight
//!     .register(DocumentSelector::language("rust"), Arc::new(Highlighter), 0);
//!
//! let doc = DocumentIdentity::new(Uri::from_str("file:///main.rs").unwrap(), "rust");
//! assert!(providers.document_highlight.resolve_one(&doc).is_some());
//! ```

pub mod cancellation;
pub mod coordinator;
pub mod document;
pub mod error;
pub mod lsp_helpers;
pub mod provider;
pub mod registry;
pub mod selector;

// Re-export commonly used types
pub use cancellation::{CancellationSource, CancellationToken};
pub use coordinator::{RequestCoordinator, RequestKey, RequestOutcome, race_deadline};
pub use document::{Document, DocumentSnapshot, MemoryDocument};
pub use error::{LanghubError, Result};
pub use lsp_helpers::{compare_positions, compare_ranges, kind_contains, kinds_overlap};
pub use provider::{
    Capability, CodeActionProvider, DocumentFormattingProvider, DocumentHighlightProvider,
    DocumentRangeFormattingProvider, Providers, SignatureHelpProvider,
};
pub use registry::{Disposable, ProviderMetadata, ProviderRegistry, RegisteredProvider, RegistrationId};
pub use selector::{DocumentFilter, DocumentIdentity, DocumentSelector, SelectorEntry};
