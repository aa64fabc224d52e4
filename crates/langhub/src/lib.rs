//! Language feature coordination for editor clients.
//!
//! `langhub` builds the editor-facing features on top of `langhub-core`:
//! symbol highlights, code actions, formatting and signature help. An editor
//! integration implements [`Editor`], creates a [`LanguageClient`], registers
//! providers and forwards its events.

pub mod client;
pub mod config;
pub mod editor;
pub mod handlers;
pub mod logging;

#[cfg(test)]
mod test_utils;

// Re-export commonly used types
pub use client::{EditorEvent, LanguageClient};
pub use config::LanghubConfig;
pub use editor::{BufferId, CursorState, DiagnosticsSource, Editor, NoDiagnostics, WindowId};
pub use handlers::{
    CodeActionFilter, HighlightOutcome, JumpDirection, ProvidedCodeAction, SignatureState,
    SignatureTrigger, SignatureView,
};
pub use langhub_core::{LanghubError, Result};
