//! Editor-surface collaborator contracts.
//!
//! langhub never renders anything itself. Highlights, menus, messages and
//! signature popups are side effects requested through [`Editor`]; how they
//! look is the editor's business.

use async_trait::async_trait;
use langhub_core::{Document, Result};
use std::fmt;
use std::sync::Arc;
use tower_lsp_server::ls_types::{
    Command, Diagnostic, FormattingOptions, Position, Range, Uri, WorkspaceEdit,
};

use crate::handlers::signature_help::SignatureView;

/// Editor window identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowId(pub u64);

/// Editor buffer identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub u64);

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "window {}", self.0)
    }
}

impl fmt::Display for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "buffer {}", self.0)
    }
}

/// Where the cursor currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorState {
    pub window: WindowId,
    pub buffer: BufferId,
    pub position: Position,
}

#[async_trait]
pub trait Editor: Send + Sync {
    /// Window, buffer and cursor position with focus, if any.
    fn current(&self) -> Option<CursorState>;

    fn document(&self, buffer: BufferId) -> Option<Arc<dyn Document>>;

    fn formatting_options(&self, _buffer: BufferId) -> FormattingOptions {
        FormattingOptions {
            tab_size: 4,
            insert_spaces: true,
            ..Default::default()
        }
    }

    /// Removes every highlight marker previously applied to the window.
    fn clear_highlights(&self, window: WindowId);

    fn apply_highlights(&self, window: WindowId, style: &str, ranges: &[Range]);

    fn move_cursor(&self, window: WindowId, position: Position);

    fn show_warning(&self, message: &str);

    fn show_signature(&self, buffer: BufferId, view: &SignatureView);

    fn hide_signature(&self, buffer: BufferId);

    /// Presents a picker and resolves to the chosen index, `None` if dismissed.
    async fn show_menu(&self, title: &str, items: &[String]) -> Option<usize>;

    /// Applies a workspace edit, returning whether the editor accepted it.
    async fn apply_edit(&self, edit: WorkspaceEdit) -> Result<bool>;

    async fn execute_command(&self, command: &Command) -> Result<()>;
}

/// Source of diagnostics used to build code action contexts.
pub trait DiagnosticsSource: Send + Sync {
    fn diagnostics_in_range(&self, uri: &Uri, range: &Range) -> Vec<Diagnostic>;
}

/// Diagnostics source that never reports anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDiagnostics;

impl DiagnosticsSource for NoDiagnostics {
    fn diagnostics_in_range(&self, _uri: &Uri, _range: &Range) -> Vec<Diagnostic> {
        Vec::new()
    }
}

/// Character at a UTF-16 column of a line, as LSP positions count columns.
pub(crate) fn char_at_utf16(line: &str, column: u32) -> Option<char> {
    let mut offset = 0u32;
    for ch in line.chars() {
        if offset == column {
            return Some(ch);
        }
        offset += ch.len_utf16() as u32;
        if offset > column {
            return None;
        }
    }
    None
}

/// Character immediately before a UTF-16 column.
pub(crate) fn char_before_utf16(line: &str, column: u32) -> Option<char> {
    let mut offset = 0u32;
    let mut previous = None;
    for ch in line.chars() {
        if offset == column {
            return previous;
        }
        offset += ch.len_utf16() as u32;
        previous = Some(ch);
    }
    (offset == column).then_some(previous).flatten()
}

/// UTF-16 length of a line.
pub(crate) fn utf16_len(line: &str) -> u32 {
    line.chars().map(|ch| ch.len_utf16() as u32).sum()
}
