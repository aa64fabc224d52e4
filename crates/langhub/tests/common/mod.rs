//! Common test utilities for integration tests.
//!
//! Provides a scripted editor plus providers built from closures, so each
//! test states its provider behavior inline.

#![allow(dead_code)] // Not every test file uses every helper

use async_trait::async_trait;
use langhub::editor::{BufferId, CursorState, Editor, WindowId};
use langhub::{LanghubConfig, LanguageClient, SignatureView};
use langhub_core::{
    CancellationToken, CodeActionProvider, Document, DocumentHighlightProvider, DocumentSnapshot,
    MemoryDocument, Result, SignatureHelpProvider,
};
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower_lsp_server::ls_types::{
    CodeAction, CodeActionContext, CodeActionOrCommand, Command, DocumentHighlight, Position,
    Range, SignatureHelp, SignatureHelpContext, Uri, WorkspaceEdit,
};

pub(crate) const WINDOW: WindowId = WindowId(7);
pub(crate) const BUFFER: BufferId = BufferId(3);

/// Editor double with one buffer, recording what langhub asked it to do.
#[derive(Default)]
pub(crate) struct ScriptedEditor {
    pub(crate) document: Mutex<Option<Arc<MemoryDocument>>>,
    pub(crate) cursor: Mutex<Position>,
    pub(crate) highlighted: Mutex<Vec<(String, Vec<Range>)>>,
    pub(crate) warnings: Mutex<Vec<String>>,
    pub(crate) commands: Mutex<Vec<String>>,
    pub(crate) edits: Mutex<Vec<WorkspaceEdit>>,
    pub(crate) signature: Mutex<Option<SignatureView>>,
    pub(crate) menu_choice: Mutex<Option<usize>>,
}

impl ScriptedEditor {
    pub(crate) fn with_text(text: &str) -> Arc<Self> {
        let editor = Self::default();
        let uri = Uri::from_str("file:///workspace/src/lib.rs").unwrap();
        *editor.document.lock().unwrap() = Some(Arc::new(MemoryDocument::new(uri, "rust", text)));
        Arc::new(editor)
    }

    pub(crate) fn move_to(&self, line: u32, character: u32) {
        *self.cursor.lock().unwrap() = Position::new(line, character);
    }

    pub(crate) fn cursor(&self) -> Position {
        *self.cursor.lock().unwrap()
    }

    pub(crate) fn warnings(&self) -> Vec<String> {
        self.warnings.lock().unwrap().clone()
    }

    pub(crate) fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }

    pub(crate) fn highlighted(&self) -> Vec<(String, Vec<Range>)> {
        self.highlighted.lock().unwrap().clone()
    }
}

#[async_trait]
impl Editor for ScriptedEditor {
    fn current(&self) -> Option<CursorState> {
        Some(CursorState {
            window: WINDOW,
            buffer: BUFFER,
            position: self.cursor(),
        })
    }

    fn document(&self, buffer: BufferId) -> Option<Arc<dyn Document>> {
        if buffer != BUFFER {
            return None;
        }
        let document = self.document.lock().unwrap().clone()?;
        Some(document as Arc<dyn Document>)
    }

    fn clear_highlights(&self, _window: WindowId) {
        self.highlighted.lock().unwrap().clear();
    }

    fn apply_highlights(&self, _window: WindowId, style: &str, ranges: &[Range]) {
        self.highlighted
            .lock()
            .unwrap()
            .push((style.to_string(), ranges.to_vec()));
    }

    fn move_cursor(&self, _window: WindowId, position: Position) {
        *self.cursor.lock().unwrap() = position;
    }

    fn show_warning(&self, message: &str) {
        self.warnings.lock().unwrap().push(message.to_string());
    }

    fn show_signature(&self, _buffer: BufferId, view: &SignatureView) {
        *self.signature.lock().unwrap() = Some(view.clone());
    }

    fn hide_signature(&self, _buffer: BufferId) {
        *self.signature.lock().unwrap() = None;
    }

    async fn show_menu(&self, _title: &str, _items: &[String]) -> Option<usize> {
        *self.menu_choice.lock().unwrap()
    }

    async fn apply_edit(&self, edit: WorkspaceEdit) -> Result<bool> {
        self.edits.lock().unwrap().push(edit);
        Ok(true)
    }

    async fn execute_command(&self, command: &Command) -> Result<()> {
        self.commands.lock().unwrap().push(command.command.clone());
        Ok(())
    }
}

pub(crate) fn client(editor: &Arc<ScriptedEditor>) -> LanguageClient {
    LanguageClient::new(Arc::clone(editor) as Arc<dyn Editor>, LanghubConfig::default())
}

pub(crate) fn range(start_line: u32, start_char: u32, end_line: u32, end_char: u32) -> Range {
    Range::new(
        Position::new(start_line, start_char),
        Position::new(end_line, end_char),
    )
}

/// Highlight provider answering from a closure, optionally after a delay.
pub(crate) struct FnHighlights<F> {
    pub(crate) answer: F,
    pub(crate) delay: Duration,
    pub(crate) calls: AtomicUsize,
}

impl<F> FnHighlights<F>
where
    F: Fn(Position) -> Vec<DocumentHighlight> + Send + Sync,
{
    pub(crate) fn new(answer: F) -> Arc<Self> {
        Self::delayed(answer, Duration::ZERO)
    }

    pub(crate) fn delayed(answer: F, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            answer,
            delay,
            calls: AtomicUsize::new(0),
        })
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<F> DocumentHighlightProvider for FnHighlights<F>
where
    F: Fn(Position) -> Vec<DocumentHighlight> + Send + Sync,
{
    async fn provide_document_highlights(
        &self,
        _document: &DocumentSnapshot,
        position: Position,
        _token: &CancellationToken,
    ) -> Result<Option<Vec<DocumentHighlight>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(Some((self.answer)(position)))
    }
}

/// Code action provider returning a fixed list; resolving an action titled
/// as in `slow_titles` takes `resolve_delay`.
pub(crate) struct ListedActions {
    pub(crate) actions: Vec<CodeAction>,
    pub(crate) slow_titles: Vec<String>,
    pub(crate) resolve_delay: Duration,
}

impl ListedActions {
    pub(crate) fn new(actions: Vec<CodeAction>) -> Arc<Self> {
        Arc::new(Self {
            actions,
            slow_titles: Vec::new(),
            resolve_delay: Duration::ZERO,
        })
    }

    pub(crate) fn with_slow(actions: Vec<CodeAction>, slow: &str, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            actions,
            slow_titles: vec![slow.to_string()],
            resolve_delay: delay,
        })
    }
}

#[async_trait]
impl CodeActionProvider for ListedActions {
    async fn provide_code_actions(
        &self,
        _document: &DocumentSnapshot,
        _range: Range,
        _context: &CodeActionContext,
        _token: &CancellationToken,
    ) -> Result<Option<Vec<CodeActionOrCommand>>> {
        Ok(Some(
            self.actions
                .iter()
                .cloned()
                .map(CodeActionOrCommand::CodeAction)
                .collect(),
        ))
    }

    async fn resolve_code_action(
        &self,
        action: CodeAction,
        _token: &CancellationToken,
    ) -> Result<CodeAction> {
        if self.slow_titles.contains(&action.title) {
            tokio::time::sleep(self.resolve_delay).await;
        }
        Ok(action)
    }
}

/// Signature help provider answering from a closure.
pub(crate) struct FnSignatureHelp<F>(pub(crate) F);

#[async_trait]
impl<F> SignatureHelpProvider for FnSignatureHelp<F>
where
    F: Fn(&SignatureHelpContext) -> Option<SignatureHelp> + Send + Sync,
{
    async fn provide_signature_help(
        &self,
        _document: &DocumentSnapshot,
        _position: Position,
        context: &SignatureHelpContext,
        _token: &CancellationToken,
    ) -> Result<Option<SignatureHelp>> {
        Ok((self.0)(context))
    }
}

/// Code action running `command` when applied.
pub(crate) fn action_with_command(
    title: &str,
    kind: tower_lsp_server::ls_types::CodeActionKind,
    command: &str,
) -> CodeAction {
    CodeAction {
        title: title.to_string(),
        kind: Some(kind),
        command: Some(Command {
            title: title.to_string(),
            command: command.to_string(),
            arguments: None,
        }),
        ..Default::default()
    }
}
