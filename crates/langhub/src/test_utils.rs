//! Test fixtures: a recording editor and configurable fake providers.

use async_trait::async_trait;
use dashmap::DashMap;
use langhub_core::{
    CancellationToken, CodeActionProvider, Disposable, Document, DocumentFormattingProvider,
    DocumentHighlightProvider, DocumentRangeFormattingProvider, DocumentSelector,
    DocumentSnapshot, LanghubError, MemoryDocument, ProviderMetadata, ProviderRegistry, Providers,
    RegistrationId, RequestCoordinator, Result, SignatureHelpProvider,
};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower_lsp_server::ls_types::{
    CodeAction, CodeActionContext, CodeActionDisabled, CodeActionKind, CodeActionOrCommand,
    Command, DocumentHighlight, DocumentHighlightKind, FormattingOptions, Position, Range,
    SignatureHelp, SignatureHelpContext, SignatureInformation, TextEdit, Uri, WorkspaceEdit,
};

use crate::client::LanguageClient;
use crate::config::LanghubConfig;
use crate::editor::{BufferId, CursorState, Editor, WindowId};
use crate::handlers::{CodeActionHandler, FormatHandler, HighlightHandler, SignatureHelpHandler};
use crate::handlers::signature_help::SignatureView;

/// Side effect requested from the editor.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorCall {
    ClearHighlights(WindowId),
    ApplyHighlights(WindowId, String, Vec<Range>),
    MoveCursor(WindowId, Position),
    ShowSignature(BufferId, SignatureView),
    HideSignature(BufferId),
    ApplyEdit(WorkspaceEdit),
    /// Command identifier
    ExecuteCommand(String),
}

/// Editor that records every side effect instead of rendering it.
#[derive(Default)]
pub struct RecordingEditor {
    current: Mutex<Option<CursorState>>,
    documents: DashMap<BufferId, Arc<dyn Document>>,
    calls: Mutex<Vec<EditorCall>>,
    reject_edits: AtomicBool,
    decline_edits: AtomicBool,
    warnings: Mutex<Vec<String>>,
    menus: Mutex<Vec<Vec<String>>>,
    choice: Mutex<Option<usize>>,
}

impl RecordingEditor {
    pub fn add_document(&self, buffer: BufferId, document: Arc<dyn Document>) {
        self.documents.insert(buffer, document);
    }

    pub fn focus(&self, state: CursorState) {
        *self.current.lock().unwrap() = Some(state);
    }

    pub fn clear_focus(&self) {
        *self.current.lock().unwrap() = None;
    }

    pub fn set_cursor(&self, position: Position) {
        if let Some(state) = self.current.lock().unwrap().as_mut() {
            state.position = position;
        }
    }

    pub fn cursor(&self) -> Position {
        let current = *self.current.lock().unwrap();
        current.map(|state| state.position).unwrap_or_default()
    }

    /// Makes every following `apply_edit` fail.
    pub fn reject_edits(&self) {
        self.reject_edits.store(true, Ordering::SeqCst);
    }

    /// Makes every following `apply_edit` report that it was not applied.
    pub fn decline_edits(&self) {
        self.decline_edits.store(true, Ordering::SeqCst);
    }

    /// Menu index returned by the next pickers.
    pub fn choose(&self, choice: Option<usize>) {
        *self.choice.lock().unwrap() = choice;
    }

    pub fn calls(&self) -> Vec<EditorCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn take_calls(&self) -> Vec<EditorCall> {
        std::mem::take(&mut *self.calls.lock().unwrap())
    }

    pub fn warnings(&self) -> Vec<String> {
        self.warnings.lock().unwrap().clone()
    }

    pub fn menus(&self) -> usize {
        self.menus.lock().unwrap().len()
    }

    fn record(&self, call: EditorCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl Editor for RecordingEditor {
    fn current(&self) -> Option<CursorState> {
        *self.current.lock().unwrap()
    }

    fn document(&self, buffer: BufferId) -> Option<Arc<dyn Document>> {
        self.documents
            .get(&buffer)
            .map(|document| Arc::clone(document.value()))
    }

    fn clear_highlights(&self, window: WindowId) {
        self.record(EditorCall::ClearHighlights(window));
    }

    fn apply_highlights(&self, window: WindowId, style: &str, ranges: &[Range]) {
        self.record(EditorCall::ApplyHighlights(
            window,
            style.to_string(),
            ranges.to_vec(),
        ));
    }

    fn move_cursor(&self, window: WindowId, position: Position) {
        self.set_cursor(position);
        self.record(EditorCall::MoveCursor(window, position));
    }

    fn show_warning(&self, message: &str) {
        self.warnings.lock().unwrap().push(message.to_string());
    }

    fn show_signature(&self, buffer: BufferId, view: &SignatureView) {
        self.record(EditorCall::ShowSignature(buffer, view.clone()));
    }

    fn hide_signature(&self, buffer: BufferId) {
        self.record(EditorCall::HideSignature(buffer));
    }

    async fn show_menu(&self, _title: &str, items: &[String]) -> Option<usize> {
        self.menus.lock().unwrap().push(items.to_vec());
        *self.choice.lock().unwrap()
    }

    async fn apply_edit(&self, edit: WorkspaceEdit) -> Result<bool> {
        if self.reject_edits.load(Ordering::SeqCst) {
            return Err(LanghubError::Editor("edit rejected".into()));
        }
        if self.decline_edits.load(Ordering::SeqCst) {
            return Ok(false);
        }
        self.record(EditorCall::ApplyEdit(edit));
        Ok(true)
    }

    async fn execute_command(&self, command: &Command) -> Result<()> {
        self.record(EditorCall::ExecuteCommand(command.command.clone()));
        Ok(())
    }
}

/// One focused rust buffer in one window, plus fresh registries.
pub struct TestContext {
    pub editor: Arc<RecordingEditor>,
    pub providers: Arc<Providers>,
    pub coordinator: Arc<RequestCoordinator>,
    pub document: Arc<MemoryDocument>,
    pub config: LanghubConfig,
}

impl TestContext {
    pub fn new(text: &str) -> Self {
        let editor = Arc::new(RecordingEditor::default());
        let document = Arc::new(MemoryDocument::new(test_uri(), "rust", text));
        editor.add_document(BufferId(1), Arc::clone(&document) as Arc<dyn Document>);
        editor.focus(CursorState {
            window: WindowId(1),
            buffer: BufferId(1),
            position: Position::new(0, 0),
        });
        Self {
            editor,
            providers: Arc::new(Providers::new()),
            coordinator: Arc::new(RequestCoordinator::new()),
            document,
            config: LanghubConfig::default(),
        }
    }

    pub fn window(&self) -> WindowId {
        WindowId(1)
    }

    pub fn buffer(&self) -> BufferId {
        BufferId(1)
    }

    pub fn uri(&self) -> Uri {
        test_uri()
    }

    fn dyn_editor(&self) -> Arc<dyn Editor> {
        Arc::clone(&self.editor) as Arc<dyn Editor>
    }

    pub fn highlights(&self) -> HighlightHandler {
        HighlightHandler::new(
            Arc::clone(&self.providers),
            self.dyn_editor(),
            Arc::clone(&self.coordinator),
            self.config.highlight.clone(),
        )
    }

    pub fn code_actions(&self) -> CodeActionHandler {
        CodeActionHandler::new(
            Arc::clone(&self.providers),
            self.dyn_editor(),
            Arc::new(crate::editor::NoDiagnostics),
            Arc::clone(&self.coordinator),
            self.config.code_action.clone(),
        )
    }

    pub fn format(&self) -> FormatHandler {
        FormatHandler::new(
            Arc::clone(&self.providers),
            self.dyn_editor(),
            Arc::clone(&self.coordinator),
            self.config.formatting.clone(),
        )
    }

    pub fn signature_help(&self) -> SignatureHelpHandler {
        SignatureHelpHandler::new(
            Arc::clone(&self.providers),
            self.dyn_editor(),
            Arc::clone(&self.coordinator),
            self.config.signature_help.clone(),
        )
    }

    /// Client over the same editor with its own registries.
    pub fn client(&self) -> LanguageClient {
        LanguageClient::new(self.dyn_editor(), self.config.clone())
    }

    pub fn register_highlights(&self, provider: FakeHighlights) -> Disposable {
        self.providers
            .document_highlight
            .register(rust(), Arc::new(provider), 0)
    }

    pub fn register_code_actions(&self, provider: FakeCodeActions, priority: i32) -> Disposable {
        self.providers
            .code_action
            .register(rust(), Arc::new(provider), priority)
    }

    pub fn register_code_actions_with_kinds(
        &self,
        provider: FakeCodeActions,
        kinds: Vec<CodeActionKind>,
    ) -> Disposable {
        self.providers.code_action.register_with(
            rust(),
            Arc::new(provider),
            0,
            ProviderMetadata::new().provided_kinds(kinds),
        )
    }

    pub fn register_signature_help(
        &self,
        provider: FakeSignatureHelp,
        triggers: &[&str],
        retriggers: &[&str],
    ) -> Disposable {
        self.providers.signature_help.register_with(
            rust(),
            Arc::new(provider),
            0,
            ProviderMetadata::new()
                .trigger_characters(triggers.iter().copied())
                .retrigger_characters(retriggers.iter().copied()),
        )
    }

    pub fn register_formatter(&self, provider: FakeFormatter) -> Disposable {
        self.providers
            .formatting
            .register(rust(), Arc::new(provider), 0)
    }

    pub fn register_range_formatter(&self, provider: FakeFormatter) -> Disposable {
        self.providers
            .range_formatting
            .register(rust(), Arc::new(provider), 0)
    }

    /// Edit inserting `text` at the start of the test buffer.
    pub fn insert_edit(&self, text: &str) -> WorkspaceEdit {
        let mut changes = HashMap::new();
        changes.insert(self.uri(), vec![text_edit(0, 0, 0, 0, text)]);
        WorkspaceEdit {
            changes: Some(changes),
            ..Default::default()
        }
    }
}

/// Document whose pending edits never flush.
pub struct UnsyncedDocument(pub MemoryDocument);

#[async_trait]
impl Document for UnsyncedDocument {
    fn identity(&self) -> langhub_core::DocumentIdentity {
        self.0.identity()
    }

    fn version(&self) -> i32 {
        self.0.version()
    }

    fn line_count(&self) -> u32 {
        self.0.line_count()
    }

    fn line(&self, index: u32) -> Option<String> {
        self.0.line(index)
    }

    fn snapshot(&self) -> DocumentSnapshot {
        self.0.snapshot()
    }

    async fn synchronize(&self) -> Result<()> {
        Err(LanghubError::Synchronize("buffer detached".into()))
    }
}

/// Buffer 2: an unsynchronizable copy of `text`.
pub fn add_unsynced_buffer(ctx: &TestContext, text: &str) -> BufferId {
    let buffer = BufferId(2);
    let document = MemoryDocument::new(test_uri(), "rust", text);
    ctx.editor
        .add_document(buffer, Arc::new(UnsyncedDocument(document)));
    buffer
}

fn test_uri() -> Uri {
    Uri::from_str("file:///project/src/main.rs").unwrap()
}

fn rust() -> DocumentSelector {
    DocumentSelector::language("rust")
}

async fn pause(delay: Option<Duration>) {
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
}

#[derive(Clone, Default)]
pub struct FakeHighlights {
    highlights: Vec<DocumentHighlight>,
    delay: Option<Duration>,
    fail: bool,
    calls: Arc<AtomicUsize>,
}

impl FakeHighlights {
    pub fn new(highlights: Vec<DocumentHighlight>) -> Self {
        Self {
            highlights,
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentHighlightProvider for FakeHighlights {
    async fn provide_document_highlights(
        &self,
        _document: &DocumentSnapshot,
        _position: Position,
        _token: &CancellationToken,
    ) -> Result<Option<Vec<DocumentHighlight>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        pause(self.delay).await;
        if self.fail {
            return Err(LanghubError::provider(
                langhub_core::Capability::DocumentHighlight,
                "boom",
            ));
        }
        Ok(Some(self.highlights.clone()))
    }
}

#[derive(Clone, Default)]
pub struct FakeCodeActions {
    items: Vec<CodeActionOrCommand>,
    fail: bool,
    delay: Option<Duration>,
    resolve_delay: Option<Duration>,
    resolved_edit: Option<WorkspaceEdit>,
    calls: Arc<AtomicUsize>,
    resolves: Arc<AtomicUsize>,
    last_range: Arc<Mutex<Option<Range>>>,
}

impl FakeCodeActions {
    pub fn new(items: Vec<CodeActionOrCommand>) -> Self {
        Self {
            items,
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_resolve_delay(mut self, delay: Duration) -> Self {
        self.resolve_delay = Some(delay);
        self
    }

    /// Resolution fills in `edit`.
    pub fn resolving_to(mut self, edit: WorkspaceEdit) -> Self {
        self.resolved_edit = Some(edit);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn resolves(&self) -> usize {
        self.resolves.load(Ordering::SeqCst)
    }

    pub fn last_range(&self) -> Option<Range> {
        *self.last_range.lock().unwrap()
    }
}

#[async_trait]
impl CodeActionProvider for FakeCodeActions {
    async fn provide_code_actions(
        &self,
        _document: &DocumentSnapshot,
        range: Range,
        _context: &CodeActionContext,
        _token: &CancellationToken,
    ) -> Result<Option<Vec<CodeActionOrCommand>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_range.lock().unwrap() = Some(range);
        pause(self.delay).await;
        if self.fail {
            return Err(LanghubError::provider(
                langhub_core::Capability::CodeAction,
                "boom",
            ));
        }
        Ok(Some(self.items.clone()))
    }

    async fn resolve_code_action(
        &self,
        mut action: CodeAction,
        _token: &CancellationToken,
    ) -> Result<CodeAction> {
        self.resolves.fetch_add(1, Ordering::SeqCst);
        pause(self.resolve_delay).await;
        if let Some(edit) = &self.resolved_edit {
            action.edit = Some(edit.clone());
        }
        Ok(action)
    }
}

#[derive(Clone, Default)]
pub struct FakeSignatureHelp {
    help: Option<SignatureHelp>,
    delay: Option<Duration>,
    calls: Arc<AtomicUsize>,
    contexts: Arc<Mutex<Vec<SignatureHelpContext>>>,
}

impl FakeSignatureHelp {
    pub fn new(help: Option<SignatureHelp>) -> Self {
        Self {
            help,
            ..Default::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_context(&self) -> Option<SignatureHelpContext> {
        self.contexts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl SignatureHelpProvider for FakeSignatureHelp {
    async fn provide_signature_help(
        &self,
        _document: &DocumentSnapshot,
        _position: Position,
        context: &SignatureHelpContext,
        _token: &CancellationToken,
    ) -> Result<Option<SignatureHelp>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.contexts.lock().unwrap().push(context.clone());
        pause(self.delay).await;
        Ok(self.help.clone())
    }
}

/// Formatter serving both whole-document and range requests.
#[derive(Clone, Default)]
pub struct FakeFormatter {
    edits: Vec<TextEdit>,
    delay: Option<Duration>,
    calls: Arc<AtomicUsize>,
    last_range: Arc<Mutex<Option<Range>>>,
}

impl FakeFormatter {
    pub fn new(edits: Vec<TextEdit>) -> Self {
        Self {
            edits,
            ..Default::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_range(&self) -> Option<Range> {
        *self.last_range.lock().unwrap()
    }
}

#[async_trait]
impl DocumentFormattingProvider for FakeFormatter {
    async fn provide_document_formatting_edits(
        &self,
        _document: &DocumentSnapshot,
        _options: &FormattingOptions,
        _token: &CancellationToken,
    ) -> Result<Option<Vec<TextEdit>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        pause(self.delay).await;
        Ok(Some(self.edits.clone()))
    }
}

#[async_trait]
impl DocumentRangeFormattingProvider for FakeFormatter {
    async fn provide_document_range_formatting_edits(
        &self,
        _document: &DocumentSnapshot,
        range: Range,
        _options: &FormattingOptions,
        _token: &CancellationToken,
    ) -> Result<Option<Vec<TextEdit>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_range.lock().unwrap() = Some(range);
        pause(self.delay).await;
        Ok(Some(self.edits.clone()))
    }
}

pub fn range(start_line: u32, start_char: u32, end_line: u32, end_char: u32) -> Range {
    Range::new(
        Position::new(start_line, start_char),
        Position::new(end_line, end_char),
    )
}

pub fn highlight(range: Range, kind: Option<DocumentHighlightKind>) -> DocumentHighlight {
    DocumentHighlight { range, kind }
}

pub fn code_action(title: &str, kind: Option<CodeActionKind>) -> CodeAction {
    CodeAction {
        title: title.to_string(),
        kind,
        ..Default::default()
    }
}

pub fn command(name: &str) -> Command {
    Command {
        title: name.to_string(),
        command: name.to_string(),
        arguments: None,
    }
}

pub fn disabled(action: CodeAction, reason: &str) -> CodeAction {
    CodeAction {
        disabled: Some(CodeActionDisabled {
            reason: reason.to_string(),
        }),
        ..action
    }
}

pub fn preferred(action: CodeAction) -> CodeAction {
    CodeAction {
        is_preferred: Some(true),
        ..action
    }
}

pub fn signature_help(
    labels: &[&str],
    active_signature: Option<u32>,
    active_parameter: Option<u32>,
) -> SignatureHelp {
    SignatureHelp {
        signatures: labels
            .iter()
            .map(|label| SignatureInformation {
                label: label.to_string(),
                documentation: None,
                parameters: None,
                active_parameter: None,
            })
            .collect(),
        active_signature,
        active_parameter,
    }
}

pub fn text_edit(
    start_line: u32,
    start_char: u32,
    end_line: u32,
    end_char: u32,
    new_text: &str,
) -> TextEdit {
    TextEdit {
        range: range(start_line, start_char, end_line, end_char),
        new_text: new_text.to_string(),
    }
}

/// A registration id that belongs to no live registry.
pub fn placeholder_id() -> RegistrationId {
    let registry: ProviderRegistry<str> = ProviderRegistry::new();
    registry
        .register(DocumentSelector::all(), Arc::from("placeholder"), 0)
        .id()
}
