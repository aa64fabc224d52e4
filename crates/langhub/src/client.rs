//! Composition root tying providers, editor and handlers together.

use langhub_core::{Document, LanghubError, Providers, RequestCoordinator, Result};
use std::sync::Arc;
use tower_lsp_server::ls_types::{CodeActionKind, Position, Range};

use crate::config::LanghubConfig;
use crate::editor::{BufferId, DiagnosticsSource, Editor, NoDiagnostics, WindowId};
use crate::handlers::{
    CodeActionFilter, CodeActionHandler, FormatHandler, HighlightHandler, HighlightOutcome,
    JumpDirection, ProvidedCodeAction, SignatureHelpHandler, SignatureTrigger,
};

/// Editor notifications consumed by [`LanguageClient::handle_event`].
#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    CursorMoved {
        window: WindowId,
        buffer: BufferId,
        position: Position,
    },
    TextInserted {
        buffer: BufferId,
        position: Position,
        character: char,
    },
    TextChanged {
        buffer: BufferId,
    },
    /// A snippet placeholder was jumped to.
    PlaceholderJump {
        buffer: BufferId,
        position: Position,
    },
    BufferWillSave {
        buffer: BufferId,
    },
    WindowClosed {
        window: WindowId,
    },
    BufferClosed {
        buffer: BufferId,
    },
}

/// Entry point for an editor integration.
///
/// Owns one registry per capability and the four capability handlers. The
/// editor registers providers through [`providers`](Self::providers), forwards
/// its notifications to [`handle_event`](Self::handle_event), and binds
/// commands to the remaining methods.
///
/// # Examples
///
/// ```no_run
/// use langhub::client::LanguageClient;
/// use langhub::config::LanghubConfig;
/// use langhub::editor::Editor;
/// use std::sync::Arc;
///
/// fn build(editor: Arc<dyn Editor>) -> LanguageClient {
///     LanguageClient::new(editor, LanghubConfig::default())
/// }
/// ```
pub struct LanguageClient {
    providers: Arc<Providers>,
    editor: Arc<dyn Editor>,
    coordinator: Arc<RequestCoordinator>,
    config: LanghubConfig,
    highlights: HighlightHandler,
    code_actions: CodeActionHandler,
    format: FormatHandler,
    signature_help: SignatureHelpHandler,
}

impl LanguageClient {
    pub fn new(editor: Arc<dyn Editor>, config: LanghubConfig) -> Self {
        Self::with_diagnostics(editor, Arc::new(NoDiagnostics), config)
    }

    pub fn with_diagnostics(
        editor: Arc<dyn Editor>,
        diagnostics: Arc<dyn DiagnosticsSource>,
        config: LanghubConfig,
    ) -> Self {
        let providers = Arc::new(Providers::new());
        let coordinator = Arc::new(RequestCoordinator::new());

        let highlights = HighlightHandler::new(
            Arc::clone(&providers),
            Arc::clone(&editor),
            Arc::clone(&coordinator),
            config.highlight.clone(),
        );
        let code_actions = CodeActionHandler::new(
            Arc::clone(&providers),
            Arc::clone(&editor),
            diagnostics,
            Arc::clone(&coordinator),
            config.code_action.clone(),
        );
        let format = FormatHandler::new(
            Arc::clone(&providers),
            Arc::clone(&editor),
            Arc::clone(&coordinator),
            config.formatting.clone(),
        );
        let signature_help = SignatureHelpHandler::new(
            Arc::clone(&providers),
            Arc::clone(&editor),
            Arc::clone(&coordinator),
            config.signature_help.clone(),
        );

        tracing::debug!("language client initialized");

        Self {
            providers,
            editor,
            coordinator,
            config,
            highlights,
            code_actions,
            format,
            signature_help,
        }
    }

    pub fn providers(&self) -> &Providers {
        &self.providers
    }

    pub fn config(&self) -> &LanghubConfig {
        &self.config
    }

    pub fn highlights(&self) -> &HighlightHandler {
        &self.highlights
    }

    pub fn code_actions(&self) -> &CodeActionHandler {
        &self.code_actions
    }

    pub fn formatter(&self) -> &FormatHandler {
        &self.format
    }

    pub fn signature_help(&self) -> &SignatureHelpHandler {
        &self.signature_help
    }

    /// Number of coordinated requests currently in flight.
    pub fn pending_requests(&self) -> usize {
        self.coordinator.pending_count()
    }

    pub async fn highlight(&self) -> Result<HighlightOutcome> {
        self.highlights.highlight().await
    }

    pub async fn jump_symbol(&self, direction: JumpDirection) -> Result<bool> {
        self.highlights.jump_symbol(direction).await
    }

    /// Code actions for the current buffer, sorted for presentation.
    pub async fn get_code_actions(
        &self,
        range: Option<Range>,
        only: Option<&[CodeActionKind]>,
    ) -> Result<Vec<ProvidedCodeAction>> {
        let Some(state) = self.editor.current() else {
            return Ok(Vec::new());
        };
        let document = self.document(state.buffer)?;
        document.synchronize().await?;
        Ok(self
            .code_actions
            .get_code_actions(state.buffer, document.as_ref(), range, only)
            .await)
    }

    pub async fn do_code_action(
        &self,
        range: Option<Range>,
        filter: Option<CodeActionFilter>,
    ) -> Result<bool> {
        self.code_actions.do_code_action(range, filter).await
    }

    pub async fn do_quickfix(&self) -> Result<bool> {
        self.code_actions.do_quickfix().await
    }

    pub async fn organize_import(&self) -> Result<bool> {
        self.code_actions.organize_import().await
    }

    /// Applies one action per kind over the whole current buffer.
    ///
    /// Each kind gets the configured `execute_timeout_ms`.
    pub async fn execute_code_actions(&self, kinds: &[CodeActionKind]) -> Result<Vec<CodeActionKind>> {
        let Some(state) = self.editor.current() else {
            return Ok(Vec::new());
        };
        let document = self.document(state.buffer)?;
        document.synchronize().await?;
        let timeout = self.code_actions.config().execute_timeout();
        Ok(self
            .code_actions
            .execute_code_actions(state.buffer, document.as_ref(), None, kinds, timeout)
            .await)
    }

    pub async fn format_document(&self) -> Result<bool> {
        match self.editor.current() {
            Some(state) => self.format.format_document(state.buffer).await,
            None => Ok(false),
        }
    }

    pub async fn format_range(&self, range: Range) -> Result<bool> {
        match self.editor.current() {
            Some(state) => self.format.format_range(state.buffer, range).await,
            None => Ok(false),
        }
    }

    /// Explicitly requests signature help at the cursor.
    pub async fn trigger_signature_help(&self) -> Result<bool> {
        match self.editor.current() {
            Some(state) => {
                self.signature_help
                    .trigger(state.buffer, state.position, SignatureTrigger::Invoked)
                    .await
            }
            None => Ok(false),
        }
    }

    /// Dispatches an editor notification to the handlers it concerns.
    pub async fn handle_event(&self, event: EditorEvent) -> Result<()> {
        tracing::trace!("editor event: {:?}", event);
        match event {
            EditorEvent::CursorMoved {
                window,
                buffer,
                position,
            } => {
                self.highlights.on_cursor_moved(window);
                self.signature_help.on_cursor_moved(buffer, position);
            }
            EditorEvent::TextInserted {
                buffer,
                position,
                character,
            } => {
                self.signature_help
                    .on_text_inserted(buffer, position, character)
                    .await?;
            }
            EditorEvent::TextChanged { buffer } => {
                self.signature_help.on_text_changed(buffer);
            }
            EditorEvent::PlaceholderJump { buffer, position } => {
                self.signature_help
                    .on_placeholder_jump(buffer, position)
                    .await?;
            }
            EditorEvent::BufferWillSave { buffer } => {
                self.format.format_on_save(buffer).await?;
            }
            EditorEvent::WindowClosed { window } => {
                self.highlights.on_window_closed(window);
            }
            EditorEvent::BufferClosed { buffer } => {
                self.signature_help.on_buffer_closed(buffer);
            }
        }
        Ok(())
    }

    fn document(&self, buffer: BufferId) -> Result<Arc<dyn Document>> {
        self.editor
            .document(buffer)
            .ok_or_else(|| LanghubError::DocumentNotFound(buffer.to_string()))
    }
}

impl Drop for LanguageClient {
    fn drop(&mut self) {
        self.coordinator.cancel_all();
    }
}
