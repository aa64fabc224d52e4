//! Signature help trigger state machine.
//!
//! One session per buffer moves between `Idle`, `Pending` and `Shown`. A new
//! trigger supersedes whatever is pending; cursor motion away from the
//! trigger position dismisses the session.

use dashmap::DashMap;
use langhub_core::{
    Capability, LanghubError, Providers, RequestCoordinator, RequestKey, RequestOutcome, Result,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tower_lsp_server::ls_types::{
    Position, SignatureHelp, SignatureHelpContext, SignatureHelpTriggerKind, SignatureInformation,
};

use crate::config::SignatureHelpConfig;
use crate::editor::{BufferId, Editor, char_before_utf16};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureState {
    Idle,
    Pending,
    Shown,
}

/// What started a signature help request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureTrigger {
    Invoked,
    Character(String),
    ContentChange,
}

impl SignatureTrigger {
    fn kind(&self) -> SignatureHelpTriggerKind {
        match self {
            Self::Invoked => SignatureHelpTriggerKind::INVOKED,
            Self::Character(_) => SignatureHelpTriggerKind::TRIGGER_CHARACTER,
            Self::ContentChange => SignatureHelpTriggerKind::CONTENT_CHANGE,
        }
    }

    fn character(&self) -> Option<String> {
        match self {
            Self::Character(ch) => Some(ch.clone()),
            Self::Invoked | Self::ContentChange => None,
        }
    }
}

/// Signature help resolved to the signature and parameter to emphasize.
#[derive(Debug, Clone, PartialEq)]
pub struct SignatureView {
    pub help: SignatureHelp,
    pub active_signature: usize,
    pub active_parameter: u32,
}

impl SignatureView {
    /// Returns `None` for help without signatures.
    ///
    /// An out-of-range active signature falls back to the first one. The
    /// signature's own active parameter wins over the help-level one; when
    /// neither is set the first parameter is active.
    pub fn from_help(help: SignatureHelp) -> Option<Self> {
        if help.signatures.is_empty() {
            return None;
        }
        let active_signature = help
            .active_signature
            .map(|index| index as usize)
            .filter(|&index| index < help.signatures.len())
            .unwrap_or(0);
        let active_parameter = help.signatures[active_signature]
            .active_parameter
            .or(help.active_parameter)
            .unwrap_or(0);
        Some(Self {
            help,
            active_signature,
            active_parameter,
        })
    }

    pub fn signature(&self) -> &SignatureInformation {
        &self.help.signatures[self.active_signature]
    }
}

struct Session {
    state: SignatureState,
    origin: Position,
    generation: u64,
    view: Option<SignatureView>,
}

impl Session {
    fn idle() -> Self {
        Self {
            state: SignatureState::Idle,
            origin: Position::default(),
            generation: 0,
            view: None,
        }
    }
}

pub struct SignatureHelpHandler {
    providers: Arc<Providers>,
    editor: Arc<dyn Editor>,
    coordinator: Arc<RequestCoordinator>,
    config: SignatureHelpConfig,
    sessions: DashMap<BufferId, Session>,
    generation: AtomicU64,
}

impl SignatureHelpHandler {
    pub fn new(
        providers: Arc<Providers>,
        editor: Arc<dyn Editor>,
        coordinator: Arc<RequestCoordinator>,
        config: SignatureHelpConfig,
    ) -> Self {
        Self {
            providers,
            editor,
            coordinator,
            config,
            sessions: DashMap::new(),
            generation: AtomicU64::new(1),
        }
    }

    pub fn state(&self, buffer: BufferId) -> SignatureState {
        self.sessions
            .get(&buffer)
            .map(|session| session.state)
            .unwrap_or(SignatureState::Idle)
    }

    /// Signature currently shown for the buffer.
    pub fn active(&self, buffer: BufferId) -> Option<SignatureView> {
        self.sessions
            .get(&buffer)
            .and_then(|session| session.view.clone())
    }

    /// Requests signature help at `position`, superseding any pending request.
    ///
    /// Returns whether a signature ended up shown.
    pub async fn trigger(
        &self,
        buffer: BufferId,
        position: Position,
        trigger: SignatureTrigger,
    ) -> Result<bool> {
        if !self.config.enabled {
            return Ok(false);
        }
        let document = self
            .editor
            .document(buffer)
            .ok_or_else(|| LanghubError::DocumentNotFound(buffer.to_string()))?;
        let registrations = self.providers.signature_help.resolve(&document.identity());
        if registrations.is_empty() {
            return Ok(false);
        }

        let key = request_key(buffer);
        self.coordinator.cancel(&key);
        let generation = self.generation.fetch_add(1, Ordering::SeqCst);
        let previous = {
            let mut session = self.sessions.entry(buffer).or_insert_with(Session::idle);
            let previous = match session.state {
                SignatureState::Shown => session.view.as_ref().map(|view| view.help.clone()),
                SignatureState::Idle | SignatureState::Pending => None,
            };
            session.state = SignatureState::Pending;
            session.origin = position;
            session.generation = generation;
            previous
        };

        if let Err(e) = document.synchronize().await {
            self.finish(buffer, generation, None);
            return Err(e);
        }

        let context = SignatureHelpContext {
            trigger_kind: trigger.kind(),
            trigger_character: trigger.character(),
            is_retrigger: previous.is_some(),
            active_signature_help: previous,
        };
        let snapshot = document.snapshot();

        let outcome = {
            let registrations = &registrations;
            let snapshot = &snapshot;
            let context = &context;
            self.coordinator
                .run(key, self.config.trigger_wait(), |token| async move {
                    for registration in registrations {
                        if token.is_cancelled() {
                            break;
                        }
                        match registration
                            .provider
                            .provide_signature_help(snapshot, position, context, &token)
                            .await
                        {
                            Ok(Some(help)) if !help.signatures.is_empty() => return Some(help),
                            Ok(_) => {}
                            Err(e) => {
                                tracing::warn!(
                                    "signature help provider {} failed: {}",
                                    registration.display_name(),
                                    e
                                );
                            }
                        }
                    }
                    None
                })
                .await
        };

        let view = match outcome {
            RequestOutcome::Completed(help) => help.and_then(SignatureView::from_help),
            RequestOutcome::TimedOut | RequestOutcome::Cancelled => None,
        };
        Ok(self.finish(buffer, generation, view))
    }

    /// Triggers when `character` is a trigger character of an applicable provider.
    ///
    /// While a signature is shown, retrigger characters count as well.
    pub async fn on_text_inserted(
        &self,
        buffer: BufferId,
        position: Position,
        character: char,
    ) -> Result<bool> {
        let character = character.to_string();
        if !self.is_trigger_character(buffer, &character) {
            return Ok(false);
        }
        self.trigger(buffer, position, SignatureTrigger::Character(character))
            .await
    }

    /// Triggers when the character before a jumped-to placeholder is a trigger character.
    pub async fn on_placeholder_jump(&self, buffer: BufferId, position: Position) -> Result<bool> {
        let Some(document) = self.editor.document(buffer) else {
            return Ok(false);
        };
        let Some(previous) = document
            .line(position.line)
            .and_then(|line| char_before_utf16(&line, position.character))
        else {
            return Ok(false);
        };
        let character = previous.to_string();
        if !self.is_trigger_character(buffer, &character) {
            return Ok(false);
        }
        self.trigger(buffer, position, SignatureTrigger::Character(character))
            .await
    }

    pub fn on_text_changed(&self, buffer: BufferId) {
        if self.config.hide_on_text_change && self.state(buffer) == SignatureState::Shown {
            self.dismiss(buffer);
        }
    }

    /// Dismisses the session when the cursor leaves the position it was triggered at.
    pub fn on_cursor_moved(&self, buffer: BufferId, position: Position) {
        let moved_away = self.sessions.get(&buffer).is_some_and(|session| {
            session.state != SignatureState::Idle && session.origin != position
        });
        if moved_away {
            self.dismiss(buffer);
        }
    }

    pub fn on_buffer_closed(&self, buffer: BufferId) {
        self.dismiss(buffer);
        self.sessions.remove(&buffer);
    }

    /// Cancels any pending request and hides a shown signature.
    pub fn dismiss(&self, buffer: BufferId) {
        self.coordinator.cancel(&request_key(buffer));
        let generation = self.generation.fetch_add(1, Ordering::SeqCst);
        let was_active = match self.sessions.get_mut(&buffer) {
            Some(mut session) => {
                let was_active = session.state != SignatureState::Idle;
                session.state = SignatureState::Idle;
                session.view = None;
                session.generation = generation;
                was_active
            }
            None => false,
        };
        if was_active {
            self.editor.hide_signature(buffer);
        }
    }

    fn is_trigger_character(&self, buffer: BufferId, character: &str) -> bool {
        let Some(document) = self.editor.document(buffer) else {
            return false;
        };
        let shown = self.state(buffer) == SignatureState::Shown;
        self.providers
            .signature_help
            .resolve(&document.identity())
            .iter()
            .any(|registration| {
                let metadata = &registration.metadata;
                metadata.trigger_characters.iter().any(|c| c == character)
                    || (shown && metadata.retrigger_characters.iter().any(|c| c == character))
            })
    }

    // Settles the session if `generation` still owns it; superseded results are dropped.
    fn finish(&self, buffer: BufferId, generation: u64, view: Option<SignatureView>) -> bool {
        let settled = match self.sessions.get_mut(&buffer) {
            Some(mut session) if session.generation == generation => {
                session.state = if view.is_some() {
                    SignatureState::Shown
                } else {
                    SignatureState::Idle
                };
                session.view = view.clone();
                true
            }
            _ => false,
        };
        if !settled {
            return false;
        }

        match view {
            Some(view) => {
                self.editor.show_signature(buffer, &view);
                true
            }
            None => {
                self.editor.hide_signature(buffer);
                false
            }
        }
    }
}

fn request_key(buffer: BufferId) -> RequestKey {
    RequestKey::new(Capability::SignatureHelp, buffer.0)
}
