//! Code action handler.
//!
//! Collects actions from every applicable provider, sorts them, and applies
//! the chosen one:
//! - position-scoped menus (`do_code_action`, `do_quickfix`)
//! - `organize_import`
//! - ordered batches under a per-kind deadline (`execute_code_actions`)

use futures::future::join_all;
use langhub_core::{
    CancellationSource, CancellationToken, Capability, Document, LanghubError, Providers,
    RegistrationId, RequestCoordinator, RequestKey, RequestOutcome, Result, kind_contains,
    kinds_overlap, race_deadline,
};
use std::sync::Arc;
use std::time::Duration;
use tower_lsp_server::ls_types::{
    CodeAction, CodeActionContext, CodeActionKind, CodeActionOrCommand, CodeActionTriggerKind,
    Position, Range,
};

use crate::config::CodeActionConfig;
use crate::editor::{BufferId, DiagnosticsSource, Editor, utf16_len};

/// A code action together with the registration that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct ProvidedCodeAction {
    pub action: CodeAction,
    pub provider: RegistrationId,
}

impl ProvidedCodeAction {
    pub fn title(&self) -> &str {
        &self.action.title
    }

    pub fn is_disabled(&self) -> bool {
        self.action.disabled.is_some()
    }

    pub fn is_preferred(&self) -> bool {
        self.action.is_preferred.unwrap_or(false)
    }

    pub fn is_quickfix(&self) -> bool {
        self.action
            .kind
            .as_ref()
            .is_some_and(|kind| kind_contains(&CodeActionKind::QUICKFIX, kind))
    }

    /// True for `source.*` kinds; the bare `source` kind does not count.
    fn is_source(&self) -> bool {
        self.action
            .kind
            .as_ref()
            .is_some_and(|kind| kind.as_str().starts_with("source."))
    }

    fn matches_kinds(&self, kinds: &[CodeActionKind]) -> bool {
        self.action
            .kind
            .as_ref()
            .is_some_and(|kind| kinds.iter().any(|only| kind_contains(only, kind)))
    }
}

/// Narrows the actions offered by `do_code_action`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodeActionFilter {
    Kinds(Vec<CodeActionKind>),
    /// Exact action or command title.
    Title(String),
}

/// Orders actions: enabled preferred, enabled others, disabled.
///
/// With `quickfix_first`, quickfixes lead the enabled non-preferred group.
/// The sort is stable, so provider order survives within each group.
pub fn sort_code_actions(actions: &mut [ProvidedCodeAction], quickfix_first: bool) {
    actions.sort_by_key(|action| {
        let disabled = action.is_disabled();
        let preferred = !disabled && action.is_preferred();
        let quickfix = quickfix_first && !disabled && !preferred && action.is_quickfix();
        (disabled, !preferred, !quickfix)
    });
}

pub struct CodeActionHandler {
    providers: Arc<Providers>,
    editor: Arc<dyn Editor>,
    diagnostics: Arc<dyn DiagnosticsSource>,
    coordinator: Arc<RequestCoordinator>,
    config: CodeActionConfig,
}

impl CodeActionHandler {
    pub fn new(
        providers: Arc<Providers>,
        editor: Arc<dyn Editor>,
        diagnostics: Arc<dyn DiagnosticsSource>,
        coordinator: Arc<RequestCoordinator>,
        config: CodeActionConfig,
    ) -> Self {
        Self {
            providers,
            editor,
            diagnostics,
            coordinator,
            config,
        }
    }

    pub fn config(&self) -> &CodeActionConfig {
        &self.config
    }

    /// Collects, filters and sorts actions from every applicable provider.
    ///
    /// `range` defaults to the whole document. When a range is given and
    /// `only` does not ask for source actions, `source.*` actions are
    /// dropped. A provider that fails or misses the timeout contributes
    /// nothing; the others still count.
    pub async fn get_code_actions(
        &self,
        buffer: BufferId,
        document: &dyn Document,
        range: Option<Range>,
        only: Option<&[CodeActionKind]>,
    ) -> Vec<ProvidedCodeAction> {
        let only = only.filter(|kinds| !kinds.is_empty());
        let exclude_source = range.is_some()
            && !only.is_some_and(|kinds| {
                kinds
                    .iter()
                    .any(|kind| kind_contains(&CodeActionKind::SOURCE, kind))
            });
        let range = range.unwrap_or_else(|| whole_document(document));

        let identity = document.identity();
        let mut registrations = self.providers.code_action.resolve(&identity);
        if let Some(only) = only {
            registrations.retain(|registration| {
                let provided = &registration.metadata.provided_kinds;
                provided.is_empty()
                    || provided
                        .iter()
                        .any(|kind| only.iter().any(|wanted| kinds_overlap(kind, wanted)))
            });
        }
        if registrations.is_empty() {
            tracing::debug!("no code action provider for {}", identity.uri.as_str());
            return Vec::new();
        }

        let context = CodeActionContext {
            diagnostics: self.diagnostics.diagnostics_in_range(&identity.uri, &range),
            only: only.map(<[CodeActionKind]>::to_vec),
            trigger_kind: Some(CodeActionTriggerKind::INVOKED),
        };
        let snapshot = document.snapshot();

        let key = RequestKey::new(Capability::CodeAction, buffer.0);
        // Computed first so no provider deadline falls after the batch one.
        let deadline = tokio::time::Instant::now() + self.config.timeout();
        let outcome = {
            let registrations = &registrations;
            let snapshot = &snapshot;
            let context = &context;
            self.coordinator
                .run(key, self.config.timeout(), |token| async move {
                    let token = &token;
                    let calls = registrations.iter().map(|registration| async move {
                        let call = registration
                            .provider
                            .provide_code_actions(snapshot, range, context, token);
                        (registration, tokio::time::timeout_at(deadline, call).await)
                    });
                    join_all(calls).await
                })
                .await
        };

        let results = match outcome {
            RequestOutcome::Completed(results) => results,
            RequestOutcome::TimedOut | RequestOutcome::Cancelled => return Vec::new(),
        };

        let mut actions: Vec<ProvidedCodeAction> = Vec::new();
        for (registration, result) in results {
            let items = match result {
                Ok(Ok(Some(items))) => items,
                Ok(Ok(None)) => continue,
                Ok(Err(e)) => {
                    tracing::warn!(
                        "code action provider {} failed: {}",
                        registration.display_name(),
                        e
                    );
                    continue;
                }
                Err(_) => {
                    tracing::warn!(
                        "code action provider {} timed out after {:?}",
                        registration.display_name(),
                        self.config.timeout()
                    );
                    continue;
                }
            };

            for item in items {
                // Bare commands carry no kind and bypass the kind filter.
                let (action, bare_command) = match item {
                    CodeActionOrCommand::Command(command) => (
                        CodeAction {
                            title: command.title.clone(),
                            command: Some(command),
                            ..Default::default()
                        },
                        true,
                    ),
                    CodeActionOrCommand::CodeAction(action) => (action, false),
                };
                let provided = ProvidedCodeAction {
                    action,
                    provider: registration.id,
                };

                if let Some(only) = only
                    && !bare_command
                    && !provided.matches_kinds(only)
                {
                    continue;
                }
                if exclude_source && provided.is_source() {
                    continue;
                }
                if actions.iter().any(|seen| seen.title() == provided.title()) {
                    continue;
                }
                actions.push(provided);
            }
        }

        sort_code_actions(&mut actions, only.is_none());
        actions
    }

    /// Resolves and applies one action: edit first, then command.
    ///
    /// Disabled actions fail with [`LanghubError::ActionDisabled`] without
    /// being resolved. Returns `false` when `token` was cancelled during
    /// resolution, in which case nothing is applied, or when the editor
    /// declined the edit, in which case the command is not run.
    pub async fn apply_code_action(
        &self,
        action: &ProvidedCodeAction,
        token: &CancellationToken,
    ) -> Result<bool> {
        if let Some(disabled) = &action.action.disabled {
            return Err(LanghubError::ActionDisabled {
                title: action.action.title.clone(),
                reason: disabled.reason.clone(),
            });
        }

        let resolved = match self.providers.code_action.get(action.provider) {
            Some(registration) => {
                registration
                    .provider
                    .resolve_code_action(action.action.clone(), token)
                    .await?
            }
            None => {
                tracing::debug!(
                    "provider {} gone, applying \"{}\" unresolved",
                    action.provider,
                    action.title()
                );
                action.action.clone()
            }
        };

        if token.is_cancelled() {
            tracing::debug!("code action \"{}\" cancelled during resolve", action.title());
            return Ok(false);
        }

        if let Some(edit) = resolved.edit
            && !self.editor.apply_edit(edit).await?
        {
            tracing::debug!("editor declined the edit of \"{}\"", action.title());
            return Ok(false);
        }
        if let Some(command) = &resolved.command {
            self.editor.execute_command(command).await?;
        }
        Ok(true)
    }

    /// Applies the first enabled action of each kind, in order.
    ///
    /// Each apply races `timeout`; a kind that loses is skipped and the loop
    /// moves on. The document is synchronized after every kind. Returns the
    /// kinds actually applied.
    pub async fn execute_code_actions(
        &self,
        buffer: BufferId,
        document: &dyn Document,
        range: Option<Range>,
        kinds: &[CodeActionKind],
        timeout: Duration,
    ) -> Vec<CodeActionKind> {
        let mut applied = Vec::new();

        for kind in kinds {
            let actions = self
                .get_code_actions(buffer, document, range, Some(std::slice::from_ref(kind)))
                .await;
            let Some(action) = actions.into_iter().find(|action| !action.is_disabled()) else {
                tracing::debug!("no enabled {} action", kind.as_str());
                continue;
            };

            let source = CancellationSource::new();
            let token = source.token();
            match race_deadline(self.apply_code_action(&action, &token), timeout, &source).await {
                Some(Ok(true)) => applied.push(kind.clone()),
                Some(Ok(false)) => {}
                Some(Err(e)) => {
                    tracing::warn!(
                        "applying {} action \"{}\" failed: {}",
                        kind.as_str(),
                        action.title(),
                        e
                    );
                }
                None => {
                    tracing::warn!(
                        "{} action \"{}\" timed out after {:?}",
                        kind.as_str(),
                        action.title(),
                        timeout
                    );
                }
            }

            if let Err(e) = document.synchronize().await {
                tracing::warn!("synchronize after {} failed: {}", kind.as_str(), e);
            }
        }

        applied
    }

    /// Offers actions for `range` (or the whole document) and applies the pick.
    pub async fn do_code_action(
        &self,
        range: Option<Range>,
        filter: Option<CodeActionFilter>,
    ) -> Result<bool> {
        let Some(state) = self.editor.current() else {
            return Ok(false);
        };
        let document = self.document(state.buffer)?;
        document.synchronize().await?;

        let kinds = match &filter {
            Some(CodeActionFilter::Kinds(kinds)) => Some(kinds.as_slice()),
            _ => None,
        };
        let mut actions = self
            .get_code_actions(state.buffer, document.as_ref(), range, kinds)
            .await;

        if let Some(CodeActionFilter::Title(title)) = &filter {
            actions.retain(|action| {
                action.action.title == *title
                    || action
                        .action
                        .command
                        .as_ref()
                        .is_some_and(|command| command.title == *title)
            });
        }
        if !self.config.show_disabled {
            actions.retain(|action| !action.is_disabled());
        }

        if actions.is_empty() {
            self.editor
                .show_warning(&format!("No {}available", describe(filter.as_ref())));
            return Ok(false);
        }

        if actions.len() == 1 && !actions[0].is_disabled() && self.auto_apply(filter.as_ref()) {
            return self.apply_reporting(&actions[0]).await;
        }

        let items: Vec<String> = actions.iter().map(menu_item).collect();
        let Some(index) = self.editor.show_menu("Choose action", &items).await else {
            return Ok(false);
        };
        match actions.get(index) {
            Some(action) => self.apply_reporting(action).await,
            None => Ok(false),
        }
    }

    /// Applies the first enabled quickfix for the cursor line.
    pub async fn do_quickfix(&self) -> Result<bool> {
        let Some(state) = self.editor.current() else {
            return Ok(false);
        };
        let document = self.document(state.buffer)?;
        document.synchronize().await?;

        let line = state.position.line;
        let end = document.line(line).map(|text| utf16_len(&text)).unwrap_or(0);
        let range = Range::new(Position::new(line, 0), Position::new(line, end));

        let actions = self
            .get_code_actions(
                state.buffer,
                document.as_ref(),
                Some(range),
                Some(&[CodeActionKind::QUICKFIX]),
            )
            .await;
        match actions.iter().find(|action| !action.is_disabled()) {
            Some(action) => self.apply_reporting(action).await,
            None => {
                self.editor.show_warning("No quickfix action available");
                Ok(false)
            }
        }
    }

    /// Applies the buffer's organize-imports action.
    ///
    /// Returns `false` and warns when no enabled one exists.
    pub async fn organize_import(&self) -> Result<bool> {
        let Some(state) = self.editor.current() else {
            return Ok(false);
        };
        let document = self.document(state.buffer)?;
        document.synchronize().await?;

        let actions = self
            .get_code_actions(
                state.buffer,
                document.as_ref(),
                None,
                Some(&[CodeActionKind::SOURCE_ORGANIZE_IMPORTS]),
            )
            .await;
        match actions.iter().find(|action| !action.is_disabled()) {
            Some(action) => self.apply_reporting(action).await,
            None => {
                self.editor.show_warning("Organize import action not found");
                Ok(false)
            }
        }
    }

    async fn apply_reporting(&self, action: &ProvidedCodeAction) -> Result<bool> {
        match self.apply_code_action(action, &CancellationToken::none()).await {
            Err(LanghubError::ActionDisabled { reason, .. }) => {
                self.editor.show_warning(&reason);
                Ok(false)
            }
            other => other,
        }
    }

    fn auto_apply(&self, filter: Option<&CodeActionFilter>) -> bool {
        self.config.auto_apply_single
            && matches!(filter, Some(CodeActionFilter::Kinds(kinds)) if kinds.iter().any(|kind| {
                kind_contains(&CodeActionKind::QUICKFIX, kind)
                    || kind_contains(&CodeActionKind::SOURCE_FIX_ALL, kind)
            }))
    }

    fn document(&self, buffer: BufferId) -> Result<Arc<dyn Document>> {
        self.editor
            .document(buffer)
            .ok_or_else(|| LanghubError::DocumentNotFound(buffer.to_string()))
    }
}

fn whole_document(document: &dyn Document) -> Range {
    Range::new(Position::new(0, 0), Position::new(document.line_count(), 0))
}

fn describe(filter: Option<&CodeActionFilter>) -> String {
    match filter {
        Some(CodeActionFilter::Kinds(kinds)) if !kinds.is_empty() => {
            let kinds: Vec<&str> = kinds.iter().map(CodeActionKind::as_str).collect();
            format!("{} code action ", kinds.join(", "))
        }
        Some(CodeActionFilter::Title(title)) => format!("code action \"{title}\" "),
        _ => "code action ".to_string(),
    }
}

fn menu_item(action: &ProvidedCodeAction) -> String {
    match &action.action.disabled {
        Some(disabled) => format!("{} (disabled: {})", action.title(), disabled.reason),
        None => action.title().to_string(),
    }
}
