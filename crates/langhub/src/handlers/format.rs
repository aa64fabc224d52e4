//! Document and range formatting.

use langhub_core::{
    Capability, LanghubError, Providers, RequestCoordinator, RequestKey, RequestOutcome, Result,
};
use std::collections::HashMap;
use std::sync::Arc;
use tower_lsp_server::ls_types::{Range, WorkspaceEdit};

use crate::config::FormattingConfig;
use crate::editor::{BufferId, Editor};

pub struct FormatHandler {
    providers: Arc<Providers>,
    editor: Arc<dyn Editor>,
    coordinator: Arc<RequestCoordinator>,
    config: FormattingConfig,
}

impl FormatHandler {
    pub fn new(
        providers: Arc<Providers>,
        editor: Arc<dyn Editor>,
        coordinator: Arc<RequestCoordinator>,
        config: FormattingConfig,
    ) -> Self {
        Self {
            providers,
            editor,
            coordinator,
            config,
        }
    }

    /// Formats the whole buffer. Returns whether edits were applied.
    pub async fn format_document(&self, buffer: BufferId) -> Result<bool> {
        self.format(buffer, None, true).await
    }

    pub async fn format_range(&self, buffer: BufferId, range: Range) -> Result<bool> {
        self.format(buffer, Some(range), true).await
    }

    /// Formats before a save when configured for the buffer's language.
    ///
    /// Stays silent when no formatter is registered.
    pub async fn format_on_save(&self, buffer: BufferId) -> Result<bool> {
        let Some(document) = self.editor.document(buffer) else {
            return Ok(false);
        };
        if !self
            .config
            .formats_on_save(&document.identity().language_id)
        {
            return Ok(false);
        }
        self.format(buffer, None, false).await
    }

    async fn format(&self, buffer: BufferId, range: Option<Range>, explicit: bool) -> Result<bool> {
        let document = self
            .editor
            .document(buffer)
            .ok_or_else(|| LanghubError::DocumentNotFound(buffer.to_string()))?;
        document.synchronize().await?;

        let identity = document.identity();
        let options = self.editor.formatting_options(buffer);
        let snapshot = document.snapshot();
        let version = snapshot.version;
        let timeout = self.config.timeout();

        let outcome = match range {
            None => {
                let Some(registration) = self.providers.formatting.resolve_one(&identity) else {
                    if explicit {
                        self.editor.show_warning(&format!(
                            "Format provider not found for {}",
                            identity.uri.as_str()
                        ));
                    }
                    return Ok(false);
                };
                let key = RequestKey::new(Capability::Formatting, buffer.0);
                let snapshot = &snapshot;
                let options = &options;
                self.coordinator
                    .run(key, timeout, |token| async move {
                        registration
                            .provider
                            .provide_document_formatting_edits(snapshot, options, &token)
                            .await
                    })
                    .await
            }
            Some(range) => {
                let Some(registration) = self.providers.range_formatting.resolve_one(&identity)
                else {
                    if explicit {
                        self.editor.show_warning(&format!(
                            "Range format provider not found for {}",
                            identity.uri.as_str()
                        ));
                    }
                    return Ok(false);
                };
                let key = RequestKey::new(Capability::RangeFormatting, buffer.0);
                let snapshot = &snapshot;
                let options = &options;
                self.coordinator
                    .run(key, timeout, |token| async move {
                        registration
                            .provider
                            .provide_document_range_formatting_edits(snapshot, range, options, &token)
                            .await
                    })
                    .await
            }
        };

        let edits = match outcome {
            RequestOutcome::Completed(Ok(Some(edits))) if !edits.is_empty() => edits,
            RequestOutcome::Completed(Ok(_)) | RequestOutcome::Cancelled => return Ok(false),
            RequestOutcome::Completed(Err(e)) => {
                tracing::warn!("formatting {} failed: {}", identity.uri.as_str(), e);
                return Ok(false);
            }
            RequestOutcome::TimedOut => {
                if explicit {
                    self.editor.show_warning("Formatting timed out");
                }
                return Ok(false);
            }
        };

        if document.version() != version {
            tracing::debug!(
                "discarding formatting edits for {}: version {} is now {}",
                identity.uri.as_str(),
                version,
                document.version()
            );
            return Ok(false);
        }

        let mut changes = HashMap::new();
        changes.insert(identity.uri, edits);
        self.editor
            .apply_edit(WorkspaceEdit {
                changes: Some(changes),
                ..Default::default()
            })
            .await
    }
}
