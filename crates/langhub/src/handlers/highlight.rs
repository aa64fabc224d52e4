//! Symbol highlight handler.
//!
//! Highlights every occurrence of the symbol under the cursor and jumps
//! between them. Results are cached per window and dropped wholesale on
//! cursor motion.

use dashmap::DashMap;
use langhub_core::{
    Capability, LanghubError, Providers, RequestCoordinator, RequestKey, RequestOutcome, Result,
    compare_positions, compare_ranges,
};
use std::cmp::Ordering;
use std::sync::Arc;
use tower_lsp_server::ls_types::{DocumentHighlight, DocumentHighlightKind, Position, Range};

use crate::config::HighlightConfig;
use crate::editor::{BufferId, CursorState, Editor, WindowId, char_at_utf16};

/// How a highlight request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HighlightOutcome {
    /// Highlights were rendered; carries the number of ranges.
    Applied(usize),
    /// Nothing to highlight: non-word character, no provider or no result.
    Empty,
    /// Superseded, timed out or computed for a stale document.
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpDirection {
    Next,
    Previous,
}

struct HighlightEntry {
    buffer: BufferId,
    version: i32,
    highlights: Vec<DocumentHighlight>,
}

pub struct HighlightHandler {
    providers: Arc<Providers>,
    editor: Arc<dyn Editor>,
    coordinator: Arc<RequestCoordinator>,
    config: HighlightConfig,
    entries: DashMap<WindowId, HighlightEntry>,
    // Bumped on every cursor motion; a request only applies if it still matches.
    epochs: DashMap<WindowId, u64>,
}

impl HighlightHandler {
    pub fn new(
        providers: Arc<Providers>,
        editor: Arc<dyn Editor>,
        coordinator: Arc<RequestCoordinator>,
        config: HighlightConfig,
    ) -> Self {
        Self {
            providers,
            editor,
            coordinator,
            config,
            entries: DashMap::new(),
            epochs: DashMap::new(),
        }
    }

    /// Highlights the symbol under the current cursor.
    pub async fn highlight(&self) -> Result<HighlightOutcome> {
        match self.editor.current() {
            Some(state) => self.highlight_at(state).await,
            None => Ok(HighlightOutcome::Empty),
        }
    }

    pub async fn highlight_at(&self, state: CursorState) -> Result<HighlightOutcome> {
        let window = state.window;
        let key = request_key(window);
        self.coordinator.cancel(&key);
        self.clear(window);

        if !self.config.enabled {
            return Ok(HighlightOutcome::Empty);
        }

        let document = self
            .editor
            .document(state.buffer)
            .ok_or_else(|| LanghubError::DocumentNotFound(state.buffer.to_string()))?;

        let position = state.position;
        let on_word = document
            .line(position.line)
            .and_then(|line| char_at_utf16(&line, position.character))
            .is_some_and(|ch| document.is_word_char(ch));
        if !on_word {
            return Ok(HighlightOutcome::Empty);
        }

        let Some(registration) = self
            .providers
            .document_highlight
            .resolve_one(&document.identity())
        else {
            return Ok(HighlightOutcome::Empty);
        };

        let epoch = self.epoch(window);
        document.synchronize().await?;
        if self.epoch(window) != epoch {
            return Ok(HighlightOutcome::Cancelled);
        }

        let snapshot = document.snapshot();
        let version = snapshot.version;
        let provider = Arc::clone(&registration.provider);
        let outcome = self
            .coordinator
            .run(key, self.config.timeout(), |token| async move {
                provider
                    .provide_document_highlights(&snapshot, position, &token)
                    .await
            })
            .await;

        let mut highlights = match outcome {
            RequestOutcome::Completed(Ok(highlights)) => highlights.unwrap_or_default(),
            RequestOutcome::Completed(Err(e)) => {
                tracing::warn!(
                    "highlight provider {} failed: {}",
                    registration.display_name(),
                    e
                );
                return Ok(HighlightOutcome::Empty);
            }
            RequestOutcome::TimedOut | RequestOutcome::Cancelled => {
                return Ok(HighlightOutcome::Cancelled);
            }
        };

        if self.epoch(window) != epoch || document.version() != version {
            tracing::debug!("discarding stale highlights for {}", window);
            return Ok(HighlightOutcome::Cancelled);
        }
        if highlights.is_empty() {
            return Ok(HighlightOutcome::Empty);
        }
        if highlights.len() > self.config.limit {
            tracing::debug!(
                "truncating {} highlights to {}",
                highlights.len(),
                self.config.limit
            );
            highlights.truncate(self.config.limit);
        }

        let count = highlights.len();
        let groups = group_by_kind(&highlights);
        self.entries.insert(
            window,
            HighlightEntry {
                buffer: state.buffer,
                version,
                highlights,
            },
        );

        self.editor.clear_highlights(window);
        for (kind, ranges) in groups {
            if !ranges.is_empty() {
                self.editor
                    .apply_highlights(window, self.style(kind), &ranges);
            }
        }
        Ok(HighlightOutcome::Applied(count))
    }

    /// Moves the cursor to the next or previous highlighted occurrence.
    ///
    /// Computes highlights first when the window has none cached. Returns
    /// `false` when there is nothing to jump to.
    pub async fn jump_symbol(&self, direction: JumpDirection) -> Result<bool> {
        let Some(state) = self.editor.current() else {
            return Ok(false);
        };

        let mut ranges = self.cached_ranges(state);
        if ranges.is_empty() {
            if let HighlightOutcome::Applied(_) = self.highlight_at(state).await? {
                ranges = self.cached_ranges(state);
            }
        }

        match jump_target(&mut ranges, state.position, direction) {
            Some(target) => {
                self.editor.move_cursor(state.window, target);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn has_highlights(&self, window: WindowId) -> bool {
        self.entries.contains_key(&window)
    }

    pub fn highlights(&self, window: WindowId) -> Vec<DocumentHighlight> {
        self.entries
            .get(&window)
            .map(|entry| entry.highlights.clone())
            .unwrap_or_default()
    }

    /// Drops cached highlights for the window and removes its markers.
    pub fn clear(&self, window: WindowId) {
        if self.entries.remove(&window).is_some() {
            self.editor.clear_highlights(window);
        }
    }

    /// Cancels outstanding work and clears highlights before the new position is processed.
    pub fn on_cursor_moved(&self, window: WindowId) {
        self.bump_epoch(window);
        self.coordinator.cancel(&request_key(window));
        self.clear(window);
    }

    pub fn on_window_closed(&self, window: WindowId) {
        self.coordinator.cancel(&request_key(window));
        self.entries.remove(&window);
        self.epochs.remove(&window);
    }

    fn cached_ranges(&self, state: CursorState) -> Vec<Range> {
        let Some(entry) = self.entries.get(&state.window) else {
            return Vec::new();
        };
        let current_version = self
            .editor
            .document(entry.buffer)
            .map(|document| document.version());
        if entry.buffer != state.buffer || current_version != Some(entry.version) {
            return Vec::new();
        }
        entry.highlights.iter().map(|h| h.range).collect()
    }

    fn style(&self, kind: DocumentHighlightKind) -> &str {
        let styles = &self.config.styles;
        if kind == DocumentHighlightKind::READ {
            &styles.read
        } else if kind == DocumentHighlightKind::WRITE {
            &styles.write
        } else {
            &styles.text
        }
    }

    fn epoch(&self, window: WindowId) -> u64 {
        self.epochs.get(&window).map(|epoch| *epoch).unwrap_or(0)
    }

    fn bump_epoch(&self, window: WindowId) {
        *self.epochs.entry(window).or_insert(0) += 1;
    }
}

fn request_key(window: WindowId) -> RequestKey {
    RequestKey::new(Capability::DocumentHighlight, window.0)
}

/// Splits highlights into Text, Read and Write groups, keeping relative order.
///
/// Highlights without a kind count as Text.
pub fn group_by_kind(highlights: &[DocumentHighlight]) -> [(DocumentHighlightKind, Vec<Range>); 3] {
    let mut groups = [
        (DocumentHighlightKind::TEXT, Vec::new()),
        (DocumentHighlightKind::READ, Vec::new()),
        (DocumentHighlightKind::WRITE, Vec::new()),
    ];
    for highlight in highlights {
        let index = match highlight.kind {
            Some(kind) if kind == DocumentHighlightKind::READ => 1,
            Some(kind) if kind == DocumentHighlightKind::WRITE => 2,
            _ => 0,
        };
        groups[index].1.push(highlight.range);
    }
    groups
}

/// Picks the jump destination among `ranges`, wrapping at either end.
///
/// Next is the first range starting after the cursor; previous is the last
/// range ending before it. Sorts and dedups `ranges` in place.
pub fn jump_target(
    ranges: &mut Vec<Range>,
    cursor: Position,
    direction: JumpDirection,
) -> Option<Position> {
    ranges.sort_by(compare_ranges);
    ranges.dedup();

    let target = match direction {
        JumpDirection::Next => ranges
            .iter()
            .find(|range| compare_positions(range.start, cursor) == Ordering::Greater)
            .or_else(|| ranges.first()),
        JumpDirection::Previous => ranges
            .iter()
            .rev()
            .find(|range| compare_positions(range.end, cursor) == Ordering::Less)
            .or_else(|| ranges.last()),
    };
    target.map(|range| range.start)
}
