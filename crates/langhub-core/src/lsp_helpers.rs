//! Shared helpers over protocol value types.

use std::cmp::Ordering;
use tower_lsp_server::ls_types::{CodeActionKind, Position, Range};

/// Total order over positions: line first, then character.
pub fn compare_positions(a: Position, b: Position) -> Ordering {
    (a.line, a.character).cmp(&(b.line, b.character))
}

/// Total order over ranges: start position first, then end position.
pub fn compare_ranges(a: &Range, b: &Range) -> Ordering {
    compare_positions(a.start, b.start).then_with(|| compare_positions(a.end, b.end))
}

/// Hierarchical kind containment: `source` contains `source.organizeImports`.
///
/// The empty kind contains every kind.
pub fn kind_contains(parent: &CodeActionKind, child: &CodeActionKind) -> bool {
    let parent = parent.as_str();
    let child = child.as_str();
    parent.is_empty()
        || child == parent
        || (child.starts_with(parent) && child.as_bytes().get(parent.len()) == Some(&b'.'))
}

/// Checks if either kind contains the other.
pub fn kinds_overlap(a: &CodeActionKind, b: &CodeActionKind) -> bool {
    kind_contains(a, b) || kind_contains(b, a)
}
