//! Capability handlers.
//!
//! Each handler shapes the results of one capability and owns its
//! per-window or per-buffer state:
//!
//! - [`highlight`]: symbol highlights and jumps between them
//! - [`code_action`]: retrieval, sorting and application of code actions
//! - [`format`]: document and range formatting
//! - [`signature_help`]: trigger state machine for signature popups
//!
//! All of them share one [`RequestCoordinator`](langhub_core::RequestCoordinator),
//! keyed by capability and editor scope, so a new request for the same
//! window or buffer always cancels its predecessor.

pub mod code_action;
pub mod format;
pub mod highlight;
pub mod signature_help;

pub use code_action::{CodeActionFilter, CodeActionHandler, ProvidedCodeAction, sort_code_actions};
pub use format::FormatHandler;
pub use highlight::{HighlightHandler, HighlightOutcome, JumpDirection};
pub use signature_help::{SignatureHelpHandler, SignatureState, SignatureTrigger, SignatureView};
