use thiserror::Error;

use crate::provider::Capability;

/// Core error types for langhub.
///
/// Timeouts and superseded requests are not errors; they surface as
/// [`RequestOutcome`](crate::coordinator::RequestOutcome) values.
///
/// # Examples
///
/// ```
/// use langhub_core::error::{LanghubError, Result};
///
/// fn apply(title: &str, disabled_reason: Option<&str>) -> Result<()> {
///     if let Some(reason) = disabled_reason {
///         return Err(LanghubError::ActionDisabled {
///             title: title.into(),
///             reason: reason.into(),
///         });
///     }
///     Ok(())
/// }
///
/// assert!(apply("Organize Imports", Some("no imports")).is_err());
/// ```
#[derive(Error, Debug)]
pub enum LanghubError {
    #[error("code action \"{title}\" is disabled: {reason}")]
    ActionDisabled { title: String, reason: String },

    #[error("{capability} provider failed: {message}")]
    Provider {
        capability: Capability,
        message: String,
    },

    #[error("invalid glob pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("document synchronization failed: {0}")]
    Synchronize(String),

    #[error("editor request failed: {0}")]
    Editor(String),

    #[error("document not found: {0}")]
    DocumentNotFound(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LanghubError {
    /// Builds a `Provider` error for the given capability.
    pub fn provider(capability: Capability, message: impl Into<String>) -> Self {
        Self::Provider {
            capability,
            message: message.into(),
        }
    }
}

/// Convenience type alias for `Result<T, LanghubError>`.
pub type Result<T> = std::result::Result<T, LanghubError>;
