//! Loader error types

use crate::core::error_handling::ContextualError;

/// A tag-manager host that cannot serve container scripts
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HostError {
    #[error("invalid tag host '{host}': {reason}")]
    InvalidUrl { host: String, reason: String },

    #[error("tag host '{host}' must use http or https, not '{scheme}'")]
    UnsupportedScheme { host: String, scheme: String },
}

impl ContextualError for HostError {
    fn is_user_actionable(&self) -> bool {
        true
    }

    fn user_message(&self) -> Option<&str> {
        match self {
            HostError::InvalidUrl { .. } => Some("tag host is not a valid URL"),
            HostError::UnsupportedScheme { .. } => Some("tag host must use http or https"),
        }
    }
}

/// Failure reported by a [`ScriptHost`](crate::loader::ScriptHost) while injecting an element
///
/// Never propagated to callers: the affected container moves to `error`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScriptHostError {
    #[error("script host rejected element '{element_id}': {reason}")]
    Rejected { element_id: String, reason: String },

    #[error("script host unavailable: {0}")]
    Unavailable(String),
}

impl ContextualError for ScriptHostError {
    fn is_user_actionable(&self) -> bool {
        false
    }

    fn user_message(&self) -> Option<&str> {
        None
    }
}
