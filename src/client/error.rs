//! Client configuration errors

use crate::core::error_handling::ContextualError;
use crate::loader::HostError;

/// Construction-time configuration failure
///
/// The only error the client surface returns; everything after construction
/// is tolerated or reported through diagnostics.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("at least one container must be configured")]
    NoContainers,

    #[error("container #{index} has an empty id")]
    EmptyContainerId { index: usize },

    #[error("container '{id}' is configured more than once")]
    DuplicateContainer { id: String },

    #[error("data layer name must not be empty")]
    EmptyDataLayerName,

    #[error("script attribute name '{name}' is not a valid HTML attribute name")]
    InvalidScriptAttribute { name: String },

    #[error("container '{container_id}': {source}")]
    ContainerHost {
        container_id: String,
        #[source]
        source: HostError,
    },

    #[error(transparent)]
    Host(#[from] HostError),

    #[error("failed to parse configuration: {0}")]
    Parse(String),
}

impl ContextualError for ConfigError {
    fn is_user_actionable(&self) -> bool {
        true
    }

    fn user_message(&self) -> Option<&str> {
        Some(match self {
            ConfigError::NoContainers => "at least one container must be configured",
            ConfigError::EmptyContainerId { .. } => "container ids must not be empty",
            ConfigError::DuplicateContainer { .. } => "each container id may appear only once",
            ConfigError::EmptyDataLayerName => "data layer name must not be empty",
            ConfigError::InvalidScriptAttribute { .. } => {
                "script attribute names must not contain whitespace, quotes, '<', '>', '/' or '='"
            }
            ConfigError::ContainerHost { .. } | ConfigError::Host(_) => {
                "tag host must be a valid http(s) URL"
            }
            ConfigError::Parse(_) => "configuration could not be parsed",
        })
    }
}
