//! CLI error types

use crate::client::ConfigError;
use crate::core::error_handling::ContextualError;
use crate::loader::HostError;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("configuration file {} does not exist", path.display())]
    MissingConfigFile { path: PathBuf },

    #[error("failed to read configuration file {}: {source}", path.display())]
    ReadConfigFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration file {}: {source}", path.display())]
    InvalidConfigFile {
        path: PathBuf,
        #[source]
        source: ConfigError,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Host(#[from] HostError),

    #[error("failed to render consent command: {0}")]
    Render(#[from] serde_json::Error),

    #[error("failed to write output: {0}")]
    Output(#[from] std::io::Error),
}

impl ContextualError for CliError {
    fn is_user_actionable(&self) -> bool {
        !matches!(self, CliError::Render(_) | CliError::Output(_))
    }

    fn user_message(&self) -> Option<&str> {
        match self {
            CliError::MissingConfigFile { .. } => Some("the configuration file given does not exist"),
            CliError::ReadConfigFile { .. } => Some("the configuration file could not be read"),
            CliError::InvalidConfigFile { source, .. } | CliError::Config(source) => {
                source.user_message()
            }
            CliError::Host(source) => source.user_message(),
            CliError::Render(_) | CliError::Output(_) => None,
        }
    }
}
