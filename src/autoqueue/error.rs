//! Auto-queue installation errors

use crate::core::error_handling::ContextualError;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AutoQueueError {
    #[error("an append hook is already installed on data layer '{data_layer_name}'")]
    AlreadyInstalled { data_layer_name: String },

    #[error("invalid auto-queue options: {message}")]
    InvalidOptions { message: String },
}

impl ContextualError for AutoQueueError {
    fn is_user_actionable(&self) -> bool {
        true
    }

    fn user_message(&self) -> Option<&str> {
        match self {
            AutoQueueError::AlreadyInstalled { .. } => {
                Some("only one auto-queue may guard a data layer at a time")
            }
            AutoQueueError::InvalidOptions { message } => Some(message.as_str()),
        }
    }
}
