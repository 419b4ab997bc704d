//! Per-container load state

use std::time::SystemTime;
use strum_macros::{AsRefStr, Display};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum LoadStatus {
    Pending,
    Loading,
    Loaded,
    Error,
}

impl LoadStatus {
    /// `loaded` and `error` admit no further transition
    pub fn is_terminal(self) -> bool {
        matches!(self, LoadStatus::Loaded | LoadStatus::Error)
    }
}

/// Load state of one container's script, with transition timestamps
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptLoadState {
    pub container_id: String,
    pub src: String,
    pub status: LoadStatus,
    /// When the container was registered (entered `pending`)
    pub registered_at: SystemTime,
    /// When the element was handed to the host (entered `loading`)
    pub injected_at: Option<SystemTime>,
    /// When a terminal state was reached
    pub settled_at: Option<SystemTime>,
    pub error: Option<String>,
}

impl ScriptLoadState {
    pub(crate) fn pending(container_id: &str, src: String, now: SystemTime) -> Self {
        Self {
            container_id: container_id.to_string(),
            src,
            status: LoadStatus::Pending,
            registered_at: now,
            injected_at: None,
            settled_at: None,
            error: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
