//! Test doubles for driving the client without a real document
//!
//! [`RecordingScriptHost`] records every injected and removed element and
//! keeps each element's [`LoadSignal`], so tests decide when (and whether) a
//! container's script loads or fails. [`RecordingConsumer`] stands in for
//! the remote script draining a data layer.
//!
//! ```
//! use gtm_client::testing::RecordingScriptHost;
//! use gtm_client::{ClientConfig, GtmClient, LoadStatus};
//! use std::sync::Arc;
//!
//! let host = Arc::new(RecordingScriptHost::new());
//! let client = GtmClient::new(ClientConfig::new("GTM-DOCTEST"), host.clone()).unwrap();
//!
//! client.init();
//! assert_eq!(host.injected_count(), 1);
//!
//! assert!(host.signal_loaded("GTM-DOCTEST"));
//! assert_eq!(client.load_states()[0].status, LoadStatus::Loaded);
//! client.teardown();
//! ```

use crate::core::sync::recover_lock;
use crate::datalayer::{DataLayerConsumer, DataLayerEntry};
use crate::loader::{LoadSignal, ScriptElement, ScriptHost, ScriptHostError};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// How a [`RecordingScriptHost`] answers injections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HostBehavior {
    /// Keep signals until the test fires them
    #[default]
    Manual,
    /// Fire `loaded` (or `failed` for containers marked failing) during `inject`
    Immediate,
}

#[derive(Default)]
struct RecordingState {
    behavior: HostBehavior,
    failing: HashSet<String>,
    rejecting: HashSet<String>,
    injected: Vec<ScriptElement>,
    removed: Vec<String>,
    live: Vec<String>,
    signals: HashMap<String, LoadSignal>,
}

/// In-memory [`ScriptHost`] that records what the loader asks of it
#[derive(Default)]
pub struct RecordingScriptHost {
    state: Mutex<RecordingState>,
}

impl RecordingScriptHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// A host whose scripts load as soon as they are injected
    pub fn immediate() -> Self {
        let host = Self::default();
        host.set_behavior(HostBehavior::Immediate);
        host
    }

    pub fn set_behavior(&self, behavior: HostBehavior) {
        recover_lock(self.state.lock(), "recording host").behavior = behavior;
    }

    /// In `Immediate` mode, fail this container instead of loading it
    pub fn fail_container(&self, container_id: &str) {
        recover_lock(self.state.lock(), "recording host")
            .failing
            .insert(container_id.to_string());
    }

    /// Refuse injection of this container outright
    pub fn reject_container(&self, container_id: &str) {
        recover_lock(self.state.lock(), "recording host")
            .rejecting
            .insert(container_id.to_string());
    }

    pub fn injected(&self) -> Vec<ScriptElement> {
        recover_lock(self.state.lock(), "recording host")
            .injected
            .clone()
    }

    pub fn injected_count(&self) -> usize {
        recover_lock(self.state.lock(), "recording host")
            .injected
            .len()
    }

    /// Element ids removed so far, in removal order
    pub fn removed(&self) -> Vec<String> {
        recover_lock(self.state.lock(), "recording host")
            .removed
            .clone()
    }

    /// Element ids injected and not yet removed
    pub fn live_elements(&self) -> Vec<String> {
        recover_lock(self.state.lock(), "recording host")
            .live
            .clone()
    }

    /// Fire the load callback of the latest element for `container_id`
    pub fn signal_loaded(&self, container_id: &str) -> bool {
        match self.signal_for(container_id) {
            Some(signal) => signal.loaded(),
            None => false,
        }
    }

    /// Fire the error callback of the latest element for `container_id`
    pub fn signal_error(&self, container_id: &str, reason: &str) -> bool {
        match self.signal_for(container_id) {
            Some(signal) => signal.failed(reason),
            None => false,
        }
    }

    fn signal_for(&self, container_id: &str) -> Option<LoadSignal> {
        recover_lock(self.state.lock(), "recording host")
            .signals
            .get(container_id)
            .cloned()
    }
}

impl ScriptHost for RecordingScriptHost {
    fn inject(&self, element: &ScriptElement, signal: LoadSignal) -> Result<(), ScriptHostError> {
        let (behavior, failing) = {
            let mut state = recover_lock(self.state.lock(), "recording host");
            if state.rejecting.contains(&element.container_id) {
                return Err(ScriptHostError::Rejected {
                    element_id: element.id.clone(),
                    reason: "rejected by test host".to_string(),
                });
            }
            state.injected.push(element.clone());
            state.live.push(element.id.clone());
            state
                .signals
                .insert(element.container_id.clone(), signal.clone());
            (
                state.behavior,
                state.failing.contains(&element.container_id),
            )
        };

        if behavior == HostBehavior::Immediate {
            if failing {
                signal.failed("failed by test host");
            } else {
                signal.loaded();
            }
        }
        Ok(())
    }

    fn remove(&self, element_id: &str) {
        let mut state = recover_lock(self.state.lock(), "recording host");
        state.live.retain(|id| id != element_id);
        state.removed.push(element_id.to_string());
    }
}

/// [`DataLayerConsumer`] that keeps every entry it receives
#[derive(Default)]
pub struct RecordingConsumer {
    entries: Mutex<Vec<DataLayerEntry>>,
}

impl RecordingConsumer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<DataLayerEntry> {
        recover_lock(self.entries.lock(), "recording consumer").clone()
    }

    pub fn len(&self) -> usize {
        recover_lock(self.entries.lock(), "recording consumer").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DataLayerConsumer for RecordingConsumer {
    fn consume(&self, entry: &DataLayerEntry) {
        recover_lock(self.entries.lock(), "recording consumer").push(entry.clone());
    }
}
