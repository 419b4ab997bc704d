//! ScriptLoader - per-container injection and load state tracking

use crate::core::diagnostics::Diagnostics;
use crate::core::sync::recover_lock;
use crate::core::time::{SystemTimeProvider, TimeProvider};
use crate::loader::{
    container_url, ContainerDescriptor, LoadStatus, ScriptElement, ScriptHost, ScriptKind,
    ScriptLoadState, TagHost,
};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::watch;

/// Client-wide settings applied to every container the loader injects
#[derive(Debug, Clone)]
pub struct LoadSettings {
    pub host: TagHost,
    pub data_layer_name: String,
    pub script_attributes: BTreeMap<String, String>,
}

/// What the caller gets back from [`ScriptLoader::load`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptHandle {
    pub container_id: String,
    pub element_id: String,
    pub src: String,
}

struct TrackedScript {
    element_id: String,
    state: ScriptLoadState,
}

#[derive(Default)]
struct LoaderInner {
    /// Bumped by `unload_all`; signals from older generations are stale
    generation: u64,
    /// In registration order
    scripts: Vec<TrackedScript>,
}

impl LoaderInner {
    fn find_mut(&mut self, container_id: &str) -> Option<&mut TrackedScript> {
        self.scripts
            .iter_mut()
            .find(|s| s.state.container_id == container_id)
    }

    fn snapshot(&self) -> Vec<ScriptLoadState> {
        self.scripts.iter().map(|s| s.state.clone()).collect()
    }
}

struct LoaderShared {
    inner: Mutex<LoaderInner>,
    changes: watch::Sender<u64>,
    clock: Arc<dyn TimeProvider>,
    diagnostics: Diagnostics,
}

impl LoaderShared {
    fn notify(&self) {
        self.changes.send_modify(|version| *version = version.wrapping_add(1));
    }

    /// Move a `loading` container to a terminal state
    fn settle(&self, container_id: &str, generation: u64, outcome: Result<(), String>) -> bool {
        {
            let mut inner = recover_lock(self.inner.lock(), "script loader");
            if inner.generation != generation {
                log::trace!(
                    "Ignoring stale load signal for container '{}' (generation {} != {})",
                    container_id,
                    generation,
                    inner.generation
                );
                return false;
            }

            let now = self.clock.system_time();
            let Some(script) = inner.find_mut(container_id) else {
                return false;
            };
            if script.state.status != LoadStatus::Loading {
                log::trace!(
                    "Ignoring load signal for container '{}' in state {}",
                    container_id,
                    script.state.status
                );
                return false;
            }

            script.state.settled_at = Some(now);
            match &outcome {
                Ok(()) => script.state.status = LoadStatus::Loaded,
                Err(reason) => {
                    script.state.status = LoadStatus::Error;
                    script.state.error = Some(reason.clone());
                }
            }
        }

        match outcome {
            Ok(()) => self
                .diagnostics
                .debug(format_args!("Container '{}' script loaded", container_id)),
            Err(reason) => self.diagnostics.warn(format_args!(
                "Container '{}' script failed to load: {}",
                container_id, reason
            )),
        }
        self.notify();
        true
    }
}

/// Converts one injected element's load/error callbacks into state transitions
///
/// Cheap to clone. Outlives neither its loader nor an `unload_all`: once
/// either happens, every method becomes a no-op returning `false`.
#[derive(Clone)]
pub struct LoadSignal {
    shared: Weak<LoaderShared>,
    container_id: String,
    generation: u64,
}

impl LoadSignal {
    pub fn container_id(&self) -> &str {
        &self.container_id
    }

    /// Report a successful load; returns whether a transition happened
    pub fn loaded(&self) -> bool {
        self.settle(Ok(()))
    }

    /// Report a load failure; returns whether a transition happened
    pub fn failed(&self, reason: impl Into<String>) -> bool {
        self.settle(Err(reason.into()))
    }

    fn settle(&self, outcome: Result<(), String>) -> bool {
        match self.shared.upgrade() {
            Some(shared) => shared.settle(&self.container_id, self.generation, outcome),
            None => false,
        }
    }
}

impl fmt::Debug for LoadSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadSignal")
            .field("container_id", &self.container_id)
            .field("generation", &self.generation)
            .finish()
    }
}

/// Injects container scripts through a [`ScriptHost`] and tracks their load states
pub struct ScriptLoader {
    shared: Arc<LoaderShared>,
    host: Arc<dyn ScriptHost>,
}

impl ScriptLoader {
    pub fn new(host: Arc<dyn ScriptHost>) -> Self {
        Self::with_parts(host, Arc::new(SystemTimeProvider), Diagnostics::default())
    }

    pub fn with_parts(
        host: Arc<dyn ScriptHost>,
        clock: Arc<dyn TimeProvider>,
        diagnostics: Diagnostics,
    ) -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            shared: Arc::new(LoaderShared {
                inner: Mutex::new(LoaderInner::default()),
                changes,
                clock,
                diagnostics,
            }),
            host,
        }
    }

    /// Register every container as `pending`, then inject each in order
    pub fn load_all(
        &self,
        containers: &[ContainerDescriptor],
        settings: &LoadSettings,
    ) -> Vec<ScriptHandle> {
        for container in containers {
            self.register(container, settings);
        }
        containers
            .iter()
            .map(|container| self.load(container, settings))
            .collect()
    }

    /// Inject `container`'s script unless it already left `pending`
    pub fn load(&self, container: &ContainerDescriptor, settings: &LoadSettings) -> ScriptHandle {
        let (handle, generation) = {
            let src = self.register(container, settings);
            let mut inner = recover_lock(self.shared.inner.lock(), "script loader");
            let generation = inner.generation;
            let now = self.shared.clock.system_time();
            let Some(script) = inner.find_mut(&container.id) else {
                return ScriptHandle {
                    container_id: container.id.clone(),
                    element_id: container.element_id(),
                    src,
                };
            };

            let handle = ScriptHandle {
                container_id: container.id.clone(),
                element_id: script.element_id.clone(),
                src: script.state.src.clone(),
            };
            if script.state.status != LoadStatus::Pending {
                log::trace!(
                    "Container '{}' already {}; not injecting again",
                    container.id,
                    script.state.status
                );
                return handle;
            }

            script.state.status = LoadStatus::Loading;
            script.state.injected_at = Some(now);
            (handle, generation)
        };
        self.shared.notify();

        let element = ScriptElement {
            id: handle.element_id.clone(),
            container_id: container.id.clone(),
            src: handle.src.clone(),
            is_async: true,
            attributes: settings.script_attributes.clone(),
        };
        let signal = LoadSignal {
            shared: Arc::downgrade(&self.shared),
            container_id: container.id.clone(),
            generation,
        };

        log::debug!("Injecting script for container '{}': {}", container.id, element.src);
        if let Err(e) = self.host.inject(&element, signal) {
            self.shared.settle(&container.id, generation, Err(e.to_string()));
        }

        handle
    }

    /// Track `container` as `pending` if it is not tracked yet; returns its src
    fn register(&self, container: &ContainerDescriptor, settings: &LoadSettings) -> String {
        let src = match container.resolve_host(&settings.host) {
            Ok(host) => container_url(&host, ScriptKind::Script, container, &settings.data_layer_name),
            Err(e) => {
                self.shared
                    .diagnostics
                    .warn(format_args!("Container '{}': {}; using client host", container.id, e));
                container_url(
                    &settings.host,
                    ScriptKind::Script,
                    container,
                    &settings.data_layer_name,
                )
            }
        };

        let mut inner = recover_lock(self.shared.inner.lock(), "script loader");
        if let Some(existing) = inner.find_mut(&container.id) {
            return existing.state.src.clone();
        }
        let now = self.shared.clock.system_time();
        inner.scripts.push(TrackedScript {
            element_id: container.element_id(),
            state: ScriptLoadState::pending(&container.id, src.clone(), now),
        });
        src
    }

    /// Current states, in registration order
    pub fn states(&self) -> Vec<ScriptLoadState> {
        recover_lock(self.shared.inner.lock(), "script loader").snapshot()
    }

    pub fn state(&self, container_id: &str) -> Option<ScriptLoadState> {
        recover_lock(self.shared.inner.lock(), "script loader")
            .scripts
            .iter()
            .find(|s| s.state.container_id == container_id)
            .map(|s| s.state.clone())
    }

    pub fn tracked_count(&self) -> usize {
        recover_lock(self.shared.inner.lock(), "script loader")
            .scripts
            .len()
    }

    fn settled_snapshot(&self) -> Option<Vec<ScriptLoadState>> {
        let inner = recover_lock(self.shared.inner.lock(), "script loader");
        if inner.scripts.iter().all(|s| s.state.is_terminal()) {
            Some(inner.snapshot())
        } else {
            None
        }
    }

    /// Resolve once every tracked container is `loaded` or `error`
    ///
    /// Has no timeout of its own: a container whose callbacks never fire keeps
    /// this pending until [`ScriptLoader::unload_all`] empties the tracked set.
    pub async fn await_all(&self) -> Vec<ScriptLoadState> {
        let mut changes = self.shared.changes.subscribe();
        loop {
            if let Some(states) = self.settled_snapshot() {
                return states;
            }
            if changes.changed().await.is_err() {
                return self.states();
            }
        }
    }

    /// Remove every injected element and forget all tracked state
    ///
    /// Returns the number of containers forgotten. Callbacks from removed
    /// elements may still fire later and are ignored.
    pub fn unload_all(&self) -> usize {
        let removed = {
            let mut inner = recover_lock(self.shared.inner.lock(), "script loader");
            inner.generation = inner.generation.wrapping_add(1);
            std::mem::take(&mut inner.scripts)
        };

        for script in &removed {
            if script.state.status != LoadStatus::Pending {
                self.host.remove(&script.element_id);
            }
        }
        self.shared.notify();
        log::debug!("Unloaded {} container scripts", removed.len());
        removed.len()
    }
}

impl fmt::Debug for ScriptLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptLoader")
            .field("tracked", &self.tracked_count())
            .finish()
    }
}
