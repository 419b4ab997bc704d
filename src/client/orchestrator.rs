//! GtmClient - the orchestrating façade

use crate::client::{ClientConfig, ConfigError};
use crate::consent::{build_command, ConsentState, ConsentVerb, RegionOptions};
use crate::core::diagnostics::Diagnostics;
use crate::core::sync::recover_lock;
use crate::core::time::{SystemTimeProvider, TimeProvider};
use crate::datalayer::{DataLayer, DataLayerClaim, DataLayerEntry};
use crate::loader::{ContainerDescriptor, LoadSettings, ScriptHost, ScriptLoadState, ScriptLoader};
use serde_json::json;
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use strum_macros::{AsRefStr, Display};
use tokio::sync::watch;

/// Lifecycle phase of a [`GtmClient`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "kebab-case")]
pub enum ClientPhase {
    Uninitialized,
    Initializing,
    Ready,
    TornDown,
}

struct ClientState {
    phase: ClientPhase,
    /// Outstanding `init` calls not yet balanced by `teardown`
    mount_count: usize,
    queue: VecDeque<DataLayerEntry>,
    claim: Option<DataLayerClaim>,
}

/// Owns one data layer claim, one script loader and the pre-init queue
///
/// ```text
/// uninitialized ──init──► initializing ──flush──► ready
///       ▲                                           │
///       └──────────── teardown (count == 0) ◄───────┘
/// ```
///
/// Entries pushed before `init` are held in a FIFO and delivered, in call
/// order, when `init` runs. Redundant `init` calls only raise a mount count;
/// the matching number of `teardown` calls is needed before scripts are
/// removed and the data layer restored.
pub struct GtmClient {
    containers: Vec<ContainerDescriptor>,
    settings: LoadSettings,
    loader: ScriptLoader,
    state: Mutex<ClientState>,
    phase_tx: watch::Sender<ClientPhase>,
    clock: Arc<dyn TimeProvider>,
    diagnostics: Diagnostics,
}

impl GtmClient {
    /// Validate `config` and build a client injecting through `host`
    ///
    /// Configuration problems surface here and nowhere later.
    pub fn new(config: ClientConfig, host: Arc<dyn ScriptHost>) -> Result<Self, ConfigError> {
        Self::with_time_provider(config, host, Arc::new(SystemTimeProvider))
    }

    pub fn with_time_provider(
        config: ClientConfig,
        host: Arc<dyn ScriptHost>,
        clock: Arc<dyn TimeProvider>,
    ) -> Result<Self, ConfigError> {
        let resolved = config.resolve()?;
        let diagnostics = config.diagnostics();
        let loader = ScriptLoader::with_parts(host, Arc::clone(&clock), diagnostics.clone());
        let (phase_tx, _) = watch::channel(ClientPhase::Uninitialized);

        log::debug!(
            "Created client for {} container(s) on data layer '{}'",
            resolved.containers.len(),
            resolved.settings.data_layer_name
        );

        Ok(Self {
            containers: resolved.containers,
            settings: resolved.settings,
            loader,
            state: Mutex::new(ClientState {
                phase: ClientPhase::Uninitialized,
                mount_count: 0,
                queue: VecDeque::new(),
                claim: None,
            }),
            phase_tx,
            clock,
            diagnostics,
        })
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, ClientState> {
        recover_lock(self.state.lock(), "client state")
    }

    fn publish_phase(&self, phase: ClientPhase) {
        self.phase_tx.send_replace(phase);
    }

    /// Queue `entry` before the client is ready; append it directly afterwards
    pub fn push(&self, entry: DataLayerEntry) {
        let layer = {
            let mut state = self.lock_state();
            match (&state.phase, &state.claim) {
                (ClientPhase::Ready, Some(claim)) => Arc::clone(claim.layer()),
                _ => {
                    if state.phase == ClientPhase::TornDown {
                        log::trace!("Push after teardown; buffering until the next init");
                    }
                    state.queue.push_back(entry);
                    return;
                }
            }
        };
        layer.append(entry);
    }

    /// Push a `consent default` command
    ///
    /// Goes through the same queue as [`GtmClient::push`], so it must be
    /// called before [`GtmClient::init`] for it to precede every script.
    pub fn set_consent_defaults(&self, state: &ConsentState, region: Option<&RegionOptions>) {
        if state.is_empty() {
            self.diagnostics
                .debug(format_args!("Ignoring consent defaults with no categories"));
            return;
        }
        if self.phase() == ClientPhase::Ready {
            self.diagnostics.warn(format_args!(
                "Consent defaults set after init; container scripts may already be running"
            ));
        }
        self.push(build_command(ConsentVerb::Default, state, region));
    }

    /// Push a `consent update` command carrying only the given categories
    pub fn update_consent(&self, state: &ConsentState, region: Option<&RegionOptions>) {
        if state.is_empty() {
            self.diagnostics
                .debug(format_args!("Ignoring consent update with no categories"));
            return;
        }
        self.push(build_command(ConsentVerb::Update, state, region));
    }

    /// Claim the data layer, flush queued entries and inject every container
    ///
    /// Does not wait for scripts to load. A redundant call only raises the
    /// mount count.
    pub fn init(&self) {
        let layer = {
            let mut state = self.lock_state();
            match state.phase {
                ClientPhase::Initializing | ClientPhase::Ready => {
                    state.mount_count += 1;
                    log::debug!(
                        "Client already {}; mount count now {}",
                        state.phase,
                        state.mount_count
                    );
                    return;
                }
                ClientPhase::Uninitialized | ClientPhase::TornDown => {}
            }
            state.phase = ClientPhase::Initializing;
            state.mount_count = 1;
            let claim = DataLayerClaim::claim(&self.settings.data_layer_name);
            let layer = Arc::clone(claim.layer());
            state.claim = Some(claim);
            layer
        };
        self.publish_phase(ClientPhase::Initializing);

        let flushed = match self.drain_queue(&layer, false) {
            Some(count) => count,
            None => return,
        };

        layer.append(json!({
            "gtm.start": self.clock.epoch_millis(),
            "event": "gtm.js",
        }));

        self.loader.load_all(&self.containers, &self.settings);

        let late = match self.drain_queue(&layer, true) {
            Some(count) => count,
            None => return,
        };
        self.publish_phase(ClientPhase::Ready);

        self.diagnostics.info(format_args!(
            "Client ready: {} container(s) injected, {} queued entries flushed",
            self.containers.len(),
            flushed + late
        ));
    }

    /// Deliver queued entries to `layer` one at a time, in push order
    ///
    /// Entries pushed while the flush runs join the back of the queue and are
    /// delivered in the same pass. With `finish` set, the phase becomes
    /// `ready` under the same lock that observes the queue empty. Returns
    /// `None` if the client left `initializing` meanwhile.
    fn drain_queue(&self, layer: &DataLayer, finish: bool) -> Option<usize> {
        let mut delivered = 0;
        loop {
            let entry = {
                let mut state = self.lock_state();
                if state.phase != ClientPhase::Initializing {
                    log::debug!("Client left initializing during flush; stopping");
                    return None;
                }
                match state.queue.pop_front() {
                    Some(entry) => entry,
                    None => {
                        if finish {
                            state.phase = ClientPhase::Ready;
                        }
                        return Some(delivered);
                    }
                }
            };
            layer.append(entry);
            delivered += 1;
        }
    }

    /// Balance one `init`; the last one unloads scripts and restores the layer
    pub fn teardown(&self) {
        let claim = {
            let mut state = self.lock_state();
            if state.mount_count == 0 {
                log::debug!("Teardown without a matching init; ignoring");
                return;
            }
            state.mount_count -= 1;
            if state.mount_count > 0 {
                log::debug!("Teardown deferred; mount count now {}", state.mount_count);
                return;
            }
            state.phase = ClientPhase::TornDown;
            let discarded = state.queue.len();
            state.queue.clear();
            if discarded > 0 {
                log::debug!("Discarded {} queued entries on teardown", discarded);
            }
            state.claim.take()
        };

        let unloaded = self.loader.unload_all();
        if let Some(claim) = claim {
            claim.restore();
        }
        self.publish_phase(ClientPhase::TornDown);

        self.diagnostics.info(format_args!(
            "Client torn down: {} script(s) removed from data layer '{}'",
            unloaded, self.settings.data_layer_name
        ));
    }

    /// Resolve with every container's state once all are `loaded` or `error`
    ///
    /// Waits for `init` if it has not happened yet; never starts loading on
    /// its own.
    pub async fn when_ready(&self) -> Vec<ScriptLoadState> {
        let mut phases = self.phase_tx.subscribe();
        loop {
            if *phases.borrow_and_update() == ClientPhase::Ready {
                break;
            }
            if phases.changed().await.is_err() {
                break;
            }
        }
        self.loader.await_all().await
    }

    /// [`GtmClient::when_ready`] bounded by `timeout`; `None` on expiry
    pub async fn when_ready_within(&self, timeout: Duration) -> Option<Vec<ScriptLoadState>> {
        match tokio::time::timeout(timeout, self.when_ready()).await {
            Ok(states) => Some(states),
            Err(_) => {
                self.diagnostics.warn(format_args!(
                    "Containers not ready after {} ms",
                    timeout.as_millis()
                ));
                None
            }
        }
    }

    pub fn phase(&self) -> ClientPhase {
        self.lock_state().phase
    }

    pub fn is_initialized(&self) -> bool {
        matches!(
            self.phase(),
            ClientPhase::Initializing | ClientPhase::Ready
        )
    }

    pub fn mount_count(&self) -> usize {
        self.lock_state().mount_count
    }

    /// Entries waiting for `init`
    pub fn queued_len(&self) -> usize {
        self.lock_state().queue.len()
    }

    pub fn load_states(&self) -> Vec<ScriptLoadState> {
        self.loader.states()
    }

    pub fn data_layer_name(&self) -> &str {
        &self.settings.data_layer_name
    }

    pub fn containers(&self) -> &[ContainerDescriptor] {
        &self.containers
    }

    pub fn settings(&self) -> &LoadSettings {
        &self.settings
    }

    /// The claimed data layer while initialized
    pub fn data_layer(&self) -> Option<Arc<DataLayer>> {
        self.lock_state()
            .claim
            .as_ref()
            .map(|claim| Arc::clone(claim.layer()))
    }
}

impl fmt::Debug for GtmClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock_state();
        f.debug_struct("GtmClient")
            .field("containers", &self.containers)
            .field("data_layer_name", &self.settings.data_layer_name)
            .field("phase", &state.phase)
            .field("mount_count", &state.mount_count)
            .field("queued", &state.queue.len())
            .finish()
    }
}
