//! Auto-queue installation, detection and replay

use crate::autoqueue::{AutoQueueError, AutoQueueOptions, CountCallback};
use crate::core::sync::recover_lock;
use crate::datalayer::{registry, DataLayer, DataLayerEntry};
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, Weak};
use strum_macros::{AsRefStr, Display};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Where an auto-queue is in its one-way lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "kebab-case")]
pub enum AutoQueueStatus {
    /// Capturing appends until a consumer shows up
    Buffering,
    /// A consumer was detected and the buffer delivered to it
    Replayed,
    /// No consumer appeared in time; the buffer was discarded
    TimedOut,
    Uninstalled,
}

impl AutoQueueStatus {
    pub fn is_finished(self) -> bool {
        !matches!(self, AutoQueueStatus::Buffering)
    }
}

/// Whether something is draining `layer`
///
/// The remote script attaches itself as the layer's consumer when it boots;
/// that attachment is the signal the auto-queue waits for.
pub fn consumer_detected(layer: &DataLayer) -> bool {
    layer.has_consumer()
}

struct BufferState {
    status: AutoQueueStatus,
    /// Captured entries while buffering; after replay, entries awaiting delivery
    buffer: VecDeque<DataLayerEntry>,
    dropped: usize,
    delivering: bool,
}

struct AutoQueueShared {
    layer: Arc<DataLayer>,
    options: AutoQueueOptions,
    state: Mutex<BufferState>,
    status_tx: watch::Sender<AutoQueueStatus>,
    started: Instant,
}

impl AutoQueueShared {
    fn lock_state(&self) -> std::sync::MutexGuard<'_, BufferState> {
        recover_lock(self.state.lock(), "auto-queue buffer")
    }

    /// Append hook body
    ///
    /// While buffering, `entry` is copied into the side buffer. Once a
    /// consumer is attached the buffer is replayed ahead of `entry`, so the
    /// consumer never sees a newer entry before an older buffered one.
    fn capture(&self, entry: &DataLayerEntry) {
        let mut state = self.lock_state();
        let status = state.status;
        match status {
            AutoQueueStatus::Buffering if consumer_detected(&self.layer) => {
                let replayed = state.buffer.len();
                state.status = AutoQueueStatus::Replayed;
                state.buffer.push_back(entry.clone());
                drop(state);
                self.replayed(replayed);
            }
            AutoQueueStatus::Buffering => {
                if state.buffer.len() < self.options.max_buffer_size {
                    state.buffer.push_back(entry.clone());
                    return;
                }
                state.dropped += 1;
                let dropped = state.dropped;
                drop(state);
                self.overflowed(dropped);
            }
            AutoQueueStatus::Replayed => {
                state.buffer.push_back(entry.clone());
                drop(state);
                self.flush();
            }
            AutoQueueStatus::TimedOut | AutoQueueStatus::Uninstalled => {
                drop(state);
                self.layer.deliver_to_consumer(entry);
            }
        }
    }

    fn overflowed(&self, dropped: usize) {
        if dropped == 1 {
            log::warn!(
                "Auto-queue buffer for '{}' is full ({} entries); newer entries will not be replayed",
                self.layer.name(),
                self.options.max_buffer_size
            );
        }
        fire(self.options.on_overflow.as_ref(), dropped);
    }

    /// Deliver pending entries to the consumer in order, then drop the hook
    ///
    /// Only one caller delivers at a time; entries appended meanwhile, by
    /// other threads or by the consumer itself, are queued behind the batch
    /// in flight.
    fn flush(&self) {
        {
            let mut state = self.lock_state();
            if state.delivering {
                return;
            }
            state.delivering = true;
        }
        loop {
            let batch = {
                let mut state = self.lock_state();
                if state.buffer.is_empty() {
                    state.delivering = false;
                    break;
                }
                std::mem::take(&mut state.buffer)
            };
            for entry in &batch {
                self.layer.deliver_to_consumer(entry);
            }
        }
        self.layer.clear_hook();
    }

    /// Leave `buffering` for `next`, returning the buffered entries
    fn finish(&self, next: AutoQueueStatus) -> Option<VecDeque<DataLayerEntry>> {
        let buffered = {
            let mut state = self.lock_state();
            if state.status.is_finished() {
                return None;
            }
            state.status = next;
            std::mem::take(&mut state.buffer)
        };
        self.layer.clear_hook();
        self.status_tx.send_replace(next);
        Some(buffered)
    }

    fn poll_once(&self) -> AutoQueueStatus {
        let current = self.lock_state().status;
        if current.is_finished() {
            return current;
        }

        if consumer_detected(&self.layer) {
            self.replay();
        } else if self.started.elapsed() >= self.options.timeout {
            self.time_out();
        }
        self.lock_state().status
    }

    fn replay(&self) {
        let replayed = {
            let mut state = self.lock_state();
            if state.status.is_finished() {
                return;
            }
            state.status = AutoQueueStatus::Replayed;
            state.buffer.len()
        };
        self.replayed(replayed);
    }

    /// Announce the move to `replayed`, then deliver everything pending
    fn replayed(&self, count: usize) {
        self.status_tx.send_replace(AutoQueueStatus::Replayed);
        self.flush();
        log::debug!(
            "Auto-queue replayed {} entries into data layer '{}'",
            count,
            self.layer.name()
        );
        fire(self.options.on_replay.as_ref(), count);
    }

    fn time_out(&self) {
        let Some(buffered) = self.finish(AutoQueueStatus::TimedOut) else {
            return;
        };
        let pending = buffered.len();
        log::warn!(
            "No consumer for data layer '{}' after {} ms; discarding {} buffered entries",
            self.layer.name(),
            self.options.timeout.as_millis(),
            pending
        );
        if pending > 0 {
            fire(self.options.on_timeout.as_ref(), pending);
        }
    }
}

fn fire(callback: Option<&CountCallback>, count: usize) {
    if let Some(callback) = callback {
        callback(count);
    }
}

async fn poll_until_finished(shared: Arc<AutoQueueShared>) {
    let mut ticker = tokio::time::interval(shared.options.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        if shared.poll_once().is_finished() {
            break;
        }
    }
}

/// Guard the data layer named in `options` until a consumer drains it
///
/// Every entry appended to the layer is also captured into a bounded side
/// buffer. When a consumer is detected the buffer is handed to it once, in
/// append order, before any entry appended after the consumer attached;
/// once the backlog is delivered, later entries go to the consumer directly.
/// If the layer already has a consumer nothing is guarded and `on_replay`
/// fires immediately with a count of zero.
/// When the buffer is full, newer entries are left out of it (they still land
/// in the layer) and `on_overflow` reports the running total.
///
/// Inside a tokio runtime a background task polls every `poll_interval` and
/// keeps the guard alive even if the handle is dropped. Without a runtime,
/// drive detection with [`AutoQueueHandle::poll_once`] and keep the handle.
pub fn install(options: AutoQueueOptions) -> Result<AutoQueueHandle, AutoQueueError> {
    options.validate()?;

    let (layer, created) = registry::get_or_create(&options.data_layer_name);
    let already_drained = consumer_detected(&layer);
    let initial = if already_drained {
        AutoQueueStatus::Replayed
    } else {
        AutoQueueStatus::Buffering
    };
    let (status_tx, _) = watch::channel(initial);

    let shared = Arc::new(AutoQueueShared {
        layer: Arc::clone(&layer),
        options,
        state: Mutex::new(BufferState {
            status: initial,
            buffer: VecDeque::new(),
            dropped: 0,
            delivering: false,
        }),
        status_tx,
        started: Instant::now(),
    });

    if already_drained {
        log::debug!(
            "Data layer '{}' already has a consumer; nothing to guard",
            layer.name()
        );
        fire(shared.options.on_replay.as_ref(), 0);
        return Ok(AutoQueueHandle { shared, task: None });
    }

    let weak: Weak<AutoQueueShared> = Arc::downgrade(&shared);
    let weak_layer: Weak<DataLayer> = Arc::downgrade(&layer);
    let hooked = layer.set_hook(Arc::new(move |entry: &DataLayerEntry| {
        if let Some(shared) = weak.upgrade() {
            shared.capture(entry);
        } else if let Some(layer) = weak_layer.upgrade() {
            layer.deliver_to_consumer(entry);
        }
    }));
    if !hooked {
        return Err(AutoQueueError::AlreadyInstalled {
            data_layer_name: layer.name().to_string(),
        });
    }

    let task = tokio::runtime::Handle::try_current()
        .ok()
        .map(|runtime| runtime.spawn(poll_until_finished(Arc::clone(&shared))));

    log::debug!(
        "Auto-queue guarding data layer '{}' ({}, polling {})",
        layer.name(),
        if created { "created" } else { "existing" },
        if task.is_some() { "in background" } else { "manually" }
    );

    Ok(AutoQueueHandle { shared, task })
}

/// Observes and controls one installed auto-queue
pub struct AutoQueueHandle {
    shared: Arc<AutoQueueShared>,
    task: Option<JoinHandle<()>>,
}

impl AutoQueueHandle {
    pub fn status(&self) -> AutoQueueStatus {
        self.shared.lock_state().status
    }

    pub fn buffered_len(&self) -> usize {
        self.shared.lock_state().buffer.len()
    }

    /// Entries left out of the buffer because it was full
    pub fn dropped_count(&self) -> usize {
        self.shared.lock_state().dropped
    }

    /// Run one detection step: replay if a consumer is attached, time out if due
    pub fn poll_once(&self) -> AutoQueueStatus {
        self.shared.poll_once()
    }

    pub fn layer(&self) -> &Arc<DataLayer> {
        &self.shared.layer
    }

    /// Resolve once the auto-queue has replayed, timed out or been uninstalled
    pub async fn settled(&self) -> AutoQueueStatus {
        let mut status = self.shared.status_tx.subscribe();
        loop {
            let current = *status.borrow_and_update();
            if current.is_finished() {
                return current;
            }
            if status.changed().await.is_err() {
                return self.status();
            }
        }
    }

    /// Stop buffering without replaying; returns the number of entries discarded
    pub fn uninstall(self) -> usize {
        if let Some(task) = &self.task {
            task.abort();
        }
        let discarded = self
            .shared
            .finish(AutoQueueStatus::Uninstalled)
            .map_or(0, |buffered| buffered.len());
        log::debug!(
            "Auto-queue uninstalled from data layer '{}'; {} entries discarded",
            self.shared.layer.name(),
            discarded
        );
        discarded
    }
}

impl fmt::Debug for AutoQueueHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.lock_state();
        f.debug_struct("AutoQueueHandle")
            .field("data_layer", &self.shared.layer.name())
            .field("status", &state.status)
            .field("buffered", &state.buffer.len())
            .field("dropped", &state.dropped)
            .finish()
    }
}
