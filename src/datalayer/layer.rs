//! The shared data-layer array

use crate::core::sync::recover_lock;
use std::fmt;
use std::sync::{Arc, Mutex};

/// One data-layer entry: a command or event object, or a command array
pub type DataLayerEntry = serde_json::Value;

/// Interceptor invoked for every append while it is installed
///
/// Installed by the auto-queue to capture entries that would otherwise sit
/// unread until the remote script starts draining the array. While a hook is
/// set the attached consumer is not called directly; the hook forwards to it
/// with [`DataLayer::deliver_to_consumer`].
pub trait AppendHook: Send + Sync {
    fn on_append(&self, entry: &DataLayerEntry);
}

/// The party draining the array, normally the remote tag-manager script
pub trait DataLayerConsumer: Send + Sync {
    fn consume(&self, entry: &DataLayerEntry);
}

impl<F> AppendHook for F
where
    F: Fn(&DataLayerEntry) + Send + Sync,
{
    fn on_append(&self, entry: &DataLayerEntry) {
        self(entry)
    }
}

impl<F> DataLayerConsumer for F
where
    F: Fn(&DataLayerEntry) + Send + Sync,
{
    fn consume(&self, entry: &DataLayerEntry) {
        self(entry)
    }
}

#[derive(Default)]
struct LayerInner {
    entries: Vec<DataLayerEntry>,
    hook: Option<Arc<dyn AppendHook>>,
    consumer: Option<Arc<dyn DataLayerConsumer>>,
}

/// A named, append-only array of entries shared by every party on the page
///
/// Appends are stored first and then delivered: to the append hook if one is
/// installed, otherwise to the attached consumer. No lock is
/// held while a consumer or hook runs, so either may append re-entrantly.
pub struct DataLayer {
    name: String,
    inner: Mutex<LayerInner>,
}

impl DataLayer {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_entries(name, Vec::new())
    }

    /// Create a layer that already holds `entries`, in order
    pub fn with_entries(name: impl Into<String>, entries: Vec<DataLayerEntry>) -> Self {
        Self {
            name: name.into(),
            inner: Mutex::new(LayerInner {
                entries,
                ..LayerInner::default()
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append an entry, returning the new length of the array
    pub fn append(&self, entry: DataLayerEntry) -> usize {
        let (len, consumer, hook) = {
            let mut inner = recover_lock(self.inner.lock(), "data layer");
            inner.entries.push(entry.clone());
            (
                inner.entries.len(),
                inner.consumer.clone(),
                inner.hook.clone(),
            )
        };

        if let Some(hook) = hook {
            hook.on_append(&entry);
        } else if let Some(consumer) = consumer {
            consumer.consume(&entry);
        }

        len
    }

    pub fn len(&self) -> usize {
        recover_lock(self.inner.lock(), "data layer").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the current contents, in append order
    pub fn entries(&self) -> Vec<DataLayerEntry> {
        recover_lock(self.inner.lock(), "data layer").entries.clone()
    }

    /// Install an append hook; returns `false` and leaves the layer untouched if one is already set
    pub fn set_hook(&self, hook: Arc<dyn AppendHook>) -> bool {
        let mut inner = recover_lock(self.inner.lock(), "data layer");
        if inner.hook.is_some() {
            return false;
        }
        inner.hook = Some(hook);
        true
    }

    pub fn clear_hook(&self) -> bool {
        recover_lock(self.inner.lock(), "data layer")
            .hook
            .take()
            .is_some()
    }

    pub fn has_hook(&self) -> bool {
        recover_lock(self.inner.lock(), "data layer").hook.is_some()
    }

    /// Attach the draining consumer, replacing any previous one
    ///
    /// Only appends made after attachment are delivered; existing contents
    /// are available through [`DataLayer::entries`].
    pub fn attach_consumer(&self, consumer: Arc<dyn DataLayerConsumer>) {
        let mut inner = recover_lock(self.inner.lock(), "data layer");
        if inner.consumer.replace(consumer).is_some() {
            log::debug!("Data layer '{}': replaced attached consumer", self.name);
        }
    }

    pub fn detach_consumer(&self) -> bool {
        recover_lock(self.inner.lock(), "data layer")
            .consumer
            .take()
            .is_some()
    }

    pub fn has_consumer(&self) -> bool {
        recover_lock(self.inner.lock(), "data layer")
            .consumer
            .is_some()
    }

    /// Hand an entry to the attached consumer without storing it again
    ///
    /// Returns `false` when no consumer is attached.
    pub fn deliver_to_consumer(&self, entry: &DataLayerEntry) -> bool {
        let consumer = recover_lock(self.inner.lock(), "data layer")
            .consumer
            .clone();
        match consumer {
            Some(consumer) => {
                consumer.consume(entry);
                true
            }
            None => false,
        }
    }
}

impl fmt::Debug for DataLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = recover_lock(self.inner.lock(), "data layer");
        f.debug_struct("DataLayer")
            .field("name", &self.name)
            .field("entries", &inner.entries.len())
            .field("hook", &inner.hook.is_some())
            .field("consumer", &inner.consumer.is_some())
            .finish()
    }
}
