//! Claim/restore lifecycle over a named data layer

use crate::datalayer::registry;
use crate::datalayer::{DataLayer, DataLayerEntry};
use std::sync::Arc;

/// A client's hold on a named data layer
///
/// Records whether the layer existed before the claim and, if so, a copy of
/// its contents at that moment, so [`DataLayerClaim::restore`] can undo the
/// client's effect on the global scope.
#[derive(Debug)]
pub struct DataLayerClaim {
    layer: Arc<DataLayer>,
    created: bool,
    snapshot: Option<Vec<DataLayerEntry>>,
}

impl DataLayerClaim {
    /// Claim the layer under `name`, reusing an existing array verbatim
    pub fn claim(name: &str) -> Self {
        registry::with_scope(|scope| match scope.get(name) {
            Some(existing) => {
                let snapshot = existing.entries();
                log::debug!(
                    "Claimed existing data layer '{}' holding {} entries",
                    name,
                    snapshot.len()
                );
                Self {
                    layer: Arc::clone(existing),
                    created: false,
                    snapshot: Some(snapshot),
                }
            }
            None => {
                let layer = Arc::new(DataLayer::new(name));
                scope.insert(name.to_string(), Arc::clone(&layer));
                log::debug!("Created data layer '{}'", name);
                Self {
                    layer,
                    created: true,
                    snapshot: None,
                }
            }
        })
    }

    pub fn layer(&self) -> &Arc<DataLayer> {
        &self.layer
    }

    pub fn name(&self) -> &str {
        self.layer.name()
    }

    /// `true` when no layer existed under this name before the claim
    pub fn created(&self) -> bool {
        self.created
    }

    /// Contents at claim time; `None` when the layer did not exist
    pub fn snapshot(&self) -> Option<&[DataLayerEntry]> {
        self.snapshot.as_deref()
    }

    pub fn append(&self, entry: DataLayerEntry) -> usize {
        self.layer.append(entry)
    }

    /// Undo the claim
    ///
    /// A layer created by the claim is removed from the global scope. A
    /// pre-existing layer is replaced by a fresh array holding copies of the
    /// entries captured at claim time.
    pub fn restore(self) {
        let name = self.layer.name().to_string();
        match self.snapshot {
            None => {
                registry::remove(&name);
                log::debug!("Restored data layer '{}': removed", name);
            }
            Some(snapshot) => {
                let restored_len = snapshot.len();
                registry::install(Arc::new(DataLayer::with_entries(name.clone(), snapshot)));
                log::debug!(
                    "Restored data layer '{}' to {} pre-existing entries",
                    name,
                    restored_len
                );
            }
        }
    }
}
