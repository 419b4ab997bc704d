//! Process-wide registry of named data layers
//!
//! Stands in for the page's global scope: whatever sits under a name here is
//! what every party on the page sees as `window[name]`. Two clients claiming
//! the same name at once is a caller error and is not guarded against.

use crate::core::sync::recover_lock;
use crate::datalayer::DataLayer;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock, Mutex};

static GLOBAL_SCOPE: LazyLock<Mutex<HashMap<String, Arc<DataLayer>>>> = LazyLock::new(|| {
    log::trace!("Initializing data layer registry");
    Mutex::new(HashMap::new())
});

/// Look up the layer currently installed under `name`
pub fn lookup(name: &str) -> Option<Arc<DataLayer>> {
    recover_lock(GLOBAL_SCOPE.lock(), "data layer registry")
        .get(name)
        .cloned()
}

pub fn contains(name: &str) -> bool {
    recover_lock(GLOBAL_SCOPE.lock(), "data layer registry").contains_key(name)
}

/// Return the layer under `name`, creating an empty one if none exists
///
/// The boolean is `true` when the layer was created by this call.
pub fn get_or_create(name: &str) -> (Arc<DataLayer>, bool) {
    let mut scope = recover_lock(GLOBAL_SCOPE.lock(), "data layer registry");
    if let Some(existing) = scope.get(name) {
        return (Arc::clone(existing), false);
    }

    let layer = Arc::new(DataLayer::new(name));
    scope.insert(name.to_string(), Arc::clone(&layer));
    log::trace!("Created data layer '{}'", name);
    (layer, true)
}

/// Install `layer` under its own name, returning whatever it displaced
pub fn install(layer: Arc<DataLayer>) -> Option<Arc<DataLayer>> {
    recover_lock(GLOBAL_SCOPE.lock(), "data layer registry")
        .insert(layer.name().to_string(), layer)
}

pub fn remove(name: &str) -> Option<Arc<DataLayer>> {
    recover_lock(GLOBAL_SCOPE.lock(), "data layer registry").remove(name)
}

/// Run `f` against the registry map while holding its lock
pub(crate) fn with_scope<R>(f: impl FnOnce(&mut HashMap<String, Arc<DataLayer>>) -> R) -> R {
    let mut scope = recover_lock(GLOBAL_SCOPE.lock(), "data layer registry");
    f(&mut scope)
}
