//! The document seam: where script elements are actually injected

use crate::loader::{LoadSignal, ScriptHostError};
use std::collections::BTreeMap;

/// A script element as the loader wants it injected
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptElement {
    pub id: String,
    pub container_id: String,
    pub src: String,
    pub is_async: bool,
    /// Extra attributes (e.g. a CSP `nonce`), identical on every element
    pub attributes: BTreeMap<String, String>,
}

/// Environment capable of injecting and removing script elements
///
/// Implementations call [`LoadSignal::loaded`] or [`LoadSignal::failed`]
/// when the element's load or error callback fires, possibly from within
/// `inject` itself. Returning an error from `inject` marks the container as
/// failed immediately.
pub trait ScriptHost: Send + Sync {
    fn inject(&self, element: &ScriptElement, signal: LoadSignal) -> Result<(), ScriptHostError>;

    /// Remove a previously injected element; unknown ids are ignored
    fn remove(&self, element_id: &str);
}
