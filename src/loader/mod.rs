//! Script Loader
//!
//! Builds each container's script URL, asks a [`ScriptHost`] to inject one
//! element per container, and tracks a per-container load state machine:
//!
//! ```text
//! pending ──inject──► loading ──load signal──► loaded
//!                        │
//!                        └────error signal────► error
//! ```
//!
//! `loaded` and `error` are terminal. A failing container never blocks the
//! others, and [`ScriptLoader::await_all`] resolves once every tracked
//! container is terminal. Element callbacks arrive through a [`LoadSignal`];
//! signals that fire after [`ScriptLoader::unload_all`] are ignored.

mod container;
mod error;
mod host;
mod manager;
mod markup;
mod state;
mod url;

pub use container::{ContainerDescriptor, QueryValue};
pub use error::{HostError, ScriptHostError};
pub use host::{ScriptElement, ScriptHost};
pub use manager::{LoadSettings, LoadSignal, ScriptHandle, ScriptLoader};
pub use markup::{noscript_markup, noscript_url, script_tag};
pub use state::{LoadStatus, ScriptLoadState};
pub use url::{container_url, ScriptKind, TagHost, DEFAULT_HOST};
