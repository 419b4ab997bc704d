//! Client Orchestrator
//!
//! [`GtmClient`] composes the data layer store, the script loader and the
//! consent commands behind a small surface:
//!
//! ```text
//!  push / set_consent_defaults / update_consent
//!            │
//!            ▼
//!   ┌─────────────────┐  init   ┌────────────────┐   ┌──────────────┐
//!   │ pre-init FIFO   │────────►│ DataLayerClaim │──►│ ScriptLoader │
//!   └─────────────────┘  flush  └────────────────┘   └──────────────┘
//!                                   ▲   teardown: restore + unload_all
//!                                   └── after ready: push appends directly
//! ```
//!
//! Only construction can fail; every later operation tolerates misuse and
//! reports it through the configured diagnostics.

mod config;
mod error;
mod orchestrator;

pub use config::{ClientConfig, ContainerEntry, Containers, ResolvedConfig};
pub use error::ConfigError;
pub use orchestrator::{ClientPhase, GtmClient};

#[cfg(test)]
mod tests;
