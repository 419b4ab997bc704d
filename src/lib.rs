//! Tag-manager runtime client
//!
//! Queues data-layer entries pushed before boot, injects one script per
//! container while tracking its load state, emits consent commands ahead of
//! any container script, and optionally guards a data layer against entries
//! appended before any client exists.
//!
//! ```
//! use gtm_client::consent::ConsentPreset;
//! use gtm_client::testing::RecordingScriptHost;
//! use gtm_client::{ClientConfig, GtmClient};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let host = Arc::new(RecordingScriptHost::immediate());
//! let config = ClientConfig::new("GTM-XXXX").with_data_layer_name("crateDocLayer");
//! let client = GtmClient::new(config, host).unwrap();
//!
//! client.set_consent_defaults(&ConsentPreset::EeaDefault.state(), None);
//! client.push(json!({"event": "page_view"}));
//! client.init();
//!
//! let entries = client.data_layer().unwrap().entries();
//! assert_eq!(entries[0][0], "consent");
//! assert_eq!(entries[1], json!({"event": "page_view"}));
//! client.teardown();
//! ```

pub mod app;
pub mod autoqueue;
pub mod client;
pub mod consent;
pub mod core;
pub mod datalayer;
pub mod loader;
pub mod testing;

include!(concat!(env!("OUT_DIR"), "/version.rs"));

pub use crate::autoqueue::{AutoQueueHandle, AutoQueueOptions, AutoQueueStatus};
pub use crate::client::{ClientConfig, ClientPhase, ConfigError, Containers, GtmClient};
pub use crate::consent::{ConsentPreset, ConsentState, RegionOptions};
pub use crate::core::diagnostics::ClientLogger;
pub use crate::datalayer::{DataLayer, DataLayerEntry};
pub use crate::loader::{ContainerDescriptor, LoadStatus, ScriptHost, ScriptLoadState};
