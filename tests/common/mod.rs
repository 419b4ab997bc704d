//! Shared helpers for integration tests

#![allow(dead_code)]

use gtm_client::datalayer::registry;
use gtm_client::testing::RecordingScriptHost;
use gtm_client::{ClientConfig, Containers, GtmClient};
use serde_json::{json, Value};
use std::sync::Arc;

/// A client on its own data layer, injecting through a manual recording host
pub fn manual_client(layer: &str, containers: impl Into<Containers>) -> (GtmClient, Arc<RecordingScriptHost>) {
    let host = Arc::new(RecordingScriptHost::new());
    let config = ClientConfig::new(containers).with_data_layer_name(layer);
    let client = GtmClient::new(config, host.clone()).expect("valid config");
    (client, host)
}

pub fn event(name: &str) -> Value {
    json!({ "event": name })
}

/// Entries of the named layer, without the `gtm.js` bootstrap entry
pub fn entries_without_bootstrap(layer: &str) -> Vec<Value> {
    registry::lookup(layer)
        .map(|layer| layer.entries())
        .unwrap_or_default()
        .into_iter()
        .filter(|entry| entry.get("gtm.start").is_none())
        .collect()
}
