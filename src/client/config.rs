//! Client configuration
//!
//! Accepts the shorthand container forms callers use in practice:
//!
//! ```toml
//! containers = "GTM-ABC123"                     # one id
//! containers = ["GTM-ABC123", "GTM-DEF456"]     # several ids
//!
//! [[containers]]                                # full descriptors
//! id = "GTM-ABC123"
//! query_params = { gtm_auth = "token", gtm_preview = "env-3" }
//! ```

use crate::client::ConfigError;
use crate::core::diagnostics::{ClientLogger, Diagnostics};
use crate::datalayer::DEFAULT_DATA_LAYER_NAME;
use crate::loader::{ContainerDescriptor, LoadSettings, TagHost, DEFAULT_HOST};
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// Attribute names the loader sets itself
const RESERVED_ATTRIBUTES: &[&str] = &["src", "id", "async"];

/// HTML attribute names exclude whitespace, controls, quotes, `<`, `>`, `/` and `=`
fn is_valid_attribute_name(name: &str) -> bool {
    !name.is_empty()
        && name.chars().all(|c| {
            !c.is_whitespace()
                && !c.is_control()
                && !matches!(c, '"' | '\'' | '<' | '>' | '/' | '=')
        })
}

/// One container given either as a bare id or a full descriptor
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ContainerEntry {
    Id(String),
    Descriptor(ContainerDescriptor),
}

impl From<ContainerEntry> for ContainerDescriptor {
    fn from(entry: ContainerEntry) -> Self {
        match entry {
            ContainerEntry::Id(id) => ContainerDescriptor::new(id),
            ContainerEntry::Descriptor(descriptor) => descriptor,
        }
    }
}

/// The `containers` option: one entry or a list of entries
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Containers {
    One(ContainerEntry),
    Many(Vec<ContainerEntry>),
}

impl Default for Containers {
    fn default() -> Self {
        Containers::Many(Vec::new())
    }
}

impl Containers {
    /// Flatten to descriptors, in configuration order
    pub fn normalize(&self) -> Vec<ContainerDescriptor> {
        match self {
            Containers::One(entry) => vec![entry.clone().into()],
            Containers::Many(entries) => entries.iter().cloned().map(Into::into).collect(),
        }
    }
}

impl From<&str> for Containers {
    fn from(id: &str) -> Self {
        Containers::One(ContainerEntry::Id(id.to_string()))
    }
}

impl From<String> for Containers {
    fn from(id: String) -> Self {
        Containers::One(ContainerEntry::Id(id))
    }
}

impl From<ContainerDescriptor> for Containers {
    fn from(descriptor: ContainerDescriptor) -> Self {
        Containers::One(ContainerEntry::Descriptor(descriptor))
    }
}

impl From<Vec<ContainerDescriptor>> for Containers {
    fn from(descriptors: Vec<ContainerDescriptor>) -> Self {
        Containers::Many(
            descriptors
                .into_iter()
                .map(ContainerEntry::Descriptor)
                .collect(),
        )
    }
}

impl From<Vec<String>> for Containers {
    fn from(ids: Vec<String>) -> Self {
        Containers::Many(ids.into_iter().map(ContainerEntry::Id).collect())
    }
}

impl From<Vec<&str>> for Containers {
    fn from(ids: Vec<&str>) -> Self {
        Containers::Many(
            ids.into_iter()
                .map(|id| ContainerEntry::Id(id.to_string()))
                .collect(),
        )
    }
}

impl<const N: usize> From<[&str; N]> for Containers {
    fn from(ids: [&str; N]) -> Self {
        Containers::from(ids.to_vec())
    }
}

fn default_data_layer_name() -> String {
    DEFAULT_DATA_LAYER_NAME.to_string()
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

/// Everything a [`GtmClient`](crate::GtmClient) needs to know up front
#[derive(Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    #[serde(default)]
    pub containers: Containers,
    #[serde(default = "default_data_layer_name", alias = "dataLayerName")]
    pub data_layer_name: String,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default, alias = "scriptAttributes")]
    pub script_attributes: BTreeMap<String, String>,
    #[serde(skip)]
    pub logger: Option<Arc<dyn ClientLogger>>,
}

impl ClientConfig {
    pub fn new(containers: impl Into<Containers>) -> Self {
        Self {
            containers: containers.into(),
            data_layer_name: default_data_layer_name(),
            host: default_host(),
            script_attributes: BTreeMap::new(),
            logger: None,
        }
    }

    pub fn with_data_layer_name(mut self, name: impl Into<String>) -> Self {
        self.data_layer_name = name.into();
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_script_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.script_attributes.insert(name.into(), value.into());
        self
    }

    /// Shorthand for a CSP `nonce` attribute on every injected script
    pub fn with_nonce(self, nonce: impl Into<String>) -> Self {
        self.with_script_attribute("nonce", nonce)
    }

    pub fn with_logger(mut self, logger: Arc<dyn ClientLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        toml::from_str(source).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn from_json_str(source: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(source).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub(crate) fn diagnostics(&self) -> Diagnostics {
        Diagnostics::new(self.logger.clone())
    }

    /// Validate and normalise into the form the client runs on
    pub fn resolve(&self) -> Result<ResolvedConfig, ConfigError> {
        let diagnostics = self.diagnostics();

        let containers = self.containers.normalize();
        if containers.is_empty() {
            return Err(ConfigError::NoContainers);
        }

        let host = TagHost::parse(&self.host)?;

        let mut seen = HashSet::new();
        let mut resolved = Vec::with_capacity(containers.len());
        for (index, mut container) in containers.into_iter().enumerate() {
            container.id = container.id.trim().to_string();
            if container.id.is_empty() {
                return Err(ConfigError::EmptyContainerId { index });
            }
            if !seen.insert(container.id.clone()) {
                return Err(ConfigError::DuplicateContainer { id: container.id });
            }
            if let Err(source) = container.resolve_host(&host) {
                return Err(ConfigError::ContainerHost {
                    container_id: container.id,
                    source,
                });
            }
            if container.query_params.contains_key("id") {
                diagnostics.warn(format_args!(
                    "Container '{}': ignoring 'id' query parameter",
                    container.id
                ));
            }
            resolved.push(container);
        }

        let data_layer_name = self.data_layer_name.trim().to_string();
        if data_layer_name.is_empty() {
            return Err(ConfigError::EmptyDataLayerName);
        }

        if let Some(name) = self
            .script_attributes
            .keys()
            .find(|name| !is_valid_attribute_name(name))
        {
            return Err(ConfigError::InvalidScriptAttribute { name: name.clone() });
        }

        let mut script_attributes = self.script_attributes.clone();
        script_attributes.retain(|name, _| {
            let reserved = RESERVED_ATTRIBUTES.contains(&name.to_ascii_lowercase().as_str());
            if reserved {
                diagnostics.warn(format_args!("Ignoring reserved script attribute '{}'", name));
            }
            !reserved
        });

        Ok(ResolvedConfig {
            containers: resolved,
            settings: LoadSettings {
                host,
                data_layer_name,
                script_attributes,
            },
        })
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("containers", &self.containers)
            .field("data_layer_name", &self.data_layer_name)
            .field("host", &self.host)
            .field("script_attributes", &self.script_attributes)
            .field("logger", &self.logger.is_some())
            .finish()
    }
}

/// A validated configuration: at least one container, all hosts parsed
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub containers: Vec<ContainerDescriptor>,
    pub settings: LoadSettings,
}
