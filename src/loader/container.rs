//! Container descriptors

use crate::loader::{HostError, TagHost};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Scalar value of a caller-supplied script URL query parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for QueryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryValue::Bool(b) => write!(f, "{}", b),
            QueryValue::Integer(i) => write!(f, "{}", i),
            QueryValue::Float(x) => write!(f, "{}", x),
            QueryValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        QueryValue::Text(value.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        QueryValue::Text(value)
    }
}

impl From<bool> for QueryValue {
    fn from(value: bool) -> Self {
        QueryValue::Bool(value)
    }
}

impl From<i64> for QueryValue {
    fn from(value: i64) -> Self {
        QueryValue::Integer(value)
    }
}

impl From<i32> for QueryValue {
    fn from(value: i32) -> Self {
        QueryValue::Integer(value.into())
    }
}

impl From<f64> for QueryValue {
    fn from(value: f64) -> Self {
        QueryValue::Float(value)
    }
}

/// One configured tag-manager container
///
/// Identity is the `id`; each container gets its own script element and load
/// state. `host` overrides the client-wide host for this container only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContainerDescriptor {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, alias = "queryParams", skip_serializing_if = "BTreeMap::is_empty")]
    pub query_params: BTreeMap<String, QueryValue>,
}

impl ContainerDescriptor {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            host: None,
            query_params: BTreeMap::new(),
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn with_query_param(mut self, key: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.query_params.insert(key.into(), value.into());
        self
    }

    /// The host serving this container: its own override, else `default_host`
    pub fn resolve_host(&self, default_host: &TagHost) -> Result<TagHost, HostError> {
        match &self.host {
            Some(host) => TagHost::parse(host),
            None => Ok(default_host.clone()),
        }
    }

    /// Element id used for this container's injected script
    pub fn element_id(&self) -> String {
        format!("gtm-script-{}", self.id)
    }
}

impl From<&str> for ContainerDescriptor {
    fn from(id: &str) -> Self {
        ContainerDescriptor::new(id)
    }
}

impl From<String> for ContainerDescriptor {
    fn from(id: String) -> Self {
        ContainerDescriptor::new(id)
    }
}
