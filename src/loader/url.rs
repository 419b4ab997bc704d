//! Script URL construction

use crate::datalayer::DEFAULT_DATA_LAYER_NAME;
use crate::loader::{ContainerDescriptor, HostError};
use std::fmt;
use url::Url;

/// The canonical tag-manager host
pub const DEFAULT_HOST: &str = "https://www.googletagmanager.com";

/// Which endpoint of a container to address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptKind {
    /// `gtm.js`, the executable container script
    Script,
    /// `ns.html`, the fallback for clients that do not run scripts
    Noscript,
}

impl ScriptKind {
    pub fn file_name(self) -> &'static str {
        match self {
            ScriptKind::Script => "gtm.js",
            ScriptKind::Noscript => "ns.html",
        }
    }
}

/// A validated, normalised tag-manager host (no trailing slash)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagHost {
    base: Url,
}

impl TagHost {
    /// Parse a host, defaulting to `https://` when no scheme is given
    pub fn parse(raw: &str) -> Result<Self, HostError> {
        let trimmed = raw.trim().trim_end_matches('/');
        let candidate = if trimmed.contains("://") {
            trimmed.to_string()
        } else {
            format!("https://{}", trimmed)
        };

        let base = Url::parse(&candidate).map_err(|e| HostError::InvalidUrl {
            host: raw.to_string(),
            reason: e.to_string(),
        })?;

        match base.scheme() {
            "http" | "https" => {}
            other => {
                return Err(HostError::UnsupportedScheme {
                    host: raw.to_string(),
                    scheme: other.to_string(),
                })
            }
        }

        if base.host_str().is_none() {
            return Err(HostError::InvalidUrl {
                host: raw.to_string(),
                reason: "missing host name".to_string(),
            });
        }

        Ok(Self { base })
    }

    pub fn as_str(&self) -> &str {
        self.base.as_str().trim_end_matches('/')
    }

    fn endpoint(&self, kind: ScriptKind) -> Url {
        let mut url = self.base.clone();
        url.set_query(None);
        url.set_fragment(None);
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(kind.file_name());
        }
        url
    }
}

impl fmt::Display for TagHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build `<host>/<gtm.js|ns.html>?id=<id>&<params>[&l=<dataLayerName>]`
///
/// A caller-supplied `id` parameter is ignored. `l` is added only for the
/// script endpoint, only when the data layer name is not the default, and
/// only when the caller did not supply `l` themselves.
pub fn container_url(
    host: &TagHost,
    kind: ScriptKind,
    container: &ContainerDescriptor,
    data_layer_name: &str,
) -> String {
    let mut url = host.endpoint(kind);
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("id", &container.id);
        for (key, value) in &container.query_params {
            if key == "id" {
                continue;
            }
            query.append_pair(key, &value.to_string());
        }
        if kind == ScriptKind::Script
            && data_layer_name != DEFAULT_DATA_LAYER_NAME
            && !container.query_params.contains_key("l")
        {
            query.append_pair("l", data_layer_name);
        }
    }
    url.to_string()
}
