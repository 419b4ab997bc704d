//! HTML rendering for server-side output

use crate::datalayer::DEFAULT_DATA_LAYER_NAME;
use crate::loader::{container_url, ContainerDescriptor, ScriptElement, ScriptKind, TagHost};

/// The container's `ns.html` URL; never carries the `l` parameter
pub fn noscript_url(host: &TagHost, container: &ContainerDescriptor) -> String {
    container_url(host, ScriptKind::Noscript, container, DEFAULT_DATA_LAYER_NAME)
}

/// `<noscript>` fallback referencing the container's `ns.html` endpoint
pub fn noscript_markup(host: &TagHost, container: &ContainerDescriptor) -> String {
    let src = noscript_url(host, container);
    format!(
        r#"<noscript><iframe src="{}" height="0" width="0" style="display:none;visibility:hidden"></iframe></noscript>"#,
        escape_attribute(&src)
    )
}

/// `<script>` tag equivalent to an injected element
pub fn script_tag(element: &ScriptElement) -> String {
    let mut tag = format!(r#"<script id="{}""#, escape_attribute(&element.id));
    if element.is_async {
        tag.push_str(" async");
    }
    tag.push_str(&format!(r#" src="{}""#, escape_attribute(&element.src)));
    for (name, value) in &element.attributes {
        tag.push_str(&format!(r#" {}="{}""#, name, escape_attribute(value)));
    }
    tag.push_str("></script>");
    tag
}

fn escape_attribute(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
