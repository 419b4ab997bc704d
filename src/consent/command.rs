//! Consent command construction

use crate::consent::{ConsentState, RegionOptions};
use crate::datalayer::DataLayerEntry;
use serde_json::{Map, Value};
use strum_macros::{AsRefStr, Display, EnumString};

/// Discriminator that opens every consent command
pub const CONSENT_COMMAND: &str = "consent";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum ConsentVerb {
    Default,
    Update,
}

/// Build `["consent", verb, categories, region?]`
///
/// The category mapping holds exactly the categories `state` specifies. The
/// region element is added only when `region` is present and non-empty.
pub fn build_command(
    verb: ConsentVerb,
    state: &ConsentState,
    region: Option<&RegionOptions>,
) -> DataLayerEntry {
    let categories: Map<String, Value> = state
        .specified()
        .map(|(category, value)| {
            (
                category.as_ref().to_string(),
                Value::String(value.as_ref().to_string()),
            )
        })
        .collect();

    let mut command = vec![
        Value::String(CONSENT_COMMAND.to_string()),
        Value::String(verb.as_ref().to_string()),
        Value::Object(categories),
    ];

    if let Some(region) = region.filter(|r| !r.is_empty()) {
        match serde_json::to_value(region) {
            Ok(mapping) => command.push(mapping),
            Err(e) => log::warn!("Dropping unserialisable consent region options: {}", e),
        }
    }

    Value::Array(command)
}

pub fn build_default_command(state: &ConsentState, region: Option<&RegionOptions>) -> DataLayerEntry {
    build_command(ConsentVerb::Default, state, region)
}

pub fn build_update_command(state: &ConsentState) -> DataLayerEntry {
    build_command(ConsentVerb::Update, state, None)
}
