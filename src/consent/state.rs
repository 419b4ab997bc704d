//! Consent categories, values and partial state

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

/// Signal value for one consent category
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ConsentValue {
    Granted,
    Denied,
}

/// The four fixed privacy-signal dimensions
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ConsentCategory {
    AdStorage,
    AnalyticsStorage,
    AdUserData,
    AdPersonalization,
}

/// A possibly partial category → value mapping
///
/// Unset categories are omitted from serialized commands entirely, so an
/// update only touches the categories it names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConsentState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ad_storage: Option<ConsentValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analytics_storage: Option<ConsentValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ad_user_data: Option<ConsentValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ad_personalization: Option<ConsentValue>,
}

impl ConsentState {
    /// Empty state: no category specified
    pub const fn new() -> Self {
        Self {
            ad_storage: None,
            analytics_storage: None,
            ad_user_data: None,
            ad_personalization: None,
        }
    }

    /// Every category set to `value`
    pub const fn uniform(value: ConsentValue) -> Self {
        Self {
            ad_storage: Some(value),
            analytics_storage: Some(value),
            ad_user_data: Some(value),
            ad_personalization: Some(value),
        }
    }

    /// Builder-style setter
    pub fn with(mut self, category: ConsentCategory, value: ConsentValue) -> Self {
        self.set(category, value);
        self
    }

    pub fn set(&mut self, category: ConsentCategory, value: ConsentValue) {
        *self.slot_mut(category) = Some(value);
    }

    pub fn get(&self, category: ConsentCategory) -> Option<ConsentValue> {
        match category {
            ConsentCategory::AdStorage => self.ad_storage,
            ConsentCategory::AnalyticsStorage => self.analytics_storage,
            ConsentCategory::AdUserData => self.ad_user_data,
            ConsentCategory::AdPersonalization => self.ad_personalization,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.specified().next().is_none()
    }

    /// Categories that carry a value, in canonical order
    pub fn specified(&self) -> impl Iterator<Item = (ConsentCategory, ConsentValue)> + '_ {
        ConsentCategory::iter().filter_map(|category| self.get(category).map(|v| (category, v)))
    }

    fn slot_mut(&mut self, category: ConsentCategory) -> &mut Option<ConsentValue> {
        match category {
            ConsentCategory::AdStorage => &mut self.ad_storage,
            ConsentCategory::AnalyticsStorage => &mut self.analytics_storage,
            ConsentCategory::AdUserData => &mut self.ad_user_data,
            ConsentCategory::AdPersonalization => &mut self.ad_personalization,
        }
    }
}

/// Region scoping carried as the optional fourth element of a consent command
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegionOptions {
    /// ISO 3166-1 alpha-2 country codes, optionally with a subdivision (`US-CA`)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub region: Vec<String>,
    /// Milliseconds the script should wait for an update before using the default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait_for_update: Option<u64>,
}

impl RegionOptions {
    pub fn for_regions<I, S>(regions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            region: regions.into_iter().map(Into::into).collect(),
            wait_for_update: None,
        }
    }

    pub fn with_wait_for_update(mut self, millis: u64) -> Self {
        self.wait_for_update = Some(millis);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.region.is_empty() && self.wait_for_update.is_none()
    }
}
